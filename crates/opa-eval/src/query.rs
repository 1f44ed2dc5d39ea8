//! Query path parsing.

use crate::error::{EngineError, Result};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Pattern every query path must match: `data` followed by dotted identifiers.
const QUERY_PATTERN: &str = r"^data(\.[A-Za-z_][A-Za-z0-9_]*)*$";

fn query_regex() -> Result<&'static Regex> {
    static QUERY_RE: OnceLock<Regex> = OnceLock::new();
    if let Some(re) = QUERY_RE.get() {
        return Ok(re);
    }
    let re = Regex::new(QUERY_PATTERN)?;
    Ok(QUERY_RE.get_or_init(|| re))
}

/// How a query is executed by the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalStrategy {
    /// The query names a rule of the loaded package and is evaluated directly.
    Rule,
    /// Anything else (`data`, a package, a foreign path) runs as a general query.
    Query,
}

/// A validated query path such as `data.authz.allow`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryPath {
    raw: String,
}

impl QueryPath {
    /// Parses and validates a query path.
    pub fn parse(query: &str) -> Result<Self> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(EngineError::InvalidQuery("query is empty".to_string()));
        }
        if !query_regex()?.is_match(trimmed) {
            return Err(EngineError::InvalidQuery(format!(
                "'{}' is not a data path (expected data.<package>.<rule>)",
                trimmed
            )));
        }
        Ok(Self {
            raw: trimmed.to_string(),
        })
    }

    /// Returns the path as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the path with its last segment removed, if any.
    pub fn parent(&self) -> Option<&str> {
        self.raw.rsplit_once('.').map(|(parent, _)| parent)
    }

    /// Picks the execution strategy given the package declared by the policy
    /// (as reported by the interpreter, with or without the `data.` prefix).
    pub fn strategy_for(&self, package: &str) -> EvalStrategy {
        let package = package.strip_prefix("data.").unwrap_or(package);
        match self.parent().and_then(|p| p.strip_prefix("data.")) {
            Some(parent) if parent == package => EvalStrategy::Rule,
            _ => EvalStrategy::Query,
        }
    }
}

impl fmt::Display for QueryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
