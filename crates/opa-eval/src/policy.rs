//! Policy sources and compiled policy snapshots.

use crate::error::{EngineError, Result};
use crate::hash::policy_content_hash;
use crate::query::{EvalStrategy, QueryPath};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide id allocator. Ids are never reused, so per-thread caches keyed
/// by id stay valid across engine instances.
static NEXT_POLICY_ID: AtomicU64 = AtomicU64::new(1);

/// Where a policy module comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicySource {
    /// A `.rego` file on disk.
    File(PathBuf),
    /// Module text held in memory, with a name used in diagnostics.
    Inline { name: String, text: String },
}

impl PolicySource {
    /// Creates a file source.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        PolicySource::File(path.into())
    }

    /// Creates an in-memory source.
    pub fn inline(name: impl Into<String>, text: impl Into<String>) -> Self {
        PolicySource::Inline {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Name the interpreter uses for this module.
    pub fn name(&self) -> String {
        match self {
            PolicySource::File(path) => path.display().to_string(),
            PolicySource::Inline { name, .. } => name.clone(),
        }
    }

    /// Returns the file path, if this source lives on disk.
    pub fn path(&self) -> Option<&Path> {
        match self {
            PolicySource::File(path) => Some(path),
            PolicySource::Inline { .. } => None,
        }
    }

    /// Reads the module text.
    pub fn read(&self) -> Result<String> {
        match self {
            PolicySource::File(path) => {
                std::fs::read_to_string(path).map_err(|source| EngineError::PolicyRead {
                    path: path.clone(),
                    source,
                })
            }
            PolicySource::Inline { text, .. } => Ok(text.clone()),
        }
    }
}

/// Policy text plus everything needed to hash and compile it.
#[derive(Debug, Clone)]
pub struct PolicyInput {
    pub source: PolicySource,
    pub text: String,
    /// Canonical JSON of the data document (sorted keys, no whitespace).
    pub data: Option<String>,
    pub query: QueryPath,
    pub content_hash: String,
}

impl PolicyInput {
    /// Reads the source and normalizes the data document and query.
    pub fn prepare(source: PolicySource, data_json: Option<&str>, query: &str) -> Result<Self> {
        let text = source.read()?;
        let query = QueryPath::parse(query)?;
        let data = data_json.map(canonical_data).transpose()?;
        let content_hash = policy_content_hash(&text, data.as_deref(), query.as_str());
        Ok(Self {
            source,
            text,
            data,
            query,
            content_hash,
        })
    }
}

/// Parses a data document and re-serializes it canonically.
fn canonical_data(data_json: &str) -> Result<String> {
    let value: serde_json::Value = serde_json::from_str(data_json)?;
    if !value.is_object() {
        return Err(EngineError::InvalidData(
            "data document must be a JSON object".to_string(),
        ));
    }
    // serde_json's default map is ordered, so this output is canonical.
    Ok(value.to_string())
}

/// An immutable, validated policy ready for evaluation.
///
/// Holds plain data only. Worker threads build their own interpreter
/// instance from it through [`CompiledPolicy::instantiate`].
#[derive(Debug)]
pub struct CompiledPolicy {
    id: u64,
    name: String,
    path: Option<PathBuf>,
    text: String,
    package: String,
    data: Option<String>,
    query: QueryPath,
    strategy: EvalStrategy,
    content_hash: String,
    loaded_at: DateTime<Utc>,
}

impl CompiledPolicy {
    /// Compiles the module once to validate it and learn its package.
    ///
    /// Parsing alone accepts modules the interpreter rejects later, such as
    /// rules with unsafe variables, so a trivial query is run to force the
    /// semantic analysis before the policy can be published.
    pub fn compile(input: PolicyInput) -> Result<Self> {
        let name = input.source.name();
        let (mut engine, package) = build_interpreter(&name, &input.text, input.data.as_deref())?;
        engine
            .eval_query("true".to_string(), false)
            .map_err(|e| EngineError::PolicyCompile(format!("{e:#}")))?;
        let strategy = input.query.strategy_for(&package);

        Ok(Self {
            id: NEXT_POLICY_ID.fetch_add(1, Ordering::Relaxed),
            path: input.source.path().map(Path::to_path_buf),
            name,
            text: input.text,
            package,
            data: input.data,
            query: input.query,
            strategy,
            content_hash: input.content_hash,
            loaded_at: Utc::now(),
        })
    }

    /// Builds a fresh interpreter with the module and data bound.
    pub fn instantiate(&self) -> Result<regorus::Engine> {
        build_interpreter(&self.name, &self.text, self.data.as_deref()).map(|(engine, _)| engine)
    }

    /// Process-unique id of this snapshot.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Module name (file path or inline name).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the module on disk, if it was loaded from a file.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Package declared by the module, e.g. `data.authz`.
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Canonical data document, if any.
    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }

    pub fn query(&self) -> &QueryPath {
        &self.query
    }

    pub fn strategy(&self) -> EvalStrategy {
        self.strategy
    }

    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Serializable summary of this snapshot.
    pub fn info(&self) -> PolicyInfo {
        PolicyInfo {
            id: self.id,
            name: self.name.clone(),
            package: self.package.clone(),
            query: self.query.to_string(),
            has_data: self.data.is_some(),
            content_hash: self.content_hash.clone(),
            loaded_at: self.loaded_at,
        }
    }
}

/// Metadata about the active policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyInfo {
    pub id: u64,
    pub name: String,
    pub package: String,
    pub query: String,
    pub has_data: bool,
    pub content_hash: String,
    pub loaded_at: DateTime<Utc>,
}

fn build_interpreter(name: &str, text: &str, data: Option<&str>) -> Result<(regorus::Engine, String)> {
    let mut engine = regorus::Engine::new();
    let package = engine
        .add_policy(name.to_string(), text.to_string())
        .map_err(|e| EngineError::PolicyCompile(format!("{e:#}")))?;
    if let Some(data) = data {
        let value = regorus::Value::from_json_str(data)
            .map_err(|e| EngineError::InvalidData(format!("{e:#}")))?;
        engine
            .add_data(value)
            .map_err(|e| EngineError::InvalidData(format!("{e:#}")))?;
    }
    Ok((engine, package))
}
