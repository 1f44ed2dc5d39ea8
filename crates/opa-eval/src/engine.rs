//! The public evaluation façade.

use crate::config::EngineConfig;
use crate::decision::DecisionValue;
use crate::error::{EngineError, Result};
use crate::evaluator::Evaluator;
use crate::policy::{PolicyInfo, PolicySource};
use crate::store::{LoadOutcome, PolicyStore, ReloadStats};
use std::path::Path;

/// Loads a Rego policy once and evaluates it against many inputs.
///
/// Safe to share across threads. Each instance owns its own policy slot, so
/// several engines can coexist in one process.
///
/// ```rust,ignore
/// let engine = EvaluationEngine::new();
/// engine.load_policy("authz.rego", None, Some("data.authz.allow"))?;
/// assert!(engine.evaluate_parsed(r#"{"role": "admin"}"#)?);
/// ```
#[derive(Debug, Default)]
pub struct EvaluationEngine {
    store: PolicyStore,
    evaluator: Evaluator,
    config: EngineConfig,
}

impl EvaluationEngine {
    /// Creates an engine with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine with a validated configuration.
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store: PolicyStore::new(),
            evaluator: Evaluator::new(),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Loads a `.rego` file, optionally with an external data document, and
    /// makes it the active policy. `query` falls back to the configured
    /// default.
    ///
    /// On failure the previously active policy keeps serving.
    pub fn load_policy(
        &self,
        path: impl AsRef<Path>,
        data_json: Option<&str>,
        query: Option<&str>,
    ) -> Result<()> {
        self.load_policy_source(PolicySource::file(path.as_ref()), data_json, query)
            .map(|_| ())
    }

    /// Loads a policy from any source and reports whether it was published.
    pub fn load_policy_source(
        &self,
        source: PolicySource,
        data_json: Option<&str>,
        query: Option<&str>,
    ) -> Result<LoadOutcome> {
        let query = query.unwrap_or(&self.config.default_query);
        self.store
            .load(source, data_json, query, self.config.skip_unchanged)
    }

    /// Re-reads the active policy's file with the same data and query.
    ///
    /// Honours `skip_unchanged` like any other load. Inline policies have
    /// nothing to re-read and report `Unchanged`.
    pub fn refresh(&self) -> Result<LoadOutcome> {
        let active = self.store.current().ok_or(EngineError::NoPolicyLoaded)?;
        let Some(path) = active.path() else {
            return Ok(LoadOutcome::Unchanged);
        };
        self.store.load(
            PolicySource::file(path),
            active.data(),
            active.query().as_str(),
            self.config.skip_unchanged,
        )
    }

    /// Evaluates the active policy and returns the decision as JSON text.
    /// An undefined decision is rendered as `null`.
    pub fn evaluate(&self, input_json: &str) -> Result<String> {
        self.evaluate_decision(input_json)
            .map(|decision| decision.to_json_string())
    }

    /// Evaluates the active policy and returns its boolean decision.
    /// An undefined decision is `false`.
    pub fn evaluate_parsed(&self, input_json: &str) -> Result<bool> {
        self.evaluate_decision(input_json)?.as_bool()
    }

    /// Evaluates the active policy and returns the tagged decision.
    pub fn evaluate_decision(&self, input_json: &str) -> Result<DecisionValue> {
        let policy = self.store.current().ok_or(EngineError::NoPolicyLoaded)?;
        self.evaluator.run(&policy, input_json)
    }

    /// Metadata about the active policy.
    pub fn policy_info(&self) -> Option<PolicyInfo> {
        self.store.current().map(|p| p.info())
    }

    /// Reload counters.
    pub fn stats(&self) -> ReloadStats {
        self.store.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const RBAC: &str = r#"
package rbac

import rego.v1

default allow := false

allow if {
    role := data.roles[input.user]
    role == "admin"
}
"#;

    #[test]
    fn test_evaluate_before_load() {
        let engine = EvaluationEngine::new();
        let err = engine.evaluate("{}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoPolicy);
        assert!(engine.evaluate_parsed("{}").is_err());
        assert!(engine.refresh().is_err());
        assert!(engine.policy_info().is_none());
    }

    #[test]
    fn test_inline_with_data() {
        let engine = EvaluationEngine::new();
        let outcome = engine
            .load_policy_source(
                PolicySource::inline("rbac.rego", RBAC),
                Some(r#"{"roles": {"alice": "admin", "bob": "viewer"}}"#),
                Some("data.rbac.allow"),
            )
            .unwrap();
        assert_eq!(outcome, LoadOutcome::Replaced);
        assert!(engine.evaluate_parsed(r#"{"user": "alice"}"#).unwrap());
        assert!(!engine.evaluate_parsed(r#"{"user": "bob"}"#).unwrap());
        assert!(!engine.evaluate_parsed(r#"{"user": "unknown"}"#).unwrap());

        let info = engine.policy_info().unwrap();
        assert_eq!(info.query, "data.rbac.allow");
        assert!(info.has_data);
        // Inline sources cannot be refreshed from disk.
        assert_eq!(engine.refresh().unwrap(), LoadOutcome::Unchanged);
    }

    #[test]
    fn test_default_query_from_config() {
        let config = EngineConfig {
            default_query: "data.rbac.allow".to_string(),
            ..EngineConfig::default()
        };
        let engine = EvaluationEngine::with_config(config).unwrap();
        engine
            .load_policy_source(
                PolicySource::inline("rbac.rego", RBAC),
                Some(r#"{"roles": {"alice": "admin"}}"#),
                None,
            )
            .unwrap();
        assert_eq!(engine.evaluate(r#"{"user": "alice"}"#).unwrap(), "true");
    }

    #[test]
    fn test_parsed_rejects_non_boolean() {
        let engine = EvaluationEngine::new();
        engine
            .load_policy_source(PolicySource::inline("rbac.rego", RBAC), None, Some("data.rbac"))
            .unwrap();
        let err = engine.evaluate_parsed("{}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResultType);
    }

    #[test]
    fn test_engines_are_isolated() {
        let a = EvaluationEngine::new();
        let b = EvaluationEngine::new();
        a.load_policy_source(
            PolicySource::inline("rbac.rego", RBAC),
            Some(r#"{"roles": {"alice": "admin"}}"#),
            Some("data.rbac.allow"),
        )
        .unwrap();
        b.load_policy_source(
            PolicySource::inline("rbac.rego", RBAC),
            Some(r#"{"roles": {"alice": "viewer"}}"#),
            Some("data.rbac.allow"),
        )
        .unwrap();

        let input = r#"{"user": "alice"}"#;
        for _ in 0..3 {
            assert!(a.evaluate_parsed(input).unwrap());
            assert!(!b.evaluate_parsed(input).unwrap());
        }
    }

    #[test]
    fn test_refresh_honours_skip_unchanged() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, RBAC.as_bytes()).unwrap();

        let config = EngineConfig {
            skip_unchanged: false,
            ..EngineConfig::default()
        };
        let engine = EvaluationEngine::with_config(config).unwrap();
        engine.load_policy(file.path(), None, Some("data.rbac.allow")).unwrap();
        let before = engine.policy_info().unwrap().id;

        assert_eq!(engine.refresh().unwrap(), LoadOutcome::Replaced);
        assert_ne!(engine.policy_info().unwrap().id, before);
        assert_eq!(engine.stats().reload_skip_count, 0);
    }

    #[test]
    fn test_invalid_config() {
        let config = EngineConfig {
            default_query: "nope".to_string(),
            ..EngineConfig::default()
        };
        let err = EvaluationEngine::with_config(config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
