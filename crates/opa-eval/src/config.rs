//! Engine configuration.

use crate::error::{EngineError, Result};
use crate::query::QueryPath;
use serde::{Deserialize, Serialize};

/// Environment variable overriding [`EngineConfig::default_query`].
pub const ENV_DEFAULT_QUERY: &str = "OPA_EVAL_DEFAULT_QUERY";

/// Environment variable overriding [`EngineConfig::skip_unchanged`].
pub const ENV_SKIP_UNCHANGED: &str = "OPA_EVAL_SKIP_UNCHANGED";

/// Configuration for an [`EvaluationEngine`](crate::EvaluationEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Query used when `load_policy` is called without one.
    pub default_query: String,

    /// Skip recompiling when a load has the same content hash as the active
    /// policy.
    pub skip_unchanged: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_query: "data".to_string(),
            skip_unchanged: true,
        }
    }
}

impl EngineConfig {
    /// Parses a configuration from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: EngineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(query) = lookup(ENV_DEFAULT_QUERY) {
            self.default_query = query;
        }
        if let Some(raw) = lookup(ENV_SKIP_UNCHANGED) {
            self.skip_unchanged = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                other => {
                    return Err(EngineError::Config(format!(
                        "{} must be a boolean, got '{}'",
                        ENV_SKIP_UNCHANGED, other
                    )))
                }
            };
        }
        self.validate()?;
        Ok(self)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        QueryPath::parse(&self.default_query)
            .map(|_| ())
            .map_err(|e| EngineError::Config(format!("default_query: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.default_query, "data");
        assert!(config.skip_unchanged);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_yaml() {
        let config = EngineConfig::from_yaml("default_query: data.authz.allow\n").unwrap();
        assert_eq!(config.default_query, "data.authz.allow");
        assert!(config.skip_unchanged);
    }

    #[test]
    fn test_from_json() {
        let config = EngineConfig::from_json(r#"{"skip_unchanged": false}"#).unwrap();
        assert!(!config.skip_unchanged);
        assert!(EngineConfig::from_json(r#"{"unknown": 1}"#).is_err());
    }

    #[test]
    fn test_rejects_bad_query() {
        let err = EngineConfig::from_yaml("default_query: input.role\n").unwrap_err();
        assert!(err.to_string().contains("invalid configuration"));
    }

    #[test]
    fn test_env_overrides() {
        // Only this test touches these variables.
        std::env::set_var(ENV_DEFAULT_QUERY, "data.authz.allow");
        std::env::set_var(ENV_SKIP_UNCHANGED, "false");
        let result = EngineConfig::default().with_env_overrides();
        std::env::remove_var(ENV_DEFAULT_QUERY);
        std::env::remove_var(ENV_SKIP_UNCHANGED);

        let config = result.unwrap();
        assert_eq!(config.default_query, "data.authz.allow");
        assert!(!config.skip_unchanged);

        assert_eq!(
            EngineConfig::default().with_env_overrides().unwrap(),
            EngineConfig::default()
        );
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_DEFAULT_QUERY, "data.rbac.allow"),
            (ENV_SKIP_UNCHANGED, "off"),
        ]
        .into_iter()
        .collect();
        let config = EngineConfig::default()
            .with_overrides(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.default_query, "data.rbac.allow");
        assert!(!config.skip_unchanged);

        let err = EngineConfig::default()
            .with_overrides(|name| (name == ENV_SKIP_UNCHANGED).then(|| "maybe".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_SKIP_UNCHANGED));
    }
}
