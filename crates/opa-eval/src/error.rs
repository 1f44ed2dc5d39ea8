//! Error types for the evaluation engine.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Coarse classification of an [`EngineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The policy source could not be read.
    Read,
    /// The policy, its data document or its query was rejected at load time.
    Compile,
    /// Evaluation was attempted before any successful load.
    NoPolicy,
    /// The input document is not valid JSON.
    InputParse,
    /// The interpreter failed while evaluating the query.
    Eval,
    /// A boolean was requested but the decision has another type.
    ResultType,
    /// Engine configuration is invalid.
    Config,
}

/// Errors that can occur while loading or evaluating a policy.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Policy file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    PolicyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Policy module failed to parse or compile.
    #[error("invalid policy: {0}")]
    PolicyCompile(String),

    /// External data document is malformed.
    #[error("invalid data document: {0}")]
    InvalidData(String),

    /// Query path is malformed.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// No policy has been loaded yet.
    #[error("no policy loaded: call load_policy() first")]
    NoPolicyLoaded,

    /// Input document is not valid JSON.
    #[error("failed to parse input: {0}")]
    InputParse(String),

    /// Query evaluation failed inside the interpreter.
    #[error("evaluation failed: {0}")]
    QueryEval(String),

    /// Boolean fast path requested on a non-boolean decision.
    #[error("result is not a boolean: got {found}")]
    ResultType { found: &'static str },

    /// Engine configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl EngineError {
    /// Returns the structured kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::PolicyRead { .. } => ErrorKind::Read,
            EngineError::PolicyCompile(_)
            | EngineError::InvalidData(_)
            | EngineError::InvalidQuery(_) => ErrorKind::Compile,
            EngineError::NoPolicyLoaded => ErrorKind::NoPolicy,
            EngineError::InputParse(_) => ErrorKind::InputParse,
            EngineError::QueryEval(_) => ErrorKind::Eval,
            EngineError::ResultType { .. } => ErrorKind::ResultType,
            EngineError::Config(_) => ErrorKind::Config,
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::InvalidData(err.to_string())
    }
}

impl From<serde_yaml::Error> for EngineError {
    fn from(err: serde_yaml::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

impl From<regex::Error> for EngineError {
    fn from(err: regex::Error) -> Self {
        EngineError::InvalidQuery(format!("Invalid pattern: {}", err))
    }
}
