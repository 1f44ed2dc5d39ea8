//! Decision values produced by evaluation.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};

/// The outcome of evaluating a query against one input document.
///
/// `Undefined` means the query produced no value (no rule body matched and
/// no default exists). It is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum DecisionValue {
    Boolean(bool),
    Json(serde_json::Value),
    Undefined,
}

impl DecisionValue {
    /// Converts an interpreter value into a decision.
    pub fn from_rego(value: regorus::Value) -> Result<Self> {
        match value {
            regorus::Value::Undefined => Ok(DecisionValue::Undefined),
            regorus::Value::Bool(b) => Ok(DecisionValue::Boolean(b)),
            other => serde_json::to_value(&other)
                .map(DecisionValue::Json)
                .map_err(|e| EngineError::QueryEval(format!("unrepresentable result: {}", e))),
        }
    }

    /// Renders the decision as JSON text. `Undefined` renders as `null`.
    pub fn to_json_string(&self) -> String {
        match self {
            DecisionValue::Boolean(true) => "true".to_string(),
            DecisionValue::Boolean(false) => "false".to_string(),
            DecisionValue::Json(value) => value.to_string(),
            DecisionValue::Undefined => "null".to_string(),
        }
    }

    /// Boolean fast path. `Undefined` is treated as `false`; any other
    /// non-boolean decision is a [`EngineError::ResultType`].
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            DecisionValue::Boolean(b) => Ok(*b),
            DecisionValue::Undefined => Ok(false),
            DecisionValue::Json(serde_json::Value::Bool(b)) => Ok(*b),
            DecisionValue::Json(other) => Err(EngineError::ResultType {
                found: json_type_name(other),
            }),
        }
    }

    /// Returns true if the query produced no value.
    pub fn is_undefined(&self) -> bool {
        matches!(self, DecisionValue::Undefined)
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
