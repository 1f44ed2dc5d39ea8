//! opa-eval
//!
//! An embeddable Rego policy evaluation engine. A policy module (with an
//! optional external data document) is validated once, then a fixed query is
//! evaluated against JSON input documents from any number of threads. Policies
//! can be hot reloaded while evaluations are in flight: every evaluation runs
//! against one complete snapshot, either the old policy or the new one.
//!
//! Rego itself is interpreted by [`regorus`]; this crate manages snapshots,
//! reloads and the evaluation contract around it.

pub mod backend;
pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod hash;
pub mod policy;
pub mod query;
pub mod store;

pub use backend::{measure_throughput, PolicyBackend, Throughput};
pub use config::EngineConfig;
pub use decision::DecisionValue;
pub use engine::EvaluationEngine;
pub use error::{EngineError, ErrorKind, Result};
pub use policy::{CompiledPolicy, PolicyInfo, PolicySource};
pub use store::{LoadOutcome, PolicyStore, ReloadStats};

/// Version of the evaluation engine.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::decision::DecisionValue;
    pub use crate::engine::EvaluationEngine;
    pub use crate::error::{EngineError, ErrorKind, Result};
    pub use crate::policy::PolicySource;
    pub use crate::store::LoadOutcome;
}
