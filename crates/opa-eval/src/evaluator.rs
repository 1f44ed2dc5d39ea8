//! Query execution against a compiled policy snapshot.

use crate::decision::DecisionValue;
use crate::error::{EngineError, Result};
use crate::policy::CompiledPolicy;
use crate::query::EvalStrategy;
use std::cell::RefCell;

thread_local! {
    // One prepared interpreter per thread, tagged with the id of the policy
    // it was built from. Only module and data are cached, never input.
    static PREPARED: RefCell<Option<(u64, regorus::Engine)>> = const { RefCell::new(None) };
}

/// Runs a snapshot's query against input documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct Evaluator;

impl Evaluator {
    /// Creates a new evaluator.
    pub fn new() -> Self {
        Self
    }

    /// Evaluates `policy`'s query with `input_json` bound as `input`.
    pub fn run(&self, policy: &CompiledPolicy, input_json: &str) -> Result<DecisionValue> {
        let input = regorus::Value::from_json_str(input_json)
            .map_err(|e| EngineError::InputParse(format!("{e:#}")))?;

        PREPARED.with(|cell| {
            let mut slot = cell.borrow_mut();
            let mut engine = match slot.take() {
                Some((id, engine)) if id == policy.id() => engine,
                _ => {
                    tracing::debug!(policy_id = policy.id(), "preparing interpreter for thread");
                    policy.instantiate()?
                }
            };

            let result = execute(&mut engine, policy, input);
            *slot = Some((policy.id(), engine));
            result
        })
    }
}

fn execute(
    engine: &mut regorus::Engine,
    policy: &CompiledPolicy,
    input: regorus::Value,
) -> Result<DecisionValue> {
    engine.set_input(input);
    let query = policy.query().as_str().to_string();

    let value = match policy.strategy() {
        EvalStrategy::Rule => engine
            .eval_rule(query)
            .map_err(|e| EngineError::QueryEval(format!("{e:#}")))?,
        EvalStrategy::Query => {
            let results = engine
                .eval_query(query, false)
                .map_err(|e| EngineError::QueryEval(format!("{e:#}")))?;
            results
                .result
                .into_iter()
                .next()
                .and_then(|r| r.expressions.into_iter().next())
                .map(|expr| expr.value)
                .unwrap_or(regorus::Value::Undefined)
        }
    };

    DecisionValue::from_rego(value)
}
