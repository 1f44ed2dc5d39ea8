//! Common load/evaluate capability for benchmark comparisons.
//!
//! The in-process engine implements [`PolicyBackend`]; out-of-process
//! baselines (a policy server over HTTP, a CLI subprocess) implement the same
//! trait in the benchmark harness so every backend runs identical scenarios.

use crate::engine::EvaluationEngine;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// A policy evaluator that can be driven by the benchmark harness.
pub trait PolicyBackend: Send + Sync {
    /// Short label used in reports.
    fn name(&self) -> &str;

    /// Loads a policy file with optional external data and a query.
    fn load(&self, path: &Path, data_json: Option<&str>, query: &str) -> Result<()>;

    /// Evaluates the loaded policy and returns the decision as JSON text.
    fn evaluate(&self, input_json: &str) -> Result<String>;
}

impl PolicyBackend for EvaluationEngine {
    fn name(&self) -> &str {
        "in-process"
    }

    fn load(&self, path: &Path, data_json: Option<&str>, query: &str) -> Result<()> {
        self.load_policy(path, data_json, Some(query))
    }

    fn evaluate(&self, input_json: &str) -> Result<String> {
        EvaluationEngine::evaluate(self, input_json)
    }
}

/// Result of a sustained throughput run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Throughput {
    pub backend: String,
    pub workers: usize,
    /// Successful evaluations.
    pub ops: u64,
    /// Evaluations that returned an error. Counted, never propagated.
    pub failures: u64,
    pub elapsed: Duration,
}

impl Throughput {
    /// Successful evaluations per second.
    pub fn ops_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.ops as f64 / secs
    }
}

/// Calls `backend.evaluate(input_json)` from `workers` threads until
/// `duration` has elapsed. A panicking backend panics the caller.
pub fn measure_throughput<B>(
    backend: &B,
    input_json: &str,
    workers: usize,
    duration: Duration,
) -> Throughput
where
    B: PolicyBackend + ?Sized,
{
    let workers = workers.max(1);
    let stop = AtomicBool::new(false);
    let start = Instant::now();

    let counts: Vec<(u64, u64)> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let stop = &stop;
                scope.spawn(move || {
                    let (mut ok, mut failed) = (0u64, 0u64);
                    while !stop.load(Ordering::Relaxed) {
                        match backend.evaluate(input_json) {
                            Ok(_) => ok += 1,
                            Err(_) => failed += 1,
                        }
                    }
                    (ok, failed)
                })
            })
            .collect();

        std::thread::sleep(duration);
        stop.store(true, Ordering::Relaxed);

        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(counts) => counts,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    });

    let elapsed = start.elapsed();
    let (ops, failures) = counts
        .iter()
        .fold((0, 0), |(ok, err), (o, f)| (ok + o, err + f));

    tracing::debug!(
        backend = backend.name(),
        workers,
        ops,
        failures,
        elapsed_ms = elapsed.as_millis() as u64,
        "throughput run finished"
    );

    Throughput {
        backend: backend.name().to_string(),
        workers,
        ops,
        failures,
        elapsed,
    }
}
