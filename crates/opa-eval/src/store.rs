//! Active policy slot with serialized reloads and atomic swaps.
//!
//! Reads take the slot lock only long enough to clone an `Arc`. Reloads read
//! and compile with no slot lock held and take the write lock only to replace
//! the pointer, so evaluation never waits on a compile. A failed reload leaves
//! the active policy untouched.

use crate::error::Result;
use crate::policy::{CompiledPolicy, PolicyInput, PolicySource};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// What a successful load did to the active slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A new snapshot was published.
    Replaced,
    /// Content matched the active snapshot; nothing was published.
    Unchanged,
}

/// Reload counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReloadStats {
    pub reload_count: u64,
    pub reload_fail_count: u64,
    pub reload_skip_count: u64,
    /// Id of the active snapshot, if any.
    pub active_id: Option<u64>,
}

/// Owns the currently active [`CompiledPolicy`].
#[derive(Debug, Default)]
pub struct PolicyStore {
    active: RwLock<Option<Arc<CompiledPolicy>>>,
    /// Serializes loads against each other.
    reload_lock: Mutex<()>,
    reload_count: AtomicU64,
    reload_fail_count: AtomicU64,
    reload_skip_count: AtomicU64,
}

impl PolicyStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the active policy.
    pub fn current(&self) -> Option<Arc<CompiledPolicy>> {
        self.active.read().clone()
    }

    /// Loads a policy and publishes it.
    ///
    /// With `skip_unchanged`, a load whose content hash equals the active
    /// snapshot's returns [`LoadOutcome::Unchanged`] without recompiling.
    pub fn load(
        &self,
        source: PolicySource,
        data_json: Option<&str>,
        query: &str,
        skip_unchanged: bool,
    ) -> Result<LoadOutcome> {
        let _guard = self.reload_lock.lock();
        let result = self.load_locked(source, data_json, query, skip_unchanged);
        if let Err(e) = &result {
            self.reload_fail_count.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(error = %e, "policy load failed, keeping active policy");
        }
        result
    }

    fn load_locked(
        &self,
        source: PolicySource,
        data_json: Option<&str>,
        query: &str,
        skip_unchanged: bool,
    ) -> Result<LoadOutcome> {
        let input = PolicyInput::prepare(source, data_json, query)?;
        let previous = self.current();

        if skip_unchanged {
            if let Some(active) = &previous {
                if active.content_hash() == input.content_hash {
                    self.reload_skip_count.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(
                        content_hash = %input.content_hash,
                        "policy unchanged, skipping reload"
                    );
                    return Ok(LoadOutcome::Unchanged);
                }
            }
        }

        let compiled = Arc::new(CompiledPolicy::compile(input)?);
        let new_id = compiled.id();
        let new_hash = compiled.content_hash().to_string();
        let query = compiled.query().to_string();

        let old = self.active.write().replace(compiled);
        let reload_count = self.reload_count.fetch_add(1, Ordering::Relaxed) + 1;

        tracing::info!(
            old_hash = old.as_ref().map(|p| p.content_hash()).unwrap_or("none"),
            new_hash = %new_hash,
            policy_id = new_id,
            query = %query,
            reload_count,
            "policy loaded"
        );

        Ok(LoadOutcome::Replaced)
    }

    /// Returns the reload counters.
    pub fn stats(&self) -> ReloadStats {
        ReloadStats {
            reload_count: self.reload_count.load(Ordering::Relaxed),
            reload_fail_count: self.reload_fail_count.load(Ordering::Relaxed),
            reload_skip_count: self.reload_skip_count.load(Ordering::Relaxed),
            active_id: self.current().map(|p| p.id()),
        }
    }
}
