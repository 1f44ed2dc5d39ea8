//! Hashing utilities for policy content identity.

use sha2::{Digest, Sha256};

/// Computes the content identifier of a policy load.
///
/// Covers the module text, the canonical data document and the query, so a
/// change to any of them yields a different identifier. Each part is length
/// prefixed to keep boundaries unambiguous.
pub fn policy_content_hash(source: &str, data: Option<&str>, query: &str) -> String {
    let mut hasher = Sha256::new();
    for part in [Some(source), data, Some(query)] {
        match part {
            Some(text) => {
                hasher.update((text.len() as u64).to_be_bytes());
                hasher.update(text.as_bytes());
            }
            None => hasher.update(u64::MAX.to_be_bytes()),
        }
    }
    format!("c:{}", hex::encode(hasher.finalize()))
}
