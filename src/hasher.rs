//! Fingerprints of ledger state using Blake3

use blake3::Hasher as Blake3Hasher;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::LedgerError;

/// Blake3 digest of a bincode-encoded state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateHash(pub [u8; 32]);

impl fmt::Display for StateHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Hashes serializable state deterministically
///
/// The state must use ordered collections for the digest to be stable.
#[derive(Debug, Clone, Default)]
pub struct StateHasher;

impl StateHasher {
    pub fn new() -> Self {
        Self
    }

    /// Compute the fingerprint of a state
    pub fn hash<S: Serialize>(&self, state: &S) -> Result<StateHash, LedgerError> {
        let serialized = bincode::serialize(state).map_err(|e| LedgerError::Checkpoint {
            reason: format!("State encoding failed: {}", e),
        })?;

        let mut hasher = Blake3Hasher::new();
        hasher.update(&serialized);
        Ok(StateHash(*hasher.finalize().as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_hash_consistency() {
        let hasher = StateHasher::new();
        let state = BTreeMap::from([("a", "Bob"), ("b", "Xander")]);

        assert_eq!(hasher.hash(&state).unwrap(), hasher.hash(&state).unwrap());
    }

    #[test]
    fn test_hash_different_states() {
        let hasher = StateHasher::new();
        let first = BTreeMap::from([("a", "Bob")]);
        let second = BTreeMap::from([("a", "Bobb")]);

        assert_ne!(hasher.hash(&first).unwrap(), hasher.hash(&second).unwrap());
    }

    #[test]
    fn test_display_is_hex() {
        let hash = StateHash([0xab; 32]);
        assert_eq!(hash.to_string().len(), 64);
        assert!(hash.to_string().starts_with("abab"));
    }
}
