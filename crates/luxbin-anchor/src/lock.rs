//! Temporal lock descriptors and their compact wire layout
//!
//! The off-chain puzzle encoder packs a lock as
//! `reveal_time (u64 LE) ‖ hash_chain_depth (u32 LE) ‖ initial_commitment (32 bytes)`.
//! `encode`/`decode` follow the same layout so anchored locks can be compared
//! byte-for-byte with what the encoder produced.

use luxbin_types::{AccountId, Digest32, LuxbinError, Result, Timestamp, DIGEST_LEN};
use serde::{Deserialize, Serialize};

/// Length of an encoded lock
pub const ENCODED_LOCK_LEN: usize = 8 + 4 + DIGEST_LEN;

/// A time-bound commitment anchored for one target account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalLock {
    pub target: AccountId,
    pub reveal_time: Timestamp,
    pub hash_chain_depth: u32,
    pub initial_commitment: Digest32,
    pub submitted_by: AccountId,
    pub submitted_at: Timestamp,
}

/// The puzzle fields of a lock, without anchoring metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockPuzzle {
    pub reveal_time: Timestamp,
    pub hash_chain_depth: u32,
    pub initial_commitment: Digest32,
}

impl TemporalLock {
    pub fn puzzle(&self) -> LockPuzzle {
        LockPuzzle {
            reveal_time: self.reveal_time,
            hash_chain_depth: self.hash_chain_depth,
            initial_commitment: self.initial_commitment,
        }
    }

    pub fn encode(&self) -> [u8; ENCODED_LOCK_LEN] {
        self.puzzle().encode()
    }
}

impl LockPuzzle {
    pub fn encode(&self) -> [u8; ENCODED_LOCK_LEN] {
        let mut out = [0u8; ENCODED_LOCK_LEN];
        out[..8].copy_from_slice(&self.reveal_time.to_le_bytes());
        out[8..12].copy_from_slice(&self.hash_chain_depth.to_le_bytes());
        out[12..].copy_from_slice(self.initial_commitment.as_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != ENCODED_LOCK_LEN {
            return Err(LuxbinError::Serialization {
                message: format!(
                    "encoded temporal lock must be {ENCODED_LOCK_LEN} bytes, got {}",
                    bytes.len()
                ),
            });
        }
        let mut reveal = [0u8; 8];
        reveal.copy_from_slice(&bytes[..8]);
        let mut depth = [0u8; 4];
        depth.copy_from_slice(&bytes[8..12]);

        Ok(Self {
            reveal_time: u64::from_le_bytes(reveal),
            hash_chain_depth: u32::from_le_bytes(depth),
            initial_commitment: Digest32::from_slice(&bytes[12..])?,
        })
    }
}
