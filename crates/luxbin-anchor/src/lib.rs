//! LUXBIN Anchor - Storage for off-chain computed commitments
//!
//! Two deliberately separate structures:
//!
//! - **Temporal locks**: one slot per target account, last write wins.
//! - **Memory roots**: a content-addressed set, insert-if-absent.
//!
//! Nothing here verifies a hash chain or a Merkle proof. The anchor stores
//! what was submitted so it can be checked off-chain later.

pub mod lock;

use std::collections::{BTreeMap, HashMap};

use luxbin_types::{AccountId, Digest32, LedgerEvent, Result, Timestamp};
use serde::{Deserialize, Serialize};

pub use lock::{LockPuzzle, TemporalLock, ENCODED_LOCK_LEN};

/// An anchored memory root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRoot {
    pub digest: Digest32,
}

/// First submission of a memory root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchoredRoot {
    pub root: MemoryRoot,
    pub anchored_by: AccountId,
    pub anchored_at: Timestamp,
}

/// Last-write-wins slot per target account
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemporalLockSlots {
    slots: HashMap<AccountId, TemporalLock>,
}

impl TemporalLockSlots {
    /// Store `lock`, replacing any previous lock for the same target
    pub fn put(&mut self, lock: TemporalLock) -> Option<TemporalLock> {
        self.slots.insert(lock.target.clone(), lock)
    }

    pub fn get(&self, target: &AccountId) -> Option<&TemporalLock> {
        self.slots.get(target)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TemporalLock> {
        self.slots.values()
    }
}

/// Insert-if-absent set keyed by the digest itself
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryRootSet {
    roots: BTreeMap<Digest32, AnchoredRoot>,
}

impl MemoryRootSet {
    /// Returns `true` only when `entry` was not present before
    pub fn insert_if_absent(&mut self, entry: AnchoredRoot) -> bool {
        let digest = entry.root.digest;
        if self.roots.contains_key(&digest) {
            return false;
        }
        self.roots.insert(digest, entry);
        true
    }

    pub fn get(&self, digest: &Digest32) -> Option<&AnchoredRoot> {
        self.roots.get(digest)
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnchoredRoot> {
        self.roots.values()
    }
}

/// The attestation anchor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttestationAnchor {
    locks: TemporalLockSlots,
    roots: MemoryRootSet,
}

impl AttestationAnchor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted locks and roots
    pub fn restore(
        locks: impl IntoIterator<Item = TemporalLock>,
        roots: impl IntoIterator<Item = AnchoredRoot>,
    ) -> Self {
        let mut anchor = Self::new();
        for lock in locks {
            anchor.locks.put(lock);
        }
        for root in roots {
            anchor.roots.insert_if_absent(root);
        }
        anchor
    }

    /// Anchor a time-locked puzzle descriptor for `target`
    ///
    /// Public primitive: any valid account may submit, and a new submission
    /// replaces the previous lock for the same target.
    pub fn submit_temporal_lock(
        &mut self,
        caller: &AccountId,
        target: &AccountId,
        reveal_time: Timestamp,
        hash_chain_depth: u32,
        initial_commitment: &[u8],
        now: Timestamp,
    ) -> Result<Vec<LedgerEvent>> {
        caller.validate()?;
        target.validate()?;
        let initial_commitment = Digest32::from_slice(initial_commitment)?;

        self.locks.put(TemporalLock {
            target: target.clone(),
            reveal_time,
            hash_chain_depth,
            initial_commitment,
            submitted_by: caller.clone(),
            submitted_at: now,
        });

        Ok(vec![LedgerEvent::TemporalLockSubmitted {
            submitter: caller.clone(),
            target: target.clone(),
            reveal_time,
        }])
    }

    /// Anchor a memory root; repeat submissions are silent no-ops
    pub fn attest_memory_root(
        &mut self,
        caller: &AccountId,
        digest: &[u8],
        now: Timestamp,
    ) -> Result<Vec<LedgerEvent>> {
        caller.validate()?;
        let digest = Digest32::from_slice(digest)?;

        let inserted = self.roots.insert_if_absent(AnchoredRoot {
            root: MemoryRoot { digest },
            anchored_by: caller.clone(),
            anchored_at: now,
        });
        if !inserted {
            return Ok(Vec::new());
        }

        Ok(vec![LedgerEvent::MemoryRootAnchored {
            submitter: caller.clone(),
            digest,
        }])
    }

    pub fn temporal_lock(&self, target: &AccountId) -> Option<&TemporalLock> {
        self.locks.get(target)
    }

    pub fn memory_root(&self, digest: &Digest32) -> Option<&AnchoredRoot> {
        self.roots.get(digest)
    }

    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }

    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    pub fn locks(&self) -> &TemporalLockSlots {
        &self.locks
    }

    pub fn roots(&self) -> &MemoryRootSet {
        &self.roots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use luxbin_types::LuxbinError;

    fn account(name: &str) -> AccountId {
        AccountId::from(name)
    }

    #[test]
    fn test_lock_overwrite() {
        let mut anchor = AttestationAnchor::new();
        let target = account("vault-7");

        anchor
            .submit_temporal_lock(&account("alice"), &target, 1_000, 64, &[1u8; 32], 10)
            .unwrap();
        anchor
            .submit_temporal_lock(&account("bob"), &target, 2_000, 128, &[2u8; 32], 20)
            .unwrap();

        let lock = anchor.temporal_lock(&target).unwrap();
        assert_eq!(lock.reveal_time, 2_000);
        assert_eq!(lock.hash_chain_depth, 128);
        assert_eq!(lock.initial_commitment, Digest32([2u8; 32]));
        assert_eq!(lock.submitted_by, account("bob"));
        assert_eq!(anchor.lock_count(), 1);
    }

    #[test]
    fn test_lock_commitment_width() {
        let mut anchor = AttestationAnchor::new();
        let result =
            anchor.submit_temporal_lock(&account("alice"), &account("t"), 0, 1, &[0u8; 20], 0);
        assert!(matches!(
            result,
            Err(LuxbinError::InvalidCommitmentSize { expected: 32, actual: 20 })
        ));
        assert!(anchor.temporal_lock(&account("t")).is_none());
    }

    #[test]
    fn test_memory_root_idempotent() {
        let mut anchor = AttestationAnchor::new();
        let digest = [9u8; 32];

        let first = anchor.attest_memory_root(&account("alice"), &digest, 5).unwrap();
        assert_eq!(first.len(), 1);

        let second = anchor.attest_memory_root(&account("bob"), &digest, 6).unwrap();
        assert!(second.is_empty());
        assert_eq!(anchor.root_count(), 1);

        // the first submission is kept
        let stored = anchor.memory_root(&Digest32(digest)).unwrap();
        assert_eq!(stored.anchored_by, account("alice"));
        assert_eq!(stored.anchored_at, 5);
    }

    #[test]
    fn test_absent_reads_are_empty() {
        let anchor = AttestationAnchor::new();
        assert!(anchor.temporal_lock(&account("nobody")).is_none());
        assert!(anchor.memory_root(&Digest32([0u8; 32])).is_none());
    }

    #[test]
    fn test_invalid_submitter() {
        let mut anchor = AttestationAnchor::new();
        let result = anchor.attest_memory_root(&account(""), &[1u8; 32], 0);
        assert!(matches!(result, Err(LuxbinError::InvalidAddressOrAccount { .. })));
    }

    #[test]
    fn test_restore() {
        let mut anchor = AttestationAnchor::new();
        anchor
            .submit_temporal_lock(&account("a"), &account("t"), 1, 2, &[3u8; 32], 4)
            .unwrap();
        anchor.attest_memory_root(&account("a"), &[5u8; 32], 6).unwrap();

        let restored = AttestationAnchor::restore(
            anchor.locks().iter().cloned(),
            anchor.roots().iter().cloned(),
        );
        assert_eq!(restored.temporal_lock(&account("t")), anchor.temporal_lock(&account("t")));
        assert_eq!(restored.root_count(), 1);
    }

    #[test]
    fn test_anchor_serializes() {
        let mut anchor = AttestationAnchor::new();
        anchor
            .submit_temporal_lock(&account("alice"), &account("vault"), 500, 32, &[6u8; 32], 7)
            .unwrap();
        anchor.attest_memory_root(&account("alice"), &[8u8; 32], 9).unwrap();

        let json = serde_json::to_string(&anchor).unwrap();
        let back: AttestationAnchor = serde_json::from_str(&json).unwrap();
        assert_eq!(back.temporal_lock(&account("vault")), anchor.temporal_lock(&account("vault")));
        let root = back.memory_root(&Digest32([8u8; 32])).unwrap();
        assert_eq!(root.anchored_by, account("alice"));
        assert_eq!(root.anchored_at, 9);
        assert_eq!(back.lock_count(), 1);
        assert_eq!(back.root_count(), 1);
    }
}
