//! LUXBIN Registry - Reputation-scored agent records
//!
//! Agents are kept in an arena indexed by a monotonically increasing id.
//! Retirement tags the slot instead of removing it, so ids stay dense and are
//! never handed out twice.
//!
//! # Lifecycle
//!
//! ```text
//! Created → Active ⇄ Inactive → Retired
//! ```
//!
//! Retired is terminal and reachable only through the reputation threshold in
//! [`AgentRegistry::record_negative_outcome`]. Every id-based operation on a
//! retired or unknown id fails with `AgentNotFound`.
//!
//! # Reputation
//!
//! Each record carries two values: the unclamped signed trajectory
//! (`raw_reputation`) and the stored display value (`reputation`), which is
//! the trajectory floored at zero. Retirement is decided on the trajectory.

use std::collections::BTreeMap;

use luxbin_types::{
    AccountId, AgentId, AgentKind, AgentOperation, LedgerEvent, LuxbinError, Result, Timestamp,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

/// Reputation of a freshly created record
pub const INITIAL_REPUTATION: i64 = 100;
/// A trajectory at or below this value retires the record
pub const DESTROY_THRESHOLD: i64 = -20;
/// Reputation gained per confirmed detection
pub const POSITIVE_REWARD: i64 = 1;
/// Reputation lost per incorrect outcome
pub const NEGATIVE_PENALTY: i64 = 5;
/// Largest `n` accepted by [`AgentRegistry::batch_create`]
pub const MAX_BATCH_CREATE: u32 = 100;

/// A simulated detection/response unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: AgentId,
    pub owner: AccountId,
    pub kind: AgentKind,
    /// Display value, never below zero
    pub reputation: i64,
    /// Unclamped trajectory that decides retirement
    pub raw_reputation: i64,
    pub true_positives: u64,
    pub false_positives: u64,
    pub events_handled: u64,
    pub responses_executed: u64,
    pub created_at: Timestamp,
    pub last_active_at: Timestamp,
    pub active: bool,
    pub fingerprint: String,
}

impl AgentRecord {
    fn new(id: AgentId, owner: AccountId, kind: AgentKind, fingerprint: String, now: Timestamp) -> Self {
        Self {
            id,
            owner,
            kind,
            reputation: INITIAL_REPUTATION,
            raw_reputation: INITIAL_REPUTATION,
            true_positives: 0,
            false_positives: 0,
            events_handled: 0,
            responses_executed: 0,
            created_at: now,
            last_active_at: now,
            active: true,
            fingerprint,
        }
    }

    fn set_trajectory(&mut self, raw: i64) {
        self.raw_reputation = raw;
        self.reputation = raw.max(0);
    }
}

/// Arena slot for one id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentSlot {
    Live(AgentRecord),
    Retired {
        record: AgentRecord,
        retired_at: Timestamp,
    },
}

impl AgentSlot {
    pub fn record(&self) -> &AgentRecord {
        match self {
            AgentSlot::Live(record) => record,
            AgentSlot::Retired { record, .. } => record,
        }
    }

    pub fn is_retired(&self) -> bool {
        matches!(self, AgentSlot::Retired { .. })
    }
}

/// Opaque label for batch-created records, unique per (owner, kind, id)
pub fn derive_fingerprint(owner: &AccountId, kind: AgentKind, id: AgentId) -> String {
    let mut hasher = Sha256::new();
    hasher.update(owner.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(kind.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(id.0.to_be_bytes());
    let digest = hasher.finalize();
    format!("fp-{}-{}", id.0, hex::encode(&digest[..8]))
}

/// Registry of agent records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentRegistry {
    /// Slot `i` holds id `i + 1`
    slots: Vec<AgentSlot>,
    kind_counts: BTreeMap<AgentKind, u64>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted slots (in id order) and kind counts
    pub fn restore(slots: Vec<AgentSlot>, kind_counts: BTreeMap<AgentKind, u64>) -> Self {
        Self { slots, kind_counts }
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Create one record and return its id
    pub fn create(
        &mut self,
        owner: &AccountId,
        kind: AgentKind,
        fingerprint: impl Into<String>,
        now: Timestamp,
    ) -> Result<(AgentId, Vec<LedgerEvent>)> {
        owner.validate()?;
        let id = self.next_id();
        self.slots.push(AgentSlot::Live(AgentRecord::new(
            id,
            owner.clone(),
            kind,
            fingerprint.into(),
            now,
        )));
        *self.kind_counts.entry(kind).or_insert(0) += 1;

        Ok((
            id,
            vec![LedgerEvent::AgentCreated {
                id,
                owner: owner.clone(),
                kind,
            }],
        ))
    }

    /// Create `n` consecutive records for one owner and kind
    pub fn batch_create(
        &mut self,
        owner: &AccountId,
        kind: AgentKind,
        n: u32,
        now: Timestamp,
    ) -> Result<(Vec<AgentId>, Vec<LedgerEvent>)> {
        if n == 0 || n > MAX_BATCH_CREATE {
            return Err(LuxbinError::InvalidBatchSize {
                requested: n,
                max: MAX_BATCH_CREATE,
            });
        }
        owner.validate()?;

        let mut ids = Vec::with_capacity(n as usize);
        let mut events = Vec::with_capacity(n as usize);
        for _ in 0..n {
            let id = self.next_id();
            let label = derive_fingerprint(owner, kind, id);
            let (id, mut created) = self.create(owner, kind, label, now)?;
            ids.push(id);
            events.append(&mut created);
        }
        Ok((ids, events))
    }

    // ========================================================================
    // Outcomes
    // ========================================================================

    /// Confirmed-correct detection: Detector only
    ///
    /// A trajectory below zero restarts at the floor, so the stored
    /// reputation always rises by the reward.
    pub fn record_positive_outcome(&mut self, id: AgentId, now: Timestamp) -> Result<Vec<LedgerEvent>> {
        let record = self.live_for(id, AgentOperation::PositiveOutcome)?;
        record.true_positives += 1;
        record.events_handled += 1;
        let raw = record.raw_reputation.max(0).saturating_add(POSITIVE_REWARD);
        record.set_trajectory(raw);
        record.last_active_at = now;

        Ok(vec![LedgerEvent::PositiveOutcomeRecorded {
            id,
            reputation: record.reputation,
        }])
    }

    /// Incorrect outcome: any kind; may retire the record in the same call
    pub fn record_negative_outcome(&mut self, id: AgentId, now: Timestamp) -> Result<Vec<LedgerEvent>> {
        let record = self.live_for(id, AgentOperation::NegativeOutcome)?;
        record.false_positives += 1;
        let raw = record.raw_reputation.saturating_sub(NEGATIVE_PENALTY);
        record.set_trajectory(raw);
        record.last_active_at = now;

        let mut events = vec![LedgerEvent::NegativeOutcomeRecorded {
            id,
            reputation: record.reputation,
        }];
        if raw <= DESTROY_THRESHOLD {
            events.push(self.retire(id, now)?);
        }
        Ok(events)
    }

    /// Response carried out: Defender only
    pub fn record_response_executed(&mut self, id: AgentId, now: Timestamp) -> Result<Vec<LedgerEvent>> {
        let record = self.live_for(id, AgentOperation::ResponseExecuted)?;
        record.responses_executed += 1;
        record.last_active_at = now;

        Ok(vec![LedgerEvent::ResponseExecuted {
            id,
            responses_executed: record.responses_executed,
        }])
    }

    fn retire(&mut self, id: AgentId, now: Timestamp) -> Result<LedgerEvent> {
        let slot = Self::slot_index(id)
            .and_then(|index| self.slots.get_mut(index))
            .ok_or(LuxbinError::AgentNotFound { id })?;
        let record = slot.record().clone();
        let kind = record.kind;
        let raw_reputation = record.raw_reputation;
        *slot = AgentSlot::Retired {
            record,
            retired_at: now,
        };
        if let Some(count) = self.kind_counts.get_mut(&kind) {
            *count = count.saturating_sub(1);
        }
        info!(agent = %id, %kind, raw_reputation, "Agent retired");

        Ok(LedgerEvent::AgentRetired {
            id,
            kind,
            raw_reputation,
        })
    }

    // ========================================================================
    // Administration
    // ========================================================================

    pub fn set_fingerprint(&mut self, id: AgentId, fingerprint: impl Into<String>) -> Result<Vec<LedgerEvent>> {
        let record = self.live_mut(id)?;
        record.fingerprint = fingerprint.into();
        Ok(vec![LedgerEvent::FingerprintSet { id }])
    }

    pub fn activate(&mut self, id: AgentId, now: Timestamp) -> Result<Vec<LedgerEvent>> {
        let record = self.live_mut(id)?;
        record.active = true;
        record.last_active_at = now;
        Ok(vec![LedgerEvent::AgentActivated { id }])
    }

    pub fn deactivate(&mut self, id: AgentId, now: Timestamp) -> Result<Vec<LedgerEvent>> {
        let record = self.live_mut(id)?;
        record.active = false;
        record.last_active_at = now;
        Ok(vec![LedgerEvent::AgentDeactivated { id }])
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Live, active ids owned by `owner` of `kind`, in creation order
    pub fn active_by_owner_and_kind(&self, owner: &AccountId, kind: AgentKind) -> Vec<AgentId> {
        self.live_records()
            .filter(|r| r.active && r.kind == kind && &r.owner == owner)
            .map(|r| r.id)
            .collect()
    }

    /// Live ids owned by `owner`, in creation order
    pub fn agents_of_owner(&self, owner: &AccountId) -> Vec<AgentId> {
        self.live_records()
            .filter(|r| &r.owner == owner)
            .map(|r| r.id)
            .collect()
    }

    /// The live record for `id`; retired and unknown ids both read as `None`
    pub fn agent(&self, id: AgentId) -> Option<&AgentRecord> {
        match self.slot(id)? {
            AgentSlot::Live(record) => Some(record),
            AgentSlot::Retired { .. } => None,
        }
    }

    /// The arena slot for `id`, including retired ones
    pub fn slot(&self, id: AgentId) -> Option<&AgentSlot> {
        self.slots.get(Self::slot_index(id)?)
    }

    /// Arena index of `id`; ids start at 1
    fn slot_index(id: AgentId) -> Option<usize> {
        id.0.checked_sub(1).and_then(|index| usize::try_from(index).ok())
    }

    pub fn kind_count(&self, kind: AgentKind) -> u64 {
        self.kind_counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn kind_counts(&self) -> &BTreeMap<AgentKind, u64> {
        &self.kind_counts
    }

    /// The id the next created record will receive
    pub fn next_id(&self) -> AgentId {
        AgentId(self.slots.len() as u64 + 1)
    }

    pub fn live_count(&self) -> usize {
        self.live_records().count()
    }

    pub fn slots(&self) -> &[AgentSlot] {
        &self.slots
    }

    fn live_records(&self) -> impl Iterator<Item = &AgentRecord> {
        self.slots.iter().filter_map(|slot| match slot {
            AgentSlot::Live(record) => Some(record),
            AgentSlot::Retired { .. } => None,
        })
    }

    fn live_mut(&mut self, id: AgentId) -> Result<&mut AgentRecord> {
        let slot = Self::slot_index(id).and_then(|index| self.slots.get_mut(index));
        match slot {
            Some(AgentSlot::Live(record)) => Ok(record),
            _ => Err(LuxbinError::AgentNotFound { id }),
        }
    }

    fn live_for(&mut self, id: AgentId, operation: AgentOperation) -> Result<&mut AgentRecord> {
        let record = self.live_mut(id)?;
        if !record.kind.allows(operation) {
            return Err(LuxbinError::InvalidKindForOperation {
                id,
                kind: record.kind,
                operation,
            });
        }
        Ok(record)
    }
}
