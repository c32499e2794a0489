//! Ledger notifications
//!
//! Components return the events produced by a successful operation; the
//! service stamps them and broadcasts them to subscribers.

use serde::{Deserialize, Serialize};

use crate::{AccountId, AgentId, AgentKind, Amount, Capability, Digest32, Timestamp};

/// Notification emitted by a successful mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LedgerEvent {
    // ====================================================================
    // Access
    // ====================================================================
    AuthorityTransferred {
        from: AccountId,
        to: AccountId,
    },
    CapabilityGranted {
        account: AccountId,
        capability: Capability,
    },
    CapabilityRevoked {
        account: AccountId,
        capability: Capability,
    },

    // ====================================================================
    // Issuance
    // ====================================================================
    IssuerAuthorized {
        issuer: AccountId,
        daily_limit: Amount,
    },
    IssuerRevoked {
        issuer: AccountId,
    },
    DailyLimitUpdated {
        issuer: AccountId,
        daily_limit: Amount,
    },
    /// One per recipient, also for batched issuance
    Issued {
        issuer: AccountId,
        recipient: AccountId,
        amount: Amount,
    },
    Transferred {
        from: AccountId,
        to: AccountId,
        amount: Amount,
    },
    Paused {
        by: AccountId,
    },
    Unpaused {
        by: AccountId,
    },

    // ====================================================================
    // Registry
    // ====================================================================
    AgentCreated {
        id: AgentId,
        owner: AccountId,
        kind: AgentKind,
    },
    PositiveOutcomeRecorded {
        id: AgentId,
        reputation: i64,
    },
    NegativeOutcomeRecorded {
        id: AgentId,
        reputation: i64,
    },
    ResponseExecuted {
        id: AgentId,
        responses_executed: u64,
    },
    FingerprintSet {
        id: AgentId,
    },
    AgentActivated {
        id: AgentId,
    },
    AgentDeactivated {
        id: AgentId,
    },
    /// Terminal: the id is consumed and never reused
    AgentRetired {
        id: AgentId,
        kind: AgentKind,
        raw_reputation: i64,
    },

    // ====================================================================
    // Anchor
    // ====================================================================
    TemporalLockSubmitted {
        submitter: AccountId,
        target: AccountId,
        reveal_time: Timestamp,
    },
    /// Only on first insertion of a digest
    MemoryRootAnchored {
        submitter: AccountId,
        digest: Digest32,
    },
}

impl LedgerEvent {
    /// Short machine-readable name
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::AuthorityTransferred { .. } => "authority_transferred",
            LedgerEvent::CapabilityGranted { .. } => "capability_granted",
            LedgerEvent::CapabilityRevoked { .. } => "capability_revoked",
            LedgerEvent::IssuerAuthorized { .. } => "issuer_authorized",
            LedgerEvent::IssuerRevoked { .. } => "issuer_revoked",
            LedgerEvent::DailyLimitUpdated { .. } => "daily_limit_updated",
            LedgerEvent::Issued { .. } => "issued",
            LedgerEvent::Transferred { .. } => "transferred",
            LedgerEvent::Paused { .. } => "paused",
            LedgerEvent::Unpaused { .. } => "unpaused",
            LedgerEvent::AgentCreated { .. } => "agent_created",
            LedgerEvent::PositiveOutcomeRecorded { .. } => "positive_outcome_recorded",
            LedgerEvent::NegativeOutcomeRecorded { .. } => "negative_outcome_recorded",
            LedgerEvent::ResponseExecuted { .. } => "response_executed",
            LedgerEvent::FingerprintSet { .. } => "fingerprint_set",
            LedgerEvent::AgentActivated { .. } => "agent_activated",
            LedgerEvent::AgentDeactivated { .. } => "agent_deactivated",
            LedgerEvent::AgentRetired { .. } => "agent_retired",
            LedgerEvent::TemporalLockSubmitted { .. } => "temporal_lock_submitted",
            LedgerEvent::MemoryRootAnchored { .. } => "memory_root_anchored",
        }
    }
}

/// An event stamped with the service sequence number and call time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub sequence: u64,
    pub at: Timestamp,
    pub event: LedgerEvent,
}
