//! Composite ledger state and its persisted layout
//!
//! Key layout per collection:
//!
//! | collection | key                    | value             |
//! |------------|------------------------|-------------------|
//! | balances   | `<account>`            | `Amount`          |
//! | issuers    | `entry/<account>`      | `IssuerEntry`     |
//! | issuers    | `window/<account>`     | `IssuanceWindow`  |
//! | agents     | `slot/<id, 20 digits>` | `AgentSlot`       |
//! | agents     | `kind/<kind>`          | live count        |
//! | agents     | `next_id`              | id counter        |
//! | anchors    | `lock/<account>`       | `TemporalLock`    |
//! | anchors    | `root/<hex digest>`    | `AnchoredRoot`    |
//! | meta       | `params`, `total_issued`, `paused`, `authority`, `cap/<account>` |

use std::collections::{BTreeMap, BTreeSet, HashMap};

use luxbin_anchor::{AnchoredRoot, AttestationAnchor, TemporalLock};
use luxbin_ledger::{IssuanceLedger, IssuanceWindow, IssuerEntry, LedgerParams};
use luxbin_registry::{AgentRegistry, AgentSlot};
use luxbin_types::{
    AccountId, AgentId, AgentKind, Amount, Capability, Digest32, LedgerEvent, LuxbinError, Result,
};
use serde::{Deserialize, Serialize};

use crate::access::AccessController;
use crate::store::{Collection, Snapshot, StateDelta};

const ENTRY: &str = "entry/";
const WINDOW: &str = "window/";
const SLOT: &str = "slot/";
const KIND: &str = "kind/";
const NEXT_ID: &str = "next_id";
const LOCK: &str = "lock/";
const ROOT: &str = "root/";
const PARAMS: &str = "params";
const TOTAL_ISSUED: &str = "total_issued";
const PAUSED: &str = "paused";
const AUTHORITY: &str = "authority";
const CAP: &str = "cap/";

fn slot_key(id: AgentId) -> String {
    format!("{SLOT}{:020}", id.0)
}

/// Everything one ledger instance owns
#[derive(Debug, Clone)]
pub struct LedgerState {
    pub access: AccessController,
    pub ledger: IssuanceLedger,
    pub registry: AgentRegistry,
    pub anchor: AttestationAnchor,
}

/// Point-in-time summary of a ledger instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStatus {
    pub authority: AccountId,
    pub paused: bool,
    pub total_issued: Amount,
    pub max_supply: Amount,
    pub day_length_secs: u64,
    pub accounts: usize,
    pub issuers: usize,
    pub live_agents: usize,
    pub next_agent_id: AgentId,
    pub agents_by_kind: BTreeMap<AgentKind, u64>,
    pub temporal_locks: usize,
    pub memory_roots: usize,
}

impl LedgerState {
    pub fn new(authority: AccountId, params: LedgerParams) -> Result<Self> {
        Ok(Self {
            access: AccessController::new(authority)?,
            ledger: IssuanceLedger::new(params),
            registry: AgentRegistry::new(),
            anchor: AttestationAnchor::new(),
        })
    }

    pub fn status(&self) -> LedgerStatus {
        LedgerStatus {
            authority: self.access.authority().clone(),
            paused: self.ledger.is_paused(),
            total_issued: self.ledger.total_issued(),
            max_supply: self.ledger.max_supply(),
            day_length_secs: self.ledger.params().day_length,
            accounts: self.ledger.accounts().count(),
            issuers: self.ledger.issuers().count(),
            live_agents: self.registry.live_count(),
            next_agent_id: self.registry.next_id(),
            agents_by_kind: self.registry.kind_counts().clone(),
            temporal_locks: self.anchor.lock_count(),
            memory_roots: self.anchor.root_count(),
        }
    }

    // ========================================================================
    // Deltas
    // ========================================================================

    /// Keys touched by `events`, with their current values
    pub fn delta_for(&self, events: &[LedgerEvent]) -> Result<StateDelta> {
        let mut delta = StateDelta::new();
        for event in events {
            match event {
                LedgerEvent::AuthorityTransferred { .. } => self.put_authority(&mut delta)?,
                LedgerEvent::CapabilityGranted { account, .. }
                | LedgerEvent::CapabilityRevoked { account, .. } => {
                    self.put_capabilities(&mut delta, account)?
                }
                LedgerEvent::IssuerAuthorized { issuer, .. }
                | LedgerEvent::IssuerRevoked { issuer }
                | LedgerEvent::DailyLimitUpdated { issuer, .. } => {
                    self.put_issuer_entry(&mut delta, issuer)?
                }
                LedgerEvent::Issued {
                    issuer, recipient, ..
                } => {
                    self.put_balance(&mut delta, recipient)?;
                    self.put_window(&mut delta, issuer)?;
                    delta.put(Collection::Meta, TOTAL_ISSUED, &self.ledger.total_issued())?;
                }
                LedgerEvent::Transferred { from, to, .. } => {
                    self.put_balance(&mut delta, from)?;
                    self.put_balance(&mut delta, to)?;
                }
                LedgerEvent::Paused { .. } | LedgerEvent::Unpaused { .. } => {
                    delta.put(Collection::Meta, PAUSED, &self.ledger.is_paused())?;
                }
                LedgerEvent::AgentCreated { id, kind, .. } => {
                    self.put_slot(&mut delta, *id)?;
                    self.put_kind_count(&mut delta, *kind)?;
                    delta.put(Collection::Agents, NEXT_ID, &self.registry.next_id())?;
                }
                LedgerEvent::AgentRetired { id, kind, .. } => {
                    self.put_slot(&mut delta, *id)?;
                    self.put_kind_count(&mut delta, *kind)?;
                }
                LedgerEvent::PositiveOutcomeRecorded { id, .. }
                | LedgerEvent::NegativeOutcomeRecorded { id, .. }
                | LedgerEvent::ResponseExecuted { id, .. }
                | LedgerEvent::FingerprintSet { id }
                | LedgerEvent::AgentActivated { id }
                | LedgerEvent::AgentDeactivated { id } => self.put_slot(&mut delta, *id)?,
                LedgerEvent::TemporalLockSubmitted { target, .. } => {
                    if let Some(lock) = self.anchor.temporal_lock(target) {
                        delta.put(Collection::Anchors, format!("{LOCK}{target}"), lock)?;
                    }
                }
                LedgerEvent::MemoryRootAnchored { digest, .. } => {
                    self.put_root(&mut delta, digest)?;
                }
            }
        }
        Ok(delta)
    }

    /// Every key of the current state
    pub fn full_delta(&self) -> Result<StateDelta> {
        let mut delta = StateDelta::new();

        delta.put(Collection::Meta, PARAMS, &self.ledger.params())?;
        delta.put(Collection::Meta, TOTAL_ISSUED, &self.ledger.total_issued())?;
        delta.put(Collection::Meta, PAUSED, &self.ledger.is_paused())?;
        self.put_authority(&mut delta)?;
        for (account, _) in self.access.grants() {
            self.put_capabilities(&mut delta, account)?;
        }

        for (account, _) in self.ledger.accounts() {
            self.put_balance(&mut delta, account)?;
        }
        for (issuer, _) in self.ledger.issuers() {
            self.put_issuer_entry(&mut delta, issuer)?;
            self.put_window(&mut delta, issuer)?;
        }

        for slot in self.registry.slots() {
            self.put_slot(&mut delta, slot.record().id)?;
        }
        for kind in AgentKind::ALL {
            self.put_kind_count(&mut delta, kind)?;
        }
        delta.put(Collection::Agents, NEXT_ID, &self.registry.next_id())?;

        for lock in self.anchor.locks().iter() {
            delta.put(Collection::Anchors, format!("{LOCK}{}", lock.target), lock)?;
        }
        for root in self.anchor.roots().iter() {
            self.put_root(&mut delta, &root.root.digest)?;
        }

        Ok(delta)
    }

    fn put_authority(&self, delta: &mut StateDelta) -> Result<()> {
        delta.put(Collection::Meta, AUTHORITY, self.access.authority())
    }

    fn put_capabilities(&self, delta: &mut StateDelta, account: &AccountId) -> Result<()> {
        delta.put(
            Collection::Meta,
            format!("{CAP}{account}"),
            &self.access.capabilities_of(account),
        )
    }

    fn put_balance(&self, delta: &mut StateDelta, account: &AccountId) -> Result<()> {
        delta.put(
            Collection::Balances,
            account.as_str(),
            &self.ledger.balance_of(account),
        )
    }

    fn put_issuer_entry(&self, delta: &mut StateDelta, issuer: &AccountId) -> Result<()> {
        match self.ledger.issuer(issuer) {
            Some(entry) => delta.put(Collection::Issuers, format!("{ENTRY}{issuer}"), &entry),
            None => Ok(()),
        }
    }

    fn put_window(&self, delta: &mut StateDelta, issuer: &AccountId) -> Result<()> {
        match self.ledger.stored_window(issuer) {
            Some(window) => delta.put(Collection::Issuers, format!("{WINDOW}{issuer}"), &window),
            None => Ok(()),
        }
    }

    fn put_slot(&self, delta: &mut StateDelta, id: AgentId) -> Result<()> {
        match self.registry.slot(id) {
            Some(slot) => delta.put(Collection::Agents, slot_key(id), slot),
            None => Ok(()),
        }
    }

    fn put_kind_count(&self, delta: &mut StateDelta, kind: AgentKind) -> Result<()> {
        delta.put(
            Collection::Agents,
            format!("{KIND}{}", kind.as_str()),
            &self.registry.kind_count(kind),
        )
    }

    fn put_root(&self, delta: &mut StateDelta, digest: &Digest32) -> Result<()> {
        match self.anchor.memory_root(digest) {
            Some(root) => delta.put(
                Collection::Anchors,
                format!("{ROOT}{}", hex_key(digest)),
                root,
            ),
            None => Ok(()),
        }
    }

    // ========================================================================
    // Decoding
    // ========================================================================

    /// Rebuild from a store snapshot; `None` when nothing was ever committed
    pub fn from_snapshot(snapshot: &Snapshot) -> Result<Option<Self>> {
        let Some(authority) = snapshot.get::<AccountId>(Collection::Meta, AUTHORITY)? else {
            return Ok(None);
        };
        let params: LedgerParams = require(snapshot.get(Collection::Meta, PARAMS)?, PARAMS)?;
        let total_issued: Amount = snapshot.get(Collection::Meta, TOTAL_ISSUED)?.unwrap_or_default();
        let paused: bool = snapshot.get(Collection::Meta, PAUSED)?.unwrap_or(false);

        let capabilities: BTreeMap<AccountId, BTreeSet<Capability>> = snapshot
            .scan::<BTreeSet<Capability>>(Collection::Meta, CAP)?
            .into_iter()
            .map(|(account, caps)| (AccountId::from(account), caps))
            .collect();

        let balances: HashMap<AccountId, Amount> = snapshot
            .scan::<Amount>(Collection::Balances, "")?
            .into_iter()
            .map(|(account, amount)| (AccountId::from(account), amount))
            .collect();
        let issuers: HashMap<AccountId, IssuerEntry> = snapshot
            .scan::<IssuerEntry>(Collection::Issuers, ENTRY)?
            .into_iter()
            .map(|(account, entry)| (AccountId::from(account), entry))
            .collect();
        let windows: HashMap<AccountId, IssuanceWindow> = snapshot
            .scan::<IssuanceWindow>(Collection::Issuers, WINDOW)?
            .into_iter()
            .map(|(account, window)| (AccountId::from(account), window))
            .collect();

        let slots: Vec<AgentSlot> = snapshot
            .scan::<AgentSlot>(Collection::Agents, SLOT)?
            .into_iter()
            .map(|(_, slot)| slot)
            .collect();
        for (index, slot) in slots.iter().enumerate() {
            if slot.record().id != AgentId(index as u64 + 1) {
                return Err(LuxbinError::Storage {
                    message: format!("agent slots are not dense at {}", slot.record().id),
                });
            }
        }
        let mut kind_counts = BTreeMap::new();
        for (kind, count) in snapshot.scan::<u64>(Collection::Agents, KIND)? {
            kind_counts.insert(kind.parse::<AgentKind>()?, count);
        }
        let registry = AgentRegistry::restore(slots, kind_counts);
        if let Some(next_id) = snapshot.get::<AgentId>(Collection::Agents, NEXT_ID)? {
            if next_id != registry.next_id() {
                return Err(LuxbinError::Storage {
                    message: format!(
                        "agent counter {next_id} does not match {} stored slots",
                        registry.slots().len()
                    ),
                });
            }
        }

        let locks = snapshot
            .scan::<TemporalLock>(Collection::Anchors, LOCK)?
            .into_iter()
            .map(|(_, lock)| lock);
        let roots = snapshot
            .scan::<AnchoredRoot>(Collection::Anchors, ROOT)?
            .into_iter()
            .map(|(_, root)| root);

        Ok(Some(Self {
            access: AccessController::restore(authority, capabilities),
            ledger: IssuanceLedger::restore(params, total_issued, paused, balances, issuers, windows),
            registry,
            anchor: AttestationAnchor::restore(locks, roots),
        }))
    }
}

fn hex_key(digest: &Digest32) -> String {
    digest.to_hex().trim_start_matches("0x").to_string()
}

fn require<T>(value: Option<T>, key: &str) -> Result<T> {
    value.ok_or_else(|| LuxbinError::Storage {
        message: format!("missing meta key: {key}"),
    })
}
