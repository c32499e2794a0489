//! The serialized ledger service
//!
//! Every mutating call holds the write lock for its whole check-then-act
//! sequence, runs against a staged copy of the state, commits the touched
//! keys, and only then swaps the staged copy in.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use luxbin_anchor::{AnchoredRoot, TemporalLock};
use luxbin_ledger::{IssuerEntry, LedgerParams};
use luxbin_registry::{AgentRecord, AgentSlot};
use luxbin_types::{
    AccountId, AgentId, AgentKind, Amount, Capability, Clock, Digest32, EventRecord, LedgerEvent,
    LuxbinError, Result, SystemClock, Timestamp,
};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::config::LuxbinConfig;
use crate::state::{LedgerState, LedgerStatus};
use crate::store::{LedgerStore, MemoryStore, SledStore};

/// Result of a successful mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied<T> {
    pub value: T,
    pub events: Vec<EventRecord>,
}

/// Shared handle to one ledger instance
#[derive(Clone)]
pub struct LedgerService {
    state: Arc<RwLock<LedgerState>>,
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<EventRecord>,
    sequence: Arc<AtomicU64>,
}

impl LedgerService {
    /// Open (or initialise) the ledger held by `store`
    ///
    /// A store that already holds a ledger keeps its own authority and
    /// parameters; the config only seeds a fresh one.
    pub async fn open(
        config: &LuxbinConfig,
        store: Arc<dyn LedgerStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let snapshot = store.load().await?;
        let state = match LedgerState::from_snapshot(&snapshot)? {
            Some(state) => {
                if state.access.authority() != &config.authority {
                    warn!(
                        stored_authority = %state.access.authority(),
                        configured_authority = %config.authority,
                        "Stored authority differs from configuration, keeping stored authority"
                    );
                }
                if state.ledger.params() != config.ledger_params() {
                    warn!(
                        stored_max_supply = %state.ledger.max_supply(),
                        stored_day_length = state.ledger.params().day_length,
                        "Stored ledger parameters differ from configuration, keeping stored values"
                    );
                }
                info!(
                    authority = %state.access.authority(),
                    total_issued = %state.ledger.total_issued(),
                    agents = state.registry.live_count(),
                    "Ledger restored"
                );
                state
            }
            None => {
                let state = LedgerState::new(config.authority.clone(), config.ledger_params())?;
                store.commit(&state.full_delta()?).await?;
                info!(authority = %config.authority, max_supply = %config.max_supply, "Ledger initialised");
                state
            }
        };

        let (events, _) = broadcast::channel(config.event_capacity);
        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            store,
            clock,
            events,
            sequence: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Open the sled store under `config.data_dir` with wall-clock time
    pub async fn open_sled(config: &LuxbinConfig) -> Result<Self> {
        let store = SledStore::open(&config.data_dir)?;
        Self::open(config, Arc::new(store), Arc::new(SystemClock)).await
    }

    /// Volatile ledger driven by `clock`
    pub async fn in_memory(
        authority: AccountId,
        params: LedgerParams,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let config = LuxbinConfig {
            authority,
            max_supply: params.max_supply,
            day_length_secs: params.day_length,
            ..LuxbinConfig::default()
        };
        Self::open(&config, Arc::new(MemoryStore::new()), clock).await
    }

    /// Subscribe to notifications of successful mutations
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.events.subscribe()
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    async fn apply<T, F>(&self, operation: &'static str, f: F) -> Result<Applied<T>>
    where
        F: FnOnce(&mut LedgerState, Timestamp) -> Result<(T, Vec<LedgerEvent>)>,
    {
        let mut state = self.state.write().await;
        let now = self.clock.now();

        let mut staged = state.clone();
        let (value, events) = match f(&mut staged, now) {
            Ok(applied) => applied,
            Err(e) => {
                debug!(operation, error = %e, "Operation rejected");
                return Err(e);
            }
        };

        if !events.is_empty() {
            let delta = staged.delta_for(&events)?;
            if let Err(e) = self.store.commit(&delta).await {
                warn!(operation, error = %e, "Commit failed, state left unchanged");
                return Err(e);
            }
        }
        *state = staged;

        let records: Vec<EventRecord> = events
            .into_iter()
            .map(|event| EventRecord {
                sequence: self.sequence.fetch_add(1, Ordering::SeqCst) + 1,
                at: now,
                event,
            })
            .collect();
        for record in &records {
            // No receivers is fine
            let _ = self.events.send(record.clone());
        }

        info!(operation, events = records.len(), "Operation applied");
        Ok(Applied {
            value,
            events: records,
        })
    }

    async fn apply_events<F>(&self, operation: &'static str, f: F) -> Result<Vec<EventRecord>>
    where
        F: FnOnce(&mut LedgerState, Timestamp) -> Result<Vec<LedgerEvent>>,
    {
        let applied = self
            .apply(operation, |state, now| Ok(((), f(state, now)?)))
            .await?;
        Ok(applied.events)
    }

    // ========================================================================
    // Access
    // ========================================================================

    pub async fn authority(&self) -> AccountId {
        self.state.read().await.access.authority().clone()
    }

    pub async fn has_capability(&self, account: &AccountId, capability: Capability) -> bool {
        self.state.read().await.access.has_capability(account, capability)
    }

    pub async fn transfer_authority(
        &self,
        caller: &AccountId,
        new_authority: &AccountId,
    ) -> Result<Vec<EventRecord>> {
        let events = self
            .apply_events("transfer_authority", |state, _| {
                state.access.transfer_authority(caller, new_authority)
            })
            .await?;
        info!(from = %caller, to = %new_authority, "Authority transferred");
        Ok(events)
    }

    pub async fn grant_capability(
        &self,
        caller: &AccountId,
        account: &AccountId,
        capability: Capability,
    ) -> Result<Vec<EventRecord>> {
        self.apply_events("grant_capability", |state, _| {
            state.access.grant(caller, account, capability)
        })
        .await
    }

    pub async fn revoke_capability(
        &self,
        caller: &AccountId,
        account: &AccountId,
        capability: Capability,
    ) -> Result<Vec<EventRecord>> {
        self.apply_events("revoke_capability", |state, _| {
            state.access.revoke(caller, account, capability)
        })
        .await
    }

    // ========================================================================
    // Issuance ledger
    // ========================================================================

    /// Authorize (or re-authorize) an issuer and grant it `Issue`
    pub async fn authorize_issuer(
        &self,
        caller: &AccountId,
        issuer: &AccountId,
        daily_limit: Amount,
    ) -> Result<Vec<EventRecord>> {
        self.apply_events("authorize_issuer", |state, _| {
            state.access.require_authority(caller)?;
            let mut events = state.ledger.authorize_issuer(issuer, daily_limit)?;
            events.extend(state.access.grant(caller, issuer, Capability::Issue)?);
            Ok(events)
        })
        .await
    }

    /// Revoke an issuer and withdraw its `Issue` capability
    pub async fn revoke_issuer(
        &self,
        caller: &AccountId,
        issuer: &AccountId,
    ) -> Result<Vec<EventRecord>> {
        self.apply_events("revoke_issuer", |state, _| {
            state.access.require_authority(caller)?;
            let mut events = state.ledger.revoke_issuer(issuer)?;
            events.extend(state.access.revoke(caller, issuer, Capability::Issue)?);
            Ok(events)
        })
        .await
    }

    pub async fn update_daily_limit(
        &self,
        caller: &AccountId,
        issuer: &AccountId,
        daily_limit: Amount,
    ) -> Result<Vec<EventRecord>> {
        self.apply_events("update_daily_limit", |state, _| {
            state.access.require_authority(caller)?;
            state.ledger.update_daily_limit(issuer, daily_limit)
        })
        .await
    }

    /// Mint `amount` to `recipient`; the caller is the issuer
    pub async fn issue(
        &self,
        caller: &AccountId,
        recipient: &AccountId,
        amount: Amount,
    ) -> Result<Vec<EventRecord>> {
        self.issue_batch(caller, &[(recipient.clone(), amount)]).await
    }

    /// Mint to many recipients, checked and charged as one total
    pub async fn issue_batch(
        &self,
        caller: &AccountId,
        grants: &[(AccountId, Amount)],
    ) -> Result<Vec<EventRecord>> {
        self.apply_events("issue", |state, now| {
            let authorized = state
                .ledger
                .issuer(caller)
                .is_some_and(|entry: IssuerEntry| entry.authorized);
            if !authorized {
                return Err(LuxbinError::IssuerNotAuthorized {
                    issuer: caller.0.clone(),
                });
            }
            state.access.require_capability(caller, Capability::Issue)?;
            state.ledger.issue_batch(caller, grants, now)
        })
        .await
    }

    /// Move `amount` from the caller's balance to `to`
    pub async fn transfer(
        &self,
        caller: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<Vec<EventRecord>> {
        self.apply_events("transfer", |state, _| {
            state.ledger.transfer(caller, to, amount)
        })
        .await
    }

    pub async fn pause(&self, caller: &AccountId) -> Result<Vec<EventRecord>> {
        let events = self
            .apply_events("pause", |state, _| {
                state.access.require_authority(caller)?;
                Ok(state.ledger.pause(caller))
            })
            .await?;
        warn!(by = %caller, "Ledger paused");
        Ok(events)
    }

    pub async fn unpause(&self, caller: &AccountId) -> Result<Vec<EventRecord>> {
        let events = self
            .apply_events("unpause", |state, _| {
                state.access.require_authority(caller)?;
                Ok(state.ledger.unpause(caller))
            })
            .await?;
        info!(by = %caller, "Ledger unpaused");
        Ok(events)
    }

    pub async fn remaining_daily_quota(&self, issuer: &AccountId) -> Amount {
        let now = self.clock.now();
        self.state.read().await.ledger.remaining_daily_quota(issuer, now)
    }

    pub async fn balance_of(&self, account: &AccountId) -> Amount {
        self.state.read().await.ledger.balance_of(account)
    }

    pub async fn total_issued(&self) -> Amount {
        self.state.read().await.ledger.total_issued()
    }

    pub async fn max_supply(&self) -> Amount {
        self.state.read().await.ledger.max_supply()
    }

    pub async fn is_paused(&self) -> bool {
        self.state.read().await.ledger.is_paused()
    }

    pub async fn issuer(&self, issuer: &AccountId) -> Option<IssuerEntry> {
        self.state.read().await.ledger.issuer(issuer)
    }

    // ========================================================================
    // Agent registry
    // ========================================================================

    pub async fn create_agent(
        &self,
        caller: &AccountId,
        owner: &AccountId,
        kind: AgentKind,
        fingerprint: &str,
    ) -> Result<Applied<AgentId>> {
        self.apply("create_agent", |state, now| {
            state.access.require_authority(caller)?;
            state.registry.create(owner, kind, fingerprint, now)
        })
        .await
    }

    pub async fn batch_create_agents(
        &self,
        caller: &AccountId,
        owner: &AccountId,
        kind: AgentKind,
        count: u32,
    ) -> Result<Applied<Vec<AgentId>>> {
        self.apply("batch_create_agents", |state, now| {
            state.access.require_authority(caller)?;
            state.registry.batch_create(owner, kind, count, now)
        })
        .await
    }

    pub async fn record_positive_outcome(
        &self,
        caller: &AccountId,
        id: AgentId,
    ) -> Result<Vec<EventRecord>> {
        self.apply_events("record_positive_outcome", |state, now| {
            state.access.require_capability(caller, Capability::RegistryWrite)?;
            state.registry.record_positive_outcome(id, now)
        })
        .await
    }

    /// May retire the record in the same call
    pub async fn record_negative_outcome(
        &self,
        caller: &AccountId,
        id: AgentId,
    ) -> Result<Vec<EventRecord>> {
        self.apply_events("record_negative_outcome", |state, now| {
            state.access.require_capability(caller, Capability::RegistryWrite)?;
            state.registry.record_negative_outcome(id, now)
        })
        .await
    }

    pub async fn record_response_executed(
        &self,
        caller: &AccountId,
        id: AgentId,
    ) -> Result<Vec<EventRecord>> {
        self.apply_events("record_response_executed", |state, now| {
            state.access.require_capability(caller, Capability::RegistryWrite)?;
            state.registry.record_response_executed(id, now)
        })
        .await
    }

    pub async fn set_fingerprint(
        &self,
        caller: &AccountId,
        id: AgentId,
        fingerprint: &str,
    ) -> Result<Vec<EventRecord>> {
        self.apply_events("set_fingerprint", |state, _| {
            state.access.require_authority(caller)?;
            state.registry.set_fingerprint(id, fingerprint)
        })
        .await
    }

    pub async fn activate_agent(&self, caller: &AccountId, id: AgentId) -> Result<Vec<EventRecord>> {
        self.apply_events("activate_agent", |state, now| {
            state.access.require_authority(caller)?;
            state.registry.activate(id, now)
        })
        .await
    }

    pub async fn deactivate_agent(
        &self,
        caller: &AccountId,
        id: AgentId,
    ) -> Result<Vec<EventRecord>> {
        self.apply_events("deactivate_agent", |state, now| {
            state.access.require_authority(caller)?;
            state.registry.deactivate(id, now)
        })
        .await
    }

    /// Live record for `id`; retired and unknown ids fail the same way
    pub async fn agent(&self, id: AgentId) -> Result<AgentRecord> {
        self.state
            .read()
            .await
            .registry
            .agent(id)
            .cloned()
            .ok_or(LuxbinError::AgentNotFound { id })
    }

    /// Raw slot including retired records
    pub async fn agent_slot(&self, id: AgentId) -> Option<AgentSlot> {
        self.state.read().await.registry.slot(id).cloned()
    }

    pub async fn kind_count(&self, kind: AgentKind) -> u64 {
        self.state.read().await.registry.kind_count(kind)
    }

    pub async fn active_agents(&self, owner: &AccountId, kind: AgentKind) -> Vec<AgentId> {
        self.state
            .read()
            .await
            .registry
            .active_by_owner_and_kind(owner, kind)
    }

    pub async fn agents_of_owner(&self, owner: &AccountId) -> Vec<AgentId> {
        self.state.read().await.registry.agents_of_owner(owner)
    }

    // ========================================================================
    // Attestation anchor
    // ========================================================================

    pub async fn submit_temporal_lock(
        &self,
        caller: &AccountId,
        target: &AccountId,
        reveal_time: Timestamp,
        hash_chain_depth: u32,
        initial_commitment: &[u8],
    ) -> Result<Vec<EventRecord>> {
        self.apply_events("submit_temporal_lock", |state, now| {
            state.anchor.submit_temporal_lock(
                caller,
                target,
                reveal_time,
                hash_chain_depth,
                initial_commitment,
                now,
            )
        })
        .await
    }

    /// Repeat submissions of a known digest succeed with no events
    pub async fn attest_memory_root(
        &self,
        caller: &AccountId,
        digest: &[u8],
    ) -> Result<Vec<EventRecord>> {
        self.apply_events("attest_memory_root", |state, now| {
            state.anchor.attest_memory_root(caller, digest, now)
        })
        .await
    }

    pub async fn temporal_lock(&self, target: &AccountId) -> Option<TemporalLock> {
        self.state.read().await.anchor.temporal_lock(target).cloned()
    }

    pub async fn memory_root(&self, digest: &Digest32) -> Option<AnchoredRoot> {
        self.state.read().await.anchor.memory_root(digest).cloned()
    }

    // ========================================================================
    // Status
    // ========================================================================

    pub async fn status(&self) -> LedgerStatus {
        self.state.read().await.status()
    }

    /// Check `sum(balances) == total_issued <= max_supply`
    pub async fn supply_invariant_holds(&self) -> bool {
        self.state.read().await.ledger.supply_invariant_holds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use luxbin_types::{ManualClock, SECONDS_PER_DAY};

    fn account(name: &str) -> AccountId {
        AccountId::from(name)
    }

    async fn service() -> (LedgerService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(10 * SECONDS_PER_DAY));
        let service = LedgerService::in_memory(account("admin"), LedgerParams::default(), clock.clone())
            .await
            .unwrap();
        (service, clock)
    }

    #[tokio::test]
    async fn test_events_are_sequenced_and_broadcast() {
        let (service, _) = service().await;
        let mut rx = service.subscribe();

        let events = service
            .authorize_issuer(&account("admin"), &account("desk"), Amount(100))
            .await
            .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].sequence, 1);
        assert_eq!(events[1].sequence, 2);
        assert_eq!(events[0].at, 10 * SECONDS_PER_DAY);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.event.name(), "issuer_authorized");
        let second = rx.recv().await.unwrap();
        assert_eq!(
            second.event,
            LedgerEvent::CapabilityGranted {
                account: account("desk"),
                capability: Capability::Issue,
            }
        );
    }

    #[tokio::test]
    async fn test_rejected_operation_leaves_state_untouched() {
        let (service, _) = service().await;
        let admin = account("admin");
        service
            .authorize_issuer(&admin, &account("desk"), Amount(100))
            .await
            .unwrap();

        let before = service.status().await;
        let result = service
            .issue_batch(
                &account("desk"),
                &[(account("alice"), Amount(60)), (account("bob"), Amount(60))],
            )
            .await;
        assert!(matches!(result, Err(LuxbinError::ExceedsDailyLimit { .. })));
        assert_eq!(service.status().await, before);
        assert_eq!(service.balance_of(&account("alice")).await, Amount::zero());
        assert_eq!(service.remaining_daily_quota(&account("desk")).await, Amount(100));
    }

    #[tokio::test]
    async fn test_issue_requires_capability() {
        let (service, _) = service().await;
        let admin = account("admin");
        let desk = account("desk");
        service.authorize_issuer(&admin, &desk, Amount(100)).await.unwrap();
        service
            .revoke_capability(&admin, &desk, Capability::Issue)
            .await
            .unwrap();

        let result = service.issue(&desk, &account("alice"), Amount(1)).await;
        assert!(matches!(
            result,
            Err(LuxbinError::CapabilityRequired { capability: Capability::Issue, .. })
        ));

        service.grant_capability(&admin, &desk, Capability::Issue).await.unwrap();
        service.issue(&desk, &account("alice"), Amount(1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_admin_operations_require_authority() {
        let (service, _) = service().await;
        let mallory = account("mallory");

        assert!(matches!(
            service.authorize_issuer(&mallory, &mallory, Amount(1)).await,
            Err(LuxbinError::NotAuthority { .. })
        ));
        assert!(matches!(
            service.pause(&mallory).await,
            Err(LuxbinError::NotAuthority { .. })
        ));
        assert!(matches!(
            service.create_agent(&mallory, &mallory, AgentKind::Detector, "fp").await,
            Err(LuxbinError::NotAuthority { .. })
        ));
        assert!(matches!(
            service.record_positive_outcome(&mallory, AgentId(1)).await,
            Err(LuxbinError::CapabilityRequired { .. })
        ));
    }

    #[tokio::test]
    async fn test_authority_transfer() {
        let (service, _) = service().await;
        let admin = account("admin");
        let council = account("council");

        service.transfer_authority(&admin, &council).await.unwrap();
        assert_eq!(service.authority().await, council);
        assert!(matches!(
            service.pause(&admin).await,
            Err(LuxbinError::NotAuthority { .. })
        ));
        service.pause(&council).await.unwrap();
        assert!(service.is_paused().await);
    }

    #[tokio::test]
    async fn test_repeat_memory_root_emits_nothing() {
        let (service, _) = service().await;
        let mut rx = service.subscribe();
        let submitter = account("auditor");

        let first = service.attest_memory_root(&submitter, &[1u8; 32]).await.unwrap();
        assert_eq!(first.len(), 1);
        let second = service.attest_memory_root(&submitter, &[1u8; 32]).await.unwrap();
        assert!(second.is_empty());

        assert_eq!(rx.recv().await.unwrap().sequence, 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_quota_resets_on_next_day() {
        let (service, clock) = service().await;
        let admin = account("admin");
        let desk = account("desk");
        service.authorize_issuer(&admin, &desk, Amount(100)).await.unwrap();
        service.issue(&desk, &account("alice"), Amount(100)).await.unwrap();
        assert_eq!(service.remaining_daily_quota(&desk).await, Amount::zero());

        clock.advance(SECONDS_PER_DAY);
        assert_eq!(service.remaining_daily_quota(&desk).await, Amount(100));
        service.issue(&desk, &account("alice"), Amount(100)).await.unwrap();
        assert_eq!(service.balance_of(&account("alice")).await, Amount(200));
    }
}
