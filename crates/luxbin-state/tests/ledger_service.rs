//! End-to-end behaviour of the ledger service

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use luxbin_ledger::LedgerParams;
use luxbin_registry::AgentSlot;
use luxbin_state::{
    LedgerService, LedgerStore, LuxbinConfig, MemoryStore, SledStore, Snapshot, StateDelta,
};
use luxbin_types::{
    AccountId, AgentId, AgentKind, Amount, Capability, Digest32, LuxbinError, ManualClock,
    Result, SECONDS_PER_DAY,
};

fn account(name: &str) -> AccountId {
    AccountId::from(name)
}

fn admin() -> AccountId {
    account("admin")
}

async fn memory_service(clock: Arc<ManualClock>) -> LedgerService {
    LedgerService::in_memory(admin(), LedgerParams::default(), clock)
        .await
        .unwrap()
}

fn sled_config(dir: &std::path::Path) -> LuxbinConfig {
    LuxbinConfig {
        authority: admin(),
        data_dir: dir.to_path_buf(),
        ..LuxbinConfig::default()
    }
}

async fn sled_service(config: &LuxbinConfig, clock: Arc<ManualClock>) -> LedgerService {
    let store = SledStore::open(&config.data_dir).unwrap();
    LedgerService::open(config, Arc::new(store), clock).await.unwrap()
}

#[tokio::test]
async fn test_daily_quota_scenario() {
    let clock = Arc::new(ManualClock::new(3 * SECONDS_PER_DAY + 100));
    let service = memory_service(clock.clone()).await;
    let issuer = account("issuer-x");
    let holder = account("holder");

    service.authorize_issuer(&admin(), &issuer, Amount(1000)).await.unwrap();
    service.issue(&issuer, &holder, Amount(600)).await.unwrap();

    let result = service.issue(&issuer, &holder, Amount(500)).await;
    assert!(matches!(
        result,
        Err(LuxbinError::ExceedsDailyLimit { issued_today: 600, requested: 500, daily_limit: 1000, .. })
    ));

    service.issue(&issuer, &holder, Amount(400)).await.unwrap();
    assert_eq!(service.remaining_daily_quota(&issuer).await, Amount::zero());
    assert_eq!(service.balance_of(&holder).await, Amount(1000));
    assert_eq!(service.total_issued().await, Amount(1000));
    assert!(service.supply_invariant_holds().await);
}

#[tokio::test]
async fn test_detector_reputation_scenario() {
    let clock = Arc::new(ManualClock::new(1_000));
    let service = memory_service(clock.clone()).await;
    let owner = account("lab");

    let created = service
        .create_agent(&admin(), &owner, AgentKind::Detector, "detector-0")
        .await
        .unwrap();
    let id = created.value;
    assert_eq!(id, AgentId(1));

    for _ in 0..5 {
        clock.advance(1);
        service.record_positive_outcome(&admin(), id).await.unwrap();
    }

    let record = service.agent(id).await.unwrap();
    assert_eq!(record.true_positives, 5);
    assert_eq!(record.reputation, 105);
    assert_eq!(record.last_active_at, 1_005);
}

#[tokio::test]
async fn test_regulatory_batch_scenario() {
    let clock = Arc::new(ManualClock::new(1_000));
    let service = memory_service(clock).await;
    let owner = account("council");

    service
        .create_agent(&admin(), &account("other"), AgentKind::Memory, "m")
        .await
        .unwrap();
    let batch = service
        .batch_create_agents(&admin(), &owner, AgentKind::Regulatory, 10)
        .await
        .unwrap();

    let expected: Vec<AgentId> = (2..=11).map(AgentId).collect();
    assert_eq!(batch.value, expected);
    assert_eq!(batch.events.len(), 10);
    assert_eq!(service.kind_count(AgentKind::Regulatory).await, 10);
    assert_eq!(
        service.active_agents(&owner, AgentKind::Regulatory).await,
        expected
    );
}

#[tokio::test]
async fn test_outcomes_need_registry_write() {
    let clock = Arc::new(ManualClock::new(1_000));
    let service = memory_service(clock).await;
    let oracle = account("oracle");
    let id = service
        .create_agent(&admin(), &account("lab"), AgentKind::Detector, "fp")
        .await
        .unwrap()
        .value;

    assert!(matches!(
        service.record_positive_outcome(&oracle, id).await,
        Err(LuxbinError::CapabilityRequired { capability: Capability::RegistryWrite, .. })
    ));

    service
        .grant_capability(&admin(), &oracle, Capability::RegistryWrite)
        .await
        .unwrap();
    service.record_positive_outcome(&oracle, id).await.unwrap();
    assert!(matches!(
        service.record_response_executed(&oracle, id).await,
        Err(LuxbinError::InvalidKindForOperation { .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_batches_cannot_both_pass_quota() {
    let clock = Arc::new(ManualClock::new(SECONDS_PER_DAY));
    let service = memory_service(clock).await;
    let issuer = account("desk");
    service.authorize_issuer(&admin(), &issuer, Amount(1000)).await.unwrap();

    let grants = vec![(account("alice"), Amount(300)), (account("bob"), Amount(300))];
    let first = {
        let service = service.clone();
        let issuer = issuer.clone();
        let grants = grants.clone();
        tokio::spawn(async move { service.issue_batch(&issuer, &grants).await })
    };
    let second = {
        let service = service.clone();
        let issuer = issuer.clone();
        let grants = grants.clone();
        tokio::spawn(async move { service.issue_batch(&issuer, &grants).await })
    };

    let outcomes = [first.await.unwrap(), second.await.unwrap()];
    let succeeded = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(LuxbinError::ExceedsDailyLimit { .. }))));
    assert_eq!(service.total_issued().await, Amount(600));
    assert!(service.supply_invariant_holds().await);
}

#[tokio::test]
async fn test_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = sled_config(dir.path());
    let clock = Arc::new(ManualClock::new(2 * SECONDS_PER_DAY));
    let issuer = account("desk");
    let oracle = account("oracle");

    {
        let service = sled_service(&config, clock.clone()).await;
        service.authorize_issuer(&admin(), &issuer, Amount(500)).await.unwrap();
        service
            .issue_batch(&issuer, &[(account("alice"), Amount(200)), (account("bob"), Amount(100))])
            .await
            .unwrap();
        service.transfer(&account("alice"), &account("bob"), Amount(50)).await.unwrap();
        service
            .grant_capability(&admin(), &oracle, Capability::RegistryWrite)
            .await
            .unwrap();
        service
            .batch_create_agents(&admin(), &account("lab"), AgentKind::Defender, 3)
            .await
            .unwrap();
        service.record_response_executed(&oracle, AgentId(2)).await.unwrap();
        service
            .submit_temporal_lock(&admin(), &account("alice"), 9_999, 16, &[3u8; 32])
            .await
            .unwrap();
        service.attest_memory_root(&oracle, &[4u8; 32]).await.unwrap();
        service.pause(&admin()).await.unwrap();
    }

    let service = sled_service(&config, clock.clone()).await;
    assert!(service.is_paused().await);
    assert_eq!(service.balance_of(&account("alice")).await, Amount(150));
    assert_eq!(service.balance_of(&account("bob")).await, Amount(150));
    assert_eq!(service.total_issued().await, Amount(300));
    assert_eq!(service.remaining_daily_quota(&issuer).await, Amount(200));
    assert!(service.has_capability(&oracle, Capability::RegistryWrite).await);
    assert!(service.has_capability(&issuer, Capability::Issue).await);
    assert_eq!(service.kind_count(AgentKind::Defender).await, 3);
    assert_eq!(service.agent(AgentId(2)).await.unwrap().responses_executed, 1);
    assert_eq!(
        service.temporal_lock(&account("alice")).await.unwrap().hash_chain_depth,
        16
    );
    assert!(service.memory_root(&Digest32([4u8; 32])).await.is_some());

    // Ids continue after the restored arena
    service.unpause(&admin()).await.unwrap();
    let next = service
        .create_agent(&admin(), &account("lab"), AgentKind::Memory, "m")
        .await
        .unwrap();
    assert_eq!(next.value, AgentId(4));
}

#[tokio::test]
async fn test_retirement_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = sled_config(dir.path());
    let clock = Arc::new(ManualClock::new(1_000));

    {
        let service = sled_service(&config, clock.clone()).await;
        let id = service
            .create_agent(&admin(), &account("lab"), AgentKind::Memory, "cell")
            .await
            .unwrap()
            .value;
        for _ in 0..23 {
            service.record_negative_outcome(&admin(), id).await.unwrap();
        }
        assert_eq!(service.agent(id).await.unwrap().reputation, 0);

        let last = service.record_negative_outcome(&admin(), id).await.unwrap();
        assert_eq!(last.len(), 2);
        assert_eq!(last[1].event.name(), "agent_retired");
    }

    let service = sled_service(&config, clock).await;
    assert!(matches!(
        service.agent(AgentId(1)).await,
        Err(LuxbinError::AgentNotFound { .. })
    ));
    assert!(matches!(
        service.agent_slot(AgentId(1)).await,
        Some(AgentSlot::Retired { .. })
    ));
    assert_eq!(service.kind_count(AgentKind::Memory).await, 0);
    assert!(matches!(
        service.record_negative_outcome(&admin(), AgentId(1)).await,
        Err(LuxbinError::AgentNotFound { .. })
    ));
}

#[tokio::test]
async fn test_stored_authority_wins_over_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = sled_config(dir.path());
    let clock = Arc::new(ManualClock::new(1_000));

    {
        let service = sled_service(&config, clock.clone()).await;
        service.transfer_authority(&admin(), &account("council")).await.unwrap();
    }

    let service = sled_service(&config, clock).await;
    assert_eq!(service.authority().await, account("council"));
    assert!(matches!(
        service.pause(&admin()).await,
        Err(LuxbinError::NotAuthority { .. })
    ));
}

/// Memory store whose commits can be switched to fail
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    failing: AtomicBool,
}

#[async_trait]
impl LedgerStore for FlakyStore {
    async fn load(&self) -> Result<Snapshot> {
        self.inner.load().await
    }

    async fn commit(&self, delta: &StateDelta) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(LuxbinError::Storage {
                message: "disk unavailable".to_string(),
            });
        }
        self.inner.commit(delta).await
    }
}

#[tokio::test]
async fn test_failed_commit_leaves_state_untouched() {
    let store = Arc::new(FlakyStore::default());
    let config = LuxbinConfig {
        authority: admin(),
        ..LuxbinConfig::default()
    };
    let service = LedgerService::open(&config, store.clone(), Arc::new(ManualClock::new(1_000)))
        .await
        .unwrap();
    let issuer = account("desk");
    service.authorize_issuer(&admin(), &issuer, Amount(100)).await.unwrap();

    let mut rx = service.subscribe();
    store.failing.store(true, Ordering::SeqCst);

    assert!(matches!(
        service.pause(&admin()).await,
        Err(LuxbinError::Storage { .. })
    ));
    assert!(!service.is_paused().await);

    assert!(matches!(
        service.issue(&issuer, &account("alice"), Amount(40)).await,
        Err(LuxbinError::Storage { .. })
    ));
    assert_eq!(service.balance_of(&account("alice")).await, Amount::zero());
    assert_eq!(service.total_issued().await, Amount::zero());
    assert_eq!(service.remaining_daily_quota(&issuer).await, Amount(100));
    assert!(rx.try_recv().is_err());

    // Nothing reached the store either
    let reopened = LedgerService::open(&config, store.clone(), Arc::new(ManualClock::new(1_000)))
        .await
        .unwrap();
    assert!(!reopened.is_paused().await);
    assert_eq!(reopened.total_issued().await, Amount::zero());

    store.failing.store(false, Ordering::SeqCst);
    service.pause(&admin()).await.unwrap();
    assert!(service.is_paused().await);
    assert_eq!(rx.recv().await.unwrap().event.name(), "paused");
}
