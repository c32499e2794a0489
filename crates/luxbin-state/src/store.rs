//! Persistence
//!
//! The ledger is persisted as five keyed collections of JSON documents.
//! A [`StateDelta`] carries every key one operation touched and is written
//! in a single transaction.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use luxbin_types::{LuxbinError, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

/// One persisted collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Collection {
    Balances,
    Issuers,
    Agents,
    Anchors,
    Meta,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Balances,
        Collection::Issuers,
        Collection::Agents,
        Collection::Anchors,
        Collection::Meta,
    ];

    pub fn tree_name(&self) -> &'static str {
        match self {
            Collection::Balances => "balances",
            Collection::Issuers => "issuers",
            Collection::Agents => "agents",
            Collection::Anchors => "anchors",
            Collection::Meta => "meta",
        }
    }
}

/// Keys written by one operation, last write per key wins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateDelta {
    writes: BTreeMap<(Collection, String), Vec<u8>>,
}

impl StateDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put<T: Serialize>(
        &mut self,
        collection: Collection,
        key: impl Into<String>,
        value: &T,
    ) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.writes.insert((collection, key.into()), bytes);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn writes(&self) -> impl Iterator<Item = (Collection, &str, &[u8])> {
        self.writes
            .iter()
            .map(|((collection, key), value)| (*collection, key.as_str(), value.as_slice()))
    }
}

/// Everything read back from a store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    collections: BTreeMap<Collection, BTreeMap<String, Vec<u8>>>,
}

impl Snapshot {
    pub fn insert(&mut self, collection: Collection, key: String, value: Vec<u8>) {
        self.collections
            .entry(collection)
            .or_default()
            .insert(key, value);
    }

    pub fn is_empty(&self) -> bool {
        self.collections.values().all(|entries| entries.is_empty())
    }

    pub fn get<T: for<'de> Deserialize<'de>>(
        &self,
        collection: Collection,
        key: &str,
    ) -> Result<Option<T>> {
        match self.collections.get(&collection).and_then(|c| c.get(key)) {
            Some(bytes) => Ok(Some(serde_json::from_slice(bytes)?)),
            None => Ok(None),
        }
    }

    /// Entries of `collection` whose key starts with `prefix`, prefix stripped
    pub fn scan<'a, T: for<'de> Deserialize<'de>>(
        &'a self,
        collection: Collection,
        prefix: &'a str,
    ) -> Result<Vec<(&'a str, T)>> {
        let Some(entries) = self.collections.get(&collection) else {
            return Ok(Vec::new());
        };
        entries
            .iter()
            .filter_map(|(key, bytes)| key.strip_prefix(prefix).map(|rest| (rest, bytes)))
            .map(|(rest, bytes)| Ok((rest, serde_json::from_slice(bytes)?)))
            .collect()
    }

    fn apply(&mut self, delta: &StateDelta) {
        for (collection, key, value) in delta.writes() {
            self.insert(collection, key.to_string(), value.to_vec());
        }
    }
}

/// Durable backing for the ledger state
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Read every collection
    async fn load(&self) -> Result<Snapshot>;

    /// Write all keys of `delta` atomically
    async fn commit(&self, delta: &StateDelta) -> Result<()>;
}

// ============================================================================
// In-memory store
// ============================================================================

/// Volatile store for tests and ephemeral ledgers
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: RwLock<Snapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn load(&self) -> Result<Snapshot> {
        Ok(self.snapshot.read().await.clone())
    }

    async fn commit(&self, delta: &StateDelta) -> Result<()> {
        self.snapshot.write().await.apply(delta);
        Ok(())
    }
}

// ============================================================================
// Sled store
// ============================================================================

/// Embedded store with one sled tree per collection
pub struct SledStore {
    db: sled::Db,
    balances: sled::Tree,
    issuers: sled::Tree,
    agents: sled::Tree,
    anchors: sled::Tree,
    meta: sled::Tree,
}

impl SledStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path.as_ref()).map_err(storage_error)?;
        let open_tree =
            |collection: Collection| db.open_tree(collection.tree_name()).map_err(storage_error);
        let balances = open_tree(Collection::Balances)?;
        let issuers = open_tree(Collection::Issuers)?;
        let agents = open_tree(Collection::Agents)?;
        let anchors = open_tree(Collection::Anchors)?;
        let meta = open_tree(Collection::Meta)?;
        Ok(Self {
            db,
            balances,
            issuers,
            agents,
            anchors,
            meta,
        })
    }

    fn tree(&self, collection: Collection) -> &sled::Tree {
        match collection {
            Collection::Balances => &self.balances,
            Collection::Issuers => &self.issuers,
            Collection::Agents => &self.agents,
            Collection::Anchors => &self.anchors,
            Collection::Meta => &self.meta,
        }
    }
}

#[async_trait]
impl LedgerStore for SledStore {
    async fn load(&self) -> Result<Snapshot> {
        let mut snapshot = Snapshot::default();
        for collection in Collection::ALL {
            for entry in self.tree(collection).iter() {
                let (key, value) = entry.map_err(storage_error)?;
                let key = String::from_utf8(key.to_vec()).map_err(|e| LuxbinError::Storage {
                    message: format!("non-utf8 key in {}: {e}", collection.tree_name()),
                })?;
                snapshot.insert(collection, key, value.to_vec());
            }
        }
        Ok(snapshot)
    }

    async fn commit(&self, delta: &StateDelta) -> Result<()> {
        use sled::transaction::{TransactionError, Transactional};

        if delta.is_empty() {
            return Ok(());
        }

        (
            &self.balances,
            &self.issuers,
            &self.agents,
            &self.anchors,
            &self.meta,
        )
            .transaction(|(balances, issuers, agents, anchors, meta)| {
                for (collection, key, value) in delta.writes() {
                    let tree = match collection {
                        Collection::Balances => balances,
                        Collection::Issuers => issuers,
                        Collection::Agents => agents,
                        Collection::Anchors => anchors,
                        Collection::Meta => meta,
                    };
                    tree.insert(key.as_bytes(), value)?;
                }
                Ok(())
            })
            .map_err(|e: TransactionError<()>| match e {
                TransactionError::Storage(err) => storage_error(err),
                TransactionError::Abort(()) => LuxbinError::Storage {
                    message: "transaction aborted".to_string(),
                },
            })?;

        self.db.flush_async().await.map_err(storage_error)?;
        debug!(keys = delta.len(), "Committed state delta");
        Ok(())
    }
}

fn storage_error(err: sled::Error) -> LuxbinError {
    LuxbinError::Storage {
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta() -> StateDelta {
        let mut delta = StateDelta::new();
        delta.put(Collection::Balances, "alice", &42u64).unwrap();
        delta.put(Collection::Meta, "paused", &false).unwrap();
        delta.put(Collection::Agents, "slot/00000000000000000001", &"x").unwrap();
        delta
    }

    #[test]
    fn test_delta_last_write_wins() {
        let mut delta = StateDelta::new();
        delta.put(Collection::Balances, "alice", &1u64).unwrap();
        delta.put(Collection::Balances, "alice", &2u64).unwrap();
        assert_eq!(delta.len(), 1);
        let (_, _, value) = delta.writes().next().unwrap();
        assert_eq!(value, b"2");
    }

    #[test]
    fn test_snapshot_scan_strips_prefix() {
        let mut snapshot = Snapshot::default();
        snapshot.apply(&delta());
        let slots: Vec<(&str, String)> = snapshot.scan(Collection::Agents, "slot/").unwrap();
        assert_eq!(slots, vec![("00000000000000000001", "x".to_string())]);
        assert!(snapshot.scan::<u64>(Collection::Issuers, "entry/").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.load().await.unwrap().is_empty());

        store.commit(&delta()).await.unwrap();
        let snapshot = store.load().await.unwrap();
        assert_eq!(snapshot.get::<u64>(Collection::Balances, "alice").unwrap(), Some(42));
        assert_eq!(snapshot.get::<bool>(Collection::Meta, "paused").unwrap(), Some(false));
    }

    #[tokio::test]
    async fn test_sled_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SledStore::open(dir.path()).unwrap();
            store.commit(&delta()).await.unwrap();
        }

        let store = SledStore::open(dir.path()).unwrap();
        let snapshot = store.load().await.unwrap();
        assert_eq!(snapshot.get::<u64>(Collection::Balances, "alice").unwrap(), Some(42));
        assert_eq!(snapshot.get::<u64>(Collection::Balances, "bob").unwrap(), None);
    }
}
