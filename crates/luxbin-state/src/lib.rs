//! LUXBIN State - The serialized ledger service
//!
//! Composes the issuance ledger, agent registry and attestation anchor behind
//! one access controller and one global lock, persists every mutation and
//! broadcasts the resulting events.
//!
//! # Architecture
//!
//! ```text
//! caller ──► LedgerService ──► staged LedgerState ──► StateDelta ──► LedgerStore
//!                  │                                                  (sled / memory)
//!                  └──► broadcast::Sender<EventRecord> ──► subscribers
//! ```

pub mod access;
pub mod config;
pub mod service;
pub mod state;
pub mod store;

pub use access::AccessController;
pub use config::LuxbinConfig;
pub use service::{Applied, LedgerService};
pub use state::{LedgerState, LedgerStatus};
pub use store::{Collection, LedgerStore, MemoryStore, SledStore, Snapshot, StateDelta};
