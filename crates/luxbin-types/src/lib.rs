//! LUXBIN Types - Canonical domain types for the reputation-weighted ledger
//!
//! This crate contains the foundational types shared by every LUXBIN component
//! and has no dependencies on other luxbin crates:
//!
//! - Identity types (AccountId, AgentId)
//! - Amounts and fixed-width digests
//! - Agent kinds and the per-kind operation table
//! - The external time source (Clock)
//! - Ledger notifications and the unified error type
//!
//! # Architectural Invariants
//!
//! 1. Every operation either applies fully or not at all
//! 2. Failures are explicit and typed, never retried internally
//! 3. Time is always supplied from outside the ledger

pub mod account;
pub mod agent;
pub mod amount;
pub mod capability;
pub mod clock;
pub mod digest;
pub mod error;
pub mod event;

pub use account::*;
pub use agent::*;
pub use amount::*;
pub use capability::*;
pub use clock::*;
pub use digest::*;
pub use error::*;
pub use event::*;

/// Version of the LUXBIN types schema
pub const TYPES_VERSION: &str = "0.1.0";
