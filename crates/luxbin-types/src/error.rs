//! Error types for the LUXBIN ledger
//!
//! Every failure is a rejected operation: it is reported synchronously and
//! leaves ledger state exactly as it was before the call.

use thiserror::Error;

use crate::{AgentId, AgentKind, AgentOperation, Capability};

/// Result type for LUXBIN operations
pub type Result<T> = std::result::Result<T, LuxbinError>;

/// LUXBIN error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LuxbinError {
    // ========================================================================
    // Access Errors
    // ========================================================================

    /// Caller is not the administrative authority
    #[error("Caller {caller} is not the administrative authority")]
    NotAuthority { caller: String },

    /// Caller lacks the capability the operation requires
    #[error("Caller {caller} lacks capability {capability}")]
    CapabilityRequired { caller: String, capability: Capability },

    /// Account identifier cannot name a real account
    #[error("Invalid address or account: {account:?}")]
    InvalidAddressOrAccount { account: String },

    // ========================================================================
    // Issuance Errors
    // ========================================================================

    /// Issuer is not currently authorized to mint
    #[error("Issuer {issuer} is not authorized")]
    IssuerNotAuthorized { issuer: String },

    /// Issuer was never authorized, so it has no limit to update
    #[error("Account {issuer} was never authorized as an issuer")]
    NotAuthorizedIssuer { issuer: String },

    /// Issuance would push total supply past the ceiling
    #[error("Exceeds max supply: issued {total_issued} + requested {requested} > {max_supply}")]
    ExceedsMaxSupply {
        total_issued: u64,
        requested: u64,
        max_supply: u64,
    },

    /// Issuance would push the issuer past its daily quota
    #[error("Exceeds daily limit for {issuer}: issued today {issued_today} + requested {requested} > {daily_limit}")]
    ExceedsDailyLimit {
        issuer: String,
        issued_today: u64,
        requested: u64,
        daily_limit: u64,
    },

    /// Issuance and transfers are suspended
    #[error("System is paused")]
    SystemPaused,

    /// Balance too small for a transfer
    #[error("Insufficient balance in {account}: have {available}, need {required}")]
    InsufficientBalance {
        account: String,
        available: u64,
        required: u64,
    },

    /// Zero amount or empty batch
    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    /// Arithmetic overflow on an amount
    #[error("Amount overflow")]
    AmountOverflow,

    // ========================================================================
    // Registry Errors
    // ========================================================================

    /// Agent never existed or has been retired
    #[error("Agent {id} not found")]
    AgentNotFound { id: AgentId },

    /// Operation is not permitted for the agent's kind
    #[error("Operation {operation} is not valid for {kind} agent {id}")]
    InvalidKindForOperation {
        id: AgentId,
        kind: AgentKind,
        operation: AgentOperation,
    },

    /// Batch creation size out of range
    #[error("Invalid batch size {requested}: must be between 1 and {max}")]
    InvalidBatchSize { requested: u32, max: u32 },

    // ========================================================================
    // Anchor Errors
    // ========================================================================

    /// Commitment digest has the wrong width
    #[error("Invalid commitment size: expected {expected} bytes, got {actual}")]
    InvalidCommitmentSize { expected: usize, actual: usize },

    // ========================================================================
    // Infrastructure Errors
    // ========================================================================

    /// Persistent store failure
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Encoding or decoding failure
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Invalid configuration value
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl From<serde_json::Error> for LuxbinError {
    fn from(e: serde_json::Error) -> Self {
        LuxbinError::Serialization {
            message: e.to_string(),
        }
    }
}
