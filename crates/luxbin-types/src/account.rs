//! Account identities
//!
//! Accounts are opaque strings supplied by the caller's identity context. The
//! ledger only rejects values that cannot name a real account.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{LuxbinError, Result};

/// Longest account identifier accepted by the ledger
pub const MAX_ACCOUNT_LEN: usize = 128;

/// Identifier of an account (issuer, recipient, agent owner, submitter)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl AccountId {
    /// Wrap a string without validation
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Parse and validate an account identifier
    pub fn parse(s: &str) -> Result<Self> {
        let account = Self(s.to_string());
        account.validate()?;
        Ok(account)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this identifier can name a real account
    ///
    /// Empty strings, whitespace, over-long values and the all-zero hex
    /// address are rejected.
    pub fn is_valid(&self) -> bool {
        let s = self.0.as_str();
        if s.is_empty() || s.len() > MAX_ACCOUNT_LEN {
            return false;
        }
        if s.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return false;
        }
        !is_null_address(s)
    }

    /// Fail with `InvalidAddressOrAccount` unless valid
    pub fn validate(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(LuxbinError::InvalidAddressOrAccount {
                account: self.0.clone(),
            })
        }
    }
}

fn is_null_address(s: &str) -> bool {
    match s.strip_prefix("0x") {
        Some(rest) => !rest.is_empty() && rest.chars().all(|c| c == '0'),
        None => false,
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
