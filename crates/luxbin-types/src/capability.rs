//! Capabilities gating privileged operations

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::LuxbinError;

/// A right that the administrative authority can grant to an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// Mint new ledger units (within the issuer's daily quota)
    Issue,
    /// Record outcomes against agent records
    RegistryWrite,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Issue => "issue",
            Capability::RegistryWrite => "registry.write",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = LuxbinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "issue" => Ok(Capability::Issue),
            "registry.write" | "registry-write" => Ok(Capability::RegistryWrite),
            other => Err(LuxbinError::Config {
                message: format!("unknown capability: {other}"),
            }),
        }
    }
}
