//! Service configuration
//!
//! Values come from `LUXBIN_*` environment variables (a `.env` file is
//! honoured) and fall back to the defaults below.

use std::path::PathBuf;

use luxbin_ledger::LedgerParams;
use luxbin_types::{AccountId, Amount, LuxbinError, Result, DEFAULT_MAX_SUPPLY, SECONDS_PER_DAY};
use serde::{Deserialize, Serialize};

pub const DEFAULT_AUTHORITY: &str = "luxbin-authority";
pub const DEFAULT_DATA_DIR: &str = "./luxbin-data";
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LuxbinConfig {
    /// Administrative authority installed when a ledger is first created
    pub authority: AccountId,
    /// Directory of the sled store
    pub data_dir: PathBuf,
    pub max_supply: Amount,
    /// Length of one quota day in seconds
    pub day_length_secs: u64,
    /// Capacity of the notification broadcast channel
    pub event_capacity: usize,
}

impl Default for LuxbinConfig {
    fn default() -> Self {
        Self {
            authority: AccountId::from(DEFAULT_AUTHORITY),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            max_supply: DEFAULT_MAX_SUPPLY,
            day_length_secs: SECONDS_PER_DAY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl LuxbinConfig {
    /// Load from the environment, reading `.env` first when present
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let authority = match lookup("LUXBIN_AUTHORITY") {
            Some(value) => AccountId::parse(value.trim())?,
            None => defaults.authority,
        };
        let data_dir = lookup("LUXBIN_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let max_supply = match lookup("LUXBIN_MAX_SUPPLY") {
            Some(value) => Amount(parse_number("LUXBIN_MAX_SUPPLY", &value)?),
            None => defaults.max_supply,
        };
        let day_length_secs = match lookup("LUXBIN_DAY_LENGTH_SECS") {
            Some(value) => parse_number("LUXBIN_DAY_LENGTH_SECS", &value)?,
            None => defaults.day_length_secs,
        };
        let event_capacity = match lookup("LUXBIN_EVENT_CAPACITY") {
            Some(value) => parse_number::<usize>("LUXBIN_EVENT_CAPACITY", &value)?,
            None => defaults.event_capacity,
        };

        let config = Self {
            authority,
            data_dir,
            max_supply,
            day_length_secs,
            event_capacity,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.authority.validate()?;
        if self.day_length_secs == 0 {
            return Err(LuxbinError::Config {
                message: "day length must be at least one second".to_string(),
            });
        }
        if self.event_capacity == 0 {
            return Err(LuxbinError::Config {
                message: "event capacity must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn ledger_params(&self) -> LedgerParams {
        LedgerParams {
            max_supply: self.max_supply,
            day_length: self.day_length_secs,
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| LuxbinError::Config {
        message: format!("{key} is not a valid number: {value}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = LuxbinConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, LuxbinConfig::default());
        assert_eq!(config.ledger_params().day_length, SECONDS_PER_DAY);
    }

    #[test]
    fn test_overrides() {
        let config = LuxbinConfig::from_lookup(lookup(&[
            ("LUXBIN_AUTHORITY", "treasury"),
            ("LUXBIN_DATA_DIR", "/var/lib/luxbin"),
            ("LUXBIN_MAX_SUPPLY", "5000"),
            ("LUXBIN_DAY_LENGTH_SECS", "60"),
            ("LUXBIN_EVENT_CAPACITY", "16"),
        ]))
        .unwrap();

        assert_eq!(config.authority, AccountId::from("treasury"));
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/luxbin"));
        assert_eq!(config.max_supply, Amount(5000));
        assert_eq!(config.day_length_secs, 60);
        assert_eq!(config.event_capacity, 16);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            LuxbinConfig::from_lookup(lookup(&[("LUXBIN_MAX_SUPPLY", "lots")])),
            Err(LuxbinError::Config { .. })
        ));
        assert!(matches!(
            LuxbinConfig::from_lookup(lookup(&[("LUXBIN_DAY_LENGTH_SECS", "0")])),
            Err(LuxbinError::Config { .. })
        ));
        assert!(matches!(
            LuxbinConfig::from_lookup(lookup(&[("LUXBIN_AUTHORITY", "   ")])),
            Err(LuxbinError::InvalidAddressOrAccount { .. })
        ));
    }
}
