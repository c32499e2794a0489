//! Ledger amounts
//!
//! Amounts are unsigned integers in the smallest ledger unit. All arithmetic
//! is checked; callers decide which error an overflow maps to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default hard ceiling on total issuance
pub const DEFAULT_MAX_SUPPLY: Amount = Amount(1_000_000_000);

/// An amount of ledger units
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Amount(pub u64);

impl Amount {
    pub fn zero() -> Self {
        Self(0)
    }

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked sum of a sequence of amounts
    pub fn checked_sum<I: IntoIterator<Item = Amount>>(amounts: I) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Amount::zero(), |acc, a| acc.checked_add(a))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_sum() {
        let total = Amount::checked_sum([Amount::new(1), Amount::new(2), Amount::new(3)]);
        assert_eq!(total, Some(Amount::new(6)));

        let overflow = Amount::checked_sum([Amount::new(u64::MAX), Amount::new(1)]);
        assert_eq!(overflow, None);
    }

    #[test]
    fn test_saturating_sub() {
        assert_eq!(Amount::new(5).saturating_sub(Amount::new(9)), Amount::zero());
        assert_eq!(Amount::new(9).saturating_sub(Amount::new(5)), Amount::new(4));
    }
}
