//! LUXBIN Ledger - Quota-limited issuance ledger
//!
//! The ledger is:
//! - Capped (total issuance never exceeds `max_supply`)
//! - Quota-limited (each issuer mints at most `daily_limit` per day index)
//! - Lazily windowed (per-day counters reset on the first issuance of a new day)
//! - Pausable (issuance and transfers stop, queries keep working)
//!
//! # Invariants
//!
//! 1. `sum(balances) == total_issued <= max_supply`
//! 2. `total_issued` never decreases
//! 3. Batches are checked against their aggregate before any credit happens
//! 4. A rejected call leaves the ledger untouched
//!
//! Authorization of the caller is the service's job; the methods here assume
//! the caller has already been checked against the access controller.

use std::collections::HashMap;

use luxbin_types::{
    day_index, AccountId, Amount, LedgerEvent, LuxbinError, Result, Timestamp, DEFAULT_MAX_SUPPLY,
    SECONDS_PER_DAY,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fixed parameters of an issuance ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerParams {
    /// Hard ceiling on `total_issued`
    pub max_supply: Amount,
    /// Length of one quota day in seconds
    pub day_length: u64,
}

impl Default for LedgerParams {
    fn default() -> Self {
        Self {
            max_supply: DEFAULT_MAX_SUPPLY,
            day_length: SECONDS_PER_DAY,
        }
    }
}

/// Issuance rights of one account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerEntry {
    pub authorized: bool,
    pub daily_limit: Amount,
}

/// Per-issuer counter of units minted on `last_day_index`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IssuanceWindow {
    pub last_day_index: u64,
    pub issued_this_day: Amount,
}

/// The window as seen on `current_day`
///
/// A stored window for another day reads as empty. Used by both the quota
/// query and issuance so the two can never disagree.
pub fn effective_window(window: Option<&IssuanceWindow>, current_day: u64) -> IssuanceWindow {
    match window {
        Some(w) if w.last_day_index == current_day => *w,
        _ => IssuanceWindow {
            last_day_index: current_day,
            issued_this_day: Amount::zero(),
        },
    }
}

/// Capped-supply balance ledger with per-issuer daily quotas
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssuanceLedger {
    params: LedgerParams,
    total_issued: Amount,
    balances: HashMap<AccountId, Amount>,
    issuers: HashMap<AccountId, IssuerEntry>,
    windows: HashMap<AccountId, IssuanceWindow>,
    paused: bool,
}

impl IssuanceLedger {
    pub fn new(params: LedgerParams) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    // ========================================================================
    // Issuer administration
    // ========================================================================

    /// Grant issuance rights; re-authorization overwrites the limit
    pub fn authorize_issuer(
        &mut self,
        issuer: &AccountId,
        daily_limit: Amount,
    ) -> Result<Vec<LedgerEvent>> {
        issuer.validate()?;
        self.issuers.insert(
            issuer.clone(),
            IssuerEntry {
                authorized: true,
                daily_limit,
            },
        );
        Ok(vec![LedgerEvent::IssuerAuthorized {
            issuer: issuer.clone(),
            daily_limit,
        }])
    }

    /// Withdraw issuance rights; the window counters are kept as they are
    pub fn revoke_issuer(&mut self, issuer: &AccountId) -> Result<Vec<LedgerEvent>> {
        let entry = self.issuer_entry_mut(issuer)?;
        entry.authorized = false;
        Ok(vec![LedgerEvent::IssuerRevoked {
            issuer: issuer.clone(),
        }])
    }

    pub fn update_daily_limit(
        &mut self,
        issuer: &AccountId,
        daily_limit: Amount,
    ) -> Result<Vec<LedgerEvent>> {
        let entry = self.issuer_entry_mut(issuer)?;
        entry.daily_limit = daily_limit;
        Ok(vec![LedgerEvent::DailyLimitUpdated {
            issuer: issuer.clone(),
            daily_limit,
        }])
    }

    fn issuer_entry_mut(&mut self, issuer: &AccountId) -> Result<&mut IssuerEntry> {
        self.issuers
            .get_mut(issuer)
            .ok_or_else(|| LuxbinError::NotAuthorizedIssuer {
                issuer: issuer.0.clone(),
            })
    }

    pub fn pause(&mut self, by: &AccountId) -> Vec<LedgerEvent> {
        self.paused = true;
        vec![LedgerEvent::Paused { by: by.clone() }]
    }

    pub fn unpause(&mut self, by: &AccountId) -> Vec<LedgerEvent> {
        self.paused = false;
        vec![LedgerEvent::Unpaused { by: by.clone() }]
    }

    // ========================================================================
    // Issuance
    // ========================================================================

    /// Mint `amount` to a single recipient
    pub fn issue(
        &mut self,
        issuer: &AccountId,
        recipient: &AccountId,
        amount: Amount,
        now: Timestamp,
    ) -> Result<Vec<LedgerEvent>> {
        self.issue_batch(issuer, &[(recipient.clone(), amount)], now)
    }

    /// Mint to many recipients in one call
    ///
    /// Supply and quota are checked once against the batch total, then the
    /// window is charged once and each recipient credited. Emits one
    /// `Issued` event per recipient.
    pub fn issue_batch(
        &mut self,
        issuer: &AccountId,
        grants: &[(AccountId, Amount)],
        now: Timestamp,
    ) -> Result<Vec<LedgerEvent>> {
        if self.paused {
            return Err(LuxbinError::SystemPaused);
        }
        if grants.is_empty() {
            return Err(LuxbinError::InvalidAmount {
                message: "Batch must contain at least one recipient".to_string(),
            });
        }
        for (recipient, amount) in grants {
            recipient.validate()?;
            if amount.is_zero() {
                return Err(LuxbinError::InvalidAmount {
                    message: format!("Amount for {recipient} must be greater than zero"),
                });
            }
        }

        let entry = match self.issuers.get(issuer) {
            Some(entry) if entry.authorized => *entry,
            _ => {
                return Err(LuxbinError::IssuerNotAuthorized {
                    issuer: issuer.0.clone(),
                })
            }
        };

        let current_day = day_index(now, self.params.day_length);
        let mut window = effective_window(self.windows.get(issuer), current_day);

        // An overflowing batch total is necessarily above the ceiling
        let batch_total = Amount::checked_sum(grants.iter().map(|(_, amount)| *amount));
        let new_total = batch_total.and_then(|total| self.total_issued.checked_add(total));
        let (batch_total, new_total) = match (batch_total, new_total) {
            (Some(batch), Some(total)) if total <= self.params.max_supply => (batch, total),
            _ => {
                return Err(LuxbinError::ExceedsMaxSupply {
                    total_issued: self.total_issued.0,
                    requested: batch_total.map(|a| a.0).unwrap_or(u64::MAX),
                    max_supply: self.params.max_supply.0,
                })
            }
        };

        let issued_today = match window.issued_this_day.checked_add(batch_total) {
            Some(today) if today <= entry.daily_limit => today,
            _ => {
                return Err(LuxbinError::ExceedsDailyLimit {
                    issuer: issuer.0.clone(),
                    issued_today: window.issued_this_day.0,
                    requested: batch_total.0,
                    daily_limit: entry.daily_limit.0,
                })
            }
        };

        if self
            .windows
            .get(issuer)
            .map_or(true, |w| w.last_day_index != current_day)
        {
            debug!(issuer = %issuer, day = current_day, "Issuance window reset");
        }
        window.issued_this_day = issued_today;
        self.windows.insert(issuer.clone(), window);

        // Each balance is bounded by new_total, so these additions cannot overflow
        let mut events = Vec::with_capacity(grants.len());
        for (recipient, amount) in grants {
            let balance = self.balances.entry(recipient.clone()).or_default();
            *balance = Amount(balance.0 + amount.0);
            events.push(LedgerEvent::Issued {
                issuer: issuer.clone(),
                recipient: recipient.clone(),
                amount: *amount,
            });
        }
        self.total_issued = new_total;

        Ok(events)
    }

    /// Move units between accounts; total supply is unchanged
    pub fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<Vec<LedgerEvent>> {
        if self.paused {
            return Err(LuxbinError::SystemPaused);
        }
        to.validate()?;
        if amount.is_zero() {
            return Err(LuxbinError::InvalidAmount {
                message: "Amount must be greater than zero".to_string(),
            });
        }

        let available = self.balance_of(from);
        let remaining =
            available
                .checked_sub(amount)
                .ok_or_else(|| LuxbinError::InsufficientBalance {
                    account: from.0.clone(),
                    available: available.0,
                    required: amount.0,
                })?;

        if from != to {
            let credited = self
                .balance_of(to)
                .checked_add(amount)
                .ok_or(LuxbinError::AmountOverflow)?;
            self.balances.insert(from.clone(), remaining);
            self.balances.insert(to.clone(), credited);
        }

        Ok(vec![LedgerEvent::Transferred {
            from: from.clone(),
            to: to.clone(),
            amount,
        }])
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Units `issuer` may still mint on the day containing `now`
    ///
    /// Pure read: a stale window is reinterpreted, never rewritten.
    pub fn remaining_daily_quota(&self, issuer: &AccountId, now: Timestamp) -> Amount {
        let entry = match self.issuers.get(issuer) {
            Some(entry) if entry.authorized => entry,
            _ => return Amount::zero(),
        };
        let current_day = day_index(now, self.params.day_length);
        let window = effective_window(self.windows.get(issuer), current_day);
        entry.daily_limit.saturating_sub(window.issued_this_day)
    }

    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or_default()
    }

    pub fn total_issued(&self) -> Amount {
        self.total_issued
    }

    pub fn max_supply(&self) -> Amount {
        self.params.max_supply
    }

    pub fn params(&self) -> LedgerParams {
        self.params
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn issuer(&self, issuer: &AccountId) -> Option<IssuerEntry> {
        self.issuers.get(issuer).copied()
    }

    /// The stored window, as last written by issuance
    pub fn stored_window(&self, issuer: &AccountId) -> Option<IssuanceWindow> {
        self.windows.get(issuer).copied()
    }

    pub fn accounts(&self) -> impl Iterator<Item = (&AccountId, &Amount)> {
        self.balances.iter()
    }

    pub fn issuers(&self) -> impl Iterator<Item = (&AccountId, &IssuerEntry)> {
        self.issuers.iter()
    }

    /// Check `sum(balances) == total_issued <= max_supply`
    pub fn supply_invariant_holds(&self) -> bool {
        let sum = Amount::checked_sum(self.balances.values().copied());
        sum == Some(self.total_issued) && self.total_issued <= self.params.max_supply
    }

    // ========================================================================
    // Restore
    // ========================================================================

    /// Rebuild a ledger from persisted collections
    pub fn restore(
        params: LedgerParams,
        total_issued: Amount,
        paused: bool,
        balances: HashMap<AccountId, Amount>,
        issuers: HashMap<AccountId, IssuerEntry>,
        windows: HashMap<AccountId, IssuanceWindow>,
    ) -> Self {
        Self {
            params,
            total_issued,
            balances,
            issuers,
            windows,
            paused,
        }
    }
}
