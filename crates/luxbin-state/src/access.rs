//! Access controller
//!
//! One administrative authority per ledger instance, plus a table of
//! capabilities it has granted. The authority implicitly holds every
//! capability.

use std::collections::{BTreeMap, BTreeSet};

use luxbin_types::{AccountId, Capability, LedgerEvent, LuxbinError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessController {
    authority: AccountId,
    capabilities: BTreeMap<AccountId, BTreeSet<Capability>>,
}

impl AccessController {
    pub fn new(authority: AccountId) -> Result<Self> {
        authority.validate()?;
        Ok(Self {
            authority,
            capabilities: BTreeMap::new(),
        })
    }

    pub fn restore(
        authority: AccountId,
        capabilities: BTreeMap<AccountId, BTreeSet<Capability>>,
    ) -> Self {
        Self {
            authority,
            capabilities,
        }
    }

    pub fn authority(&self) -> &AccountId {
        &self.authority
    }

    pub fn is_authority(&self, caller: &AccountId) -> bool {
        &self.authority == caller
    }

    pub fn require_authority(&self, caller: &AccountId) -> Result<()> {
        if self.is_authority(caller) {
            Ok(())
        } else {
            Err(LuxbinError::NotAuthority {
                caller: caller.0.clone(),
            })
        }
    }

    pub fn has_capability(&self, account: &AccountId, capability: Capability) -> bool {
        self.is_authority(account)
            || self
                .capabilities
                .get(account)
                .is_some_and(|caps| caps.contains(&capability))
    }

    pub fn require_capability(&self, caller: &AccountId, capability: Capability) -> Result<()> {
        if self.has_capability(caller, capability) {
            Ok(())
        } else {
            Err(LuxbinError::CapabilityRequired {
                caller: caller.0.clone(),
                capability,
            })
        }
    }

    /// Capabilities explicitly granted to `account`
    pub fn capabilities_of(&self, account: &AccountId) -> BTreeSet<Capability> {
        self.capabilities.get(account).cloned().unwrap_or_default()
    }

    pub fn grants(&self) -> impl Iterator<Item = (&AccountId, &BTreeSet<Capability>)> {
        self.capabilities.iter()
    }

    pub fn grant(
        &mut self,
        caller: &AccountId,
        account: &AccountId,
        capability: Capability,
    ) -> Result<Vec<LedgerEvent>> {
        self.require_authority(caller)?;
        account.validate()?;
        self.capabilities
            .entry(account.clone())
            .or_default()
            .insert(capability);
        Ok(vec![LedgerEvent::CapabilityGranted {
            account: account.clone(),
            capability,
        }])
    }

    pub fn revoke(
        &mut self,
        caller: &AccountId,
        account: &AccountId,
        capability: Capability,
    ) -> Result<Vec<LedgerEvent>> {
        self.require_authority(caller)?;
        if let Some(caps) = self.capabilities.get_mut(account) {
            caps.remove(&capability);
        }
        Ok(vec![LedgerEvent::CapabilityRevoked {
            account: account.clone(),
            capability,
        }])
    }

    pub fn transfer_authority(
        &mut self,
        caller: &AccountId,
        new_authority: &AccountId,
    ) -> Result<Vec<LedgerEvent>> {
        self.require_authority(caller)?;
        new_authority.validate()?;
        let from = std::mem::replace(&mut self.authority, new_authority.clone());
        Ok(vec![LedgerEvent::AuthorityTransferred {
            from,
            to: new_authority.clone(),
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> AccountId {
        AccountId::from("admin")
    }

    #[test]
    fn test_authority_holds_every_capability() {
        let access = AccessController::new(admin()).unwrap();
        assert!(access.has_capability(&admin(), Capability::Issue));
        assert!(access.has_capability(&admin(), Capability::RegistryWrite));
        assert!(!access.has_capability(&AccountId::from("x"), Capability::Issue));
    }

    #[test]
    fn test_grant_and_revoke() {
        let mut access = AccessController::new(admin()).unwrap();
        let oracle = AccountId::from("oracle");

        let result = access.grant(&oracle, &oracle, Capability::RegistryWrite);
        assert!(matches!(result, Err(LuxbinError::NotAuthority { .. })));

        access.grant(&admin(), &oracle, Capability::RegistryWrite).unwrap();
        assert!(access.require_capability(&oracle, Capability::RegistryWrite).is_ok());
        assert!(matches!(
            access.require_capability(&oracle, Capability::Issue),
            Err(LuxbinError::CapabilityRequired { capability: Capability::Issue, .. })
        ));

        access.revoke(&admin(), &oracle, Capability::RegistryWrite).unwrap();
        assert!(!access.has_capability(&oracle, Capability::RegistryWrite));
    }

    #[test]
    fn test_transfer_authority() {
        let mut access = AccessController::new(admin()).unwrap();
        let next = AccountId::from("council");

        assert!(matches!(
            access.transfer_authority(&admin(), &AccountId::from("")),
            Err(LuxbinError::InvalidAddressOrAccount { .. })
        ));
        access.transfer_authority(&admin(), &next).unwrap();
        assert!(access.is_authority(&next));
        assert!(matches!(
            access.require_authority(&admin()),
            Err(LuxbinError::NotAuthority { .. })
        ));
    }

    #[test]
    fn test_invalid_authority_rejected() {
        assert!(AccessController::new(AccountId::from("")).is_err());
    }
}
