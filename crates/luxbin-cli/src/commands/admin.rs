//! Administrative commands - pause switch, capabilities and authority

use colored::*;
use luxbin_state::LedgerService;
use luxbin_types::{AccountId, Capability};

use crate::display;

pub async fn pause(service: &LedgerService, caller: &AccountId) -> anyhow::Result<()> {
    display::section("Pause Ledger");
    let events = service.pause(caller).await?;
    display::success("Issuance and transfers are suspended");
    display::events(&events);
    Ok(())
}

pub async fn unpause(service: &LedgerService, caller: &AccountId) -> anyhow::Result<()> {
    display::section("Unpause Ledger");
    let events = service.unpause(caller).await?;
    display::success("Issuance and transfers resumed");
    display::events(&events);
    Ok(())
}

pub async fn grant(
    service: &LedgerService,
    caller: &AccountId,
    account: &AccountId,
    capability: Capability,
) -> anyhow::Result<()> {
    display::section("Grant Capability");
    let events = service.grant_capability(caller, account, capability).await?;
    display::success(&format!(
        "{} may now use {}",
        account.as_str().bright_cyan(),
        capability.as_str().bright_yellow()
    ));
    display::events(&events);
    Ok(())
}

pub async fn revoke(
    service: &LedgerService,
    caller: &AccountId,
    account: &AccountId,
    capability: Capability,
) -> anyhow::Result<()> {
    display::section("Revoke Capability");
    let events = service.revoke_capability(caller, account, capability).await?;
    display::success(&format!(
        "{} no longer holds {}",
        account.as_str().bright_cyan(),
        capability.as_str().bright_yellow()
    ));
    display::events(&events);
    Ok(())
}

pub async fn transfer_authority(
    service: &LedgerService,
    caller: &AccountId,
    new_authority: &AccountId,
) -> anyhow::Result<()> {
    display::section("Transfer Authority");
    let events = service.transfer_authority(caller, new_authority).await?;
    display::success(&format!(
        "Authority moved from {} to {}",
        caller.as_str().bright_cyan(),
        new_authority.as_str().bright_cyan()
    ));
    display::events(&events);
    Ok(())
}
