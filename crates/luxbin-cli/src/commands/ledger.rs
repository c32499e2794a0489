//! Ledger commands - minting and transfers

use colored::*;
use luxbin_state::LedgerService;
use luxbin_types::{AccountId, Amount};

use crate::display;

/// Mint to one or more recipients, charged as one batch
pub async fn mint(
    service: &LedgerService,
    caller: &AccountId,
    grants: &[(AccountId, Amount)],
) -> anyhow::Result<()> {
    display::section("Mint");
    let events = service.issue_batch(caller, grants).await?;
    for (recipient, amount) in grants {
        display::success(&format!(
            "Issued {} to {}",
            amount.to_string().bright_cyan(),
            recipient.as_str().bright_cyan()
        ));
    }
    display::kv(
        "Remaining today",
        &service.remaining_daily_quota(caller).await.to_string(),
    );
    display::kv("Total issued", &service.total_issued().await.to_string());
    display::events(&events);
    Ok(())
}

pub async fn transfer(
    service: &LedgerService,
    caller: &AccountId,
    to: &AccountId,
    amount: Amount,
) -> anyhow::Result<()> {
    display::section("Transfer");
    let events = service.transfer(caller, to, amount).await?;
    display::success(&format!(
        "Moved {} from {} to {}",
        amount.to_string().bright_cyan(),
        caller.as_str().bright_cyan(),
        to.as_str().bright_cyan()
    ));
    display::kv(caller.as_str(), &service.balance_of(caller).await.to_string());
    display::kv(to.as_str(), &service.balance_of(to).await.to_string());
    display::events(&events);
    Ok(())
}

/// Parse `account=amount`
pub fn parse_grant(s: &str) -> Result<(AccountId, Amount), String> {
    let (account, amount) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ACCOUNT=AMOUNT, got {s}"))?;
    let account = AccountId::parse(account.trim()).map_err(|e| e.to_string())?;
    let amount = amount
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid amount {amount}: {e}"))?;
    Ok((account, Amount(amount)))
}
