//! Issuer commands - authorization, daily limits and quota

use colored::*;
use luxbin_state::LedgerService;
use luxbin_types::{AccountId, Amount};

use crate::display;

pub async fn authorize(
    service: &LedgerService,
    caller: &AccountId,
    issuer: &AccountId,
    daily_limit: Amount,
) -> anyhow::Result<()> {
    display::section("Authorize Issuer");
    let events = service.authorize_issuer(caller, issuer, daily_limit).await?;
    display::success(&format!(
        "{} authorized with daily limit {}",
        issuer.as_str().bright_cyan(),
        daily_limit.to_string().bright_cyan()
    ));
    display::events(&events);
    Ok(())
}

pub async fn revoke(
    service: &LedgerService,
    caller: &AccountId,
    issuer: &AccountId,
) -> anyhow::Result<()> {
    display::section("Revoke Issuer");
    let events = service.revoke_issuer(caller, issuer).await?;
    display::success(&format!("{} can no longer issue", issuer.as_str().bright_cyan()));
    display::events(&events);
    Ok(())
}

pub async fn set_limit(
    service: &LedgerService,
    caller: &AccountId,
    issuer: &AccountId,
    daily_limit: Amount,
) -> anyhow::Result<()> {
    display::section("Update Daily Limit");
    let events = service.update_daily_limit(caller, issuer, daily_limit).await?;
    display::success(&format!(
        "{} daily limit is now {}",
        issuer.as_str().bright_cyan(),
        daily_limit.to_string().bright_cyan()
    ));
    display::events(&events);
    Ok(())
}

pub async fn show(service: &LedgerService, issuer: &AccountId) -> anyhow::Result<()> {
    display::section(&format!("Issuer {}", issuer));
    match service.issuer(issuer).await {
        Some(entry) => {
            let state = if entry.authorized {
                "authorized".bright_green()
            } else {
                "revoked".bright_red()
            };
            println!("  Status: {}", state);
            display::kv("Daily limit", &entry.daily_limit.to_string());
            display::kv(
                "Remaining today",
                &service.remaining_daily_quota(issuer).await.to_string(),
            );
        }
        None => display::warning("Never authorized"),
    }
    Ok(())
}
