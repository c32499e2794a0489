//! Status command

use colored::*;
use luxbin_state::LedgerService;
use luxbin_types::AccountId;

use crate::display;

pub async fn show(service: &LedgerService, account: Option<&AccountId>) -> anyhow::Result<()> {
    let status = service.status().await;

    display::section("LUXBIN Ledger Status");
    display::kv("Authority", status.authority.as_str());
    let paused = if status.paused {
        "paused".bright_red()
    } else {
        "running".bright_green()
    };
    println!("      State: {}", paused);
    display::kv(
        "Supply",
        &format!("{} / {}", status.total_issued, status.max_supply),
    );
    display::kv("Day length", &format!("{}s", status.day_length_secs));
    display::kv("Accounts", &status.accounts.to_string());
    display::kv("Issuers", &status.issuers.to_string());
    display::kv("Live agents", &status.live_agents.to_string());
    for (kind, count) in &status.agents_by_kind {
        display::kv(&format!("  {}", kind.as_str()), &count.to_string());
    }
    display::kv("Next agent id", &status.next_agent_id.to_string());
    display::kv("Temporal locks", &status.temporal_locks.to_string());
    display::kv("Memory roots", &status.memory_roots.to_string());

    if let Some(account) = account {
        display::section(&format!("Account {}", account));
        display::kv("Balance", &service.balance_of(account).await.to_string());
    }
    Ok(())
}
