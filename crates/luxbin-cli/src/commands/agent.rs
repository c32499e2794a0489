//! Agent commands - creation, outcomes and lifecycle

use colored::*;
use luxbin_registry::{AgentRecord, AgentSlot};
use luxbin_state::LedgerService;
use luxbin_types::{AccountId, AgentId, AgentKind};

use crate::display;

/// Outcome to record against an agent
#[derive(Debug, Clone, Copy)]
pub enum Outcome {
    Positive,
    Negative,
    Response,
}

pub async fn create(
    service: &LedgerService,
    caller: &AccountId,
    owner: &AccountId,
    kind: AgentKind,
    fingerprint: &str,
) -> anyhow::Result<()> {
    display::section("Create Agent");
    let applied = service.create_agent(caller, owner, kind, fingerprint).await?;
    display::success(&format!(
        "Created {} {} for {}",
        kind.as_str().bright_yellow(),
        applied.value.to_string().bright_cyan(),
        owner.as_str().bright_cyan()
    ));
    display::events(&applied.events);
    Ok(())
}

pub async fn batch(
    service: &LedgerService,
    caller: &AccountId,
    owner: &AccountId,
    kind: AgentKind,
    count: u32,
) -> anyhow::Result<()> {
    display::section("Batch Create Agents");
    let applied = service.batch_create_agents(caller, owner, kind, count).await?;
    if let (Some(first), Some(last)) = (applied.value.first(), applied.value.last()) {
        display::success(&format!(
            "Created {} {} agents ({} to {})",
            applied.value.len(),
            kind.as_str().bright_yellow(),
            first.to_string().bright_cyan(),
            last.to_string().bright_cyan()
        ));
    }
    display::kv(kind.as_str(), &service.kind_count(kind).await.to_string());
    display::events(&applied.events);
    Ok(())
}

pub async fn record(
    service: &LedgerService,
    caller: &AccountId,
    id: AgentId,
    outcome: Outcome,
) -> anyhow::Result<()> {
    display::section(&format!("Record Outcome for {}", id));
    let events = match outcome {
        Outcome::Positive => service.record_positive_outcome(caller, id).await?,
        Outcome::Negative => service.record_negative_outcome(caller, id).await?,
        Outcome::Response => service.record_response_executed(caller, id).await?,
    };
    if events.iter().any(|r| r.event.name() == "agent_retired") {
        display::warning(&format!("{} reached the destroy threshold and was retired", id));
    } else {
        let record = service.agent(id).await?;
        display::kv("Reputation", &record.reputation.to_string());
    }
    display::events(&events);
    Ok(())
}

pub async fn set_fingerprint(
    service: &LedgerService,
    caller: &AccountId,
    id: AgentId,
    fingerprint: &str,
) -> anyhow::Result<()> {
    let events = service.set_fingerprint(caller, id, fingerprint).await?;
    display::success(&format!("Fingerprint of {} updated", id));
    display::events(&events);
    Ok(())
}

pub async fn set_active(
    service: &LedgerService,
    caller: &AccountId,
    id: AgentId,
    active: bool,
) -> anyhow::Result<()> {
    let events = if active {
        service.activate_agent(caller, id).await?
    } else {
        service.deactivate_agent(caller, id).await?
    };
    let label = if active { "activated" } else { "deactivated" };
    display::success(&format!("{} {}", id, label));
    display::events(&events);
    Ok(())
}

pub async fn show(service: &LedgerService, id: AgentId) -> anyhow::Result<()> {
    display::section(&format!("Agent {}", id));
    match service.agent_slot(id).await {
        Some(AgentSlot::Live(record)) => print_record(&record),
        Some(AgentSlot::Retired { record, retired_at }) => {
            display::warning(&format!("Retired at {}", display::timestamp(retired_at)));
            print_record(&record);
        }
        None => display::error("No such agent"),
    }
    Ok(())
}

pub async fn list(
    service: &LedgerService,
    owner: &AccountId,
    kind: Option<AgentKind>,
) -> anyhow::Result<()> {
    let ids = match kind {
        Some(kind) => service.active_agents(owner, kind).await,
        None => service.agents_of_owner(owner).await,
    };
    display::section(&format!("Agents of {}", owner));
    if ids.is_empty() {
        display::info("None");
    }
    for id in ids {
        let record = service.agent(id).await?;
        let state = if record.active {
            "active".bright_green()
        } else {
            "inactive".bright_black()
        };
        println!(
            "  {:<12} {:<12} rep {:>5}  {}",
            id.to_string().bright_cyan(),
            record.kind.as_str(),
            record.reputation,
            state
        );
    }
    Ok(())
}

fn print_record(record: &AgentRecord) {
    display::kv("Owner", record.owner.as_str());
    display::kv("Kind", record.kind.as_str());
    display::kv("Reputation", &record.reputation.to_string());
    display::kv("Trajectory", &record.raw_reputation.to_string());
    display::kv("True positives", &record.true_positives.to_string());
    display::kv("False positives", &record.false_positives.to_string());
    display::kv("Events handled", &record.events_handled.to_string());
    display::kv("Responses executed", &record.responses_executed.to_string());
    display::kv("Active", &record.active.to_string());
    display::kv("Fingerprint", &record.fingerprint);
    display::kv("Created", &display::timestamp(record.created_at));
    display::kv("Last active", &display::timestamp(record.last_active_at));
}
