//! Anchor commands - temporal locks and memory roots

use colored::*;
use luxbin_state::LedgerService;
use luxbin_types::{AccountId, Digest32, Timestamp};

use crate::display;

pub async fn lock(
    service: &LedgerService,
    caller: &AccountId,
    target: &AccountId,
    reveal_time: Timestamp,
    depth: u32,
    commitment: &str,
) -> anyhow::Result<()> {
    display::section("Submit Temporal Lock");
    let commitment = decode_hex(commitment)?;
    let events = service
        .submit_temporal_lock(caller, target, reveal_time, depth, &commitment)
        .await?;
    display::success(&format!(
        "Lock for {} reveals at {}",
        target.as_str().bright_cyan(),
        display::timestamp(reveal_time).bright_cyan()
    ));
    display::events(&events);
    Ok(())
}

pub async fn root(service: &LedgerService, caller: &AccountId, digest: &str) -> anyhow::Result<()> {
    display::section("Attest Memory Root");
    let digest = decode_hex(digest)?;
    let events = service.attest_memory_root(caller, &digest).await?;
    if events.is_empty() {
        display::info("Root was already anchored");
    } else {
        display::success("Root anchored");
    }
    display::events(&events);
    Ok(())
}

pub async fn show_lock(service: &LedgerService, target: &AccountId) -> anyhow::Result<()> {
    display::section(&format!("Temporal Lock for {}", target));
    match service.temporal_lock(target).await {
        Some(lock) => {
            display::kv("Reveal time", &display::timestamp(lock.reveal_time));
            display::kv("Hash chain depth", &lock.hash_chain_depth.to_string());
            display::kv("Initial commitment", &lock.initial_commitment.to_hex());
            display::kv("Submitted by", lock.submitted_by.as_str());
            display::kv("Submitted at", &display::timestamp(lock.submitted_at));
            display::kv("Encoded", &format!("0x{}", hex::encode(lock.encode())));
        }
        None => display::warning("No lock submitted"),
    }
    Ok(())
}

pub async fn show_root(service: &LedgerService, digest: &str) -> anyhow::Result<()> {
    let digest = Digest32::parse_hex(digest)?;
    display::section(&format!("Memory Root {}", digest));
    match service.memory_root(&digest).await {
        Some(entry) => {
            display::kv("Anchored by", entry.anchored_by.as_str());
            display::kv("Anchored at", &display::timestamp(entry.anchored_at));
        }
        None => display::warning("Not anchored"),
    }
    Ok(())
}

/// Decode hex without fixing the width, so the ledger reports size errors
fn decode_hex(s: &str) -> anyhow::Result<Vec<u8>> {
    let trimmed = s.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    Ok(hex::decode(digits)?)
}
