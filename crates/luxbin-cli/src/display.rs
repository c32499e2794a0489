//! Display utilities for the CLI

use colored::*;
use luxbin_types::{EventRecord, Timestamp};

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", "━".repeat(60).bright_black());
    println!(" {}", title.bright_white().bold());
    println!("{}", "━".repeat(60).bright_black());
}

pub fn success(message: &str) {
    println!("  {} {}", "✓".bright_green(), message);
}

pub fn error(message: &str) {
    eprintln!("  {} {}", "✗".bright_red(), message.bright_red());
}

pub fn info(message: &str) {
    println!("  {} {}", "→".bright_blue(), message);
}

pub fn warning(message: &str) {
    println!("  {} {}", "⚠".yellow(), message.yellow());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("      {}: {}", key, value.bright_cyan());
}

/// Render a unix timestamp as UTC
pub fn timestamp(at: Timestamp) -> String {
    i64::try_from(at)
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| at.to_string())
}

/// Print the events produced by one command
pub fn events(records: &[EventRecord]) {
    if records.is_empty() {
        info("No state change");
        return;
    }
    for record in records {
        let body = serde_json::to_string(&record.event).unwrap_or_default();
        println!(
            "  {} {} {}",
            format!("#{}", record.sequence).bright_black(),
            record.event.name().bright_yellow(),
            body.bright_black()
        );
    }
}
