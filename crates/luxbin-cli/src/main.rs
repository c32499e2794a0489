//! LUXBIN CLI - Operate a reputation-weighted ledger from the shell
//!
//! Every command opens the sled store under `--data-dir`, applies one
//! operation as the `--as` account (the authority when omitted) and prints
//! the resulting events.
//!
//! # Quick Start
//!
//! ```bash
//! luxbin issuer authorize --issuer mint-desk --daily-limit 1000
//! luxbin --as mint-desk mint --grant alice=600
//! luxbin agent batch --owner council --kind regulatory --count 10
//! luxbin status --account alice
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::*;
use luxbin_state::{LedgerService, LuxbinConfig};
use luxbin_types::{AccountId, AgentId, AgentKind, Amount, Capability, Timestamp};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod display;

use commands::{admin, agent, anchor, issuer, ledger, status};

/// LUXBIN - quota-limited issuance, agent reputation and attestation anchoring
#[derive(Parser)]
#[command(name = "luxbin")]
#[command(author = "LUXBIN Contributors")]
#[command(version)]
#[command(about = "Reputation-weighted ledger with quota-limited issuance", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Directory of the sled store
    #[arg(long, global = true, env = "LUXBIN_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Account to act as (defaults to the ledger authority)
    #[arg(long = "as", global = true, env = "LUXBIN_CALLER")]
    caller: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage issuers and their daily limits
    Issuer {
        #[command(subcommand)]
        action: IssuerCommands,
    },

    /// Issue new units as the calling issuer
    Mint {
        /// Recipient and amount as ACCOUNT=AMOUNT, repeatable
        #[arg(long = "grant", required = true, value_parser = ledger::parse_grant)]
        grants: Vec<(AccountId, Amount)>,
    },

    /// Move units from the calling account
    Transfer {
        #[arg(long)]
        to: String,

        #[arg(long)]
        amount: u64,
    },

    /// Manage agent records
    Agent {
        #[command(subcommand)]
        action: AgentCommands,
    },

    /// Anchor temporal locks and memory roots
    Anchor {
        #[command(subcommand)]
        action: AnchorCommands,
    },

    /// Pause switch, capabilities and authority
    Admin {
        #[command(subcommand)]
        action: AdminCommands,
    },

    /// Show ledger status
    Status {
        /// Also show the balance of this account
        #[arg(long)]
        account: Option<String>,
    },
}

#[derive(Subcommand)]
enum IssuerCommands {
    /// Authorize an issuer (or reset its limit)
    Authorize {
        #[arg(long)]
        issuer: String,

        #[arg(long)]
        daily_limit: u64,
    },

    /// Revoke an issuer
    Revoke {
        #[arg(long)]
        issuer: String,
    },

    /// Change an issuer's daily limit
    SetLimit {
        #[arg(long)]
        issuer: String,

        #[arg(long)]
        daily_limit: u64,
    },

    /// Show an issuer entry and its remaining quota
    Show {
        #[arg(long)]
        issuer: String,
    },
}

#[derive(Subcommand)]
enum AgentCommands {
    /// Create one agent
    Create {
        #[arg(long)]
        owner: String,

        /// detector, defender, memory or regulatory
        #[arg(long)]
        kind: AgentKind,

        #[arg(long, default_value = "")]
        fingerprint: String,
    },

    /// Create up to 100 agents of one kind
    Batch {
        #[arg(long)]
        owner: String,

        #[arg(long)]
        kind: AgentKind,

        #[arg(long, default_value = "1")]
        count: u32,
    },

    /// Record a confirmed detection (detectors only)
    Positive {
        #[arg(long)]
        id: u64,
    },

    /// Record an incorrect outcome
    Negative {
        #[arg(long)]
        id: u64,
    },

    /// Record an executed response (defenders only)
    Response {
        #[arg(long)]
        id: u64,
    },

    /// Replace an agent's fingerprint
    Fingerprint {
        #[arg(long)]
        id: u64,

        #[arg(long)]
        value: String,
    },

    Activate {
        #[arg(long)]
        id: u64,
    },

    Deactivate {
        #[arg(long)]
        id: u64,
    },

    /// Show one agent, including retired ones
    Show {
        #[arg(long)]
        id: u64,
    },

    /// List an owner's agents; with --kind, only active ones
    List {
        #[arg(long)]
        owner: String,

        #[arg(long)]
        kind: Option<AgentKind>,
    },
}

#[derive(Subcommand)]
enum AnchorCommands {
    /// Submit a temporal lock for a target account
    Lock {
        #[arg(long)]
        target: String,

        /// Unix time at which the lock may be revealed
        #[arg(long)]
        reveal_time: Timestamp,

        #[arg(long)]
        depth: u32,

        /// 32-byte initial commitment as hex
        #[arg(long)]
        commitment: String,
    },

    /// Anchor a 32-byte memory root given as hex
    Root {
        #[arg(long)]
        digest: String,
    },

    /// Show the lock held for a target
    ShowLock {
        #[arg(long)]
        target: String,
    },

    /// Show an anchored root
    ShowRoot {
        #[arg(long)]
        digest: String,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    Pause,

    Unpause,

    /// Grant a capability (issue, registry.write)
    Grant {
        #[arg(long)]
        account: String,

        #[arg(long)]
        capability: Capability,
    },

    /// Revoke a capability
    Revoke {
        #[arg(long)]
        account: String,

        #[arg(long)]
        capability: Capability,
    },

    /// Hand the authority role to another account
    TransferAuthority {
        #[arg(long)]
        to: String,
    },
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn account(s: &str) -> anyhow::Result<AccountId> {
    Ok(AccountId::parse(s)?)
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        display::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();
    init_logging();

    let cli = Cli::parse();

    let mut config = LuxbinConfig::from_env()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    debug!(data_dir = %config.data_dir.display(), "Opening ledger store");
    let service = LedgerService::open_sled(&config).await?;
    let caller = match cli.caller.as_deref() {
        Some(caller) => account(caller)?,
        None => service.authority().await,
    };
    println!(
        "  {} {} as {}",
        "●".bright_green(),
        config.data_dir.display().to_string().bright_black(),
        caller.as_str().bright_cyan()
    );

    match cli.command {
        Commands::Issuer { action } => match action {
            IssuerCommands::Authorize { issuer, daily_limit } => {
                issuer::authorize(&service, &caller, &account(&issuer)?, Amount(daily_limit)).await?;
            }
            IssuerCommands::Revoke { issuer } => {
                issuer::revoke(&service, &caller, &account(&issuer)?).await?;
            }
            IssuerCommands::SetLimit { issuer, daily_limit } => {
                issuer::set_limit(&service, &caller, &account(&issuer)?, Amount(daily_limit)).await?;
            }
            IssuerCommands::Show { issuer } => {
                issuer::show(&service, &account(&issuer)?).await?;
            }
        },

        Commands::Mint { grants } => {
            ledger::mint(&service, &caller, &grants).await?;
        }

        Commands::Transfer { to, amount } => {
            ledger::transfer(&service, &caller, &account(&to)?, Amount(amount)).await?;
        }

        Commands::Agent { action } => match action {
            AgentCommands::Create { owner, kind, fingerprint } => {
                agent::create(&service, &caller, &account(&owner)?, kind, &fingerprint).await?;
            }
            AgentCommands::Batch { owner, kind, count } => {
                agent::batch(&service, &caller, &account(&owner)?, kind, count).await?;
            }
            AgentCommands::Positive { id } => {
                agent::record(&service, &caller, AgentId(id), agent::Outcome::Positive).await?;
            }
            AgentCommands::Negative { id } => {
                agent::record(&service, &caller, AgentId(id), agent::Outcome::Negative).await?;
            }
            AgentCommands::Response { id } => {
                agent::record(&service, &caller, AgentId(id), agent::Outcome::Response).await?;
            }
            AgentCommands::Fingerprint { id, value } => {
                agent::set_fingerprint(&service, &caller, AgentId(id), &value).await?;
            }
            AgentCommands::Activate { id } => {
                agent::set_active(&service, &caller, AgentId(id), true).await?;
            }
            AgentCommands::Deactivate { id } => {
                agent::set_active(&service, &caller, AgentId(id), false).await?;
            }
            AgentCommands::Show { id } => {
                agent::show(&service, AgentId(id)).await?;
            }
            AgentCommands::List { owner, kind } => {
                agent::list(&service, &account(&owner)?, kind).await?;
            }
        },

        Commands::Anchor { action } => match action {
            AnchorCommands::Lock { target, reveal_time, depth, commitment } => {
                anchor::lock(&service, &caller, &account(&target)?, reveal_time, depth, &commitment)
                    .await?;
            }
            AnchorCommands::Root { digest } => {
                anchor::root(&service, &caller, &digest).await?;
            }
            AnchorCommands::ShowLock { target } => {
                anchor::show_lock(&service, &account(&target)?).await?;
            }
            AnchorCommands::ShowRoot { digest } => {
                anchor::show_root(&service, &digest).await?;
            }
        },

        Commands::Admin { action } => match action {
            AdminCommands::Pause => admin::pause(&service, &caller).await?,
            AdminCommands::Unpause => admin::unpause(&service, &caller).await?,
            AdminCommands::Grant { account: target, capability } => {
                admin::grant(&service, &caller, &account(&target)?, capability).await?;
            }
            AdminCommands::Revoke { account: target, capability } => {
                admin::revoke(&service, &caller, &account(&target)?, capability).await?;
            }
            AdminCommands::TransferAuthority { to } => {
                admin::transfer_authority(&service, &caller, &account(&to)?).await?;
            }
        },

        Commands::Status { account: target } => {
            let target = target.as_deref().map(account).transpose()?;
            status::show(&service, target.as_ref()).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_mint_grants() {
        let cli = Cli::try_parse_from([
            "luxbin", "--as", "desk", "mint", "--grant", "alice=600", "--grant", "bob=5",
        ])
        .unwrap();
        assert_eq!(cli.caller.as_deref(), Some("desk"));
        match cli.command {
            Commands::Mint { grants } => {
                assert_eq!(
                    grants,
                    vec![
                        (AccountId::from("alice"), Amount(600)),
                        (AccountId::from("bob"), Amount(5)),
                    ]
                );
            }
            _ => panic!("expected mint"),
        }
    }

    #[test]
    fn test_parse_agent_kind() {
        let cli = Cli::try_parse_from([
            "luxbin", "agent", "batch", "--owner", "council", "--kind", "regulatory", "--count", "10",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Agent {
                action: AgentCommands::Batch { kind: AgentKind::Regulatory, count: 10, .. }
            }
        ));
    }

    #[tokio::test]
    async fn test_agent_batch_reports_events() {
        use std::sync::Arc;

        use luxbin_state::MemoryStore;
        use luxbin_types::{EventRecord, LedgerEvent, SystemClock};

        let config = LuxbinConfig::default();
        let service =
            LedgerService::open(&config, Arc::new(MemoryStore::new()), Arc::new(SystemClock))
                .await
                .unwrap();
        let mut rx = service.subscribe();

        let owner = AccountId::from("council");
        agent::batch(&service, &config.authority, &owner, AgentKind::Regulatory, 3)
            .await
            .unwrap();

        let mut created = Vec::new();
        while let Ok(EventRecord { event, .. }) = rx.try_recv() {
            created.push(event);
        }
        assert_eq!(created.len(), 3);
        assert!(created
            .iter()
            .all(|event| matches!(event, LedgerEvent::AgentCreated { .. })));
        assert_eq!(service.kind_count(AgentKind::Regulatory).await, 3);
    }

    #[test]
    fn test_parse_grant_rejects_garbage() {
        assert!(ledger::parse_grant("alice").is_err());
        assert!(ledger::parse_grant("alice=lots").is_err());
        assert!(ledger::parse_grant("=5").is_err());
    }
}
