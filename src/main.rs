//! STX Sweeper - batch transfer of account balances to one recipient
//!
//! # WARNING
//! - This tool moves real funds. Double-check the recipient address.
//! - Every account in the wallet list is drained down to the fee.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use stx_sweeper::config::Config;
use stx_sweeper::node::HttpNodeApi;
use stx_sweeper::sweep::{BatchOrchestrator, SweepAction};
use stx_sweeper::wallet;

/// STX Sweeper - sweep account balances into a single recipient address
#[derive(Parser)]
#[command(name = "stx-sweeper")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the wallet list path from the config
    #[arg(short, long)]
    wallets: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sweep every account's spendable balance to the recipient
    Sweep,

    /// Fetch balances only; nothing is broadcast
    Balances,

    /// Show current configuration (secrets masked)
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stx_sweeper=info".into()),
        )
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    let wallets_path = cli
        .wallets
        .unwrap_or_else(|| PathBuf::from(&config.wallets_path));

    match cli.command {
        Commands::Config => {
            println!("{}", config.masked_display());
            Ok(())
        }
        Commands::Sweep => run_batch(&config, &wallets_path, SweepAction::SweepAndReport).await,
        Commands::Balances => run_batch(&config, &wallets_path, SweepAction::BalanceOnly).await,
    }
}

async fn run_batch(config: &Config, wallets_path: &Path, action: SweepAction) -> Result<()> {
    if action == SweepAction::SweepAndReport && config.recipient.is_empty() {
        anyhow::bail!(
            "recipient address not configured (set RECIPIENT_ADDRESS or the recipient config key)"
        );
    }

    let accounts = wallet::load_accounts(wallets_path)
        .with_context(|| format!("failed to load wallet list from {}", wallets_path.display()))?;
    info!(
        "Loaded {} accounts from {}",
        accounts.len(),
        wallets_path.display()
    );

    let orchestrator = BatchOrchestrator::new(HttpNodeApi::new(config), config);

    // Ctrl+C stops the batch cleanly between accounts
    let cancel = orchestrator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl+C received, finishing current account then stopping");
            cancel.cancel();
        }
    });

    let report = orchestrator.run(&accounts, action).await;
    report.log_summary();

    let path = report
        .write_to_dir(Path::new(&config.report_dir))
        .context("failed to write run report")?;
    info!("Report saved to {}", path.display());

    // The batch always runs to completion; partial failure is signaled
    // through the exit code instead of aborting mid-run
    let failed = report.failed_accounts();
    if failed > 0 {
        warn!("{} of {} accounts failed", failed, report.accounts.len());
        std::process::exit(2);
    }

    Ok(())
}
