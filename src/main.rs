//! Solana Copy-Trading Position Tracker
//!
//! Decides whether a tracked wallet's swap opens or closes a position and
//! how much the bot should trade in response.

mod db;
mod models;
mod tracking;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

use crate::db::Database;
use crate::models::{ObservedSwap, SwapRecord};
use crate::tracking::{Outcome, PositionTracker, TrackerConfig};

/// Copy-trading position tracker CLI.
#[derive(Parser)]
#[command(name = "postrack")]
#[command(about = "Classify copied swaps as entries or exits and size the bot's trades", long_about = None)]
struct Cli {
    /// Database file path
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:./positions.db?mode=rwc")]
    database: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Native SOL committed to each mirrored entry
    #[arg(long, env = "SOLANA_FIXED_ENTRY_AMOUNT", default_value = "0.07")]
    fixed_entry_amount: Decimal,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load swap records (JSON array) into the store; the file is imported
    /// all-or-nothing
    Import {
        /// Path to the JSON file
        file: PathBuf,
    },

    /// Classify an observed swap (JSON object) as entry or exit
    Classify {
        /// Wallet that made the swap
        wallet: String,

        /// Path to the swap JSON
        file: PathBuf,
    },

    /// Classify an observed swap and compute the bot's trade
    Decide {
        /// Wallet that made the swap
        wallet: String,

        /// Path to the swap JSON
        file: PathBuf,
    },

    /// Estimate a wallet's token balance from recorded swaps
    Balance {
        /// Wallet address
        wallet: String,

        /// Token mint address
        token: String,
    },

    /// List recent swaps for a wallet
    List {
        /// Wallet address
        wallet: String,

        /// Maximum number of swaps to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env must be loaded before clap reads env-backed flags
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = TrackerConfig::with_fixed_entry_amount(cli.fixed_entry_amount)?;

    // Initialize database
    let db = Arc::new(Database::new(&cli.database).await?);
    let tracker = PositionTracker::new(db.clone(), config);

    match cli.command {
        Commands::Import { file } => {
            let count = import_swaps(&db, &file).await?;
            println!("Imported {} swaps from {}", count, file.display());
        }

        Commands::Classify { wallet, file } => {
            let swap: ObservedSwap = read_json(&file)?;
            let outcome = tracker.classify(&swap, &wallet).await;
            let c = outcome.value();

            println!("\nSwap Type:      {}", c.swap_type);
            println!(
                "Related Entry:  {}",
                c.related_entry_swap_id.as_deref().unwrap_or("-")
            );
            println!(
                "Exit Ratio:     {}",
                c.exit_ratio.map(|r| r.normalize().to_string()).unwrap_or_else(|| "-".to_string())
            );
            print_fallback(&outcome);
        }

        Commands::Decide { wallet, file } => {
            let swap: ObservedSwap = read_json(&file)?;
            let decision = tracker.decide(&swap, &wallet).await;
            let c = decision.classification.value();
            let amount = decision.amount.value();

            println!("\n=== Trade Decision ===");
            println!("Swap Type:      {}", c.swap_type);
            println!(
                "Related Entry:  {}",
                c.related_entry_swap_id.as_deref().unwrap_or("-")
            );
            println!("Amount:         {}", amount.amount.normalize());
            println!("Token:          {}", amount.token_address);
            print_fallback(&decision.classification);
            print_fallback(&decision.amount);
        }

        Commands::Balance { wallet, token } => {
            let outcome = tracker.estimate_balance(&wallet, &token).await;
            print_fallback(&outcome);
            println!("{}", outcome.into_value().normalize());
        }

        Commands::List { wallet, limit } => {
            let swaps = db.list_swaps(&wallet, limit).await?;

            if swaps.is_empty() {
                println!("No swaps recorded for {}", wallet);
                return Ok(());
            }

            println!(
                "\n{:<20} {:<6} {:>14} {:<10} {:>14} {:<10} {:<10}",
                "TIME", "TYPE", "IN", "", "OUT", "", "STATUS"
            );
            println!("{}", "-".repeat(90));

            for s in swaps {
                println!(
                    "{:<20} {:<6} {:>14} {:<10} {:>14} {:<10} {:<10}",
                    s.source_timestamp.format("%Y-%m-%d %H:%M:%S"),
                    s.swap_type,
                    s.token_in.amount.normalize().to_string(),
                    truncate(&s.token_in.symbol, 10),
                    s.token_out.amount.normalize().to_string(),
                    truncate(&s.token_out.symbol, 10),
                    s.status.as_str()
                );
            }
        }

        Commands::Config => {
            let config = tracker.config();

            println!("\n=== Tracker Configuration ===\n");
            println!("  Chain:                {}", config.chain);
            println!("  Fixed Entry Amount:   {} {}", config.fixed_entry_amount, config.native_symbol);
            println!("  Native Mint:          {}", config.native_mint);
            println!("  Database:             {}", cli.database);
        }
    }

    Ok(())
}

/// Load a JSON array of swap records, assigning ids where missing.
async fn import_swaps(db: &Database, path: &Path) -> Result<usize> {
    let mut records: Vec<SwapRecord> = read_json(path)?;
    info!(count = records.len(), file = %path.display(), "Importing swaps");

    for record in records.iter_mut().filter(|r| r.id.is_empty()) {
        record.id = Uuid::new_v4().to_string();
    }
    db.insert_swaps(&records).await?;

    Ok(records.len())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

fn print_fallback<T>(outcome: &Outcome<T>) {
    if let Some(reason) = outcome.reason() {
        println!("Fallback:       {}", reason);
    }
}

/// Truncate a string with ellipsis if too long.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
