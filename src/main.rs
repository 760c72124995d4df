//! clawlet CLI
//!
//! Encrypted wallet manager and vanity address finder for the XRP Ledger.

use anyhow::Result;
use clap::{Parser, Subcommand};
use clawlet::search::resolve_worker_count;
use clawlet::{menu, CancellationToken, Config, LedgerClient, SearchOutcome, SearchRequest};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "clawlet")]
#[command(about = "Encrypted wallet manager and vanity address finder for the XRP Ledger")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive wallet menu (the default)
    Menu,

    /// Search for a vanity address without entering the menu
    Vanity {
        /// Address prefix to look for (a leading 'r' is implied)
        prefix: String,

        /// Match the prefix case-sensitively
        #[arg(short, long)]
        case_sensitive: bool,

        /// Worker threads to race (0 = 75% of available cores)
        #[arg(short, long, default_value = "0")]
        workers: usize,

        /// Per-worker attempt budget (searches forever when omitted)
        #[arg(short, long)]
        max_attempts: Option<u64>,

        /// Offer to save the winning secret encrypted to disk
        #[arg(long)]
        save: bool,
    },

    /// Show an account's balance and reserve
    Balance {
        /// Classic address to query
        address: String,
    },

    /// Show recent transaction log entries
    Log {
        /// Maximum entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;

    match cli.command.unwrap_or(Commands::Menu) {
        Commands::Menu => menu::run(config).await,
        Commands::Vanity {
            prefix,
            case_sensitive,
            workers,
            max_attempts,
            save,
        } => run_vanity(config, prefix, case_sensitive, workers, max_attempts, save).await,
        Commands::Balance { address } => show_balance(config, &address).await,
        Commands::Log { limit } => {
            show_log(&config, limit);
            Ok(())
        }
    }
}

async fn run_vanity(
    config: Config,
    prefix: String,
    case_sensitive: bool,
    workers: usize,
    max_attempts: Option<u64>,
    save: bool,
) -> Result<()> {
    let prefix = if prefix.starts_with('r') { prefix } else { format!("r{prefix}") };
    let request = SearchRequest {
        prefix: prefix.clone(),
        case_sensitive,
        worker_count: workers,
        max_attempts_per_worker: max_attempts,
    };
    let worker_count = resolve_worker_count(workers);
    println!("Searching for an address beginning with '{prefix}...' using {worker_count} threads; press Ctrl-C to stop.");

    let outcome = menu::run_search(request, CancellationToken::new()).await?;
    match outcome {
        SearchOutcome::Found(result) => {
            println!(
                "\nFound {}\nBy worker {} after {} attempts",
                result.address, result.worker_id, result.attempts
            );
            println!(
                "Time: {:.2}s | Rate: ~{:.0} attempts/sec",
                result.elapsed_seconds,
                result.estimated_rate(worker_count)
            );
            println!("Secret: {}", result.secret);
            if save {
                let settings = clawlet::Settings::load(&config.settings_path());
                let mode = if settings.hardened_encryption {
                    clawlet::KeyDerivation::Hardened
                } else {
                    clawlet::KeyDerivation::Legacy
                };
                let store = clawlet::WalletStore::new(
                    config.wallets_dir(),
                    clawlet::EncryptionService::new(mode),
                );
                menu::offer_save(&store, &result.secret)?;
            }
        }
        SearchOutcome::NotFound => println!("No match within the attempt budget."),
        SearchOutcome::Cancelled => println!("\nSearch cancelled."),
    }
    Ok(())
}

async fn show_balance(config: Config, address: &str) -> Result<()> {
    if !clawlet::ledger::is_valid_address(address) {
        println!("Invalid address.");
        return Ok(());
    }
    let ledger = LedgerClient::new(&config);
    let state = ledger.query_account(address).await?;
    println!("Balance for {address}: {} XRP", state.balance_xrp());
    println!("Owner objects: {}", state.owner_count);
    println!("Minimum reserve: {} XRP", state.minimum_reserve());
    println!("Spendable: {} XRP", state.spendable_xrp());
    Ok(())
}

fn show_log(config: &Config, limit: usize) {
    let txlog = clawlet::TxLog::new(config.txlog_path());
    let entries = txlog.recent(limit);
    if entries.is_empty() {
        println!("Transaction log is empty.");
        return;
    }
    for entry in entries {
        let amount = entry
            .amount_xrp
            .map(|a| a.to_string())
            .unwrap_or_else(|| "?".to_string());
        println!(
            "- {}: {} {amount} XRP to {} Result: {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            if entry.account_delete { "Account delete," } else { "Sent" },
            entry.destination,
            entry.result
        );
    }
}
