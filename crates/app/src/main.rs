use std::path::PathBuf;

use anyhow::{Context, Result};
use checkbook::{AppConfig, Ledger};
use checkbook_core::{EntryId, ReconciledFilter, SortOrder};
use checkbook_storage::{FileMirror, SqliteStore};
use chrono::NaiveDate;
use clap::{Args as ClapArgs, Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "checkbook")]
#[command(about = "Personal checkbook register with bank CSV import")]
struct Args {
    /// Directory holding ledger.db and the mirror backup
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (default: checkbook.toml in the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ClapArgs)]
pub(crate) struct ListArgs {
    /// First date to include (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Last date to include (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,
    /// Case-insensitive description substring
    #[arg(long)]
    description: Option<String>,
    /// Case-insensitive category substring
    #[arg(long)]
    category: Option<String>,
    /// all, reconciled or unreconciled
    #[arg(long, default_value = "all")]
    status: ReconciledFilter,
    /// asc or desc; remembered for later runs
    #[arg(long)]
    order: Option<SortOrder>,
}

#[derive(ClapArgs)]
pub(crate) struct AddArgs {
    #[arg(long)]
    date: NaiveDate,
    #[arg(long)]
    description: String,
    #[arg(long, default_value = checkbook_core::UNCATEGORIZED)]
    category: String,
    /// Magnitude of the entry
    #[arg(long)]
    amount: Decimal,
    /// Record as money going out
    #[arg(long)]
    debit: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the register with running balances
    List(ListArgs),
    /// Record an entry by hand
    Add(AddArgs),
    /// Delete one entry
    Delete {
        id: EntryId,
        #[arg(long)]
        yes: bool,
    },
    /// Mark an entry reconciled (or not, with --undo)
    Reconcile {
        id: EntryId,
        #[arg(long)]
        undo: bool,
    },
    /// Permanently delete reconciled entries dated on or before a cutoff
    Purge {
        cutoff: NaiveDate,
        #[arg(long)]
        yes: bool,
    },
    /// Merge a bank CSV export into the ledger
    ImportCsv {
        file: PathBuf,
        /// Mark every imported entry reconciled
        #[arg(long)]
        reconciled: bool,
        #[arg(long)]
        yes: bool,
    },
    /// Write the whole ledger to a JSON file
    Export {
        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Replace the whole ledger with a JSON export
    ImportJson {
        file: PathBuf,
        #[arg(long)]
        yes: bool,
    },
    /// List known descriptions and categories
    Suggest,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = AppConfig::find_and_load(args.config.as_deref())?;
    let paths = config.data_paths(args.data_dir)?;
    std::fs::create_dir_all(&paths.dir)
        .with_context(|| format!("Failed to create data directory: {}", paths.dir.display()))?;

    let store = SqliteStore::open(&paths.db)
        .await
        .with_context(|| format!("Failed to open database: {}", paths.db.display()))?;
    let mirror = FileMirror::new(&paths.mirror);
    let profiles = config.load_profiles()?;

    let ledger = Ledger::open(store, mirror, profiles).await;

    match args.command {
        Commands::List(list) => commands::list(&ledger, &config, list).await,
        Commands::Add(add) => commands::add(&ledger, add).await,
        Commands::Delete { id, yes } => commands::delete(&ledger, id, yes).await,
        Commands::Reconcile { id, undo } => commands::reconcile(&ledger, id, !undo).await,
        Commands::Purge { cutoff, yes } => commands::purge(&ledger, cutoff, yes).await,
        Commands::ImportCsv {
            file,
            reconciled,
            yes,
        } => commands::import_csv(&ledger, &file, reconciled, yes).await,
        Commands::Export { out } => commands::export(&ledger, &out).await,
        Commands::ImportJson { file, yes } => commands::import_json(&ledger, &file, yes).await,
        Commands::Suggest => commands::suggest(&ledger).await,
    }
}
