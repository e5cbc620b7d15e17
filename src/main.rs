use analytics::SortKey;
use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::DataArgs;
use configuration::InstrumentGroup;
use std::path::PathBuf;

mod commands;
mod render;
mod telemetry;

/// The main entry point for the Commodex ranking dashboard.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `COMMODEX__*` overrides may live in a .env file; it is optional.
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    let config = configuration::load_config(cli.config.as_deref())
        .context("Failed to load configuration")?;
    let _log_guard = telemetry::init_tracing(&config.logging)?;

    // Execute the appropriate command
    match cli.command {
        Commands::Rank { data, expand } => commands::handle_rank(&config, data, expand).await,
        Commands::Returns { data } => commands::handle_returns(&config, data).await,
        Commands::Snapshot { data, sort, expand } => {
            commands::handle_snapshot(&config, data, sort, expand).await
        }
        Commands::Detail { symbol, data } => commands::handle_detail(&config, symbol, data).await,
        Commands::Catalog { group } => commands::handle_catalog(&config, group),
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Ranks commodity futures and crypto pairs by the z-score of their latest price.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file. Defaults to ./config.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank instruments by z-score, most depressed first.
    Rank {
        #[command(flatten)]
        data: DataArgs,

        /// Also print the expanded view of this symbol.
        #[arg(long, value_name = "SYMBOL")]
        expand: Option<String>,
    },
    /// Order instruments by their return over the period.
    Returns {
        #[command(flatten)]
        data: DataArgs,
    },
    /// Show the latest price of every instrument.
    Snapshot {
        #[command(flatten)]
        data: DataArgs,

        /// Column to sort by: zscore, return, last or name. Defaults to `dashboard.sort_by`.
        #[arg(long)]
        sort: Option<SortKey>,

        /// Also print the expanded view of this symbol.
        #[arg(long, value_name = "SYMBOL")]
        expand: Option<String>,
    },
    /// Show the expanded view of a single instrument.
    Detail {
        /// Catalog or custom ticker, e.g. "GC=F".
        symbol: String,

        #[command(flatten)]
        data: DataArgs,
    },
    /// List the configured instruments.
    Catalog {
        /// Only list these groups.
        #[arg(long, value_enum)]
        group: Vec<InstrumentGroup>,
    },
}
