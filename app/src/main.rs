#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

mod command;

use clap::{Parser, Subcommand};
use covis_config::Config;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "covis")]
#[command(about = "Usage-signal recommender for search platforms", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSONL usage log into the store and report what was taken
    Ingest {
        /// Path to the usage log
        #[arg(short, long)]
        log: PathBuf,
    },
    /// Recommend records from a session's history
    Recommend {
        #[arg(short, long)]
        log: PathBuf,

        /// Session to recommend for
        #[arg(short, long)]
        session: String,

        /// Maximum number of recommendations
        #[arg(short, long)]
        count: Option<usize>,

        /// Allow internal records in the results
        #[arg(long)]
        internal: bool,
    },
    /// Records used together with the given one
    Similar {
        #[arg(short, long)]
        log: PathBuf,

        /// Record to find neighbours for
        #[arg(short, long)]
        record: String,

        #[arg(short, long)]
        count: Option<usize>,

        #[arg(long)]
        internal: bool,
    },
    /// Recommend search results for a query
    Search {
        #[arg(short, long)]
        log: PathBuf,

        /// The committed query
        #[arg(short, long)]
        query: String,

        #[arg(short, long)]
        count: Option<usize>,

        #[arg(long)]
        internal: bool,
    },
    /// Past queries similar to the given one
    Queries {
        #[arg(short, long)]
        log: PathBuf,

        #[arg(short, long)]
        query: String,

        #[arg(long)]
        internal: bool,
    },
    /// Initialize configuration
    Init,
    /// Show version
    Version,
}

fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest { log } => {
            let config = Config::load_or_default()?;
            command::ingest::run(&log, &config)?;
        }
        Commands::Recommend {
            log,
            session,
            count,
            internal,
        } => {
            let config = Config::load_or_default()?;
            command::engine::recommend(&log, &config, &session, count, internal)?;
        }
        Commands::Similar {
            log,
            record,
            count,
            internal,
        } => {
            let config = Config::load_or_default()?;
            command::engine::similar(&log, &config, &record, count, internal)?;
        }
        Commands::Search {
            log,
            query,
            count,
            internal,
        } => {
            let config = Config::load_or_default()?;
            command::engine::search(&log, &config, &query, count, internal)?;
        }
        Commands::Queries {
            log,
            query,
            internal,
        } => {
            let config = Config::load_or_default()?;
            command::engine::queries(&log, &config, &query, internal)?;
        }
        Commands::Init => {
            Config::create_config()?;
        }
        Commands::Version => {
            println!("covis {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
