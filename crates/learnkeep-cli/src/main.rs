//! learnkeep CLI — maintenance and inspection of a learnkeep data directory.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "learnkeep", version, about = "Learner records, scoring and backups")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter learnkeep.toml
    Init,

    /// Score a session without storing it
    Score {
        /// Session record JSON
        #[arg(long)]
        session: PathBuf,

        /// JSON array of earlier sessions used as the timing baseline
        #[arg(long)]
        history: Option<PathBuf>,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Score, adapt and store a finished session
    Record {
        /// Session record JSON
        #[arg(long)]
        session: PathBuf,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// List learner profiles
    Learners,

    /// List backup snapshots
    Snapshots,

    /// Snapshot every data file now
    Backup,

    /// Restore a snapshot and recompute goal progress
    Restore {
        /// Snapshot name as shown by `learnkeep snapshots`
        #[arg(long)]
        snapshot: String,
    },

    /// Recompute goal progress from the full session history
    Recompute,
}

fn default_directive() -> Directive {
    "learnkeep=info"
        .parse()
        .unwrap_or_else(|_| LevelFilter::INFO.into())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(default_directive()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Score {
            session,
            history,
            format,
        } => commands::score::execute(session, history, format),
        Commands::Record { session, format } => commands::record::execute(config, session, format),
        Commands::Learners => commands::learners::execute(config),
        Commands::Snapshots => commands::snapshots::execute(config),
        Commands::Backup => commands::backup::execute(config),
        Commands::Restore { snapshot } => commands::restore::execute(config, snapshot),
        Commands::Recompute => commands::recompute::execute(config),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
