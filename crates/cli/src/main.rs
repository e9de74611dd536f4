//! pollwatch - polling directory watcher

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use watcher::CaseSensitivity;

mod cmd;
mod util;

/// Report file and directory changes by polling a directory tree
#[derive(Parser)]
#[command(name = "pollwatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch a directory and print every change until Ctrl-C
    Watch {
        /// Directory to watch (optional when --config names a root)
        root: Option<PathBuf>,

        /// Poll interval in milliseconds (default: 1000)
        #[arg(short, long)]
        interval_ms: Option<u64>,

        /// Case policy for entry names
        #[arg(long, value_parser = util::parse_case)]
        case: Option<CaseSensitivity>,

        /// Read settings from a TOML file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Do not apply .gitignore/.pollignore rules
        #[arg(long)]
        no_ignore: bool,

        /// Entry name to skip at any depth (repeatable)
        #[arg(short, long = "exclude")]
        exclude: Vec<String>,
    },
    /// Print the current tree as the watcher sees it
    Snapshot {
        /// Directory to list
        root: PathBuf,

        /// Case policy for entry names
        #[arg(long, value_parser = util::parse_case)]
        case: Option<CaseSensitivity>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Watch {
            root,
            interval_ms,
            case,
            config,
            no_ignore,
            exclude,
        } => {
            let options = cmd::watch::WatchOptions {
                root,
                interval_ms,
                case,
                config,
                no_ignore,
                exclude,
            };
            cmd::watch::run(options).await
        }
        Commands::Snapshot { root, case } => cmd::snapshot::run(&root, case),
    }
}
