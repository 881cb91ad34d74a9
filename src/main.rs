//! armory - manage third-party binaries from GitHub releases

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "armory")]
#[command(author, version, about = "armory - per-user binaries from GitHub releases")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a binary at a version
    Install {
        /// Binary user_id(s) from the catalogue
        #[arg(required = true)]
        binaries: Vec<String>,
        /// Version tag to install
        #[arg(long, default_value = "latest")]
        version: String,
    },
    /// Switch the active version of a binary
    #[command(alias = "use")]
    Switch {
        /// Binary and version: name@version
        spec: String,
    },
    /// Update binaries to their latest release
    Update {
        /// Binary user_id(s)
        #[arg(required_unless_present = "all")]
        binaries: Vec<String>,
        /// Update every tracked binary
        #[arg(long, short = 'a', conflicts_with = "binaries")]
        all: bool,
    },
    /// Check for newer releases without downloading
    Check {
        /// Binary user_id(s)
        #[arg(required_unless_present = "all")]
        binaries: Vec<String>,
        /// Check every tracked binary
        #[arg(long, short = 'a', conflicts_with = "binaries")]
        all: bool,
    },
    /// Remove a binary from the catalogue
    Remove {
        /// Binary user_id(s)
        #[arg(required = true)]
        binaries: Vec<String>,
        /// Also delete installed payloads and the symlink
        #[arg(long)]
        files: bool,
        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Track a binary from a GitHub release asset URL
    Add {
        /// https://github.com/<owner>/<repo>/releases/download/<tag>/<asset>
        url: String,
        /// Register without installing
        #[arg(long)]
        no_install: bool,
    },
    /// List tracked binaries and their versions
    List,
    /// Reconcile the catalogue with armory.toml
    Sync {
        /// Config file (defaults to the user config dir)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Install { binaries, version } => cmd::install::install(&binaries, &version).await,
        Commands::Switch { spec } => cmd::r#use::use_binary(&spec),
        Commands::Update { binaries, all } => cmd::update::update(&binaries, all).await,
        Commands::Check { binaries, all } => cmd::check::check(&binaries, all).await,
        Commands::Remove {
            binaries,
            files,
            yes,
        } => cmd::remove::remove(&binaries, files, yes),
        Commands::Add { url, no_install } => cmd::add::add(&url, no_install).await,
        Commands::List => cmd::list::list(),
        Commands::Sync { config } => cmd::sync::sync(config),
    }
}
