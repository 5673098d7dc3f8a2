//! c9master
//!
//! Serves and maintains a C9 repository.
//!
//! # Commands
//!
//! - `serve` - Serve the blob, user and group resources over HTTP
//! - `inspect` - Display per-bucket record counts and sequences
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// C9 repository server and tools.
#[derive(Parser)]
#[command(name = "c9master")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the repository directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Server configuration file (TOML)
    #[arg(global = true, short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Human-readable text.
    Text,
    /// Pretty-printed JSON.
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the repository over HTTP
    Serve {
        /// Address to bind to, overrides the configuration file
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },

    /// Display repository statistics
    Inspect {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Serve { bind } => {
            commands::serve::run(cli.config.as_deref(), cli.path, bind)?;
        }
        Commands::Inspect { format } => {
            let path = match (cli.path, cli.config.as_deref()) {
                (Some(path), _) => path,
                (None, Some(config)) => c9_server::ServerConfig::load(config)?.data_dir,
                (None, None) => return Err("Repository path required for inspect".into()),
            };
            commands::inspect::run(&path, format)?;
        }
        Commands::Version => {
            println!("c9master v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
