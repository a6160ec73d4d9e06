//! ShelfDB CLI
//!
//! Command-line access to typed references in a ShelfDB environment.
//!
//! # Commands
//!
//! - `put` - Store a string value under a key
//! - `get` - Print the value stored under a key, opening the environment
//!   read-only
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use shelfdb_core::{EnvFlags, Environment, Options};
use std::path::PathBuf;
use tracing::Dispatch;
use tracing_subscriber::EnvFilter;

/// ShelfDB command-line tools.
#[derive(Parser)]
#[command(name = "shelfdb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the environment directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Maximum number of named references in the environment
    #[arg(global = true, long, default_value = "16")]
    max_dbs: u32,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a string value under a key
    Put {
        /// Reference identifier
        reference: String,

        /// Key
        key: String,

        /// Value
        value: String,
    },

    /// Print the value stored under a key
    Get {
        /// Reference identifier
        reference: String,

        /// Key
        key: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    let diagnostics = Dispatch::new(
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .finish(),
    );
    let options = Options::new().max_dbs(cli.max_dbs).diagnostics(diagnostics);

    match cli.command {
        Commands::Put {
            reference,
            key,
            value,
        } => {
            let path = cli.path.ok_or("Environment path required for put")?;
            let env = Environment::new(path, options);
            commands::put::run(&env, &reference, &key, &value)?;
            env.close()?;
        }
        Commands::Get {
            reference,
            key,
            format,
        } => {
            let path = cli.path.ok_or("Environment path required for get")?;
            let env = Environment::new(path, options.flags(EnvFlags::READ_ONLY));
            let output = commands::get::run(&env, &reference, &key, &format)?;
            env.close()?;
            println!("{output}");
        }
        Commands::Version => {
            println!("ShelfDB CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
