//! sessiongate CLI - connectivity checks and atomic SQL script application
//!
//! Settings come from `DATABASE_URL` (and `.env`) unless `--config` points at a YAML file.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use sessiongate::{Gateway, Settings};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sessiongate")]
#[command(version, about = "Database session gateway utilities", long_about = None)]
struct Cli {
    /// YAML settings file (defaults to the environment)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and run a connectivity probe
    Check,

    /// Apply a SQL script in a single transaction
    Apply {
        /// Script file; statements are separated by `;`
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let result = load_settings(cli.config).and_then(|settings| match cli.command {
        Commands::Check => check(&settings),
        Commands::Apply { file } => apply(&settings, file),
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn load_settings(config: Option<PathBuf>) -> Result<Settings, Box<dyn std::error::Error>> {
    let settings = match config {
        Some(path) => {
            dotenv::dotenv().ok();
            Settings::load_from_file(&path)?
        }
        None => Settings::from_env()?,
    };
    Ok(settings)
}

/// Connect and probe the database
fn check(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let gateway: Gateway = Gateway::connect(settings)?;
    let state = gateway.check()?;

    println!("✅ Connected to {}", gateway.engine().url());
    println!(
        "   pool: {} connections ({} idle, max {})",
        state.connections, state.idle_connections, state.max_size
    );

    gateway.shutdown();
    Ok(())
}

/// Apply a script atomically
fn apply(settings: &Settings, file: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let script = std::fs::read_to_string(&file)
        .map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;

    if script.trim().is_empty() {
        return Err(format!("No statements found in {}", file.display()).into());
    }

    let gateway: Gateway = Gateway::connect(settings)?;
    tracing::info!("Applying {}", file.display());

    gateway.apply_script(&script)?;
    println!("✅ Applied {}", file.display());

    gateway.shutdown();
    Ok(())
}
