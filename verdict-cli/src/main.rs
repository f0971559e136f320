mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "verdict")]
#[command(about = "Run untrusted validation scripts in a V8 sandbox")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a validation script against one request body
    Run {
        /// File holding `function customValidation(data) { ... }`
        #[arg(short, long)]
        script: PathBuf,

        /// Request body as JSON, or @path to read it from a file
        #[arg(short, long, default_value = "{}")]
        input: String,

        /// Name the call is recorded under
        #[arg(short, long, default_value = "cli")]
        name: String,

        /// Engine config (TOML); falls back to $VERDICT_CONFIG
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
    /// Check a script the way registration does
    Check {
        /// File holding `function customValidation(data) { ... }`
        #[arg(short, long)]
        script: PathBuf,

        /// Engine config (TOML); falls back to $VERDICT_CONFIG
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
    /// Register configs and replay requests from a batch file
    Batch {
        /// JSON file with `configs` and `requests`
        #[arg(short, long)]
        file: PathBuf,

        /// Engine config (TOML); falls back to $VERDICT_CONFIG
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            script,
            input,
            name,
            config,
            verbose,
        } => {
            init_logging(verbose);
            commands::execute_run(&script, &input, &name, config.as_deref()).await
        }
        Commands::Check {
            script,
            config,
            verbose,
        } => {
            init_logging(verbose);
            if !commands::execute_check(&script, config.as_deref()).await? {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Batch {
            file,
            config,
            verbose,
        } => {
            init_logging(verbose);
            commands::execute_batch(&file, config.as_deref()).await
        }
    }
}

fn init_logging(verbose: bool) {
    let log_level = if verbose { "debug" } else { "warn" };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!(
                    "verdict={},verdict_cli={},verdict_sandbox={}",
                    log_level, log_level, log_level
                ))
            }),
        )
        .init();
}
