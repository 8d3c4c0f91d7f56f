//! deepr CLI
//!
//! Main entry point for the deepr command-line tool.
//! Provides schema-constrained generation and context trimming.

mod commands;

use clap::{Parser, Subcommand};
use commands::{GenerateCommand, TrimCommand};
use deepr_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// deepr - structured LLM generation and context trimming
#[derive(Parser, Debug)]
#[command(name = "deepr")]
#[command(about = "Structured LLM generation and context trimming", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, env = "DEEPR_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Structured provider (schema-native, text-extraction)
    #[arg(short, long, global = true, env = "DEEPR_PROVIDER")]
    provider: Option<String>,

    /// Token budget for prompts
    #[arg(long, global = true)]
    context_size: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a JSON value that satisfies a schema
    Generate(GenerateCommand),

    /// Trim text to a token budget
    Trim(TrimCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    // The --config flag decides which file is merged before env and flags
    let config_flag = cli.config.clone();
    let config = AppConfig::load_with(|name| match name {
        "DEEPR_CONFIG" => config_flag
            .as_ref()
            .map(|path| path.to_string_lossy().into_owned()),
        _ => std::env::var(name).ok(),
    })?;

    let config = config.with_overrides(
        cli.config,
        cli.provider,
        cli.context_size,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );
    config.validate()?;

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("deepr starting");
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Context size: {}", config.context_size);

    let command_name = match &cli.command {
        Commands::Generate(_) => "generate",
        Commands::Trim(_) => "trim",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Generate(cmd) => cmd.execute(&config).await,
        Commands::Trim(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
