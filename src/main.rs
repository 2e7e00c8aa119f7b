// deid - Rule-based de-identification of clinical text
// Copyright (c) 2025 Deid Contributors
// Licensed under the MIT License

use clap::Parser;
use deid::cli::{exit_code_for, Cli, Commands, EXIT_FATAL};
use deid::logging::init_logging;
use std::process;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let (log_level, logging_config) = cli.logging_settings();
    let guard = match init_logging(&log_level, &logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(exit_code_for(&e));
        }
    };

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "deid starting");

    let exit_code = match execute_command(&cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command execution failed");
            eprintln!("Error: {e:#}");
            EXIT_FATAL
        }
    };

    // Flush file logs before exiting
    drop(guard);
    process::exit(exit_code);
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::ValidateConfig(args) => args.execute(cli).await,
        Commands::Init(args) => args.execute().await,
        Commands::Deidentify(args) => match cli.load_config() {
            Ok(config) => args.execute(config).await,
            Err(e) => Ok(report_config_error(&e)),
        },
        Commands::Batch(args) => match cli.load_config() {
            Ok(config) => args.execute(config).await,
            Err(e) => Ok(report_config_error(&e)),
        },
    }
}

fn report_config_error(error: &deid::domain::DeidError) -> i32 {
    tracing::error!(error = %error, "Failed to load configuration");
    eprintln!("❌ {error}");
    exit_code_for(error)
}
