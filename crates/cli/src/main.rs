//! kbsplit CLI
//!
//! Main entry point for the kbsplit command-line tool.
//! Splits a knowledge-base JSON array into per-category files.

mod commands;

use clap::{Parser, Subcommand};
use commands::{ClassifyCommand, RulesCommand, SplitCommand};
use kbsplit_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// kbsplit - stream a knowledge-base JSON array into category files
#[derive(Parser, Debug)]
#[command(name = "kbsplit")]
#[command(about = "Stream a knowledge-base JSON array into per-category files", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config file (default: ./kbsplit.yaml if present)
    #[arg(short, long, global = true, env = "KBSPLIT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Split an input file into one JSON array per category
    Split(SplitCommand),

    /// Show the effective category rule table
    Rules(RulesCommand),

    /// Show which category a piece of text would be assigned
    Classify(ClassifyCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    // Defaults, config file and environment
    let config = AppConfig::load(cli.config)?;

    // Global flag overrides; command-specific ones are applied by the command
    let config = config.with_overrides(
        None,
        None,
        None,
        false,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::debug!("Config file: {:?}", config.config_file);
    tracing::debug!("Output directory: {:?}", config.output_dir);

    let command_name = match &cli.command {
        Commands::Split(_) => "split",
        Commands::Rules(_) => "rules",
        Commands::Classify(_) => "classify",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Split(cmd) => cmd.execute(config).await,
        Commands::Rules(cmd) => cmd.execute(&config),
        Commands::Classify(cmd) => cmd.execute(&config),
    };

    match &result {
        Ok(_) => tracing::debug!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_split_flags() {
        let cli = Cli::try_parse_from([
            "kbsplit",
            "-v",
            "split",
            "kb.json",
            "-o",
            "out",
            "--chunk-size",
            "1024",
            "--skip-empty",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Split(cmd) => {
                assert_eq!(cmd.input, Some(PathBuf::from("kb.json")));
                assert_eq!(cmd.output, Some(PathBuf::from("out")));
                assert_eq!(cmd.chunk_size, Some(1024));
                assert!(cmd.skip_empty);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
