//! Command-line interface.

pub mod commands;

use clap::{Parser, Subcommand};

/// Default log level when neither RUST_LOG nor --log-level is set.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Q&A dataset generator for text corpora.
#[derive(Debug, Parser)]
#[command(name = "qna-forge", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate a Q&A dataset from input documents
    Generate(commands::GenerateArgs),
}

/// Parses command-line arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Dispatches a parsed CLI to its command handler.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate(args) => commands::run_generate(args).await,
    }
}

/// Parses arguments and runs the selected command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_structure_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_log_level() {
        let cli = Cli::try_parse_from(["qna-forge", "generate"]).unwrap();
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_global_log_level_after_subcommand() {
        let cli = Cli::try_parse_from(["qna-forge", "generate", "--log-level", "debug"]).unwrap();
        assert_eq!(cli.log_level, "debug");
    }
}
