use clap::{Args, Parser, Subcommand};

use crate::logging::LogFormat;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Log output format (stderr).
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a batch of micro-sites for one topic.
    Generate(GenerateArgs),
    /// Print past generations as JSON lines, most recent first.
    History(HistoryArgs),
    /// Print aggregate generation statistics as JSON.
    Stats(StatsArgs),
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Subject of every site in the batch.
    #[arg(long)]
    pub topic: String,

    /// Number of sites to generate (1-50).
    #[arg(long, default_value_t = 5)]
    pub count: u32,

    /// educational, marketing or technical.
    #[arg(long, default_value = "educational")]
    pub style: String,

    /// Output token budget per backend call (100-2000).
    #[arg(long, default_value_t = 800)]
    pub tokens: u32,

    /// Maximum sites generated at the same time.
    #[arg(long, default_value_t = 5)]
    pub concurrency: usize,

    /// Attempts per backend call for rate-limit and timeout failures.
    #[arg(long, default_value_t = 3)]
    pub max_attempts: u32,

    /// Give up on unfinished sites after this many seconds.
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Seed for reproducible diversity choices.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Directory for rendered HTML pages.
    #[arg(long, default_value = "sites")]
    pub out: String,

    /// Directory holding the generation logs.
    #[arg(long, default_value = ".")]
    pub data_dir: String,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    #[arg(long, default_value_t = 50)]
    pub limit: usize,

    #[arg(long, default_value_t = 0)]
    pub offset: usize,

    /// Directory holding the generation logs.
    #[arg(long, default_value = ".")]
    pub data_dir: String,
}

#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Directory holding the generation logs.
    #[arg(long, default_value = ".")]
    pub data_dir: String,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn generate_defaults() {
        let cli = Cli::try_parse_from(["sitegen", "generate", "--topic", "AI"]).unwrap();
        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.count, 5);
        assert_eq!(args.style, "educational");
        assert_eq!(args.tokens, 800);
        assert_eq!(args.concurrency, 5);
        assert_eq!(args.max_attempts, 3);
        assert_eq!(args.deadline_secs, None);
        assert_eq!(cli.log_format, LogFormat::Text);
    }

    #[test]
    fn log_format_is_global() {
        let cli = Cli::try_parse_from(["sitegen", "stats", "--log-format", "json"]).unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
    }
}
