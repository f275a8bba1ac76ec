use crate::core::{EngineConfig, RetryPolicy};
use crate::strategy::BatchConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Replay bookstore requests and report balances and owned items
#[derive(Parser, Debug)]
#[command(name = "bookstore-engine")]
#[command(about = "Replay bookstore requests and report balances and owned items", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing request records
    #[arg(value_name = "REQUESTS", help = "Path to the requests CSV file")]
    pub input_file: PathBuf,

    /// Catalog CSV file (id,title,author,price)
    #[arg(long = "catalog", value_name = "CSV", help = "Path to the catalog CSV file")]
    pub catalog: PathBuf,

    /// Directory holding the saved user and ownership state
    #[arg(
        long = "data-dir",
        value_name = "DIR",
        help = "Load state from and save state to this directory"
    )]
    pub data_dir: Option<PathBuf>,

    /// Processing strategy
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Processing strategy: 'sync' for sequential or 'async' for concurrent"
    )]
    pub strategy: StrategyType,

    /// Number of requests per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of requests per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Maximum number of concurrent user partitions (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Maximum number of user partitions processing concurrently (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    /// Conflict retries for buy, return and deposit
    #[arg(
        long = "max-retries",
        value_name = "COUNT",
        help = "Retries of a conflicting buy/return/deposit before it fails (default: 5)"
    )]
    pub max_retries: Option<u32>,

    /// Log at debug level
    #[arg(short = 'v', long = "verbose", help = "Enable debug logging on stderr")]
    pub verbose: bool,
}

/// Available processing strategies
#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments
    ///
    /// Missing values use the defaults; zero values fall back to the defaults
    /// with a warning.
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }

    /// Create an EngineConfig from CLI arguments
    pub fn to_engine_config(&self) -> EngineConfig {
        let retry = match self.max_retries {
            Some(max_retries) => RetryPolicy::with_max_retries(max_retries),
            None => RetryPolicy::default(),
        };
        EngineConfig {
            retry,
            ..EngineConfig::default()
        }
    }

    /// Default log filter when `RUST_LOG` is not set
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::default_strategy(&["program", "--catalog", "c.csv", "input.csv"], StrategyType::Async)]
    #[case::explicit_sync(&["program", "--catalog", "c.csv", "--strategy", "sync", "input.csv"], StrategyType::Sync)]
    #[case::explicit_async(&["program", "--catalog", "c.csv", "--strategy", "async", "input.csv"], StrategyType::Async)]
    fn test_strategy_parsing(#[case] args: &[&str], #[case] expected: StrategyType) {
        let parsed = CliArgs::try_parse_from(args).unwrap();

        assert_eq!(parsed.strategy, expected);
    }

    #[test]
    fn test_paths_parsing() {
        let parsed = CliArgs::try_parse_from([
            "program",
            "--catalog",
            "catalog.csv",
            "--data-dir",
            "state",
            "requests.csv",
        ])
        .unwrap();

        assert_eq!(parsed.catalog, PathBuf::from("catalog.csv"));
        assert_eq!(parsed.data_dir, Some(PathBuf::from("state")));
        assert_eq!(parsed.input_file, PathBuf::from("requests.csv"));
    }

    #[rstest]
    #[case::all_defaults(&["program", "--catalog", "c.csv", "input.csv"], 1000, num_cpus::get())]
    #[case::custom_batch_size(&["program", "--catalog", "c.csv", "--batch-size", "2000", "input.csv"], 2000, num_cpus::get())]
    #[case::custom_max_concurrent(&["program", "--catalog", "c.csv", "--max-concurrent", "8", "input.csv"], 1000, 8)]
    #[case::zero_batch_size(&["program", "--catalog", "c.csv", "--batch-size", "0", "input.csv"], 1000, num_cpus::get())]
    #[case::zero_max_concurrent(&["program", "--catalog", "c.csv", "--max-concurrent", "0", "input.csv"], 1000, num_cpus::get())]
    fn test_batch_config_conversion(
        #[case] args: &[&str],
        #[case] expected_batch_size: usize,
        #[case] expected_max_concurrent: usize,
    ) {
        let config = CliArgs::try_parse_from(args).unwrap().to_batch_config();

        assert_eq!(config.batch_size, expected_batch_size);
        assert_eq!(config.max_concurrent_batches, expected_max_concurrent);
    }

    #[rstest]
    #[case::default(&["program", "--catalog", "c.csv", "input.csv"], 5)]
    #[case::custom(&["program", "--catalog", "c.csv", "--max-retries", "12", "input.csv"], 12)]
    #[case::disabled(&["program", "--catalog", "c.csv", "--max-retries", "0", "input.csv"], 0)]
    fn test_engine_config_conversion(#[case] args: &[&str], #[case] expected_retries: u32) {
        let config = CliArgs::try_parse_from(args).unwrap().to_engine_config();

        assert_eq!(config.retry.max_retries, expected_retries);
        assert_eq!(config.hashing, crate::core::HashingConfig::default());
    }

    #[rstest]
    #[case::quiet(&["program", "--catalog", "c.csv", "input.csv"], "info")]
    #[case::verbose(&["program", "--catalog", "c.csv", "--verbose", "input.csv"], "debug")]
    #[case::short_verbose(&["program", "--catalog", "c.csv", "-v", "input.csv"], "debug")]
    fn test_log_level(#[case] args: &[&str], #[case] expected: &str) {
        assert_eq!(CliArgs::try_parse_from(args).unwrap().log_level(), expected);
    }

    #[rstest]
    #[case::missing_input(&["program", "--catalog", "c.csv"])]
    #[case::missing_catalog(&["program", "input.csv"])]
    #[case::invalid_strategy(&["program", "--catalog", "c.csv", "--strategy", "invalid", "input.csv"])]
    #[case::negative_retries(&["program", "--catalog", "c.csv", "--max-retries", "-1", "input.csv"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        assert!(CliArgs::try_parse_from(args).is_err());
    }
}
