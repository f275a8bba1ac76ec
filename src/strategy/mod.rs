//! Processing strategy module for request replay
//!
//! This module defines the Strategy pattern for complete request processing
//! pipelines, encompassing CSV parsing, request handling and report output.
//! Different implementations (synchronous, asynchronous batch) can be selected
//! at runtime and produce the same report for the same input.

use crate::cli::StrategyType;
use crate::core::Bookstore;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Processing strategy trait for complete request processing pipelines
pub trait ProcessingStrategy: Send + Sync {
    /// Replay requests from an input file and write the final report
    ///
    /// # Arguments
    ///
    /// * `bookstore` - The bookstore the requests run against
    /// * `input_path` - Path to the input CSV file containing request records
    /// * `output` - Writer receiving the `user,balance,items` report
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The input file cannot be opened
    /// - The async runtime cannot be created
    /// - Output cannot be written
    ///
    /// Rejected or malformed requests are logged and do not cause this method
    /// to return an error; processing continues with the next request.
    fn process(
        &self,
        bookstore: &Arc<Bookstore>,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<(), String>;
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of processing strategy to create (Sync or Async)
/// * `config` - Optional configuration for async batch processing (ignored for sync)
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy),
        StrategyType::Async => Box::new(AsyncProcessingStrategy::new(config.unwrap_or_default())),
    }
}
