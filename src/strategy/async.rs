//! Asynchronous batch processing strategy
//!
//! This module provides a multi-threaded implementation of the
//! ProcessingStrategy trait. It processes requests in batches with per-user
//! partitioning.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch CSV reading)
//!     └── BatchProcessor (user partitioning + blocking pool)
//!         └── Arc<Bookstore>
//! ```
//!
//! # Parallelism
//!
//! - Batches are processed one after another, so a user's requests keep
//!   their order even when they span several batches
//! - Within a batch, partitions of different users run in parallel on the
//!   tokio blocking pool, bounded by `max_concurrent_batches`

use crate::core::{BatchProcessor, Bookstore};
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::write_report_csv;
use crate::strategy::ProcessingStrategy;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Configuration for batch processing
#[derive(Clone, Debug, PartialEq)]
pub struct BatchConfig {
    /// Number of requests per batch
    pub batch_size: usize,
    /// Maximum number of user partitions processing concurrently
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig with custom values
    ///
    /// Zero values fall back to the defaults with a warning.
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            tracing::warn!(
                batch_size,
                default = default.batch_size,
                "Invalid batch_size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            tracing::warn!(
                max_concurrent_batches,
                default = default.max_concurrent_batches,
                "Invalid max_concurrent_batches, using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Asynchronous batch processing strategy
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
}

impl AsyncProcessingStrategy {
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    /// Replay requests batch by batch and write the final report
    ///
    /// 1. Creates a tokio multi-threaded runtime
    /// 2. Reads requests in batches using AsyncReader
    /// 3. Processes each batch to completion before reading the next
    /// 4. Writes the report using the csv_format module
    fn process(
        &self,
        bookstore: &Arc<Bookstore>,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<(), String> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .max_blocking_threads(self.config.max_concurrent_batches)
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        runtime.block_on(async {
            let processor = BatchProcessor::new(Arc::clone(bookstore));

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| format!("Failed to open file '{}': {}", input_path.display(), e))?;

            // csv-async reads futures::io, tokio files need the compat layer
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            let mut batches = 0usize;
            let mut processed = 0usize;
            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                let results = processor.process_batch(batch).await;
                batches += 1;
                processed += results.len();
            }

            tracing::info!(batches, requests = processed, "Async replay finished");
            Ok::<(), String>(())
        })?;

        write_report_csv(&bookstore.report(), output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EngineConfig, HashingConfig};
    use crate::io::snapshot::Snapshot;
    use crate::types::Item;
    use rstest::rstest;
    use rust_decimal::Decimal;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "type,user,password,item,amount,token,request_id\n";

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn bookstore() -> Arc<Bookstore> {
        let config = EngineConfig {
            hashing: HashingConfig {
                memory_kib: 64,
                iterations: 1,
                parallelism: 1,
            },
            ..EngineConfig::default()
        };
        let items = vec![Item {
            id: 1,
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            price: Decimal::new(750, 2),
        }];
        Arc::new(Bookstore::new(items, Snapshot::default(), &config).unwrap())
    }

    #[rstest]
    #[case(0, 4, BatchConfig { batch_size: 1000, max_concurrent_batches: 4 })]
    #[case(10, 2, BatchConfig { batch_size: 10, max_concurrent_batches: 2 })]
    fn test_batch_config_new(
        #[case] batch_size: usize,
        #[case] max_concurrent: usize,
        #[case] expected: BatchConfig,
    ) {
        assert_eq!(BatchConfig::new(batch_size, max_concurrent), expected);
    }

    #[test]
    fn test_batch_config_zero_workers_uses_cpu_count() {
        assert_eq!(BatchConfig::new(5, 0).max_concurrent_batches, num_cpus::get());
    }

    #[test]
    fn test_async_strategy_handles_missing_file() {
        let strategy = AsyncProcessingStrategy::new(BatchConfig::default());
        let mut output = Vec::new();

        let result = strategy.process(&bookstore(), Path::new("nonexistent.csv"), &mut output);

        assert!(result.unwrap_err().contains("Failed to open file"));
    }

    #[test]
    fn test_async_strategy_keeps_order_across_batches() {
        // A batch size of 2 splits every user's script across batches
        let file = create_temp_csv(&format!(
            "{}register,alice,pw,,,,\n\
             register,bob,pw,,,,\n\
             deposit,alice,,,10,,\n\
             deposit,bob,,,5,,\n\
             buy,alice,,1,,,\n\
             buy,bob,,1,,,\n\
             return,alice,,1,,,\n",
            HEADER
        ));
        let strategy = AsyncProcessingStrategy::new(BatchConfig::new(2, 4));
        let mut output = Vec::new();

        strategy.process(&bookstore(), file.path(), &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "user,balance,items\nalice,10.00,\nbob,5.00,\n"
        );
    }
}
