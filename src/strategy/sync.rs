//! Synchronous processing strategy
//!
//! This module provides a single-threaded implementation of the
//! ProcessingStrategy trait. It streams records from the SyncReader into the
//! bookstore one at a time, in file order.
//!
//! # Design
//!
//! The SyncProcessingStrategy focuses on orchestration, delegating:
//! - CSV parsing to `SyncReader` (iterator interface)
//! - Request handling to `Bookstore` (business logic)
//! - CSV output to `csv_format::write_report_csv` (format handling)

use crate::core::Bookstore;
use crate::io::csv_format::write_report_csv;
use crate::io::sync_reader::SyncReader;
use crate::strategy::ProcessingStrategy;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Synchronous processing strategy
///
/// # Examples
///
/// ```no_run
/// use rust_bookstore_engine::core::{Bookstore, EngineConfig};
/// use rust_bookstore_engine::strategy::{ProcessingStrategy, SyncProcessingStrategy};
/// use std::path::Path;
/// use std::sync::Arc;
///
/// let bookstore = Bookstore::open(Path::new("catalog.csv"), None, &EngineConfig::default())
///     .expect("Failed to open bookstore");
/// let mut output = std::io::stdout();
///
/// SyncProcessingStrategy
///     .process(&Arc::new(bookstore), Path::new("requests.csv"), &mut output)
///     .expect("Processing failed");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SyncProcessingStrategy;

impl ProcessingStrategy for SyncProcessingStrategy {
    /// Replay requests in file order and write the final report
    ///
    /// Malformed records and rejected requests are logged and skipped.
    fn process(
        &self,
        bookstore: &Arc<Bookstore>,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<(), String> {
        let reader = SyncReader::new(input_path)?;
        let mut processed = 0usize;

        for result in reader {
            match result {
                Ok(record) => {
                    // Outcomes are logged by the request handler
                    let _ = bookstore.handle(&record);
                    processed += 1;
                }
                Err(e) => tracing::warn!(error = %e, "Skipping invalid request record"),
            }
        }

        tracing::info!(requests = processed, "Sync replay finished");
        write_report_csv(&bookstore.report(), output)
    }
}
