//! I/O module
//!
//! Handles CSV parsing, report output and on-disk state.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (record conversion, report serialization)
//! - `sync_reader` - Synchronous CSV reader with iterator interface
//! - `async_reader` - Asynchronous CSV reader with batch reading interface
//! - `snapshot` - Catalog loading and atomic state files

pub mod async_reader;
pub mod csv_format;
pub mod snapshot;
pub mod sync_reader;

pub use async_reader::AsyncReader;
pub use csv_format::{convert_request_record, write_report_csv, RequestCsvRecord};
pub use snapshot::Snapshot;
pub use sync_reader::SyncReader;
