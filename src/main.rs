//! Bookstore Engine CLI
//!
//! Replays a CSV stream of client requests against the bookstore and prints
//! the final per-user state.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --catalog catalog.csv requests.csv > report.csv
//! cargo run -- --catalog catalog.csv --strategy sync requests.csv > report.csv
//! cargo run -- --catalog catalog.csv --data-dir state --batch-size 2000 --max-concurrent 8 requests.csv
//! ```
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, unreadable files, corrupt state, etc.)

use rust_bookstore_engine::cli;
use rust_bookstore_engine::core::Bookstore;
use rust_bookstore_engine::strategy;
use std::process;
use std::sync::Arc;

fn main() {
    let args = cli::parse_args();
    cli::init_tracing(args.log_level());

    let bookstore = match Bookstore::open(
        &args.catalog,
        args.data_dir.as_deref(),
        &args.to_engine_config(),
    ) {
        Ok(bookstore) => Arc::new(bookstore),
        Err(e) => {
            tracing::error!(error = %e, "Failed to open bookstore");
            process::exit(1);
        }
    };
    tracing::info!(items = bookstore.catalog_len(), "Bookstore opened");

    let strategy = {
        let config = if matches!(args.strategy, cli::StrategyType::Async) {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy, config)
    };

    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(&bookstore, &args.input_file, &mut output) {
        tracing::error!(error = %e, "Processing failed");
        process::exit(1);
    }

    if let Some(dir) = &args.data_dir {
        if let Err(e) = bookstore.persist(dir) {
            tracing::error!(error = %e, "Failed to save state");
            process::exit(1);
        }
    }
}
