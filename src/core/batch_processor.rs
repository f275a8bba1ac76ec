//! Batch processing with per-user partitioning
//!
//! This module provides the `BatchProcessor` struct, which processes a batch of
//! request records concurrently while keeping each user's requests in order.
//!
//! # Design
//!
//! A batch is partitioned by user handle. Partitions run in parallel on the
//! tokio blocking pool (password hashing and conflict backoff block the
//! thread); the records of one partition run sequentially in input order.
//!
//! ```text
//! BatchProcessor
//!     └── Arc<Bookstore>  (shared, thread-safe)
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::core::Bookstore;
use crate::types::{BookstoreError, Outcome, RequestRecord};

/// Result of processing a single request
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The request record that was processed
    pub record: RequestRecord,

    /// The outcome of processing
    pub result: Result<Outcome, BookstoreError>,
}

/// A spawned partition: handle, number of records and the running task
type PartitionTask = (String, usize, JoinHandle<Vec<ProcessingResult>>);

/// Batch processor with per-user partitioning
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    bookstore: Arc<Bookstore>,
}

impl BatchProcessor {
    pub fn new(bookstore: Arc<Bookstore>) -> Self {
        Self { bookstore }
    }

    /// Partition a batch of requests by user handle
    ///
    /// # Guarantees
    ///
    /// - Each record appears in exactly one partition
    /// - Records of each handle keep their original order
    pub fn partition_by_user(
        &self,
        batch: Vec<RequestRecord>,
    ) -> HashMap<String, Vec<RequestRecord>> {
        let mut partitions: HashMap<String, Vec<RequestRecord>> = HashMap::new();

        for record in batch {
            partitions
                .entry(record.user.clone())
                .or_default()
                .push(record);
        }

        partitions
    }

    /// Process all requests of a single user sequentially
    ///
    /// Failures are captured in the results and don't stop processing.
    pub fn process_user_requests(&self, requests: Vec<RequestRecord>) -> Vec<ProcessingResult> {
        requests
            .into_iter()
            .map(|record| {
                let result = self.bookstore.handle(&record);
                ProcessingResult { record, result }
            })
            .collect()
    }

    /// Process a batch of requests with per-user partitioning
    ///
    /// Waits for every partition to finish. Results of different users may be
    /// interleaved in any order; results of one user keep input order.
    pub async fn process_batch(&self, batch: Vec<RequestRecord>) -> Vec<ProcessingResult> {
        let partitions = self.partition_by_user(batch);

        let mut tasks = Vec::with_capacity(partitions.len());
        for (handle, requests) in partitions {
            let processor = self.clone();
            let count = requests.len();
            let task =
                tokio::task::spawn_blocking(move || processor.process_user_requests(requests));
            tasks.push((handle, count, task));
        }

        join_partitions(tasks).await
    }
}

/// Collect the results of every partition
///
/// A panicked partition yields no results; its handle and record count are
/// logged so the lost records can be traced.
async fn join_partitions(tasks: Vec<PartitionTask>) -> Vec<ProcessingResult> {
    let mut results = Vec::new();
    let mut dropped = 0;

    for (handle, count, task) in tasks {
        match task.await {
            Ok(user_results) => results.extend(user_results),
            Err(e) => {
                dropped += count;
                tracing::error!(
                    handle = %handle,
                    records = count,
                    error = %e,
                    "Partition task panicked, records dropped"
                );
            }
        }
    }

    if dropped > 0 {
        tracing::error!(dropped, completed = results.len(), "Batch finished with dropped records");
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EngineConfig, HashingConfig};
    use crate::io::snapshot::Snapshot;
    use crate::types::{Item, RequestType};
    use rust_decimal::Decimal;

    fn processor() -> BatchProcessor {
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
            price: Decimal::ONE,
        }];
        let bookstore = Bookstore::new(items, Snapshot::default(), &config).unwrap();
        BatchProcessor::new(Arc::new(bookstore))
    }

    fn user_script(handle: &str) -> Vec<RequestRecord> {
        vec![
            RequestRecord::new(RequestType::Register, handle).with_password("pw"),
            RequestRecord::new(RequestType::Deposit, handle).with_amount(Decimal::TWO),
            RequestRecord::new(RequestType::Buy, handle).with_item(1),
        ]
    }

    #[test]
    fn test_partition_by_user_keeps_order() {
        let processor = processor();
        let batch = vec![
            RequestRecord::new(RequestType::Register, "alice").with_password("pw"),
            RequestRecord::new(RequestType::Register, "bob").with_password("pw"),
            RequestRecord::new(RequestType::Buy, "alice").with_item(1),
            RequestRecord::new(RequestType::Balance, "carol"),
        ];

        let partitions = processor.partition_by_user(batch);

        assert_eq!(partitions.len(), 3);
        let alice = &partitions["alice"];
        assert_eq!(alice.len(), 2);
        assert_eq!(alice[0].kind, RequestType::Register);
        assert_eq!(alice[1].kind, RequestType::Buy);
    }

    #[test]
    fn test_partition_empty_batch() {
        assert!(processor().partition_by_user(vec![]).is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_process_batch_runs_every_request() {
        let processor = processor();
        let batch: Vec<RequestRecord> = ["alice", "bob", "carol", "dave"]
            .into_iter()
            .flat_map(user_script)
            .collect();

        let results = processor.process_batch(batch).await;

        assert_eq!(results.len(), 12);
        assert!(results.iter().all(|r| r.result.is_ok()), "{:?}", results);
        let report = processor.bookstore.report();
        assert_eq!(report.len(), 4);
        assert!(report
            .iter()
            .all(|user| user.balance == Decimal::ONE && user.items == vec![1]));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_panicked_partition_does_not_lose_other_results() {
        let record = RequestRecord::new(RequestType::SignOut, "bob");
        let done = vec![ProcessingResult {
            record: record.clone(),
            result: Ok(Outcome::SignedOut),
        }];
        let tasks: Vec<PartitionTask> = vec![
            (
                "alice".to_string(),
                3,
                tokio::task::spawn_blocking(|| -> Vec<ProcessingResult> {
                    panic!("partition failed")
                }),
            ),
            ("bob".to_string(), 1, tokio::task::spawn_blocking(move || done)),
        ];

        let results = join_partitions(tasks).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record, record);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_process_batch_keeps_per_user_order() {
        let processor = processor();
        let mut batch = user_script("alice");
        batch.push(RequestRecord::new(RequestType::Return, "alice").with_item(1));
        batch.push(RequestRecord::new(RequestType::Balance, "alice"));

        let results = processor.process_batch(batch).await;

        assert_eq!(
            results.last().map(|r| r.result.clone()),
            Some(Ok(Outcome::Balance(Decimal::TWO)))
        );
    }
}
