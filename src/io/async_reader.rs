//! Asynchronous CSV reader with batch interface
//!
//! Provides a streaming interface over request records from a CSV file.
//! Supports batch reading for efficient async processing.
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of RequestRecords
//!                  ↓
//!           csv_format module
//!           (RequestCsvRecord, convert_request_record)
//! ```

use crate::io::csv_format::{convert_request_record, RequestCsvRecord};
use crate::types::RequestRecord;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;

/// Asynchronous CSV reader
///
/// Provides batch reading interface over request records.
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    /// Create a new AsyncReader from an async reader
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self { csv_reader }
    }

    /// Read a batch of request records
    ///
    /// Reads up to `batch_size` records, converting them to RequestRecords.
    /// Invalid records are logged and skipped.
    ///
    /// # Returns
    ///
    /// The successfully converted records, in file order. An empty vector
    /// means the end of the file was reached.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<RequestRecord> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<RequestCsvRecord>();

        while batch.len() < batch_size {
            match records.next().await {
                Some(Ok(csv_record)) => match convert_request_record(csv_record) {
                    Ok(record) => batch.push(record),
                    Err(e) => tracing::warn!(error = %e, "Skipping invalid request record"),
                },
                Some(Err(e)) => tracing::warn!(error = %e, "CSV parse error"),
                None => break,
            }
        }

        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RequestType;
    use futures::io::Cursor;

    const HEADER: &str = "type,user,password,item,amount,token,request_id\n";

    fn reader(body: &str) -> AsyncReader<Cursor<Vec<u8>>> {
        AsyncReader::new(Cursor::new(format!("{}{}", HEADER, body).into_bytes()))
    }

    #[tokio::test]
    async fn test_async_reader_multiple_batches() {
        let mut async_reader = reader(
            "register,alice,pw,,,,\n\
             deposit,alice,,,5,,\n\
             buy,alice,,1,,,\n\
             return,alice,,1,,,\n\
             balance,alice,,,,,\n",
        );

        let batch1 = async_reader.read_batch(2).await;
        assert_eq!(batch1.len(), 2);
        assert_eq!(batch1[0].kind, RequestType::Register);
        assert_eq!(batch1[1].kind, RequestType::Deposit);

        let batch2 = async_reader.read_batch(2).await;
        assert_eq!(batch2.len(), 2);
        assert_eq!(batch2[0].kind, RequestType::Buy);
        assert_eq!(batch2[1].kind, RequestType::Return);

        let batch3 = async_reader.read_batch(2).await;
        assert_eq!(batch3.len(), 1);
        assert_eq!(batch3[0].kind, RequestType::Balance);

        assert!(async_reader.read_batch(2).await.is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_empty_csv() {
        let mut async_reader = reader("");

        assert!(async_reader.read_batch(10).await.is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_skips_invalid_records() {
        let mut async_reader = reader("withdraw,alice,,,5,,\nbuy,alice,,,,,\nbuy,alice,,4,,,\n");

        let batch = async_reader.read_batch(10).await;

        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].item, Some(4));
    }

    #[tokio::test]
    async fn test_async_reader_whitespace_and_case() {
        let mut async_reader = reader("  SIGNIN  ,  bob  ,  pw  ,,,,\n");

        let batch = async_reader.read_batch(10).await;

        assert_eq!(
            batch,
            vec![RequestRecord::new(RequestType::SignIn, "bob").with_password("pw")]
        );
    }
}
