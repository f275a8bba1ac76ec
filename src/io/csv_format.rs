//! CSV format handling for request records, catalog rows and report output
//!
//! This module centralizes all CSV format concerns, providing:
//! - RequestCsvRecord and CatalogCsvRecord structures for deserialization
//! - Conversion from CSV records to domain types
//! - Report serialization
//!
//! All functions are pure (no I/O) for easy testing.

use crate::types::{Item, ItemId, RequestRecord, RequestType, UserReport};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// CSV record structure for request deserialization
///
/// Matches the input CSV format with columns:
/// type, user, password, item, amount, token, request_id.
/// Everything after `user` is optional and may be left empty or omitted.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct RequestCsvRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub user: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub item: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
}

/// CSV record structure for catalog deserialization
///
/// Matches the catalog CSV format with columns: id, title, author, price
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CatalogCsvRecord {
    pub id: ItemId,
    pub title: String,
    pub author: String,
    pub price: String,
}

fn non_empty(field: Option<String>) -> Option<String> {
    field.filter(|value| !value.trim().is_empty())
}

/// Parse a request type, case-insensitively
pub fn parse_request_type(kind: &str) -> Option<RequestType> {
    let kind = match kind.trim().to_lowercase().as_str() {
        "register" => RequestType::Register,
        "signin" => RequestType::SignIn,
        "signout" => RequestType::SignOut,
        "delete" => RequestType::Delete,
        "deposit" => RequestType::Deposit,
        "buy" => RequestType::Buy,
        "return" => RequestType::Return,
        "balance" => RequestType::Balance,
        "library" => RequestType::Library,
        "catalog" => RequestType::Catalog,
        _ => return None,
    };
    Some(kind)
}

/// Convert a RequestCsvRecord to a RequestRecord
///
/// This function:
/// - Parses the request type string into a RequestType enum
/// - Parses the item and amount fields (if present)
/// - Validates that buy/return carry an item and deposit carries an amount
///
/// Passwords are not validated here; an empty password reaches the
/// authentication service and is rejected there.
///
/// # Errors
///
/// Returns a message describing the conversion failure.
pub fn convert_request_record(csv_record: RequestCsvRecord) -> Result<RequestRecord, String> {
    let kind = parse_request_type(&csv_record.kind).ok_or_else(|| {
        format!(
            "Invalid request type: '{}' for user '{}'",
            csv_record.kind, csv_record.user
        )
    })?;

    let item = match non_empty(csv_record.item) {
        Some(item) => Some(
            item.trim()
                .parse::<ItemId>()
                .map_err(|_| format!("Invalid item '{}' for user '{}'", item, csv_record.user))?,
        ),
        None => None,
    };

    let amount = match non_empty(csv_record.amount) {
        Some(amount) => Some(Decimal::from_str(amount.trim()).map_err(|_| {
            format!("Invalid amount '{}' for user '{}'", amount, csv_record.user)
        })?),
        None => None,
    };

    match kind {
        RequestType::Buy | RequestType::Return if item.is_none() => {
            return Err(format!(
                "{} request for user '{}' requires an item",
                kind, csv_record.user
            ));
        }
        RequestType::Deposit if amount.is_none() => {
            return Err(format!(
                "{} request for user '{}' requires an amount",
                kind, csv_record.user
            ));
        }
        _ => {}
    }

    Ok(RequestRecord {
        kind,
        user: csv_record.user,
        password: csv_record.password,
        item,
        amount,
        token: non_empty(csv_record.token),
        request_id: non_empty(csv_record.request_id),
    })
}

/// Convert a CatalogCsvRecord to an Item
///
/// # Errors
///
/// Returns a message if the price is not a decimal number.
pub fn convert_catalog_record(csv_record: CatalogCsvRecord) -> Result<Item, String> {
    let price = Decimal::from_str(csv_record.price.trim()).map_err(|_| {
        format!(
            "Invalid price '{}' for item {}",
            csv_record.price, csv_record.id
        )
    })?;

    Ok(Item {
        id: csv_record.id,
        title: csv_record.title,
        author: csv_record.author,
        price,
    })
}

/// Write the final per-user state to CSV format
///
/// Writes rows with columns: user, balance, items. Rows are sorted by handle,
/// balances carry two decimal places and owned item IDs are joined with `;`
/// in ascending order.
///
/// # Errors
///
/// Returns a message if a write error occurred.
pub fn write_report_csv(reports: &[UserReport], output: &mut dyn Write) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["user", "balance", "items"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted = reports.to_vec();
    sorted.sort_by(|a, b| a.handle.cmp(&b.handle));

    for report in sorted {
        let mut items = report.items.clone();
        items.sort_unstable();
        let items = items
            .iter()
            .map(ItemId::to_string)
            .collect::<Vec<_>>()
            .join(";");

        writer
            .write_record(&[report.handle, format!("{:.2}", report.balance), items])
            .map_err(|e| format!("Failed to write report record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}
