//! Catalog item types

use rust_decimal::Decimal;

/// Item identifier
///
/// Supports item IDs from 0 to 4,294,967,295
pub type ItemId = u32;

/// A purchasable catalog item
///
/// Items are read-only once the catalog has been loaded; in particular
/// the price never changes, so a return always refunds what was paid.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    pub author: String,
    pub price: Decimal,
}
