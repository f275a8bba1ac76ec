//! Read-mostly catalog of purchasable items
//!
//! The catalog is loaded once at start-up and never mutated afterwards, so
//! reads need no coordination with the purchase engine.

use crate::types::{BookstoreError, Item, ItemId};
use dashmap::DashMap;
use rust_decimal::Decimal;

/// Catalog store keyed by item ID
#[derive(Debug, Default)]
pub struct CatalogStore {
    items: DashMap<ItemId, Item>,
}

impl CatalogStore {
    /// Build a catalog from loaded items
    ///
    /// # Errors
    ///
    /// Returns `CorruptSnapshot` for a duplicate ID or a negative price.
    pub fn from_items(items: Vec<Item>) -> Result<Self, BookstoreError> {
        let catalog = Self::default();

        for item in items {
            if item.price < Decimal::ZERO {
                return Err(BookstoreError::corrupt_snapshot(format!(
                    "item {} has negative price {}",
                    item.id, item.price
                )));
            }
            let id = item.id;
            if catalog.items.insert(id, item).is_some() {
                return Err(BookstoreError::corrupt_snapshot(format!(
                    "duplicate item id {}",
                    id
                )));
            }
        }

        Ok(catalog)
    }

    /// Get a copy of an item
    pub fn get(&self, id: ItemId) -> Option<Item> {
        self.items.get(&id).map(|item| item.value().clone())
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    /// List every item, sorted by ID
    pub fn list(&self) -> Vec<Item> {
        let mut items: Vec<Item> = self
            .items
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        items.sort_by_key(|item| item.id);
        items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: ItemId, price: Decimal) -> Item {
        Item {
            id,
            title: format!("Book {}", id),
            author: "Anon".to_string(),
            price,
        }
    }

    #[test]
    fn test_list_is_sorted_by_id() {
        let catalog = CatalogStore::from_items(vec![
            item(3, Decimal::ONE),
            item(1, Decimal::ONE),
            item(2, Decimal::ONE),
        ])
        .unwrap();

        let ids: Vec<ItemId> = catalog.list().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_get_missing_item() {
        let catalog = CatalogStore::from_items(vec![item(1, Decimal::ONE)]).unwrap();

        assert!(catalog.get(2).is_none());
        assert!(!catalog.contains(2));
        assert_eq!(catalog.get(1).unwrap().price, Decimal::ONE);
    }

    #[test]
    fn test_free_item_is_allowed() {
        let catalog = CatalogStore::from_items(vec![item(1, Decimal::ZERO)]).unwrap();

        assert!(catalog.contains(1));
    }

    #[test]
    fn test_rejects_negative_price() {
        let result = CatalogStore::from_items(vec![item(1, Decimal::new(-1, 0))]);

        assert!(matches!(result, Err(BookstoreError::CorruptSnapshot { .. })));
    }

    #[test]
    fn test_rejects_duplicate_id() {
        let result = CatalogStore::from_items(vec![item(1, Decimal::ONE), item(1, Decimal::TWO)]);

        assert!(matches!(result, Err(BookstoreError::CorruptSnapshot { .. })));
    }
}
