//! Cart Store and Cart Reconciler.
//!
//! The store persists `(productId, size, quantity)` entries under the
//! `cartsItems` key, rewriting the whole list on every mutation. The
//! reconciler joins those entries against the catalog snapshot each time it
//! is asked, so prices and titles are never stale.
//!
//! # Identity
//!
//! Entries are keyed by product id alone. Adding a product that is already in
//! the cart under another size bumps the existing entry's quantity and
//! replaces its size (last write wins). Sizes of the same product therefore
//! never coexist as separate lines.

mod reconcile;

pub use reconcile::{CartLineItem, CartLineView, CartReconciler, CartView, reconcile};
pub(crate) use reconcile::subtotal;

use std::sync::Arc;

use leather_shop_core::ProductId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, instrument};

use crate::catalog::CatalogError;
use crate::error::add_breadcrumb;
use crate::storage::{self, KeyValueStore, StorageError, keys};

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Cart entries could not be read or written.
    #[error("Cart storage error: {0}")]
    Storage(#[from] StorageError),

    /// Catalog snapshot could not be read during reconciliation.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Quantity to add must be at least 1.
    #[error("Quantity must be at least 1 (got {0})")]
    InvalidQuantity(u32),

    /// Adding would overflow the entry's quantity.
    #[error("Quantity overflow for product {0}")]
    QuantityOverflow(ProductId),

    /// A line total or the subtotal is too large to represent.
    #[error("Cart total is too large")]
    AmountOverflow,
}

/// A persisted cart entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEntry {
    pub product_id: ProductId,
    pub size: String,
    pub quantity: u32,
}

/// Persistent, ordered cart.
///
/// Cloning is cheap and every clone operates on the same backing store.
#[derive(Clone)]
pub struct CartStore {
    store: Arc<dyn KeyValueStore>,
}

impl CartStore {
    /// Create a cart store over the given backend.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Entries in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the entries cannot be read or decoded.
    pub fn list(&self) -> Result<Vec<CartEntry>, CartError> {
        Ok(storage::load_json(self.store.as_ref(), keys::CART_ITEMS)?.unwrap_or_default())
    }

    fn persist(&self, entries: &[CartEntry]) -> Result<(), CartError> {
        storage::save_json(self.store.as_ref(), keys::CART_ITEMS, entries).map_err(|e| {
            error!(error = %e, "Failed to persist cart");
            CartError::from(e)
        })
    }

    /// Add `quantity` of a product.
    ///
    /// Increments an existing entry for the same product (overwriting its
    /// size) or appends a new one. Returns the resulting entry.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for a zero quantity,
    /// `CartError::QuantityOverflow` if the sum does not fit, or
    /// `CartError::Storage` if the cart cannot be read or written.
    #[instrument(skip(self))]
    pub fn add(
        &self,
        product_id: ProductId,
        size: &str,
        quantity: u32,
    ) -> Result<CartEntry, CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity(quantity));
        }

        let mut entries = self.list()?;
        let entry = if let Some(existing) = entries.iter_mut().find(|e| e.product_id == product_id)
        {
            existing.quantity = existing
                .quantity
                .checked_add(quantity)
                .ok_or(CartError::QuantityOverflow(product_id))?;
            existing.size = size.to_string();
            existing.clone()
        } else {
            let entry = CartEntry {
                product_id,
                size: size.to_string(),
                quantity,
            };
            entries.push(entry.clone());
            entry
        };

        self.persist(&entries)?;

        let id = product_id.to_string();
        add_breadcrumb("cart", "Added to cart", Some(&[("product_id", id.as_str())]));
        info!(quantity = entry.quantity, "Cart entry updated");
        Ok(entry)
    }

    /// Overwrite an entry's quantity.
    ///
    /// Quantities below 1 and unknown products are ignored. Returns whether
    /// the cart changed.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the cart cannot be read or written.
    #[instrument(skip(self))]
    pub fn set_quantity(
        &self,
        product_id: ProductId,
        new_quantity: u32,
    ) -> Result<bool, CartError> {
        if new_quantity < 1 {
            debug!("Ignoring quantity below 1");
            return Ok(false);
        }

        let mut entries = self.list()?;
        let Some(entry) = entries.iter_mut().find(|e| e.product_id == product_id) else {
            return Ok(false);
        };
        entry.quantity = new_quantity;

        self.persist(&entries)?;
        Ok(true)
    }

    /// Remove a product's entry. Returns whether one was removed.
    ///
    /// Works whether or not the product still exists in the catalog.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the cart cannot be read or written.
    #[instrument(skip(self))]
    pub fn remove(&self, product_id: ProductId) -> Result<bool, CartError> {
        let mut entries = self.list()?;
        let before = entries.len();
        entries.retain(|e| e.product_id != product_id);

        if entries.len() == before {
            return Ok(false);
        }

        self.persist(&entries)?;

        let id = product_id.to_string();
        add_breadcrumb("cart", "Removed from cart", Some(&[("product_id", id.as_str())]));
        Ok(true)
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the cart cannot be written.
    pub fn clear(&self) -> Result<(), CartError> {
        self.persist(&[])
    }

    /// Total number of units across all entries (the cart badge count).
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the cart cannot be read.
    pub fn item_count(&self) -> Result<u32, CartError> {
        Ok(self
            .list()?
            .iter()
            .fold(0_u32, |acc, e| acc.saturating_add(e.quantity)))
    }

    /// Whether the cart has no entries.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the cart cannot be read.
    pub fn is_empty(&self) -> Result<bool, CartError> {
        Ok(self.list()?.is_empty())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn cart() -> CartStore {
        CartStore::new(Arc::new(MemoryStore::new()))
    }

    fn id(n: i32) -> ProductId {
        ProductId::new(n)
    }

    /// Backend whose writes always fail.
    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota exceeded".to_string()))
        }

        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[test]
    fn test_add_appends_in_order() {
        let cart = cart();
        cart.add(id(2), "M", 1).unwrap();
        cart.add(id(1), "L", 3).unwrap();

        let ids: Vec<_> = cart.list().unwrap().iter().map(|e| e.product_id).collect();
        assert_eq!(ids, vec![id(2), id(1)]);
        assert_eq!(cart.item_count().unwrap(), 4);
    }

    #[test]
    fn test_add_same_product_sums_quantities() {
        let cart = cart();
        cart.add(id(1), "M", 2).unwrap();
        let entry = cart.add(id(1), "M", 3).unwrap();

        assert_eq!(entry.quantity, 5);
        assert_eq!(cart.list().unwrap().len(), 1);
    }

    #[test]
    fn test_add_other_size_overwrites_size() {
        let cart = cart();
        cart.add(id(1), "M", 1).unwrap();
        cart.add(id(1), "XL", 1).unwrap();

        let entries = cart.list().unwrap();
        assert_eq!(
            entries,
            vec![CartEntry {
                product_id: id(1),
                size: "XL".to_string(),
                quantity: 2,
            }]
        );
    }

    #[test]
    fn test_add_zero_is_rejected() {
        let cart = cart();
        assert!(matches!(
            cart.add(id(1), "M", 0),
            Err(CartError::InvalidQuantity(0))
        ));
        assert!(cart.is_empty().unwrap());
    }

    #[test]
    fn test_add_overflow_is_rejected() {
        let cart = cart();
        cart.add(id(1), "M", u32::MAX).unwrap();
        assert!(matches!(
            cart.add(id(1), "M", 1),
            Err(CartError::QuantityOverflow(_))
        ));
        assert_eq!(cart.list().unwrap()[0].quantity, u32::MAX);
    }

    #[test]
    fn test_set_quantity_ignores_zero() {
        let cart = cart();
        cart.add(id(1), "M", 2).unwrap();

        assert!(!cart.set_quantity(id(1), 0).unwrap());
        assert_eq!(cart.list().unwrap()[0].quantity, 2);

        assert!(cart.set_quantity(id(1), 7).unwrap());
        assert_eq!(cart.list().unwrap()[0].quantity, 7);
    }

    #[test]
    fn test_set_quantity_unknown_product() {
        let cart = cart();
        assert!(!cart.set_quantity(id(9), 3).unwrap());
        assert!(cart.is_empty().unwrap());
    }

    #[test]
    fn test_remove() {
        let cart = cart();
        cart.add(id(1), "M", 1).unwrap();
        cart.add(id(2), "S", 1).unwrap();

        assert!(cart.remove(id(1)).unwrap());
        assert!(!cart.remove(id(1)).unwrap());
        assert_eq!(cart.list().unwrap().len(), 1);
    }

    #[test]
    fn test_clear() {
        let cart = cart();
        cart.add(id(1), "M", 1).unwrap();
        cart.clear().unwrap();
        assert!(cart.is_empty().unwrap());
        assert_eq!(cart.item_count().unwrap(), 0);
    }

    #[test]
    fn test_clones_share_state() {
        let a = cart();
        let b = a.clone();
        a.add(id(1), "M", 1).unwrap();
        assert_eq!(b.item_count().unwrap(), 1);
    }

    #[test]
    fn test_persisted_wire_format() {
        let store = Arc::new(MemoryStore::new());
        let cart = CartStore::new(store.clone());
        cart.add(id(1), "M", 2).unwrap();

        assert_eq!(
            store.get(keys::CART_ITEMS).unwrap().as_deref(),
            Some(r#"[{"productId":1,"size":"M","quantity":2}]"#)
        );
    }

    #[test]
    fn test_storage_failure_is_surfaced() {
        let cart = CartStore::new(Arc::new(ReadOnlyStore));
        assert!(matches!(
            cart.add(id(1), "M", 1),
            Err(CartError::Storage(StorageError::Unavailable(_)))
        ));
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        #[derive(Debug, Clone)]
        enum Op {
            Add(i32, u32),
            Set(i32, u32),
            Remove(i32),
        }

        fn arb_op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0..5_i32, 0..4_u32).prop_map(|(p, q)| Op::Add(p, q)),
                (0..5_i32, 0..4_u32).prop_map(|(p, q)| Op::Set(p, q)),
                (0..5_i32).prop_map(Op::Remove),
            ]
        }

        proptest! {
            #[test]
            fn quantity_never_below_one(ops in proptest::collection::vec(arb_op(), 0..40)) {
                let cart = cart();
                for op in ops {
                    // Zero-quantity adds are rejected; everything else succeeds
                    let _ = match op {
                        Op::Add(p, q) => cart.add(id(p), "M", q).map(|_| ()),
                        Op::Set(p, q) => cart.set_quantity(id(p), q).map(|_| ()),
                        Op::Remove(p) => cart.remove(id(p)).map(|_| ()),
                    };
                    for entry in cart.list().unwrap() {
                        prop_assert!(entry.quantity >= 1);
                    }
                }
            }

            #[test]
            fn one_entry_per_product(adds in proptest::collection::vec((0..3_i32, 1..5_u32), 1..20)) {
                let cart = cart();
                for (p, q) in &adds {
                    cart.add(id(*p), "M", *q).unwrap();
                }
                let entries = cart.list().unwrap();
                for entry in &entries {
                    let expected: u32 = adds
                        .iter()
                        .filter(|(p, _)| id(*p) == entry.product_id)
                        .map(|(_, q)| q)
                        .sum();
                    prop_assert_eq!(entry.quantity, expected);
                }
                let mut ids: Vec<_> = entries.iter().map(|e| e.product_id).collect();
                ids.sort();
                ids.dedup();
                prop_assert_eq!(ids.len(), entries.len());
            }
        }
    }
}
