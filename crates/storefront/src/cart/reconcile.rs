//! Cart reconciliation: joins cart entries with the catalog at read time.

use std::collections::HashMap;

use leather_shop_core::{Price, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{CartEntry, CartError, CartStore};
use crate::catalog::{CatalogStore, Product};

/// A cart entry denormalized with its product's current catalog data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub product_id: ProductId,
    pub title: String,
    pub price: Decimal,
    pub image: String,
    pub category: String,
    pub size: String,
    pub quantity: u32,
}

impl CartLineItem {
    fn join(entry: &CartEntry, product: &Product) -> Self {
        Self {
            product_id: entry.product_id,
            title: product.title.clone(),
            price: product.price,
            image: product.image.clone(),
            category: product.category.clone(),
            size: entry.size.clone(),
            quantity: entry.quantity,
        }
    }

    /// `price × quantity`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::AmountOverflow` if the product does not fit a
    /// `Decimal`.
    pub fn line_total(&self) -> Result<Decimal, CartError> {
        self.price
            .checked_mul(Decimal::from(self.quantity))
            .ok_or(CartError::AmountOverflow)
    }
}

/// Join `entries` against `products`, preserving cart order.
///
/// Entries whose product is missing from the catalog are dropped.
#[must_use]
pub fn reconcile(entries: &[CartEntry], products: &[Product]) -> Vec<CartLineItem> {
    let by_id: HashMap<ProductId, &Product> = products.iter().map(|p| (p.id, p)).collect();

    entries
        .iter()
        .filter_map(|entry| {
            let Some(product) = by_id.get(&entry.product_id) else {
                warn!(
                    product_id = %entry.product_id,
                    "Dropping cart entry for product missing from catalog"
                );
                return None;
            };
            Some(CartLineItem::join(entry, product))
        })
        .collect()
}

/// Read-time projection of the cart over the catalog. Holds no state.
pub struct CartReconciler<'a> {
    catalog: &'a CatalogStore,
    cart: &'a CartStore,
}

impl<'a> CartReconciler<'a> {
    #[must_use]
    pub const fn new(catalog: &'a CatalogStore, cart: &'a CartStore) -> Self {
        Self { catalog, cart }
    }

    /// Current line items, in cart order, with stale references dropped.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the cart or catalog cannot be read.
    pub fn materialize(&self) -> Result<Vec<CartLineItem>, CartError> {
        let entries = self.cart.list()?;
        if entries.is_empty() {
            return Ok(Vec::new());
        }
        let products = self.catalog.all()?;
        Ok(reconcile(&entries, &products))
    }

    /// `Σ price × quantity` over the materialized line items.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the cart or catalog cannot be read, or the
    /// subtotal overflows.
    pub fn subtotal(&self) -> Result<Decimal, CartError> {
        subtotal(&self.materialize()?)
    }

    /// Display-ready cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the cart or catalog cannot be read, or the
    /// totals overflow.
    pub fn view(&self) -> Result<CartView, CartError> {
        CartView::try_from(self.materialize()?.as_slice())
    }
}

pub(crate) fn subtotal(items: &[CartLineItem]) -> Result<Decimal, CartError> {
    items.iter().try_fold(Decimal::ZERO, |acc, item| {
        acc.checked_add(item.line_total()?)
            .ok_or(CartError::AmountOverflow)
    })
}

/// Cart line display data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub title: String,
    pub size: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
    pub image: String,
}

/// Cart display data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub subtotal: String,
    pub item_count: u32,
}

impl CartView {
    /// An empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            subtotal: Price::usd(Decimal::ZERO).display(),
            item_count: 0,
        }
    }
}

impl TryFrom<&CartLineItem> for CartLineView {
    type Error = CartError;

    fn try_from(item: &CartLineItem) -> Result<Self, Self::Error> {
        Ok(Self {
            product_id: item.product_id,
            title: item.title.clone(),
            size: item.size.clone(),
            quantity: item.quantity,
            price: Price::usd(item.price).display(),
            line_price: Price::usd(item.line_total()?).display(),
            image: item.image.clone(),
        })
    }
}

impl TryFrom<&[CartLineItem]> for CartView {
    type Error = CartError;

    fn try_from(items: &[CartLineItem]) -> Result<Self, Self::Error> {
        Ok(Self {
            items: items
                .iter()
                .map(CartLineView::try_from)
                .collect::<Result<_, _>>()?,
            subtotal: Price::usd(subtotal(items)?).display(),
            item_count: items
                .iter()
                .fold(0_u32, |acc, i| acc.saturating_add(i.quantity)),
        })
    }
}
