//! Catalog Store: read-only product snapshot.
//!
//! The catalog is fetched once from a bootstrap document and persisted under
//! the `products` key. After that, [`CatalogStore::load`] always answers from
//! the persisted snapshot; there is no refresh or invalidation.

mod source;

pub use source::{CatalogSource, ConfiguredCatalogSource, FileCatalogSource, HttpCatalogSource};

use std::sync::Arc;

use leather_shop_core::{Badge, ProductId};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::storage::{KeyValueStore, StorageError, keys};

/// Errors that can occur while loading or reading the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Persisted snapshot could not be read or written.
    #[error("Catalog storage error: {0}")]
    Storage(#[from] StorageError),

    /// Bootstrap document could not be fetched over HTTP.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Bootstrap document could not be read from disk.
    #[error("Failed to read catalog document {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Bootstrap source answered with a non-success status.
    #[error("Catalog source returned HTTP {status}")]
    Status { status: u16 },

    /// Bootstrap document is not a sequence of products.
    #[error("Catalog document parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A product record violates a catalog invariant.
    #[error("Invalid product {id}: {reason}")]
    InvalidProduct { id: ProductId, reason: String },
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Decimal>,
    pub image: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub reviews: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<Badge>,
}

impl Product {
    /// Percentage saved against `original_price`, rounded to a whole percent.
    ///
    /// `None` when there is no original price or it is not above `price`.
    #[must_use]
    pub fn discount_percent(&self) -> Option<u32> {
        let original = self.original_price?;
        if original <= self.price || original.is_zero() {
            return None;
        }
        ((original - self.price) / original * Decimal::ONE_HUNDRED)
            .round()
            .to_u32()
    }

    fn check(&self) -> Result<(), CatalogError> {
        if self.price.is_sign_negative() {
            return Err(CatalogError::InvalidProduct {
                id: self.id,
                reason: format!("negative price {}", self.price),
            });
        }
        if !(0.0..=5.0).contains(&self.rating) {
            return Err(CatalogError::InvalidProduct {
                id: self.id,
                reason: format!("rating {} outside 0-5", self.rating),
            });
        }
        Ok(())
    }
}

/// Parse and check a bootstrap document.
///
/// # Errors
///
/// Returns `CatalogError::Parse` for malformed JSON and
/// `CatalogError::InvalidProduct` for records breaking an invariant.
pub fn parse_document(raw: &str) -> Result<Vec<Product>, CatalogError> {
    let products: Vec<Product> = serde_json::from_str(raw)?;
    for product in &products {
        product.check()?;
    }
    Ok(products)
}

/// Persistent catalog snapshot.
#[derive(Clone)]
pub struct CatalogStore {
    store: Arc<dyn KeyValueStore>,
}

impl CatalogStore {
    /// Create a catalog store over the given backend.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Return the catalog, fetching it from `source` only if no snapshot exists.
    ///
    /// A present snapshot is never overwritten.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the snapshot cannot be read, the source
    /// cannot be fetched or parsed, or the snapshot cannot be written.
    #[instrument(skip(self, source))]
    pub async fn load<S>(&self, source: &S) -> Result<Vec<Product>, CatalogError>
    where
        S: CatalogSource + Sync,
    {
        if let Some(products) = self.snapshot()? {
            return Ok(products);
        }

        let raw = source.fetch_document().await?;
        let products = parse_document(&raw)?;
        self.store.set(keys::PRODUCTS, &raw).map_err(|e| {
            error!(error = %e, "Failed to persist catalog snapshot");
            CatalogError::from(e)
        })?;

        info!(count = products.len(), "Catalog snapshot persisted");
        Ok(products)
    }

    /// The persisted snapshot, if one has been loaded.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the snapshot cannot be read or decoded.
    pub fn snapshot(&self) -> Result<Option<Vec<Product>>, CatalogError> {
        self.store
            .get(keys::PRODUCTS)?
            .map(|raw| {
                serde_json::from_str(&raw).map_err(|source| {
                    CatalogError::Storage(StorageError::Corrupt {
                        key: keys::PRODUCTS.to_string(),
                        source,
                    })
                })
            })
            .transpose()
    }

    /// All products, empty before the first load.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the snapshot cannot be read or decoded.
    pub fn all(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.snapshot()?.unwrap_or_default())
    }

    /// Look up a single product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the snapshot cannot be read or decoded.
    pub fn get(&self, id: ProductId) -> Result<Option<Product>, CatalogError> {
        Ok(self.all()?.into_iter().find(|p| p.id == id))
    }

    /// Products in a category (case-insensitive), in catalog order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the snapshot cannot be read or decoded.
    pub fn by_category(&self, category: &str) -> Result<Vec<Product>, CatalogError> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|p| p.category.eq_ignore_ascii_case(category))
            .collect())
    }
}
