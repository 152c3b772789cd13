//! Storefront service shared by every front-end.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::cart::{CartReconciler, CartStore};
use crate::catalog::CatalogStore;
use crate::checkout::{CheckoutSession, DEFAULT_SUBMIT_DELAY};
use crate::config::StorefrontConfig;
use crate::error::Result;
use crate::orders::OrderPlacer;
use crate::storage::{JsonFileStore, KeyValueStore};
use crate::zip::ZipLocator;

/// The storefront engine: catalog, cart, zip table and checkout wiring.
///
/// This struct is cheaply cloneable via `Arc`; every clone shares the same
/// backing store, so it is the single owner of persisted cart and catalog
/// state.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    catalog: CatalogStore,
    cart: CartStore,
    zip: ZipLocator,
    submit_delay: Duration,
}

impl Storefront {
    /// Create a storefront over `store` with the default processing delay.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, zip: ZipLocator) -> Self {
        Self::with_submit_delay(store, zip, DEFAULT_SUBMIT_DELAY)
    }

    /// Create a storefront with an explicit checkout processing delay.
    #[must_use]
    pub fn with_submit_delay(
        store: Arc<dyn KeyValueStore>,
        zip: ZipLocator,
        submit_delay: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(StorefrontInner {
                catalog: CatalogStore::new(Arc::clone(&store)),
                cart: CartStore::new(store),
                zip,
                submit_delay,
            }),
        }
    }

    /// Open the storefront described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created or the zip
    /// table cannot be loaded.
    pub fn from_config(config: &StorefrontConfig) -> Result<Self> {
        let store = JsonFileStore::open(&config.data_dir)?;
        let zip = match &config.zip_table {
            Some(path) => ZipLocator::from_path(path)?,
            None => ZipLocator::default(),
        };

        info!(
            data_dir = %config.data_dir.display(),
            zip_entries = zip.len(),
            "Storefront opened"
        );
        Ok(Self::with_submit_delay(
            Arc::new(store),
            zip,
            config.submit_delay,
        ))
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogStore {
        &self.inner.catalog
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    #[must_use]
    pub fn zip(&self) -> &ZipLocator {
        &self.inner.zip
    }

    /// Checkout processing delay.
    #[must_use]
    pub fn submit_delay(&self) -> Duration {
        self.inner.submit_delay
    }

    /// Read-time view of the cart over the catalog.
    #[must_use]
    pub fn reconciler(&self) -> CartReconciler<'_> {
        CartReconciler::new(&self.inner.catalog, &self.inner.cart)
    }

    /// Start a checkout session that places orders through `placer`.
    #[must_use]
    pub fn checkout<P: OrderPlacer>(&self, placer: P) -> CheckoutSession<P> {
        CheckoutSession::new(self.clone(), placer)
    }
}
