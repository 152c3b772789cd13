//! Unified error handling with Sentry integration.
//!
//! Each concern has its own error enum; [`AppError`] unifies them for
//! front-ends, which call [`AppError::report`] before showing the error to the
//! user.

use thiserror::Error;

use crate::cart::CartError;
use crate::catalog::CatalogError;
use crate::checkout::{CheckoutError, FormError};
use crate::config::ConfigError;
use crate::orders::OrderError;
use crate::storage::StorageError;
use crate::zip::ZipTableError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Persisted state could not be read or written.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Catalog operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout operation failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Order backend failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Zip table could not be loaded.
    #[error("Zip table error: {0}")]
    ZipTable(#[from] ZipTableError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad input from the user.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<FormError> for AppError {
    fn from(err: FormError) -> Self {
        Self::Checkout(CheckoutError::Form(err))
    }
}

impl AppError {
    /// Whether this is a fault on our side rather than something the user
    /// can fix.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        match self {
            Self::Config(_)
            | Self::Storage(_)
            | Self::Catalog(_)
            | Self::ZipTable(_)
            | Self::Order(_) => true,
            Self::Cart(err) => matches!(err, CartError::Storage(_) | CartError::Catalog(_)),
            Self::Checkout(err) => matches!(
                err,
                CheckoutError::Cart(CartError::Storage(_) | CartError::Catalog(_))
                    | CheckoutError::Order(_)
            ),
            Self::NotFound(_) | Self::BadRequest(_) => false,
        }
    }

    /// Capture server errors to Sentry and log them.
    ///
    /// Returns the message to show the user, without internal details.
    #[must_use]
    pub fn report(&self) -> String {
        if self.is_server_error() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront error"
            );
        }

        match self {
            Self::Storage(_) => "Internal error".to_string(),
            Self::Catalog(_) => "The catalog is unavailable".to_string(),
            Self::Order(err) | Self::Checkout(CheckoutError::Order(err)) => err.user_message(),
            _ => self.to_string(),
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
