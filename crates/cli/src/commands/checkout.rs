//! Checkout command.
//!
//! Reads a checkout form from YAML and submits it against the current cart.
//!
//! ```yaml
//! firstName: Ada
//! lastName: Lovelace
//! email: ada@example.com
//! address: 1 Analytical Way
//! city: Beverly Hills
//! zip: "90210"           # fills state and country
//! paymentMethod: paypal
//! termsAccepted: true
//! ```

use std::path::Path;

use leather_shop_core::Price;
use leather_shop_storefront::checkout::{CheckoutError, CheckoutForm};
use leather_shop_storefront::error::{AppError, Result};
use leather_shop_storefront::orders::{HttpOrderPlacer, OrderPlacer, SimulatedOrderPlacer};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::Context;
use super::catalog::ensure_loaded;

/// Errors reading the form file.
#[derive(Debug, Error)]
pub enum FormFileError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid checkout form {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

impl From<FormFileError> for AppError {
    fn from(err: FormFileError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

/// Read a checkout form from a YAML file.
///
/// # Errors
///
/// Returns `FormFileError` if the file cannot be read or parsed.
pub async fn read_form(path: &Path) -> std::result::Result<CheckoutForm, FormFileError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| FormFileError::Io {
            path: path.display().to_string(),
            source,
        })?;
    serde_yaml::from_str(&content).map_err(|source| FormFileError::Yaml {
        path: path.display().to_string(),
        source,
    })
}

/// Submit the form at `path`.
///
/// Orders go to the order API when one is configured and are simulated
/// otherwise. Ctrl+C during the processing delay cancels the submission.
///
/// # Errors
///
/// Returns an error if the form is unreadable or invalid, the cart is empty,
/// the submission is cancelled, or the order is rejected.
pub async fn run(ctx: &Context, path: &Path) -> Result<()> {
    ensure_loaded(ctx).await?;
    let form = read_form(path).await?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling submission");
            on_interrupt.cancel();
        }
    });

    match &ctx.config.order_api {
        Some(api) => {
            let placer = HttpOrderPlacer::new(api)?;
            info!(endpoint = %placer.endpoint(), "Placing order via order API");
            submit(ctx, placer, &form, &cancel).await
        }
        None => {
            info!("ORDER_API_URL not set, simulating order placement");
            submit(ctx, SimulatedOrderPlacer, &form, &cancel).await
        }
    }
}

#[allow(clippy::print_stdout)]
async fn submit<P: OrderPlacer>(
    ctx: &Context,
    placer: P,
    form: &CheckoutForm,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut session = ctx.storefront.checkout(placer);
    for (field, value) in form.entries() {
        let filled = session.on_field_change(field, &value)?;
        if !filled.is_empty() {
            info!(
                zip = %session.form().zip,
                state = %session.form().state,
                country = %session.form().country,
                "Address autofilled from zip"
            );
        }
    }

    let summary = session.summary()?;
    println!("Subtotal: {}", Price::usd(summary.subtotal).display());
    println!("Tax:      {}", Price::usd(summary.tax).display());
    println!("Total:    {}", Price::usd(summary.total).display());
    println!("Processing order...");

    match session.submit(cancel).await {
        Ok(confirmation) => {
            println!(
                "Order {} placed at {}",
                confirmation.order_id,
                confirmation.placed_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            Ok(())
        }
        Err(CheckoutError::Invalid(errors)) => {
            println!("Please fix the following:");
            for (field, message) in errors.iter() {
                println!("  {field}: {message}");
            }
            Err(AppError::BadRequest(format!(
                "{} invalid field(s)",
                errors.len()
            )))
        }
        Err(e) => Err(e.into()),
    }
}
