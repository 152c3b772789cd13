//! Cart commands.
//!
//! # Usage
//!
//! ```bash
//! shop-cli cart add 1 --size L --quantity 2
//! shop-cli cart set 1 3
//! shop-cli cart remove 1
//! shop-cli cart show
//! shop-cli cart clear
//! ```

use leather_shop_core::{Price, ProductId};
use leather_shop_storefront::cart::CartView;
use leather_shop_storefront::checkout::derive_summary;
use leather_shop_storefront::error::{AppError, Result};
use tracing::{info, warn};

use super::Context;
use super::catalog::ensure_loaded;

/// Add a product to the cart.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the product is not in the catalog, or a
/// cart error for a zero quantity or a storage failure.
pub async fn add(ctx: &Context, id: ProductId, size: &str, quantity: u32) -> Result<()> {
    ensure_loaded(ctx).await?;
    let product = ctx
        .storefront
        .catalog()
        .get(id)?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    let entry = ctx.storefront.cart().add(id, size, quantity)?;
    info!(
        product = %product.title,
        size = %entry.size,
        quantity = entry.quantity,
        "Added to cart"
    );
    Ok(())
}

/// Overwrite an entry's quantity. Quantities below 1 are ignored.
///
/// # Errors
///
/// Returns an error if the cart cannot be read or written.
pub fn set(ctx: &Context, id: ProductId, quantity: u32) -> Result<()> {
    if ctx.storefront.cart().set_quantity(id, quantity)? {
        info!(product_id = %id, quantity, "Quantity updated");
    } else {
        warn!(product_id = %id, quantity, "Nothing changed (unknown product or quantity below 1)");
    }
    Ok(())
}

/// Remove a product from the cart.
///
/// # Errors
///
/// Returns an error if the cart cannot be read or written.
pub fn remove(ctx: &Context, id: ProductId) -> Result<()> {
    if ctx.storefront.cart().remove(id)? {
        info!(product_id = %id, "Removed from cart");
    } else {
        warn!(product_id = %id, "Product not in cart");
    }
    Ok(())
}

/// Print the reconciled cart with its order summary.
///
/// # Errors
///
/// Returns an error if the cart or catalog cannot be read.
#[allow(clippy::print_stdout)]
pub async fn show(ctx: &Context) -> Result<()> {
    ensure_loaded(ctx).await?;

    let items = ctx.storefront.reconciler().materialize()?;
    if items.is_empty() {
        println!("Your cart is empty.");
        return Ok(());
    }

    let view = CartView::try_from(items.as_slice())?;
    for line in &view.items {
        println!(
            "{:>4}  {:<32} {:>4}  x{:<3} {:>10} {:>10}",
            line.product_id.as_i32(),
            line.title,
            line.size,
            line.quantity,
            line.price,
            line.line_price,
        );
    }

    let summary = derive_summary(&items)?;
    println!();
    println!("Items:    {}", view.item_count);
    println!("Subtotal: {}", view.subtotal);
    println!("Tax:      {}", Price::usd(summary.tax).display());
    println!("Shipping: Free");
    println!("Total:    {}", Price::usd(summary.total).display());
    Ok(())
}

/// Empty the cart.
///
/// # Errors
///
/// Returns an error if the cart cannot be written.
pub fn clear(ctx: &Context) -> Result<()> {
    ctx.storefront.cart().clear()?;
    info!("Cart cleared");
    Ok(())
}
