//! Catalog commands.
//!
//! # Usage
//!
//! ```bash
//! shop-cli catalog load
//! shop-cli catalog list --category men
//! shop-cli catalog show 3
//! ```

use leather_shop_core::{Price, ProductId};
use leather_shop_storefront::catalog::{ConfiguredCatalogSource, Product};
use leather_shop_storefront::error::{AppError, Result};
use tracing::info;

use super::Context;

/// Make sure the catalog snapshot exists, fetching it on first use.
///
/// # Errors
///
/// Returns an error if the bootstrap source cannot be fetched or the snapshot
/// cannot be read or written.
pub async fn ensure_loaded(ctx: &Context) -> Result<Vec<Product>> {
    let source = ConfiguredCatalogSource::from_location(&ctx.config.catalog_source)?;
    Ok(ctx.storefront.catalog().load(&source).await?)
}

/// Load the catalog snapshot.
///
/// # Errors
///
/// See [`ensure_loaded`].
pub async fn load(ctx: &Context) -> Result<()> {
    let products = ensure_loaded(ctx).await?;
    info!(
        products = products.len(),
        source = %ctx.config.catalog_source,
        "Catalog ready"
    );
    Ok(())
}

/// List products, optionally restricted to one category.
///
/// # Errors
///
/// See [`ensure_loaded`].
#[allow(clippy::print_stdout)]
pub async fn list(ctx: &Context, category: Option<&str>) -> Result<()> {
    ensure_loaded(ctx).await?;

    let products = match category {
        Some(category) => ctx.storefront.catalog().by_category(category)?,
        None => ctx.storefront.catalog().all()?,
    };

    if products.is_empty() {
        println!("No products found.");
        return Ok(());
    }
    for product in &products {
        println!("{}", list_line(product));
    }
    Ok(())
}

/// Show one product.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the product is not in the catalog.
#[allow(clippy::print_stdout)]
pub async fn show(ctx: &Context, id: ProductId) -> Result<()> {
    ensure_loaded(ctx).await?;

    let product = ctx
        .storefront
        .catalog()
        .get(id)?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    println!("{}", product.title);
    println!("  id:       {}", product.id);
    println!("  price:    {}", Price::usd(product.price).display());
    if let Some(original) = product.original_price {
        println!("  was:      {}", Price::usd(original).display());
    }
    if let Some(pct) = product.discount_percent() {
        println!("  save:     {pct}%");
    }
    println!("  category: {}", product.category);
    if let Some(color) = &product.color {
        println!("  color:    {color}");
    }
    println!("  rating:   {:.1} ({} reviews)", product.rating, product.reviews);
    if let Some(badge) = product.badge {
        println!("  badge:    {badge}");
    }
    println!("  image:    {}", product.image);
    Ok(())
}

fn list_line(product: &Product) -> String {
    let badge = product
        .badge
        .map(|b| format!("  [{b}]"))
        .unwrap_or_default();
    let discount = product
        .discount_percent()
        .map(|pct| format!("  -{pct}%"))
        .unwrap_or_default();
    format!(
        "{:>4}  {:<32} {:>10}  {}{badge}{discount}",
        product.id.as_i32(),
        product.title,
        Price::usd(product.price).display(),
        product.category,
    )
}
