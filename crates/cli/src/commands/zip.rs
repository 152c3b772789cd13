//! Zip lookup command.

use leather_shop_storefront::error::{AppError, Result};

use super::Context;

/// Print the state and country for a zip.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the zip is not in the table.
#[allow(clippy::print_stdout)]
pub fn lookup(ctx: &Context, zip: &str) -> Result<()> {
    let location = ctx
        .storefront
        .zip()
        .lookup(zip)
        .ok_or_else(|| AppError::NotFound(format!("zip {zip}")))?;

    println!("{zip}: {}, {}", location.state, location.country);
    Ok(())
}
