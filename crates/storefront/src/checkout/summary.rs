//! Order summary derivation.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::cart::{CartError, CartLineItem};

/// Flat sales tax rate applied to the subtotal (10%).
pub const TAX_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Money totals for an order.
///
/// Shipping is always free.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

impl OrderSummary {
    /// All-zero summary for an empty cart.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            subtotal: Decimal::ZERO,
            tax: Decimal::ZERO,
            shipping: Decimal::ZERO,
            total: Decimal::ZERO,
        }
    }
}

/// Derive subtotal, tax, shipping and total from reconciled line items.
///
/// Tax is rounded to cents, half away from zero, before it is added to the
/// total so the displayed figures always sum.
///
/// # Errors
///
/// Returns `CartError::AmountOverflow` if any amount is too large to
/// represent.
pub fn derive_summary(items: &[CartLineItem]) -> Result<OrderSummary, CartError> {
    let subtotal = crate::cart::subtotal(items)?;
    let tax = subtotal
        .checked_mul(TAX_RATE)
        .ok_or(CartError::AmountOverflow)?
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let shipping = Decimal::ZERO;
    let total = subtotal
        .checked_add(tax)
        .and_then(|t| t.checked_add(shipping))
        .ok_or(CartError::AmountOverflow)?;
    Ok(OrderSummary {
        subtotal,
        tax,
        shipping,
        total,
    })
}
