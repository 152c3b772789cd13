//! Order Submission boundary.
//!
//! Checkout hands a validated [`OrderRequest`] to an injected [`OrderPlacer`]
//! and gets back an explicit success or failure. Two placers ship with the
//! crate:
//!
//! - [`HttpOrderPlacer`] - POSTs to the order backend
//! - [`SimulatedOrderPlacer`] - offline stand-in that always accepts

mod http;
mod simulated;

pub use http::HttpOrderPlacer;
pub use simulated::SimulatedOrderPlacer;

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use leather_shop_core::PaymentMethod;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::CartLineItem;
use crate::checkout::{CheckoutForm, OrderSummary};

/// Errors returned by an order placer.
#[derive(Debug, Error)]
pub enum OrderError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend refused the order.
    #[error("Order rejected: {status} - {message}")]
    Rejected { status: u16, message: String },

    /// Backend asked us to slow down.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Backend response could not be decoded.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl OrderError {
    /// Message suitable for showing at the top of the checkout form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { status, message } if (400..500).contains(status) => {
                format!("Your order could not be placed: {message}")
            }
            Self::RateLimited(secs) => {
                format!("Too many attempts. Please try again in {secs} seconds.")
            }
            _ => "We couldn't place your order right now. Please try again.".to_string(),
        }
    }
}

/// Contact block of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

/// Shipping address block of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInfo {
    pub address: String,
    pub city: String,
    pub zip: String,
    pub state: String,
    pub country: String,
}

/// Payment block of an order.
///
/// Only the last four card digits leave the checkout; the CVV never does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    pub method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_last4: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
}

/// Payload handed to the order placer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub contact_info: ContactInfo,
    pub address_info: AddressInfo,
    pub payment_info: PaymentInfo,
    pub line_items: Vec<CartLineItem>,
    pub summary: OrderSummary,
}

impl OrderRequest {
    /// Snapshot a (validated) form together with its line items and summary.
    #[must_use]
    pub fn new(form: &CheckoutForm, line_items: Vec<CartLineItem>, summary: OrderSummary) -> Self {
        let trimmed = |s: &str| s.trim().to_string();

        let payment_info = if form.payment_method.requires_card() {
            let digits: String = form
                .card_number
                .chars()
                .filter(char::is_ascii_digit)
                .collect();
            let last4: String = digits.chars().skip(digits.len().saturating_sub(4)).collect();
            PaymentInfo {
                method: form.payment_method,
                card_last4: Some(last4),
                card_name: Some(trimmed(&form.card_name)),
                expiry_date: Some(trimmed(&form.expiry_date)),
            }
        } else {
            PaymentInfo {
                method: form.payment_method,
                card_last4: None,
                card_name: None,
                expiry_date: None,
            }
        };

        Self {
            contact_info: ContactInfo {
                first_name: trimmed(&form.first_name),
                last_name: trimmed(&form.last_name),
                email: trimmed(&form.email),
                phone: trimmed(&form.phone),
            },
            address_info: AddressInfo {
                address: trimmed(&form.address),
                city: trimmed(&form.city),
                zip: trimmed(&form.zip),
                state: trimmed(&form.state),
                country: trimmed(&form.country),
            },
            payment_info,
            line_items,
            summary,
        }
    }
}

/// Backend acknowledgement of a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmation {
    pub order_id: String,
    pub placed_at: DateTime<Utc>,
}

/// Something that can place an order.
pub trait OrderPlacer: Send + Sync {
    /// Place `order`, returning the backend's confirmation.
    fn place(
        &self,
        order: &OrderRequest,
    ) -> impl Future<Output = Result<OrderConfirmation, OrderError>> + Send;
}

impl<T: OrderPlacer> OrderPlacer for Arc<T> {
    fn place(
        &self,
        order: &OrderRequest,
    ) -> impl Future<Output = Result<OrderConfirmation, OrderError>> + Send {
        self.as_ref().place(order)
    }
}
