//! Enumerations shared by the catalog and checkout.

use serde::{Deserialize, Serialize};

/// Merchandising badge shown on a product card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Badge {
    Sale,
    New,
    Bestseller,
    Prime,
}

impl std::fmt::Display for Badge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sale => write!(f, "sale"),
            Self::New => write!(f, "new"),
            Self::Bestseller => write!(f, "bestseller"),
            Self::Prime => write!(f, "prime"),
        }
    }
}

/// Payment method selected on the checkout form.
///
/// Only [`PaymentMethod::CreditCard`] requires the card fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    #[default]
    CreditCard,
    Paypal,
    CashOnDelivery,
}

impl PaymentMethod {
    /// Whether this method collects card details on the form.
    #[must_use]
    pub const fn requires_card(&self) -> bool {
        matches!(self, Self::CreditCard)
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreditCard => write!(f, "credit-card"),
            Self::Paypal => write!(f, "paypal"),
            Self::CashOnDelivery => write!(f, "cash-on-delivery"),
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit-card" => Ok(Self::CreditCard),
            "paypal" => Ok(Self::Paypal),
            "cash-on-delivery" => Ok(Self::CashOnDelivery),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}
