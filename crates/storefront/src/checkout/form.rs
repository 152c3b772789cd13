//! Checkout form state.

use std::fmt;

use leather_shop_core::PaymentMethod;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A checkout form field, in form order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    FirstName,
    LastName,
    Email,
    Phone,
    Address,
    City,
    Zip,
    State,
    Country,
    PaymentMethod,
    CardNumber,
    CardName,
    ExpiryDate,
    Cvv,
    TermsAccepted,
}

impl Field {
    /// Every field, in form order.
    pub const ALL: [Self; 15] = [
        Self::FirstName,
        Self::LastName,
        Self::Email,
        Self::Phone,
        Self::Address,
        Self::City,
        Self::Zip,
        Self::State,
        Self::Country,
        Self::PaymentMethod,
        Self::CardNumber,
        Self::CardName,
        Self::ExpiryDate,
        Self::Cvv,
        Self::TermsAccepted,
    ];

    /// Wire name (camelCase).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FirstName => "firstName",
            Self::LastName => "lastName",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Address => "address",
            Self::City => "city",
            Self::Zip => "zip",
            Self::State => "state",
            Self::Country => "country",
            Self::PaymentMethod => "paymentMethod",
            Self::CardNumber => "cardNumber",
            Self::CardName => "cardName",
            Self::ExpiryDate => "expiryDate",
            Self::Cvv => "cvv",
            Self::TermsAccepted => "termsAccepted",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Field {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| FormError::UnknownField(s.to_string()))
    }
}

/// Errors applying a raw value to the form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Unknown checkout field: {0}")]
    UnknownField(String),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: Field, value: String },
}

/// User-entered checkout data.
///
/// Lives for one checkout session and is never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckoutForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub zip: String,
    pub state: String,
    pub country: String,
    pub payment_method: PaymentMethod,
    pub card_number: String,
    pub card_name: String,
    pub expiry_date: String,
    pub cvv: String,
    pub terms_accepted: bool,
}

impl CheckoutForm {
    /// Current text of a free-text field; `None` for `PaymentMethod` and
    /// `TermsAccepted`.
    #[must_use]
    pub fn text(&self, field: Field) -> Option<&str> {
        let value = match field {
            Field::FirstName => &self.first_name,
            Field::LastName => &self.last_name,
            Field::Email => &self.email,
            Field::Phone => &self.phone,
            Field::Address => &self.address,
            Field::City => &self.city,
            Field::Zip => &self.zip,
            Field::State => &self.state,
            Field::Country => &self.country,
            Field::CardNumber => &self.card_number,
            Field::CardName => &self.card_name,
            Field::ExpiryDate => &self.expiry_date,
            Field::Cvv => &self.cvv,
            Field::PaymentMethod | Field::TermsAccepted => return None,
        };
        Some(value)
    }

    /// Apply a raw value to a field.
    ///
    /// `PaymentMethod` takes its wire name (`credit-card`, ...) and
    /// `TermsAccepted` takes `true`/`false`; everything else is stored as-is.
    ///
    /// # Errors
    ///
    /// Returns `FormError::InvalidValue` if `PaymentMethod` or
    /// `TermsAccepted` receive an unparseable value.
    pub fn set(&mut self, field: Field, value: &str) -> Result<(), FormError> {
        let invalid = || FormError::InvalidValue {
            field,
            value: value.to_string(),
        };

        let slot = match field {
            Field::PaymentMethod => {
                self.payment_method = value.parse().map_err(|_| invalid())?;
                return Ok(());
            }
            Field::TermsAccepted => {
                self.terms_accepted = value.parse().map_err(|_| invalid())?;
                return Ok(());
            }
            Field::FirstName => &mut self.first_name,
            Field::LastName => &mut self.last_name,
            Field::Email => &mut self.email,
            Field::Phone => &mut self.phone,
            Field::Address => &mut self.address,
            Field::City => &mut self.city,
            Field::Zip => &mut self.zip,
            Field::State => &mut self.state,
            Field::Country => &mut self.country,
            Field::CardNumber => &mut self.card_number,
            Field::CardName => &mut self.card_name,
            Field::ExpiryDate => &mut self.expiry_date,
            Field::Cvv => &mut self.cvv,
        };
        value.clone_into(slot);
        Ok(())
    }

    /// Every field with a non-default value, as `(field, raw value)` pairs in
    /// form order. Replaying these through [`CheckoutForm::set`] rebuilds the form.
    #[must_use]
    pub fn entries(&self) -> Vec<(Field, String)> {
        Field::ALL
            .into_iter()
            .filter_map(|field| match field {
                Field::PaymentMethod => Some((field, self.payment_method.to_string())),
                Field::TermsAccepted => Some((field, self.terms_accepted.to_string())),
                _ => self
                    .text(field)
                    .filter(|v| !v.is_empty())
                    .map(|v| (field, v.to_string())),
            })
            .collect()
    }
}
