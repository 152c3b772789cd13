//! Checkout form validation.
//!
//! Only presence is checked for card fields. Card number checksums, expiry
//! dates and CVV length are deliberately not enforced here.

use std::collections::BTreeMap;

use leather_shop_core::Email;
use serde::Serialize;

use super::form::{CheckoutForm, Field};

/// Fields that must be non-blank regardless of payment method.
const REQUIRED: [Field; 8] = [
    Field::FirstName,
    Field::LastName,
    Field::Email,
    Field::Address,
    Field::City,
    Field::Zip,
    Field::State,
    Field::Country,
];

/// Fields that must be non-blank when paying by card.
const CARD_REQUIRED: [Field; 4] = [
    Field::CardNumber,
    Field::CardName,
    Field::ExpiryDate,
    Field::Cvv,
];

/// Per-field error messages, ordered as the form is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    /// True iff the form is valid.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Message for `field`, if it has an error.
    #[must_use]
    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    /// Whether `field` has an error.
    #[must_use]
    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    /// Errors in form order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(field, msg)| (*field, msg.as_str()))
    }

    fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub(crate) fn remove(&mut self, field: Field) {
        self.0.remove(&field);
    }
}

fn required_message(field: Field) -> &'static str {
    match field {
        Field::FirstName => "First name is required",
        Field::LastName => "Last name is required",
        Field::Email => "Email is required",
        Field::Address => "Address is required",
        Field::City => "City is required",
        Field::Zip => "ZIP code is required",
        Field::State => "State is required",
        Field::Country => "Country is required",
        Field::CardNumber => "Card number is required",
        Field::CardName => "Name on card is required",
        Field::ExpiryDate => "Expiry date is required",
        Field::Cvv => "CVV is required",
        Field::Phone | Field::PaymentMethod | Field::TermsAccepted => "This field is required",
    }
}

/// Validate `form`. An empty result means the form may be submitted.
#[must_use]
pub fn validate(form: &CheckoutForm) -> FieldErrors {
    let mut errors = FieldErrors::default();

    let card_fields = if form.payment_method.requires_card() {
        CARD_REQUIRED.as_slice()
    } else {
        &[]
    };

    for field in REQUIRED.iter().chain(card_fields) {
        let blank = form.text(*field).is_none_or(|v| v.trim().is_empty());
        if blank {
            errors.insert(*field, required_message(*field));
        }
    }

    if !errors.contains(Field::Email) && Email::parse(form.email.trim()).is_err() {
        errors.insert(Field::Email, "Please enter a valid email address");
    }

    if !form.terms_accepted {
        errors.insert(
            Field::TermsAccepted,
            "You must accept the terms and conditions",
        );
    }

    errors
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use leather_shop_core::PaymentMethod;

    use super::*;

    pub(crate) fn complete_form() -> CheckoutForm {
        CheckoutForm {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: String::new(),
            address: "1 Analytical Way".to_string(),
            city: "Beverly Hills".to_string(),
            zip: "90210".to_string(),
            state: "California".to_string(),
            country: "United States".to_string(),
            payment_method: PaymentMethod::CreditCard,
            card_number: "4111111111111111".to_string(),
            card_name: "Ada Lovelace".to_string(),
            expiry_date: "12/29".to_string(),
            cvv: "123".to_string(),
            terms_accepted: true,
        }
    }

    #[test]
    fn test_complete_form_is_valid() {
        assert!(validate(&complete_form()).is_empty());
    }

    #[test]
    fn test_empty_form_flags_every_required_field() {
        let errors = validate(&CheckoutForm::default());

        let flagged: Vec<Field> = errors.iter().map(|(f, _)| f).collect();
        assert_eq!(
            flagged,
            vec![
                Field::FirstName,
                Field::LastName,
                Field::Email,
                Field::Address,
                Field::City,
                Field::Zip,
                Field::State,
                Field::Country,
                Field::CardNumber,
                Field::CardName,
                Field::ExpiryDate,
                Field::Cvv,
                Field::TermsAccepted,
            ]
        );
        assert_eq!(errors.get(Field::Email), Some("Email is required"));
        assert!(!errors.contains(Field::Phone));
    }

    #[test]
    fn test_whitespace_counts_as_blank() {
        let form = CheckoutForm {
            city: "   ".to_string(),
            ..complete_form()
        };
        assert_eq!(validate(&form).get(Field::City), Some("City is required"));
    }

    #[test]
    fn test_malformed_email() {
        for email in ["ada", "ada@example", "ada @example.com", "@example.com"] {
            let form = CheckoutForm {
                email: email.to_string(),
                ..complete_form()
            };
            assert_eq!(
                validate(&form).get(Field::Email),
                Some("Please enter a valid email address"),
                "{email}"
            );
        }
    }

    #[test]
    fn test_terms_must_be_accepted() {
        let form = CheckoutForm {
            terms_accepted: false,
            ..complete_form()
        };
        let errors = validate(&form);
        assert_eq!(errors.len(), 1);
        assert!(errors.contains(Field::TermsAccepted));
    }

    #[test]
    fn test_card_fields_only_required_for_credit_card() {
        let form = CheckoutForm {
            payment_method: PaymentMethod::Paypal,
            card_number: String::new(),
            card_name: String::new(),
            expiry_date: String::new(),
            cvv: String::new(),
            ..complete_form()
        };
        assert!(validate(&form).is_empty());

        let form = CheckoutForm {
            payment_method: PaymentMethod::CreditCard,
            ..form
        };
        assert_eq!(validate(&form).len(), 4);
    }

    #[test]
    fn test_card_contents_are_not_checked() {
        let form = CheckoutForm {
            card_number: "1234".to_string(),
            expiry_date: "13/99".to_string(),
            cvv: "1".to_string(),
            ..complete_form()
        };
        assert!(validate(&form).is_empty());
    }

    #[test]
    fn test_errors_serialize_by_field_name() {
        let form = CheckoutForm {
            first_name: String::new(),
            ..complete_form()
        };
        let json = serde_json::to_string(&validate(&form)).unwrap();
        assert_eq!(json, r#"{"firstName":"First name is required"}"#);
    }
}
