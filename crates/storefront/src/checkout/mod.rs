//! Checkout Derivation & Validation Engine.
//!
//! A [`CheckoutSession`] owns the form and moves through an explicit phase
//! machine:
//!
//! ```text
//! Editing ──begin_submit──▶ Submitting ──finish_submit──▶ Success
//!    ▲                          │
//!    └── invalid / failed / cancelled
//! ```
//!
//! Submission is split in three so the double-submit guard is visible:
//! [`CheckoutSession::begin_submit`] validates and snapshots the order,
//! [`PendingOrder::dispatch`] waits out the processing delay and calls the
//! placer, and [`CheckoutSession::finish_submit`] applies the outcome.
//! [`CheckoutSession::submit`] runs all three.

mod form;
mod highlight;
mod summary;
mod validate;

pub use form::{CheckoutForm, Field, FormError};
pub use highlight::{AUTOFILL_HIGHLIGHT, AutofillHighlight};
pub use summary::{OrderSummary, TAX_RATE, derive_summary};
pub use validate::{FieldErrors, validate};

use std::time::{Duration, Instant};

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::cart::CartError;
use crate::error::add_breadcrumb;
use crate::orders::{OrderConfirmation, OrderError, OrderPlacer, OrderRequest};
use crate::state::Storefront;

/// Processing delay before an order is handed to the placer.
pub const DEFAULT_SUBMIT_DELAY: Duration = Duration::from_millis(1500);

const EMPTY_CART_MESSAGE: &str = "Your cart is empty.";

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The form has field errors; nothing was submitted.
    #[error("Checkout form has {} invalid field(s)", .0.len())]
    Invalid(FieldErrors),

    /// A submission is already in flight.
    #[error("An order is already being submitted")]
    AlreadySubmitting,

    /// This session already placed its order.
    #[error("Order already placed")]
    AlreadyPlaced,

    /// `finish_submit` called without a submission in flight.
    #[error("No order is being submitted")]
    NotSubmitting,

    /// Nothing to order.
    #[error("Cart is empty")]
    EmptyCart,

    /// Submission was cancelled before the order was placed.
    #[error("Order submission cancelled")]
    Cancelled,

    #[error("Form error: {0}")]
    Form(#[from] FormError),

    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),
}

/// Where a checkout session is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutPhase {
    /// The user is filling in the form. Carries the last validation result
    /// and, after a failed submission, a top-level message.
    Editing {
        errors: FieldErrors,
        submission_error: Option<String>,
    },
    /// An order is in flight.
    Submitting,
    /// The order was placed.
    Success(OrderConfirmation),
}

impl Default for CheckoutPhase {
    fn default() -> Self {
        Self::Editing {
            errors: FieldErrors::default(),
            submission_error: None,
        }
    }
}

/// Result of dispatching a [`PendingOrder`].
#[derive(Debug)]
pub enum SubmissionOutcome {
    Placed(OrderConfirmation),
    Failed(OrderError),
    Cancelled,
}

/// A validated order snapshot waiting to be dispatched.
#[derive(Debug, Clone)]
pub struct PendingOrder {
    request: OrderRequest,
    delay: Duration,
}

impl PendingOrder {
    /// The order that will be placed.
    #[must_use]
    pub const fn request(&self) -> &OrderRequest {
        &self.request
    }

    /// Wait out the processing delay, then place the order.
    ///
    /// Cancelling `cancel` during the delay abandons the order without
    /// calling the placer. Once the placer has been called the request runs
    /// to completion.
    pub async fn dispatch<P: OrderPlacer>(
        self,
        placer: &P,
        cancel: &CancellationToken,
    ) -> SubmissionOutcome {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return SubmissionOutcome::Cancelled,
            () = tokio::time::sleep(self.delay) => {}
        }

        match placer.place(&self.request).await {
            Ok(confirmation) => SubmissionOutcome::Placed(confirmation),
            Err(e) => SubmissionOutcome::Failed(e),
        }
    }
}

/// Puts a session back into `Editing` if a submission is abandoned mid-flight.
struct SubmittingGuard<'a> {
    phase: &'a mut CheckoutPhase,
    armed: bool,
}

impl<'a> SubmittingGuard<'a> {
    const fn new(phase: &'a mut CheckoutPhase) -> Self {
        Self { phase, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        if self.armed && matches!(self.phase, CheckoutPhase::Submitting) {
            warn!("Order submission abandoned");
            *self.phase = CheckoutPhase::default();
        }
    }
}

/// One user's pass through checkout.
pub struct CheckoutSession<P> {
    storefront: Storefront,
    placer: P,
    form: CheckoutForm,
    phase: CheckoutPhase,
    submit_delay: Duration,
    highlight: AutofillHighlight,
}

impl<P: OrderPlacer> CheckoutSession<P> {
    /// Start a session with an empty form.
    #[must_use]
    pub fn new(storefront: Storefront, placer: P) -> Self {
        let submit_delay = storefront.submit_delay();
        Self {
            storefront,
            placer,
            form: CheckoutForm::default(),
            phase: CheckoutPhase::default(),
            submit_delay,
            highlight: AutofillHighlight::default(),
        }
    }

    /// Override the processing delay.
    #[must_use]
    pub const fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = delay;
        self
    }

    #[must_use]
    pub const fn form(&self) -> &CheckoutForm {
        &self.form
    }

    #[must_use]
    pub const fn phase(&self) -> &CheckoutPhase {
        &self.phase
    }

    #[must_use]
    pub const fn placer(&self) -> &P {
        &self.placer
    }

    #[must_use]
    pub const fn highlight(&self) -> &AutofillHighlight {
        &self.highlight
    }

    /// Field errors from the last submit attempt, if editing.
    #[must_use]
    pub const fn errors(&self) -> Option<&FieldErrors> {
        match &self.phase {
            CheckoutPhase::Editing { errors, .. } => Some(errors),
            _ => None,
        }
    }

    /// Whether the submit control should be disabled.
    #[must_use]
    pub const fn is_submitting(&self) -> bool {
        matches!(self.phase, CheckoutPhase::Submitting)
    }

    /// Order summary over the cart as it is now.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Cart` if the cart or catalog cannot be read.
    pub fn summary(&self) -> Result<OrderSummary, CheckoutError> {
        let items = self.storefront.reconciler().materialize()?;
        derive_summary(&items).map_err(CheckoutError::from)
    }

    /// Apply a user edit.
    ///
    /// A complete zip that the locator knows overwrites `state` and `country`,
    /// even if the user already typed something else there. Returns the
    /// fields that were autofilled, which are also highlighted.
    ///
    /// # Errors
    ///
    /// Returns `FormError` if the value does not parse for a typed field.
    pub fn on_field_change(&mut self, field: Field, value: &str) -> Result<Vec<Field>, FormError> {
        self.form.set(field, value)?;

        if let CheckoutPhase::Editing { errors, .. } = &mut self.phase {
            errors.remove(field);
        }

        if field != Field::Zip {
            return Ok(Vec::new());
        }

        let Some(location) = self.storefront.zip().autofill(value) else {
            return Ok(Vec::new());
        };
        self.form.state.clone_from(&location.state);
        self.form.country.clone_from(&location.country);

        let filled = vec![Field::State, Field::Country];
        if let CheckoutPhase::Editing { errors, .. } = &mut self.phase {
            for f in &filled {
                errors.remove(*f);
            }
        }
        self.highlight.start(Instant::now(), &filled);
        Ok(filled)
    }

    /// Validate and snapshot the order, moving to `Submitting`.
    ///
    /// # Errors
    ///
    /// - `AlreadySubmitting` / `AlreadyPlaced` if not editing
    /// - `Invalid` with the field errors (phase stays `Editing`)
    /// - `EmptyCart` if no line items survive reconciliation
    /// - `Cart` if the cart or catalog cannot be read
    #[instrument(skip(self))]
    pub fn begin_submit(&mut self) -> Result<PendingOrder, CheckoutError> {
        match self.phase {
            CheckoutPhase::Submitting => return Err(CheckoutError::AlreadySubmitting),
            CheckoutPhase::Success(_) => return Err(CheckoutError::AlreadyPlaced),
            CheckoutPhase::Editing { .. } => {}
        }

        let errors = validate(&self.form);
        if !errors.is_empty() {
            info!(invalid_fields = errors.len(), "Checkout form rejected");
            self.phase = CheckoutPhase::Editing {
                errors: errors.clone(),
                submission_error: None,
            };
            return Err(CheckoutError::Invalid(errors));
        }

        let items = self.storefront.reconciler().materialize()?;
        if items.is_empty() {
            self.phase = CheckoutPhase::Editing {
                errors: FieldErrors::default(),
                submission_error: Some(EMPTY_CART_MESSAGE.to_string()),
            };
            return Err(CheckoutError::EmptyCart);
        }

        let summary = derive_summary(&items)?;
        let total = summary.total.to_string();
        add_breadcrumb("checkout", "Order submitted", Some(&[("total", total.as_str())]));
        info!(line_items = items.len(), %total, "Submitting order");

        self.phase = CheckoutPhase::Submitting;
        Ok(PendingOrder {
            request: OrderRequest::new(&self.form, items, summary),
            delay: self.submit_delay,
        })
    }

    /// Apply a dispatch outcome.
    ///
    /// On success the cart is cleared and the form reset; a failure to clear
    /// the cart is logged but does not undo the placed order. On failure or
    /// cancellation the session returns to `Editing` with the form intact.
    ///
    /// # Errors
    ///
    /// Returns `NotSubmitting` if no submission is in flight, `Order` if the
    /// placer failed, or `Cancelled`.
    #[instrument(skip(self, outcome))]
    pub fn finish_submit(
        &mut self,
        outcome: SubmissionOutcome,
    ) -> Result<OrderConfirmation, CheckoutError> {
        if !self.is_submitting() {
            return Err(CheckoutError::NotSubmitting);
        }

        match outcome {
            SubmissionOutcome::Placed(confirmation) => {
                if let Err(e) = self.storefront.cart().clear() {
                    error!(error = %e, order_id = %confirmation.order_id, "Failed to clear cart after order");
                }
                self.form = CheckoutForm::default();
                self.highlight.clear();
                self.phase = CheckoutPhase::Success(confirmation.clone());

                add_breadcrumb(
                    "checkout",
                    "Order placed",
                    Some(&[("order_id", confirmation.order_id.as_str())]),
                );
                info!(order_id = %confirmation.order_id, "Order placed");
                Ok(confirmation)
            }
            SubmissionOutcome::Failed(e) => {
                warn!(error = %e, "Order placement failed");
                self.phase = CheckoutPhase::Editing {
                    errors: FieldErrors::default(),
                    submission_error: Some(e.user_message()),
                };
                Err(CheckoutError::Order(e))
            }
            SubmissionOutcome::Cancelled => {
                info!("Order submission cancelled");
                self.phase = CheckoutPhase::default();
                Err(CheckoutError::Cancelled)
            }
        }
    }

    /// Validate, wait, place and apply the outcome.
    ///
    /// If the returned future is dropped before it completes, the session goes
    /// back to `Editing` with the form intact, as if the submission had been
    /// cancelled.
    ///
    /// # Errors
    ///
    /// Any error from [`Self::begin_submit`] or [`Self::finish_submit`].
    pub async fn submit(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<OrderConfirmation, CheckoutError> {
        let pending = self.begin_submit()?;
        let guard = SubmittingGuard::new(&mut self.phase);
        let outcome = pending.dispatch(&self.placer, cancel).await;
        guard.disarm();
        self.finish_submit(outcome)
    }

    /// Start over with an empty form, e.g. after a successful order.
    pub fn reset(&mut self) {
        self.form = CheckoutForm::default();
        self.phase = CheckoutPhase::default();
        self.highlight.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Utc;
    use leather_shop_core::{PaymentMethod, ProductId};
    use rust_decimal::Decimal;

    use super::validate::tests::complete_form;
    use super::*;
    use crate::catalog::tests::{DOCUMENT, StaticSource};
    use crate::orders::SimulatedOrderPlacer;
    use crate::storage::MemoryStore;
    use crate::zip::ZipLocator;

    /// Placer that counts calls and fails when told to.
    #[derive(Default)]
    struct TestPlacer {
        calls: AtomicUsize,
        reject: bool,
    }

    impl OrderPlacer for TestPlacer {
        async fn place(&self, _order: &OrderRequest) -> Result<OrderConfirmation, OrderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.reject {
                return Err(OrderError::Rejected {
                    status: 422,
                    message: "card declined".to_string(),
                });
            }
            Ok(OrderConfirmation {
                order_id: "LS-TEST".to_string(),
                placed_at: Utc::now(),
            })
        }
    }

    async fn storefront() -> Storefront {
        let storefront = Storefront::new(Arc::new(MemoryStore::new()), ZipLocator::default());
        storefront
            .catalog()
            .load(&StaticSource::new(DOCUMENT))
            .await
            .unwrap();
        storefront
    }

    async fn session_with(placer: TestPlacer) -> CheckoutSession<TestPlacer> {
        let storefront = storefront().await;
        storefront.cart().add(ProductId::new(1), "M", 2).unwrap();

        let mut session =
            CheckoutSession::new(storefront, placer).with_submit_delay(Duration::ZERO);
        for (field, value) in complete_form().entries() {
            session.on_field_change(field, &value).unwrap();
        }
        session
    }

    #[tokio::test]
    async fn test_zip_autofills_state_and_country() {
        let mut session = CheckoutSession::new(storefront().await, SimulatedOrderPlacer);

        let filled = session.on_field_change(Field::Zip, "90210").unwrap();
        assert_eq!(filled, vec![Field::State, Field::Country]);
        assert_eq!(session.form().state, "California");
        assert_eq!(session.form().country, "United States");
        assert!(session.highlight().is_active(Field::State, Instant::now()));
    }

    #[tokio::test]
    async fn test_partial_zip_does_not_autofill() {
        let mut session = CheckoutSession::new(storefront().await, SimulatedOrderPlacer);

        assert!(session.on_field_change(Field::Zip, "9021").unwrap().is_empty());
        assert!(session.form().state.is_empty());
        assert!(session.form().country.is_empty());
    }

    #[tokio::test]
    async fn test_zip_overwrites_manual_state() {
        let mut session = CheckoutSession::new(storefront().await, SimulatedOrderPlacer);
        session.on_field_change(Field::State, "Oregon").unwrap();
        session.on_field_change(Field::Country, "Canada").unwrap();

        session.on_field_change(Field::Zip, "10001").unwrap();
        assert_eq!(session.form().state, "New York");
        assert_eq!(session.form().country, "United States");
    }

    #[tokio::test]
    async fn test_summary_for_two_jackets() {
        let session = session_with(TestPlacer::default()).await;
        let summary = session.summary().unwrap();

        assert_eq!(summary.subtotal, Decimal::new(200, 0));
        assert_eq!(summary.tax, Decimal::new(20, 0));
        assert_eq!(summary.total, Decimal::new(220, 0));
    }

    #[tokio::test]
    async fn test_invalid_form_is_not_submitted() {
        let mut session = CheckoutSession::new(storefront().await, TestPlacer::default());
        session.on_field_change(Field::FirstName, "Ada").unwrap();

        let err = session.submit(&CancellationToken::new()).await.unwrap_err();
        let CheckoutError::Invalid(errors) = err else {
            panic!("expected field errors, got {err:?}");
        };
        assert!(errors.contains(Field::LastName));
        assert!(!errors.contains(Field::FirstName));
        assert_eq!(session.errors(), Some(&errors));
        assert_eq!(session.placer().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_editing_clears_field_error() {
        let mut session = CheckoutSession::new(storefront().await, TestPlacer::default());
        assert!(session.begin_submit().is_err());
        assert!(session.errors().unwrap().contains(Field::City));

        session.on_field_change(Field::City, "Austin").unwrap();
        assert!(!session.errors().unwrap().contains(Field::City));
    }

    #[tokio::test]
    async fn test_successful_submit_clears_cart_and_form() {
        let mut session = session_with(TestPlacer::default()).await;

        let confirmation = session.submit(&CancellationToken::new()).await.unwrap();
        assert_eq!(confirmation.order_id, "LS-TEST");
        assert_eq!(session.phase(), &CheckoutPhase::Success(confirmation));
        assert_eq!(session.form(), &CheckoutForm::default());
        assert!(session.storefront.cart().is_empty().unwrap());
        assert_eq!(session.placer().calls.load(Ordering::SeqCst), 1);

        assert!(matches!(
            session.begin_submit(),
            Err(CheckoutError::AlreadyPlaced)
        ));
    }

    #[tokio::test]
    async fn test_pending_order_snapshot() {
        let mut session = session_with(TestPlacer::default()).await;
        let pending = session.begin_submit().unwrap();

        let request = pending.request();
        assert_eq!(request.line_items.len(), 1);
        assert_eq!(request.summary.total, Decimal::new(220, 0));
        assert_eq!(request.payment_info.method, PaymentMethod::CreditCard);
        assert_eq!(request.payment_info.card_last4.as_deref(), Some("1111"));
    }

    #[tokio::test]
    async fn test_double_submit_is_refused() {
        let mut session = session_with(TestPlacer::default()).await;

        let pending = session.begin_submit().unwrap();
        assert!(session.is_submitting());
        assert!(matches!(
            session.begin_submit(),
            Err(CheckoutError::AlreadySubmitting)
        ));

        let outcome = pending
            .dispatch(session.placer(), &CancellationToken::new())
            .await;
        session.finish_submit(outcome).unwrap();
        assert_eq!(session.placer().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_during_delay_places_nothing() {
        let mut session = session_with(TestPlacer::default())
            .await
            .with_submit_delay(Duration::from_secs(60));

        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(matches!(
            session.submit(&cancel).await,
            Err(CheckoutError::Cancelled)
        ));
        assert_eq!(session.phase(), &CheckoutPhase::default());
        assert_eq!(session.placer().calls.load(Ordering::SeqCst), 0);
        assert!(!session.storefront.cart().is_empty().unwrap());
        assert_eq!(session.form().first_name, "Ada");
    }

    #[tokio::test]
    async fn test_dropped_submit_returns_to_editing() {
        let mut session = session_with(TestPlacer::default())
            .await
            .with_submit_delay(Duration::from_secs(60));

        let cancel = CancellationToken::new();
        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), session.submit(&cancel)).await;
        assert!(timed_out.is_err());

        assert_eq!(session.phase(), &CheckoutPhase::default());
        assert_eq!(session.placer().calls.load(Ordering::SeqCst), 0);
        assert_eq!(session.form().first_name, "Ada");

        // A fresh attempt goes through.
        let mut session = session.with_submit_delay(Duration::ZERO);
        assert!(session.submit(&cancel).await.is_ok());
        assert_eq!(session.placer().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejected_order_returns_to_editing() {
        let mut session = session_with(TestPlacer {
            reject: true,
            ..TestPlacer::default()
        })
        .await;

        assert!(matches!(
            session.submit(&CancellationToken::new()).await,
            Err(CheckoutError::Order(OrderError::Rejected { .. }))
        ));
        assert_eq!(
            session.phase(),
            &CheckoutPhase::Editing {
                errors: FieldErrors::default(),
                submission_error: Some("Your order could not be placed: card declined".to_string()),
            }
        );
        assert_eq!(session.storefront.cart().item_count().unwrap(), 2);

        // The form is intact so the user can retry.
        assert!(session.begin_submit().is_ok());
    }

    #[tokio::test]
    async fn test_empty_cart_is_refused() {
        let mut session = CheckoutSession::new(storefront().await, TestPlacer::default());
        for (field, value) in complete_form().entries() {
            session.on_field_change(field, &value).unwrap();
        }

        assert!(matches!(
            session.begin_submit(),
            Err(CheckoutError::EmptyCart)
        ));
        assert!(!session.is_submitting());
    }

    #[tokio::test]
    async fn test_finish_without_begin() {
        let mut session = CheckoutSession::new(storefront().await, TestPlacer::default());
        assert!(matches!(
            session.finish_submit(SubmissionOutcome::Cancelled),
            Err(CheckoutError::NotSubmitting)
        ));
    }

    #[tokio::test]
    async fn test_reset_after_success() {
        let mut session = session_with(TestPlacer::default()).await;
        session.submit(&CancellationToken::new()).await.unwrap();

        session.reset();
        assert_eq!(session.phase(), &CheckoutPhase::default());
    }
}
