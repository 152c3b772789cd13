//! Offline order placer.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::{OrderConfirmation, OrderError, OrderPlacer, OrderRequest};

/// Accepts every order and issues a random order reference.
///
/// Used when no order backend is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedOrderPlacer;

impl OrderPlacer for SimulatedOrderPlacer {
    async fn place(&self, order: &OrderRequest) -> Result<OrderConfirmation, OrderError> {
        let order_id = format!("LS-{}", Uuid::new_v4().simple()).to_uppercase();
        info!(
            order_id = %order_id,
            total = %order.summary.total,
            "Simulated order placed"
        );
        Ok(OrderConfirmation {
            order_id,
            placed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::checkout::{CheckoutForm, OrderSummary};

    #[tokio::test]
    async fn test_issues_distinct_references() {
        let summary = OrderSummary {
            subtotal: Decimal::ONE,
            tax: Decimal::ZERO,
            shipping: Decimal::ZERO,
            total: Decimal::ONE,
        };
        let request = OrderRequest::new(&CheckoutForm::default(), Vec::new(), summary);

        let a = SimulatedOrderPlacer.place(&request).await.unwrap();
        let b = SimulatedOrderPlacer.place(&request).await.unwrap();

        assert!(a.order_id.starts_with("LS-"));
        assert_ne!(a.order_id, b.order_id);
    }
}
