//! Order backend client.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use tracing::{error, info, instrument};

use super::{OrderConfirmation, OrderError, OrderPlacer, OrderRequest};
use crate::config::OrderApiConfig;

/// Places orders by POSTing JSON to `{base_url}/orders`.
#[derive(Clone)]
pub struct HttpOrderPlacer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpOrderPlacer {
    /// Create a new order API client.
    ///
    /// # Errors
    ///
    /// Returns error if the token is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &OrderApiConfig) -> Result<Self, OrderError> {
        let mut headers = HeaderMap::new();

        let mut auth_value =
            HeaderValue::from_str(&format!("Bearer {}", config.token.expose_secret()))
                .map_err(|e| OrderError::Parse(format!("Invalid API token format: {e}")))?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(15))
            .build()?;

        let endpoint = format!("{}/orders", config.base_url.as_str().trim_end_matches('/'));

        Ok(Self { client, endpoint })
    }

    /// URL orders are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl OrderPlacer for HttpOrderPlacer {
    #[instrument(skip(self, order), fields(items = order.line_items.len()))]
    async fn place(&self, order: &OrderRequest) -> Result<OrderConfirmation, OrderError> {
        let response = self.client.post(&self.endpoint).json(order).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(OrderError::RateLimited(retry_after));
        }

        let body = response.text().await?;

        if !status.is_success() {
            error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Order API returned non-success status"
            );
            return Err(OrderError::Rejected {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let confirmation: OrderConfirmation = serde_json::from_str(&body).map_err(|e| {
            error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse order confirmation"
            );
            OrderError::Parse(e.to_string())
        })?;

        info!(order_id = %confirmation.order_id, "Order placed");
        Ok(confirmation)
    }
}
