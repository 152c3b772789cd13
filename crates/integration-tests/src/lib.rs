//! Integration tests for Leather Shop.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p leather-shop-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `checkout_flow` - cart to order through a file-backed storefront
//! - `order_http` - `HttpOrderPlacer` against an in-process order backend
//!
//! Nothing here needs network access or external services.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use leather_shop_core::PaymentMethod;
use leather_shop_storefront::catalog::FileCatalogSource;
use leather_shop_storefront::checkout::{CheckoutForm, CheckoutSession};
use leather_shop_storefront::config::OrderApiConfig;
use leather_shop_storefront::orders::OrderPlacer;
use leather_shop_storefront::state::Storefront;
use leather_shop_storefront::storage::JsonFileStore;
use leather_shop_storefront::zip::ZipLocator;
use secrecy::SecretString;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use url::Url;

/// The sample catalog shipped with the repository.
pub const SAMPLE_CATALOG: &str = include_str!("../../../data/products.json");

/// Bearer token the mock order backend expects.
pub const TEST_TOKEN: &str = "tok_9fK2mQ7xLp4ZbR8wVn3J";

/// A file-backed storefront in a temporary data directory.
///
/// Orders are dispatched without a processing delay.
pub struct TestShop {
    pub storefront: Storefront,
    dir: TempDir,
}

impl TestShop {
    /// Storefront with the sample catalog loaded.
    ///
    /// # Panics
    ///
    /// Panics if the temporary store cannot be created or the catalog fails
    /// to load.
    pub async fn new() -> Self {
        Self::with_catalog(SAMPLE_CATALOG).await
    }

    /// Storefront with `document` as its catalog bootstrap source.
    ///
    /// # Panics
    ///
    /// Panics if the temporary store cannot be created or the catalog fails
    /// to load.
    pub async fn with_catalog(document: &str) -> Self {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        std::fs::write(dir.path().join("products.json"), document)
            .unwrap_or_else(|e| panic!("write catalog: {e}"));

        let shop = Self {
            storefront: open(&dir),
            dir,
        };
        shop.storefront
            .catalog()
            .load(&shop.catalog_source())
            .await
            .unwrap_or_else(|e| panic!("load catalog: {e}"));
        shop
    }

    /// The bootstrap document on disk.
    #[must_use]
    pub fn catalog_path(&self) -> PathBuf {
        self.dir.path().join("products.json")
    }

    #[must_use]
    pub fn catalog_source(&self) -> FileCatalogSource {
        FileCatalogSource::new(self.catalog_path())
    }

    /// A second storefront over the same data directory, as a fresh process
    /// would see it.
    #[must_use]
    pub fn reopen(&self) -> Storefront {
        open(&self.dir)
    }
}

fn open(dir: &TempDir) -> Storefront {
    let store = JsonFileStore::open(dir.path().join("data"))
        .unwrap_or_else(|e| panic!("open store: {e}"));
    Storefront::with_submit_delay(Arc::new(store), ZipLocator::default(), Duration::ZERO)
}

/// A complete, valid card checkout for Beverly Hills. State and country are
/// left blank for the zip to fill in.
#[must_use]
pub fn valid_form() -> CheckoutForm {
    CheckoutForm {
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        phone: "+1 310 555 0100".to_string(),
        address: "1 Analytical Way".to_string(),
        city: "Beverly Hills".to_string(),
        zip: "90210".to_string(),
        payment_method: PaymentMethod::CreditCard,
        card_number: "4111 1111 1111 1111".to_string(),
        card_name: "Ada Lovelace".to_string(),
        expiry_date: "12/29".to_string(),
        cvv: "123".to_string(),
        terms_accepted: true,
        ..CheckoutForm::default()
    }
}

/// Type `form` into `session` field by field.
///
/// # Panics
///
/// Panics if a field value is rejected.
pub fn fill<P: OrderPlacer>(session: &mut CheckoutSession<P>, form: &CheckoutForm) {
    for (field, value) in form.entries() {
        session
            .on_field_change(field, &value)
            .unwrap_or_else(|e| panic!("{field}: {e}"));
    }
}

/// How the mock order backend answers.
#[derive(Debug, Clone)]
pub enum Behaviour {
    /// 201 with a confirmation.
    Accept,
    /// The given status and plain-text body.
    Reject(u16, &'static str),
    /// 429 with `Retry-After`.
    RateLimit(u64),
    /// 200 with a body that is not a confirmation.
    Garbage,
}

/// A request the mock backend received.
#[derive(Debug, Clone)]
pub struct Received {
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct BackendState {
    behaviour: Behaviour,
    received: Arc<Mutex<Vec<Received>>>,
}

/// In-process order backend on an ephemeral port, serving `POST /v1/orders`.
pub struct MockOrderBackend {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<Received>>>,
    handle: JoinHandle<()>,
}

impl MockOrderBackend {
    /// Start the backend.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn spawn(behaviour: Behaviour) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let state = BackendState {
            behaviour,
            received: Arc::clone(&received),
        };
        let app = Router::new()
            .route("/v1/orders", post(create_order))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|e| panic!("bind: {e}"));
        let addr = listener
            .local_addr()
            .unwrap_or_else(|e| panic!("local_addr: {e}"));

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                panic!("mock order backend failed: {e}");
            }
        });

        Self {
            addr,
            received,
            handle,
        }
    }

    /// Order API config pointing at this backend.
    ///
    /// # Panics
    ///
    /// Panics if the address does not form a URL.
    #[must_use]
    pub fn api_config(&self) -> OrderApiConfig {
        OrderApiConfig {
            base_url: Url::parse(&format!("http://{}/v1", self.addr))
                .unwrap_or_else(|e| panic!("url: {e}")),
            token: SecretString::from(TEST_TOKEN),
        }
    }

    /// Requests received so far.
    #[must_use]
    pub fn received(&self) -> Vec<Received> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Drop for MockOrderBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn create_order(
    State(state): State<BackendState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    state
        .received
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(Received {
            authorization,
            body,
        });

    match state.behaviour {
        Behaviour::Accept => (
            StatusCode::CREATED,
            Json(json!({"orderId": "ORD-1001", "placedAt": "2026-01-15T10:30:00Z"})),
        )
            .into_response(),
        Behaviour::Reject(status, message) => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_REQUEST),
            message,
        )
            .into_response(),
        Behaviour::RateLimit(secs) => (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, secs.to_string())],
        )
            .into_response(),
        Behaviour::Garbage => (StatusCode::OK, "<html>maintenance</html>").into_response(),
    }
}
