//! Shared harness for the end-to-end scenarios in `tests/`.
//!
//! Every scenario runs the real client stack (`reqwest`, session, stores,
//! checkout) against a `mockito` server standing in for the REST API, with
//! a [`DeferredGateway`] standing in for the payment SDK.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p voltcart-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;

use mockito::{Matcher, Mock, ServerGuard};
use parking_lot::Mutex;
use serde_json::{Value, json};
use voltcart_storefront::checkout::{
    CallbackHandler, GatewayError, GatewayEvent, GatewayOptions, PaymentGateway,
};
use voltcart_storefront::session::MemoryCredentialStore;
use voltcart_storefront::types::PaymentProof;
use voltcart_storefront::{ApiClient, ApiConfig, SessionHandle, Stores};

/// Bearer credential used by signed-in scenarios.
pub const TOKEN: &str = "test-token";

/// A mock API plus a client stack pointed at it.
pub struct Shop {
    pub server: ServerGuard,
    pub api: ApiClient,
    pub stores: Stores,
}

impl Shop {
    /// A shop whose session starts with no stored credential.
    pub async fn anonymous() -> Self {
        Self::with_session(SessionHandle::in_memory()).await
    }

    /// A shop whose stored credential rehydrates into [`customer`].
    pub async fn signed_in() -> Self {
        let mut shop = Self::with_stored_credential().await;
        shop.server
            .mock("GET", "/api/users/profile")
            .match_header("authorization", format!("Bearer {TOKEN}").as_str())
            .with_status(200)
            .with_body(json!({ "user": customer() }).to_string())
            .create_async()
            .await;
        shop.stores.auth.init().await.unwrap();
        shop
    }

    /// A shop with a stored credential that has not been rehydrated yet.
    pub async fn with_stored_credential() -> Self {
        let session = SessionHandle::open(MemoryCredentialStore::with_credential(TOKEN)).unwrap();
        Self::with_session(session).await
    }

    async fn with_session(session: SessionHandle) -> Self {
        let server = mockito::Server::new_async().await;
        let config = ApiConfig::new(&format!("{}/api", server.url())).unwrap();
        let api = ApiClient::new(&config, session).unwrap();
        let stores = Stores::new(&api);
        Self {
            server,
            api,
            stores,
        }
    }

    /// Serve `lines` from `GET /cart` and load them into the cart cache.
    pub async fn seed_cart(&mut self, lines: Value) {
        self.server
            .mock("GET", "/api/cart")
            .with_status(200)
            .with_body(json!({ "items": lines }).to_string())
            .create_async()
            .await;
        self.stores.cart.fetch().await.unwrap();
    }

    /// Serve `addresses` from `GET /users/addresses` and load them.
    pub async fn seed_addresses(&mut self, addresses: Value) {
        self.server
            .mock("GET", "/api/users/addresses")
            .with_status(200)
            .with_body(addresses.to_string())
            .create_async()
            .await;
        self.stores.addresses.fetch().await.unwrap();
    }

    /// Order creation and payment intent for order `o1`.
    pub async fn mock_order_and_intent(&mut self) -> (Mock, Mock) {
        let order = self
            .server
            .mock("POST", "/api/orders")
            .match_body(Matcher::PartialJson(json!({ "fromCart": true })))
            .with_status(201)
            .with_body(order("o1", false).to_string())
            .create_async()
            .await;
        let intent = self
            .server
            .mock("POST", "/api/payments/create-order")
            .match_body(Matcher::Json(json!({ "orderId": "o1" })))
            .with_status(200)
            .with_body(
                json!({ "orderId": "order_RZP1", "amount": 59_800, "currency": "INR", "key": "rzp_test_key" })
                    .to_string(),
            )
            .create_async()
            .await;
        (order, intent)
    }
}

/// A mocked response the server holds until the test lets it go.
pub struct HeldResponse {
    arrived: tokio::sync::mpsc::UnboundedReceiver<()>,
    release: std::sync::mpsc::Sender<()>,
    _mock: Mock,
}

impl HeldResponse {
    /// Wait until the request has reached the server.
    pub async fn arrived(&mut self) {
        self.arrived.recv().await.unwrap();
    }

    /// Let the server answer.
    pub fn release(&self) {
        self.release.send(()).unwrap();
    }
}

impl Shop {
    /// Answer `method path` with `body`, but only after
    /// [`HeldResponse::release`]. Needs a multi-threaded runtime, since the
    /// mock blocks while it waits.
    pub async fn hold(&mut self, method: &str, path: &str, body: Value) -> HeldResponse {
        let (arrived_tx, arrived) = tokio::sync::mpsc::unbounded_channel();
        let (release, held) = std::sync::mpsc::channel::<()>();
        let held = Mutex::new(held);
        let body = body.to_string().into_bytes();
        let mock = self
            .server
            .mock(method, path)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body_from_request(move |_| {
                let _ = arrived_tx.send(());
                let _ = held.lock().recv();
                body.clone()
            })
            .create_async()
            .await;
        HeldResponse {
            arrived,
            release,
            _mock: mock,
        }
    }
}

// =============================================================================
// Fixtures
// =============================================================================

#[must_use]
pub fn customer() -> Value {
    json!({ "_id": "u1", "name": "Asha Rao", "email": "asha@example.com", "role": "user" })
}

#[must_use]
pub fn address(id: &str, is_default: bool) -> Value {
    json!({
        "_id": id,
        "fullName": "Asha Rao",
        "phone": "9800000000",
        "addressLine1": "12 MG Road",
        "city": "Pune",
        "state": "MH",
        "postalCode": "411001",
        "country": "India",
        "isDefault": is_default
    })
}

/// Two cart lines: 2 x ₹99 bulbs and 1 x ₹400 fan regulator.
#[must_use]
pub fn two_lines() -> Value {
    json!([
        { "_id": "c1", "product": { "_id": "p1", "name": "LED Bulb 9W", "price": 99, "stock": 40 }, "quantity": 2 },
        { "_id": "c2", "product": { "_id": "p2", "name": "Fan Regulator", "price": 400, "stock": 5 }, "quantity": 1 }
    ])
}

#[must_use]
pub fn order(id: &str, is_paid: bool) -> Value {
    json!({
        "_id": id,
        "totalPrice": 598,
        "orderStatus": "Pending",
        "isPaid": is_paid,
        "shippingAddress": address("a1", true)
    })
}

#[must_use]
pub fn proof(payment_id: &str) -> PaymentProof {
    PaymentProof {
        gateway_order_id: "order_RZP1".to_string(),
        gateway_payment_id: payment_id.to_string(),
        signature: "signature".to_string(),
    }
}

// =============================================================================
// DeferredGateway
// =============================================================================

/// A payment SDK double that records what it was opened with and hands the
/// callback to the test, which reports the outcome whenever it likes.
#[derive(Clone, Default)]
pub struct DeferredGateway {
    inner: Arc<Mutex<GatewayScript>>,
}

#[derive(Default)]
struct GatewayScript {
    unavailable: bool,
    loads: usize,
    opened: Vec<GatewayOptions>,
    handler: Option<CallbackHandler>,
}

impl DeferredGateway {
    /// A gateway whose SDK never loads.
    #[must_use]
    pub fn unavailable() -> Self {
        let gateway = Self::default();
        gateway.inner.lock().unavailable = true;
        gateway
    }

    #[must_use]
    pub fn loads(&self) -> usize {
        self.inner.lock().loads
    }

    #[must_use]
    pub fn opened(&self) -> Vec<GatewayOptions> {
        self.inner.lock().opened.clone()
    }

    /// Report on the latest attempt. Returns whether the orchestrator was
    /// still listening.
    pub fn report(&self, event: GatewayEvent) -> bool {
        self.inner
            .lock()
            .handler
            .as_ref()
            .is_some_and(|handler| handler.fire(event))
    }

    /// The customer closed the payment UI without paying.
    pub fn dismiss(&self) {
        self.inner.lock().handler = None;
    }
}

impl PaymentGateway for DeferredGateway {
    async fn load(&self) -> Result<(), GatewayError> {
        let mut script = self.inner.lock();
        script.loads += 1;
        if script.unavailable {
            Err(GatewayError::Unavailable("checkout.js blocked".to_string()))
        } else {
            Ok(())
        }
    }

    fn open(&self, options: GatewayOptions, handler: CallbackHandler) -> Result<(), GatewayError> {
        let mut script = self.inner.lock();
        script.opened.push(options);
        script.handler = Some(handler);
        Ok(())
    }
}
