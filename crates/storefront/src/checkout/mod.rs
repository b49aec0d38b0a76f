//! Checkout: cart to confirmed payment.
//!
//! [`CheckoutOrchestrator`] sequences the cart, order and payment calls
//! around a [`PaymentGateway`] and reports exactly one of three outcomes:
//! success, pending or failed. The cart is cleared only on confirmed
//! success.
//!
//! An attempt runs in two halves. [`start`](CheckoutOrchestrator::start)
//! validates, loads the gateway, creates the order and payment intent and
//! opens the gateway UI. [`finish`](CheckoutOrchestrator::finish) waits for
//! the gateway's first callback and verifies it. Dropping the
//! [`AwaitingPayment`] between the two abandons the attempt; the unpaid
//! order stays on the server and can be paid later with
//! [`retry_payment`](CheckoutOrchestrator::retry_payment).

pub mod gateway;
pub mod route;
pub mod state;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{oneshot, watch};
use tracing::{info, instrument, warn};
use voltcart_core::{OrderId, PaymentStatus};

use crate::api::{ApiClient, ApiRequest};
use crate::config::CheckoutConfig;
use crate::error::{self, ApiError};
use crate::stores::{CartStore, OrderStore, Stores};
use crate::types::{Address, CreateOrderInput, Order, PaymentIntent, PaymentProof, Verification};

pub use gateway::{CallbackHandler, GatewayError, GatewayEvent, GatewayOptions, PaymentGateway, Prefill};
pub use route::{STATUS_PATH, StatusRoute};
pub use state::CheckoutState;

/// Shown when the gateway SDK cannot be loaded.
pub const SDK_UNAVAILABLE_MESSAGE: &str = "Unable to load Razorpay. Check your connection.";

/// Why an attempt stopped before the gateway took over.
#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("Please select a shipping address")]
    NoAddress,

    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Unable to load Razorpay. Check your connection.")]
    SdkUnavailable(#[source] GatewayError),

    /// No order was created.
    #[error("{0}")]
    OrderFailed(#[source] ApiError),

    /// The order exists but could not be paid for yet.
    #[error("Your order was placed but payment could not be started. Retry payment from your orders.")]
    IntentFailed {
        order_id: OrderId,
        #[source]
        source: ApiError,
    },

    /// The order and payment intent exist but the gateway UI would not open.
    #[error("Your order was placed but the payment window could not be opened. Retry payment from your orders.")]
    GatewayOpenFailed {
        order_id: OrderId,
        #[source]
        source: GatewayError,
    },

    #[error("This order cannot be paid for")]
    NotPayable(OrderId),

    #[error("A checkout is already in progress")]
    InProgress,
}

impl CheckoutError {
    /// The unpaid order this error left behind, if any. Pass it to
    /// [`CheckoutOrchestrator::retry_payment`] once fetched.
    #[must_use]
    pub const fn order_id(&self) -> Option<&OrderId> {
        match self {
            Self::IntentFailed { order_id, .. } | Self::GatewayOpenFailed { order_id, .. } => Some(order_id),
            _ => None,
        }
    }
}

/// Terminal result of an attempt that reached the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutOutcome {
    pub order_id: OrderId,
    pub route: StatusRoute,
    /// Whether the cart cache is empty after a verified success. `false`
    /// when the clear call failed and the server still holds the lines.
    pub cart_cleared: bool,
}

impl CheckoutOutcome {
    #[must_use]
    pub const fn status(&self) -> PaymentStatus {
        self.route.status
    }
}

/// An attempt whose gateway UI is open.
///
/// Pass it to [`CheckoutOrchestrator::finish`]; drop it to abandon.
#[derive(Debug)]
pub struct AwaitingPayment {
    order: Order,
    events: oneshot::Receiver<GatewayEvent>,
    _attempt: AttemptGuard,
}

impl AwaitingPayment {
    #[must_use]
    pub const fn order(&self) -> &Order {
        &self.order
    }
}

/// Holds the single in-flight slot for as long as an attempt lives.
#[derive(Debug)]
struct AttemptGuard(Arc<AtomicBool>);

impl AttemptGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for AttemptGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IntentRequest<'a> {
    order_id: &'a OrderId,
}

// =============================================================================
// CheckoutOrchestrator
// =============================================================================

pub struct CheckoutOrchestrator<G> {
    inner: Arc<Inner<G>>,
}

struct Inner<G> {
    api: ApiClient,
    cart: CartStore,
    orders: OrderStore,
    gateway: G,
    config: CheckoutConfig,
    state: watch::Sender<CheckoutState>,
    in_flight: Arc<AtomicBool>,
}

impl<G> Clone for CheckoutOrchestrator<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G> std::fmt::Debug for CheckoutOrchestrator<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutOrchestrator")
            .field("state", &*self.inner.state.borrow())
            .field("in_flight", &self.inner.in_flight.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl<G: PaymentGateway> CheckoutOrchestrator<G> {
    #[must_use]
    pub fn new(api: ApiClient, stores: &Stores, gateway: G, config: CheckoutConfig) -> Self {
        let (state, _) = watch::channel(CheckoutState::Idle);
        Self {
            inner: Arc::new(Inner {
                api,
                cart: stores.cart.clone(),
                orders: stores.orders.clone(),
                gateway,
                config,
                state,
                in_flight: Arc::new(AtomicBool::new(false)),
            }),
        }
    }

    #[must_use]
    pub fn state(&self) -> CheckoutState {
        self.inner.state.borrow().clone()
    }

    /// Follow state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CheckoutState> {
        self.inner.state.subscribe()
    }

    /// Start and finish in one call. `Ok(None)` means the gateway UI was
    /// closed without a result.
    ///
    /// # Errors
    ///
    /// See [`start`](Self::start).
    pub async fn run(&self, address: Option<&Address>) -> Result<Option<CheckoutOutcome>, CheckoutError> {
        let awaiting = self.start(address).await?;
        Ok(self.finish(awaiting).await)
    }

    /// Validate, create the order and payment intent, and open the gateway.
    ///
    /// Validation uses the cached cart and makes no network call.
    ///
    /// # Errors
    ///
    /// Every error except [`CheckoutError::InProgress`] leaves the state at
    /// `FailedLocal`. After [`CheckoutError::IntentFailed`] or
    /// [`CheckoutError::GatewayOpenFailed`] an unpaid order exists
    /// server-side.
    #[instrument(skip(self, address))]
    pub async fn start(&self, address: Option<&Address>) -> Result<AwaitingPayment, CheckoutError> {
        let attempt = AttemptGuard::acquire(&self.inner.in_flight).ok_or(CheckoutError::InProgress)?;
        error::add_breadcrumb("checkout", "Checkout started", &[]);

        self.transition(CheckoutState::Validating);
        let Some(address) = address else {
            return Err(self.fail_local(CheckoutError::NoAddress));
        };
        if self.inner.cart.is_empty() {
            return Err(self.fail_local(CheckoutError::EmptyCart));
        }

        self.load_gateway().await?;

        self.transition(CheckoutState::CreatingOrder);
        let input = CreateOrderInput {
            from_cart: true,
            shipping_address: address.into(),
        };
        let order = self
            .inner
            .orders
            .create(&input)
            .await
            .map_err(|e| self.fail_local(CheckoutError::OrderFailed(e)))?;
        error::add_breadcrumb("checkout", "Order created", &[("order_id", order.id.as_str())]);

        self.open_gateway(order, Some(address.phone.clone()), attempt)
            .await
    }

    /// Pay for an order that exists but was never paid.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::NotPayable`] for paid or cancelled orders, otherwise
    /// as [`start`](Self::start) from loading the gateway on.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn retry_payment(&self, order: &Order) -> Result<AwaitingPayment, CheckoutError> {
        let attempt = AttemptGuard::acquire(&self.inner.in_flight).ok_or(CheckoutError::InProgress)?;
        if !order.awaits_payment() {
            return Err(self.fail_local(CheckoutError::NotPayable(order.id.clone())));
        }
        error::add_breadcrumb("checkout", "Payment retried", &[("order_id", order.id.as_str())]);

        self.load_gateway().await?;
        let contact = order.shipping_address.as_ref().map(|a| a.phone.clone());
        self.open_gateway(order.clone(), contact, attempt).await
    }

    /// Wait for the gateway's first callback and settle the attempt.
    ///
    /// Returns `None` if the gateway dropped its handler without reporting
    /// (the customer closed the payment UI); the state is left at
    /// `AwaitingGatewayCallback`.
    #[instrument(skip(self, awaiting), fields(order_id = %awaiting.order.id))]
    pub async fn finish(&self, awaiting: AwaitingPayment) -> Option<CheckoutOutcome> {
        let AwaitingPayment {
            order,
            events,
            _attempt,
        } = awaiting;

        let Ok(event) = events.await else {
            info!("Gateway closed without a result, attempt abandoned");
            return None;
        };

        let route = match event {
            GatewayEvent::Failed { payment_id } => {
                warn!(payment_id = ?payment_id, "Gateway reported payment failure");
                StatusRoute::new(PaymentStatus::Failed, payment_id)
            }
            GatewayEvent::Success(proof) => self.verify(&order.id, proof).await,
        };

        let cart_cleared = route.status == PaymentStatus::Success && self.clear_cart().await;

        error::add_breadcrumb(
            "checkout",
            "Checkout settled",
            &[("order_id", order.id.as_str()), ("status", route.status.as_str())],
        );
        self.transition(CheckoutState::verified(route.clone()));
        Some(CheckoutOutcome {
            order_id: order.id,
            route,
            cart_cleared,
        })
    }

    // =========================================================================
    // Steps
    // =========================================================================

    async fn load_gateway(&self) -> Result<(), CheckoutError> {
        self.transition(CheckoutState::LoadingGatewaySdk);
        self.inner
            .gateway
            .load()
            .await
            .map_err(|e| self.fail_local(CheckoutError::SdkUnavailable(e)))
    }

    async fn open_gateway(
        &self,
        order: Order,
        contact: Option<String>,
        attempt: AttemptGuard,
    ) -> Result<AwaitingPayment, CheckoutError> {
        self.transition(CheckoutState::RequestingPaymentIntent {
            order_id: order.id.clone(),
        });
        let intent: PaymentIntent = self
            .inner
            .api
            .send(ApiRequest::post("/payments/create-order").json(&IntentRequest { order_id: &order.id }))
            .await
            .map_err(|source| {
                self.fail_local(CheckoutError::IntentFailed {
                    order_id: order.id.clone(),
                    source,
                })
            })?;

        let options = self.gateway_options(&order, intent, contact);
        let (handler, events) = CallbackHandler::channel();
        self.inner
            .gateway
            .open(options, handler)
            .map_err(|source| {
                self.fail_local(CheckoutError::GatewayOpenFailed {
                    order_id: order.id.clone(),
                    source,
                })
            })?;

        info!(order_id = %order.id, "Awaiting gateway callback");
        self.transition(CheckoutState::AwaitingGatewayCallback {
            order_id: order.id.clone(),
        });
        Ok(AwaitingPayment {
            order,
            events,
            _attempt: attempt,
        })
    }

    fn gateway_options(&self, order: &Order, intent: PaymentIntent, contact: Option<String>) -> GatewayOptions {
        let user = self.inner.api.session().user();
        GatewayOptions {
            key: intent.key,
            amount: intent.amount,
            currency: intent.currency,
            gateway_order_id: intent.gateway_order_id,
            name: self.inner.config.merchant_name.clone(),
            description: format!("Order {}", order.id),
            prefill: Prefill {
                name: user.as_ref().map(|u| u.name.clone()),
                email: user.map(|u| u.email),
                contact,
            },
            theme_color: self.inner.config.theme_color.clone(),
        }
    }

    /// Verify a success callback. Server errors whose outcome is unknown
    /// read as pending; every other error reads as failed.
    async fn verify(&self, order_id: &OrderId, proof: PaymentProof) -> StatusRoute {
        let payment_id = proof.gateway_payment_id.clone();
        self.transition(CheckoutState::Verifying {
            order_id: order_id.clone(),
            payment_id: payment_id.clone(),
        });

        let result = self
            .inner
            .api
            .send::<Verification>(ApiRequest::post("/payments/verify").json(&proof))
            .await;

        let status = match result {
            Ok(verification) if verification.is_success() => {
                info!(%order_id, %payment_id, "Payment verified");
                PaymentStatus::Success
            }
            Ok(verification) => {
                info!(%order_id, %payment_id, status = %verification.status, "Payment not yet confirmed");
                PaymentStatus::Pending
            }
            Err(e) if e.is_indeterminate() => {
                warn!(%order_id, %payment_id, error = %e, status = ?e.status, "Verification outcome unknown, treating as pending");
                sentry::capture_message(
                    &format!("Payment {payment_id} for order {order_id} needs reconciliation: {e}"),
                    sentry::Level::Warning,
                );
                PaymentStatus::Pending
            }
            Err(e) => {
                warn!(%order_id, %payment_id, error = %e, status = ?e.status, "Verification failed");
                PaymentStatus::Failed
            }
        };
        StatusRoute::new(status, Some(payment_id))
    }

    /// Empty the cart after a verified payment. If the clear call fails the
    /// cart is re-read so the cache matches the server. Returns whether the
    /// cache ended up empty.
    async fn clear_cart(&self) -> bool {
        let Err(e) = self.inner.cart.clear().await else {
            return true;
        };
        warn!(error = %e, "Payment succeeded but the cart could not be cleared, re-reading it");
        sentry::capture_message(
            &format!("Cart not cleared after verified payment: {e}"),
            sentry::Level::Warning,
        );
        if let Err(e) = self.inner.cart.fetch().await {
            warn!(error = %e, "Cart re-read failed");
        }
        self.inner.cart.is_empty()
    }

    fn fail_local(&self, error: CheckoutError) -> CheckoutError {
        warn!(error = %error, "Checkout stopped");
        self.transition(CheckoutState::FailedLocal {
            message: error.to_string(),
        });
        error
    }

    fn transition(&self, next: CheckoutState) {
        info!(state = next.name(), "Checkout state changed");
        error::add_breadcrumb("checkout", next.name(), &[]);
        self.inner.state.send_replace(next);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::session::SessionHandle;
    use mockito::Matcher;
    use parking_lot::Mutex;
    use serde_json::json;

    /// Fires a scripted event as soon as it is opened.
    #[derive(Default)]
    struct ScriptedGateway {
        unavailable: bool,
        refuse_open: bool,
        event: Option<GatewayEvent>,
        opened: Mutex<Vec<GatewayOptions>>,
    }

    impl PaymentGateway for ScriptedGateway {
        async fn load(&self) -> Result<(), GatewayError> {
            if self.unavailable {
                Err(GatewayError::Unavailable("script blocked".to_string()))
            } else {
                Ok(())
            }
        }

        fn open(&self, options: GatewayOptions, handler: CallbackHandler) -> Result<(), GatewayError> {
            if self.refuse_open {
                return Err(GatewayError::Open("popup blocked".to_string()));
            }
            self.opened.lock().push(options);
            if let Some(event) = self.event.clone() {
                handler.fire(event);
            }
            Ok(())
        }
    }

    fn proof() -> PaymentProof {
        PaymentProof {
            gateway_order_id: "order_RZP1".to_string(),
            gateway_payment_id: "pay_RZP1".to_string(),
            signature: "sig".to_string(),
        }
    }

    fn address() -> Address {
        serde_json::from_value(json!({
            "_id": "a1",
            "fullName": "Asha Rao",
            "phone": "9800000000",
            "addressLine1": "12 MG Road",
            "city": "Pune",
            "state": "MH",
            "postalCode": "411001",
            "country": "India",
            "isDefault": true
        }))
        .unwrap()
    }

    fn line() -> serde_json::Value {
        json!({ "_id": "c1", "product": { "_id": "p1", "name": "LED", "price": 99 }, "quantity": 2 })
    }

    async fn setup(
        server: &mut mockito::ServerGuard,
        gateway: ScriptedGateway,
    ) -> (CheckoutOrchestrator<ScriptedGateway>, Stores) {
        server
            .mock("GET", "/api/cart")
            .with_status(200)
            .with_body(json!({ "items": [line()] }).to_string())
            .create_async()
            .await;
        let config = ApiConfig::new(&format!("{}/api", server.url())).unwrap();
        let api = ApiClient::new(&config, SessionHandle::in_memory()).unwrap();
        let stores = Stores::new(&api);
        stores.cart.fetch().await.unwrap();
        let checkout = CheckoutOrchestrator::new(api, &stores, gateway, CheckoutConfig::default());
        (checkout, stores)
    }

    async fn mock_order_and_intent(server: &mut mockito::ServerGuard) {
        server
            .mock("POST", "/api/orders")
            .with_status(201)
            .with_body(json!({ "_id": "o1", "totalPrice": 198, "orderStatus": "Pending" }).to_string())
            .create_async()
            .await;
        server
            .mock("POST", "/api/payments/create-order")
            .match_body(Matcher::Json(json!({ "orderId": "o1" })))
            .with_status(200)
            .with_body(r#"{"orderId":"order_RZP1","amount":19800,"currency":"INR","key":"rzp_test"}"#)
            .create_async()
            .await;
    }

    #[tokio::test]
    async fn test_verified_success_clears_cart() {
        let mut server = mockito::Server::new_async().await;
        let gateway = ScriptedGateway {
            event: Some(GatewayEvent::Success(proof())),
            ..ScriptedGateway::default()
        };
        let (checkout, stores) = setup(&mut server, gateway).await;
        mock_order_and_intent(&mut server).await;
        server
            .mock("POST", "/api/payments/verify")
            .match_body(Matcher::PartialJson(json!({ "razorpay_payment_id": "pay_RZP1" })))
            .with_status(200)
            .with_body(r#"{"status":"success"}"#)
            .create_async()
            .await;
        let clear = server
            .mock("DELETE", "/api/cart/clear")
            .with_status(200)
            .with_body(r#"{"items":[]}"#)
            .create_async()
            .await;

        let outcome = checkout.run(Some(&address())).await.unwrap().unwrap();

        clear.assert_async().await;
        assert_eq!(outcome.status(), PaymentStatus::Success);
        assert_eq!(outcome.route.to_query(), "status=success&paymentId=pay_RZP1");
        assert!(outcome.cart_cleared);
        assert!(stores.cart.is_empty());
        assert!(matches!(checkout.state(), CheckoutState::VerifiedSuccess(_)));

        let opened = checkout.inner.gateway.opened.lock();
        assert_eq!(opened[0].amount, 19800);
        assert_eq!(opened[0].description, "Order o1");
        assert_eq!(opened[0].name, "VoltCart Electricals");
        assert_eq!(opened[0].prefill.contact.as_deref(), Some("9800000000"));
    }

    #[tokio::test]
    async fn test_unavailable_verification_is_pending() {
        let mut server = mockito::Server::new_async().await;
        let gateway = ScriptedGateway {
            event: Some(GatewayEvent::Success(proof())),
            ..ScriptedGateway::default()
        };
        let (checkout, stores) = setup(&mut server, gateway).await;
        mock_order_and_intent(&mut server).await;
        server
            .mock("POST", "/api/payments/verify")
            .with_status(503)
            .with_body(r#"{"message":"Service temporarily unavailable"}"#)
            .create_async()
            .await;
        let clear = server
            .mock("DELETE", "/api/cart/clear")
            .expect(0)
            .create_async()
            .await;
        let before = stores.cart.items();

        let outcome = checkout.run(Some(&address())).await.unwrap().unwrap();

        clear.assert_async().await;
        assert!(!outcome.cart_cleared);
        assert_eq!(outcome.status(), PaymentStatus::Pending);
        assert_eq!(outcome.route.payment_id.as_deref(), Some("pay_RZP1"));
        assert_eq!(stores.cart.items(), before);
    }

    #[tokio::test]
    async fn test_rejected_verification_is_failed() {
        let mut server = mockito::Server::new_async().await;
        let gateway = ScriptedGateway {
            event: Some(GatewayEvent::Success(proof())),
            ..ScriptedGateway::default()
        };
        let (checkout, stores) = setup(&mut server, gateway).await;
        mock_order_and_intent(&mut server).await;
        server
            .mock("POST", "/api/payments/verify")
            .with_status(400)
            .with_body(r#"{"message":"Invalid signature"}"#)
            .create_async()
            .await;

        let outcome = checkout.run(Some(&address())).await.unwrap().unwrap();
        assert_eq!(outcome.status(), PaymentStatus::Failed);
        assert_eq!(outcome.route.payment_id.as_deref(), Some("pay_RZP1"));
        assert_eq!(stores.cart.len(), 1);
    }

    #[tokio::test]
    async fn test_non_success_status_is_pending() {
        let mut server = mockito::Server::new_async().await;
        let gateway = ScriptedGateway {
            event: Some(GatewayEvent::Success(proof())),
            ..ScriptedGateway::default()
        };
        let (checkout, _stores) = setup(&mut server, gateway).await;
        mock_order_and_intent(&mut server).await;
        server
            .mock("POST", "/api/payments/verify")
            .with_status(200)
            .with_body(r#"{"status":"processing"}"#)
            .create_async()
            .await;

        let outcome = checkout.run(Some(&address())).await.unwrap().unwrap();
        assert!(matches!(checkout.state(), CheckoutState::VerifiedPending(_)));
        assert_eq!(outcome.status(), PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_gateway_failure_skips_verification() {
        let mut server = mockito::Server::new_async().await;
        let gateway = ScriptedGateway {
            event: Some(GatewayEvent::Failed {
                payment_id: Some("pay_X".to_string()),
            }),
            ..ScriptedGateway::default()
        };
        let (checkout, _stores) = setup(&mut server, gateway).await;
        mock_order_and_intent(&mut server).await;
        let verify = server
            .mock("POST", "/api/payments/verify")
            .expect(0)
            .create_async()
            .await;

        let outcome = checkout.run(Some(&address())).await.unwrap().unwrap();
        verify.assert_async().await;
        assert_eq!(outcome.route.to_query(), "status=failed&paymentId=pay_X");
    }

    #[tokio::test]
    async fn test_local_failures_make_no_calls() {
        let mut server = mockito::Server::new_async().await;
        let gateway = ScriptedGateway {
            unavailable: true,
            ..ScriptedGateway::default()
        };
        let (checkout, _stores) = setup(&mut server, gateway).await;
        let orders = server
            .mock("POST", "/api/orders")
            .expect(0)
            .create_async()
            .await;

        assert!(matches!(
            checkout.start(None).await,
            Err(CheckoutError::NoAddress)
        ));
        let err = checkout.start(Some(&address())).await.unwrap_err();
        assert_eq!(err.to_string(), SDK_UNAVAILABLE_MESSAGE);
        assert_eq!(
            checkout.state(),
            CheckoutState::FailedLocal {
                message: SDK_UNAVAILABLE_MESSAGE.to_string()
            }
        );
        orders.assert_async().await;
    }

    #[tokio::test]
    async fn test_intent_failure_leaves_orphan_order() {
        let mut server = mockito::Server::new_async().await;
        let (checkout, stores) = setup(&mut server, ScriptedGateway::default()).await;
        let before = stores.cart.items();
        server
            .mock("POST", "/api/orders")
            .with_status(201)
            .with_body(json!({ "_id": "o7", "totalPrice": 198 }).to_string())
            .create_async()
            .await;
        server
            .mock("POST", "/api/payments/create-order")
            .with_status(500)
            .with_body(r#"{"message":"Gateway error"}"#)
            .create_async()
            .await;

        let err = checkout.start(Some(&address())).await.unwrap_err();
        match err {
            CheckoutError::IntentFailed { order_id, .. } => assert_eq!(order_id.as_str(), "o7"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(stores.orders.unpaid()[0].id.as_str(), "o7");
        assert_eq!(stores.cart.items(), before);
    }

    #[tokio::test]
    async fn test_refused_gateway_window_keeps_order_for_retry() {
        let mut server = mockito::Server::new_async().await;
        let gateway = ScriptedGateway {
            refuse_open: true,
            ..ScriptedGateway::default()
        };
        let (checkout, stores) = setup(&mut server, gateway).await;
        mock_order_and_intent(&mut server).await;
        let before = stores.cart.items();

        let err = checkout.start(Some(&address())).await.unwrap_err();

        match &err {
            CheckoutError::GatewayOpenFailed { order_id, source } => {
                assert_eq!(order_id.as_str(), "o1");
                assert_eq!(source, &GatewayError::Open("popup blocked".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.order_id().map(OrderId::as_str), Some("o1"));
        assert_ne!(err.to_string(), SDK_UNAVAILABLE_MESSAGE);
        assert_eq!(
            checkout.state(),
            CheckoutState::FailedLocal {
                message: err.to_string()
            }
        );
        assert_eq!(stores.cart.items(), before);
        assert_eq!(stores.orders.unpaid()[0].id.as_str(), "o1");
        assert!(!checkout.inner.in_flight.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn test_failed_clear_rereads_cart_and_reports_it() {
        let mut server = mockito::Server::new_async().await;
        let gateway = ScriptedGateway {
            event: Some(GatewayEvent::Success(proof())),
            ..ScriptedGateway::default()
        };
        let (checkout, stores) = setup(&mut server, gateway).await;
        mock_order_and_intent(&mut server).await;
        server
            .mock("POST", "/api/payments/verify")
            .with_status(200)
            .with_body(r#"{"status":"success"}"#)
            .create_async()
            .await;
        let clear = server
            .mock("DELETE", "/api/cart/clear")
            .with_status(500)
            .with_body(r#"{"message":"Server error"}"#)
            .create_async()
            .await;
        let reread = server
            .mock("GET", "/api/cart")
            .with_status(200)
            .with_body(json!({ "items": [line()] }).to_string())
            .expect(1)
            .create_async()
            .await;

        let outcome = checkout.run(Some(&address())).await.unwrap().unwrap();

        clear.assert_async().await;
        reread.assert_async().await;
        assert_eq!(outcome.status(), PaymentStatus::Success);
        assert!(!outcome.cart_cleared);
        assert_eq!(stores.cart.len(), 1);
        assert!(matches!(checkout.state(), CheckoutState::VerifiedSuccess(_)));
    }

    #[tokio::test]
    async fn test_second_start_rejected_until_abandoned() {
        let mut server = mockito::Server::new_async().await;
        let (checkout, _stores) = setup(&mut server, ScriptedGateway::default()).await;
        mock_order_and_intent(&mut server).await;

        let awaiting = checkout.start(Some(&address())).await.unwrap();
        assert!(matches!(
            checkout.start(Some(&address())).await,
            Err(CheckoutError::InProgress)
        ));
        assert_eq!(
            checkout.state(),
            CheckoutState::AwaitingGatewayCallback {
                order_id: OrderId::new("o1")
            }
        );

        // The gateway holds no handler, so finishing reports abandonment.
        assert!(checkout.finish(awaiting).await.is_none());
        assert!(!checkout.inner.in_flight.load(Ordering::Acquire));
    }
}
