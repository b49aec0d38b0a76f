//! The payment gateway seam.
//!
//! The gateway is an opaque third party: it is loaded, opened once per
//! attempt with a set of [`GatewayOptions`], and later reports back through
//! a [`CallbackHandler`]. Only the first report for an attempt counts.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::debug;

use crate::types::PaymentProof;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The gateway SDK could not be loaded.
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
    /// The SDK loaded but refused to open the payment UI.
    #[error("gateway refused to open: {0}")]
    Open(String),
}

/// Customer details the gateway pre-fills.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prefill {
    pub name: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
}

/// Everything the gateway needs to collect one payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOptions {
    /// Publishable gateway key from the payment intent.
    pub key: String,
    /// Minor units.
    pub amount: i64,
    pub currency: String,
    pub gateway_order_id: String,
    /// Merchant name shown in the gateway UI.
    pub name: String,
    pub description: String,
    pub prefill: Prefill,
    pub theme_color: String,
}

/// What the gateway reported for an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// The success handler fired with a proof to verify.
    Success(PaymentProof),
    /// The gateway reported a failed payment.
    Failed { payment_id: Option<String> },
}

/// Single-use completion handler for one checkout attempt.
///
/// Clones share the same slot, so the gateway may hold one per callback
/// it registers. The first [`fire`](Self::fire) wins.
#[derive(Debug, Clone)]
pub struct CallbackHandler {
    slot: Arc<Mutex<Option<oneshot::Sender<GatewayEvent>>>>,
}

impl CallbackHandler {
    /// A handler and the receiver its first event is delivered to.
    #[must_use]
    pub fn channel() -> (Self, oneshot::Receiver<GatewayEvent>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                slot: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    /// Deliver `event`. Returns `false` if an event was already delivered
    /// or the attempt was abandoned.
    pub fn fire(&self, event: GatewayEvent) -> bool {
        let Some(tx) = self.slot.lock().take() else {
            debug!(?event, "Ignoring gateway event after the first");
            return false;
        };
        tx.send(event).is_ok()
    }

    /// Whether an event was already delivered.
    #[must_use]
    pub fn is_spent(&self) -> bool {
        self.slot.lock().is_none()
    }
}

/// A payment gateway SDK.
pub trait PaymentGateway: Send + Sync + 'static {
    /// Make the SDK ready. Called once per attempt; should be cheap when
    /// already loaded.
    fn load(&self) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Show the payment UI. Must return promptly; the outcome arrives
    /// later through `handler`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Open`] if the UI cannot be shown.
    fn open(&self, options: GatewayOptions, handler: CallbackHandler) -> Result<(), GatewayError>;
}
