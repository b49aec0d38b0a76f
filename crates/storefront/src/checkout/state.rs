//! Checkout attempt states.

use voltcart_core::{OrderId, PaymentStatus};

use super::route::StatusRoute;

/// Where a checkout attempt currently is.
///
/// ```text
/// Idle -> Validating -> LoadingGatewaySdk -> CreatingOrder
///      -> RequestingPaymentIntent -> AwaitingGatewayCallback
///      -> Verifying -> VerifiedSuccess | VerifiedPending | VerifiedFailed
/// ```
///
/// Any pre-gateway step may end in `FailedLocal`; the gateway may report
/// failure directly (`VerifiedFailed`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CheckoutState {
    #[default]
    Idle,
    Validating,
    LoadingGatewaySdk,
    CreatingOrder,
    RequestingPaymentIntent { order_id: OrderId },
    AwaitingGatewayCallback { order_id: OrderId },
    Verifying { order_id: OrderId, payment_id: String },
    VerifiedSuccess(StatusRoute),
    VerifiedPending(StatusRoute),
    VerifiedFailed(StatusRoute),
    /// Shown inline; no navigation.
    FailedLocal { message: String },
}

impl CheckoutState {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::VerifiedSuccess(_)
                | Self::VerifiedPending(_)
                | Self::VerifiedFailed(_)
                | Self::FailedLocal { .. }
        )
    }

    /// Stable name for logs and breadcrumbs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::LoadingGatewaySdk => "loading_gateway_sdk",
            Self::CreatingOrder => "creating_order",
            Self::RequestingPaymentIntent { .. } => "requesting_payment_intent",
            Self::AwaitingGatewayCallback { .. } => "awaiting_gateway_callback",
            Self::Verifying { .. } => "verifying",
            Self::VerifiedSuccess(_) => "verified_success",
            Self::VerifiedPending(_) => "verified_pending",
            Self::VerifiedFailed(_) => "verified_failed",
            Self::FailedLocal { .. } => "failed_local",
        }
    }

    /// Where to navigate, for the three verified outcomes.
    #[must_use]
    pub const fn route(&self) -> Option<&StatusRoute> {
        match self {
            Self::VerifiedSuccess(route) | Self::VerifiedPending(route) | Self::VerifiedFailed(route) => {
                Some(route)
            }
            _ => None,
        }
    }

    pub(crate) fn verified(route: StatusRoute) -> Self {
        match route.status {
            PaymentStatus::Success => Self::VerifiedSuccess(route),
            PaymentStatus::Pending => Self::VerifiedPending(route),
            PaymentStatus::Failed => Self::VerifiedFailed(route),
        }
    }
}
