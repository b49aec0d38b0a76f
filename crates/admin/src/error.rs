//! Unified error handling for admin.

use thiserror::Error;
use voltcart_core::OrderStatus;
use voltcart_storefront::ApiError;

/// Error type for back-office operations.
#[derive(Debug, Clone, Error)]
pub enum AdminError {
    /// The signed-in user is not an administrator.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Rejected locally before any request was sent.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The requested status change skips backwards or leaves a terminal state.
    #[error("Cannot move an order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// The API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl AdminError {
    /// Report server-side faults to Sentry and log them. Client-side
    /// rejections are only logged at debug.
    pub fn report(&self) {
        let server_fault = matches!(self, Self::Api(e) if e.status.is_some_and(|s| s >= 500));
        if server_fault {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        } else {
            tracing::debug!(error = %self, "Admin request rejected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_message() {
        let err = AdminError::InvalidTransition {
            from: OrderStatus::Delivered,
            to: OrderStatus::Packed,
        };
        assert_eq!(err.to_string(), "Cannot move an order from Delivered to Packed");
    }

    #[test]
    fn test_api_error_is_transparent() {
        let err = AdminError::from(ApiError::server(403, Some("Admins only".to_string())));
        assert_eq!(err.to_string(), "Admins only");
    }
}
