//! The payment status view's address.
//!
//! The outcome of a checkout travels to the status view as a query string
//! (`status=success&paymentId=pay_123`), so it survives the redirect back
//! from the gateway.

use std::fmt;

use url::form_urlencoded;
use voltcart_core::PaymentStatus;

/// Path of the payment status view.
pub const STATUS_PATH: &str = "/payment-status";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRoute {
    pub status: PaymentStatus,
    /// Gateway payment id, when the gateway reported one.
    pub payment_id: Option<String>,
}

impl StatusRoute {
    #[must_use]
    pub fn new(status: PaymentStatus, payment_id: Option<String>) -> Self {
        Self {
            status,
            payment_id: payment_id.filter(|id| !id.is_empty()),
        }
    }

    /// Query string without the leading `?`.
    #[must_use]
    pub fn to_query(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("status", self.status.as_str());
        if let Some(id) = &self.payment_id {
            query.append_pair("paymentId", id);
        }
        query.finish()
    }

    /// Parse a status view query string. A leading `?` is ignored; a
    /// missing or unknown status reads as pending.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut status = None;
        let mut payment_id = None;
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "status" => status = Some(value.into_owned()),
                "paymentId" => payment_id = Some(value.into_owned()),
                _ => {}
            }
        }
        Self::new(PaymentStatus::from_query_value(status.as_deref()), payment_id)
    }
}

impl fmt::Display for StatusRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{STATUS_PATH}?{}", self.to_query())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_route() {
        let route = StatusRoute::new(PaymentStatus::Success, Some("pay_N1x2".to_string()));
        assert_eq!(route.to_string(), "/payment-status?status=success&paymentId=pay_N1x2");
        assert_eq!(StatusRoute::from_query(&route.to_query()), route);
    }

    #[test]
    fn test_failed_without_payment_id() {
        let route = StatusRoute::new(PaymentStatus::Failed, Some(String::new()));
        assert_eq!(route.to_query(), "status=failed");
    }

    #[test]
    fn test_unknown_status_reads_as_pending() {
        let route = StatusRoute::from_query("?status=refunded&paymentId=pay_9");
        assert_eq!(route.status, PaymentStatus::Pending);
        assert_eq!(route.payment_id.as_deref(), Some("pay_9"));

        assert_eq!(StatusRoute::from_query("").status, PaymentStatus::Pending);
    }
}
