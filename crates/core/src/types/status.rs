//! Status enums for various entities.
//!
//! Wire spellings follow the backend exactly: order statuses are title-case
//! phrases ("Out for Delivery"), everything else is `snake_case`.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// The fulfilment sequence is strictly ordered
/// `Pending → Confirmed → Packed → Shipped → Out for Delivery → Delivered`;
/// `Cancelled` is reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Packed,
    Shipped,
    #[serde(rename = "Out for Delivery")]
    OutForDelivery,
    Delivered,
    Cancelled,
}

/// Position of a fulfilment step relative to an order's current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepState {
    Completed,
    Active,
    Upcoming,
}

impl OrderStatus {
    /// The fulfilment sequence, in order.
    pub const FULFILMENT: [Self; 6] = [
        Self::Pending,
        Self::Confirmed,
        Self::Packed,
        Self::Shipped,
        Self::OutForDelivery,
        Self::Delivered,
    ];

    /// Every status, fulfilment sequence first.
    pub const ALL: [Self; 7] = [
        Self::Pending,
        Self::Confirmed,
        Self::Packed,
        Self::Shipped,
        Self::OutForDelivery,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Index in the fulfilment sequence; `None` for `Cancelled`.
    #[must_use]
    pub const fn rank(self) -> Option<usize> {
        match self {
            Self::Pending => Some(0),
            Self::Confirmed => Some(1),
            Self::Packed => Some(2),
            Self::Shipped => Some(3),
            Self::OutForDelivery => Some(4),
            Self::Delivered => Some(5),
            Self::Cancelled => None,
        }
    }

    /// `Delivered` and `Cancelled` admit no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Whether moving from `self` to `next` respects the lifecycle.
    ///
    /// Forward moves may skip steps (a back-office user can mark a
    /// confirmed order as shipped directly); backward moves never happen.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() || self == next {
            return false;
        }
        match (self.rank(), next.rank()) {
            (_, None) => true,
            (Some(from), Some(to)) => to > from,
            (None, Some(_)) => false,
        }
    }

    /// Per-step progress for rendering a fulfilment timeline.
    ///
    /// A cancelled order shows every step as upcoming.
    #[must_use]
    pub fn timeline(self) -> Vec<(Self, StepState)> {
        let current = self.rank();
        Self::FULFILMENT
            .iter()
            .map(|&step| {
                let state = match (current, step.rank()) {
                    (Some(c), Some(s)) if s < c => StepState::Completed,
                    (Some(c), Some(s)) if s == c => StepState::Active,
                    _ => StepState::Upcoming,
                };
                (step, state)
            })
            .collect()
    }

    /// Backend spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Packed => "Packed",
            Self::Shipped => "Shipped",
            Self::OutForDelivery => "Out for Delivery",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

/// User-facing result of a checkout attempt, carried across the
/// gateway-redirect boundary as `status=<value>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Success,
    #[default]
    Pending,
    Failed,
}

impl PaymentStatus {
    /// Query-string spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Pending => "pending",
            Self::Failed => "failed",
        }
    }

    /// Parse the query-string spelling; anything unrecognised is `Pending`.
    #[must_use]
    pub fn from_query_value(value: Option<&str>) -> Self {
        match value {
            Some("success") => Self::Success,
            Some("failed") => Self::Failed,
            _ => Self::Pending,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Support ticket status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    /// Query/body spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }

    /// A closed ticket accepts no further replies.
    #[must_use]
    pub const fn accepts_replies(self) -> bool {
        !matches!(self, Self::Closed)
    }
}

impl std::str::FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "in_progress" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            "closed" => Ok(Self::Closed),
            _ => Err(format!("invalid ticket status: {s}")),
        }
    }
}

/// Support ticket category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TicketCategory {
    #[default]
    Other,
    OrderIssue,
    PaymentIssue,
    ProductQuery,
    ReturnRequest,
}

impl std::str::FromStr for TicketCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "other" => Ok(Self::Other),
            "order_issue" => Ok(Self::OrderIssue),
            "payment_issue" => Ok(Self::PaymentIssue),
            "product_query" => Ok(Self::ProductQuery),
            "return_request" => Ok(Self::ReturnRequest),
            _ => Err(format!("invalid ticket category: {s}")),
        }
    }
}

/// Return request status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    PickedUp,
    Refunded,
}

impl ReturnStatus {
    /// Query/body spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::PickedUp => "picked_up",
            Self::Refunded => "refunded",
        }
    }
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// Notification category, used for iconography and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Order,
    Support,
    Return,
    Coupon,
    #[default]
    System,
}

impl NotificationKind {
    /// Lenient parse: unknown kinds fall back to `System`.
    #[must_use]
    pub fn from_wire(value: &str) -> Self {
        match value {
            "order" => Self::Order,
            "support" => Self::Support,
            "return" => Self::Return,
            "coupon" => Self::Coupon,
            _ => Self::System,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_wire_spelling() {
        let json = serde_json::to_string(&OrderStatus::OutForDelivery).unwrap();
        assert_eq!(json, "\"Out for Delivery\"");
        let parsed: OrderStatus = serde_json::from_str("\"Out for Delivery\"").unwrap();
        assert_eq!(parsed, OrderStatus::OutForDelivery);
    }

    #[test]
    fn test_order_status_transitions() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Confirmed));
        assert!(OrderStatus::Confirmed.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Packed));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Packed.can_transition_to(OrderStatus::Packed));
    }

    #[test]
    fn test_timeline_marks_progress() {
        let steps = OrderStatus::Packed.timeline();
        assert_eq!(steps.len(), 6);
        assert_eq!(steps[0], (OrderStatus::Pending, StepState::Completed));
        assert_eq!(steps[2], (OrderStatus::Packed, StepState::Active));
        assert_eq!(steps[5], (OrderStatus::Delivered, StepState::Upcoming));

        assert!(
            OrderStatus::Cancelled
                .timeline()
                .iter()
                .all(|(_, state)| *state == StepState::Upcoming)
        );
    }

    #[test]
    fn test_order_status_from_str() {
        assert_eq!(
            "out for delivery".parse::<OrderStatus>(),
            Ok(OrderStatus::OutForDelivery)
        );
        assert!("Lost".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_payment_status_query_value() {
        assert_eq!(
            PaymentStatus::from_query_value(Some("success")),
            PaymentStatus::Success
        );
        assert_eq!(
            PaymentStatus::from_query_value(Some("failed")),
            PaymentStatus::Failed
        );
        assert_eq!(PaymentStatus::from_query_value(None), PaymentStatus::Pending);
        assert_eq!(
            PaymentStatus::from_query_value(Some("bogus")),
            PaymentStatus::Pending
        );
    }

    #[test]
    fn test_ticket_status_snake_case() {
        let json = serde_json::to_string(&TicketStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        assert!(!TicketStatus::Closed.accepts_replies());
        assert!(TicketStatus::Resolved.accepts_replies());
    }

    #[test]
    fn test_notification_kind_fallback() {
        assert_eq!(NotificationKind::from_wire("order"), NotificationKind::Order);
        assert_eq!(NotificationKind::from_wire("promo"), NotificationKind::System);
    }
}
