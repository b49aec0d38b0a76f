//! Every customer's orders, with status changes.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument};
use voltcart_core::{OrderId, OrderStatus};
use voltcart_storefront::api::segment;
use voltcart_storefront::api::wire::Listing;
use voltcart_storefront::stores::cache::Slice;
use voltcart_storefront::types::Order;
use voltcart_storefront::{ApiClient, ApiError, ApiRequest};

use crate::error::AdminError;

#[derive(Serialize)]
struct StatusUpdate {
    status: OrderStatus,
}

#[derive(Debug, Clone)]
pub struct OrderAdmin {
    api: ApiClient,
    orders: Arc<Slice<Vec<Order>>>,
}

impl OrderAdmin {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            orders: Arc::new(Slice::default()),
        }
    }

    #[must_use]
    pub fn list(&self) -> Vec<Order> {
        self.orders.snapshot()
    }

    /// Orders in `status` (all when `None`) whose id or customer name
    /// contains `term`, case-insensitively.
    #[must_use]
    pub fn filter(&self, status: Option<OrderStatus>, term: &str) -> Vec<Order> {
        let term = term.trim().to_lowercase();
        self.orders.read(|orders| {
            orders
                .iter()
                .filter(|o| status.is_none_or(|s| o.order_status == s))
                .filter(|o| {
                    term.is_empty()
                        || o.id.as_str().to_lowercase().contains(&term)
                        || o.user
                            .as_ref()
                            .and_then(|u| u.name.as_deref())
                            .is_some_and(|n| n.to_lowercase().contains(&term))
                })
                .cloned()
                .collect()
        })
    }

    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn fetch(&self) -> Result<Vec<Order>, ApiError> {
        let ticket = self.orders.ticket();
        let orders = self
            .api
            .send::<Listing<Order>>(ApiRequest::get("/orders"))
            .await?
            .into_vec();
        self.orders.commit(ticket, |cached| cached.clone_from(&orders));
        Ok(orders)
    }

    /// Move an order along its lifecycle. The cached order is replaced by
    /// the server's copy.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::InvalidTransition`] without a request when the
    /// cached order cannot move to `status`, otherwise the API error.
    #[instrument(skip(self), fields(order_id = %id, status = %status))]
    pub async fn update_status(&self, id: &OrderId, status: OrderStatus) -> Result<Order, AdminError> {
        let current = self
            .orders
            .read(|orders| orders.iter().find(|o| &o.id == id).map(|o| o.order_status));
        if let Some(from) = current
            && !from.can_transition_to(status)
        {
            return Err(AdminError::InvalidTransition { from, to: status });
        }

        let ticket = self.orders.ticket();
        let order: Order = self
            .api
            .send(ApiRequest::patch(format!("/orders/{}/status", segment(id))).json(&StatusUpdate { status }))
            .await?;
        info!(order_status = %order.order_status, "Order status updated");
        self.orders.patch(ticket, |orders| {
            if let Some(slot) = orders.iter_mut().find(|o| o.id == order.id) {
                slot.clone_from(&order);
            }
        });
        Ok(order)
    }
}
