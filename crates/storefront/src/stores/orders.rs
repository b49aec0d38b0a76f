//! Orders placed by the signed-in user.
//!
//! Orders are never edited locally; a cached order is only ever replaced
//! wholesale by the server's copy.

use std::sync::Arc;

use tracing::{info, instrument};
use voltcart_core::OrderId;

use super::cache::Slice;
use crate::api::wire::Listing;
use crate::api::{ApiClient, ApiRequest, segment};
use crate::error::ApiError;
use crate::types::{CreateOrderInput, Order};

#[derive(Debug, Clone)]
pub struct OrderStore {
    inner: Arc<OrderStoreInner>,
}

#[derive(Debug)]
struct OrderStoreInner {
    api: ApiClient,
    list: Slice<Vec<Order>>,
    current: Slice<Option<Order>>,
}

impl OrderStore {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            inner: Arc::new(OrderStoreInner {
                api,
                list: Slice::default(),
                current: Slice::default(),
            }),
        }
    }

    // =========================================================================
    // Selectors
    // =========================================================================

    #[must_use]
    pub fn list(&self) -> Vec<Order> {
        self.inner.list.snapshot()
    }

    #[must_use]
    pub fn current(&self) -> Option<Order> {
        self.inner.current.snapshot()
    }

    /// Orders that exist but were never paid for: candidates for retrying
    /// payment.
    #[must_use]
    pub fn unpaid(&self) -> Vec<Order> {
        self.inner.list.read(|orders| {
            orders
                .iter()
                .filter(|o| o.awaits_payment())
                .cloned()
                .collect()
        })
    }

    pub(crate) fn reset(&self) {
        self.inner.list.reset();
        self.inner.current.reset();
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn fetch_mine(&self) -> Result<Vec<Order>, ApiError> {
        let ticket = self.inner.list.ticket();
        let orders = self
            .inner
            .api
            .send::<Listing<Order>>(ApiRequest::get("/orders/my"))
            .await?
            .into_vec();
        self.inner.list.commit(ticket, |cached| cached.clone_from(&orders));
        Ok(orders)
    }

    /// Load one order as the current order.
    ///
    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn fetch(&self, id: &OrderId) -> Result<Order, ApiError> {
        let ticket = self.inner.current.ticket();
        let row = self.inner.list.ticket();
        let order: Order = self
            .inner
            .api
            .send(ApiRequest::get(format!("/orders/{}", segment(id))))
            .await?;
        self.inner
            .current
            .commit(ticket, |cached| *cached = Some(order.clone()));
        self.inner.list.refresh(row, |list| {
            if let Some(slot) = list.iter_mut().find(|o| o.id == order.id) {
                slot.clone_from(&order);
            }
        });
        Ok(order)
    }

    /// Place an order. The new order becomes current and heads the list.
    ///
    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged and no order exists.
    #[instrument(skip(self, input))]
    pub async fn create(&self, input: &CreateOrderInput) -> Result<Order, ApiError> {
        let ticket = self.inner.current.ticket();
        let row = self.inner.list.ticket();
        let order: Order = self
            .inner
            .api
            .send(ApiRequest::post("/orders").json(input))
            .await?;
        info!(order_id = %order.id, total = %order.total(), "Order created");
        self.inner
            .current
            .commit(ticket, |cached| *cached = Some(order.clone()));
        self.inner.list.patch(row, |list| {
            list.retain(|o| o.id != order.id);
            list.insert(0, order.clone());
        });
        Ok(order)
    }
}
