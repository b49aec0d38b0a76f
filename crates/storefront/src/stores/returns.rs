//! Return and refund requests.

use std::sync::Arc;

use tracing::{info, instrument};
use voltcart_core::ReturnId;

use super::StoreError;
use super::cache::Slice;
use crate::api::wire::Listing;
use crate::api::{ApiClient, ApiRequest, segment};
use crate::error::ApiError;
use crate::types::{NewReturn, ReturnRequest};

#[derive(Debug, Clone)]
pub struct ReturnStore {
    inner: Arc<ReturnStoreInner>,
}

#[derive(Debug)]
struct ReturnStoreInner {
    api: ApiClient,
    list: Slice<Vec<ReturnRequest>>,
    current: Slice<Option<ReturnRequest>>,
}

impl ReturnStore {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            inner: Arc::new(ReturnStoreInner {
                api,
                list: Slice::default(),
                current: Slice::default(),
            }),
        }
    }

    #[must_use]
    pub fn list(&self) -> Vec<ReturnRequest> {
        self.inner.list.snapshot()
    }

    #[must_use]
    pub fn current(&self) -> Option<ReturnRequest> {
        self.inner.current.snapshot()
    }

    pub(crate) fn reset(&self) {
        self.inner.list.reset();
        self.inner.current.reset();
    }

    /// # Errors
    ///
    /// Returns `StoreError::Invalid` when no items are selected, a quantity
    /// is zero or the reason is blank; otherwise the API error.
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    pub async fn submit(&self, request: &NewReturn) -> Result<ReturnRequest, StoreError> {
        if request.items.is_empty() {
            return Err(StoreError::invalid("Select at least one item to return"));
        }
        if request.items.iter().any(|i| i.quantity == 0) {
            return Err(StoreError::invalid("Return quantity must be at least 1"));
        }
        if request.reason.trim().is_empty() {
            return Err(StoreError::invalid("Please give a reason for the return"));
        }

        let ticket = self.inner.list.ticket();
        let created: ReturnRequest = self
            .inner
            .api
            .send(ApiRequest::post("/returns").json(request))
            .await?;
        info!(return_id = %created.id, "Return requested");
        self.inner
            .list
            .patch(ticket, |list| list.insert(0, created.clone()));
        Ok(created)
    }

    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn fetch_mine(&self) -> Result<Vec<ReturnRequest>, ApiError> {
        let ticket = self.inner.list.ticket();
        let list = self
            .inner
            .api
            .send::<Listing<ReturnRequest>>(ApiRequest::get("/returns"))
            .await?
            .into_vec();
        self.inner.list.commit(ticket, |cached| cached.clone_from(&list));
        Ok(list)
    }

    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn fetch(&self, id: &ReturnId) -> Result<ReturnRequest, ApiError> {
        let ticket = self.inner.current.ticket();
        let found: ReturnRequest = self
            .inner
            .api
            .send(ApiRequest::get(format!("/returns/{}", segment(id))))
            .await?;
        self.inner
            .current
            .commit(ticket, |cached| *cached = Some(found.clone()));
        Ok(found)
    }
}
