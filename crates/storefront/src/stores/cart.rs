//! Cart store.
//!
//! The server is authoritative. After every successful mutation the cached
//! item list is replaced with exactly the list the server returned; nothing
//! is merged or computed locally. When a mutation response carries no list
//! the cart is re-fetched.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, instrument};
use voltcart_core::{CartItemId, CurrencyCode, Price, ProductId};

use super::cache::{Slice, Ticket};
use crate::api::wire::CartPayload;
use crate::api::{ApiClient, ApiRequest, segment};
use crate::error::ApiError;
use crate::types::CartItem;

/// `max(1, requested)`, saturating at `u32::MAX`.
#[must_use]
pub fn clamp_quantity(requested: i64) -> u32 {
    u32::try_from(requested.max(1)).unwrap_or(u32::MAX)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddItem<'a> {
    product_id: &'a ProductId,
    quantity: u32,
}

#[derive(Serialize)]
struct SetQuantity {
    quantity: u32,
}

#[derive(Debug, Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

#[derive(Debug)]
struct CartStoreInner {
    api: ApiClient,
    items: Slice<Vec<CartItem>>,
}

impl CartStore {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            inner: Arc::new(CartStoreInner {
                api,
                items: Slice::default(),
            }),
        }
    }

    // =========================================================================
    // Selectors
    // =========================================================================

    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.inner.items.snapshot()
    }

    #[must_use]
    pub fn get(&self, id: &CartItemId) -> Option<CartItem> {
        self.inner
            .items
            .read(|items| items.iter().find(|i| &i.id == id).cloned())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.items.read(Vec::is_empty)
    }

    /// Number of lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.items.read(Vec::len)
    }

    /// Sum of quantities across lines (the badge count).
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.inner
            .items
            .read(|items| items.iter().map(|i| u64::from(i.quantity)).sum())
    }

    #[must_use]
    pub fn total(&self) -> Price {
        self.inner.items.read(|items| {
            items.iter().fold(Price::zero(CurrencyCode::INR), |acc, item| {
                Price::new(acc.amount + item.line_total().amount, acc.currency_code)
            })
        })
    }

    pub(crate) fn reset(&self) {
        self.inner.items.reset();
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// # Errors
    ///
    /// Returns the API error, or a decode error if the response has no item
    /// list; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn fetch(&self) -> Result<Vec<CartItem>, ApiError> {
        let ticket = self.inner.items.ticket();
        self.refetch(ticket).await
    }

    /// Add `quantity` (clamped to at least 1) of a product.
    ///
    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<Vec<CartItem>, ApiError> {
        let body = AddItem {
            product_id,
            quantity: clamp_quantity(quantity),
        };
        self.mutate(ApiRequest::post("/cart/add").json(&body)).await
    }

    /// Set a line's quantity, clamped to at least 1.
    ///
    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        item_id: &CartItemId,
        quantity: i64,
    ) -> Result<Vec<CartItem>, ApiError> {
        let body = SetQuantity {
            quantity: clamp_quantity(quantity),
        };
        self.mutate(ApiRequest::put(format!("/cart/item/{}", segment(item_id))).json(&body))
            .await
    }

    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, item_id: &CartItemId) -> Result<Vec<CartItem>, ApiError> {
        self.mutate(ApiRequest::delete(format!("/cart/item/{}", segment(item_id))))
            .await
    }

    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<Vec<CartItem>, ApiError> {
        self.mutate(ApiRequest::delete("/cart/clear")).await
    }

    async fn mutate(&self, request: ApiRequest) -> Result<Vec<CartItem>, ApiError> {
        let ticket = self.inner.items.ticket();
        let payload: CartPayload = self.inner.api.send(request).await?;
        match payload.into_items() {
            Some(items) => {
                self.inner
                    .items
                    .commit(ticket, |cached| cached.clone_from(&items));
                Ok(items)
            }
            None => {
                debug!("Cart mutation returned no item list, re-fetching");
                self.refetch(ticket).await
            }
        }
    }

    async fn refetch(&self, ticket: Ticket) -> Result<Vec<CartItem>, ApiError> {
        let items = self
            .inner
            .api
            .send::<CartPayload>(ApiRequest::get("/cart"))
            .await?
            .into_items()
            .ok_or_else(|| ApiError::decode(200, "cart response has no item list"))?;
        self.inner
            .items
            .commit(ticket, |cached| cached.clone_from(&items));
        Ok(items)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::session::SessionHandle;
    use mockito::Matcher;
    use serde_json::json;

    fn store(server: &mockito::ServerGuard) -> CartStore {
        let config = ApiConfig::new(&format!("{}/api", server.url())).unwrap();
        CartStore::new(ApiClient::new(&config, SessionHandle::in_memory()).unwrap())
    }

    fn line(id: &str, product: &str, price: u32, quantity: u32) -> serde_json::Value {
        json!({
            "_id": id,
            "product": { "_id": product, "name": format!("Item {product}"), "price": price, "images": [], "stock": 10 },
            "quantity": quantity
        })
    }

    #[test]
    fn test_clamp_quantity() {
        for (requested, sent) in [(-5, 1), (0, 1), (1, 1), (7, 7), (i64::MAX, u32::MAX)] {
            assert_eq!(clamp_quantity(requested), sent, "requested {requested}");
        }
    }

    #[tokio::test]
    async fn test_mutation_replaces_cache_with_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/cart")
            .with_status(200)
            .with_body(json!({ "items": [line("c1", "p1", 100, 1)] }).to_string())
            .create_async()
            .await;
        server
            .mock("POST", "/api/cart/add")
            .match_body(Matcher::Json(json!({ "productId": "p2", "quantity": 2 })))
            .with_status(200)
            // The server merged lines; the client must mirror it verbatim.
            .with_body(json!({ "items": [line("c2", "p2", 50, 2), line("c1", "p1", 100, 1)] }).to_string())
            .create_async()
            .await;

        let cart = store(&server);
        cart.fetch().await.unwrap();
        let returned = cart.add_item(&ProductId::new("p2"), 2).await.unwrap();

        assert_eq!(cart.items(), returned);
        assert_eq!(cart.items()[0].id.as_str(), "c2");
        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.total().display(), "₹200.00");
    }

    #[tokio::test]
    async fn test_update_quantity_sends_clamped_value() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/api/cart/item/c1")
            .match_body(Matcher::Json(json!({ "quantity": 1 })))
            .with_status(200)
            .with_body(json!([line("c1", "p1", 100, 1)]).to_string())
            .create_async()
            .await;

        let cart = store(&server);
        cart.update_quantity(&CartItemId::new("c1"), 0).await.unwrap();
        mock.assert_async().await;
        assert_eq!(cart.items()[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_cache() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/cart")
            .with_status(200)
            .with_body(json!([line("c1", "p1", 100, 2)]).to_string())
            .create_async()
            .await;
        server
            .mock("POST", "/api/cart/add")
            .with_status(400)
            .with_body(r#"{"message":"Insufficient stock"}"#)
            .create_async()
            .await;

        let cart = store(&server);
        cart.fetch().await.unwrap();
        let before = cart.items();

        let err = cart.add_item(&ProductId::new("p9"), 50).await.unwrap_err();
        assert_eq!(err.message, "Insufficient stock");
        assert_eq!(cart.items(), before);
    }

    #[tokio::test]
    async fn test_remove_without_list_refetches() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/api/cart/item/c1")
            .with_status(200)
            .with_body(r#"{"message":"Item removed"}"#)
            .create_async()
            .await;
        let refetch = server
            .mock("GET", "/api/cart")
            .with_status(200)
            .with_body(json!({ "items": [line("c2", "p2", 40, 1)] }).to_string())
            .create_async()
            .await;

        let cart = store(&server);
        let items = cart.remove_item(&CartItemId::new("c1")).await.unwrap();

        refetch.assert_async().await;
        assert_eq!(items.len(), 1);
        assert_eq!(cart.items()[0].id.as_str(), "c2");
    }

    #[tokio::test]
    async fn test_clear_empties_cart() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/api/cart/clear")
            .with_status(200)
            .with_body(r#"{"items":[]}"#)
            .create_async()
            .await;

        let cart = store(&server);
        cart.clear().await.unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.total().display(), "₹0.00");
    }
}
