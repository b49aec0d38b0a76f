//! Saved-for-later products.

use std::sync::Arc;

use tracing::{debug, instrument};
use voltcart_core::ProductId;

use super::cache::Slice;
use crate::api::wire::{Listing, WishlistIds};
use crate::api::{ApiClient, ApiRequest, segment};
use crate::error::ApiError;
use crate::types::Product;

#[derive(Debug, Clone)]
pub struct WishlistStore {
    inner: Arc<WishlistStoreInner>,
}

#[derive(Debug)]
struct WishlistStoreInner {
    api: ApiClient,
    items: Slice<Vec<Product>>,
}

impl WishlistStore {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            inner: Arc::new(WishlistStoreInner {
                api,
                items: Slice::default(),
            }),
        }
    }

    #[must_use]
    pub fn items(&self) -> Vec<Product> {
        self.inner.items.snapshot()
    }

    #[must_use]
    pub fn contains(&self, id: &ProductId) -> bool {
        self.inner.items.read(|items| items.iter().any(|p| &p.id == id))
    }

    pub(crate) fn reset(&self) {
        self.inner.items.reset();
    }

    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn fetch(&self) -> Result<Vec<Product>, ApiError> {
        let ticket = self.inner.items.ticket();
        let items = self
            .inner
            .api
            .send::<Listing<Product>>(ApiRequest::get("/wishlist"))
            .await?
            .into_vec();
        self.inner.items.commit(ticket, |cached| cached.clone_from(&items));
        Ok(items)
    }

    /// Add a product, then re-fetch so the cache holds populated products.
    ///
    /// # Errors
    ///
    /// Returns the API error from either call.
    #[instrument(skip(self))]
    pub async fn add(&self, id: &ProductId) -> Result<Vec<Product>, ApiError> {
        self.inner
            .api
            .send_unit(ApiRequest::post(format!("/wishlist/{}", segment(id))))
            .await?;
        self.fetch().await
    }

    /// Remove a product. The cache keeps only the ids the server reports
    /// as remaining, or drops just `id` when the reply has no id list.
    ///
    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: &ProductId) -> Result<(), ApiError> {
        let ticket = self.inner.items.ticket();
        let remaining = self
            .inner
            .api
            .send::<WishlistIds>(ApiRequest::delete(format!("/wishlist/{}", segment(id))))
            .await?
            .into_ids();
        self.inner.items.patch(ticket, |items| match remaining {
            Some(ids) => items.retain(|p| ids.contains(&p.id)),
            None => {
                debug!("Wishlist removal returned no id list");
                items.retain(|p| &p.id != id);
            }
        });
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), ApiError> {
        let ticket = self.inner.items.ticket();
        self.inner
            .api
            .send_unit(ApiRequest::delete("/wishlist"))
            .await?;
        self.inner.items.patch(ticket, Vec::clear);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::session::SessionHandle;
    use serde_json::json;

    fn store(server: &mockito::ServerGuard) -> WishlistStore {
        let config = ApiConfig::new(&format!("{}/api", server.url())).unwrap();
        WishlistStore::new(ApiClient::new(&config, SessionHandle::in_memory()).unwrap())
    }

    fn products(ids: &[&str]) -> String {
        json!(ids
            .iter()
            .map(|id| json!({ "_id": id, "name": format!("Product {id}"), "price": 10 }))
            .collect::<Vec<_>>())
        .to_string()
    }

    #[tokio::test]
    async fn test_add_refetches() {
        let mut server = mockito::Server::new_async().await;
        let add = server
            .mock("POST", "/api/wishlist/p2")
            .with_status(200)
            .with_body(r#"{"wishlist":["p1","p2"]}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/wishlist")
            .with_status(200)
            .with_body(products(&["p1", "p2"]))
            .create_async()
            .await;

        let wishlist = store(&server);
        wishlist.add(&ProductId::new("p2")).await.unwrap();

        add.assert_async().await;
        assert!(wishlist.contains(&ProductId::new("p2")));
        assert_eq!(wishlist.items().len(), 2);
    }

    #[tokio::test]
    async fn test_remove_filters_by_remaining_ids() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/wishlist")
            .with_status(200)
            .with_body(products(&["p1", "p2", "p3"]))
            .create_async()
            .await;
        server
            .mock("DELETE", "/api/wishlist/p2")
            .with_status(200)
            .with_body(r#"{"message":"Removed","wishlist":["p1","p3"]}"#)
            .create_async()
            .await;

        let wishlist = store(&server);
        wishlist.fetch().await.unwrap();
        wishlist.remove(&ProductId::new("p2")).await.unwrap();

        let ids: Vec<_> = wishlist.items().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![ProductId::new("p1"), ProductId::new("p3")]);
    }

    #[tokio::test]
    async fn test_clear() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/wishlist")
            .with_status(200)
            .with_body(products(&["p1"]))
            .create_async()
            .await;
        server
            .mock("DELETE", "/api/wishlist")
            .with_status(200)
            .with_body(r#"{"message":"Cleared"}"#)
            .create_async()
            .await;

        let wishlist = store(&server);
        wishlist.fetch().await.unwrap();
        wishlist.clear().await.unwrap();
        assert!(wishlist.items().is_empty());
    }
}
