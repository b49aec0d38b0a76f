//! Customer accounts.

use std::sync::Arc;

use tracing::{info, instrument};
use voltcart_core::UserId;
use voltcart_storefront::api::segment;
use voltcart_storefront::api::wire::Listing;
use voltcart_storefront::stores::cache::Slice;
use voltcart_storefront::types::User;
use voltcart_storefront::{ApiClient, ApiError, ApiRequest};

#[derive(Debug, Clone)]
pub struct UserAdmin {
    api: ApiClient,
    users: Arc<Slice<Vec<User>>>,
}

impl UserAdmin {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            users: Arc::new(Slice::default()),
        }
    }

    #[must_use]
    pub fn list(&self) -> Vec<User> {
        self.users.snapshot()
    }

    /// Case-insensitive match on name or email; a blank term matches all.
    #[must_use]
    pub fn search(&self, term: &str) -> Vec<User> {
        let term = term.trim().to_lowercase();
        self.users.read(|users| {
            users
                .iter()
                .filter(|u| {
                    term.is_empty()
                        || u.name.to_lowercase().contains(&term)
                        || u.email.to_lowercase().contains(&term)
                })
                .cloned()
                .collect()
        })
    }

    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn fetch(&self) -> Result<Vec<User>, ApiError> {
        let ticket = self.users.ticket();
        let users = self
            .api
            .send::<Listing<User>>(ApiRequest::get("/users"))
            .await?
            .into_vec();
        self.users.commit(ticket, |cached| cached.clone_from(&users));
        Ok(users)
    }

    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn block(&self, id: &UserId) -> Result<(), ApiError> {
        self.set_blocked(id, true).await
    }

    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn unblock(&self, id: &UserId) -> Result<(), ApiError> {
        self.set_blocked(id, false).await
    }

    async fn set_blocked(&self, id: &UserId, blocked: bool) -> Result<(), ApiError> {
        let action = if blocked { "block" } else { "unblock" };
        let ticket = self.users.ticket();
        self.api
            .send_unit(ApiRequest::patch(format!("/users/{}/{action}", segment(id))))
            .await?;
        info!(user_id = %id, action, "User access changed");
        self.users.patch(ticket, |users| {
            if let Some(user) = users.iter_mut().find(|u| &u.id == id) {
                user.is_blocked = blocked;
            }
        });
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use voltcart_storefront::{ApiConfig, SessionHandle};

    async fn seeded(server: &mut mockito::ServerGuard) -> UserAdmin {
        server
            .mock("GET", "/api/users")
            .with_status(200)
            .with_body(
                json!([
                    { "_id": "u1", "name": "Asha Rao", "email": "asha@example.com" },
                    { "_id": "u2", "name": "Vikram", "email": "VIK@volt.in", "isBlocked": true }
                ])
                .to_string(),
            )
            .create_async()
            .await;
        let config = ApiConfig::new(&format!("{}/api", server.url())).unwrap();
        let admin = UserAdmin::new(ApiClient::new(&config, SessionHandle::in_memory()).unwrap());
        admin.fetch().await.unwrap();
        admin
    }

    #[tokio::test]
    async fn test_search_name_or_email() {
        let mut server = mockito::Server::new_async().await;
        let admin = seeded(&mut server).await;

        assert_eq!(admin.search("asha").len(), 1);
        assert_eq!(admin.search("vik@").len(), 1);
        assert_eq!(admin.search("  ").len(), 2);
        assert!(admin.search("nobody").is_empty());
    }

    #[tokio::test]
    async fn test_block_and_unblock_flip_flag() {
        let mut server = mockito::Server::new_async().await;
        let admin = seeded(&mut server).await;
        server
            .mock("PATCH", "/api/users/u1/block")
            .with_status(200)
            .with_body(r#"{"message":"User blocked"}"#)
            .create_async()
            .await;
        server
            .mock("PATCH", "/api/users/u2/unblock")
            .with_status(200)
            .with_body(r#"{"message":"User unblocked"}"#)
            .create_async()
            .await;

        admin.block(&UserId::new("u1")).await.unwrap();
        admin.unblock(&UserId::new("u2")).await.unwrap();

        let users = admin.list();
        assert!(users[0].is_blocked);
        assert!(!users[1].is_blocked);
    }
}
