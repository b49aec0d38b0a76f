//! Customer support tickets.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument};
use voltcart_core::TicketId;

use super::StoreError;
use super::cache::Slice;
use crate::api::wire::Listing;
use crate::api::{ApiClient, ApiRequest, segment};
use crate::error::ApiError;
use crate::types::{NewTicket, SupportTicket};

#[derive(Serialize)]
struct Reply<'a> {
    message: &'a str,
}

#[derive(Debug, Clone)]
pub struct SupportStore {
    inner: Arc<SupportStoreInner>,
}

#[derive(Debug)]
struct SupportStoreInner {
    api: ApiClient,
    tickets: Slice<Vec<SupportTicket>>,
    current: Slice<Option<SupportTicket>>,
}

impl SupportStore {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            inner: Arc::new(SupportStoreInner {
                api,
                tickets: Slice::default(),
                current: Slice::default(),
            }),
        }
    }

    #[must_use]
    pub fn tickets(&self) -> Vec<SupportTicket> {
        self.inner.tickets.snapshot()
    }

    #[must_use]
    pub fn current(&self) -> Option<SupportTicket> {
        self.inner.current.snapshot()
    }

    pub(crate) fn reset(&self) {
        self.inner.tickets.reset();
        self.inner.current.reset();
    }

    /// Open a ticket; it heads the cached list.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Invalid` for a blank subject or description,
    /// otherwise the API error.
    #[instrument(skip(self, ticket), fields(category = ?ticket.category))]
    pub async fn create(&self, ticket: &NewTicket) -> Result<SupportTicket, StoreError> {
        if ticket.subject.trim().is_empty() || ticket.description.trim().is_empty() {
            return Err(StoreError::invalid("Subject and description are required"));
        }
        let slot = self.inner.tickets.ticket();
        let created: SupportTicket = self
            .inner
            .api
            .send(ApiRequest::post("/support").json(ticket))
            .await?;
        info!(ticket_id = %created.id, "Support ticket opened");
        self.inner
            .tickets
            .patch(slot, |list| list.insert(0, created.clone()));
        Ok(created)
    }

    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn fetch_mine(&self) -> Result<Vec<SupportTicket>, ApiError> {
        let ticket = self.inner.tickets.ticket();
        let tickets = self
            .inner
            .api
            .send::<Listing<SupportTicket>>(ApiRequest::get("/support"))
            .await?
            .into_vec();
        self.inner
            .tickets
            .commit(ticket, |cached| cached.clone_from(&tickets));
        Ok(tickets)
    }

    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn fetch(&self, id: &TicketId) -> Result<SupportTicket, ApiError> {
        let ticket = self.inner.current.ticket();
        let found: SupportTicket = self
            .inner
            .api
            .send(ApiRequest::get(format!("/support/{}", segment(id))))
            .await?;
        self.inner
            .current
            .commit(ticket, |cached| *cached = Some(found.clone()));
        Ok(found)
    }

    /// Post a reply. The server's updated ticket replaces the current one.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Invalid` for a blank message, otherwise the API
    /// error.
    #[instrument(skip(self, message))]
    pub async fn reply(&self, id: &TicketId, message: &str) -> Result<SupportTicket, StoreError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(StoreError::invalid("Reply cannot be empty"));
        }
        let ticket = self.inner.current.ticket();
        let row = self.inner.tickets.ticket();
        let updated: SupportTicket = self
            .inner
            .api
            .send(
                ApiRequest::post(format!("/support/{}/reply", segment(id)))
                    .json(&Reply { message }),
            )
            .await?;
        self.inner
            .current
            .commit(ticket, |cached| *cached = Some(updated.clone()));
        self.inner.tickets.patch(row, |list| {
            if let Some(slot) = list.iter_mut().find(|t| t.id == updated.id) {
                slot.clone_from(&updated);
            }
        });
        Ok(updated)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::session::SessionHandle;
    use crate::types::ReplySender;
    use mockito::Matcher;
    use serde_json::json;
    use voltcart_core::{TicketCategory, TicketStatus};

    fn store(server: &mockito::ServerGuard) -> SupportStore {
        let config = ApiConfig::new(&format!("{}/api", server.url())).unwrap();
        SupportStore::new(ApiClient::new(&config, SessionHandle::in_memory()).unwrap())
    }

    #[tokio::test]
    async fn test_create_prepends() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/support")
            .with_status(200)
            .with_body(json!([{ "_id": "t1", "subject": "Old" }]).to_string())
            .create_async()
            .await;
        let mock = server
            .mock("POST", "/api/support")
            .match_body(Matcher::Json(json!({
                "subject": "Wrong item",
                "category": "order_issue",
                "description": "Got a 6A switch instead of 16A"
            })))
            .with_status(201)
            .with_body(json!({ "_id": "t2", "subject": "Wrong item", "status": "open" }).to_string())
            .create_async()
            .await;

        let support = store(&server);
        support.fetch_mine().await.unwrap();
        support
            .create(&NewTicket {
                subject: "Wrong item".to_string(),
                category: TicketCategory::OrderIssue,
                description: "Got a 6A switch instead of 16A".to_string(),
            })
            .await
            .unwrap();

        mock.assert_async().await;
        let tickets = support.tickets();
        assert_eq!(tickets[0].id.as_str(), "t2");
        assert_eq!(tickets[0].status, TicketStatus::Open);
        assert_eq!(tickets.len(), 2);
    }

    #[tokio::test]
    async fn test_reply_replaces_current() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/support/t1/reply")
            .match_body(Matcher::Json(json!({ "message": "Any update?" })))
            .with_status(200)
            .with_body(
                json!({
                    "_id": "t1",
                    "subject": "Late delivery",
                    "status": "in_progress",
                    "replies": [
                        { "sender": "user", "message": "Any update?" },
                        { "sender": "admin", "message": "Dispatched today" }
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let support = store(&server);
        support.reply(&TicketId::new("t1"), "  Any update? ").await.unwrap();

        let current = support.current().unwrap();
        assert_eq!(current.status, TicketStatus::InProgress);
        assert_eq!(current.replies[1].sender, ReplySender::Admin);

        assert!(matches!(
            support.reply(&TicketId::new("t1"), " ").await,
            Err(StoreError::Invalid(_))
        ));
    }
}
