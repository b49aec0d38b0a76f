//! In-app notifications and the unread badge.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::instrument;
use voltcart_core::NotificationId;

use super::cache::{Slice, Ticket};
use crate::api::wire::Listing;
use crate::api::{ApiClient, ApiRequest, segment};
use crate::error::ApiError;
use crate::types::Notification;

/// How often a long-running client should refresh the unread badge.
pub const UNREAD_POLL_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Inbox {
    items: Vec<Notification>,
    total: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnreadCount {
    #[serde(default)]
    unread_count: u64,
}

#[derive(Debug, Clone)]
pub struct NotificationStore {
    inner: Arc<NotificationStoreInner>,
}

#[derive(Debug)]
struct NotificationStoreInner {
    api: ApiClient,
    inbox: Slice<Inbox>,
    /// Unread badge, refreshed independently of the inbox page.
    unread: Slice<u64>,
}

impl NotificationStore {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            inner: Arc::new(NotificationStoreInner {
                api,
                inbox: Slice::default(),
                unread: Slice::default(),
            }),
        }
    }

    #[must_use]
    pub fn items(&self) -> Vec<Notification> {
        self.inner.inbox.read(|inbox| inbox.items.clone())
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.inner.inbox.read(|inbox| inbox.total)
    }

    #[must_use]
    pub fn unread_count(&self) -> u64 {
        self.inner.unread.read(|count| *count)
    }

    pub(crate) fn reset(&self) {
        self.inner.inbox.reset();
        self.inner.unread.reset();
    }

    /// Load one page of notifications. The unread count is taken from the
    /// response, or counted from the page when the server omits it.
    ///
    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn fetch(&self, page: u32, limit: u32) -> Result<Vec<Notification>, ApiError> {
        let ticket = self.inner.inbox.ticket();
        let unread_ticket = self.inner.unread.ticket();
        let listing: Listing<Notification> = self
            .inner
            .api
            .send(
                ApiRequest::get("/notifications")
                    .query("page", page.max(1))
                    .query("limit", limit),
            )
            .await?;
        let reported_unread = listing.unread_count();
        let page = listing.into_page(page.max(1), limit);
        let unread_count = reported_unread
            .unwrap_or_else(|| page.items.iter().filter(|n| !n.is_read).count() as u64);

        let items = page.items.clone();
        self.inner.inbox.commit(ticket, |inbox| {
            *inbox = Inbox {
                items: page.items,
                total: page.total,
            };
        });
        self.inner
            .unread
            .commit(unread_ticket, |count| *count = unread_count);
        Ok(items)
    }

    /// Refresh only the badge count.
    ///
    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn fetch_unread_count(&self) -> Result<u64, ApiError> {
        let ticket = self.inner.unread.ticket();
        let count = self
            .inner
            .api
            .send::<UnreadCount>(ApiRequest::get("/notifications/unread-count"))
            .await?
            .unread_count;
        self.inner.unread.commit(ticket, |cached| *cached = count);
        Ok(count)
    }

    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn mark_read(&self, id: &NotificationId) -> Result<(), ApiError> {
        let (ticket, unread_ticket) = self.tickets();
        self.inner
            .api
            .send_unit(ApiRequest::patch(format!(
                "/notifications/{}/read",
                segment(id)
            )))
            .await?;
        let flipped = self.inner.inbox.patch(ticket, |inbox| {
            match inbox.items.iter_mut().find(|n| &n.id == id) {
                Some(n) if !n.is_read => {
                    n.is_read = true;
                    true
                }
                _ => false,
            }
        });
        if flipped == Some(true) {
            self.decrement_unread(unread_ticket);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn mark_all_read(&self) -> Result<(), ApiError> {
        let (ticket, unread_ticket) = self.tickets();
        self.inner
            .api
            .send_unit(ApiRequest::patch("/notifications/mark-all-read"))
            .await?;
        self.inner.inbox.patch(ticket, |inbox| {
            for n in &mut inbox.items {
                n.is_read = true;
            }
        });
        self.inner.unread.patch(unread_ticket, |count| *count = 0);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &NotificationId) -> Result<(), ApiError> {
        let (ticket, unread_ticket) = self.tickets();
        self.inner
            .api
            .send_unit(ApiRequest::delete(format!("/notifications/{}", segment(id))))
            .await?;
        let was_unread = self.inner.inbox.patch(ticket, |inbox| {
            let was_unread = inbox.items.iter().any(|n| &n.id == id && !n.is_read);
            let before = inbox.items.len();
            inbox.items.retain(|n| &n.id != id);
            if inbox.items.len() < before {
                inbox.total = inbox.total.saturating_sub(1);
            }
            was_unread
        });
        if was_unread == Some(true) {
            self.decrement_unread(unread_ticket);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn clear_all(&self) -> Result<(), ApiError> {
        let (ticket, unread_ticket) = self.tickets();
        self.inner
            .api
            .send_unit(ApiRequest::delete("/notifications"))
            .await?;
        self.inner.inbox.patch(ticket, |inbox| *inbox = Inbox::default());
        self.inner.unread.patch(unread_ticket, |count| *count = 0);
        Ok(())
    }

    fn tickets(&self) -> (Ticket, Ticket) {
        (self.inner.inbox.ticket(), self.inner.unread.ticket())
    }

    fn decrement_unread(&self, ticket: Ticket) {
        self.inner
            .unread
            .patch(ticket, |count| *count = count.saturating_sub(1));
    }
}
