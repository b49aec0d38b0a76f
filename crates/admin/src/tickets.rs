//! Support desk: every customer's tickets.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument};
use voltcart_core::{TicketId, TicketStatus};
use voltcart_storefront::api::segment;
use voltcart_storefront::api::wire::Listing;
use voltcart_storefront::stores::cache::{Slice, Ticket};
use voltcart_storefront::types::SupportTicket;
use voltcart_storefront::{ApiClient, ApiError, ApiRequest};

use crate::error::AdminError;

#[derive(Serialize)]
struct Reply<'a> {
    message: &'a str,
}

#[derive(Serialize)]
struct StatusUpdate {
    status: TicketStatus,
}

#[derive(Debug, Default)]
struct Desk {
    tickets: Vec<SupportTicket>,
    total: u64,
}

#[derive(Debug, Clone)]
pub struct TicketAdmin {
    inner: Arc<TicketAdminInner>,
}

#[derive(Debug)]
struct TicketAdminInner {
    api: ApiClient,
    desk: Slice<Desk>,
    selected: Slice<Option<SupportTicket>>,
}

impl TicketAdmin {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            inner: Arc::new(TicketAdminInner {
                api,
                desk: Slice::default(),
                selected: Slice::default(),
            }),
        }
    }

    #[must_use]
    pub fn list(&self) -> Vec<SupportTicket> {
        self.inner.desk.read(|desk| desk.tickets.clone())
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.inner.desk.read(|desk| desk.total)
    }

    #[must_use]
    pub fn selected(&self) -> Option<SupportTicket> {
        self.inner.selected.snapshot()
    }

    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn fetch(&self, status: Option<TicketStatus>) -> Result<Vec<SupportTicket>, ApiError> {
        let ticket = self.inner.desk.ticket();
        let request =
            ApiRequest::get("/support/admin/all").query_opt("status", status.map(TicketStatus::as_str));
        let page = self
            .inner
            .api
            .send::<Listing<SupportTicket>>(request)
            .await?
            .into_page(1, 0);
        self.inner.desk.commit(ticket, |desk| {
            desk.tickets.clone_from(&page.items);
            desk.total = page.total;
        });
        Ok(page.items)
    }

    /// Load one ticket as the selection. The previous selection is cleared
    /// up front so a failed load never shows the wrong conversation.
    ///
    /// # Errors
    ///
    /// Returns the API error.
    #[instrument(skip(self))]
    pub async fn fetch_one(&self, id: &TicketId) -> Result<SupportTicket, ApiError> {
        self.inner.selected.reset();
        let ticket = self.inner.selected.ticket();
        let found: SupportTicket = self
            .inner
            .api
            .send(ApiRequest::get(format!("/support/{}", segment(id))))
            .await?;
        self.inner
            .selected
            .commit(ticket, |cached| *cached = Some(found.clone()));
        Ok(found)
    }

    /// Answer as staff.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::BadRequest` for a blank message, otherwise the
    /// API error.
    #[instrument(skip(self, message))]
    pub async fn reply(&self, id: &TicketId, message: &str) -> Result<SupportTicket, AdminError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AdminError::BadRequest("Reply cannot be empty".to_string()));
        }
        let tickets = self.tickets();
        let updated: SupportTicket = self
            .inner
            .api
            .send(ApiRequest::post(format!("/support/{}/reply", segment(id))).json(&Reply { message }))
            .await?;
        self.absorb(tickets, &updated);
        Ok(updated)
    }

    /// # Errors
    ///
    /// Returns the API error.
    #[instrument(skip(self), fields(status = status.as_str()))]
    pub async fn set_status(&self, id: &TicketId, status: TicketStatus) -> Result<SupportTicket, ApiError> {
        let tickets = self.tickets();
        let updated: SupportTicket = self
            .inner
            .api
            .send(ApiRequest::patch(format!("/support/{}/status", segment(id))).json(&StatusUpdate { status }))
            .await?;
        info!(ticket_id = %updated.id, status = updated.status.as_str(), "Ticket status changed");
        self.absorb(tickets, &updated);
        Ok(updated)
    }

    /// The server's ticket becomes the selection; the list row only takes
    /// its status.
    fn absorb(&self, (selected, row): (Ticket, Ticket), updated: &SupportTicket) {
        self.inner
            .selected
            .commit(selected, |cached| *cached = Some(updated.clone()));
        self.inner.desk.patch(row, |desk| {
            if let Some(row) = desk.tickets.iter_mut().find(|t| t.id == updated.id) {
                row.status = updated.status;
            }
        });
    }

    fn tickets(&self) -> (Ticket, Ticket) {
        (self.inner.selected.ticket(), self.inner.desk.ticket())
    }
}
