//! Return and refund requests across all customers.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument};
use voltcart_core::{ReturnId, ReturnStatus};
use voltcart_storefront::api::segment;
use voltcart_storefront::api::wire::Listing;
use voltcart_storefront::stores::cache::Slice;
use voltcart_storefront::types::ReturnRequest;
use voltcart_storefront::{ApiClient, ApiError, ApiRequest};

/// A staff decision on a return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnDecision {
    pub status: ReturnStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_note: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub refund_amount: Option<Decimal>,
}

impl ReturnDecision {
    #[must_use]
    pub const fn new(status: ReturnStatus) -> Self {
        Self {
            status,
            admin_note: None,
            refund_amount: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReturnAdmin {
    api: ApiClient,
    requests: Arc<Slice<Vec<ReturnRequest>>>,
}

impl ReturnAdmin {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            requests: Arc::new(Slice::default()),
        }
    }

    #[must_use]
    pub fn list(&self) -> Vec<ReturnRequest> {
        self.requests.snapshot()
    }

    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn fetch(&self, status: Option<ReturnStatus>) -> Result<Vec<ReturnRequest>, ApiError> {
        let ticket = self.requests.ticket();
        let request =
            ApiRequest::get("/returns/admin/all").query_opt("status", status.map(ReturnStatus::as_str));
        let requests = self
            .api
            .send::<Listing<ReturnRequest>>(request)
            .await?
            .into_vec();
        self.requests
            .commit(ticket, |cached| cached.clone_from(&requests));
        Ok(requests)
    }

    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self, decision), fields(status = decision.status.as_str()))]
    pub async fn update_status(
        &self,
        id: &ReturnId,
        decision: &ReturnDecision,
    ) -> Result<ReturnRequest, ApiError> {
        let ticket = self.requests.ticket();
        let updated: ReturnRequest = self
            .api
            .send(ApiRequest::patch(format!("/returns/{}/status", segment(id))).json(decision))
            .await?;
        info!(return_id = %updated.id, "Return status updated");
        self.requests.patch(ticket, |list| {
            if let Some(slot) = list.iter_mut().find(|r| r.id == updated.id) {
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
    use mockito::Matcher;
    use serde_json::json;
    use voltcart_storefront::{ApiConfig, SessionHandle};

    fn admin(server: &mockito::ServerGuard) -> ReturnAdmin {
        let config = ApiConfig::new(&format!("{}/api", server.url())).unwrap();
        ReturnAdmin::new(ApiClient::new(&config, SessionHandle::in_memory()).unwrap())
    }

    #[tokio::test]
    async fn test_fetch_pending_only() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/returns/admin/all")
            .match_query(Matcher::UrlEncoded("status".into(), "pending".into()))
            .with_status(200)
            .with_body(json!({ "returns": [{ "_id": "r1", "reason": "Damaged", "order": "o1" }] }).to_string())
            .create_async()
            .await;

        let admin = admin(&server);
        let list = admin.fetch(Some(ReturnStatus::Pending)).await.unwrap();

        mock.assert_async().await;
        assert_eq!(list[0].order.as_ref().unwrap().as_str(), "o1");
    }

    #[tokio::test]
    async fn test_approve_with_refund() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/returns/admin/all")
            .with_status(200)
            .with_body(json!([{ "_id": "r1", "reason": "Damaged" }]).to_string())
            .create_async()
            .await;
        let mock = server
            .mock("PATCH", "/api/returns/r1/status")
            .match_body(Matcher::Json(json!({
                "status": "approved",
                "adminNote": "Pickup booked",
                "refundAmount": 1499.0
            })))
            .with_status(200)
            .with_body(json!({ "_id": "r1", "reason": "Damaged", "status": "approved", "refundAmount": 1499 }).to_string())
            .create_async()
            .await;

        let admin = admin(&server);
        admin.fetch(None).await.unwrap();
        let decision = ReturnDecision {
            admin_note: Some("Pickup booked".to_string()),
            refund_amount: Some(Decimal::new(1499, 0)),
            ..ReturnDecision::new(ReturnStatus::Approved)
        };
        admin.update_status(&ReturnId::new("r1"), &decision).await.unwrap();

        mock.assert_async().await;
        assert_eq!(admin.list()[0].status, ReturnStatus::Approved);
    }
}
