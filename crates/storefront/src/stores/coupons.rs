//! Coupon validation at checkout.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument};
use voltcart_core::CouponId;

use super::StoreError;
use super::cache::Slice;
use crate::api::{ApiClient, ApiRequest};
use crate::error::ApiError;
use crate::types::CouponQuote;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Validate<'a> {
    code: &'a str,
    #[serde(with = "rust_decimal::serde::float")]
    order_total: Decimal,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Apply<'a> {
    coupon_id: &'a CouponId,
}

/// Holds the most recently validated quote.
#[derive(Debug, Clone)]
pub struct CouponStore {
    inner: Arc<CouponStoreInner>,
}

#[derive(Debug)]
struct CouponStoreInner {
    api: ApiClient,
    quote: Slice<Option<CouponQuote>>,
}

impl CouponStore {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            inner: Arc::new(CouponStoreInner {
                api,
                quote: Slice::default(),
            }),
        }
    }

    #[must_use]
    pub fn quote(&self) -> Option<CouponQuote> {
        self.inner.quote.snapshot()
    }

    /// Forget the validated quote (e.g. when the cart changes).
    pub fn discard(&self) {
        self.inner.quote.reset();
    }

    /// Check `code` against an order total. Codes are sent upper-cased.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Invalid` for a blank code, otherwise the API
    /// error (an unknown or expired coupon is a 4xx with the server's
    /// message). The previous quote is kept on failure.
    #[instrument(skip(self))]
    pub async fn validate(&self, code: &str, order_total: Decimal) -> Result<CouponQuote, StoreError> {
        let code = code.trim().to_uppercase();
        if code.is_empty() {
            return Err(StoreError::invalid("Enter a coupon code"));
        }
        let ticket = self.inner.quote.ticket();
        let quote: CouponQuote = self
            .inner
            .api
            .send(ApiRequest::post("/coupons/validate").json(&Validate {
                code: &code,
                order_total,
            }))
            .await?;
        self.inner
            .quote
            .commit(ticket, |cached| *cached = Some(quote.clone()));
        Ok(quote)
    }

    /// Record the coupon as used by this customer.
    ///
    /// # Errors
    ///
    /// Returns the API error.
    #[instrument(skip(self))]
    pub async fn apply(&self, coupon_id: &CouponId) -> Result<(), ApiError> {
        self.inner
            .api
            .send_unit(ApiRequest::post("/coupons/apply").json(&Apply { coupon_id }))
            .await?;
        info!(coupon_id = %coupon_id, "Coupon applied");
        Ok(())
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

    fn store(server: &mockito::ServerGuard) -> CouponStore {
        let config = ApiConfig::new(&format!("{}/api", server.url())).unwrap();
        CouponStore::new(ApiClient::new(&config, SessionHandle::in_memory()).unwrap())
    }

    #[tokio::test]
    async fn test_validate_then_apply() {
        let mut server = mockito::Server::new_async().await;
        let validate = server
            .mock("POST", "/api/coupons/validate")
            .match_body(Matcher::Json(json!({ "code": "DIWALI10", "orderTotal": 1500.0 })))
            .with_status(200)
            .with_body(r#"{"couponId":"c1","code":"DIWALI10","discount":150,"finalTotal":1350}"#)
            .create_async()
            .await;
        let apply = server
            .mock("POST", "/api/coupons/apply")
            .match_body(Matcher::Json(json!({ "couponId": "c1" })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let coupons = store(&server);
        let quote = coupons
            .validate(" diwali10 ", Decimal::new(1500, 0))
            .await
            .unwrap();
        assert_eq!(quote.discount, Decimal::new(150, 0));
        assert_eq!(coupons.quote().unwrap().final_total, Some(Decimal::new(1350, 0)));

        coupons.apply(&quote.coupon_id).await.unwrap();
        validate.assert_async().await;
        apply.assert_async().await;

        coupons.discard();
        assert!(coupons.quote().is_none());
    }

    #[tokio::test]
    async fn test_rejected_code_keeps_previous_quote() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/coupons/validate")
            .with_status(400)
            .with_body(r#"{"message":"Coupon has expired"}"#)
            .create_async()
            .await;

        let coupons = store(&server);
        let err = coupons.validate("OLD", Decimal::new(500, 0)).await.unwrap_err();
        assert_eq!(err.to_string(), "Coupon has expired");
        assert!(coupons.quote().is_none());
    }
}
