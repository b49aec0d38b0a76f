//! Coupon maintenance.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument};
use voltcart_core::CouponId;
use voltcart_storefront::api::segment;
use voltcart_storefront::api::wire::Listing;
use voltcart_storefront::stores::cache::Slice;
use voltcart_storefront::types::{Coupon, DiscountType};
use voltcart_storefront::{ApiClient, ApiError, ApiRequest};

use crate::error::AdminError;

/// Body for creating or editing a coupon.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponDraft {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub discount_type: DiscountType,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_value: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub min_order_amount: Decimal,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub max_discount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl CouponDraft {
    /// Codes are stored upper-case.
    fn normalized(&self) -> Result<Self, AdminError> {
        let code = self.code.trim().to_uppercase();
        if code.is_empty() {
            return Err(AdminError::BadRequest("Coupon code is required".to_string()));
        }
        if self.discount_value <= Decimal::ZERO {
            return Err(AdminError::BadRequest("Discount must be greater than zero".to_string()));
        }
        if self.discount_type == DiscountType::Percentage && self.discount_value > Decimal::ONE_HUNDRED {
            return Err(AdminError::BadRequest("Percentage discount cannot exceed 100".to_string()));
        }
        Ok(Self {
            code,
            ..self.clone()
        })
    }
}

#[derive(Debug, Clone)]
pub struct CouponAdmin {
    api: ApiClient,
    coupons: Arc<Slice<Vec<Coupon>>>,
}

impl CouponAdmin {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            coupons: Arc::new(Slice::default()),
        }
    }

    #[must_use]
    pub fn list(&self) -> Vec<Coupon> {
        self.coupons.snapshot()
    }

    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn fetch(&self) -> Result<Vec<Coupon>, ApiError> {
        let ticket = self.coupons.ticket();
        let coupons = self
            .api
            .send::<Listing<Coupon>>(ApiRequest::get("/coupons"))
            .await?
            .into_vec();
        self.coupons.commit(ticket, |cached| cached.clone_from(&coupons));
        Ok(coupons)
    }

    /// # Errors
    ///
    /// Returns `AdminError::BadRequest` for an invalid draft, otherwise the
    /// API error.
    #[instrument(skip(self, draft), fields(code = %draft.code))]
    pub async fn create(&self, draft: &CouponDraft) -> Result<Coupon, AdminError> {
        let body = draft.normalized()?;
        let ticket = self.coupons.ticket();
        let created: Coupon = self.api.send(ApiRequest::post("/coupons").json(&body)).await?;
        info!(coupon_id = %created.id, "Coupon created");
        self.coupons
            .patch(ticket, |list| list.insert(0, created.clone()));
        Ok(created)
    }

    /// # Errors
    ///
    /// Returns `AdminError::BadRequest` for an invalid draft, otherwise the
    /// API error.
    #[instrument(skip(self, draft))]
    pub async fn update(&self, id: &CouponId, draft: &CouponDraft) -> Result<Coupon, AdminError> {
        let body = draft.normalized()?;
        let ticket = self.coupons.ticket();
        let updated: Coupon = self
            .api
            .send(ApiRequest::put(format!("/coupons/{}", segment(id))).json(&body))
            .await?;
        self.coupons.patch(ticket, |list| {
            if let Some(slot) = list.iter_mut().find(|c| c.id == updated.id) {
                slot.clone_from(&updated);
            }
        });
        Ok(updated)
    }

    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &CouponId) -> Result<(), ApiError> {
        let ticket = self.coupons.ticket();
        self.api
            .send_unit(ApiRequest::delete(format!("/coupons/{}", segment(id))))
            .await?;
        self.coupons
            .patch(ticket, |list| list.retain(|c| &c.id != id));
        Ok(())
    }
}
