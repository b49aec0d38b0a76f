//! Store-wide dashboard summary.

use std::sync::Arc;

use chrono::Month;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;
use voltcart_core::ProductId;
use voltcart_storefront::api::wire;
use voltcart_storefront::stores::cache::Slice;
use voltcart_storefront::types::Order;
use voltcart_storefront::{ApiClient, ApiError, ApiRequest};

/// Headline figures and charts for the admin home page.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardSummary {
    pub total_users: u64,
    pub total_products: u64,
    pub total_orders: u64,
    pub total_revenue: Decimal,
    pub pending_orders: u64,
    pub out_of_stock: u64,
    pub monthly_sales: Vec<MonthlySales>,
    pub order_status_breakdown: Vec<StatusCount>,
    pub top_products: Vec<TopProduct>,
    pub recent_orders: Vec<Order>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SalesPeriod {
    pub year: i32,
    pub month: u8,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySales {
    #[serde(rename = "_id")]
    pub period: SalesPeriod,
    #[serde(default)]
    pub total_sales: Decimal,
}

impl MonthlySales {
    /// Chart label such as `Mar 2026`.
    #[must_use]
    pub fn label(&self) -> String {
        let month = Month::try_from(self.period.month)
            .map_or("???", |m| m.name().get(..3).unwrap_or("???"));
        format!("{month} {}", self.period.year)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusCount {
    /// Raw status; `None` is charted as "Unknown".
    #[serde(rename = "_id", default)]
    pub status: Option<String>,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    #[serde(rename = "_id", default, deserialize_with = "wire::ref_id")]
    pub id: Option<ProductId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub total_quantity: u64,
    #[serde(default)]
    pub revenue: Decimal,
}

impl TopProduct {
    /// The name, or a short id-based placeholder for deleted products.
    #[must_use]
    pub fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        let id = self.id.as_ref().map_or("", |id| id.as_str());
        let tail = id
            .char_indices()
            .rev()
            .nth(5)
            .map_or(id, |(i, _)| id.get(i..).unwrap_or(id));
        format!("Product #{tail}")
    }
}

#[derive(Debug, Clone)]
pub struct DashboardStore {
    api: ApiClient,
    summary: Arc<Slice<Option<DashboardSummary>>>,
}

impl DashboardStore {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            summary: Arc::new(Slice::default()),
        }
    }

    #[must_use]
    pub fn summary(&self) -> Option<DashboardSummary> {
        self.summary.snapshot()
    }

    /// # Errors
    ///
    /// Returns the API error; the cached summary is unchanged.
    #[instrument(skip(self))]
    pub async fn fetch(&self) -> Result<DashboardSummary, ApiError> {
        let ticket = self.summary.ticket();
        let summary: DashboardSummary = self.api.send(ApiRequest::get("/dashboard/summary")).await?;
        self.summary
            .commit(ticket, |cached| *cached = Some(summary.clone()));
        Ok(summary)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use voltcart_storefront::{ApiConfig, SessionHandle};

    #[test]
    fn test_month_label() {
        let sales = MonthlySales {
            period: SalesPeriod { year: 2026, month: 3 },
            total_sales: Decimal::ZERO,
        };
        assert_eq!(sales.label(), "Mar 2026");
    }

    #[test]
    fn test_top_product_placeholder_name() {
        let product = TopProduct {
            id: Some(ProductId::new("65f1c2d3e4a5b6c7d8e9f0a1")),
            name: None,
            total_quantity: 4,
            revenue: Decimal::new(400, 0),
        };
        assert_eq!(product.display_name(), "Product #e9f0a1");
    }

    #[tokio::test]
    async fn test_fetch_summary() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/dashboard/summary")
            .with_status(200)
            .with_body(
                json!({
                    "totalUsers": 42,
                    "totalOrders": 17,
                    "totalRevenue": 125_000.5,
                    "outOfStock": 3,
                    "monthlySales": [{ "_id": { "year": 2026, "month": 1 }, "totalSales": 9000 }],
                    "orderStatusBreakdown": [{ "_id": "Pending", "count": 5 }, { "_id": null, "count": 1 }],
                    "topProducts": [{ "_id": "p1", "name": "Fan", "totalQuantity": 9, "revenue": 18000 }],
                    "recentOrders": [{ "_id": "o1", "totalPrice": 500, "orderStatus": "Shipped", "user": { "_id": "u1", "name": "Asha" } }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let config = ApiConfig::new(&format!("{}/api", server.url())).unwrap();
        let store = DashboardStore::new(ApiClient::new(&config, SessionHandle::in_memory()).unwrap());
        let summary = store.fetch().await.unwrap();

        assert_eq!(summary.total_users, 42);
        assert_eq!(summary.total_products, 0);
        assert_eq!(summary.monthly_sales[0].label(), "Jan 2026");
        assert!(summary.order_status_breakdown[1].status.is_none());
        assert_eq!(summary.recent_orders[0].user.as_ref().unwrap().name.as_deref(), Some("Asha"));
        assert_eq!(store.summary(), Some(summary));
    }
}
