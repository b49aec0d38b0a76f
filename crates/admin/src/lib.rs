//! VoltCart back office.
//!
//! Admin-only stores built on the storefront's [`ApiClient`]. The server
//! enforces authorization; [`Admin::for_session`] only refuses to build the
//! stores for a session that is plainly not an administrator, so callers
//! fail fast instead of collecting a page of 403s.
//!
//! # Security
//!
//! Every call here is high privilege: order status changes, user blocking
//! and catalog edits go straight to production data.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod coupons;
pub mod dashboard;
pub mod error;
pub mod orders;
pub mod products;
pub mod returns;
pub mod tickets;
pub mod users;

pub use coupons::{CouponAdmin, CouponDraft};
pub use dashboard::{DashboardStore, DashboardSummary};
pub use error::AdminError;
pub use orders::OrderAdmin;
pub use products::{ImageUpload, ProductAdmin, ProductDraft};
pub use returns::{ReturnAdmin, ReturnDecision};
pub use tickets::TicketAdmin;
pub use users::UserAdmin;

use voltcart_storefront::ApiClient;

/// Every admin store over one client.
#[derive(Debug, Clone)]
pub struct Admin {
    pub dashboard: DashboardStore,
    pub users: UserAdmin,
    pub orders: OrderAdmin,
    pub products: ProductAdmin,
    pub tickets: TicketAdmin,
    pub returns: ReturnAdmin,
    pub coupons: CouponAdmin,
}

impl Admin {
    /// Build the stores for the client's signed-in administrator.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Forbidden`] when nobody is signed in or the
    /// user's role is not admin.
    pub fn for_session(api: &ApiClient) -> Result<Self, AdminError> {
        match api.session().user() {
            Some(user) if user.is_admin() => {
                tracing::debug!(user_id = %user.id, "Admin stores ready");
                Ok(Self::new(api))
            }
            Some(_) => Err(AdminError::Forbidden("Admin access required".to_string())),
            None => Err(AdminError::Forbidden("Sign in as an administrator".to_string())),
        }
    }

    fn new(api: &ApiClient) -> Self {
        Self {
            dashboard: DashboardStore::new(api.clone()),
            users: UserAdmin::new(api.clone()),
            orders: OrderAdmin::new(api.clone()),
            products: ProductAdmin::new(api.clone()),
            tickets: TicketAdmin::new(api.clone()),
            returns: ReturnAdmin::new(api.clone()),
            coupons: CouponAdmin::new(api.clone()),
        }
    }
}
