//! Domain stores: one cached slice of remote state per entity family.
//!
//! Every operation either updates its own slice and returns the new data,
//! or leaves the slice untouched and returns the error. Stores never reach
//! into each other's caches; the checkout orchestrator is the only
//! component that sequences several of them.

pub mod addresses;
pub mod auth;
pub mod cache;
pub mod cart;
pub mod coupons;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod returns;
pub mod support;
pub mod wishlist;

use thiserror::Error;
use tracing::info;

use crate::api::ApiClient;
use crate::error::ApiError;

pub use addresses::AddressStore;
pub use auth::{AuthStore, Registration};
pub use cart::CartStore;
pub use coupons::CouponStore;
pub use notifications::{NotificationStore, UNREAD_POLL_INTERVAL};
pub use orders::OrderStore;
pub use products::{ProductQuery, ProductSort, ProductStore};
pub use returns::ReturnStore;
pub use support::SupportStore;
pub use wishlist::WishlistStore;

/// Failure of a store operation.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Rejected locally before any request was sent.
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl StoreError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// Every customer-facing store over one API client and session.
#[derive(Debug, Clone)]
pub struct Stores {
    pub auth: AuthStore,
    pub addresses: AddressStore,
    pub cart: CartStore,
    pub orders: OrderStore,
    pub products: ProductStore,
    pub wishlist: WishlistStore,
    pub notifications: NotificationStore,
    pub support: SupportStore,
    pub returns: ReturnStore,
    pub coupons: CouponStore,
}

impl Stores {
    #[must_use]
    pub fn new(api: &ApiClient) -> Self {
        Self {
            auth: AuthStore::new(api.clone()),
            addresses: AddressStore::new(api.clone()),
            cart: CartStore::new(api.clone()),
            orders: OrderStore::new(api.clone()),
            products: ProductStore::new(api.clone()),
            wishlist: WishlistStore::new(api.clone()),
            notifications: NotificationStore::new(api.clone()),
            support: SupportStore::new(api.clone()),
            returns: ReturnStore::new(api.clone()),
            coupons: CouponStore::new(api.clone()),
        }
    }

    /// End the session and drop every per-user cache.
    ///
    /// The catalog (products, categories) is public and survives.
    pub fn teardown(&self) {
        self.auth.logout();
        self.addresses.reset();
        self.cart.reset();
        self.orders.reset();
        self.wishlist.reset();
        self.notifications.reset();
        self.support.reset();
        self.returns.reset();
        info!("Session torn down");
    }
}
