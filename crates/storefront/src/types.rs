//! Domain entities held by the stores.
//!
//! Every type here has one fixed shape. Variant server shapes (`_id` vs `id`,
//! image-as-object-or-string, populated-or-bare references) are folded in
//! during deserialization by [`crate::api::wire`], so nothing downstream
//! ever sees an optional or alternate layout.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use voltcart_core::{
    AddressId, CartItemId, CategoryId, CouponId, CurrencyCode, NotificationId, NotificationKind,
    OrderId, OrderStatus, Price, ProductId, ReturnId, ReturnStatus, TicketCategory, TicketId,
    TicketStatus, UserId, UserRole,
};

use crate::api::wire;

// =============================================================================
// Users & Addresses
// =============================================================================

/// A signed-in account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(alias = "_id")]
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_blocked: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// A user reference as embedded in orders, tickets and returns.
///
/// The server sends either a bare id or a populated `{_id, name, email}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "wire::RawRef<wire::RawCustomer>")]
pub struct Customer {
    pub id: UserId,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// A saved shipping address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(alias = "_id")]
    pub id: AddressId,
    pub full_name: String,
    pub phone: String,
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default)]
    pub is_default: bool,
}

/// Body for creating or editing an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    pub full_name: String,
    pub phone: String,
    pub address_line1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub is_default: bool,
}

impl AddressInput {
    /// Names of required fields that are blank.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("fullName", &self.full_name),
            ("phone", &self.phone),
            ("addressLine1", &self.address_line1),
            ("city", &self.city),
            ("state", &self.state),
            ("postalCode", &self.postal_code),
            ("country", &self.country),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// The address snapshot sent with, and stored on, an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: String,
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    #[serde(default = "default_country")]
    pub country: String,
}

impl From<&Address> for ShippingAddress {
    fn from(address: &Address) -> Self {
        Self {
            full_name: address.full_name.clone(),
            phone: address.phone.clone(),
            address_line1: address.address_line1.clone(),
            address_line2: address.address_line2.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            postal_code: address.postal_code.clone(),
            country: address.country.clone(),
        }
    }
}

fn default_country() -> String {
    "India".to_string()
}

// =============================================================================
// Catalog
// =============================================================================

/// A catalog category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(alias = "_id")]
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "wire::first_image")]
    pub image: Option<String>,
}

/// The category a product belongs to; only the id is guaranteed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "wire::RawRef<wire::RawCategory>")]
pub struct ProductCategory {
    pub id: CategoryId,
    pub name: Option<String>,
    pub slug: Option<String>,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "wire::RawProduct", rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub brand: Option<String>,
    pub category: Option<ProductCategory>,
    pub images: Vec<String>,
    pub stock: u32,
    pub rating: Option<f64>,
    pub num_reviews: u32,
    pub is_featured: bool,
}

impl Product {
    #[must_use]
    pub fn price(&self) -> Price {
        Price::new(self.price, CurrencyCode::INR)
    }

    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }

    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// The product as seen from a cart line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRef {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub image: Option<String>,
    /// Unknown when the server sent an unpopulated reference.
    pub stock: Option<u32>,
}

/// A single page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            page: 1,
            limit: 0,
            total: 0,
            total_pages: 0,
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// One cart line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: CartItemId,
    pub product: ProductRef,
    /// Always at least 1.
    pub quantity: u32,
}

impl CartItem {
    #[must_use]
    pub fn line_total(&self) -> Price {
        Price::new(self.product.price, CurrencyCode::INR).times(self.quantity)
    }
}

// =============================================================================
// Orders & Payments
// =============================================================================

/// A line on a placed order; a snapshot, independent of the live product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(default, deserialize_with = "wire::ref_id")]
    pub product: Option<ProductId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default = "one")]
    pub quantity: u32,
    #[serde(default, deserialize_with = "wire::first_image")]
    pub image: Option<String>,
}

/// A placed order. Only ever replaced wholesale with a server response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(alias = "_id")]
    pub id: OrderId,
    #[serde(default)]
    pub user: Option<Customer>,
    #[serde(default, alias = "orderItems")]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
    #[serde(default)]
    pub total_price: Decimal,
    #[serde(default)]
    pub order_status: OrderStatus,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    #[must_use]
    pub fn total(&self) -> Price {
        Price::new(self.total_price, CurrencyCode::INR)
    }

    /// An order that exists server-side but was never paid and can still
    /// be paid for.
    #[must_use]
    pub fn awaits_payment(&self) -> bool {
        !self.is_paid && self.order_status != OrderStatus::Cancelled
    }
}

/// Body for creating an order from the current cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderInput {
    pub from_cart: bool,
    pub shipping_address: ShippingAddress,
}

/// Gateway-specific payment descriptor for one order; never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    #[serde(alias = "orderId")]
    pub gateway_order_id: String,
    /// Minor units (paise).
    pub amount: i64,
    pub currency: String,
    pub key: String,
}

/// Proof of payment handed back by the gateway's success handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProof {
    #[serde(rename = "razorpay_order_id")]
    pub gateway_order_id: String,
    #[serde(rename = "razorpay_payment_id")]
    pub gateway_payment_id: String,
    #[serde(rename = "razorpay_signature")]
    pub signature: String,
}

/// Server verdict on a [`PaymentProof`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Verification {
    #[serde(default)]
    pub status: String,
}

impl Verification {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

// =============================================================================
// Notifications, Support, Returns, Coupons
// =============================================================================

/// An in-app notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(alias = "_id")]
    pub id: NotificationId,
    #[serde(default, rename = "type", deserialize_with = "wire::notification_kind")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Who wrote a ticket reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReplySender {
    #[default]
    User,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketReply {
    #[serde(default)]
    pub sender: ReplySender,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A support conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportTicket {
    #[serde(alias = "_id")]
    pub id: TicketId,
    #[serde(default)]
    pub user: Option<Customer>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub category: TicketCategory,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TicketStatus,
    #[serde(default)]
    pub replies: Vec<TicketReply>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Body for opening a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTicket {
    pub subject: String,
    pub category: TicketCategory,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnItem {
    #[serde(default, deserialize_with = "wire::ref_id")]
    pub product: Option<ProductId>,
    #[serde(default)]
    pub name: String,
    #[serde(default = "one")]
    pub quantity: u32,
}

/// A return/refund request against a delivered order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequest {
    #[serde(alias = "_id")]
    pub id: ReturnId,
    #[serde(default)]
    pub user: Option<Customer>,
    #[serde(default, deserialize_with = "wire::ref_id")]
    pub order: Option<OrderId>,
    #[serde(default)]
    pub items: Vec<ReturnItem>,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: ReturnStatus,
    #[serde(default)]
    pub refund_amount: Option<Decimal>,
    #[serde(default)]
    pub admin_note: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body for submitting a return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReturn {
    pub order_id: OrderId,
    pub items: Vec<NewReturnItem>,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewReturnItem {
    pub product: ProductId,
    pub name: String,
    pub quantity: u32,
}

/// How a coupon discounts an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    #[default]
    Percentage,
    Flat,
}

/// A discount coupon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    #[serde(alias = "_id")]
    pub id: CouponId,
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub discount_type: DiscountType,
    #[serde(default)]
    pub discount_value: Decimal,
    #[serde(default)]
    pub min_order_amount: Decimal,
    #[serde(default)]
    pub max_discount: Option<Decimal>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "yes")]
    pub is_active: bool,
}

/// Result of validating a coupon code against an order total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponQuote {
    #[serde(alias = "couponId")]
    pub coupon_id: CouponId,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub final_total: Option<Decimal>,
}

const fn one() -> u32 {
    1
}

const fn yes() -> bool {
    true
}
