//! Raw response shapes and their normalisation into domain types.
//!
//! The backend is inconsistent about a handful of layouts. Each variant is
//! accepted here and folded into the single shape declared in
//! [`crate::types`].

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use tracing::warn;
use voltcart_core::{CartItemId, CategoryId, NotificationKind, ProductId, UserId};

use crate::types::{CartItem, Customer, Page, Product, ProductCategory, ProductRef, User};

// =============================================================================
// References & Images
// =============================================================================

/// A reference the server may or may not have populated.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawRef<T> {
    Id(String),
    Populated(T),
}

#[derive(Debug, Deserialize)]
pub struct RawIdOnly {
    #[serde(alias = "_id")]
    id: String,
}

#[derive(Debug, Deserialize)]
pub struct RawCustomer {
    #[serde(alias = "_id")]
    id: UserId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

impl From<RawRef<RawCustomer>> for Customer {
    fn from(raw: RawRef<RawCustomer>) -> Self {
        match raw {
            RawRef::Id(id) => Self {
                id: UserId::new(id),
                name: None,
                email: None,
            },
            RawRef::Populated(c) => Self {
                id: c.id,
                name: c.name,
                email: c.email,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RawCategory {
    #[serde(alias = "_id")]
    id: CategoryId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    slug: Option<String>,
}

impl From<RawRef<RawCategory>> for ProductCategory {
    fn from(raw: RawRef<RawCategory>) -> Self {
        match raw {
            RawRef::Id(id) => Self {
                id: CategoryId::new(id),
                name: None,
                slug: None,
            },
            RawRef::Populated(c) => Self {
                id: c.id,
                name: c.name,
                slug: c.slug,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawImage {
    Url(String),
    Object {
        #[serde(alias = "secure_url", alias = "src")]
        url: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawImages {
    Many(Vec<RawImage>),
    One(RawImage),
}

impl RawImages {
    fn into_urls(self) -> Vec<String> {
        let images = match self {
            Self::Many(images) => images,
            Self::One(image) => vec![image],
        };
        images
            .into_iter()
            .map(|image| match image {
                RawImage::Url(url) | RawImage::Object { url } => url,
            })
            .filter(|url| !url.trim().is_empty())
            .collect()
    }
}

/// Accept `null`, a string, an `{url}` object, or a list of either.
pub fn image_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawImages>::deserialize(deserializer)?
        .map(RawImages::into_urls)
        .unwrap_or_default())
}

/// Like [`image_list`], keeping only the first image.
pub fn first_image<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(image_list(deserializer)?.into_iter().next())
}

/// Accept a bare id, a populated object with `_id`/`id`, or `null`.
pub fn ref_id<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    Ok(
        Option::<RawRef<RawIdOnly>>::deserialize(deserializer)?.map(|raw| match raw {
            RawRef::Id(id) => T::from(id),
            RawRef::Populated(obj) => T::from(obj.id),
        }),
    )
}

/// Reply to a wishlist removal: the product ids that remain, when sent.
#[derive(Debug, Default, Deserialize)]
pub struct WishlistIds {
    #[serde(default)]
    wishlist: Option<Vec<RawRef<RawIdOnly>>>,
}

impl WishlistIds {
    pub fn into_ids(self) -> Option<Vec<ProductId>> {
        self.wishlist.map(|refs| {
            refs.into_iter()
                .map(|raw| match raw {
                    RawRef::Id(id) => ProductId::from(id),
                    RawRef::Populated(obj) => ProductId::from(obj.id),
                })
                .collect()
        })
    }
}

/// Notification `type`, falling back to `System` for unknown values.
pub fn notification_kind<'de, D>(deserializer: D) -> Result<NotificationKind, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .map_or(NotificationKind::System, |kind| NotificationKind::from_wire(&kind)))
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawBrand {
    Name(String),
    Object { name: String },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProduct {
    #[serde(alias = "_id")]
    id: ProductId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    price: Option<Decimal>,
    #[serde(default)]
    brand: Option<RawBrand>,
    #[serde(default)]
    category: Option<RawRef<RawCategory>>,
    #[serde(default, deserialize_with = "image_list")]
    images: Vec<String>,
    #[serde(default, deserialize_with = "image_list")]
    image: Vec<String>,
    #[serde(default)]
    stock: Option<i64>,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default)]
    num_reviews: Option<u32>,
    #[serde(default, alias = "featured")]
    is_featured: Option<bool>,
}

impl From<RawProduct> for Product {
    fn from(raw: RawProduct) -> Self {
        let mut images = raw.images;
        if images.is_empty() {
            images = raw.image;
        }
        Self {
            id: raw.id,
            name: raw.name.unwrap_or_default(),
            description: raw.description.unwrap_or_default(),
            price: raw.price.unwrap_or_default(),
            brand: raw.brand.map(|brand| match brand {
                RawBrand::Name(name) | RawBrand::Object { name } => name,
            }),
            category: raw.category.map(ProductCategory::from),
            images,
            stock: clamp_count(raw.stock.unwrap_or_default()),
            rating: raw.rating,
            num_reviews: raw.num_reviews.unwrap_or_default(),
            is_featured: raw.is_featured.unwrap_or_default(),
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RawCartItem {
    #[serde(alias = "_id")]
    id: CartItemId,
    #[serde(default)]
    product: Option<RawRef<Product>>,
    #[serde(default)]
    quantity: Option<i64>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    price: Option<Decimal>,
    #[serde(default, deserialize_with = "image_list")]
    image: Vec<String>,
}

impl RawCartItem {
    /// Lines whose product was deleted server-side come back as `null`;
    /// they cannot be displayed or priced and are dropped.
    fn normalize(self) -> Option<CartItem> {
        let quantity = u32::try_from(self.quantity.unwrap_or(1).max(1)).unwrap_or(u32::MAX);
        let fallback_image = self.image.into_iter().next();
        let product = match self.product {
            Some(RawRef::Populated(product)) => ProductRef {
                image: product
                    .images
                    .first()
                    .cloned()
                    .or(fallback_image),
                name: if product.name.is_empty() {
                    self.name.unwrap_or_default()
                } else {
                    product.name
                },
                price: self.price.filter(|_| product.price.is_zero()).unwrap_or(product.price),
                stock: Some(product.stock),
                id: product.id,
            },
            Some(RawRef::Id(id)) => ProductRef {
                id: ProductId::new(id),
                name: self.name.unwrap_or_default(),
                price: self.price.unwrap_or_default(),
                image: fallback_image,
                stock: None,
            },
            None => {
                warn!(item_id = %self.id, "Dropping cart line without a product");
                return None;
            }
        };
        Some(CartItem {
            id: self.id,
            product,
            quantity,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CartEnvelope {
    items: Vec<RawCartItem>,
}

/// Every cart-returning endpoint answers with one of these.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CartPayload {
    Bare(Vec<RawCartItem>),
    Wrapped { items: Vec<RawCartItem> },
    Nested { cart: CartEnvelope },
    Other(serde_json::Value),
}

impl CartPayload {
    /// The full item list, or `None` when the response carried no list.
    pub fn into_items(self) -> Option<Vec<CartItem>> {
        let raw = match self {
            Self::Bare(items) | Self::Wrapped { items } | Self::Nested { cart: CartEnvelope { items } } => {
                items
            }
            Self::Other(_) => return None,
        };
        Some(raw.into_iter().filter_map(RawCartItem::normalize).collect())
    }
}

// =============================================================================
// Users & Listings
// =============================================================================

/// `{ user: {...} }` or a bare user.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum UserPayload {
    Wrapped { user: User },
    Bare(User),
}

impl UserPayload {
    pub fn into_user(self) -> User {
        match self {
            Self::Wrapped { user } | Self::Bare(user) => user,
        }
    }
}

/// Login/register response.
#[derive(Debug, Deserialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    #[serde(
        alias = "products",
        alias = "orders",
        alias = "tickets",
        alias = "notifications",
        alias = "returns",
        alias = "users",
        alias = "coupons",
        alias = "categories",
        alias = "brands",
        alias = "wishlist",
        alias = "data"
    )]
    items: Vec<T>,
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    total_pages: Option<u32>,
    #[serde(default)]
    unread_count: Option<u64>,
}

/// A list endpoint's response: a bare array or a keyed envelope with
/// optional paging fields.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Bare(Vec<T>),
    Envelope(Envelope<T>),
}

impl<T> Listing<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Bare(items) => items,
            Self::Envelope(envelope) => envelope.items,
        }
    }

    /// Server-reported unread count, when the envelope has one.
    pub fn unread_count(&self) -> Option<u64> {
        match self {
            Self::Bare(_) => None,
            Self::Envelope(envelope) => envelope.unread_count,
        }
    }

    /// Fill in paging fields the server omitted from what was requested.
    pub fn into_page(self, requested_page: u32, requested_limit: u32) -> Page<T> {
        match self {
            Self::Bare(items) => {
                let total = items.len() as u64;
                Page {
                    items,
                    page: requested_page,
                    limit: requested_limit,
                    total,
                    total_pages: u32::from(total > 0),
                }
            }
            Self::Envelope(envelope) => {
                let total = envelope.total.unwrap_or(envelope.items.len() as u64);
                let limit = envelope.limit.unwrap_or(requested_limit);
                let total_pages = envelope.total_pages.unwrap_or_else(|| {
                    if limit == 0 {
                        u32::from(total > 0)
                    } else {
                        u32::try_from(total.div_ceil(u64::from(limit))).unwrap_or(u32::MAX)
                    }
                });
                Page {
                    items: envelope.items,
                    page: envelope.page.unwrap_or(requested_page),
                    limit,
                    total,
                    total_pages,
                }
            }
        }
    }
}

fn clamp_count(n: i64) -> u32 {
    u32::try_from(n.max(0)).unwrap_or(u32::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_image_shapes() {
        let shapes = [
            json!({ "_id": "p1", "images": ["a.jpg", "b.jpg"] }),
            json!({ "_id": "p1", "images": [{ "url": "a.jpg" }, { "url": "b.jpg" }] }),
            json!({ "_id": "p1", "images": "a.jpg" }),
            json!({ "_id": "p1", "image": { "url": "a.jpg" } }),
        ];
        for shape in shapes {
            let product: Product = serde_json::from_value(shape.clone()).unwrap();
            assert_eq!(product.primary_image(), Some("a.jpg"), "{shape}");
        }

        let bare: Product = serde_json::from_value(json!({ "id": "p2", "images": null })).unwrap();
        assert!(bare.images.is_empty());
        assert_eq!(bare.id.as_str(), "p2");
    }

    #[test]
    fn test_product_category_and_brand_shapes() {
        let populated: Product = serde_json::from_value(json!({
            "_id": "p1",
            "name": "Ceiling Fan",
            "price": 1899.5,
            "stock": -2,
            "brand": { "name": "Havells" },
            "category": { "_id": "c1", "name": "Fans", "slug": "fans" }
        }))
        .unwrap();
        let category = populated.category.unwrap();
        assert_eq!(category.id.as_str(), "c1");
        assert_eq!(category.slug.as_deref(), Some("fans"));
        assert_eq!(populated.brand.as_deref(), Some("Havells"));
        assert_eq!(populated.stock, 0);
        assert_eq!(populated.price, Decimal::new(18995, 1));

        let bare: Product = serde_json::from_value(json!({
            "_id": "p1", "category": "c1", "brand": "Polycab"
        }))
        .unwrap();
        assert_eq!(bare.category.unwrap().name, None);
        assert_eq!(bare.brand.as_deref(), Some("Polycab"));
    }

    #[test]
    fn test_cart_payload_shapes() {
        let line = json!({
            "_id": "ci1",
            "product": { "_id": "p1", "name": "Bulb", "price": 99, "images": ["b.jpg"], "stock": 5 },
            "quantity": 3
        });

        for payload in [
            json!([line.clone()]),
            json!({ "items": [line.clone()], "totalPrice": 297 }),
            json!({ "cart": { "items": [line.clone()] } }),
        ] {
            let items = serde_json::from_value::<CartPayload>(payload)
                .unwrap()
                .into_items()
                .unwrap();
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].quantity, 3);
            assert_eq!(items[0].product.image.as_deref(), Some("b.jpg"));
            assert_eq!(items[0].product.stock, Some(5));
        }

        let other = serde_json::from_value::<CartPayload>(json!({ "message": "Item removed" })).unwrap();
        assert!(other.into_items().is_none());
    }

    #[test]
    fn test_cart_line_with_unpopulated_or_missing_product() {
        let items = serde_json::from_value::<CartPayload>(json!({
            "items": [
                { "_id": "ci1", "product": "p1", "name": "Switch", "price": 45, "quantity": 0 },
                { "_id": "ci2", "product": null, "quantity": 1 }
            ]
        }))
        .unwrap()
        .into_items()
        .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].product.id.as_str(), "p1");
        assert_eq!(items[0].product.name, "Switch");
        assert_eq!(items[0].product.stock, None);
        assert_eq!(items[0].quantity, 1);
    }

    #[test]
    fn test_user_payload_shapes() {
        let wrapped: UserPayload =
            serde_json::from_value(json!({ "user": { "_id": "u1", "name": "Asha" } })).unwrap();
        assert_eq!(wrapped.into_user().name, "Asha");

        let bare: UserPayload = serde_json::from_value(json!({ "_id": "u1", "name": "Ravi" })).unwrap();
        assert_eq!(bare.into_user().name, "Ravi");
    }

    #[test]
    fn test_listing_envelope_paging() {
        let listing: Listing<Product> = serde_json::from_value(json!({
            "products": [{ "_id": "p1" }, { "_id": "p2" }],
            "page": 2,
            "limit": 2,
            "total": 5,
            "totalPages": 3
        }))
        .unwrap();
        let page = listing.into_page(1, 12);
        assert_eq!(page.items.len(), 2);
        assert_eq!((page.page, page.limit, page.total, page.total_pages), (2, 2, 5, 3));
    }

    #[test]
    fn test_listing_derives_missing_paging() {
        let listing: Listing<Product> =
            serde_json::from_value(json!({ "products": [{ "_id": "p1" }], "total": 25 })).unwrap();
        let page = listing.into_page(1, 12);
        assert_eq!(page.total_pages, 3);

        let bare: Listing<Product> = serde_json::from_value(json!([{ "_id": "p1" }])).unwrap();
        assert_eq!(bare.unread_count(), None);
        let page = bare.into_page(1, 12);
        assert_eq!((page.total, page.total_pages), (1, 1));
    }
}
