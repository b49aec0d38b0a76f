//! Catalog: paginated product listing with filters, featured products,
//! categories, brands, product detail and reviews.
//!
//! Product detail and related-product lookups are cached with `moka`
//! (5-minute TTL); listings always go to the server.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, instrument};
use voltcart_core::ProductId;

use super::StoreError;
use super::cache::Slice;
use crate::api::wire::Listing;
use crate::api::{ApiClient, ApiRequest, segment};
use crate::error::ApiError;
use crate::types::{Category, Page, Product};

/// Page size used by the catalog listing.
pub const DEFAULT_PAGE_SIZE: u32 = 12;
/// Number of featured products shown on the home page.
pub const FEATURED_LIMIT: u32 = 8;

const CACHE_TTL: Duration = Duration::from_secs(300);
const CACHE_CAPACITY: u64 = 1000;

/// Listing sort order; `None` in a query means server default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductSort {
    PriceAsc,
    PriceDesc,
    Rating,
    Newest,
}

impl ProductSort {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::Rating => "rating",
            Self::Newest => "newest",
        }
    }
}

impl FromStr for ProductSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "price_asc" => Ok(Self::PriceAsc),
            "price_desc" => Ok(Self::PriceDesc),
            "rating" => Ok(Self::Rating),
            "newest" => Ok(Self::Newest),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// Active filters plus paging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    pub keyword: Option<String>,
    /// Category id or slug, as the listing endpoint accepts either.
    pub category: Option<String>,
    pub brand: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort: Option<ProductSort>,
    pub page: u32,
    pub limit: u32,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            keyword: None,
            category: None,
            brand: None,
            min_price: None,
            max_price: None,
            sort: None,
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ProductQuery {
    /// Whether any filter (not paging) is set.
    #[must_use]
    pub const fn has_filters(&self) -> bool {
        self.keyword.is_some()
            || self.category.is_some()
            || self.brand.is_some()
            || self.min_price.is_some()
            || self.max_price.is_some()
            || self.sort.is_some()
    }

    fn apply(&self, request: ApiRequest) -> ApiRequest {
        request
            .query("page", self.page)
            .query("limit", self.limit)
            .query_opt("keyword", non_blank(self.keyword.as_deref()))
            .query_opt("category", non_blank(self.category.as_deref()))
            .query_opt("brand", non_blank(self.brand.as_deref()))
            .query_opt("minPrice", self.min_price)
            .query_opt("maxPrice", self.max_price)
            .query_opt("sort", self.sort.map(ProductSort::as_str))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Product(ProductId),
    Related(ProductId),
}

#[derive(Debug, Clone)]
enum CacheValue {
    Product(Box<Product>),
    Related(Vec<Product>),
}

#[derive(Serialize)]
struct Review<'a> {
    rating: u8,
    comment: &'a str,
}

// =============================================================================
// ProductStore
// =============================================================================

#[derive(Clone)]
pub struct ProductStore {
    inner: Arc<ProductStoreInner>,
}

struct ProductStoreInner {
    api: ApiClient,
    query: RwLock<ProductQuery>,
    listing: Slice<Page<Product>>,
    featured: Slice<Vec<Product>>,
    categories: Slice<Vec<Category>>,
    brands: Slice<Vec<String>>,
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for ProductStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductStore")
            .field("query", &*self.inner.query.read())
            .field("cached_entries", &self.inner.cache.entry_count())
            .finish_non_exhaustive()
    }
}

impl ProductStore {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(CACHE_TTL)
            .build();

        Self {
            inner: Arc::new(ProductStoreInner {
                api,
                query: RwLock::new(ProductQuery::default()),
                listing: Slice::default(),
                featured: Slice::default(),
                categories: Slice::default(),
                brands: Slice::default(),
                cache,
            }),
        }
    }

    // =========================================================================
    // Selectors
    // =========================================================================

    #[must_use]
    pub fn query(&self) -> ProductQuery {
        self.inner.query.read().clone()
    }

    #[must_use]
    pub fn listing(&self) -> Page<Product> {
        self.inner.listing.snapshot()
    }

    #[must_use]
    pub fn featured(&self) -> Vec<Product> {
        self.inner.featured.snapshot()
    }

    #[must_use]
    pub fn categories(&self) -> Vec<Category> {
        self.inner.categories.snapshot()
    }

    #[must_use]
    pub fn brands(&self) -> Vec<String> {
        self.inner.brands.snapshot()
    }

    // =========================================================================
    // Filter bookkeeping
    // =========================================================================

    /// Replace the filter set and go back to page 1. Paging fields of
    /// `filters` are ignored.
    pub fn set_filters(&self, filters: ProductQuery) {
        let mut query = self.inner.query.write();
        let limit = query.limit;
        *query = ProductQuery {
            page: 1,
            limit,
            ..filters
        };
    }

    /// Drop every filter and go back to page 1.
    pub fn clear_filters(&self) {
        let mut query = self.inner.query.write();
        *query = ProductQuery {
            limit: query.limit,
            ..ProductQuery::default()
        };
    }

    /// Move to `page`, clamped to at least 1.
    pub fn set_page(&self, page: u32) {
        self.inner.query.write().page = page.max(1);
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Fetch the listing for the current filters and page.
    ///
    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    pub async fn fetch_current(&self) -> Result<Page<Product>, ApiError> {
        let query = self.query();
        self.fetch(&query).await
    }

    /// Fetch one listing page for `query`.
    ///
    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn fetch(&self, query: &ProductQuery) -> Result<Page<Product>, ApiError> {
        let ticket = self.inner.listing.ticket();
        let page = self
            .inner
            .api
            .send::<Listing<Product>>(query.apply(ApiRequest::get("/products")))
            .await?
            .into_page(query.page, query.limit);
        self.inner
            .listing
            .commit(ticket, |cached| cached.clone_from(&page));
        Ok(page)
    }

    /// Listing restricted to one category slug. Not cached in the store.
    ///
    /// # Errors
    ///
    /// Returns the API error.
    #[instrument(skip(self))]
    pub async fn by_category(&self, slug: &str, query: &ProductQuery) -> Result<Page<Product>, ApiError> {
        self.inner
            .api
            .send::<Listing<Product>>(
                query.apply(ApiRequest::get(format!("/products/by-category/{}", segment(slug)))),
            )
            .await
            .map(|listing| listing.into_page(query.page, query.limit))
    }

    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn fetch_featured(&self) -> Result<Vec<Product>, ApiError> {
        let ticket = self.inner.featured.ticket();
        let products = self
            .inner
            .api
            .send::<Listing<Product>>(
                ApiRequest::get("/products/featured").query("limit", FEATURED_LIMIT),
            )
            .await?
            .into_vec();
        self.inner
            .featured
            .commit(ticket, |cached| cached.clone_from(&products));
        Ok(products)
    }

    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn fetch_categories(&self) -> Result<Vec<Category>, ApiError> {
        let ticket = self.inner.categories.ticket();
        let categories = self
            .inner
            .api
            .send::<Listing<Category>>(ApiRequest::get("/products/categories"))
            .await?
            .into_vec();
        self.inner
            .categories
            .commit(ticket, |cached| cached.clone_from(&categories));
        Ok(categories)
    }

    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn fetch_brands(&self) -> Result<Vec<String>, ApiError> {
        let ticket = self.inner.brands.ticket();
        let brands = self
            .inner
            .api
            .send::<Listing<String>>(ApiRequest::get("/products/brands"))
            .await?
            .into_vec();
        self.inner
            .brands
            .commit(ticket, |cached| cached.clone_from(&brands));
        Ok(brands)
    }

    /// Product detail, served from cache for 5 minutes.
    ///
    /// # Errors
    ///
    /// Returns the API error (including 404 for unknown products).
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: &ProductId) -> Result<Product, ApiError> {
        let key = CacheKey::Product(id.clone());
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let product: Product = self
            .inner
            .api
            .send(ApiRequest::get(format!("/products/{}", segment(id))))
            .await?;
        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    /// Products related to `id`, served from cache for 5 minutes.
    ///
    /// # Errors
    ///
    /// Returns the API error.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn related(&self, id: &ProductId) -> Result<Vec<Product>, ApiError> {
        let key = CacheKey::Related(id.clone());
        if let Some(CacheValue::Related(products)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for related products");
            return Ok(products);
        }

        let products = self
            .inner
            .api
            .send::<Listing<Product>>(ApiRequest::get(format!(
                "/products/{}/related",
                segment(id)
            )))
            .await?
            .into_vec();
        self.inner
            .cache
            .insert(key, CacheValue::Related(products.clone()))
            .await;
        Ok(products)
    }

    /// Leave a 1-5 star review. The product's cached detail is dropped so
    /// the next read shows the new rating.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Invalid` for a rating outside 1..=5 or a blank
    /// comment (no request is sent), otherwise the API error.
    #[instrument(skip(self, comment))]
    pub async fn submit_review(
        &self,
        product_id: &ProductId,
        rating: u8,
        comment: &str,
    ) -> Result<(), StoreError> {
        if !(1..=5).contains(&rating) {
            return Err(StoreError::invalid("Rating must be between 1 and 5"));
        }
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(StoreError::invalid("Please write a short comment"));
        }

        self.inner
            .api
            .send_unit(
                ApiRequest::post(format!("/reviews/{}", segment(product_id)))
                    .json(&Review { rating, comment }),
            )
            .await?;
        self.invalidate(product_id).await;
        Ok(())
    }

    /// Drop cached detail for one product (after an admin edit or review).
    pub async fn invalidate(&self, id: &ProductId) {
        self.inner
            .cache
            .invalidate(&CacheKey::Product(id.clone()))
            .await;
        self.inner
            .cache
            .invalidate(&CacheKey::Related(id.clone()))
            .await;
    }
}
