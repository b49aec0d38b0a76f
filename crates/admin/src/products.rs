//! Catalog management with image uploads.

use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use rust_decimal::Decimal;
use tracing::{info, instrument};
use voltcart_core::{CategoryId, ProductId};
use voltcart_storefront::api::segment;
use voltcart_storefront::api::wire::Listing;
use voltcart_storefront::stores::cache::Slice;
use voltcart_storefront::types::Product;
use voltcart_storefront::{ApiClient, ApiError, ApiRequest};

use crate::error::AdminError;

/// The admin table loads one large page.
pub const ADMIN_PAGE_LIMIT: u32 = 100;

/// An image file attached to a product form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Fields of the create/edit product form.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub brand: Option<String>,
    pub category: CategoryId,
    pub stock: u32,
    pub is_featured: bool,
    pub images: Vec<ImageUpload>,
}

impl ProductDraft {
    fn validate(&self) -> Result<(), AdminError> {
        if self.name.trim().is_empty() {
            return Err(AdminError::BadRequest("Product name is required".to_string()));
        }
        if self.price <= Decimal::ZERO {
            return Err(AdminError::BadRequest("Price must be greater than zero".to_string()));
        }
        Ok(())
    }

    fn into_form(self) -> Result<Form, AdminError> {
        let mut form = Form::new()
            .text("name", self.name.trim().to_string())
            .text("description", self.description)
            .text("price", self.price.normalize().to_string())
            .text("category", self.category.into_inner())
            .text("stock", self.stock.to_string())
            .text("isFeatured", self.is_featured.to_string());
        if let Some(brand) = self.brand.filter(|b| !b.trim().is_empty()) {
            form = form.text("brand", brand);
        }
        for image in self.images {
            let part = Part::bytes(image.bytes)
                .file_name(image.file_name)
                .mime_str(&image.content_type)
                .map_err(|e| AdminError::BadRequest(format!("Invalid image type: {e}")))?;
            form = form.part("images", part);
        }
        Ok(form)
    }
}

#[derive(Debug, Clone)]
pub struct ProductAdmin {
    api: ApiClient,
    products: Arc<Slice<Vec<Product>>>,
}

impl ProductAdmin {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            products: Arc::new(Slice::default()),
        }
    }

    #[must_use]
    pub fn list(&self) -> Vec<Product> {
        self.products.snapshot()
    }

    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn fetch(&self) -> Result<Vec<Product>, ApiError> {
        let ticket = self.products.ticket();
        let request = ApiRequest::get("/products")
            .query("limit", ADMIN_PAGE_LIMIT)
            .query("page", 1);
        let products = self
            .api
            .send::<Listing<Product>>(request)
            .await?
            .into_vec();
        self.products
            .commit(ticket, |cached| cached.clone_from(&products));
        Ok(products)
    }

    /// The new product heads the cached list.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::BadRequest` for an invalid draft, otherwise the
    /// API error.
    #[instrument(skip(self, draft), fields(name = %draft.name, images = draft.images.len()))]
    pub async fn create(&self, draft: ProductDraft) -> Result<Product, AdminError> {
        draft.validate()?;
        let ticket = self.products.ticket();
        let created: Product = self
            .api
            .send(ApiRequest::post("/products").multipart(draft.into_form()?))
            .await?;
        info!(product_id = %created.id, "Product created");
        self.products
            .patch(ticket, |list| list.insert(0, created.clone()));
        Ok(created)
    }

    /// # Errors
    ///
    /// Returns `AdminError::BadRequest` for an invalid draft, otherwise the
    /// API error.
    #[instrument(skip(self, draft), fields(images = draft.images.len()))]
    pub async fn update(&self, id: &ProductId, draft: ProductDraft) -> Result<Product, AdminError> {
        draft.validate()?;
        let ticket = self.products.ticket();
        let updated: Product = self
            .api
            .send(ApiRequest::put(format!("/products/{}", segment(id))).multipart(draft.into_form()?))
            .await?;
        self.products.patch(ticket, |list| {
            if let Some(slot) = list.iter_mut().find(|p| p.id == updated.id) {
                slot.clone_from(&updated);
            }
        });
        Ok(updated)
    }

    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &ProductId) -> Result<(), ApiError> {
        let ticket = self.products.ticket();
        self.api
            .send_unit(ApiRequest::delete(format!("/products/{}", segment(id))))
            .await?;
        info!(product_id = %id, "Product deleted");
        self.products
            .patch(ticket, |list| list.retain(|p| &p.id != id));
        Ok(())
    }
}
