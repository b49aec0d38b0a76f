//! Saved shipping addresses.
//!
//! At most one address is the default. Whenever the server confirms a new
//! default, the flag is cleared on every other cached address.

use std::sync::Arc;

use tracing::instrument;
use voltcart_core::AddressId;

use super::StoreError;
use super::cache::Slice;
use crate::api::wire::Listing;
use crate::api::{ApiClient, ApiRequest, segment};
use crate::error::ApiError;
use crate::types::{Address, AddressInput};

#[derive(Debug, Clone)]
pub struct AddressStore {
    inner: Arc<AddressStoreInner>,
}

#[derive(Debug)]
struct AddressStoreInner {
    api: ApiClient,
    addresses: Slice<Vec<Address>>,
}

impl AddressStore {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            inner: Arc::new(AddressStoreInner {
                api,
                addresses: Slice::default(),
            }),
        }
    }

    // =========================================================================
    // Selectors
    // =========================================================================

    #[must_use]
    pub fn list(&self) -> Vec<Address> {
        self.inner.addresses.snapshot()
    }

    #[must_use]
    pub fn get(&self, id: &AddressId) -> Option<Address> {
        self.inner
            .addresses
            .read(|list| list.iter().find(|a| &a.id == id).cloned())
    }

    #[must_use]
    pub fn default_address(&self) -> Option<Address> {
        self.inner
            .addresses
            .read(|list| list.iter().find(|a| a.is_default).cloned())
    }

    /// The checkout pre-selection: the default, else the first address.
    #[must_use]
    pub fn preferred(&self) -> Option<Address> {
        self.inner.addresses.read(|list| {
            list.iter()
                .find(|a| a.is_default)
                .or_else(|| list.first())
                .cloned()
        })
    }

    pub(crate) fn reset(&self) {
        self.inner.addresses.reset();
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn fetch(&self) -> Result<Vec<Address>, ApiError> {
        let ticket = self.inner.addresses.ticket();
        let list = self
            .inner
            .api
            .send::<Listing<Address>>(ApiRequest::get("/users/addresses"))
            .await?
            .into_vec();
        self.inner.addresses.commit(ticket, |cached| cached.clone_from(&list));
        Ok(list)
    }

    /// # Errors
    ///
    /// Returns `StoreError::Invalid` naming blank required fields (no
    /// request is sent), otherwise the API error.
    #[instrument(skip(self, input))]
    pub async fn add(&self, input: &AddressInput) -> Result<Address, StoreError> {
        validate(input)?;
        let ticket = self.inner.addresses.ticket();
        let address: Address = self
            .inner
            .api
            .send(ApiRequest::post("/users/addresses").json(input))
            .await?;
        self.inner.addresses.patch(ticket, |list| {
            if address.is_default {
                clear_default(list);
            }
            list.push(address.clone());
        });
        Ok(address)
    }

    /// # Errors
    ///
    /// Same as [`add`](Self::add).
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: &AddressId, input: &AddressInput) -> Result<Address, StoreError> {
        validate(input)?;
        let ticket = self.inner.addresses.ticket();
        let address: Address = self
            .inner
            .api
            .send(ApiRequest::put(format!("/users/addresses/{}", segment(id))).json(input))
            .await?;
        self.inner.addresses.patch(ticket, |list| {
            if address.is_default {
                clear_default(list);
            }
            match list.iter_mut().find(|a| a.id == address.id) {
                Some(slot) => *slot = address.clone(),
                None => list.push(address.clone()),
            }
        });
        Ok(address)
    }

    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &AddressId) -> Result<(), ApiError> {
        let ticket = self.inner.addresses.ticket();
        self.inner
            .api
            .send_unit(ApiRequest::delete(format!("/users/addresses/{}", segment(id))))
            .await?;
        self.inner
            .addresses
            .patch(ticket, |list| list.retain(|a| &a.id != id));
        Ok(())
    }

    /// Make `id` the only default address.
    ///
    /// # Errors
    ///
    /// Returns the API error; the cache is unchanged.
    #[instrument(skip(self))]
    pub async fn set_default(&self, id: &AddressId) -> Result<(), ApiError> {
        let ticket = self.inner.addresses.ticket();
        self.inner
            .api
            .send_unit(ApiRequest::patch(format!(
                "/users/addresses/{}/default",
                segment(id)
            )))
            .await?;
        self.inner.addresses.patch(ticket, |list| {
            for address in list.iter_mut() {
                address.is_default = &address.id == id;
            }
        });
        Ok(())
    }
}

fn validate(input: &AddressInput) -> Result<(), StoreError> {
    let missing = input.missing_fields();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(StoreError::invalid(format!(
            "Missing required address fields: {}",
            missing.join(", ")
        )))
    }
}

fn clear_default(list: &mut [Address]) {
    for address in list {
        address.is_default = false;
    }
}
