//! VoltCart storefront client library.
//!
//! Everything a storefront front end needs below its views:
//!
//! - [`api`] - the REST client every remote call goes through
//! - [`session`] - the signed-in user and the persisted bearer credential
//! - [`stores`] - cached, server-authoritative state per entity family
//! - [`checkout`] - the cart-to-payment state machine
//!
//! ```no_run
//! use voltcart_storefront::{ApiClient, ClientConfig, SessionHandle, Stores};
//! use voltcart_storefront::session::FileCredentialStore;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env()?;
//! let session = SessionHandle::open(FileCredentialStore::new(&config.credential_path))?;
//! let api = ApiClient::new(&config.api, session)?;
//! let stores = Stores::new(&api);
//! stores.auth.init().await?;
//! stores.cart.fetch().await?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod checkout;
pub mod config;
pub mod error;
pub mod session;
pub mod stores;
pub mod types;

pub use api::{ApiClient, ApiRequest};
pub use checkout::{CheckoutError, CheckoutOrchestrator, CheckoutOutcome, CheckoutState, StatusRoute};
pub use config::{ApiConfig, CheckoutConfig, ClientConfig, ConfigError};
pub use error::{ApiError, ApiErrorKind};
pub use session::{SessionError, SessionHandle};
pub use stores::{StoreError, Stores};
