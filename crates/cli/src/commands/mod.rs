//! Subcommand implementations and the state they share.

pub mod account;
pub mod admin;
pub mod cart;
pub mod catalog;
pub mod load;
pub mod notifications;
pub mod orders;

use thiserror::Error;
use voltcart_admin::AdminError;
use voltcart_storefront::session::FileCredentialStore;
use voltcart_storefront::types::User;
use voltcart_storefront::{
    ApiClient, ApiError, ClientConfig, SessionError, SessionHandle, StoreError, Stores,
};

/// Errors that end a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Not signed in. Run `vc login` first.")]
    NotSignedIn,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Admin(#[from] AdminError),
}

impl CliError {
    /// Log the failure; unexpected server faults also go to Sentry.
    pub fn report(&self) {
        match self {
            Self::Admin(e) => e.report(),
            Self::Api(e) | Self::Store(StoreError::Api(e)) if e.status.is_none_or(|s| s >= 500) => {
                let event_id = sentry::capture_error(e);
                tracing::error!(error = %e, sentry_event_id = %event_id, "Command failed");
            }
            _ => tracing::error!("{self}"),
        }
    }
}

/// One API client, session and store set for the life of a command.
pub struct Context {
    pub api: ApiClient,
    pub stores: Stores,
}

impl Context {
    /// # Errors
    ///
    /// Returns an error if the stored credential cannot be read or the HTTP
    /// client cannot be built.
    pub fn open(config: &ClientConfig) -> Result<Self, CliError> {
        let session = SessionHandle::open(FileCredentialStore::new(&config.credential_path))?;
        let api = ApiClient::new(&config.api, session)?;
        let stores = Stores::new(&api);
        Ok(Self { api, stores })
    }

    /// Rehydrate the stored session.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::NotSignedIn`] without a credential, or the profile
    /// call's error (the credential is dropped in that case).
    pub async fn require_user(&self) -> Result<User, CliError> {
        self.stores.auth.init().await?.ok_or(CliError::NotSignedIn)
    }
}
