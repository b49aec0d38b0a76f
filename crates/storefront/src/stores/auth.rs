//! Sign-in, registration and session rehydration.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{info, instrument, warn};
use voltcart_core::Email;

use super::StoreError;
use crate::api::wire::{AuthPayload, UserPayload};
use crate::api::{ApiClient, ApiRequest};
use crate::error::{self, ApiError};
use crate::session::SessionHandle;
use crate::types::User;

const MIN_PASSWORD_LENGTH: usize = 6;

/// New-account details.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: SecretString,
}

/// Editable profile fields; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Serialize)]
struct Credentials<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    email: &'a str,
    password: &'a str,
}

/// Owns the session lifecycle.
#[derive(Debug, Clone)]
pub struct AuthStore {
    inner: Arc<AuthStoreInner>,
}

#[derive(Debug)]
struct AuthStoreInner {
    api: ApiClient,
}

impl AuthStore {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            inner: Arc::new(AuthStoreInner { api }),
        }
    }

    #[must_use]
    pub fn session(&self) -> &SessionHandle {
        self.inner.api.session()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.session().user()
    }

    /// Signed in with a rehydrated user.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session().snapshot().user.is_some()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.current_user().is_some_and(|u| u.is_admin())
    }

    /// Rehydrate the user from a stored credential.
    ///
    /// Returns `Ok(None)` when there is no credential. If the profile call
    /// fails for any reason both user and credential are cleared.
    ///
    /// # Errors
    ///
    /// Returns the profile call's error after clearing the session.
    #[instrument(skip(self))]
    pub async fn init(&self) -> Result<Option<User>, ApiError> {
        if !self.session().has_credential() {
            return Ok(None);
        }

        match self
            .inner
            .api
            .send::<UserPayload>(ApiRequest::get("/users/profile"))
            .await
        {
            Ok(payload) => {
                let user = payload.into_user();
                error::set_sentry_user(&user.id, Some(&user.email));
                self.session().set_user(user.clone());
                info!(user_id = %user.id, "Session rehydrated");
                Ok(Some(user))
            }
            Err(e) => {
                warn!(error = %e, status = ?e.status, "Session rehydration failed, signing out");
                let _ = self.session().clear();
                error::clear_sentry_user();
                Err(e)
            }
        }
    }

    /// # Errors
    ///
    /// Returns `StoreError::Invalid` for a blank name, malformed email or
    /// short password (no request is sent), otherwise the API error.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: &Registration) -> Result<User, StoreError> {
        let name = registration.name.trim();
        if name.is_empty() {
            return Err(StoreError::invalid("Name is required"));
        }
        let email = Email::parse(&registration.email).map_err(|e| StoreError::invalid(e.to_string()))?;
        let password = registration.password.expose_secret();
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(StoreError::invalid(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        let body = Credentials {
            name: Some(name),
            email: email.as_str(),
            password,
        };
        self.authenticate(ApiRequest::post("/users/register").json(&body))
            .await
    }

    /// # Errors
    ///
    /// Returns `StoreError::Invalid` for a malformed email or empty
    /// password, otherwise the API error.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<User, StoreError> {
        let email = Email::parse(email).map_err(|e| StoreError::invalid(e.to_string()))?;
        if password.expose_secret().is_empty() {
            return Err(StoreError::invalid("Password is required"));
        }

        let body = Credentials {
            name: None,
            email: email.as_str(),
            password: password.expose_secret(),
        };
        self.authenticate(ApiRequest::post("/users/login").json(&body))
            .await
    }

    async fn authenticate(&self, request: ApiRequest) -> Result<User, StoreError> {
        let payload: AuthPayload = self.inner.api.send(request).await?;
        let user = payload.user;
        if let Err(e) = self
            .session()
            .establish(user.clone(), SecretString::from(payload.token))
        {
            warn!(error = %e, "Signed in, but the credential was not persisted");
        }
        error::set_sentry_user(&user.id, Some(&user.email));
        error::add_breadcrumb("auth", "Signed in", &[("user_id", user.id.as_str())]);
        info!(user_id = %user.id, "Signed in");
        Ok(user)
    }

    /// # Errors
    ///
    /// Returns the API error; the cached user is unchanged.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        let user = self
            .inner
            .api
            .send::<UserPayload>(ApiRequest::put("/users/profile").json(update))
            .await?
            .into_user();
        self.session().set_user(user.clone());
        Ok(user)
    }

    /// Clear user and credential.
    pub fn logout(&self) {
        let _ = self.session().clear();
        error::clear_sentry_user();
        error::add_breadcrumb("auth", "Signed out", &[]);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::session::MemoryCredentialStore;
    use mockito::Matcher;
    use serde_json::json;

    fn store(server: &mockito::ServerGuard, session: SessionHandle) -> AuthStore {
        let config = ApiConfig::new(&format!("{}/api", server.url())).unwrap();
        AuthStore::new(ApiClient::new(&config, session).unwrap())
    }

    #[tokio::test]
    async fn test_init_without_credential_is_noop() {
        let server = mockito::Server::new_async().await;
        let auth = store(&server, SessionHandle::in_memory());
        assert!(auth.init().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_init_rehydrates_wrapped_user() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/users/profile")
            .match_header("authorization", "Bearer stored")
            .with_status(200)
            .with_body(r#"{"user":{"_id":"u1","name":"Asha","email":"asha@example.com"}}"#)
            .create_async()
            .await;

        let session = SessionHandle::open(MemoryCredentialStore::with_credential("stored")).unwrap();
        let auth = store(&server, session);

        let user = auth.init().await.unwrap().unwrap();
        assert_eq!(user.name, "Asha");
        assert!(auth.is_authenticated());
    }

    #[tokio::test]
    async fn test_init_failure_clears_both_fields() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/users/profile")
            .with_status(401)
            .with_body(r#"{"message":"Token expired"}"#)
            .create_async()
            .await;

        let session = SessionHandle::open(MemoryCredentialStore::with_credential("stale")).unwrap();
        let auth = store(&server, session.clone());

        let err = auth.init().await.unwrap_err();
        assert_eq!(err.message, "Token expired");
        let snapshot = session.snapshot();
        assert!(snapshot.user.is_none());
        assert!(snapshot.credential.is_none());
    }

    #[tokio::test]
    async fn test_login_establishes_session() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/users/login")
            .match_body(Matcher::Json(json!({ "email": "asha@example.com", "password": "hunter22" })))
            .with_status(200)
            .with_body(r#"{"token":"fresh","user":{"_id":"u1","name":"Asha","email":"asha@example.com"}}"#)
            .create_async()
            .await;

        let session = SessionHandle::in_memory();
        let auth = store(&server, session.clone());
        let user = auth
            .login(" asha@example.com ", &SecretString::from("hunter22".to_string()))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(user.id.as_str(), "u1");
        assert_eq!(session.credential().unwrap().expose_secret(), "fresh");
    }

    #[tokio::test]
    async fn test_register_validates_locally() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/users/register")
            .expect(0)
            .create_async()
            .await;
        let auth = store(&server, SessionHandle::in_memory());

        let short = Registration {
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            password: SecretString::from("123".to_string()),
        };
        assert!(matches!(
            auth.register(&short).await,
            Err(StoreError::Invalid(_))
        ));

        let bad_email = Registration {
            email: "asha-at-example".to_string(),
            password: SecretString::from("longenough".to_string()),
            ..short
        };
        assert!(matches!(
            auth.register(&bad_email).await,
            Err(StoreError::Invalid(_))
        ));

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_logout_clears_session() {
        let server = mockito::Server::new_async().await;
        let session = SessionHandle::open(MemoryCredentialStore::with_credential("tok")).unwrap();
        let auth = store(&server, session.clone());

        auth.logout();
        assert!(!session.has_credential());
    }
}
