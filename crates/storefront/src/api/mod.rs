//! REST API client.
//!
//! A thin wrapper over `reqwest` with one contract: send a request, get the
//! decoded body or an [`ApiError`]. The current credential (if any) is
//! attached as a bearer header on every call. There is no retry policy.

pub mod wire;

use std::sync::Arc;

use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::multipart::Form;
use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::session::SessionHandle;

/// Correlates a request with server logs.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

// =============================================================================
// ApiRequest
// =============================================================================

enum Body {
    Empty,
    Json(Result<serde_json::Value, String>),
    Multipart(Form),
}

/// One outgoing request: method, path relative to the API root, optional
/// query pairs and body.
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Body,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: Body::Empty,
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    #[must_use]
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query pair.
    #[must_use]
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Append a query pair only when `value` is present.
    #[must_use]
    pub fn query_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// Attach a JSON body. Encoding failures surface when the request is sent.
    #[must_use]
    pub fn json(mut self, body: &impl Serialize) -> Self {
        self.body = Body::Json(serde_json::to_value(body).map_err(|e| e.to_string()));
        self
    }

    #[must_use]
    pub fn multipart(mut self, form: Form) -> Self {
        self.body = Body::Multipart(form);
        self
    }

    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Percent-encode one path segment (ids, slugs).
#[must_use]
pub fn segment(value: impl AsRef<str>) -> String {
    urlencoding::encode(value.as_ref()).into_owned()
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the storefront REST API.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    session: SessionHandle,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("session", &self.inner.session)
            .finish_non_exhaustive()
    }
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl ApiClient {
    /// Create a client bound to `session`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &ApiConfig, session: SessionHandle) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
                session,
            }),
        })
    }

    #[must_use]
    pub fn session(&self) -> &SessionHandle {
        &self.inner.session
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Resolve a path against the API root and append query pairs.
    fn url(&self, path: &str, query: &[(String, String)]) -> Result<Url, ApiError> {
        let mut url = self
            .inner
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::encode(format!("invalid path '{path}': {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Send a request and decode the response body as `T`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] for transport failures, non-2xx responses
    /// (with the server's `message` when present), and undecodable bodies.
    #[instrument(
        skip(self, request),
        fields(method = %request.method, path = %request.path, status)
    )]
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let (status, text) = self.execute(request).await?;
        serde_json::from_str(&text).map_err(|e| {
            warn!(
                error = %e,
                body = %text.chars().take(500).collect::<String>(),
                "Failed to decode API response"
            );
            ApiError::decode(status.as_u16(), e.to_string())
        })
    }

    /// Send a request whose response body is irrelevant.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send), minus decoding.
    #[instrument(
        skip(self, request),
        fields(method = %request.method, path = %request.path, status)
    )]
    pub async fn send_unit(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.execute(request).await.map(|_| ())
    }

    async fn execute(&self, request: ApiRequest) -> Result<(StatusCode, String), ApiError> {
        let url = self.url(&request.path, &request.query)?;
        let request_id = uuid::Uuid::new_v4().to_string();

        let mut builder = self
            .inner
            .client
            .request(request.method, url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .header(REQUEST_ID_HEADER, &request_id);

        if let Some(credential) = self.inner.session.credential() {
            builder = builder.bearer_auth(credential.expose_secret());
        }

        builder = match request.body {
            Body::Empty => builder,
            Body::Json(Ok(value)) => builder.json(&value),
            Body::Json(Err(e)) => return Err(ApiError::encode(e)),
            Body::Multipart(form) => builder.multipart(form),
        };

        let response = builder.send().await.map_err(|e| {
            warn!(error = %e, request_id = %request_id, "API request failed");
            ApiError::transport(e.to_string())
        })?;

        let status = response.status();
        tracing::Span::current().record("status", status.as_u16());

        let text = response.text().await.map_err(|e| {
            warn!(error = %e, request_id = %request_id, "Failed to read API response body");
            ApiError::transport(e.to_string())
        })?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|body| body.message);
            debug!(
                status = %status,
                request_id = %request_id,
                message = ?message,
                "API returned non-success status"
            );
            return Err(ApiError::server(status.as_u16(), message));
        }

        debug!(status = %status, request_id = %request_id, "API request completed");
        Ok((status, text))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::{ApiErrorKind, FALLBACK_MESSAGE};
    use crate::session::MemoryCredentialStore;
    use mockito::Matcher;
    use serde_json::json;

    fn client(server: &mockito::ServerGuard, session: SessionHandle) -> ApiClient {
        let config = ApiConfig::new(&format!("{}/api", server.url())).unwrap();
        ApiClient::new(&config, session).unwrap()
    }

    #[tokio::test]
    async fn test_attaches_bearer_and_request_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/users/profile")
            .match_header("authorization", "Bearer tok-1")
            .match_header("x-request-id", Matcher::Regex("^[0-9a-f-]{36}$".to_string()))
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let session = SessionHandle::open(MemoryCredentialStore::with_credential("tok-1")).unwrap();
        let value: serde_json::Value = client(&server, session)
            .send(ApiRequest::get("/users/profile"))
            .await
            .unwrap();

        assert_eq!(value, json!({ "ok": true }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_no_authorization_without_credential() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/products/categories")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let value: Vec<serde_json::Value> = client(&server, SessionHandle::in_memory())
            .send(ApiRequest::get("products/categories"))
            .await
            .unwrap();

        assert!(value.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_query_and_json_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/cart/add")
            .match_query(Matcher::UrlEncoded("source".into(), "quick view".into()))
            .match_body(Matcher::Json(json!({ "productId": "p1", "quantity": 2 })))
            .with_status(201)
            .with_body("{}")
            .create_async()
            .await;

        client(&server, SessionHandle::in_memory())
            .send_unit(
                ApiRequest::post("/cart/add")
                    .query("source", "quick view")
                    .json(&json!({ "productId": "p1", "quantity": 2 })),
            )
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_message_extracted_from_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/orders")
            .with_status(400)
            .with_body(r#"{"message":"Cart is empty"}"#)
            .create_async()
            .await;

        let err = client(&server, SessionHandle::in_memory())
            .send_unit(ApiRequest::post("/orders"))
            .await
            .unwrap_err();

        assert_eq!(err.message, "Cart is empty");
        assert_eq!(err.status, Some(400));
        assert_eq!(err.kind, ApiErrorKind::Server);
    }

    #[tokio::test]
    async fn test_error_without_message_uses_fallback() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/orders/my")
            .with_status(502)
            .with_body("<html>Bad Gateway</html>")
            .create_async()
            .await;

        let err = client(&server, SessionHandle::in_memory())
            .send::<serde_json::Value>(ApiRequest::get("/orders/my"))
            .await
            .unwrap_err();

        assert_eq!(err.message, FALLBACK_MESSAGE);
        assert_eq!(err.status, Some(502));
        assert!(err.is_indeterminate());
    }

    #[tokio::test]
    async fn test_undecodable_success_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/cart")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let err = client(&server, SessionHandle::in_memory())
            .send::<serde_json::Value>(ApiRequest::get("/cart"))
            .await
            .unwrap_err();

        assert_eq!(err.kind, ApiErrorKind::Decode);
        assert_eq!(err.status, Some(200));
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let config = ApiConfig::new("http://127.0.0.1:9/api").unwrap();
        let api = ApiClient::new(&config, SessionHandle::in_memory()).unwrap();

        let err = api
            .send::<serde_json::Value>(ApiRequest::get("/cart"))
            .await
            .unwrap_err();

        assert_eq!(err.kind, ApiErrorKind::Transport);
        assert_eq!(err.status, None);
        assert_eq!(err.message, FALLBACK_MESSAGE);
    }

    #[test]
    fn test_segment_encoding() {
        assert_eq!(segment("fans & lights"), "fans%20%26%20lights");
        assert_eq!(segment("abc123"), "abc123");
    }
}
