//! Normalized error type for every remote call, plus Sentry helpers.
//!
//! Whatever goes wrong below the [`ApiClient`](crate::api::ApiClient) -
//! connection failure, non-2xx status, unparsable body - reaches stores and
//! views as one shape: a human-readable `message`, the HTTP `status` when
//! there was one, and a coarse [`ApiErrorKind`].

use thiserror::Error;

/// Message shown when the response carries no usable `message` field.
pub const FALLBACK_MESSAGE: &str = "Something went wrong. Please try again.";

/// Coarse classification of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// The request never produced a response (DNS, connect, timeout, reset).
    Transport,
    /// The server answered with a non-2xx status.
    Server,
    /// A 2xx response body did not match the expected shape.
    Decode,
    /// The request body could not be encoded.
    Encode,
}

/// The uniform failure value returned by every API call.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiError {
    /// Human-readable message, safe to show verbatim.
    pub message: String,
    /// HTTP status when a response was received.
    pub status: Option<u16>,
    /// Failure classification.
    pub kind: ApiErrorKind,
    /// Underlying error text for logs; never shown to users.
    pub detail: Option<String>,
}

impl ApiError {
    /// A non-2xx response. `message` falls back to [`FALLBACK_MESSAGE`].
    #[must_use]
    pub fn server(status: u16, message: Option<String>) -> Self {
        Self {
            message: message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| FALLBACK_MESSAGE.to_string()),
            status: Some(status),
            kind: ApiErrorKind::Server,
            detail: None,
        }
    }

    /// No response was received.
    #[must_use]
    pub fn transport(detail: impl Into<String>) -> Self {
        Self {
            message: FALLBACK_MESSAGE.to_string(),
            status: None,
            kind: ApiErrorKind::Transport,
            detail: Some(detail.into()),
        }
    }

    /// A successful response whose body could not be decoded.
    #[must_use]
    pub fn decode(status: u16, detail: impl Into<String>) -> Self {
        Self {
            message: FALLBACK_MESSAGE.to_string(),
            status: Some(status),
            kind: ApiErrorKind::Decode,
            detail: Some(detail.into()),
        }
    }

    /// The request body could not be serialized.
    #[must_use]
    pub fn encode(detail: impl Into<String>) -> Self {
        Self {
            message: FALLBACK_MESSAGE.to_string(),
            status: None,
            kind: ApiErrorKind::Encode,
            detail: Some(detail.into()),
        }
    }

    /// HTTP 401.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(401)
    }

    /// Whether the outcome of the request on the server is unknown.
    ///
    /// True when the service could not be reached or could not answer in
    /// time (transport failures; 408, 429, 502, 503, 504), or when it
    /// answered 2xx with a body we could not read. Any other status is a
    /// definite answer.
    #[must_use]
    pub fn is_indeterminate(&self) -> bool {
        match self.kind {
            ApiErrorKind::Transport | ApiErrorKind::Decode => true,
            ApiErrorKind::Server => matches!(self.status, Some(408 | 429 | 502 | 503 | 504)),
            ApiErrorKind::Encode => false,
        }
    }
}

/// Add a breadcrumb for a user-visible action.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error. They are dropped when no Sentry client is bound.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, &str)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}

/// Associate subsequent Sentry events with a signed-in user.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Stop associating Sentry events with a user (logout).
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
