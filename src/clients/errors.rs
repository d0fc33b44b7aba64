//! Error types for requests against the Loyverse API.
//!
//! - [`AuthenticationError`]: token refresh failed, or the API rejected the
//!   refreshed token. The tenant has to reconnect the integration.
//! - [`ApiError`]: any other non-2xx response. Not retried.
//! - [`MaxRetriesExceededError`]: rate limiting or timeouts outlasted the
//!   retry budget.
//! - [`InvalidHttpRequestError`]: the request failed validation before sending.
//! - [`LoyverseError`]: the unified error returned by every client call.
//!
//! # Example
//!
//! ```rust,ignore
//! match client.get("items", None).await {
//!     Ok(body) => println!("{body}"),
//!     Err(LoyverseError::Authentication(e)) => {
//!         // ask the tenant to reconnect
//!     }
//!     Err(LoyverseError::MaxRetries(e)) => {
//!         println!("Gave up after {} retries", e.retries);
//!     }
//!     Err(other) => return Err(other.into()),
//! }
//! ```

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::auth::StoreError;
use crate::clients::http_response::HttpResponse;

/// Authentication with the API failed and will not be retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Authentication failed: {description}")]
pub struct AuthenticationError {
    /// Upstream error code (e.g. `invalid_grant`), when the server gave one.
    pub code: Option<String>,
    /// Human-readable description.
    pub description: String,
}

impl AuthenticationError {
    pub(crate) fn after_refresh() -> Self {
        Self {
            code: None,
            description: "authentication failed after token refresh".to_string(),
        }
    }
}

/// The API answered with a non-retryable error status.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Loyverse API error {status}: {description}")]
pub struct ApiError {
    /// HTTP status code.
    pub status: u16,
    /// Upstream error code, when present.
    pub code: Option<String>,
    /// Upstream error description, or the status reason.
    pub description: String,
    /// Value of the `X-Request-Id` header, for support requests.
    pub request_id: Option<String>,
}

impl ApiError {
    /// Extracts the upstream code and description from an error response.
    ///
    /// Understands the OAuth shape `{error, error_description}` and the
    /// REST shape `{errors: [{code, details}]}`.
    #[must_use]
    pub fn from_response(response: &HttpResponse) -> Self {
        let (code, description) = upstream_error(&response.body);
        Self {
            status: response.code,
            code,
            description: description.unwrap_or_else(|| format!("HTTP status {}", response.code)),
            request_id: response.request_id().map(String::from),
        }
    }
}

/// Pulls `(code, description)` out of an upstream error body.
pub(crate) fn upstream_error(body: &Value) -> (Option<String>, Option<String>) {
    let text = |value: Option<&Value>| value.and_then(Value::as_str).map(String::from);

    if let Some(code) = text(body.get("error")) {
        return (Some(code), text(body.get("error_description")));
    }

    if let Some(first) = body
        .get("errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
    {
        let details = text(first.get("details"));
        let field = text(first.get("field"));
        let description = match (details, field) {
            (Some(details), Some(field)) => Some(format!("{details} (field: {field})")),
            (details, _) => details,
        };
        return (text(first.get("code")), description);
    }

    (None, text(body.get("raw_body")))
}

/// Retries ran out while the API kept rate limiting or timing out.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Exceeded maximum retry count of {retries} after waiting {total_delay:?}")]
pub struct MaxRetriesExceededError {
    /// Retries performed (the request was sent `retries + 1` times).
    pub retries: u32,
    /// Status of the last response, or `None` if the last send timed out.
    pub last_status: Option<u16>,
    /// Total time spent backing off.
    pub total_delay: Duration,
}

/// A request failed validation before being sent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidHttpRequestError {
    /// POST and PUT requests must carry a body.
    #[error("Cannot use {method} without specifying data.")]
    MissingBody {
        /// The HTTP method that requires a body.
        method: String,
    },

    /// The endpoint path is empty.
    #[error("Request path cannot be empty.")]
    EmptyPath,
}

/// Unified error type for every client operation.
#[derive(Debug, Error)]
pub enum LoyverseError {
    /// Token refresh failed or a refreshed token was rejected.
    #[error(transparent)]
    Authentication(#[from] AuthenticationError),

    /// Non-retryable API error.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Retry budget exhausted.
    #[error(transparent)]
    MaxRetries(#[from] MaxRetriesExceededError),

    /// Request validation failed.
    #[error(transparent)]
    InvalidRequest(#[from] InvalidHttpRequestError),

    /// Network or connection error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Reading or writing the tenant's credential failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A response body could not be decoded.
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

// Verify error types are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<LoyverseError>();
};
