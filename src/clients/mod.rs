//! HTTP client types for Loyverse API communication.
//!
//! This module provides the client layer for authenticated requests against
//! the Loyverse API: rate limiting, token refresh, bounded retries and
//! pagination.
//!
//! # Overview
//!
//! - [`HttpClient`]: the request executor
//! - [`HttpRequest`]: a request to be sent to the API
//! - [`HttpResponse`]: a parsed response from the API
//! - [`HttpMethod`]: supported HTTP methods (GET, POST, PUT, DELETE)
//! - [`RateLimiter`]: the per-client fixed-window request quota
//! - [`rest::RestClient`]: the REST client built on top of [`HttpClient`]
//! - [`LoyverseError`]: the error returned by every client call
//!
//! # Retry Behavior
//!
//! - **401 (Unauthorized)**: the access token is refreshed once and the
//!   request resent; a second 401 is an [`AuthenticationError`]
//! - **429 (Rate Limited)**: waits `Retry-After` seconds, or
//!   `base_delay × 2^retries`, up to `max_retries` times
//! - **Timeouts**: handled like a 429 without `Retry-After`
//! - **Other errors**: returned immediately as [`ApiError`]

pub(crate) mod errors;
mod http_client;
mod http_request;
mod http_response;
mod rate_limit;
pub mod rest;

pub use errors::{
    ApiError, AuthenticationError, InvalidHttpRequestError, LoyverseError,
    MaxRetriesExceededError,
};
pub use http_client::{HttpClient, SDK_VERSION};
pub use http_request::{HttpMethod, HttpRequest, HttpRequestBuilder};
pub use http_response::HttpResponse;
pub use rate_limit::{RateLimitWindow, RateLimiter};

// Re-export REST client types at the clients module level
pub use rest::RestClient;
