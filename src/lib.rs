//! # Loyverse API client
//!
//! A resilient async client for the Loyverse point-of-sale API, for services
//! that act on behalf of many merchant tenants.
//!
//! ## Overview
//!
//! This crate provides:
//! - Type-safe configuration via [`LoyverseConfig`] and [`LoyverseConfigBuilder`]
//! - Validated newtypes for OAuth credentials, URLs and tenant ids
//! - A per-client fixed-window [`RateLimiter`]
//! - Transparent access token refresh, persisted through a [`CredentialStore`]
//! - Bounded retries with `Retry-After` or exponential backoff on 429
//! - Cursor pagination over list endpoints
//! - Typed catalogue calls (categories, items, stores)
//!
//! ## Quick Start
//!
//! ```rust
//! use loyverse_api::{ClientId, ClientSecret, LoyverseConfig};
//!
//! let config = LoyverseConfig::builder()
//!     .client_id(ClientId::new("your-client-id").unwrap())
//!     .client_secret(ClientSecret::new("your-client-secret").unwrap())
//!     .build()
//!     .unwrap();
//! ```
//!
//! ## Making API Requests
//!
//! Clients are built per tenant from the tenant's stored integration. A
//! tenant that never connected Loyverse yields `None`:
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use loyverse_api::{create_client, TenantId};
//!
//! let tenant = TenantId::new("org-42")?;
//! let Some(client) = create_client(Arc::new(config), store, &tenant).await? else {
//!     return Ok(()); // not integrated
//! };
//!
//! let items = client.list_items(None).await?;
//! for item in &items {
//!     println!("{}: {} variants", item.item_name, item.variants.len());
//! }
//! ```
//!
//! ## Failure Handling
//!
//! Every call returns [`LoyverseError`]:
//!
//! - `Authentication`: refresh failed or the refreshed token was rejected;
//!   the tenant must reconnect
//! - `MaxRetries`: the API kept rate limiting or timing out
//! - `Api`: any other non-2xx response
//! - `Store`: the refreshed credential could not be persisted
//!
//! ## Design Principles
//!
//! - **No global state**: rate-limit windows and credentials live in each client
//! - **Fail-fast validation**: all newtypes validate on construction
//! - **Thread-safe**: all types are `Send + Sync`
//! - **Async-first**: designed for use with the Tokio runtime
//! - **Injectable time**: every wait goes through a [`Clock`]

pub mod auth;
pub mod clients;
pub mod clock;
pub mod config;
pub mod error;
mod factory;

// Re-export public types at crate root for convenience
pub use auth::{Credential, CredentialStore, InMemoryCredentialStore, StoredIntegration};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    BaseUrl, ClientId, ClientSecret, LoyverseConfig, LoyverseConfigBuilder, TenantId,
};
pub use error::ConfigError;
pub use factory::{create_client, create_client_with_clock};

// Re-export HTTP client types
pub use clients::{
    ApiError, AuthenticationError, HttpClient, HttpMethod, HttpRequest, HttpRequestBuilder,
    HttpResponse, InvalidHttpRequestError, LoyverseError, MaxRetriesExceededError, RateLimiter,
    RestClient,
};
