//! Configuration types for the Loyverse API client.
//!
//! # Overview
//!
//! - [`LoyverseConfig`]: OAuth credentials, endpoints and client tuning
//! - [`LoyverseConfigBuilder`]: builder for [`LoyverseConfig`]
//! - [`ClientId`], [`ClientSecret`]: validated OAuth app credentials
//! - [`BaseUrl`]: a validated http(s) base URL
//! - [`TenantId`]: the tenant a client acts on behalf of
//!
//! # Example
//!
//! ```rust
//! use loyverse_api::{ClientId, ClientSecret, LoyverseConfig};
//!
//! let config = LoyverseConfig::builder()
//!     .client_id(ClientId::new("my-client-id").unwrap())
//!     .client_secret(ClientSecret::new("my-secret").unwrap())
//!     .requests_per_minute(30)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.requests_per_minute(), 30);
//! assert_eq!(config.page_limit(), 250);
//! ```

mod newtypes;

pub use newtypes::{BaseUrl, ClientId, ClientSecret, TenantId};

use std::time::Duration;

use crate::error::ConfigError;

/// Default versioned REST base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.loyverse.com/v1.0";

/// Default OAuth token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://api.loyverse.com/oauth/token";

/// Default request quota per rate-limit window.
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 60;

/// Default number of retries after a 429 or a timed-out send.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_LIMIT: u32 = 250;

/// Upper bound the API accepts for `limit`.
pub const MAX_PAGE_LIMIT: u32 = 250;

const ENV_CLIENT_ID: &str = "LOYVERSE_CLIENT_ID";
const ENV_CLIENT_SECRET: &str = "LOYVERSE_CLIENT_SECRET";
const ENV_API_BASE_URL: &str = "LOYVERSE_API_BASE_URL";
const ENV_TOKEN_URL: &str = "LOYVERSE_TOKEN_URL";

/// Configuration shared by every tenant client.
///
/// Holds the OAuth app credentials used for token refresh, the API and token
/// endpoints, and the rate-limit/retry/timeout tuning.
///
/// # Thread Safety
///
/// `LoyverseConfig` is `Clone`, `Send` and `Sync`; one instance is usually
/// shared by all tenant clients of a process.
#[derive(Clone, Debug)]
pub struct LoyverseConfig {
    client_id: ClientId,
    client_secret: ClientSecret,
    api_base_url: BaseUrl,
    token_url: BaseUrl,
    requests_per_minute: u32,
    rate_limit_window: Duration,
    max_retries: u32,
    base_delay: Duration,
    request_timeout: Duration,
    page_limit: u32,
    user_agent_prefix: Option<String>,
}

impl LoyverseConfig {
    /// Creates a new builder for constructing a `LoyverseConfig`.
    #[must_use]
    pub fn builder() -> LoyverseConfigBuilder {
        LoyverseConfigBuilder::new()
    }

    /// Builds a configuration from `LOYVERSE_*` environment variables.
    ///
    /// `LOYVERSE_CLIENT_ID` and `LOYVERSE_CLIENT_SECRET` are required;
    /// `LOYVERSE_API_BASE_URL` and `LOYVERSE_TOKEN_URL` override the
    /// default endpoints when set. Everything else keeps its default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when a required variable is
    /// unset, or the validation error of the offending value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let client_id = lookup(ENV_CLIENT_ID).ok_or(ConfigError::MissingEnvVar {
            name: ENV_CLIENT_ID,
        })?;
        let client_secret = lookup(ENV_CLIENT_SECRET).ok_or(ConfigError::MissingEnvVar {
            name: ENV_CLIENT_SECRET,
        })?;

        let mut builder = Self::builder()
            .client_id(ClientId::new(client_id)?)
            .client_secret(ClientSecret::new(client_secret)?);

        if let Some(url) = lookup(ENV_API_BASE_URL) {
            builder = builder.api_base_url(BaseUrl::new(url)?);
        }
        if let Some(url) = lookup(ENV_TOKEN_URL) {
            builder = builder.token_url(BaseUrl::new(url)?);
        }

        builder.build()
    }

    /// Returns the OAuth client id.
    #[must_use]
    pub const fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    /// Returns the OAuth client secret.
    #[must_use]
    pub const fn client_secret(&self) -> &ClientSecret {
        &self.client_secret
    }

    /// Returns the versioned REST base URL.
    #[must_use]
    pub const fn api_base_url(&self) -> &BaseUrl {
        &self.api_base_url
    }

    /// Returns the OAuth token endpoint.
    #[must_use]
    pub const fn token_url(&self) -> &BaseUrl {
        &self.token_url
    }

    /// Returns the request quota per rate-limit window.
    #[must_use]
    pub const fn requests_per_minute(&self) -> u32 {
        self.requests_per_minute
    }

    /// Returns the rate-limit window length.
    #[must_use]
    pub const fn rate_limit_window(&self) -> Duration {
        self.rate_limit_window
    }

    /// Returns the maximum number of retries after a 429 or timeout.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the base delay for exponential backoff.
    #[must_use]
    pub const fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Returns the timeout applied to each network send.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns the `limit` sent with every page request.
    #[must_use]
    pub const fn page_limit(&self) -> u32 {
        self.page_limit
    }

    /// Returns the user agent prefix, if configured.
    #[must_use]
    pub fn user_agent_prefix(&self) -> Option<&str> {
        self.user_agent_prefix.as_deref()
    }
}

// Verify LoyverseConfig is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<LoyverseConfig>();
};

/// Builder for [`LoyverseConfig`].
///
/// `client_id` and `client_secret` are required.
///
/// # Defaults
///
/// - `api_base_url`: [`DEFAULT_API_BASE_URL`]
/// - `token_url`: [`DEFAULT_TOKEN_URL`]
/// - `requests_per_minute`: 60 per 60-second window
/// - `max_retries`: 3, `base_delay`: 1 second
/// - `request_timeout`: 30 seconds
/// - `page_limit`: 250
#[derive(Debug, Default)]
pub struct LoyverseConfigBuilder {
    client_id: Option<ClientId>,
    client_secret: Option<ClientSecret>,
    api_base_url: Option<BaseUrl>,
    token_url: Option<BaseUrl>,
    requests_per_minute: Option<u32>,
    rate_limit_window: Option<Duration>,
    max_retries: Option<u32>,
    base_delay: Option<Duration>,
    request_timeout: Option<Duration>,
    page_limit: Option<u32>,
    user_agent_prefix: Option<String>,
}

impl LoyverseConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the OAuth client id (required).
    #[must_use]
    pub fn client_id(mut self, id: ClientId) -> Self {
        self.client_id = Some(id);
        self
    }

    /// Sets the OAuth client secret (required).
    #[must_use]
    pub fn client_secret(mut self, secret: ClientSecret) -> Self {
        self.client_secret = Some(secret);
        self
    }

    /// Overrides the REST base URL.
    #[must_use]
    pub fn api_base_url(mut self, url: BaseUrl) -> Self {
        self.api_base_url = Some(url);
        self
    }

    /// Overrides the OAuth token endpoint.
    #[must_use]
    pub fn token_url(mut self, url: BaseUrl) -> Self {
        self.token_url = Some(url);
        self
    }

    /// Sets the request quota per rate-limit window.
    #[must_use]
    pub const fn requests_per_minute(mut self, quota: u32) -> Self {
        self.requests_per_minute = Some(quota);
        self
    }

    /// Sets the rate-limit window length.
    #[must_use]
    pub const fn rate_limit_window(mut self, window: Duration) -> Self {
        self.rate_limit_window = Some(window);
        self
    }

    /// Sets the maximum number of retries after a 429 or timeout.
    #[must_use]
    pub const fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Sets the base delay for exponential backoff.
    #[must_use]
    pub const fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = Some(delay);
        self
    }

    /// Sets the per-send network timeout.
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets the page size used by pagination.
    #[must_use]
    pub const fn page_limit(mut self, limit: u32) -> Self {
        self.page_limit = Some(limit);
        self
    }

    /// Sets the user agent prefix for HTTP requests.
    #[must_use]
    pub fn user_agent_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.user_agent_prefix = Some(prefix.into());
        self
    }

    /// Builds the [`LoyverseConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredField`] if the client id or
    /// secret is unset, or [`ConfigError::InvalidSetting`] if a numeric
    /// setting is out of range.
    pub fn build(self) -> Result<LoyverseConfig, ConfigError> {
        let client_id = self
            .client_id
            .ok_or(ConfigError::MissingRequiredField { field: "client_id" })?;
        let client_secret = self
            .client_secret
            .ok_or(ConfigError::MissingRequiredField {
                field: "client_secret",
            })?;

        let api_base_url = match self.api_base_url {
            Some(url) => url,
            None => BaseUrl::new(DEFAULT_API_BASE_URL)?,
        };
        let token_url = match self.token_url {
            Some(url) => url,
            None => BaseUrl::new(DEFAULT_TOKEN_URL)?,
        };

        let requests_per_minute = self
            .requests_per_minute
            .unwrap_or(DEFAULT_REQUESTS_PER_MINUTE);
        if requests_per_minute == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "requests_per_minute",
                reason: "must be greater than zero".to_string(),
            });
        }

        let rate_limit_window = self.rate_limit_window.unwrap_or(Duration::from_secs(60));
        if rate_limit_window.is_zero() {
            return Err(ConfigError::InvalidSetting {
                field: "rate_limit_window",
                reason: "must be a positive duration".to_string(),
            });
        }

        let request_timeout = self.request_timeout.unwrap_or(Duration::from_secs(30));
        if request_timeout.is_zero() {
            return Err(ConfigError::InvalidSetting {
                field: "request_timeout",
                reason: "must be a positive duration".to_string(),
            });
        }

        let page_limit = self.page_limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if page_limit == 0 || page_limit > MAX_PAGE_LIMIT {
            return Err(ConfigError::InvalidSetting {
                field: "page_limit",
                reason: format!("must be between 1 and {MAX_PAGE_LIMIT}"),
            });
        }

        Ok(LoyverseConfig {
            client_id,
            client_secret,
            api_base_url,
            token_url,
            requests_per_minute,
            rate_limit_window,
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            base_delay: self.base_delay.unwrap_or(Duration::from_secs(1)),
            request_timeout,
            page_limit,
            user_agent_prefix: self.user_agent_prefix,
        })
    }
}
