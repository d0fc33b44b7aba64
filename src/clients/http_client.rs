//! Request executor for the Loyverse API.
//!
//! This module provides the [`HttpClient`] type, which sends one logical
//! request with rate limiting, token refresh and bounded retries.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::auth::{Credential, CredentialStore, TokenRefresher};
use crate::clients::errors::{
    ApiError, AuthenticationError, LoyverseError, MaxRetriesExceededError,
};
use crate::clients::http_request::HttpRequest;
use crate::clients::http_response::HttpResponse;
use crate::clients::rate_limit::RateLimiter;
use crate::clock::Clock;
use crate::config::{BaseUrl, LoyverseConfig, TenantId};

/// Crate version from Cargo.toml.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Retry bookkeeping for one logical request.
#[derive(Debug, Default)]
struct RetryState {
    retries: u32,
    total_delay: Duration,
    refreshed: bool,
}

/// Authenticated request executor for one tenant.
///
/// Every send attempt:
/// 1. waits for the tenant's rate limiter
/// 2. signs the request with the current bearer token
/// 3. on 401, refreshes the token once and resends
/// 4. on 429 or a timed-out send, backs off (`Retry-After` capped at the
///    rate-limit window, else `base_delay × 2^retries`) and resends, at
///    most `max_retries` times
///
/// Any other non-2xx status fails immediately with [`ApiError`].
///
/// # Thread Safety
///
/// `HttpClient` is `Send + Sync`. Concurrent calls on one client share its
/// rate limiter and credential.
#[derive(Debug)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: BaseUrl,
    default_headers: HashMap<String, String>,
    max_retries: u32,
    base_delay: Duration,
    request_timeout: Duration,
    max_retry_after: Duration,
    rate_limiter: Mutex<RateLimiter>,
    tokens: TokenRefresher,
    clock: Arc<dyn Clock>,
}

// Verify HttpClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HttpClient>();
};

impl HttpClient {
    /// Creates an executor for `tenant_id` signing with `credential`.
    ///
    /// # Errors
    ///
    /// Returns [`LoyverseError::Network`] if the TLS backend cannot be
    /// initialized.
    pub fn new(
        config: Arc<LoyverseConfig>,
        tenant_id: TenantId,
        credential: Credential,
        store: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LoyverseError> {
        let user_agent_prefix = config
            .user_agent_prefix()
            .map_or(String::new(), |prefix| format!("{prefix} | "));
        let user_agent = format!("{user_agent_prefix}Loyverse API Client v{SDK_VERSION} | Rust");

        let mut default_headers = HashMap::new();
        default_headers.insert("User-Agent".to_string(), user_agent);
        default_headers.insert("Accept".to_string(), "application/json".to_string());

        let client = reqwest::Client::builder().use_rustls_tls().build()?;

        let rate_limiter = RateLimiter::new(
            config.requests_per_minute(),
            config.rate_limit_window(),
            Arc::clone(&clock),
        );

        let tokens = TokenRefresher::new(
            tenant_id,
            credential,
            Arc::clone(&config),
            client.clone(),
            store,
            Arc::clone(&clock),
        );

        Ok(Self {
            client,
            base_url: config.api_base_url().clone(),
            default_headers,
            max_retries: config.max_retries(),
            base_delay: config.base_delay(),
            request_timeout: config.request_timeout(),
            max_retry_after: config.rate_limit_window(),
            rate_limiter: Mutex::new(rate_limiter),
            tokens,
            clock,
        })
    }

    /// Returns the API base URL.
    #[must_use]
    pub const fn base_url(&self) -> &BaseUrl {
        &self.base_url
    }

    /// Returns the headers sent with every request.
    #[must_use]
    pub const fn default_headers(&self) -> &HashMap<String, String> {
        &self.default_headers
    }

    /// Returns the tenant this client acts for.
    #[must_use]
    pub const fn tenant_id(&self) -> &TenantId {
        self.tokens.tenant_id()
    }

    /// Returns a copy of the credential requests are currently signed with.
    pub async fn credential(&self) -> Credential {
        self.tokens.credential().await
    }

    /// Returns how many requests the current rate-limit window still admits.
    pub async fn rate_limit_remaining(&self) -> u32 {
        self.rate_limiter.lock().await.remaining()
    }

    /// Sends a request to the Loyverse API.
    ///
    /// # Errors
    ///
    /// - [`LoyverseError::InvalidRequest`] if validation fails
    /// - [`LoyverseError::Authentication`] if refresh fails or the refreshed
    ///   token is rejected too
    /// - [`LoyverseError::MaxRetries`] if 429s or timeouts outlast the budget
    /// - [`LoyverseError::Api`] for any other non-2xx response
    /// - [`LoyverseError::Network`] / [`LoyverseError::Decode`] for transport
    ///   and parsing failures
    pub async fn request(&self, request: HttpRequest) -> Result<HttpResponse, LoyverseError> {
        request.verify()?;

        let url = self.base_url.join(&request.path);
        let mut state = RetryState::default();

        loop {
            self.rate_limiter.lock().await.check_rate_limit().await;
            let access_token = self.tokens.access_token().await;

            tracing::debug!(
                method = %request.http_method,
                %url,
                retries = state.retries,
                "Sending Loyverse API request"
            );

            let response = match self.send(&request, &url, &access_token).await {
                Ok(response) => response,
                Err(LoyverseError::Network(error)) if error.is_timeout() => {
                    tracing::warn!(%url, "Loyverse API request timed out");
                    self.wait_before_retry(&mut state, None, None).await?;
                    continue;
                }
                Err(error) => return Err(error),
            };

            match response.code {
                200..=299 => return Ok(response),
                401 => {
                    if state.refreshed {
                        return Err(AuthenticationError::after_refresh().into());
                    }
                    self.tokens.refresh_access_token(&access_token).await?;
                    state.refreshed = true;
                }
                429 => {
                    let retry_after = response.retry_after.map(|secs| {
                        Duration::try_from_secs_f64(secs)
                            .map_or(self.max_retry_after, |delay| delay.min(self.max_retry_after))
                    });
                    self.wait_before_retry(&mut state, retry_after, Some(429))
                        .await?;
                }
                _ => return Err(ApiError::from_response(&response).into()),
            }
        }
    }

    /// Sleeps before the next retry, or fails when the budget is spent.
    async fn wait_before_retry(
        &self,
        state: &mut RetryState,
        retry_after: Option<Duration>,
        last_status: Option<u16>,
    ) -> Result<(), MaxRetriesExceededError> {
        if state.retries >= self.max_retries {
            return Err(MaxRetriesExceededError {
                retries: state.retries,
                last_status,
                total_delay: state.total_delay,
            });
        }

        let delay = retry_after.unwrap_or_else(|| self.backoff_delay(state.retries));
        tracing::warn!(
            retry = state.retries + 1,
            max_retries = self.max_retries,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Backing off before retrying Loyverse API request"
        );

        self.clock.sleep(delay).await;
        state.total_delay = state.total_delay.saturating_add(delay);
        state.retries += 1;
        Ok(())
    }

    /// Exponential backoff: `base_delay × 2^retries`, saturating.
    fn backoff_delay(&self, retries: u32) -> Duration {
        let factor = 1u32.checked_shl(retries).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Performs a single send and parses the response.
    async fn send(
        &self,
        request: &HttpRequest,
        url: &str,
        access_token: &str,
    ) -> Result<HttpResponse, LoyverseError> {
        let mut builder = self
            .client
            .request(request.http_method.as_reqwest(), url)
            .bearer_auth(access_token)
            .timeout(self.request_timeout);

        for (key, value) in &self.default_headers {
            builder = builder.header(key, value);
        }
        if let Some(extra) = &request.extra_headers {
            for (key, value) in extra {
                builder = builder.header(key, value);
            }
        }
        if let Some(query) = &request.query {
            builder = builder.query(query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let res = builder.send().await?;
        let code = res.status().as_u16();
        let headers = Self::parse_response_headers(res.headers());
        let body_text = res.text().await?;

        let body = if body_text.trim().is_empty() {
            serde_json::json!({})
        } else if (200..=299).contains(&code) {
            serde_json::from_str(&body_text)?
        } else {
            serde_json::from_str(&body_text)
                .unwrap_or_else(|_| serde_json::json!({ "raw_body": body_text }))
        };

        Ok(HttpResponse::new(code, headers, body))
    }

    /// Parses response headers into a `HashMap` with lowercased names.
    fn parse_response_headers(
        headers: &reqwest::header::HeaderMap,
    ) -> HashMap<String, Vec<String>> {
        let mut result: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in headers {
            let key = name.as_str().to_lowercase();
            let value = value.to_str().unwrap_or_default().to_string();
            result.entry(key).or_default().push(value);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::InMemoryCredentialStore;
    use crate::clock::ManualClock;
    use crate::config::{ClientId, ClientSecret};

    fn create_client(config: LoyverseConfig) -> HttpClient {
        HttpClient::new(
            Arc::new(config),
            TenantId::new("org-1").unwrap(),
            Credential::new("access", "refresh"),
            Arc::new(InMemoryCredentialStore::new()),
            Arc::new(ManualClock::new()),
        )
        .unwrap()
    }

    fn base_config() -> crate::config::LoyverseConfigBuilder {
        LoyverseConfig::builder()
            .client_id(ClientId::new("id").unwrap())
            .client_secret(ClientSecret::new("secret").unwrap())
    }

    #[test]
    fn test_backoff_delay_doubles() {
        let client = create_client(
            base_config()
                .base_delay(Duration::from_millis(100))
                .build()
                .unwrap(),
        );

        assert_eq!(client.backoff_delay(0), Duration::from_millis(100));
        assert_eq!(client.backoff_delay(1), Duration::from_millis(200));
        assert_eq!(client.backoff_delay(2), Duration::from_millis(400));
        assert_eq!(client.backoff_delay(3), Duration::from_millis(800));
    }

    #[test]
    fn test_backoff_delay_saturates() {
        let client = create_client(base_config().build().unwrap());
        assert_eq!(
            client.backoff_delay(64),
            Duration::from_secs(1).saturating_mul(u32::MAX)
        );
    }

    #[test]
    fn test_user_agent_header_format() {
        let client = create_client(base_config().build().unwrap());
        let user_agent = client.default_headers().get("User-Agent").unwrap();
        assert!(user_agent.starts_with("Loyverse API Client v"));
        assert!(user_agent.contains("Rust"));
    }

    #[test]
    fn test_user_agent_with_prefix() {
        let client = create_client(base_config().user_agent_prefix("PriceDesk/2.1").build().unwrap());
        let user_agent = client.default_headers().get("User-Agent").unwrap();
        assert!(user_agent.starts_with("PriceDesk/2.1 | "));
    }

    #[test]
    fn test_accept_header_is_json() {
        let client = create_client(base_config().build().unwrap());
        assert_eq!(
            client.default_headers().get("Accept"),
            Some(&"application/json".to_string())
        );
    }

    #[tokio::test]
    async fn test_invalid_request_is_rejected_before_sending() {
        let client = create_client(base_config().build().unwrap());
        let request = HttpRequest {
            http_method: crate::clients::HttpMethod::Post,
            path: "items".to_string(),
            body: None,
            query: None,
            extra_headers: None,
        };

        let result = client.request(request).await;
        assert!(matches!(result, Err(LoyverseError::InvalidRequest(_))));
        assert_eq!(client.rate_limit_remaining().await, 60);
    }
}
