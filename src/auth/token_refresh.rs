//! Access token refresh.
//!
//! Loyverse access tokens expire. When the API rejects one, the client
//! exchanges the stored refresh token for a new pair at the OAuth token
//! endpoint:
//!
//! ```text
//! POST {token_url}
//! Content-Type: application/x-www-form-urlencoded
//!
//! grant_type=refresh_token&client_id=..&client_secret=..&refresh_token=..
//! ```
//!
//! [`refresh_access_token`] performs the exchange itself. [`TokenRefresher`]
//! owns a tenant's in-memory credential, runs the exchange and writes the
//! result back to the [`CredentialStore`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::auth::{Credential, CredentialStore};
use crate::clients::errors::{upstream_error, AuthenticationError, LoyverseError};
use crate::clock::Clock;
use crate::config::{LoyverseConfig, TenantId};

/// Grant type for refresh token requests.
const REFRESH_TOKEN_GRANT_TYPE: &str = "refresh_token";

/// Form body of a refresh request.
#[derive(Debug, Serialize)]
struct TokenRefreshRequest<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    refresh_token: &'a str,
}

/// Successful response of the OAuth token endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    /// The new access token.
    pub access_token: String,
    /// The rotated refresh token, if the server issued one.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Token type, normally `bearer`.
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Granted scopes.
    #[serde(default)]
    pub scope: Option<String>,
}

/// Exchanges `refresh_token` for a new token pair.
///
/// # Errors
///
/// - [`LoyverseError::Authentication`] if the endpoint answers with a
///   non-success status, carrying its `error` and `error_description`
/// - [`LoyverseError::Network`] if the endpoint cannot be reached
/// - [`LoyverseError::Decode`] if a success body is not a token response
pub async fn refresh_access_token(
    http: &reqwest::Client,
    config: &LoyverseConfig,
    refresh_token: &str,
) -> Result<TokenResponse, LoyverseError> {
    let form = TokenRefreshRequest {
        grant_type: REFRESH_TOKEN_GRANT_TYPE,
        client_id: config.client_id().as_ref(),
        client_secret: config.client_secret().as_ref(),
        refresh_token,
    };

    let response = http
        .post(config.token_url().as_ref())
        .header("Accept", "application/json")
        .timeout(config.request_timeout())
        .form(&form)
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let parsed = serde_json::from_str(&body).unwrap_or_else(|_| serde_json::json!({}));
        let (code, description) = upstream_error(&parsed);
        return Err(AuthenticationError {
            code,
            description: description
                .unwrap_or_else(|| format!("token refresh failed with status {}", status.as_u16())),
        }
        .into());
    }

    Ok(serde_json::from_str(&body)?)
}

/// Holds a tenant's credential and refreshes it on demand.
///
/// The in-memory copy is the one requests are signed with. After a
/// successful refresh it is replaced first and then written to the store,
/// so a store failure still leaves the client with working tokens.
#[derive(Debug)]
pub struct TokenRefresher {
    tenant_id: TenantId,
    config: Arc<LoyverseConfig>,
    http: reqwest::Client,
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    credential: RwLock<Credential>,
}

impl TokenRefresher {
    /// Creates a refresher for `tenant_id` starting from `credential`.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        credential: Credential,
        config: Arc<LoyverseConfig>,
        http: reqwest::Client,
        store: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tenant_id,
            config,
            http,
            store,
            clock,
            credential: RwLock::new(credential),
        }
    }

    /// Returns the tenant this refresher serves.
    #[must_use]
    pub const fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    /// Returns the current access token.
    pub async fn access_token(&self) -> String {
        self.credential.read().await.access_token.clone()
    }

    /// Returns a copy of the current credential.
    pub async fn credential(&self) -> Credential {
        self.credential.read().await.clone()
    }

    /// Replaces `rejected_token` with a fresh access token and persists the
    /// new credential.
    ///
    /// Concurrent callers rejected with the same token share one exchange:
    /// whoever takes the lock after the first refresh finds the token
    /// already replaced and gets the current one without another POST.
    ///
    /// Returns the access token to retry with.
    ///
    /// # Errors
    ///
    /// Returns the error of [`refresh_access_token`], or
    /// [`LoyverseError::Store`] if the new credential could not be persisted.
    pub async fn refresh_access_token(
        &self,
        rejected_token: &str,
    ) -> Result<String, LoyverseError> {
        let mut credential = self.credential.write().await;

        if credential.access_token != rejected_token {
            tracing::debug!(
                tenant = %self.tenant_id,
                "Loyverse access token already refreshed by a concurrent request"
            );
            return Ok(credential.access_token.clone());
        }

        tracing::warn!(tenant = %self.tenant_id, "Refreshing Loyverse access token");
        let response =
            refresh_access_token(&self.http, &self.config, &credential.refresh_token).await?;

        let refreshed = Credential::from_token_response(&response, &credential, self.clock.now());
        *credential = refreshed.clone();
        drop(credential);

        if let Err(error) = self
            .store
            .update_credential(&self.tenant_id, &refreshed)
            .await
        {
            tracing::warn!(
                tenant = %self.tenant_id,
                %error,
                "Failed to persist refreshed Loyverse credential"
            );
            return Err(error.into());
        }

        tracing::debug!(
            tenant = %self.tenant_id,
            expires_at = ?refreshed.expires_at,
            "Loyverse access token refreshed"
        );
        Ok(refreshed.access_token)
    }
}

// Verify types are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<TokenRefreshRequest<'_>>();
    assert_send_sync::<TokenRefresher>();
};
