//! OAuth credential record for a tenant's Loyverse connection.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::token_refresh::TokenResponse;

/// The access/refresh token pair a client authenticates with.
///
/// The durable copy lives in the tenant's integration store. A client keeps
/// an in-memory copy and writes it back after every refresh.
///
/// # Example
///
/// ```rust
/// use chrono::Utc;
/// use loyverse_api::Credential;
///
/// let credential = Credential::new("at-123", "rt-456");
/// assert!(credential.is_active(Utc::now()));
/// assert!(!format!("{credential:?}").contains("at-123"));
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Bearer token for API requests.
    pub access_token: String,

    /// Token exchanged for a new access token on refresh.
    pub refresh_token: String,

    /// When the access token expires, if known.
    pub expires_at: Option<DateTime<Utc>>,

    /// Space-separated OAuth scopes granted to the token.
    pub scopes: String,
}

impl Credential {
    /// Creates a credential with no known expiry and no scopes.
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at: None,
            scopes: String::new(),
        }
    }

    /// Builds the credential that replaces `previous` after a refresh.
    ///
    /// `expires_at` is `now + expires_in`. If the token endpoint did not
    /// rotate the refresh token, or left out the scopes, the previous
    /// values are kept.
    #[must_use]
    pub fn from_token_response(
        response: &TokenResponse,
        previous: &Self,
        now: DateTime<Utc>,
    ) -> Self {
        let expires_at = response
            .expires_in
            .and_then(chrono::Duration::try_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime));

        Self {
            access_token: response.access_token.clone(),
            refresh_token: response
                .refresh_token
                .clone()
                .filter(|token| !token.is_empty())
                .unwrap_or_else(|| previous.refresh_token.clone()),
            expires_at,
            scopes: response
                .scope
                .clone()
                .unwrap_or_else(|| previous.scopes.clone()),
        }
    }

    /// Returns `true` if the access token expired at or before `now`.
    ///
    /// Credentials without an expiry never expire.
    #[must_use]
    pub fn expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| now >= expires)
    }

    /// Returns `true` if both tokens are present and the access token has
    /// not expired at `now`.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty()
            && !self.refresh_token.is_empty()
            && !self.expired_at(now)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"*****")
            .field("refresh_token", &"*****")
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .finish()
    }
}

// Verify Credential is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Credential>();
};
