//! REST client for the Loyverse API.
//!
//! This module provides the [`RestClient`] type: verb helpers over the
//! request executor plus cursor pagination.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::auth::{Credential, CredentialStore};
use crate::clients::errors::LoyverseError;
use crate::clients::rest::pagination::{Page, CURSOR_PARAM, DEFAULT_COLLECTION_KEY, LIMIT_PARAM};
use crate::clients::{HttpClient, HttpMethod, HttpRequest};
use crate::clock::{Clock, SystemClock};
use crate::config::{LoyverseConfig, TenantId};

/// REST API client for one Loyverse tenant.
///
/// Every call goes through the tenant's rate limiter, refreshes the access
/// token once on a 401 and backs off on 429. Use
/// [`create_client`](crate::create_client) to build one from stored
/// credentials.
///
/// # Thread Safety
///
/// `RestClient` is `Send + Sync`, making it safe to share across async tasks.
///
/// # Example
///
/// ```rust,ignore
/// use loyverse_api::{create_client, LoyverseConfig, TenantId};
///
/// let client = create_client(config, store, &TenantId::new("org-1")?)
///     .await?
///     .expect("tenant is connected");
///
/// // GET request
/// let body = client.get("categories", None).await?;
///
/// // Every item, across all pages
/// let items = client.paginate("items", None).await?;
/// ```
#[derive(Debug)]
pub struct RestClient {
    /// The internal HTTP client for making requests.
    http_client: HttpClient,
    /// The `limit` sent with every page request.
    page_limit: u32,
}

// Verify RestClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RestClient>();
};

impl RestClient {
    /// Creates a REST client for `tenant_id` using the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`LoyverseError::Network`] if the HTTP client cannot be built.
    pub fn new(
        config: Arc<LoyverseConfig>,
        tenant_id: TenantId,
        credential: Credential,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, LoyverseError> {
        Self::with_clock(config, tenant_id, credential, store, Arc::new(SystemClock))
    }

    /// Creates a REST client whose waits run on `clock`.
    ///
    /// # Errors
    ///
    /// Returns [`LoyverseError::Network`] if the HTTP client cannot be built.
    pub fn with_clock(
        config: Arc<LoyverseConfig>,
        tenant_id: TenantId,
        credential: Credential,
        store: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LoyverseError> {
        let page_limit = config.page_limit();
        tracing::debug!(tenant = %tenant_id, "Creating Loyverse REST client");

        let http_client = HttpClient::new(config, tenant_id, credential, store, clock)?;

        Ok(Self {
            http_client,
            page_limit,
        })
    }

    /// Returns the tenant this client acts for.
    #[must_use]
    pub const fn tenant_id(&self) -> &TenantId {
        self.http_client.tenant_id()
    }

    /// Returns a copy of the credential requests are currently signed with.
    pub async fn credential(&self) -> Credential {
        self.http_client.credential().await
    }

    /// Returns the underlying request executor.
    #[must_use]
    pub const fn http_client(&self) -> &HttpClient {
        &self.http_client
    }

    /// Sends a prepared request and returns the parsed body.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::request`].
    pub async fn request(&self, request: HttpRequest) -> Result<Value, LoyverseError> {
        Ok(self.http_client.request(request).await?.body)
    }

    /// Sends a GET request to `path`.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::request`].
    pub async fn get(
        &self,
        path: &str,
        query: Option<HashMap<String, String>>,
    ) -> Result<Value, LoyverseError> {
        self.make_request(HttpMethod::Get, path, None, query).await
    }

    /// Sends a POST request with `body` serialized as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`LoyverseError::Decode`] if `body` cannot be serialized,
    /// otherwise see [`HttpClient::request`].
    pub async fn post<B>(&self, path: &str, body: &B) -> Result<Value, LoyverseError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let body = serde_json::to_value(body)?;
        self.make_request(HttpMethod::Post, path, Some(body), None)
            .await
    }

    /// Sends a PUT request with `body` serialized as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`LoyverseError::Decode`] if `body` cannot be serialized,
    /// otherwise see [`HttpClient::request`].
    pub async fn put<B>(&self, path: &str, body: &B) -> Result<Value, LoyverseError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let body = serde_json::to_value(body)?;
        self.make_request(HttpMethod::Put, path, Some(body), None)
            .await
    }

    /// Sends a DELETE request to `path`.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::request`].
    pub async fn delete(&self, path: &str) -> Result<Value, LoyverseError> {
        self.make_request(HttpMethod::Delete, path, None, None)
            .await
    }

    /// Fetches every page of `endpoint`, reading items under `"items"`.
    ///
    /// # Errors
    ///
    /// See [`RestClient::paginate_collection`].
    pub async fn paginate(
        &self,
        endpoint: &str,
        params: Option<HashMap<String, String>>,
    ) -> Result<Vec<Value>, LoyverseError> {
        self.paginate_collection(endpoint, DEFAULT_COLLECTION_KEY, params)
            .await
    }

    /// Fetches every page of `endpoint`, reading items under `key`.
    ///
    /// Pages are requested one after another with `limit` and, after the
    /// first page, the previous page's `cursor`. Items are returned in
    /// arrival order. The first failing page aborts the whole call.
    ///
    /// # Errors
    ///
    /// Returns the first error of [`HttpClient::request`].
    pub async fn paginate_collection(
        &self,
        endpoint: &str,
        key: &str,
        params: Option<HashMap<String, String>>,
    ) -> Result<Vec<Value>, LoyverseError> {
        let mut query = params.unwrap_or_default();
        query.insert(LIMIT_PARAM.to_string(), self.page_limit.to_string());
        query.remove(CURSOR_PARAM);

        let mut items = Vec::new();
        let mut pages: u32 = 0;

        loop {
            let body = self.get(endpoint, Some(query.clone())).await?;
            let page = Page::from_body(body, key);
            pages += 1;

            tracing::debug!(
                endpoint,
                page = pages,
                items = page.items.len(),
                has_next = page.has_next(),
                "Fetched Loyverse page"
            );

            items.extend(page.items);

            let Some(cursor) = page.next_cursor else {
                break;
            };
            if query.get(CURSOR_PARAM) == Some(&cursor) {
                tracing::warn!(endpoint, %cursor, "Loyverse returned the same cursor twice, stopping");
                break;
            }
            query.insert(CURSOR_PARAM.to_string(), cursor);
        }

        Ok(items)
    }

    /// Like [`RestClient::paginate_collection`], deserializing each item.
    ///
    /// # Errors
    ///
    /// Returns [`LoyverseError::Decode`] if an item does not match `T`,
    /// otherwise see [`RestClient::paginate_collection`].
    pub async fn paginate_as<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        key: &str,
        params: Option<HashMap<String, String>>,
    ) -> Result<Vec<T>, LoyverseError> {
        self.paginate_collection(endpoint, key, params)
            .await?
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(LoyverseError::from))
            .collect()
    }

    /// Internal helper to build and send requests.
    async fn make_request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        query: Option<HashMap<String, String>>,
    ) -> Result<Value, LoyverseError> {
        let mut builder = HttpRequest::builder(method, normalize_path(path));

        if let Some(body_value) = body {
            builder = builder.body(body_value);
        }

        if let Some(query_params) = query {
            builder = builder.query(query_params);
        }

        let request = builder.build()?;
        self.request(request).await
    }
}

/// Strips leading and trailing slashes from an endpoint path.
fn normalize_path(path: &str) -> &str {
    path.trim_matches('/')
}
