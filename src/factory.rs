//! Building clients from stored integrations.

use std::sync::Arc;

use crate::auth::CredentialStore;
use crate::clients::{LoyverseError, RestClient};
use crate::clock::{Clock, SystemClock};
use crate::config::{LoyverseConfig, TenantId};

/// Builds a ready client for `tenant_id` from its stored integration.
///
/// Returns `Ok(None)` when the tenant has no integration record, is not
/// connected, or is missing either token. Callers treat that as "not
/// integrated" rather than as a failure.
///
/// # Errors
///
/// Returns [`LoyverseError::Store`] if the store lookup fails, or
/// [`LoyverseError::Network`] if the HTTP client cannot be built.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use loyverse_api::{create_client, ClientId, ClientSecret, LoyverseConfig, TenantId};
/// use loyverse_api::auth::InMemoryCredentialStore;
///
/// # tokio_test::block_on(async {
/// let config = LoyverseConfig::builder()
///     .client_id(ClientId::new("client-id").unwrap())
///     .client_secret(ClientSecret::new("client-secret").unwrap())
///     .build()
///     .unwrap();
/// let store = Arc::new(InMemoryCredentialStore::new());
///
/// let client = create_client(Arc::new(config), store, &TenantId::new("org-1").unwrap())
///     .await
///     .unwrap();
/// assert!(client.is_none());
/// # });
/// ```
pub async fn create_client(
    config: Arc<LoyverseConfig>,
    store: Arc<dyn CredentialStore>,
    tenant_id: &TenantId,
) -> Result<Option<RestClient>, LoyverseError> {
    create_client_with_clock(config, store, tenant_id, Arc::new(SystemClock)).await
}

/// Like [`create_client`], with the client's waits running on `clock`.
///
/// # Errors
///
/// See [`create_client`].
pub async fn create_client_with_clock(
    config: Arc<LoyverseConfig>,
    store: Arc<dyn CredentialStore>,
    tenant_id: &TenantId,
    clock: Arc<dyn Clock>,
) -> Result<Option<RestClient>, LoyverseError> {
    let Some(record) = store.find_credential(tenant_id).await? else {
        tracing::debug!(tenant = %tenant_id, "No Loyverse integration stored for tenant");
        return Ok(None);
    };

    let Some(credential) = record.credential() else {
        tracing::debug!(
            tenant = %tenant_id,
            connected = record.is_connected,
            "Loyverse integration is disconnected or incomplete"
        );
        return Ok(None);
    };

    RestClient::with_clock(config, tenant_id.clone(), credential, store, clock).map(Some)
}
