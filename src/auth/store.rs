//! Persistence seam for tenant credentials.
//!
//! The durable credential record belongs to the host application's
//! integration store (usually a database). The client only reads it through
//! [`CredentialStore::find_credential`] when it is constructed and writes it
//! through [`CredentialStore::update_credential`] after a token refresh.
//!
//! Two clients serving the same tenant from different processes may refresh
//! concurrently. Nothing here coordinates them; the last write wins.

use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::Credential;
use crate::config::TenantId;

/// Errors raised by a [`CredentialStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The tenant has no integration record.
    #[error("No Loyverse integration is stored for tenant '{tenant_id}'")]
    NotFound {
        /// The tenant that was looked up.
        tenant_id: TenantId,
    },

    /// The backing store failed.
    #[error("Credential store failure: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// A tenant's integration record as the store holds it.
///
/// Tokens are optional because a record can exist in a half-configured
/// state (created but never connected, or disconnected).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredIntegration {
    /// The tenant owning the integration.
    pub tenant_id: TenantId,
    /// Whether the integration is currently connected.
    pub is_connected: bool,
    /// Stored access token.
    pub access_token: Option<String>,
    /// Stored refresh token.
    pub refresh_token: Option<String>,
    /// Stored access token expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Stored scopes.
    pub scopes: Option<String>,
}

impl StoredIntegration {
    /// Creates a connected record holding `credential`.
    #[must_use]
    pub fn connected(tenant_id: TenantId, credential: &Credential) -> Self {
        Self {
            tenant_id,
            is_connected: true,
            access_token: Some(credential.access_token.clone()),
            refresh_token: Some(credential.refresh_token.clone()),
            expires_at: credential.expires_at,
            scopes: Some(credential.scopes.clone()),
        }
    }

    /// Returns the usable credential, or `None` if the integration is not
    /// connected or either token is missing.
    #[must_use]
    pub fn credential(&self) -> Option<Credential> {
        if !self.is_connected {
            return None;
        }
        let access_token = self.access_token.as_deref().filter(|t| !t.is_empty())?;
        let refresh_token = self.refresh_token.as_deref().filter(|t| !t.is_empty())?;

        Some(Credential {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            expires_at: self.expires_at,
            scopes: self.scopes.clone().unwrap_or_default(),
        })
    }
}

/// Where tenant credentials are read from and written back to.
#[async_trait]
pub trait CredentialStore: Send + Sync + fmt::Debug {
    /// Looks up the integration record for `tenant_id`.
    async fn find_credential(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<StoredIntegration>, StoreError>;

    /// Replaces the stored tokens for `tenant_id` after a refresh.
    ///
    /// Implementations must not create a record that does not exist.
    async fn update_credential(
        &self,
        tenant_id: &TenantId,
        credential: &Credential,
    ) -> Result<(), StoreError>;
}

/// A process-local [`CredentialStore`].
///
/// Suitable for tests and single-process deployments that load credentials
/// from elsewhere at startup.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    records: RwLock<HashMap<TenantId, StoredIntegration>>,
}

impl InMemoryCredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a record, keyed by its tenant.
    pub fn insert(&self, record: StoredIntegration) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.tenant_id.clone(), record);
    }

    /// Removes the record for `tenant_id`.
    pub fn remove(&self, tenant_id: &TenantId) -> Option<StoredIntegration> {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(tenant_id)
    }

    /// Returns a copy of the record for `tenant_id`.
    #[must_use]
    pub fn get(&self, tenant_id: &TenantId) -> Option<StoredIntegration> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(tenant_id)
            .cloned()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_credential(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<StoredIntegration>, StoreError> {
        Ok(self.get(tenant_id))
    }

    async fn update_credential(
        &self,
        tenant_id: &TenantId,
        credential: &Credential,
    ) -> Result<(), StoreError> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let record = records
            .get_mut(tenant_id)
            .ok_or_else(|| StoreError::NotFound {
                tenant_id: tenant_id.clone(),
            })?;

        record.access_token = Some(credential.access_token.clone());
        record.refresh_token = Some(credential.refresh_token.clone());
        record.expires_at = credential.expires_at;
        record.scopes = Some(credential.scopes.clone());
        Ok(())
    }
}
