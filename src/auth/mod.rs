//! Authentication state for tenant clients.
//!
//! # Overview
//!
//! - [`Credential`]: the access/refresh token pair of one tenant
//! - [`CredentialStore`]: where credentials are loaded from and persisted to
//! - [`InMemoryCredentialStore`]: a process-local store
//! - [`StoredIntegration`]: a tenant's integration record as stored
//! - [`TokenRefresher`]: refreshes and persists a tenant's credential
//!
//! # Example
//!
//! ```rust
//! use loyverse_api::auth::{Credential, InMemoryCredentialStore, StoredIntegration};
//! use loyverse_api::TenantId;
//!
//! let store = InMemoryCredentialStore::new();
//! let tenant = TenantId::new("org-1").unwrap();
//! store.insert(StoredIntegration::connected(
//!     tenant.clone(),
//!     &Credential::new("access-token", "refresh-token"),
//! ));
//!
//! assert!(store.get(&tenant).unwrap().credential().is_some());
//! ```

mod credential;
mod store;
pub mod token_refresh;

pub use credential::Credential;
pub use store::{CredentialStore, InMemoryCredentialStore, StoreError, StoredIntegration};
pub use token_refresh::{refresh_access_token, TokenRefresher, TokenResponse};
