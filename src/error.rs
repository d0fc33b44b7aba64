//! Configuration error types for the Loyverse API client.
//!
//! All configuration constructors return `Result<T, ConfigError>` so that
//! invalid settings are rejected before any request is sent.
//!
//! # Example
//!
//! ```rust
//! use loyverse_api::{ClientId, ConfigError};
//!
//! let result = ClientId::new("");
//! assert!(matches!(result, Err(ConfigError::EmptyClientId)));
//! ```

use thiserror::Error;

/// Errors that can occur while building client configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// OAuth client id cannot be empty.
    #[error("Client id cannot be empty. Please provide the OAuth client id of your Loyverse app.")]
    EmptyClientId,

    /// OAuth client secret cannot be empty.
    #[error("Client secret cannot be empty. Please provide the OAuth client secret of your Loyverse app.")]
    EmptyClientSecret,

    /// Tenant identifier cannot be empty.
    #[error("Tenant id cannot be empty.")]
    EmptyTenantId,

    /// A base URL is malformed.
    #[error("Invalid URL '{url}'. Please provide an absolute http(s) URL (e.g., 'https://api.loyverse.com/v1.0').")]
    InvalidUrl {
        /// The invalid URL that was provided.
        url: String,
    },

    /// A numeric or duration setting is out of range.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidSetting {
        /// The setting that was rejected.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// A required field is missing.
    #[error("Missing required field: '{field}'. This field must be set before building the configuration.")]
    MissingRequiredField {
        /// The name of the missing field.
        field: &'static str,
    },

    /// A required environment variable is not set.
    #[error("Environment variable '{name}' is not set.")]
    MissingEnvVar {
        /// The variable that was looked up.
        name: &'static str,
    },
}
