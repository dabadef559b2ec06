//! Error types for the call hub.

use thiserror::Error;

/// Result type for hub operations
pub type HubResult<T> = Result<T, HubError>;

/// Errors that can occur in the call hub
#[derive(Debug, Error)]
pub enum HubError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Provider credentials are missing for an operation that needs them
    #[error("Provider not configured: {missing}")]
    ProviderNotConfigured { missing: String },

    /// Access token could not be signed
    #[error("Token signing failed: {reason}")]
    TokenSigning { reason: String },

    /// Network / bind error
    #[error("Network error: {message}")]
    Network { message: String },

    /// Invalid state error
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    /// Internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl HubError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for HubError {
    fn from(e: std::io::Error) -> Self {
        Self::Network {
            message: e.to_string(),
        }
    }
}
