//! Error types for the operator client.

use thiserror::Error;

/// Result type for operator client operations
pub type OperatorResult<T> = Result<T, OperatorError>;

/// Errors that can occur in the operator-side pipeline
#[derive(Debug, Error)]
pub enum OperatorError {
    /// Access token could not be obtained from the backend
    #[error("Token fetch failed: {reason}")]
    TokenFetch { reason: String },

    /// Device registration with the provider failed
    #[error("Device registration failed: {reason}")]
    DeviceRegistration { reason: String },

    /// Call placement attempted before the device became ready
    #[error("Device is not ready")]
    DeviceNotReady,

    /// Outbound call could not be placed
    #[error("Call failed: {reason}")]
    CallFailed { reason: String },

    /// Network error
    #[error("Network error: {message}")]
    Network { message: String },

    /// Invalid state error
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    /// Internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl OperatorError {
    /// Create a token fetch error
    pub fn token_fetch(reason: impl Into<String>) -> Self {
        Self::TokenFetch {
            reason: reason.into(),
        }
    }

    /// Create a device registration error
    pub fn registration(reason: impl Into<String>) -> Self {
        Self::DeviceRegistration {
            reason: reason.into(),
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
}

impl From<reqwest::Error> for OperatorError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network {
            message: e.to_string(),
        }
    }
}
