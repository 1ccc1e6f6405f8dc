//! Unified error type for the space registry
//!
//! One enum covers every failure a caller can observe. Provider-level and
//! template-level failures are normally absorbed by the resolver and only
//! logged; they still get variants so collaborators can report them.

use serde::{Deserialize, Serialize};

/// Unified error type for all registry operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum RegistryError {
    /// Malformed rule or template; fatal at startup
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration problem
        message: String,
    },

    /// A single provider could not be reached or answered with a non-OK status
    #[error("Provider {address} unavailable: {message}")]
    ProviderUnavailable {
        /// Address of the failing provider
        address: String,
        /// Transport or status message
        message: String,
    },

    /// A path template could not be evaluated for a (user, space) pair
    #[error("Template evaluation failed: {message}")]
    TemplateEvaluation {
        /// Description of the evaluation failure
        message: String,
    },

    /// No rule or provider matched the query
    #[error("Not found: {message}")]
    NotFound {
        /// Description of what was not found
        message: String,
    },

    /// Invalid input
    #[error("Invalid: {message}")]
    Invalid {
        /// Description of the invalid input
        message: String,
    },

    /// The caller cancelled the request
    #[error("Request cancelled")]
    Cancelled,

    /// The request deadline passed before resolution finished
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure
        message: String,
    },

    /// Internal error
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error
        message: String,
    },
}

impl RegistryError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a provider-unavailable error
    pub fn provider_unavailable(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            address: address.into(),
            message: message.into(),
        }
    }

    /// Create a template evaluation error
    pub fn template_evaluation(message: impl Into<String>) -> Self {
        Self::TemplateEvaluation {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True for errors that end the whole request rather than one provider's share
    pub fn is_request_fatal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

/// Standard Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<std::io::Error> for RegistryError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(err.to_string()),
            std::io::ErrorKind::InvalidData | std::io::ErrorKind::InvalidInput => {
                Self::invalid(err.to_string())
            }
            _ => Self::internal(err.to_string()),
        }
    }
}
