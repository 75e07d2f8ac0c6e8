//! Error types for the Huddle application.

use serde::Serialize;
use thiserror::Error;

/// A shared error type for the entire Huddle application.
///
/// Variants follow the user-facing taxonomy: authorization denials and
/// validation failures are raised before any gateway call, persistence
/// failures come back from the gateway, and not-found covers stale
/// references to tasks, messages or conversations.
#[derive(Error, Debug, Clone, Serialize)]
pub enum HuddleError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// The acting member is not allowed to perform the action
    #[error("{0}")]
    PermissionDenied(String),

    /// Input rejected before any request was issued
    #[error("{0}")]
    Validation(String),

    /// Data access error (gateway/storage layer)
    #[error("Data access error: {0}")]
    DataAccess(String),

    /// Non-success HTTP status returned by a remote endpoint
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// A compound mutation failed and its compensation failed too
    #[error("Inconsistent state: {0}")]
    Inconsistent(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Multiple errors
    #[error("Multiple errors occurred ({} total)", .0.len())]
    Multiple(Vec<HuddleError>),
}

impl HuddleError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a PermissionDenied error
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied(message.into())
    }

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a DataAccess error
    pub fn data_access(message: impl Into<String>) -> Self {
        Self::DataAccess(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is an authorization denial
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }

    /// Check if this is a validation failure
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if the error came back from the persistence layer.
    ///
    /// Persistence failures are the ones that trigger an optimistic rollback.
    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, Self::DataAccess(_) | Self::Http { .. } | Self::Io { .. })
    }

    /// Returns the message shown to the user for this error.
    ///
    /// Denials and validation failures carry their own corrective text;
    /// everything else collapses into the supplied generic message.
    pub fn user_message(&self, generic: &str) -> String {
        match self {
            Self::PermissionDenied(message) | Self::Validation(message) => message.clone(),
            _ => generic.to_string(),
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for HuddleError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for HuddleError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for HuddleError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for HuddleError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error (used at the CLI boundary)
impl From<anyhow::Error> for HuddleError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, HuddleError>`.
pub type Result<T> = std::result::Result<T, HuddleError>;
