//! # Sync Error Types
//!
//! Error types for backend operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Protocol            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Connection     │  │  DeserializationFailed  │ │
//! │  │  InvalidUrl     │  │  Timeout        │  │  InvalidMessage         │ │
//! │  │  ConfigLoad/Save│  │  Http           │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌──────────────────┐  ┌─────────────────┐                             │
//! │  │    Session       │  │     Store       │                             │
//! │  │                  │  │                 │                             │
//! │  │  NotAuthenticated│  │  Unavailable    │                             │
//! │  │  SessionExpired  │  │  ListenFailed   │                             │
//! │  └──────────────────┘  └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering backend, transport and configuration failures.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid endpoint URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Could not reach the backend.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timed out.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Backend answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        code: Option<String>,
        message: String,
    },

    // =========================================================================
    // Protocol Errors
    // =========================================================================
    /// Response body did not have the expected shape.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Failed to deserialize a response body.
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    // =========================================================================
    // Session Errors
    // =========================================================================
    /// No signed-in user.
    #[error("Not signed in")]
    NotAuthenticated,

    /// The provider invalidated the session.
    #[error("Session expired: {0}")]
    SessionExpired(String),

    // =========================================================================
    // Store Errors
    // =========================================================================
    /// The store rejected or could not perform the write.
    #[error("Document store unavailable: {0}")]
    StoreUnavailable(String),

    /// A change listener failed; no further snapshots follow.
    #[error("Listener failed: {0}")]
    ListenFailed(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::DeserializationFailed(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::Timeout(err.to_string())
        } else if err.is_decode() {
            SyncError::DeserializationFailed(err.to_string())
        } else if let Some(status) = err.status() {
            SyncError::Http {
                status: status.as_u16(),
                code: None,
                message: err.to_string(),
            }
        } else {
            SyncError::ConnectionFailed(err.to_string())
        }
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Returns true if the backend could not be reached at all.
    pub fn is_network_error(&self) -> bool {
        matches!(self, SyncError::ConnectionFailed(_) | SyncError::Timeout(_))
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }

    /// Returns true if the signed-in session is gone.
    pub fn invalidates_session(&self) -> bool {
        matches!(self, SyncError::SessionExpired(_))
    }

    /// The structured backend code, when the backend sent one.
    pub fn code(&self) -> Option<&str> {
        match self {
            SyncError::Http { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_errors() {
        assert!(SyncError::ConnectionFailed("refused".into()).is_network_error());
        assert!(SyncError::Timeout("30s".into()).is_network_error());
        assert!(!SyncError::NotAuthenticated.is_network_error());
        assert!(!SyncError::StoreUnavailable("down".into()).is_network_error());
    }

    #[test]
    fn test_config_errors() {
        assert!(SyncError::InvalidConfig("no api key".into()).is_config_error());
        assert!(SyncError::InvalidUrl("ftp://x".into()).is_config_error());
        assert!(!SyncError::NotAuthenticated.is_config_error());
    }

    #[test]
    fn test_error_display() {
        let err = SyncError::SessionExpired("TOKEN_EXPIRED".into());
        assert_eq!(err.to_string(), "Session expired: TOKEN_EXPIRED");
        assert!(err.invalidates_session());

        let err = SyncError::Http {
            status: 404,
            code: Some("NOT_FOUND".into()),
            message: "missing".into(),
        };
        assert_eq!(err.code(), Some("NOT_FOUND"));
        assert!(err.to_string().contains("404"));
    }
}
