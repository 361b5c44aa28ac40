//! # Error Types
//!
//! Domain-specific error types for vitrina-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  vitrina-core errors (this file)                                       │
//! │  ├── ProviderFailure  - Raw failure reported by an auth provider       │
//! │  ├── AuthError        - Classified register/login failure              │
//! │  └── ValidationError  - Form input failures                            │
//! │                                                                         │
//! │  vitrina-sync errors (separate crate)                                  │
//! │  └── SyncError        - Transport, config, store failures              │
//! │                                                                         │
//! │  Flow: ProviderFailure → AuthError → user_message() → form             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::auth::{AuthErrorKind, AuthOperation};

// =============================================================================
// Provider Failure
// =============================================================================

/// A failure as reported by an auth provider, before classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProviderFailure {
    /// Structured error code, when the provider gives one (`EMAIL_EXISTS`).
    pub code: Option<String>,

    /// Human-readable message text.
    pub message: String,
}

impl ProviderFailure {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        ProviderFailure {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// A failure that carries only message text.
    pub fn message_only(message: impl Into<String>) -> Self {
        ProviderFailure {
            code: None,
            message: message.into(),
        }
    }

    /// The failure reported when the provider could not be reached.
    pub fn network() -> Self {
        ProviderFailure::new(
            "NETWORK_REQUEST_FAILED",
            "A network error (such as timeout, interrupted connection or unreachable host) has occurred.",
        )
    }
}

// =============================================================================
// Auth Error
// =============================================================================

/// A classified register or login failure.
///
/// ## User Workflow
/// ```text
/// Login form submit
///      │
///      ▼
/// SessionManager::login ──► provider rejects: INVALID_PASSWORD
///      │
///      ▼
/// AuthError { operation: Login, kind: WrongPassword, .. }
///      │
///      ▼
/// Form shows: "Contraseña incorrecta"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed ({kind}): {message}")]
pub struct AuthError {
    pub operation: AuthOperation,
    pub kind: AuthErrorKind,
    /// The provider's message text, kept for logs and the `Other` message.
    pub message: String,
}

impl AuthError {
    /// Classifies a provider failure for the given operation.
    pub fn from_failure(operation: AuthOperation, failure: ProviderFailure) -> Self {
        let kind = AuthErrorKind::classify(operation, failure.code.as_deref(), &failure.message);
        AuthError {
            operation,
            kind,
            message: failure.message,
        }
    }

    /// The message shown to the user.
    pub fn user_message(&self) -> String {
        match self.kind {
            AuthErrorKind::WrongPassword => "Contraseña incorrecta".to_string(),
            AuthErrorKind::UserNotFound => "Usuario no encontrado".to_string(),
            AuthErrorKind::Network => "Error de conexión".to_string(),
            AuthErrorKind::EmailAlreadyInUse => "Este email ya está registrado".to_string(),
            AuthErrorKind::InvalidEmail => "Email inválido".to_string(),
            AuthErrorKind::WeakPassword => "Contraseña muy débil".to_string(),
            AuthErrorKind::Other => match self.operation {
                AuthOperation::Login => format!("Error al iniciar sesión: {}", self.message),
                AuthOperation::Register => format!("Error al registrarse: {}", self.message),
            },
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before anything reaches the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or blank.
    #[error("{field} is required")]
    Required { field: String },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// The message shown to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            ValidationError::Required { .. } => "Por favor completa todos los campos",
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_from_coded_failure() {
        let err = AuthError::from_failure(
            AuthOperation::Register,
            ProviderFailure::new("EMAIL_EXISTS", "EMAIL_EXISTS"),
        );
        assert_eq!(err.kind, AuthErrorKind::EmailAlreadyInUse);
        assert_eq!(err.user_message(), "Este email ya está registrado");
    }

    #[test]
    fn test_network_failure_classifies_for_both_operations() {
        for op in [AuthOperation::Login, AuthOperation::Register] {
            let err = AuthError::from_failure(op, ProviderFailure::network());
            assert_eq!(err.kind, AuthErrorKind::Network);
            assert_eq!(err.user_message(), "Error de conexión");
        }
    }

    #[test]
    fn test_other_message_includes_provider_text() {
        let login = AuthError::from_failure(
            AuthOperation::Login,
            ProviderFailure::message_only("quota exceeded"),
        );
        assert_eq!(login.kind, AuthErrorKind::Other);
        assert_eq!(login.user_message(), "Error al iniciar sesión: quota exceeded");

        let register = AuthError::from_failure(
            AuthOperation::Register,
            ProviderFailure::message_only("quota exceeded"),
        );
        assert_eq!(register.user_message(), "Error al registrarse: quota exceeded");
    }

    #[test]
    fn test_error_display() {
        let err = AuthError::from_failure(
            AuthOperation::Login,
            ProviderFailure::new("INVALID_PASSWORD", "INVALID_PASSWORD"),
        );
        assert_eq!(
            err.to_string(),
            "login failed (wrong-password): INVALID_PASSWORD"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::required("email");
        assert_eq!(err.to_string(), "email is required");
        assert_eq!(err.user_message(), "Por favor completa todos los campos");
    }
}
