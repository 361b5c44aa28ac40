//! # Auth Failure Classification
//!
//! Sorts the failures reported by the auth provider into the small fixed set
//! of categories the login and register forms can show.
//!
//! ## Classification Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Classifying a provider failure                       │
//! │                                                                         │
//! │  ProviderFailure { code, message }                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. Structured code known?  EMAIL_EXISTS, INVALID_PASSWORD, ...         │
//! │       │ yes ──────────────────────────────────────────► kind            │
//! │       │ no                                                              │
//! │       ▼                                                                 │
//! │  2. Message substring rules, in the order of the operation:             │
//! │                                                                         │
//! │     LOGIN                          REGISTER                             │
//! │     "password"  → WrongPassword    "already in use" → EmailAlreadyInUse │
//! │     "user"      → UserNotFound     "invalid email"  → InvalidEmail      │
//! │     "network"   → Network          "weak password"  → WeakPassword      │
//! │                                    "network"        → Network           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. Otherwise → Other                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Message matching is case-insensitive. It only runs when the provider gave
//! no code we recognise, since the English text can change between versions.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Which session operation produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthOperation {
    Register,
    Login,
}

impl std::fmt::Display for AuthOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthOperation::Register => write!(f, "register"),
            AuthOperation::Login => write!(f, "login"),
        }
    }
}

/// User-facing category of an auth failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorKind {
    WrongPassword,
    UserNotFound,
    Network,
    EmailAlreadyInUse,
    InvalidEmail,
    WeakPassword,
    Other,
}

impl std::fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AuthErrorKind::WrongPassword => "wrong-password",
            AuthErrorKind::UserNotFound => "user-not-found",
            AuthErrorKind::Network => "network-error",
            AuthErrorKind::EmailAlreadyInUse => "email-already-in-use",
            AuthErrorKind::InvalidEmail => "invalid-email",
            AuthErrorKind::WeakPassword => "weak-password",
            AuthErrorKind::Other => "other",
        };
        f.write_str(s)
    }
}

/// Message rules for login, checked in order.
const LOGIN_RULES: &[(&str, AuthErrorKind)] = &[
    ("password", AuthErrorKind::WrongPassword),
    ("user", AuthErrorKind::UserNotFound),
    ("network", AuthErrorKind::Network),
];

/// Message rules for register, checked in order.
const REGISTER_RULES: &[(&str, AuthErrorKind)] = &[
    ("already in use", AuthErrorKind::EmailAlreadyInUse),
    ("invalid email", AuthErrorKind::InvalidEmail),
    ("weak password", AuthErrorKind::WeakPassword),
    ("network", AuthErrorKind::Network),
];

impl AuthErrorKind {
    /// Maps a structured provider code, REST or SDK spelling.
    pub fn from_code(code: &str) -> Option<Self> {
        let kind = match code.trim() {
            "INVALID_PASSWORD"
            | "INVALID_LOGIN_CREDENTIALS"
            | "ERROR_WRONG_PASSWORD"
            | "ERROR_INVALID_CREDENTIAL" => AuthErrorKind::WrongPassword,
            "EMAIL_NOT_FOUND" | "ERROR_USER_NOT_FOUND" => AuthErrorKind::UserNotFound,
            "NETWORK_REQUEST_FAILED" | "ERROR_NETWORK_REQUEST_FAILED" => AuthErrorKind::Network,
            "EMAIL_EXISTS" | "ERROR_EMAIL_ALREADY_IN_USE" => AuthErrorKind::EmailAlreadyInUse,
            "INVALID_EMAIL" | "ERROR_INVALID_EMAIL" => AuthErrorKind::InvalidEmail,
            "WEAK_PASSWORD" | "ERROR_WEAK_PASSWORD" => AuthErrorKind::WeakPassword,
            _ => return None,
        };
        Some(kind)
    }

    /// Falls back to substring matching on the provider's message text.
    pub fn from_message(operation: AuthOperation, message: &str) -> Self {
        let rules = match operation {
            AuthOperation::Login => LOGIN_RULES,
            AuthOperation::Register => REGISTER_RULES,
        };
        let message = message.to_lowercase();

        rules
            .iter()
            .find(|(needle, _)| message.contains(needle))
            .map(|(_, kind)| *kind)
            .unwrap_or(AuthErrorKind::Other)
    }

    /// Classifies a failure: known code first, then message text.
    pub fn classify(operation: AuthOperation, code: Option<&str>, message: &str) -> Self {
        code.and_then(Self::from_code)
            .unwrap_or_else(|| Self::from_message(operation, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_take_precedence() {
        // The message alone would say "wrong password" for a login.
        let kind = AuthErrorKind::classify(
            AuthOperation::Login,
            Some("EMAIL_NOT_FOUND"),
            "bad password for user",
        );
        assert_eq!(kind, AuthErrorKind::UserNotFound);

        assert_eq!(
            AuthErrorKind::from_code("INVALID_LOGIN_CREDENTIALS"),
            Some(AuthErrorKind::WrongPassword)
        );
        assert_eq!(
            AuthErrorKind::from_code("ERROR_EMAIL_ALREADY_IN_USE"),
            Some(AuthErrorKind::EmailAlreadyInUse)
        );
        assert_eq!(AuthErrorKind::from_code("TOO_MANY_ATTEMPTS_TRY_LATER"), None);
    }

    #[test]
    fn test_login_message_rules() {
        let login = |m| AuthErrorKind::from_message(AuthOperation::Login, m);

        assert_eq!(
            login("The password is invalid or the user does not have a password."),
            AuthErrorKind::WrongPassword
        );
        assert_eq!(
            login("There is no user record corresponding to this identifier."),
            AuthErrorKind::UserNotFound
        );
        assert_eq!(
            login("A network error (such as timeout) has occurred."),
            AuthErrorKind::Network
        );
        assert_eq!(login("Too many requests"), AuthErrorKind::Other);
    }

    #[test]
    fn test_register_message_rules() {
        let register = |m| AuthErrorKind::from_message(AuthOperation::Register, m);

        assert_eq!(
            register("The email address is already in use by another account."),
            AuthErrorKind::EmailAlreadyInUse
        );
        assert_eq!(register("Invalid email supplied"), AuthErrorKind::InvalidEmail);
        assert_eq!(register("weak password"), AuthErrorKind::WeakPassword);
        assert_eq!(register("Network unreachable"), AuthErrorKind::Network);
        // Login-only rules do not apply to register.
        assert_eq!(register("user disabled"), AuthErrorKind::Other);
    }

    #[test]
    fn test_unknown_code_falls_back_to_message() {
        let kind = AuthErrorKind::classify(
            AuthOperation::Register,
            Some("SOMETHING_NEW"),
            "network down",
        );
        assert_eq!(kind, AuthErrorKind::Network);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(AuthErrorKind::EmailAlreadyInUse.to_string(), "email-already-in-use");
        assert_eq!(AuthOperation::Login.to_string(), "login");
    }
}
