//! # Session Manager
//!
//! Register, login and logout against an [`AuthProvider`], plus synchronous
//! queries for the signed-in identity.
//!
//! ## Session Lifecycle
//! ```text
//!                 register / login (ok)
//!   ┌────────────┐ ──────────────────────► ┌────────────┐
//!   │ Signed out │                         │ Signed in  │
//!   └────────────┘ ◄────────────────────── └────────────┘
//!        ▲          logout / provider             │
//!        │          invalidates session           │
//!        └──── register / login (err) ────────────┘ (state unchanged
//!                                                    by a failure)
//! ```
//!
//! The provider owns the session. The manager never caches it, so a session
//! the provider drops on its own is gone from the next query.

use std::sync::Arc;

use tracing::{info, warn};

use vitrina_core::{AuthError, AuthOperation, Identity, ProviderFailure};

use crate::backend::AuthProvider;

/// Session operations over an auth provider.
#[derive(Clone)]
pub struct SessionManager {
    provider: Arc<dyn AuthProvider>,
}

impl SessionManager {
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        SessionManager { provider }
    }

    /// Creates an account and signs it in.
    pub async fn register(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        match self.provider.create_account(email, password).await {
            Ok(identity) => {
                info!(uid = %identity.uid, "Registered");
                Ok(identity)
            }
            Err(failure) => Err(Self::classify(AuthOperation::Register, failure)),
        }
    }

    /// Signs in an existing account.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        match self.provider.sign_in(email, password).await {
            Ok(identity) => {
                info!(uid = %identity.uid, "Logged in");
                Ok(identity)
            }
            Err(failure) => Err(Self::classify(AuthOperation::Login, failure)),
        }
    }

    /// Ends the session. Safe to call when already signed out.
    pub fn logout(&self) {
        let previous = self.provider.current_user();
        self.provider.sign_out();
        if let Some(identity) = previous {
            info!(uid = %identity.uid, "Logged out");
        }
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.provider.current_user()
    }

    pub fn is_logged_in(&self) -> bool {
        self.current_identity().is_some()
    }

    /// Email of the signed-in account, for headers and greetings.
    pub fn current_email(&self) -> Option<String> {
        self.current_identity().map(|identity| identity.email)
    }

    fn classify(operation: AuthOperation, failure: ProviderFailure) -> AuthError {
        let err = AuthError::from_failure(operation, failure);
        warn!(
            operation = %operation,
            kind = %err.kind,
            message = %err.message,
            "Authentication failed"
        );
        err
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("logged_in", &self.is_logged_in())
            .finish()
    }
}
