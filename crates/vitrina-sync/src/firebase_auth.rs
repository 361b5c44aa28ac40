//! # Firebase Authentication
//!
//! Email/password accounts through the Identity Toolkit REST API, with the
//! ID token kept in memory and refreshed before it expires.
//!
//! ## Authentication Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Firebase Authentication Flow                       │
//! │                                                                         │
//! │  ┌────────────────┐     ┌──────────────────────┐  ┌─────────────────┐  │
//! │  │ SessionManager │     │ Identity Toolkit     │  │ Secure Token    │  │
//! │  └───────┬────────┘     └──────────┬───────────┘  └────────┬────────┘  │
//! │          │ 1. accounts:signUp /    │                       │           │
//! │          │    signInWithPassword   │                       │           │
//! │          │────────────────────────►│                       │           │
//! │          │ 2. idToken + refresh    │                       │           │
//! │          │◄────────────────────────│                       │           │
//! │          │                         │                       │           │
//! │          │  [Later: token near expiry, on next id_token()] │           │
//! │          │                                                 │           │
//! │          │ 3. token (grant_type=refresh_token)             │           │
//! │          │────────────────────────────────────────────────►│           │
//! │          │ 4. new id_token  (or TOKEN_EXPIRED etc: session │           │
//! │          │◄──────────────────────────────── is cleared)    │           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Token Storage
//! Tokens live in memory only. The refresh happens 5 minutes before
//! expiration.

use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use vitrina_core::{Identity, ProviderFailure};

use crate::backend::AuthProvider;
use crate::config::VitrinaConfig;
use crate::error::{SyncError, SyncResult};
use crate::rest;

/// Margin before token expiration to trigger refresh (5 minutes)
const REFRESH_MARGIN_SECS: u64 = 300;

/// Token lifetime assumed when the response does not carry a usable one.
const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

/// Refresh rejections after which the account must sign in again.
const SESSION_ENDING_CODES: &[&str] = &[
    "TOKEN_EXPIRED",
    "USER_DISABLED",
    "USER_NOT_FOUND",
    "INVALID_REFRESH_TOKEN",
];

// =============================================================================
// Session
// =============================================================================

/// The signed-in account and its tokens.
#[derive(Debug, Clone)]
pub struct UserSession {
    pub identity: Identity,
    /// Bearer token for Firestore requests
    pub id_token: String,
    pub refresh_token: String,
    /// When the ID token expires (local time)
    pub expires_at: Instant,
}

impl UserSession {
    /// Check if the token is expired or about to expire
    pub fn needs_refresh(&self) -> bool {
        Instant::now() + Duration::from_secs(REFRESH_MARGIN_SECS) >= self.expires_at
    }

    /// Check if the token is completely expired (no grace period)
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    pub fn remaining_secs(&self) -> u64 {
        self.expires_at
            .saturating_duration_since(Instant::now())
            .as_secs()
    }
}

fn expiry_from(expires_in: &str) -> Instant {
    let secs = expires_in
        .trim()
        .parse::<u64>()
        .unwrap_or(DEFAULT_EXPIRES_IN_SECS);
    let now = Instant::now();
    now.checked_add(Duration::from_secs(secs))
        .unwrap_or(now + Duration::from_secs(DEFAULT_EXPIRES_IN_SECS))
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: String,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    grant_type: &'static str,
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: String,
    user_id: String,
}

// =============================================================================
// Configuration
// =============================================================================

/// Endpoints and key for the auth REST APIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirebaseAuthConfig {
    pub api_key: String,
    /// Identity Toolkit base, e.g. `https://identitytoolkit.googleapis.com/v1`
    pub auth_url: String,
    /// Secure Token base, e.g. `https://securetoken.googleapis.com/v1`
    pub token_url: String,
}

impl FirebaseAuthConfig {
    pub fn from_config(config: &VitrinaConfig) -> Self {
        FirebaseAuthConfig {
            api_key: config.firebase.api_key.clone(),
            auth_url: config.firebase.auth_url.trim_end_matches('/').to_string(),
            token_url: config.firebase.token_url.trim_end_matches('/').to_string(),
        }
    }
}

// =============================================================================
// Firebase Auth
// =============================================================================

/// Auth provider backed by the Identity Toolkit REST API.
pub struct FirebaseAuth {
    config: FirebaseAuthConfig,
    client: reqwest::Client,
    session: RwLock<Option<UserSession>>,
    /// Serializes refreshes so concurrent callers share one round trip.
    refresh_lock: Mutex<()>,
}

impl FirebaseAuth {
    pub fn new(config: FirebaseAuthConfig, client: reqwest::Client) -> Self {
        FirebaseAuth {
            config,
            client,
            session: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &VitrinaConfig) -> SyncResult<Self> {
        Ok(Self::new(
            FirebaseAuthConfig::from_config(config),
            config.http_client()?,
        ))
    }

    /// Current session info (without triggering refresh)
    pub fn session(&self) -> Option<UserSession> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace_session(&self, session: Option<UserSession>) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session;
    }

    /// A valid ID token for the signed-in account, refreshing it if needed.
    ///
    /// ## Flow
    /// 1. No session → `NotAuthenticated`
    /// 2. Token outside the refresh margin → returned as is
    /// 3. Otherwise refresh; a session-ending rejection clears the session
    pub async fn id_token(&self) -> SyncResult<String> {
        let current = self.session().ok_or(SyncError::NotAuthenticated)?;
        if !current.needs_refresh() {
            debug!(remaining_secs = current.remaining_secs(), "Using cached token");
            return Ok(current.id_token);
        }

        let _guard = self.refresh_lock.lock().await;

        // Double-check after acquiring the lock
        let current = self.session().ok_or(SyncError::NotAuthenticated)?;
        if !current.needs_refresh() {
            return Ok(current.id_token);
        }

        match self.do_refresh(&current.refresh_token).await {
            Ok(refreshed) => {
                // Keep the result only if the same account is still signed in.
                let mut guard = self.session.write().unwrap_or_else(PoisonError::into_inner);
                let same_account = guard
                    .as_ref()
                    .is_some_and(|s| s.identity.uid == refreshed.identity.uid);
                if !same_account {
                    return Err(SyncError::NotAuthenticated);
                }
                info!(
                    uid = %refreshed.identity.uid,
                    expires_in_secs = refreshed.remaining_secs(),
                    "Token refreshed"
                );
                let token = refreshed.id_token.clone();
                *guard = Some(refreshed);
                Ok(token)
            }
            Err(e) if e.code().is_some_and(|c| SESSION_ENDING_CODES.contains(&c)) => {
                let code = e.code().unwrap_or_default().to_string();
                warn!(uid = %current.identity.uid, code = %code, "Session ended by provider");
                self.replace_session(None);
                Err(SyncError::SessionExpired(code))
            }
            Err(e) if !current.is_expired() => {
                warn!(error = %e, "Token refresh failed, using current token");
                Ok(current.id_token)
            }
            Err(e) => Err(e),
        }
    }

    async fn password_call(
        &self,
        endpoint: &str,
        email: &str,
        password: &str,
    ) -> SyncResult<UserSession> {
        let url = format!("{}/{}", self.config.auth_url, endpoint);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&PasswordRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await?;

        let body: PasswordResponse = rest::check(response).await?.json().await?;
        let email = if body.email.is_empty() {
            email.to_string()
        } else {
            body.email
        };

        Ok(UserSession {
            identity: Identity::new(body.local_id, email),
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            expires_at: expiry_from(&body.expires_in),
        })
    }

    async fn do_refresh(&self, refresh_token: &str) -> SyncResult<UserSession> {
        let url = format!("{}/token", self.config.token_url);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&RefreshRequest {
                grant_type: "refresh_token",
                refresh_token,
            })
            .send()
            .await?;

        let body: RefreshResponse = rest::check(response).await?.json().await?;

        // The token endpoint does not return the email.
        let email = self
            .session()
            .map(|s| s.identity.email)
            .unwrap_or_default();

        Ok(UserSession {
            identity: Identity::new(body.user_id, email),
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            expires_at: expiry_from(&body.expires_in),
        })
    }

    async fn start_session(
        &self,
        endpoint: &str,
        email: &str,
        password: &str,
    ) -> Result<Identity, ProviderFailure> {
        let session = self
            .password_call(endpoint, email, password)
            .await
            .map_err(to_provider_failure)?;
        let identity = session.identity.clone();
        self.replace_session(Some(session));
        Ok(identity)
    }
}

/// Maps a transport or REST error to what the session manager classifies.
fn to_provider_failure(err: SyncError) -> ProviderFailure {
    match err {
        SyncError::Http {
            code: Some(code),
            message,
            ..
        } => ProviderFailure::new(code, message),
        SyncError::Http { message, .. } => ProviderFailure::message_only(message),
        e if e.is_network_error() => ProviderFailure::network(),
        e => ProviderFailure::message_only(e.to_string()),
    }
}

#[async_trait]
impl AuthProvider for FirebaseAuth {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, ProviderFailure> {
        self.start_session("accounts:signUp", email, password).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, ProviderFailure> {
        self.start_session("accounts:signInWithPassword", email, password)
            .await
    }

    fn sign_out(&self) {
        self.replace_session(None);
    }

    fn current_user(&self) -> Option<Identity> {
        self.session().map(|s| s.identity)
    }
}

impl std::fmt::Debug for FirebaseAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseAuth")
            .field("auth_url", &self.config.auth_url)
            .field("signed_in", &self.current_user().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_expiring_in(secs: u64) -> UserSession {
        UserSession {
            identity: Identity::new("u1", "ana@example.com"),
            id_token: "id".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Instant::now() + Duration::from_secs(secs),
        }
    }

    #[test]
    fn test_token_needs_refresh() {
        // With only 1 minute left and 5 minute margin, should need refresh
        let session = session_expiring_in(60);
        assert!(session.needs_refresh());
        assert!(!session.is_expired());
    }

    #[test]
    fn test_token_no_refresh_needed() {
        let session = session_expiring_in(3600);
        assert!(!session.needs_refresh());
        assert!(session.remaining_secs() > 3500);
    }

    #[test]
    fn test_expiry_parsing() {
        let at = expiry_from("120");
        let remaining = at.saturating_duration_since(Instant::now()).as_secs();
        assert!(remaining <= 120 && remaining > 100);

        let fallback = expiry_from("soon");
        assert!(fallback.saturating_duration_since(Instant::now()).as_secs() > 3000);
    }

    #[test]
    fn test_expiry_out_of_range_falls_back() {
        let at = expiry_from("18446744073709551615");
        let remaining = at.saturating_duration_since(Instant::now()).as_secs();
        assert!(remaining > 3000 && remaining <= DEFAULT_EXPIRES_IN_SECS);
    }

    #[test]
    fn test_provider_failure_mapping() {
        let failure = to_provider_failure(SyncError::Http {
            status: 400,
            code: Some("EMAIL_EXISTS".into()),
            message: "EMAIL_EXISTS".into(),
        });
        assert_eq!(failure.code.as_deref(), Some("EMAIL_EXISTS"));

        let failure = to_provider_failure(SyncError::ConnectionFailed("refused".into()));
        assert_eq!(failure, ProviderFailure::network());

        let failure = to_provider_failure(SyncError::DeserializationFailed("eof".into()));
        assert!(failure.code.is_none());
    }

    #[test]
    fn test_config_trims_trailing_slash() {
        let mut config = VitrinaConfig::default();
        config.firebase.auth_url = "http://localhost:9099/identitytoolkit.googleapis.com/v1/".into();
        let auth = FirebaseAuthConfig::from_config(&config);
        assert!(!auth.auth_url.ends_with('/'));
    }

    #[tokio::test]
    async fn test_id_token_without_session() {
        let auth = FirebaseAuth::new(
            FirebaseAuthConfig::from_config(&VitrinaConfig::default()),
            reqwest::Client::new(),
        );
        assert!(matches!(
            auth.id_token().await,
            Err(SyncError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_fresh_token_is_reused() {
        let auth = FirebaseAuth::new(
            FirebaseAuthConfig::from_config(&VitrinaConfig::default()),
            reqwest::Client::new(),
        );
        auth.replace_session(Some(session_expiring_in(3600)));
        assert_eq!(auth.id_token().await.unwrap(), "id");

        auth.sign_out();
        assert!(auth.current_user().is_none());
    }
}
