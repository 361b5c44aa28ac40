//! # Backend Configuration
//!
//! Settings for the Firebase REST backend and the catalog listener.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     VITRINA_API_KEY=AIza...                                            │
//! │     FIRESTORE_EMULATOR_HOST=127.0.0.1:8080                             │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/vitrina/vitrina.toml (Linux)                             │
//! │     ~/Library/Application Support/com.vitrina.vitrina/vitrina.toml     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     public Google endpoints, collection "products"                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # vitrina.toml
//! [firebase]
//! api_key = "AIzaSy..."
//! project_id = "vitrina-demo"
//!
//! [catalog]
//! collection = "products"
//! poll_interval_ms = 1000
//!
//! [http]
//! request_timeout_secs = 30
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use vitrina_core::PRODUCTS_COLLECTION;

use crate::error::{SyncError, SyncResult};

/// Public Identity Toolkit endpoint.
pub const DEFAULT_AUTH_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Public Secure Token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1";

/// Public Firestore endpoint.
pub const DEFAULT_FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";

// =============================================================================
// Firebase Settings
// =============================================================================

/// Project and endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirebaseSettings {
    /// Web API key of the project.
    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub project_id: String,

    #[serde(default = "default_database_id")]
    pub database_id: String,

    #[serde(default = "default_auth_url")]
    pub auth_url: String,

    #[serde(default = "default_token_url")]
    pub token_url: String,

    #[serde(default = "default_firestore_url")]
    pub firestore_url: String,
}

fn default_database_id() -> String {
    "(default)".to_string()
}

fn default_auth_url() -> String {
    DEFAULT_AUTH_URL.to_string()
}

fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

fn default_firestore_url() -> String {
    DEFAULT_FIRESTORE_URL.to_string()
}

impl Default for FirebaseSettings {
    fn default() -> Self {
        FirebaseSettings {
            api_key: String::new(),
            project_id: String::new(),
            database_id: default_database_id(),
            auth_url: default_auth_url(),
            token_url: default_token_url(),
            firestore_url: default_firestore_url(),
        }
    }
}

// =============================================================================
// Catalog Settings
// =============================================================================

/// Catalog collection and listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSettings {
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Interval between listener polls (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Documents requested per list page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_collection() -> String {
    PRODUCTS_COLLECTION.to_string()
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_page_size() -> u32 {
    300
}

impl Default for CatalogSettings {
    fn default() -> Self {
        CatalogSettings {
            collection: default_collection(),
            poll_interval_ms: default_poll_interval(),
            page_size: default_page_size(),
        }
    }
}

// =============================================================================
// HTTP Settings
// =============================================================================

/// Transport timeouts for the REST client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSettings {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for HttpSettings {
    fn default() -> Self {
        HttpSettings {
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete backend configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VitrinaConfig {
    #[serde(default)]
    pub firebase: FirebaseSettings,

    #[serde(default)]
    pub catalog: CatalogSettings,

    #[serde(default)]
    pub http: HttpSettings,
}

impl VitrinaConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (vitrina.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.firebase.api_key.trim().is_empty() {
            return Err(SyncError::InvalidConfig("firebase.api_key is required".into()));
        }
        if self.firebase.project_id.trim().is_empty() {
            return Err(SyncError::InvalidConfig(
                "firebase.project_id is required".into(),
            ));
        }
        if self.catalog.collection.trim().is_empty() {
            return Err(SyncError::InvalidConfig(
                "catalog.collection must not be empty".into(),
            ));
        }

        for url in [
            &self.firebase.auth_url,
            &self.firebase.token_url,
            &self.firebase.firestore_url,
        ] {
            let parsed = Url::parse(url)?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(SyncError::InvalidUrl(format!(
                    "Endpoint must start with http:// or https://, got: {}",
                    url
                )));
            }
        }

        if self.catalog.page_size == 0 {
            return Err(SyncError::InvalidConfig(
                "page_size must be greater than 0".into(),
            ));
        }
        if self.catalog.poll_interval_ms == 0 {
            return Err(SyncError::InvalidConfig(
                "poll_interval_ms must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Applies overrides from any variable lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("VITRINA_API_KEY") {
            self.firebase.api_key = key;
        }

        if let Some(project) = lookup("VITRINA_PROJECT_ID") {
            debug!(project = %project, "Overriding project id from environment");
            self.firebase.project_id = project;
        }

        if let Some(collection) = lookup("VITRINA_COLLECTION") {
            self.catalog.collection = collection;
        }

        if let Some(interval) = lookup("VITRINA_POLL_INTERVAL_MS") {
            match interval.parse::<u64>() {
                Ok(ms) => self.catalog.poll_interval_ms = ms,
                Err(_) => warn!(value = %interval, "Ignoring invalid VITRINA_POLL_INTERVAL_MS"),
            }
        }

        // Emulators speak plain HTTP on a local host:port.
        if let Some(host) = lookup("FIREBASE_AUTH_EMULATOR_HOST") {
            debug!(host = %host, "Using auth emulator");
            self.firebase.auth_url = format!("http://{}/identitytoolkit.googleapis.com/v1", host);
            self.firebase.token_url = format!("http://{}/securetoken.googleapis.com/v1", host);
        }

        if let Some(host) = lookup("FIRESTORE_EMULATOR_HOST") {
            debug!(host = %host, "Using Firestore emulator");
            self.firebase.firestore_url = format!("http://{}/v1", host);
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "vitrina", "vitrina")
            .map(|dirs| dirs.config_dir().join("vitrina.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.catalog.poll_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.http.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.request_timeout_secs)
    }

    /// Builds the shared HTTP client with the configured timeouts.
    pub fn http_client(&self) -> SyncResult<reqwest::Client> {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout())
            .timeout(self.request_timeout())
            .build()
            .map_err(|e| SyncError::InvalidConfig(format!("HTTP client: {}", e)))
    }
}
