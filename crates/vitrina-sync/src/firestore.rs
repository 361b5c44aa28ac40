//! # Firestore Document Store
//!
//! [`DocumentStore`] over the Firestore REST v1 API.
//!
//! ## Request Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  {firestore_url}/projects/{project}/databases/{database}/documents      │
//! │                                                                         │
//! │  add(c, fields)      POST   /{c}                 → id from "name"       │
//! │  set(c, id, fields)  PATCH  /{c}/{id}            (no mask: overwrite)   │
//! │  delete(c, id)       DELETE /{c}/{id}                                   │
//! │  list(c)             GET    /{c}?pageSize=&pageToken=   (id order)      │
//! │  listen(c)           list(c) every poll_interval, emit on change        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Field values travel as Firestore typed JSON:
//! `{"stringValue": "Pen"}`, `{"doubleValue": 1.5}`,
//! `{"integerValue": "3"}` (a decimal string), `{"booleanValue": true}`,
//! `{"nullValue": null}`. Other value types read as [`FieldValue::Null`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use url::Url;

use vitrina_core::{Document, FieldValue, Fields, Snapshot};

use crate::backend::{ChangeFeed, DocumentStore};
use crate::config::VitrinaConfig;
use crate::error::{SyncError, SyncResult};
use crate::firebase_auth::FirebaseAuth;
use crate::rest;

/// Buffered snapshots per listener before polling waits.
const LISTEN_BUFFER: usize = 4;

// =============================================================================
// Value Encoding
// =============================================================================

/// Encodes a field value as Firestore typed JSON.
pub fn encode_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => json!({ "nullValue": null }),
        FieldValue::Boolean(b) => json!({ "booleanValue": b }),
        FieldValue::Integer(i) => json!({ "integerValue": i.to_string() }),
        FieldValue::Double(d) if d.is_nan() => json!({ "doubleValue": "NaN" }),
        FieldValue::Double(d) if d.is_infinite() => {
            json!({ "doubleValue": if *d > 0.0 { "Infinity" } else { "-Infinity" } })
        }
        FieldValue::Double(d) => json!({ "doubleValue": d }),
        FieldValue::String(s) => json!({ "stringValue": s }),
    }
}

/// Decodes Firestore typed JSON. Unsupported or malformed values are `Null`.
pub fn decode_value(value: &Value) -> FieldValue {
    let Some(obj) = value.as_object() else {
        return FieldValue::Null;
    };

    if let Some(s) = obj.get("stringValue").and_then(Value::as_str) {
        return FieldValue::String(s.to_string());
    }
    if let Some(d) = obj.get("doubleValue") {
        let parsed = match d {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => match s.as_str() {
                "NaN" => Some(f64::NAN),
                "Infinity" => Some(f64::INFINITY),
                "-Infinity" => Some(f64::NEG_INFINITY),
                other => other.parse().ok(),
            },
            _ => None,
        };
        return parsed.map(FieldValue::Double).unwrap_or(FieldValue::Null);
    }
    if let Some(i) = obj.get("integerValue") {
        let parsed = match i {
            Value::String(s) => s.parse().ok(),
            Value::Number(n) => n.as_i64(),
            _ => None,
        };
        return parsed.map(FieldValue::Integer).unwrap_or(FieldValue::Null);
    }
    if let Some(b) = obj.get("booleanValue").and_then(Value::as_bool) {
        return FieldValue::Boolean(b);
    }
    FieldValue::Null
}

fn encode_fields(fields: &Fields) -> Value {
    let encoded: Map<String, Value> = fields
        .iter()
        .map(|(name, value)| (name.clone(), encode_value(value)))
        .collect();
    json!({ "fields": encoded })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
    #[serde(default)]
    update_time: Option<String>,
}

impl RestDocument {
    fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or_default()
    }

    fn into_document(self) -> Document {
        let id = self.id().to_string();
        let fields = self
            .fields
            .iter()
            .map(|(name, value)| (name.clone(), decode_value(value)))
            .collect();

        let mut doc = Document::new(id).with_fields(fields);
        if let Some(time) = self
            .update_time
            .as_deref()
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        {
            doc = doc.with_update_time(time.with_timezone(&Utc));
        }
        doc
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<RestDocument>,
    #[serde(default)]
    next_page_token: Option<String>,
}

// =============================================================================
// Configuration
// =============================================================================

/// Where and how to reach the database.
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// e.g. `https://firestore.googleapis.com/v1`
    pub base_url: String,
    pub project_id: String,
    pub database_id: String,
    /// Sent as `?key=`; may be empty.
    pub api_key: String,
    pub page_size: u32,
    pub poll_interval: Duration,
}

impl FirestoreConfig {
    pub fn from_config(config: &VitrinaConfig) -> Self {
        FirestoreConfig {
            base_url: config.firebase.firestore_url.trim_end_matches('/').to_string(),
            project_id: config.firebase.project_id.clone(),
            database_id: config.firebase.database_id.clone(),
            api_key: config.firebase.api_key.clone(),
            page_size: config.catalog.page_size,
            poll_interval: config.poll_interval(),
        }
    }

    /// Root of all document paths in the database.
    pub fn documents_root(&self) -> String {
        format!(
            "{}/projects/{}/databases/{}/documents",
            self.base_url, self.project_id, self.database_id
        )
    }
}

// =============================================================================
// Firestore Store
// =============================================================================

/// Document store backed by the Firestore REST API.
///
/// Cloning is cheap; clones share the HTTP client and auth.
#[derive(Clone)]
pub struct FirestoreStore {
    config: Arc<FirestoreConfig>,
    client: reqwest::Client,
    auth: Option<Arc<FirebaseAuth>>,
}

impl FirestoreStore {
    pub fn new(
        config: FirestoreConfig,
        client: reqwest::Client,
        auth: Option<Arc<FirebaseAuth>>,
    ) -> Self {
        FirestoreStore {
            config: Arc::new(config),
            client,
            auth,
        }
    }

    /// Builds a store that authenticates as whoever is signed in on `auth`.
    pub fn from_config(config: &VitrinaConfig, auth: Option<Arc<FirebaseAuth>>) -> SyncResult<Self> {
        Ok(Self::new(
            FirestoreConfig::from_config(config),
            config.http_client()?,
            auth,
        ))
    }

    fn url(&self, collection: &str, id: Option<&str>) -> SyncResult<Url> {
        let mut url = Url::parse(&self.config.documents_root())?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| SyncError::InvalidUrl(self.config.base_url.clone()))?;
            segments.pop_if_empty().push(collection);
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    /// Adds the API key and, when someone is signed in, the bearer token.
    async fn authorize(&self, request: reqwest::RequestBuilder) -> SyncResult<reqwest::RequestBuilder> {
        let request = if self.config.api_key.is_empty() {
            request
        } else {
            request.query(&[("key", self.config.api_key.as_str())])
        };

        match &self.auth {
            Some(auth) => match auth.id_token().await {
                Ok(token) => Ok(request.bearer_auth(token)),
                // Unauthenticated access is up to the security rules.
                Err(SyncError::NotAuthenticated) => Ok(request),
                Err(e) => Err(e),
            },
            None => Ok(request),
        }
    }

    /// Reads every document of a collection, following pagination.
    pub async fn list(&self, collection: &str) -> SyncResult<Snapshot> {
        let url = self.url(collection, None)?;
        let page_size = self.config.page_size.to_string();
        let mut snapshot = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(url.clone())
                .query(&[("pageSize", page_size.as_str())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = self.authorize(request).await?.send().await?;
            let page: ListResponse = rest::check(response).await?.json().await?;
            snapshot.extend(page.documents.into_iter().map(RestDocument::into_document));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(collection = %collection, count = snapshot.len(), "Collection listed");
        Ok(snapshot)
    }

    async fn poll(self, collection: String, tx: mpsc::Sender<SyncResult<Snapshot>>) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last: Option<Snapshot> = None;

        loop {
            ticker.tick().await;
            match self.list(&collection).await {
                Ok(snapshot) => {
                    if last.as_ref() == Some(&snapshot) {
                        continue;
                    }
                    last = Some(snapshot.clone());
                    if tx.send(Ok(snapshot)).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(collection = %collection, error = %e, "Listener poll failed");
                    let _ = tx.send(Err(SyncError::ListenFailed(e.to_string()))).await;
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn add(&self, collection: &str, fields: Fields) -> SyncResult<String> {
        let request = self
            .client
            .post(self.url(collection, None)?)
            .json(&encode_fields(&fields));
        let response = self.authorize(request).await?.send().await?;
        let created: RestDocument = rest::check(response).await?.json().await?;

        let id = created.id().to_string();
        if id.is_empty() {
            return Err(SyncError::InvalidMessage(format!(
                "created document has no id: {}",
                created.name
            )));
        }
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields) -> SyncResult<()> {
        let request = self
            .client
            .patch(self.url(collection, Some(id))?)
            .json(&encode_fields(&fields));
        let response = self.authorize(request).await?.send().await?;
        rest::check(response).await?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> SyncResult<()> {
        let request = self.client.delete(self.url(collection, Some(id))?);
        let response = self.authorize(request).await?.send().await?;
        rest::check(response).await?;
        Ok(())
    }

    fn listen(&self, collection: &str) -> ChangeFeed {
        let (tx, rx) = mpsc::channel(LISTEN_BUFFER);
        info!(
            collection = %collection,
            interval_ms = self.config.poll_interval.as_millis() as u64,
            "Polling collection"
        );
        let producer = tokio::spawn(self.clone().poll(collection.to_string(), tx));
        ChangeFeed::new(rx, producer)
    }
}

impl std::fmt::Debug for FirestoreStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirestoreStore")
            .field("root", &self.config.documents_root())
            .field("authenticated", &self.auth.is_some())
            .finish()
    }
}
