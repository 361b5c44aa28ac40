//! # In-Process Backend
//!
//! [`MemoryAuthProvider`] and [`MemoryDocumentStore`] behave like the managed
//! backend as seen from the client: the same error codes, backend-assigned
//! ids, and listeners that get the current contents first and a full snapshot
//! after every write. Used by the tests and for running without a network.
//!
//! ## Listener Fan-out
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      MemoryDocumentStore                                │
//! │                                                                         │
//! │  add / set / delete ──► collection "products"                           │
//! │                          ├── docs: BTreeMap<id, Document>  (id order)   │
//! │                          └── events: broadcast::Sender<StoreEvent>      │
//! │                                   │                                     │
//! │                 ┌─────────────────┼─────────────────┐                   │
//! │                 ▼                 ▼                 ▼                   │
//! │           forward task      forward task      forward task              │
//! │                 │                 │                 │                   │
//! │                 ▼                 ▼                 ▼                   │
//! │            ChangeFeed        ChangeFeed        ChangeFeed               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};
use uuid::Uuid;

use vitrina_core::{Document, Fields, Identity, ProviderFailure, Snapshot};

use crate::backend::{AuthProvider, ChangeFeed, DocumentStore};
use crate::error::{SyncError, SyncResult};

/// Minimum password length accepted on account creation.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Buffered snapshots per listener before the producer waits.
const LISTENER_BUFFER: usize = 16;

/// Retained events per collection for slow listeners.
const EVENT_CAPACITY: usize = 64;

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Auth Provider
// =============================================================================

#[derive(Debug, Clone)]
struct Account {
    uid: String,
    email: String,
    password: String,
}

/// In-process email/password accounts.
#[derive(Debug, Default)]
pub struct MemoryAuthProvider {
    /// Accounts keyed by lowercased email.
    accounts: RwLock<HashMap<String, Account>>,
    current: RwLock<Option<Identity>>,
    offline: AtomicBool,
}

impl MemoryAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail as if the network were down.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Drops the session from the provider side, as an expired or
    /// disabled account would.
    pub fn revoke_session(&self) {
        if write(&self.current).take().is_some() {
            info!("Session revoked by provider");
        }
    }

    fn check_online(&self) -> Result<(), ProviderFailure> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ProviderFailure::network());
        }
        Ok(())
    }

    fn start_session(&self, account: &Account) -> Identity {
        let identity = Identity::new(account.uid.clone(), account.email.clone());
        *write(&self.current) = Some(identity.clone());
        identity
    }
}

/// Loose shape check: `local@domain.tld` with no whitespace.
fn is_well_formed_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[async_trait]
impl AuthProvider for MemoryAuthProvider {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, ProviderFailure> {
        self.check_online()?;

        if !is_well_formed_email(email) {
            return Err(ProviderFailure::new(
                "INVALID_EMAIL",
                "The email address is badly formatted.",
            ));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ProviderFailure::new(
                "WEAK_PASSWORD",
                "The given password is invalid. [ Password should be at least 6 characters ]",
            ));
        }

        let account = {
            let mut accounts = write(&self.accounts);
            let key = email.to_lowercase();
            if accounts.contains_key(&key) {
                return Err(ProviderFailure::new(
                    "EMAIL_EXISTS",
                    "The email address is already in use by another account.",
                ));
            }
            let account = Account {
                uid: Uuid::new_v4().simple().to_string(),
                email: email.to_string(),
                password: password.to_string(),
            };
            accounts.insert(key, account.clone());
            account
        };

        debug!(uid = %account.uid, "Account created");
        Ok(self.start_session(&account))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, ProviderFailure> {
        self.check_online()?;

        let account = read(&self.accounts).get(&email.to_lowercase()).cloned();
        let account = account.ok_or_else(|| {
            ProviderFailure::new(
                "EMAIL_NOT_FOUND",
                "There is no user record corresponding to this identifier. The user may have been deleted.",
            )
        })?;

        if account.password != password {
            return Err(ProviderFailure::new(
                "INVALID_PASSWORD",
                "The password is invalid or the user does not have a password.",
            ));
        }

        Ok(self.start_session(&account))
    }

    fn sign_out(&self) {
        *write(&self.current) = None;
    }

    fn current_user(&self) -> Option<Identity> {
        read(&self.current).clone()
    }
}

// =============================================================================
// Document Store
// =============================================================================

#[derive(Debug, Clone)]
enum StoreEvent {
    Snapshot(Snapshot),
    Interrupted(String),
}

#[derive(Debug)]
struct Collection {
    docs: BTreeMap<String, Document>,
    events: broadcast::Sender<StoreEvent>,
}

impl Collection {
    fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Collection {
            docs: BTreeMap::new(),
            events,
        }
    }

    fn snapshot(&self) -> Snapshot {
        self.docs.values().cloned().collect()
    }

    fn publish(&self) {
        // No listeners is fine.
        let _ = self.events.send(StoreEvent::Snapshot(self.snapshot()));
    }

    fn put(&mut self, id: String, fields: Fields) {
        let doc = Document::new(id.clone())
            .with_fields(fields)
            .with_update_time(Utc::now());
        self.docs.insert(id, doc);
        self.publish();
    }
}

/// In-process document collections with live listeners.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Collection>>,
    fail_writes: AtomicBool,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes add/set/delete fail until switched back.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Current contents of a collection, in listener order.
    pub fn documents(&self, collection: &str) -> Snapshot {
        read(&self.collections)
            .get(collection)
            .map(Collection::snapshot)
            .unwrap_or_default()
    }

    /// Stores a document exactly as given, bypassing the write switch.
    ///
    /// Lets tests place documents the client would never write itself,
    /// such as one with missing fields.
    pub fn insert_document(&self, collection: &str, doc: Document) {
        let mut collections = write(&self.collections);
        let c = collections
            .entry(collection.to_string())
            .or_insert_with(Collection::new);
        c.docs.insert(doc.id.clone(), doc);
        c.publish();
    }

    /// Fails every active listener on a collection. Those feeds end.
    pub fn interrupt_listeners(&self, collection: &str, reason: &str) {
        if let Some(c) = read(&self.collections).get(collection) {
            let _ = c.events.send(StoreEvent::Interrupted(reason.to_string()));
        }
    }

    fn check_writable(&self) -> SyncResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SyncError::StoreUnavailable("writes are disabled".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn add(&self, collection: &str, fields: Fields) -> SyncResult<String> {
        self.check_writable()?;

        let id = Uuid::new_v4().simple().to_string();
        write(&self.collections)
            .entry(collection.to_string())
            .or_insert_with(Collection::new)
            .put(id.clone(), fields);

        debug!(collection = %collection, id = %id, "Document added");
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields) -> SyncResult<()> {
        self.check_writable()?;

        write(&self.collections)
            .entry(collection.to_string())
            .or_insert_with(Collection::new)
            .put(id.to_string(), fields);

        debug!(collection = %collection, id = %id, "Document set");
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> SyncResult<()> {
        self.check_writable()?;

        let mut collections = write(&self.collections);
        if let Some(c) = collections.get_mut(collection) {
            if c.docs.remove(id).is_some() {
                c.publish();
                debug!(collection = %collection, id = %id, "Document deleted");
            }
        }
        Ok(())
    }

    fn listen(&self, collection: &str) -> ChangeFeed {
        // Snapshot and subscribe under one lock so no write slips between.
        let (initial, mut events) = {
            let mut collections = write(&self.collections);
            let c = collections
                .entry(collection.to_string())
                .or_insert_with(Collection::new);
            (c.snapshot(), c.events.subscribe())
        };

        let (tx, rx) = mpsc::channel(LISTENER_BUFFER);
        let name = collection.to_string();

        let producer = tokio::spawn(async move {
            if tx.send(Ok(initial)).await.is_err() {
                return;
            }
            loop {
                match events.recv().await {
                    Ok(StoreEvent::Snapshot(snapshot)) => {
                        if tx.send(Ok(snapshot)).await.is_err() {
                            break;
                        }
                    }
                    Ok(StoreEvent::Interrupted(reason)) => {
                        let _ = tx.send(Err(SyncError::ListenFailed(reason))).await;
                        break;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(collection = %name, skipped, "Listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        ChangeFeed::new(rx, producer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrina_core::{FieldValue, Product};

    #[tokio::test]
    async fn test_register_signs_in() {
        let auth = MemoryAuthProvider::new();
        let identity = auth.create_account("ana@example.com", "secret1").await.unwrap();

        assert_eq!(identity.email, "ana@example.com");
        assert_eq!(auth.current_user(), Some(identity));
    }

    #[tokio::test]
    async fn test_register_rejections() {
        let auth = MemoryAuthProvider::new();

        let err = auth.create_account("not-an-email", "secret1").await.unwrap_err();
        assert_eq!(err.code.as_deref(), Some("INVALID_EMAIL"));

        let err = auth.create_account("ana@example.com", "12345").await.unwrap_err();
        assert_eq!(err.code.as_deref(), Some("WEAK_PASSWORD"));

        auth.create_account("ana@example.com", "secret1").await.unwrap();
        let err = auth.create_account("ANA@example.com", "secret2").await.unwrap_err();
        assert_eq!(err.code.as_deref(), Some("EMAIL_EXISTS"));
    }

    #[tokio::test]
    async fn test_sign_in_rejections() {
        let auth = MemoryAuthProvider::new();
        auth.create_account("ana@example.com", "secret1").await.unwrap();
        auth.sign_out();

        let err = auth.sign_in("bob@example.com", "secret1").await.unwrap_err();
        assert_eq!(err.code.as_deref(), Some("EMAIL_NOT_FOUND"));

        let err = auth.sign_in("ana@example.com", "wrong!").await.unwrap_err();
        assert_eq!(err.code.as_deref(), Some("INVALID_PASSWORD"));
        assert!(auth.current_user().is_none());

        auth.set_offline(true);
        let err = auth.sign_in("ana@example.com", "secret1").await.unwrap_err();
        assert_eq!(err.code.as_deref(), Some("NETWORK_REQUEST_FAILED"));
    }

    #[test]
    fn test_email_shape() {
        assert!(is_well_formed_email("a@b.co"));
        assert!(!is_well_formed_email("a@b"));
        assert!(!is_well_formed_email("@b.co"));
        assert!(!is_well_formed_email("a b@c.co"));
        assert!(!is_well_formed_email("a@@b.co"));
    }

    #[tokio::test]
    async fn test_listener_gets_current_then_changes() {
        let store = MemoryDocumentStore::new();
        let pen = Product::new("Pen", 1.5, "", "");
        store.add("products", pen.to_fields()).await.unwrap();

        let mut feed = store.listen("products");
        let initial = feed.next().await.unwrap().unwrap();
        assert_eq!(initial.len(), 1);

        let id = store
            .add("products", Product::new("Mug", 4.0, "", "").to_fields())
            .await
            .unwrap();
        let next = feed.next().await.unwrap().unwrap();
        assert_eq!(next.len(), 2);
        assert!(next.iter().any(|d| d.id == id));
    }

    #[tokio::test]
    async fn test_delete_missing_is_silent() {
        let store = MemoryDocumentStore::new();
        store.delete("products", "nope").await.unwrap();
        assert!(store.documents("products").is_empty());
    }

    #[tokio::test]
    async fn test_set_overwrites_whole_document() {
        let store = MemoryDocumentStore::new();
        store.insert_document(
            "products",
            Document::new("p1")
                .with_field("name", FieldValue::from("Pen"))
                .with_field("legacy", FieldValue::Boolean(true)),
        );

        let mut fields = Fields::new();
        fields.insert("name".into(), FieldValue::from("Pencil"));
        store.set("products", "p1", fields).await.unwrap();

        let docs = store.documents("products");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].get_string("name"), Some("Pencil"));
        assert!(docs[0].get("legacy").is_none());
    }

    #[tokio::test]
    async fn test_failed_writes_change_nothing() {
        let store = MemoryDocumentStore::new();
        store.set_fail_writes(true);

        let err = store.add("products", Fields::new()).await.unwrap_err();
        assert!(matches!(err, SyncError::StoreUnavailable(_)));
        assert!(store.documents("products").is_empty());
    }

    #[tokio::test]
    async fn test_interrupt_ends_feed() {
        let store = MemoryDocumentStore::new();
        let mut feed = store.listen("products");
        feed.next().await.unwrap().unwrap();

        store.interrupt_listeners("products", "permission denied");
        let err = feed.next().await.unwrap().unwrap_err();
        assert!(matches!(err, SyncError::ListenFailed(_)));
        assert!(feed.next().await.is_none());
    }
}
