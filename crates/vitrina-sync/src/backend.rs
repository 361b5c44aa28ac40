//! # Backend Seams
//!
//! The two external collaborators the client consumes, as traits, plus the
//! [`ChangeFeed`] handed out by a collection listener.
//!
//! ```text
//! ┌──────────────────────┐            ┌──────────────────────────────────┐
//! │   SessionManager     │──────────► │ AuthProvider                     │
//! └──────────────────────┘            │  create_account / sign_in        │
//!                                     │  sign_out / current_user         │
//!                                     └──────────────────────────────────┘
//! ┌──────────────────────┐            ┌──────────────────────────────────┐
//! │ CatalogSynchronizer  │──────────► │ DocumentStore                    │
//! └──────────────────────┘            │  add / set / delete              │
//!            ▲                        │  listen ──► ChangeFeed           │
//!            └──── snapshots ─────────┴──────────────────────────────────┘
//! ```
//!
//! Implementations: [`crate::memory`] (in-process) and
//! [`crate::firebase_auth`] / [`crate::firestore`] (REST).

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use vitrina_core::{Fields, Identity, ProviderFailure, Snapshot};

use crate::error::SyncResult;

// =============================================================================
// Auth Provider
// =============================================================================

/// An email/password authentication provider.
///
/// The provider is the source of truth for the session; callers never keep
/// their own copy.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Creates an account and signs it in.
    async fn create_account(&self, email: &str, password: &str)
        -> Result<Identity, ProviderFailure>;

    /// Signs in an existing account.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, ProviderFailure>;

    /// Drops the local session. Never fails.
    fn sign_out(&self);

    /// The cached session, without any network call.
    fn current_user(&self) -> Option<Identity>;
}

// =============================================================================
// Document Store
// =============================================================================

/// A remote store of named document collections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates a document with a backend-assigned id and returns that id.
    async fn add(&self, collection: &str, fields: Fields) -> SyncResult<String>;

    /// Overwrites the whole document `id`, creating it if missing.
    async fn set(&self, collection: &str, id: &str, fields: Fields) -> SyncResult<()>;

    /// Removes the document `id`.
    async fn delete(&self, collection: &str, id: &str) -> SyncResult<()>;

    /// Registers a change listener on a collection.
    ///
    /// The feed yields the current contents first, then a full snapshot after
    /// every change. After an `Err` item the feed ends. Must be called from
    /// within a tokio runtime.
    fn listen(&self, collection: &str) -> ChangeFeed;
}

// =============================================================================
// Change Feed
// =============================================================================

/// Receiving end of a collection listener.
///
/// Dropping the feed stops the task that produces it.
pub struct ChangeFeed {
    rx: mpsc::Receiver<SyncResult<Snapshot>>,
    producer: Option<JoinHandle<()>>,
}

impl ChangeFeed {
    /// Wraps a receiver and the task feeding it.
    pub fn new(rx: mpsc::Receiver<SyncResult<Snapshot>>, producer: JoinHandle<()>) -> Self {
        ChangeFeed {
            rx,
            producer: Some(producer),
        }
    }

    /// A feed without a producer task, fed directly by the sender side.
    pub fn from_receiver(rx: mpsc::Receiver<SyncResult<Snapshot>>) -> Self {
        ChangeFeed { rx, producer: None }
    }

    /// Waits for the next snapshot. `None` once the listener has ended.
    pub async fn next(&mut self) -> Option<SyncResult<Snapshot>> {
        self.rx.recv().await
    }
}

impl Drop for ChangeFeed {
    fn drop(&mut self) {
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
    }
}

impl std::fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("has_producer", &self.producer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrina_core::Document;

    #[tokio::test]
    async fn test_feed_yields_then_ends() {
        let (tx, rx) = mpsc::channel(4);
        let mut feed = ChangeFeed::from_receiver(rx);

        tx.send(Ok(vec![Document::new("a")])).await.unwrap();
        drop(tx);

        let first = feed.next().await.unwrap().unwrap();
        assert_eq!(first[0].id, "a");
        assert!(feed.next().await.is_none());
    }

    #[tokio::test]
    async fn test_dropping_feed_stops_producer() {
        let (tx, rx) = mpsc::channel::<SyncResult<Snapshot>>(1);
        let producer = tokio::spawn(async move {
            loop {
                if tx.send(Ok(Vec::new())).await.is_err() {
                    break;
                }
            }
        });
        let abort = producer.abort_handle();
        let feed = ChangeFeed::new(rx, producer);
        drop(feed);

        let stopped = tokio::time::timeout(std::time::Duration::from_secs(1), async {
            while !abort.is_finished() {
                tokio::task::yield_now().await;
            }
        })
        .await;
        assert!(stopped.is_ok());
    }
}
