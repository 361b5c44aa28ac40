//! # Catalog Synchronizer
//!
//! Keeps a live, ordered list of products mirrored from one document
//! collection, and forwards create/update/delete requests to the store.
//!
//! ## Task Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       CatalogSynchronizer                               │
//! │                                                                         │
//! │  add_product / update_product / delete_product                          │
//! │        │ (never blocks, never reports an outcome)                       │
//! │        ▼                                                                │
//! │  mpsc::unbounded ──► mutation worker ──► DocumentStore add/set/delete   │
//! │                      (one at a time, in call order; failures logged)    │
//! │                                                                         │
//! │  DocumentStore::listen ──► listener task ──► watch<Vec<Product>>        │
//! │                            (each snapshot       │                       │
//! │                             replaces the list)  ├──► products()         │
//! │                                                 └──► ProductFeed        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The listener is registered once, in [`CatalogSynchronizer::start`], and
//! lives until the synchronizer is dropped. A listener error is logged and
//! ends live updates; the list keeps its last value.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, error, info, warn};

use vitrina_core::{Fields, Product};

use crate::backend::{ChangeFeed, DocumentStore};

// =============================================================================
// Commands
// =============================================================================

/// Work queued for the mutation worker.
#[derive(Debug)]
enum CatalogCommand {
    Add(Fields),
    Update { id: String, fields: Fields },
    Delete { id: String },
    /// Answered once everything queued before it has been issued.
    Flush(oneshot::Sender<()>),
}

// =============================================================================
// Synchronizer
// =============================================================================

/// Live product list over a document collection.
pub struct CatalogSynchronizer {
    collection: String,
    products: Arc<watch::Sender<Vec<Product>>>,
    commands: mpsc::UnboundedSender<CatalogCommand>,
    listener: JoinHandle<()>,
    worker: JoinHandle<()>,
}

impl CatalogSynchronizer {
    /// Registers the collection listener and starts the mutation worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        let collection = collection.into();
        let (products, _) = watch::channel(Vec::new());
        let products = Arc::new(products);

        let feed = store.listen(&collection);
        let listener = tokio::spawn(run_listener(
            feed,
            Arc::clone(&products),
            collection.clone(),
        ));

        let (commands, queue) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(store, collection.clone(), queue));

        info!(collection = %collection, "Catalog synchronizer started");

        CatalogSynchronizer {
            collection,
            products,
            commands,
            listener,
            worker,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Requests creation of a product. The product's `id` is ignored; the
    /// store assigns one.
    pub fn add_product(&self, product: &Product) {
        self.enqueue(CatalogCommand::Add(product.to_fields()));
    }

    /// Requests a full overwrite of document `id` with the product's fields.
    pub fn update_product(&self, id: &str, product: &Product) {
        self.enqueue(CatalogCommand::Update {
            id: id.to_string(),
            fields: product.to_fields(),
        });
    }

    /// Requests removal of document `id`.
    pub fn delete_product(&self, id: &str) {
        self.enqueue(CatalogCommand::Delete { id: id.to_string() });
    }

    /// Waits until every mutation requested before this call has been
    /// issued and answered by the store, successfully or not.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.commands.send(CatalogCommand::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    /// The current list.
    pub fn products(&self) -> Vec<Product> {
        self.products.borrow().clone()
    }

    /// A live view of the list: the current value plus every replacement.
    pub fn observe_products(&self) -> ProductFeed {
        ProductFeed {
            rx: self.products.subscribe(),
        }
    }

    /// Stops the listener and drops any mutation not yet issued.
    pub fn shutdown(self) {
        drop(self);
    }

    fn enqueue(&self, command: CatalogCommand) {
        if self.commands.send(command).is_err() {
            warn!(collection = %self.collection, "Catalog worker stopped; mutation dropped");
        }
    }
}

impl Drop for CatalogSynchronizer {
    fn drop(&mut self) {
        self.listener.abort();
        self.worker.abort();
        debug!(collection = %self.collection, "Catalog synchronizer stopped");
    }
}

impl std::fmt::Debug for CatalogSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogSynchronizer")
            .field("collection", &self.collection)
            .field("products", &self.products.borrow().len())
            .finish()
    }
}

// =============================================================================
// Background Tasks
// =============================================================================

async fn run_listener(
    mut feed: ChangeFeed,
    products: Arc<watch::Sender<Vec<Product>>>,
    collection: String,
) {
    while let Some(item) = feed.next().await {
        match item {
            Ok(snapshot) => {
                let list = Product::from_snapshot(&snapshot);
                debug!(collection = %collection, count = list.len(), "Snapshot received");
                products.send_replace(list);
            }
            Err(e) => {
                warn!(collection = %collection, error = %e, "Product listener failed; live updates stopped");
                return;
            }
        }
    }
    debug!(collection = %collection, "Product feed ended");
}

async fn run_worker(
    store: Arc<dyn DocumentStore>,
    collection: String,
    mut queue: mpsc::UnboundedReceiver<CatalogCommand>,
) {
    while let Some(command) = queue.recv().await {
        match command {
            CatalogCommand::Add(fields) => match store.add(&collection, fields).await {
                Ok(id) => debug!(collection = %collection, id = %id, "Product added"),
                Err(e) => error!(collection = %collection, error = %e, "Failed to add product"),
            },
            CatalogCommand::Update { id, fields } => {
                match store.set(&collection, &id, fields).await {
                    Ok(()) => debug!(collection = %collection, id = %id, "Product updated"),
                    Err(e) => {
                        error!(collection = %collection, id = %id, error = %e, "Failed to update product")
                    }
                }
            }
            CatalogCommand::Delete { id } => match store.delete(&collection, &id).await {
                Ok(()) => debug!(collection = %collection, id = %id, "Product deleted"),
                Err(e) => {
                    error!(collection = %collection, id = %id, error = %e, "Failed to delete product")
                }
            },
            CatalogCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

// =============================================================================
// Product Feed
// =============================================================================

/// Observer handle on the live product list.
#[derive(Debug, Clone)]
pub struct ProductFeed {
    rx: watch::Receiver<Vec<Product>>,
}

impl ProductFeed {
    pub fn current(&self) -> Vec<Product> {
        self.rx.borrow().clone()
    }

    /// Waits for the next replacement and returns the newest list.
    ///
    /// Returns `None` once the synchronizer is gone.
    pub async fn changed(&mut self) -> Option<Vec<Product>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// A stream that starts with the current list.
    pub fn into_stream(self) -> WatchStream<Vec<Product>> {
        WatchStream::new(self.rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDocumentStore;
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_stream::StreamExt;
    use vitrina_core::{Document, FieldValue, PRODUCTS_COLLECTION};

    fn setup() -> (Arc<MemoryDocumentStore>, CatalogSynchronizer) {
        let store = Arc::new(MemoryDocumentStore::new());
        let catalog = CatalogSynchronizer::start(store.clone(), PRODUCTS_COLLECTION);
        (store, catalog)
    }

    async fn wait_for(
        feed: &mut ProductFeed,
        predicate: impl Fn(&[Product]) -> bool,
    ) -> Vec<Product> {
        timeout(Duration::from_secs(2), async {
            loop {
                let current = feed.current();
                if predicate(current.as_slice()) {
                    return current;
                }
                if feed.changed().await.is_none() {
                    panic!("product feed closed");
                }
            }
        })
        .await
        .expect("timed out waiting for products")
    }

    fn pen() -> Product {
        Product::new("Pen", 1.5, "", "")
    }

    #[tokio::test]
    async fn test_starts_empty() {
        let (_, catalog) = setup();
        assert!(catalog.products().is_empty());
        assert_eq!(catalog.collection(), "products");
    }

    #[tokio::test]
    async fn test_add_appears_with_new_id() {
        let (store, catalog) = setup();
        let mut feed = catalog.observe_products();

        catalog.add_product(&Product::new("Pen", 1.5, "Blue ink", ""));
        catalog.add_product(&Product::new("Cup", 3.0, "Glass", ""));
        let before = wait_for(&mut feed, |p| p.len() == 2).await;
        let seen: Vec<String> = before.iter().map(|p| p.id.clone()).collect();

        let mut product = Product::new("Mug", 4.0, "Ceramic", "https://img/mug.png");
        product.id = "client-side".to_string();
        catalog.add_product(&product);

        let list = wait_for(&mut feed, |p| p.len() == 3).await;
        let added = list.iter().find(|p| p.name == "Mug").expect("mug listed");
        assert!(!added.id.is_empty());
        assert_ne!(added.id, "client-side");
        assert!(!seen.contains(&added.id));
        assert_eq!(added.price, 4.0);
        assert_eq!(added.description, "Ceramic");
        assert_eq!(added.image_url, "https://img/mug.png");

        let stored = store.documents("products");
        assert!(stored.iter().all(|doc| doc.get("id").is_none()));
    }

    #[tokio::test]
    async fn test_update_changes_only_target() {
        let (_, catalog) = setup();
        let mut feed = catalog.observe_products();

        catalog.add_product(&pen());
        catalog.add_product(&Product::new("Mug", 4.0, "", ""));
        let before = wait_for(&mut feed, |p| p.len() == 2).await;

        let target = before.iter().find(|p| p.name == "Pen").unwrap().clone();
        let other = before.iter().find(|p| p.name == "Mug").unwrap().clone();

        catalog.update_product(&target.id, &Product::new("Fountain Pen", 12.0, "Ink", ""));
        let after = wait_for(&mut feed, |p| p.iter().any(|x| x.name == "Fountain Pen")).await;

        assert_eq!(after.len(), 2);
        let updated = after.iter().find(|p| p.id == target.id).unwrap();
        assert_eq!(updated.price, 12.0);
        assert_eq!(updated.description, "Ink");
        assert_eq!(after.iter().find(|p| p.id == other.id), Some(&other));
    }

    #[tokio::test]
    async fn test_delete_removes_exactly_one() {
        let (_, catalog) = setup();
        let mut feed = catalog.observe_products();

        catalog.add_product(&pen());
        catalog.add_product(&Product::new("Mug", 4.0, "", ""));
        catalog.add_product(&Product::new("Lamp", 30.0, "", ""));
        let before = wait_for(&mut feed, |p| p.len() == 3).await;

        let victim = before[1].id.clone();
        catalog.delete_product(&victim);
        let after = wait_for(&mut feed, |p| p.len() == 2).await;

        assert!(after.iter().all(|p| p.id != victim));
        let expected: Vec<_> = before.into_iter().filter(|p| p.id != victim).collect();
        assert_eq!(after, expected);
    }

    #[tokio::test]
    async fn test_pen_round_trip() {
        let (_, catalog) = setup();
        let mut feed = catalog.observe_products();

        catalog.add_product(&pen());
        let list = wait_for(&mut feed, |p| p.len() == 1).await;
        assert_eq!(list[0].name, "Pen");
        assert_eq!(list[0].price, 1.5);
        assert_eq!(list[0].description, "");
        assert_eq!(list[0].image_url, "");

        catalog.delete_product(&list[0].id);
        let list = wait_for(&mut feed, |p| p.is_empty()).await;
        assert!(list.is_empty());
    }

    #[tokio::test]
    async fn test_missing_price_reads_as_zero() {
        let (store, catalog) = setup();
        let mut feed = catalog.observe_products();

        store.insert_document(
            "products",
            Document::new("legacy").with_field("name", FieldValue::from("Old stock")),
        );

        let list = wait_for(&mut feed, |p| p.len() == 1).await;
        assert_eq!(list[0].id, "legacy");
        assert_eq!(list[0].price, 0.0);
        assert_eq!(list[0].description, "");
    }

    #[tokio::test]
    async fn test_existing_documents_are_loaded() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.insert_document(
            "products",
            Document::new("a").with_fields(pen().to_fields()),
        );

        let catalog = CatalogSynchronizer::start(store, "products");
        let mut feed = catalog.observe_products();
        let list = wait_for(&mut feed, |p| p.len() == 1).await;
        assert_eq!(list[0].id, "a");
    }

    #[tokio::test]
    async fn test_mutations_run_in_call_order() {
        let (store, catalog) = setup();
        let mut feed = catalog.observe_products();

        catalog.add_product(&pen());
        let id = wait_for(&mut feed, |p| p.len() == 1).await[0].id.clone();

        // A reordered set after the delete would bring the document back.
        catalog.update_product(&id, &Product::new("Pencil", 0.5, "", ""));
        catalog.delete_product(&id);
        catalog.flush().await;

        assert!(store.documents("products").is_empty());
    }

    #[tokio::test]
    async fn test_write_failures_are_swallowed() {
        let (store, catalog) = setup();
        store.set_fail_writes(true);

        catalog.add_product(&pen());
        catalog.delete_product("missing");
        catalog.flush().await;

        assert!(store.documents("products").is_empty());
        assert!(catalog.products().is_empty());

        store.set_fail_writes(false);
        let mut feed = catalog.observe_products();
        catalog.add_product(&pen());
        wait_for(&mut feed, |p| p.len() == 1).await;
    }

    #[tokio::test]
    async fn test_listener_error_freezes_list() {
        let (store, catalog) = setup();
        let mut feed = catalog.observe_products();

        catalog.add_product(&pen());
        wait_for(&mut feed, |p| p.len() == 1).await;

        store.interrupt_listeners("products", "permission denied");
        catalog.add_product(&Product::new("Mug", 4.0, "", ""));
        catalog.flush().await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(store.documents("products").len(), 2);
        assert_eq!(catalog.products().len(), 1);
    }

    #[tokio::test]
    async fn test_stream_starts_with_current_list() {
        let (_, catalog) = setup();
        let mut feed = catalog.observe_products();
        catalog.add_product(&pen());
        wait_for(&mut feed, |p| p.len() == 1).await;

        let mut stream = catalog.observe_products().into_stream();
        let first = timeout(Duration::from_secs(1), stream.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_closes_feeds() {
        let (_, catalog) = setup();
        let mut feed = catalog.observe_products();

        catalog.shutdown();

        let closed = timeout(Duration::from_secs(1), async {
            while feed.changed().await.is_some() {}
        })
        .await;
        assert!(closed.is_ok());
    }
}
