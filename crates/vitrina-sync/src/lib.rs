//! # vitrina-sync: Session & Live Catalog Layer for Vitrina
//!
//! This crate keeps the signed-in session and a live product list mirrored
//! from a remote document collection.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Vitrina Sync Layer                              │
//! │                                                                         │
//! │  ┌────────────────────────┐        ┌─────────────────────────────────┐ │
//! │  │    SessionManager      │        │      CatalogSynchronizer        │ │
//! │  │                        │        │                                 │ │
//! │  │ register / login       │        │ add / update / delete (queued)  │ │
//! │  │ logout                 │        │ products() / observe_products() │ │
//! │  │ current identity       │        │ live list via watch channel     │ │
//! │  └───────────┬────────────┘        └────────────────┬────────────────┘ │
//! │              │ AuthProvider                         │ DocumentStore    │
//! │              ▼                                      ▼                  │
//! │  ┌──────────────────────────────────────────────────────────────────┐ │
//! │  │  memory           MemoryAuthProvider / MemoryDocumentStore       │ │
//! │  │  firebase_auth    FirebaseAuth     (Identity Toolkit REST)       │ │
//! │  │  firestore        FirestoreStore   (Firestore REST, polling)     │ │
//! │  └──────────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`backend`] - `AuthProvider` / `DocumentStore` traits and `ChangeFeed`
//! - [`session`] - `SessionManager`
//! - [`catalog`] - `CatalogSynchronizer` and `ProductFeed`
//! - [`memory`] - In-process backend
//! - [`firebase_auth`] - Identity Toolkit adapter with token refresh
//! - [`firestore`] - Firestore REST adapter
//! - [`config`] - Backend configuration (TOML + env)
//! - [`error`] - Sync error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vitrina_core::Product;
//! use vitrina_sync::{CatalogSynchronizer, MemoryAuthProvider, MemoryDocumentStore, SessionManager};
//!
//! # async fn demo() {
//! let session = SessionManager::new(Arc::new(MemoryAuthProvider::new()));
//! session.register("ana@example.com", "secret1").await.unwrap();
//!
//! let catalog = CatalogSynchronizer::start(Arc::new(MemoryDocumentStore::new()), "products");
//! let mut feed = catalog.observe_products();
//! catalog.add_product(&Product::new("Pen", 1.5, "", ""));
//!
//! let products = feed.changed().await.unwrap();
//! println!("{} products", products.len());
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod backend;
pub mod catalog;
pub mod config;
pub mod error;
pub mod memory;
pub mod session;

// Firebase REST backend
pub mod firebase_auth;
pub mod firestore;
mod rest;

// =============================================================================
// Re-exports
// =============================================================================

pub use backend::{AuthProvider, ChangeFeed, DocumentStore};
pub use catalog::{CatalogSynchronizer, ProductFeed};
pub use config::VitrinaConfig;
pub use error::{SyncError, SyncResult};
pub use memory::{MemoryAuthProvider, MemoryDocumentStore};
pub use session::SessionManager;

pub use firebase_auth::{FirebaseAuth, FirebaseAuthConfig, UserSession};
pub use firestore::{FirestoreConfig, FirestoreStore};
