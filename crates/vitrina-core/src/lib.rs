//! # vitrina-core: Pure Domain Types for Vitrina
//!
//! This crate holds everything about the catalog client that can be decided
//! without touching the network: the records, how a backend document becomes
//! a [`Product`], how backend auth failures are sorted into user-facing
//! categories, and the checks the forms run before calling anything.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Vitrina Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Presentation layer (not in this repo)              │   │
//! │  │      Login form ──► Register form ──► Product list / editor     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            vitrina-sync (SessionManager, CatalogSynchronizer)   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ vitrina-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   auth    │  │   error   │  │ validation│  │   │
//! │  │   │  Product  │  │ classify  │  │ AuthError │  │   forms   │  │   │
//! │  │   │  Document │  │ messages  │  │ Validation│  │   creds   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • PURE FUNCTIONS                          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Records (`Product`, `Identity`, `Document`, `FieldValue`)
//! - [`auth`] - Auth failure taxonomy and classification
//! - [`error`] - Domain error types
//! - [`validation`] - Credential and product form checks
//!
//! ## Example Usage
//!
//! ```rust
//! use vitrina_core::{Document, FieldValue, Product};
//!
//! let doc = Document::new("abc")
//!     .with_field("name", FieldValue::from("Pen"))
//!     .with_field("price", FieldValue::from(1.5));
//!
//! let product = Product::from_document(&doc);
//! assert_eq!(product.id, "abc");
//! assert_eq!(product.price, 1.5);
//! assert_eq!(product.description, "");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod auth;
pub mod error;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use auth::{AuthErrorKind, AuthOperation};
pub use error::{AuthError, ProviderFailure, ValidationError};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Name of the remote collection that holds product records.
pub const PRODUCTS_COLLECTION: &str = "products";
