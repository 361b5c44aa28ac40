//! # Domain Types
//!
//! Records exchanged between the backend, the sync layer and whatever
//! presents them.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Backend side                         Client side                       │
//! │  ────────────                         ───────────                       │
//! │  ┌─────────────────┐   from_document  ┌─────────────────┐               │
//! │  │    Document     │ ───────────────► │    Product      │               │
//! │  │  id             │                  │  id             │               │
//! │  │  fields ────────┼──┐               │  name           │               │
//! │  │  update_time    │  │  to_fields    │  price (f64)    │               │
//! │  └─────────────────┘  │ ◄──────────── │  description    │               │
//! │                       ▼               │  image_url      │               │
//! │              ┌─────────────────┐      └─────────────────┘               │
//! │              │   FieldValue    │                                        │
//! │              │  Null | Boolean │      ┌─────────────────┐               │
//! │              │  Integer|Double │      │    Identity     │               │
//! │              │  String         │      │  uid, email     │               │
//! │              └─────────────────┘      └─────────────────┘               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Mapping Rule
//! A document never fails to become a product. A missing field, or a field
//! holding an unexpected type, yields the empty string or `0.0`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Field Names
// =============================================================================

/// Wire name of the product name field.
pub const FIELD_NAME: &str = "name";
/// Wire name of the product price field.
pub const FIELD_PRICE: &str = "price";
/// Wire name of the product description field.
pub const FIELD_DESCRIPTION: &str = "description";
/// Wire name of the product image URL field.
pub const FIELD_IMAGE_URL: &str = "imageUrl";

// =============================================================================
// Identity
// =============================================================================

/// The authenticated principal returned by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Provider-assigned user id.
    pub uid: String,

    /// Email address the account was registered with.
    pub email: String,
}

impl Identity {
    pub fn new(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Identity {
            uid: uid.into(),
            email: email.into(),
        }
    }
}

// =============================================================================
// Field Values & Documents
// =============================================================================

/// A single scalar value stored in a backend document.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
}

impl FieldValue {
    /// Returns the string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the numeric payload as `f64`.
    ///
    /// Integers are widened, so a price stored as `3` reads as `3.0`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Double(d) => Some(*d),
            FieldValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Double(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

/// The field map of a document, keyed by field name.
pub type Fields = BTreeMap<String, FieldValue>;

/// One record as stored remotely.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Backend-assigned document id.
    pub id: String,

    /// Field values by name.
    pub fields: Fields,

    /// Last write time reported by the backend, when it reports one.
    pub update_time: Option<DateTime<Utc>>,
}

impl Document {
    /// Creates an empty document with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Document {
            id: id.into(),
            fields: Fields::new(),
            update_time: None,
        }
    }

    /// Builder-style field setter.
    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Builder-style replacement of the whole field map.
    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_update_time(mut self, update_time: DateTime<Utc>) -> Self {
        self.update_time = Some(update_time);
        self
    }

    /// Returns a field by name.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Returns a string field, `None` if missing or not a string.
    pub fn get_string(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_str)
    }

    /// Returns a numeric field as `f64`, `None` if missing or not numeric.
    pub fn get_double(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(FieldValue::as_f64)
    }
}

/// One full point-in-time listing of a collection, in backend order.
pub type Snapshot = Vec<Document>;

// =============================================================================
// Product
// =============================================================================

/// A catalog entry.
///
/// ## Lifecycle
/// ```text
/// Product::new(..)          id == ""   (client-side draft)
///      │
///      ▼  add
/// backend assigns id        id == "Xk2…" (arrives in the next snapshot)
///      │
///      ├──► update(id, ..)  full overwrite of the stored fields
///      └──► delete(id)      gone from the next snapshot
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Backend-assigned id. Empty until persisted.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Unit price. Non-negative by convention, not enforced.
    pub price: f64,

    /// Free-form description, possibly empty.
    pub description: String,

    /// Image location, possibly empty.
    pub image_url: String,
}

impl Product {
    /// Creates an unpersisted product (empty id).
    pub fn new(
        name: impl Into<String>,
        price: f64,
        description: impl Into<String>,
        image_url: impl Into<String>,
    ) -> Self {
        Product {
            id: String::new(),
            name: name.into(),
            price,
            description: description.into(),
            image_url: image_url.into(),
        }
    }

    /// Returns the fields written to the backend. The id is never a field.
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert(FIELD_NAME.to_string(), FieldValue::from(self.name.as_str()));
        fields.insert(FIELD_PRICE.to_string(), FieldValue::Double(self.price));
        fields.insert(
            FIELD_DESCRIPTION.to_string(),
            FieldValue::from(self.description.as_str()),
        );
        fields.insert(
            FIELD_IMAGE_URL.to_string(),
            FieldValue::from(self.image_url.as_str()),
        );
        fields
    }

    /// Maps a backend document onto a product, defaulting anything missing.
    pub fn from_document(doc: &Document) -> Self {
        Product {
            id: doc.id.clone(),
            name: doc.get_string(FIELD_NAME).unwrap_or_default().to_string(),
            price: doc.get_double(FIELD_PRICE).unwrap_or(0.0),
            description: doc
                .get_string(FIELD_DESCRIPTION)
                .unwrap_or_default()
                .to_string(),
            image_url: doc
                .get_string(FIELD_IMAGE_URL)
                .unwrap_or_default()
                .to_string(),
        }
    }

    /// Maps a whole snapshot, keeping backend order.
    pub fn from_snapshot(snapshot: &[Document]) -> Vec<Product> {
        snapshot.iter().map(Product::from_document).collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pen_document() -> Document {
        Document::new("doc-1")
            .with_field(FIELD_NAME, FieldValue::from("Pen"))
            .with_field(FIELD_PRICE, FieldValue::from(1.5))
            .with_field(FIELD_DESCRIPTION, FieldValue::from("Blue ink"))
            .with_field(FIELD_IMAGE_URL, FieldValue::from("https://img/pen.png"))
    }

    #[test]
    fn test_from_document_full() {
        let product = Product::from_document(&pen_document());
        assert_eq!(product.id, "doc-1");
        assert_eq!(product.name, "Pen");
        assert_eq!(product.price, 1.5);
        assert_eq!(product.description, "Blue ink");
        assert_eq!(product.image_url, "https://img/pen.png");
    }

    #[test]
    fn test_missing_price_maps_to_zero() {
        let doc = Document::new("doc-2").with_field(FIELD_NAME, FieldValue::from("Mug"));
        let product = Product::from_document(&doc);
        assert_eq!(product.price, 0.0);
        assert_eq!(product.name, "Mug");
        assert_eq!(product.description, "");
        assert_eq!(product.image_url, "");
    }

    #[test]
    fn test_empty_document_maps_to_defaults() {
        let product = Product::from_document(&Document::new("bare"));
        assert_eq!(
            product,
            Product {
                id: "bare".to_string(),
                ..Product::default()
            }
        );
    }

    #[test]
    fn test_wrong_types_map_to_defaults() {
        let doc = Document::new("odd")
            .with_field(FIELD_NAME, FieldValue::Integer(7))
            .with_field(FIELD_PRICE, FieldValue::from("cheap"))
            .with_field(FIELD_DESCRIPTION, FieldValue::Null)
            .with_field(FIELD_IMAGE_URL, FieldValue::Boolean(true));
        let product = Product::from_document(&doc);
        assert_eq!(product.name, "");
        assert_eq!(product.price, 0.0);
        assert_eq!(product.description, "");
        assert_eq!(product.image_url, "");
    }

    #[test]
    fn test_integer_price_is_widened() {
        let doc = Document::new("int").with_field(FIELD_PRICE, FieldValue::Integer(3));
        assert_eq!(Product::from_document(&doc).price, 3.0);
    }

    #[test]
    fn test_to_fields_excludes_id() {
        let mut product = Product::new("Pen", 1.5, "", "");
        product.id = "should-not-be-written".to_string();

        let fields = product.to_fields();
        assert_eq!(fields.len(), 4);
        assert!(!fields.contains_key("id"));
        assert_eq!(fields.get(FIELD_PRICE), Some(&FieldValue::Double(1.5)));
        assert_eq!(fields.get(FIELD_IMAGE_URL), Some(&FieldValue::from("")));
    }

    #[test]
    fn test_from_snapshot_keeps_order() {
        let snapshot = vec![Document::new("b"), Document::new("a"), Document::new("c")];
        let ids: Vec<String> = Product::from_snapshot(&snapshot)
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_product_serializes_camel_case() {
        let product = Product::new("Pen", 1.5, "", "https://img/pen.png");
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["imageUrl"], "https://img/pen.png");
        assert!(json.get("image_url").is_none());
    }
}
