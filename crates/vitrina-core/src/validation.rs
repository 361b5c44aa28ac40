//! # Validation Module
//!
//! Checks the login, register and product forms run before calling the
//! session manager or the catalog. The managers themselves do not validate:
//! whatever reaches them is forwarded to the backend as-is.
//!
//! ## Usage
//! ```rust
//! use vitrina_core::validation::{validate_credentials, ProductForm};
//!
//! assert!(validate_credentials("ana@example.com", "hunter22").is_ok());
//! assert!(validate_credentials("ana@example.com", "   ").is_err());
//!
//! let product = ProductForm::new("Pen", "1.5", "", "").into_product().unwrap();
//! assert_eq!(product.price, 1.5);
//! assert!(product.id.is_empty());
//! ```

use crate::error::ValidationError;
use crate::types::Product;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Credentials
// =============================================================================

/// Validates the login/register form: both fields must be non-blank.
pub fn validate_credentials(email: &str, password: &str) -> ValidationResult<()> {
    require("email", email)?;
    require("password", password)?;
    Ok(())
}

fn require(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(())
}

// =============================================================================
// Product Form
// =============================================================================

/// Raw text of the product editor, as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductForm {
    pub name: String,
    pub price: String,
    pub description: String,
    pub image_url: String,
}

impl ProductForm {
    pub fn new(
        name: impl Into<String>,
        price: impl Into<String>,
        description: impl Into<String>,
        image_url: impl Into<String>,
    ) -> Self {
        ProductForm {
            name: name.into(),
            price: price.into(),
            description: description.into(),
            image_url: image_url.into(),
        }
    }

    /// Pre-fills the editor from an existing product.
    pub fn from_product(product: &Product) -> Self {
        ProductForm {
            name: product.name.clone(),
            price: product.price.to_string(),
            description: product.description.clone(),
            image_url: product.image_url.clone(),
        }
    }

    /// Builds an unpersisted product from the form.
    ///
    /// ## Rules
    /// - `name` and `price` must be non-blank
    /// - a price that does not parse as a finite number becomes `0.0`
    /// - description and image URL are taken verbatim
    pub fn into_product(self) -> ValidationResult<Product> {
        require("name", &self.name)?;
        require("price", &self.price)?;

        Ok(Product::new(
            self.name,
            parse_price(&self.price),
            self.description,
            self.image_url,
        ))
    }
}

/// Parses a typed price, falling back to `0.0`.
///
/// `NaN` and infinities parse as numbers but are not prices, so they also
/// fall back to `0.0`.
pub fn parse_price(input: &str) -> f64 {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_required() {
        assert!(validate_credentials("a@b.co", "secret").is_ok());

        let err = validate_credentials("", "secret").unwrap_err();
        assert_eq!(err, ValidationError::required("email"));

        let err = validate_credentials("a@b.co", "  \t").unwrap_err();
        assert_eq!(err, ValidationError::required("password"));
    }

    #[test]
    fn test_product_form_requires_name_and_price() {
        assert_eq!(
            ProductForm::new(" ", "2", "", "").into_product().unwrap_err(),
            ValidationError::required("name")
        );
        assert_eq!(
            ProductForm::new("Pen", "", "", "").into_product().unwrap_err(),
            ValidationError::required("price")
        );
    }

    #[test]
    fn test_unparseable_price_becomes_zero() {
        let product = ProductForm::new("Pen", "abc", "", "").into_product().unwrap();
        assert_eq!(product.price, 0.0);

        assert_eq!(parse_price(" 2.25 "), 2.25);
        assert_eq!(parse_price("NaN"), 0.0);
        assert_eq!(parse_price("inf"), 0.0);
    }

    #[test]
    fn test_form_round_trips_existing_product() {
        let mut original = Product::new("Mug", 4.0, "Ceramic", "https://img/mug.png");
        original.id = "m1".to_string();

        let edited = ProductForm::from_product(&original).into_product().unwrap();
        assert_eq!(edited.name, "Mug");
        assert_eq!(edited.price, 4.0);
        assert_eq!(edited.description, "Ceramic");
        // The editor never carries the id; the caller passes it to update.
        assert!(edited.id.is_empty());
    }
}
