//! Catalog records: products and their embedded reviews.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bazaar_core::{Price, ProductId, Rating};

use super::ValidationError;

/// Maximum length of a product or reviewer name.
pub const MAX_NAME_LENGTH: usize = 200;
/// Maximum length of a product description or review body.
pub const MAX_TEXT_LENGTH: usize = 5000;
/// Maximum length of an image reference.
pub const MAX_IMAGE_LENGTH: usize = 2048;

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Price,
    /// Image URL or path, if the product has one.
    pub image: Option<String>,
    /// Reviews in the order they were submitted.
    pub reviews: Vec<Review>,
    pub created_at: DateTime<Utc>,
}

/// A customer review, owned by exactly one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Reviewer display name.
    pub name: String,
    pub rating: Rating,
    /// Free-text review body.
    pub review: String,
    pub created_at: DateTime<Utc>,
}

/// Validated input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub image: Option<String>,
}

impl NewProduct {
    /// Validate raw product fields.
    ///
    /// Names are trimmed; a blank image is treated as no image.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` naming the first offending field.
    pub fn parse(
        name: &str,
        description: &str,
        price: Decimal,
        image: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let name = required_text("name", name, MAX_NAME_LENGTH)?;
        let description = bounded_text("description", description.trim(), MAX_TEXT_LENGTH)?;
        let price = Price::new(price).map_err(|e| ValidationError::new("price", e.to_string()))?;
        let image = image
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| bounded_text("image", s, MAX_IMAGE_LENGTH))
            .transpose()?;

        Ok(Self {
            name,
            description,
            price,
            image,
        })
    }

    /// Build the persisted product with an empty review list.
    #[must_use]
    pub fn into_product(self, id: ProductId, created_at: DateTime<Utc>) -> Product {
        Product {
            id,
            name: self.name,
            description: self.description,
            price: self.price,
            image: self.image,
            reviews: Vec::new(),
            created_at,
        }
    }
}

/// Validated input for a review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    pub name: String,
    pub rating: Rating,
    pub review: String,
}

impl NewReview {
    /// Validate raw review fields.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` naming the first offending field.
    pub fn parse(name: &str, rating: i64, review: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            name: required_text("name", name, MAX_NAME_LENGTH)?,
            rating: Rating::new(rating).map_err(|e| ValidationError::new("rating", e.to_string()))?,
            review: required_text("review", review, MAX_TEXT_LENGTH)?,
        })
    }

    /// Stamp the review with its submission time.
    #[must_use]
    pub fn into_review(self, created_at: DateTime<Utc>) -> Review {
        Review {
            name: self.name,
            rating: self.rating,
            review: self.review,
            created_at,
        }
    }
}

fn required_text(field: &'static str, value: &str, max: usize) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::new(field, "cannot be empty"));
    }
    bounded_text(field, value, max)
}

fn bounded_text(field: &'static str, value: &str, max: usize) -> Result<String, ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::new(
            field,
            format!("must be at most {max} characters"),
        ));
    }
    Ok(value.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_product_trims_and_drops_blank_image() {
        let product =
            NewProduct::parse("  Pineapple  ", "Sweet", Decimal::new(499, 2), Some("   ")).unwrap();
        assert_eq!(product.name, "Pineapple");
        assert_eq!(product.image, None);
        assert_eq!(product.price, Price::from_cents(499));
    }

    #[test]
    fn test_new_product_rejects_empty_name() {
        let err = NewProduct::parse("   ", "", Decimal::ONE, None).unwrap_err();
        assert_eq!(err.field, "name");
    }

    #[test]
    fn test_new_product_rejects_negative_price() {
        let err = NewProduct::parse("Mango", "", Decimal::new(-5, 0), None).unwrap_err();
        assert_eq!(err.field, "price");
        assert!(err.to_string().starts_with("price: "));
    }

    #[test]
    fn test_new_product_rejects_long_description() {
        let long = "x".repeat(MAX_TEXT_LENGTH + 1);
        let err = NewProduct::parse("Mango", &long, Decimal::ONE, None).unwrap_err();
        assert_eq!(err.field, "description");
    }

    #[test]
    fn test_into_product_starts_without_reviews() {
        let id = ProductId::generate();
        let product = NewProduct::parse("Kiwi", "Fuzzy", Decimal::ONE, Some("/img/kiwi.png"))
            .unwrap()
            .into_product(id, Utc::now());
        assert_eq!(product.id, id);
        assert!(product.reviews.is_empty());
        assert_eq!(product.image.as_deref(), Some("/img/kiwi.png"));
    }

    #[test]
    fn test_new_review_validation() {
        assert!(NewReview::parse("Ana", 5, "Great").is_ok());
        assert_eq!(NewReview::parse("", 5, "Great").unwrap_err().field, "name");
        assert_eq!(NewReview::parse("Ana", 0, "Great").unwrap_err().field, "rating");
        assert_eq!(NewReview::parse("Ana", 3, " ").unwrap_err().field, "review");
    }

    #[test]
    fn test_product_json_shape() {
        let product = NewProduct::parse("Kiwi", "Fuzzy", Decimal::new(250, 2), None)
            .unwrap()
            .into_product(ProductId::generate(), Utc::now());
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["name"], "Kiwi");
        assert_eq!(json["price"], "2.50");
        assert!(json["reviews"].as_array().unwrap().is_empty());
        assert!(json.get("createdAt").is_some());
    }
}
