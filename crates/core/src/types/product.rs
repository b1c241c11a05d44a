//! Catalog models: products, their image galleries, and customizations.
//!
//! These are the wire and row shapes shared by the storefront server and the
//! client. Rows derive `sqlx::FromRow` when the `postgres` feature is on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::id::{CustomizationOptionId, CustomizationTypeId, ImageId, ProductId};
use super::price::Price;

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Price,
    /// Inactive products are hidden from listings but still resolvable by id.
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One image in a product's gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct ProductImage {
    pub id: ImageId,
    pub product_id: ProductId,
    /// Object-store key, e.g. `products/{product_id}/{millis}-{file}`.
    pub storage_path: String,
    pub public_url: String,
    /// Zero-based position within the product's gallery.
    pub display_order: i32,
    /// At most one image per product carries this flag.
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

/// A product joined with its images, as returned by catalog listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductWithImages {
    #[serde(flatten)]
    pub product: Product,
    pub images: Vec<ProductImage>,
}

impl ProductWithImages {
    /// The image flagged as primary, if any.
    #[must_use]
    pub fn primary_image(&self) -> Option<&ProductImage> {
        self.images.iter().find(|img| img.is_primary)
    }
}

/// A kind of customization (e.g. "Color", "Material").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct CustomizationType {
    pub id: CustomizationTypeId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// One selectable value of a customization type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct CustomizationOption {
    pub id: CustomizationOptionId,
    pub type_id: CustomizationTypeId,
    pub value: String,
    pub created_at: DateTime<Utc>,
}

/// A customization type attached to a product, with all of its options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customization {
    #[serde(rename = "type")]
    pub kind: CustomizationType,
    pub options: Vec<CustomizationOption>,
}

/// Full product detail: images plus customizations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetails {
    #[serde(flatten)]
    pub product: Product,
    pub images: Vec<ProductImage>,
    pub customizations: Vec<Customization>,
}

impl From<ProductDetails> for ProductWithImages {
    fn from(details: ProductDetails) -> Self {
        Self {
            product: details.product,
            images: details.images,
        }
    }
}

/// Fields for creating a product.
///
/// `name` and `price` are optional on the wire so that their absence is a
/// validation error rather than a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Price>,
    pub active: Option<bool>,
}

/// Partial product update. `None` leaves a field untouched.
///
/// `description` distinguishes an absent key (`None`) from an explicit
/// `null` (`Some(None)`), which clears the column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl ProductPatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.active.is_none()
    }
}

// Only called when the key is present, so `null` becomes `Some(None)`.
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial image update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_primary: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i32>,
}

impl ImagePatch {
    /// Patch that promotes an image to primary.
    #[must_use]
    pub const fn promote() -> Self {
        Self {
            is_primary: Some(true),
            display_order: None,
        }
    }

    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.is_primary.is_none() && self.display_order.is_none()
    }
}

/// Body of a gallery reorder request: image ids in their new order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderImages {
    pub image_ids: Vec<ImageId>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_product() -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::generate(),
            name: "3D Printed Vase".to_string(),
            description: Some("A beautiful customizable vase".to_string()),
            price: Price::from_cents(2999),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_product_with_images_flattens_product_fields() {
        let product = sample_product();
        let value = serde_json::to_value(ProductWithImages {
            product: product.clone(),
            images: Vec::new(),
        })
        .unwrap();

        assert_eq!(value["name"], "3D Printed Vase");
        assert_eq!(value["price"], "29.99");
        assert!(value["images"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_customization_serializes_type_key() {
        let kind = CustomizationType {
            id: CustomizationTypeId::generate(),
            name: "Color".to_string(),
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(Customization {
            kind,
            options: Vec::new(),
        })
        .unwrap();
        assert_eq!(value["type"]["name"], "Color");
    }

    #[test]
    fn test_patch_emptiness() {
        assert!(ProductPatch::default().is_empty());
        assert!(!ProductPatch {
            active: Some(false),
            ..ProductPatch::default()
        }
        .is_empty());
        assert!(ImagePatch::default().is_empty());
        assert!(!ImagePatch::promote().is_empty());
    }

    #[test]
    fn test_patch_description_null_clears() {
        let absent: ProductPatch = serde_json::from_str(r#"{"active":true}"#).unwrap();
        assert_eq!(absent.description, None);

        let cleared: ProductPatch = serde_json::from_str(r#"{"description":null}"#).unwrap();
        assert_eq!(cleared.description, Some(None));
        assert!(!cleared.is_empty());

        let set: ProductPatch = serde_json::from_str(r#"{"description":"Matte"}"#).unwrap();
        assert_eq!(set.description, Some(Some("Matte".to_string())));
    }

    #[test]
    fn test_patch_description_null_survives_serialization() {
        let patch = ProductPatch {
            description: Some(None),
            ..ProductPatch::default()
        };
        let json = serde_json::to_string(&patch).unwrap();
        assert_eq!(json, r#"{"description":null}"#);
        assert_eq!(serde_json::from_str::<ProductPatch>(&json).unwrap(), patch);

        assert_eq!(serde_json::to_string(&ProductPatch::default()).unwrap(), "{}");
    }

    #[test]
    fn test_new_product_accepts_missing_fields() {
        let input: NewProduct = serde_json::from_str(r#"{"description":"x"}"#).unwrap();
        assert!(input.name.is_none());
        assert!(input.price.is_none());
    }
}
