//! Catalog product record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::{FieldValue, Fields, RawDocument};
use crate::normalize;
use crate::types::{Price, ProductCode};

/// One labelled measurement shown on a product's dimension diagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionEntry {
    pub label: String,
    pub value: String,
}

impl DimensionEntry {
    /// Create an entry.
    #[must_use]
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }

    /// Parse `"label: value"`; text without a colon is a bare value.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.split_once(':') {
            Some((label, value)) => Self::new(label.trim(), value.trim()),
            None => Self::new("", s.trim()),
        }
    }

    fn to_field(&self) -> FieldValue {
        let mut map = Fields::new();
        map.insert("label".to_owned(), FieldValue::from(self.label.as_str()));
        map.insert("value".to_owned(), FieldValue::from(self.value.as_str()));
        FieldValue::Map(map)
    }
}

/// A catalog product in canonical shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub code: ProductCode,
    pub gtin: Option<String>,
    pub name: String,
    pub title: String,
    pub measure: String,
    pub seo_title: String,
    pub description: String,
    pub category: String,
    pub brand: String,
    /// Short lower-case hint used when generating imagery and search text.
    pub ai_hint: String,
    pub images: Vec<String>,
    pub related_images: Vec<String>,
    pub dimensions: Vec<DimensionEntry>,
    pub dimension_image: Option<String>,
    pub price: Price,
    pub stock: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Build a product from a stored document.
    ///
    /// Total: missing fields take defaults, comma-joined list fields are
    /// split, timestamps that cannot be read become `now`. The code falls back
    /// to the document id.
    #[must_use]
    pub fn from_document(doc: &RawDocument, now: DateTime<Utc>) -> Self {
        let code = normalize::optional_text(doc.get("code")).unwrap_or_else(|| doc.id.clone());
        let name = normalize::text(doc.get("name"));
        let title = normalize::optional_text(doc.get("title")).unwrap_or_else(|| name.clone());
        let category = normalize::text(doc.get("category"));
        let ai_hint = normalize::optional_text(doc.get("aiHint"))
            .unwrap_or_else(|| category.to_lowercase());

        Self {
            code: ProductCode::new(code),
            gtin: normalize::optional_text(doc.get("gtin")),
            name,
            title,
            measure: normalize::text(doc.get("measure")),
            seo_title: normalize::text(doc.get_any(&["seoTitle", "seo_title"])),
            description: normalize::text(doc.get("description")),
            category,
            brand: normalize::text(doc.get("brand")),
            ai_hint,
            images: normalize::string_list(doc.get("images")),
            related_images: normalize::string_list(
                doc.get_any(&["relatedImages", "related_images"]),
            ),
            dimensions: normalize::dimensions(doc.get("dimensions")),
            dimension_image: normalize::optional_text(
                doc.get_any(&["dimensionImage", "dimension_image"]),
            ),
            price: Price::from_minor(normalize::integer_or_zero(doc.get("price"))),
            stock: normalize::integer_or_zero(doc.get("stock")),
            is_active: normalize::bool_or(doc.get("isActive"), true),
            created_at: normalize::timestamp_or(doc.get("createdAt"), now),
            updated_at: normalize::timestamp_or(doc.get("updatedAt"), now),
        }
    }

    /// Encode as document fields (canonical shape).
    #[must_use]
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("code".to_owned(), self.code.as_str().into());
        fields.insert("gtin".to_owned(), self.gtin.clone().into());
        fields.insert("name".to_owned(), self.name.clone().into());
        fields.insert("title".to_owned(), self.title.clone().into());
        fields.insert("measure".to_owned(), self.measure.clone().into());
        fields.insert("seoTitle".to_owned(), self.seo_title.clone().into());
        fields.insert("description".to_owned(), self.description.clone().into());
        fields.insert("category".to_owned(), self.category.clone().into());
        fields.insert("brand".to_owned(), self.brand.clone().into());
        fields.insert("aiHint".to_owned(), self.ai_hint.clone().into());
        fields.insert("images".to_owned(), self.images.clone().into());
        fields.insert("relatedImages".to_owned(), self.related_images.clone().into());
        fields.insert(
            "dimensions".to_owned(),
            FieldValue::Array(self.dimensions.iter().map(DimensionEntry::to_field).collect()),
        );
        fields.insert("dimensionImage".to_owned(), self.dimension_image.clone().into());
        fields.insert("price".to_owned(), self.price.minor_units().into());
        fields.insert("stock".to_owned(), self.stock.into());
        fields.insert("isActive".to_owned(), self.is_active.into());
        fields.insert("createdAt".to_owned(), self.created_at.into());
        fields.insert("updatedAt".to_owned(), self.updated_at.into());
        fields
    }

    /// First image, used as the thumbnail.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Whether the product can be ordered right now.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.is_active && self.stock > 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn doc(fields: &[(&str, FieldValue)]) -> RawDocument {
        RawDocument::new(
            "A1",
            fields
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_empty_document_defaults() {
        let product = Product::from_document(&doc(&[]), now());
        assert_eq!(product.code.as_str(), "A1");
        assert!(product.images.is_empty());
        assert!(product.is_active);
        assert_eq!(product.price, Price::from_minor(0));
        assert_eq!(product.stock, 0);
        assert_eq!(product.created_at, now());
    }

    #[test]
    fn test_legacy_joined_images_are_split() {
        let product = Product::from_document(
            &doc(&[
                ("images", FieldValue::from("images/a.png, images/b.png")),
                ("related_images", FieldValue::from("c.png")),
            ]),
            now(),
        );
        assert_eq!(product.images, vec!["images/a.png", "images/b.png"]);
        assert_eq!(product.related_images, vec!["c.png"]);
        assert_eq!(product.primary_image(), Some("images/a.png"));
    }

    #[test]
    fn test_title_and_hint_fallbacks() {
        let product = Product::from_document(
            &doc(&[
                ("name", FieldValue::from("Válvula de bola")),
                ("category", FieldValue::from("Valvula")),
            ]),
            now(),
        );
        assert_eq!(product.title, "Válvula de bola");
        assert_eq!(product.ai_hint, "valvula");
    }

    #[test]
    fn test_fields_read_back_unchanged() {
        let original = Product::from_document(
            &doc(&[
                ("code", FieldValue::from("A1")),
                ("name", FieldValue::from("Valve")),
                ("images", FieldValue::from("x.png")),
                ("dimensions", FieldValue::from("A: 1")),
                ("price", FieldValue::Integer(1990)),
                ("stock", FieldValue::Integer(4)),
            ]),
            now(),
        );
        let reread = Product::from_document(&RawDocument::new("A1", original.to_fields()), now());
        assert_eq!(reread, original);
        assert!(reread.in_stock());
    }
}
