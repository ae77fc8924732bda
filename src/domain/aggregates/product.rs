//! Product Aggregate
//!
//! `ProductDraft` is the supplier editor's form state; `ProductDetail` is what
//! the storefront renders.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};
use crate::domain::aggregates::image::ImageRecord;
use crate::domain::aggregates::variant::{group_options, OptionGroup, Variant};
use crate::domain::sequence::Positioned;
use crate::domain::value_objects::{Money, OptionPair, RecordId};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus { #[default] Draft, Active, Archived }

/// Core listing fields, checked before any create/update call.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
pub struct ProductDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[validate(custom = "not_blank")]
    pub title: String,
    pub description: String,
    #[validate(required(message = "Category is required"))]
    pub category_id: Option<String>,
    #[validate(custom = "positive_price")]
    pub selling_price: Decimal,
    #[validate(custom = "positive_price")]
    pub cost_price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub currency: String,
    pub status: ProductStatus,
    #[serde(skip)]
    pub faqs: Vec<Faq>,
    pub aplus_sections: Vec<APlusSection>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if !value.trim().is_empty() { return Ok(()); }
    let mut err = ValidationError::new("required");
    err.message = Some("Title is required".into());
    Err(err)
}

fn positive_price(value: &Decimal) -> Result<(), ValidationError> {
    if *value > Decimal::ZERO { return Ok(()); }
    let mut err = ValidationError::new("positive");
    err.message = Some("Price must be greater than zero".into());
    Err(err)
}

impl ProductDraft {
    pub fn new(currency: &str) -> Self { Self { currency: currency.to_string(), ..Default::default() } }
    pub fn is_new(&self) -> bool { self.id.is_none() }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faq {
    pub id: RecordId,
    pub question: String,
    pub answer: String,
    pub active: bool,
    pub position: u32,
}

impl Faq {
    pub fn draft(position: u32) -> Self {
        Self { id: RecordId::temp(), question: String::new(), answer: String::new(), active: true, position }
    }
    pub fn is_complete(&self) -> bool { !self.question.trim().is_empty() && !self.answer.trim().is_empty() }
}

impl Positioned for Faq {
    fn position(&self) -> u32 { self.position }
    fn set_position(&mut self, position: u32) { self.position = position; }
}

/// A rich-content block shown below the core listing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct APlusSection {
    pub heading: String,
    pub body: String,
    pub image_id: Option<String>,
}

// =============================================================================
// Storefront read model
// =============================================================================

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub author: String,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProductDetail {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price: Money,
    pub compare_at_price: Option<Money>,
    pub images: Vec<ImageRecord>,
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub faqs: Vec<Faq>,
}

impl ProductDetail {
    pub fn option_groups(&self) -> Vec<OptionGroup> { group_options(&self.variants) }

    pub fn variant_for(&self, selection: &[OptionPair]) -> Option<&Variant> {
        self.variants.iter().find(|v| v.active && v.options.matches(selection))
    }

    pub fn default_variant(&self) -> Option<&Variant> {
        self.variants.iter().find(|v| v.active && v.is_default)
            .or_else(|| self.variants.iter().filter(|v| v.active).min_by_key(|v| v.position))
    }

    /// Whole-number discount off the compare-at price.
    pub fn discount_percent(&self) -> Option<u32> {
        let compare = self.compare_at_price.as_ref()?.amount();
        let price = self.price.amount();
        if compare <= price || compare <= Decimal::ZERO { return None; }
        let pct = ((compare - price) * Decimal::ONE_HUNDRED / compare).round();
        pct.to_u32()
    }

    pub fn average_rating(&self) -> Option<f32> {
        if self.reviews.is_empty() { return None; }
        let sum: u32 = self.reviews.iter().map(|r| r.rating as u32).sum();
        Some(sum as f32 / self.reviews.len() as f32)
    }

    pub fn in_stock(&self) -> bool { self.variants.is_empty() || self.variants.iter().any(|v| v.active && !v.inventory.is_zero()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{OptionSet, Quantity};

    fn detail() -> ProductDetail {
        let mut red = Variant::draft(0, "INR", 0);
        red.id = RecordId::server("v1");
        red.options = OptionSet::from_pairs([OptionPair::new("Color", "Red")]);
        red.inventory = Quantity::new(3);
        let mut blue = Variant::draft(1, "INR", 0);
        blue.id = RecordId::server("v2");
        blue.options = OptionSet::from_pairs([OptionPair::new("Color", "Blue")]);
        ProductDetail {
            id: "P1".into(), title: "Shirt".into(), description: String::new(),
            price: Money::inr(Decimal::new(750, 0)), compare_at_price: Some(Money::inr(Decimal::new(1000, 0))),
            images: vec![], variants: vec![red, blue], reviews: vec![], faqs: vec![],
        }
    }

    #[test]
    fn test_draft_validation() {
        let mut draft = ProductDraft::new("INR");
        let errors = draft.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("category_id"));
        assert!(fields.contains_key("selling_price"));
        assert!(fields.contains_key("cost_price"));

        draft.title = "   ".into();
        assert!(draft.validate().unwrap_err().field_errors().contains_key("title"));

        draft.title = "Shirt".into();
        draft.category_id = Some("apparel".into());
        draft.selling_price = Decimal::new(750, 0);
        draft.cost_price = Decimal::new(400, 0);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_discount_and_variant_selection() {
        let p = detail();
        assert_eq!(p.discount_percent(), Some(25));
        assert_eq!(p.variant_for(&[OptionPair::new("Color", "Blue")]).unwrap().id, RecordId::server("v2"));
        assert_eq!(p.default_variant().unwrap().id, RecordId::server("v1"));
        assert!(p.in_stock());
        assert_eq!(p.option_groups()[0].values, vec!["Blue".to_string(), "Red".to_string()]);
    }

    #[test]
    fn test_average_rating() {
        let mut p = detail();
        assert_eq!(p.average_rating(), None);
        for (i, rating) in [5u8, 4, 3].into_iter().enumerate() {
            p.reviews.push(Review { id: i.to_string(), author: "a".into(), rating, comment: String::new(), created_at: Utc::now() });
        }
        assert_eq!(p.average_rating(), Some(4.0));
    }
}
