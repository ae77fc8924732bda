//! Cart Aggregate
//!
//! The storefront cart lives only on the client and is persisted as a JSON
//! array of line items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub variant_id: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub name: String,
    pub quantity: u32,
    /// Unit price when the item was added.
    pub price: Money,
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    pub fn line_total(&self) -> Money { self.price.multiply(self.quantity) }

    fn same_line(&self, other: &CartItem) -> bool {
        self.product_id == other.product_id && self.variant_id == other.variant_id
            && self.size == other.size && self.color == other.color
    }
}

/// Identifies one cart line; size and color distinguish lines of
/// variant-less products.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LineKey {
    pub product_id: String,
    pub variant_id: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
}

impl LineKey {
    pub fn product(product_id: impl Into<String>) -> Self { Self { product_id: product_id.into(), ..Default::default() } }

    fn matches(&self, item: &CartItem) -> bool {
        self.product_id == item.product_id && self.variant_id == item.variant_id
            && self.size == item.size && self.color == item.color
    }
}

impl From<&CartItem> for LineKey {
    fn from(item: &CartItem) -> Self {
        Self { product_id: item.product_id.clone(), variant_id: item.variant_id.clone(), size: item.size.clone(), color: item.color.clone() }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self { Self::default() }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    /// Sum of quantities, as shown on the header badge.
    pub fn total_quantity(&self) -> u32 { self.items.iter().map(|i| i.quantity).sum() }

    pub fn subtotal(&self, currency: &str) -> Money {
        self.items.iter().fold(Money::zero(currency), |acc, i| acc.add(&i.line_total()).unwrap_or(acc))
    }

    pub fn add_item(&mut self, item: CartItem) -> Result<(), CartError> {
        if item.quantity == 0 { return Err(CartError::InvalidQuantity); }
        if let Some(existing) = self.items.iter_mut().find(|i| i.same_line(&item)) {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            self.items.push(item);
        }
        Ok(())
    }

    pub fn update_quantity(&mut self, key: &LineKey, quantity: u32) -> Result<(), CartError> {
        let item = self.items.iter_mut().find(|i| key.matches(i)).ok_or(CartError::ItemNotFound)?;
        if quantity == 0 { self.items.retain(|i| !key.matches(i)); }
        else { item.quantity = quantity; }
        Ok(())
    }

    pub fn remove_item(&mut self, key: &LineKey) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|i| !key.matches(i));
        if self.items.len() == before { return Err(CartError::ItemNotFound); }
        Ok(())
    }

    pub fn clear(&mut self) { self.items.clear(); }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CartError { ItemNotFound, InvalidQuantity, Unavailable }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ItemNotFound => write!(f, "Item not found"),
            Self::InvalidQuantity => write!(f, "Invalid quantity"),
            Self::Unavailable => write!(f, "This option is not available"),
        }
    }
}
