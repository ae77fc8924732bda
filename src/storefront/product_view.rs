//! Product detail page state: option selection and add-to-cart.

use chrono::Utc;
use crate::domain::aggregates::{Cart, CartError, CartItem, OptionGroup, ProductDetail, Variant};
use crate::domain::value_objects::{Money, OptionSet};
use crate::Result;
use super::cart_store::CartStore;

pub struct ProductView {
    detail: ProductDetail,
    selection: OptionSet,
}

impl ProductView {
    /// Starts from the default variant's options.
    pub fn new(detail: ProductDetail) -> Self {
        let selection = detail.default_variant()
            .map(|v| OptionSet::from_pairs(v.options.filled().cloned()))
            .unwrap_or_default();
        Self { detail, selection }
    }

    pub fn detail(&self) -> &ProductDetail { &self.detail }
    pub fn selection(&self) -> &OptionSet { &self.selection }
    pub fn option_groups(&self) -> Vec<OptionGroup> { self.detail.option_groups() }

    pub fn select(&mut self, name: &str, value: &str) -> Option<&Variant> {
        self.selection.set(name, value);
        self.selected_variant()
    }

    pub fn selected_variant(&self) -> Option<&Variant> { self.detail.variant_for(self.selection.pairs()) }

    pub fn price(&self) -> Money {
        self.selected_variant().map_or_else(|| self.detail.price.clone(), |v| v.price.clone())
    }

    pub fn is_available(&self) -> bool {
        if self.detail.variants.is_empty() { return true; }
        self.selected_variant().is_some_and(|v| !v.inventory.is_zero())
    }

    /// Cart line for the current selection, priced now.
    pub fn cart_item(&self, quantity: u32) -> std::result::Result<CartItem, CartError> {
        if quantity == 0 { return Err(CartError::InvalidQuantity); }
        if !self.is_available() { return Err(CartError::Unavailable); }
        let variant = self.selected_variant();
        let option = |name: &str| variant.and_then(|v| v.options.get(name)).map(str::to_string);
        Ok(CartItem {
            product_id: self.detail.id.clone(),
            variant_id: variant.and_then(|v| v.id.server_id()).map(str::to_string),
            size: option("Size"),
            color: option("Color"),
            name: self.detail.title.clone(),
            quantity,
            price: self.price(),
            added_at: Utc::now(),
        })
    }

    pub async fn add_to_cart(&self, cart: &CartStore, quantity: u32) -> Result<Cart> {
        let item = self.cart_item(quantity)?;
        cart.add_item(item).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use crate::domain::value_objects::{OptionPair, Quantity, RecordId};
    use crate::storefront::cart_store::MemoryStore;

    fn variant(id: &str, size: &str, color: &str, price: i64, stock: u32) -> Variant {
        let mut v = Variant::draft(0, "INR", 0);
        v.id = RecordId::server(id);
        v.price = Money::inr(Decimal::new(price, 0));
        v.inventory = Quantity::new(stock);
        v.options = OptionSet::from_pairs([OptionPair::new("Size", size), OptionPair::new("Color", color)]);
        v
    }

    fn detail() -> ProductDetail {
        let mut m = variant("v1", "M", "Blue", 999, 3);
        m.is_default = true;
        ProductDetail {
            id: "p1".into(), title: "Linen shirt".into(), description: String::new(),
            price: Money::inr(Decimal::new(999, 0)), compare_at_price: Some(Money::inr(Decimal::new(1499, 0))),
            images: vec![], variants: vec![m, variant("v2", "L", "Blue", 1099, 0), variant("v3", "L", "White", 1099, 5)],
            reviews: vec![], faqs: vec![],
        }
    }

    #[test]
    fn test_starts_on_default_variant() {
        let view = ProductView::new(detail());
        assert_eq!(view.selected_variant().unwrap().id, RecordId::server("v1"));
        assert_eq!(view.option_groups()[1].values, vec!["L", "M"]);
    }

    #[test]
    fn test_selection_switches_variant_and_price() {
        let mut view = ProductView::new(detail());
        view.select("Size", "L");
        assert_eq!(view.selected_variant().unwrap().id, RecordId::server("v2"));
        assert!(!view.is_available());
        assert_eq!(view.cart_item(1).unwrap_err(), CartError::Unavailable);
        view.select("Color", "White");
        assert_eq!(view.price().amount(), Decimal::new(1099, 0));
        let item = view.cart_item(2).unwrap();
        assert_eq!(item.variant_id.as_deref(), Some("v3"));
        assert_eq!(item.size.as_deref(), Some("L"));
    }

    #[tokio::test]
    async fn test_add_to_cart_merges_lines() {
        let cart = CartStore::new(Arc::new(MemoryStore::new()), "INR");
        let view = ProductView::new(detail());
        view.add_to_cart(&cart, 1).await.unwrap();
        let snapshot = view.add_to_cart(&cart, 2).await.unwrap();
        assert_eq!(snapshot.item_count(), 1);
        assert_eq!(cart.badge_count().await.unwrap(), 3);
    }
}
