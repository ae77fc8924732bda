//! Variant Aggregate
//!
//! Editable list of product variants. Holds the position/default invariants;
//! network orchestration lives in `supplier::variants`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use crate::domain::sequence::{self, PositionUpdate, Positioned, SequenceError};
use crate::domain::value_objects::{Money, OptionPair, OptionSet, Quantity, RecordId, Sku, SkuError};

/// Blank option rows given to a freshly added variant.
pub const DEFAULT_OPTION_SLOTS: usize = 2;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: RecordId,
    pub title: String,
    pub sku: Option<Sku>,
    pub price: Money,
    pub compare_at_price: Option<Money>,
    pub cost_price: Option<Money>,
    pub weight: Option<Decimal>,
    pub inventory: Quantity,
    pub options: OptionSet,
    pub image_id: Option<String>,
    pub active: bool,
    #[serde(default)]
    pub is_default: bool,
    pub position: u32,
}

impl Variant {
    pub fn draft(position: u32, currency: &str, option_slots: usize) -> Self {
        Self {
            id: RecordId::temp(), title: String::new(), sku: None, price: Money::zero(currency),
            compare_at_price: None, cost_price: None, weight: None, inventory: Quantity::default(),
            options: OptionSet::with_blank_slots(option_slots), image_id: None, active: true,
            is_default: false, position,
        }
    }

    /// SKUs are assigned by the backend and frozen from then on.
    pub fn sku_locked(&self) -> bool { !self.id.is_temporary() && self.sku.is_some() }

    /// Field-by-field comparison of everything that matters to the backend.
    /// Options compare by value.
    pub fn same_content(&self, other: &Variant) -> bool {
        self.title == other.title
            && self.price == other.price
            && self.compare_at_price == other.compare_at_price
            && self.cost_price == other.cost_price
            && self.sku == other.sku
            && self.weight == other.weight
            && self.inventory == other.inventory
            && self.active == other.active
            && self.position == other.position
            && self.image_id == other.image_id
            && self.options.same_pairs(&other.options)
    }
}

impl Positioned for Variant {
    fn position(&self) -> u32 { self.position }
    fn set_position(&mut self, position: u32) { self.position = position; }
}

/// Typed single-field edit.
#[derive(Clone, Debug)]
pub enum VariantEdit {
    Title(String),
    Sku(String),
    Price(Money),
    CompareAtPrice(Option<Money>),
    CostPrice(Option<Money>),
    Weight(Option<Decimal>),
    Inventory(u32),
    Image(Option<String>),
    Active(bool),
    Option { slot: usize, name: String, value: String },
    AddOptionSlot,
    RemoveOptionSlot(usize),
}

/// Option name with its distinct values, sorted, for selector controls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionGroup {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct VariantList {
    variants: Vec<Variant>,
    currency: String,
    option_slots: usize,
}

impl VariantList {
    pub fn new(currency: &str) -> Self {
        Self { variants: vec![], currency: currency.to_string(), option_slots: DEFAULT_OPTION_SLOTS }
    }

    pub fn from_server(currency: &str, variants: Vec<Variant>) -> Self {
        let mut list = Self::new(currency);
        list.replace_all(variants);
        list
    }

    pub fn with_option_slots(mut self, slots: usize) -> Self { self.option_slots = slots; self }

    pub fn variants(&self) -> &[Variant] { &self.variants }
    pub fn len(&self) -> usize { self.variants.len() }
    pub fn is_empty(&self) -> bool { self.variants.is_empty() }
    pub fn get(&self, id: &RecordId) -> Option<&Variant> { self.variants.iter().find(|v| &v.id == id) }
    pub fn default_variant(&self) -> Option<&Variant> { self.variants.iter().find(|v| v.is_default) }
    pub fn index_of(&self, id: &RecordId) -> Option<usize> { self.variants.iter().position(|v| &v.id == id) }

    /// Appends a local-only draft. The first variant of a product is its default.
    pub fn add(&mut self) -> &Variant {
        let mut variant = Variant::draft(self.variants.len() as u32, &self.currency, self.option_slots);
        variant.is_default = self.variants.is_empty();
        self.variants.push(variant);
        &self.variants[self.variants.len() - 1]
    }

    /// Applies `edit` and returns the record as it was before.
    pub fn apply(&mut self, id: &RecordId, edit: VariantEdit) -> Result<Variant, VariantError> {
        let variant = self.variants.iter_mut().find(|v| &v.id == id)
            .ok_or_else(|| VariantError::NotFound(id.to_string()))?;
        let before = variant.clone();
        match edit {
            VariantEdit::Title(title) => variant.title = title,
            VariantEdit::Sku(raw) => {
                if variant.sku_locked() { return Err(VariantError::SkuLocked); }
                variant.sku = if raw.trim().is_empty() { None } else { Some(Sku::new(raw).map_err(VariantError::InvalidSku)?) };
            }
            VariantEdit::Price(price) => variant.price = price,
            VariantEdit::CompareAtPrice(price) => variant.compare_at_price = price,
            VariantEdit::CostPrice(price) => variant.cost_price = price,
            VariantEdit::Weight(weight) => variant.weight = weight,
            VariantEdit::Inventory(qty) => variant.inventory = Quantity::new(qty),
            VariantEdit::Image(image) => variant.image_id = image,
            VariantEdit::Active(active) => variant.active = active,
            VariantEdit::Option { slot, name, value } => {
                if !variant.options.set_slot(slot, name, value) { return Err(VariantError::OptionSlot(slot)); }
            }
            VariantEdit::AddOptionSlot => variant.options.push_blank(),
            VariantEdit::RemoveOptionSlot(slot) => {
                variant.options.remove_slot(slot).ok_or(VariantError::OptionSlot(slot))?;
            }
        }
        Ok(before)
    }

    /// Marks `id` as the default variant; returns the previous default, if any.
    pub fn set_default(&mut self, id: &RecordId) -> Result<Option<RecordId>, VariantError> {
        if self.get(id).is_none() { return Err(VariantError::NotFound(id.to_string())); }
        let previous = self.default_variant().map(|v| v.id.clone());
        for v in &mut self.variants { v.is_default = &v.id == id; }
        Ok(previous)
    }

    /// Puts a snapshot taken before an edit back in place.
    pub fn restore(&mut self, snapshot: Variant) -> Result<(), VariantError> {
        let slot = self.variants.iter_mut().find(|v| v.id == snapshot.id)
            .ok_or_else(|| VariantError::NotFound(snapshot.id.to_string()))?;
        *slot = snapshot;
        Ok(())
    }

    /// Drag-and-drop move. Returns the new positions of every server-backed
    /// record; temporary records have nothing to reposition remotely.
    pub fn move_variant(&mut self, from: usize, to: usize) -> Result<Vec<PositionUpdate>, VariantError> {
        sequence::move_item(&mut self.variants, from, to).map_err(VariantError::Sequence)?;
        Ok(self.server_positions())
    }

    pub fn server_positions(&self) -> Vec<PositionUpdate> {
        self.variants.iter()
            .filter_map(|v| v.id.server_id().map(|id| PositionUpdate { id: id.to_string(), position: v.position }))
            .collect()
    }

    /// Removes a record; a removed default hands the flag to the new first record.
    pub fn remove(&mut self, id: &RecordId) -> Result<Variant, VariantError> {
        let index = self.index_of(id).ok_or_else(|| VariantError::NotFound(id.to_string()))?;
        let removed = self.variants.remove(index);
        sequence::renumber(&mut self.variants);
        if removed.is_default {
            if let Some(first) = self.variants.first_mut() { first.is_default = true; }
        }
        Ok(removed)
    }

    /// Swaps a temporary record for the one the backend created, keeping the
    /// local position.
    pub fn confirm_created(&mut self, temp_id: &RecordId, mut created: Variant) -> Result<(), VariantError> {
        let slot = self.variants.iter_mut().find(|v| &v.id == temp_id)
            .ok_or_else(|| VariantError::NotFound(temp_id.to_string()))?;
        created.position = slot.position;
        created.is_default = slot.is_default;
        *slot = created;
        Ok(())
    }

    /// Resets the list to the server's copy.
    pub fn replace_all(&mut self, variants: Vec<Variant>) {
        self.variants = variants;
        sequence::normalize(&mut self.variants);
        self.ensure_single_default();
    }

    fn ensure_single_default(&mut self) {
        let mut seen = false;
        for v in &mut self.variants {
            if v.is_default && seen { v.is_default = false; }
            seen |= v.is_default;
        }
        if !seen {
            if let Some(first) = self.variants.first_mut() { first.is_default = true; }
        }
    }

    /// Option names mapped to their sorted distinct values across active variants.
    pub fn grouped_options(&self) -> Vec<OptionGroup> {
        group_options(&self.variants)
    }

    pub fn find_by_options(&self, selection: &[OptionPair]) -> Option<&Variant> {
        self.variants.iter().find(|v| v.active && v.options.matches(selection))
    }

    /// Records to create (temporary) and records to update (server-backed and
    /// different from `baseline`).
    pub fn pending_changes(&self, baseline: &[Variant]) -> (Vec<Variant>, Vec<Variant>) {
        let mut creates = vec![];
        let mut updates = vec![];
        for v in &self.variants {
            if v.id.is_temporary() {
                creates.push(v.clone());
            } else if baseline.iter().find(|b| b.id == v.id).map_or(true, |b| !b.same_content(v)) {
                updates.push(v.clone());
            }
        }
        (creates, updates)
    }

    /// Server-backed ids present in `baseline` but no longer in the list.
    pub fn removed_since(&self, baseline: &[Variant]) -> Vec<RecordId> {
        baseline.iter()
            .filter(|b| !b.id.is_temporary() && self.get(&b.id).is_none())
            .map(|b| b.id.clone())
            .collect()
    }
}

pub fn group_options(variants: &[Variant]) -> Vec<OptionGroup> {
    let mut groups: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for pair in variants.iter().filter(|v| v.active).flat_map(|v| v.options.filled()) {
        groups.entry(pair.name.trim()).or_default().insert(pair.value.trim());
    }
    groups.into_iter()
        .map(|(name, values)| OptionGroup { name: name.to_string(), values: values.into_iter().map(str::to_string).collect() })
        .collect()
}

/// Whether `current` differs from `original` in anything worth sending.
pub fn variants_modified(original: &[Variant], current: &[Variant]) -> bool {
    if original.len() != current.len() { return true; }
    original.iter().zip(current).any(|(a, b)| !a.same_content(b))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantError { NotFound(String), SkuLocked, InvalidSku(SkuError), OptionSlot(usize), Sequence(SequenceError) }
impl std::error::Error for VariantError {}
impl std::fmt::Display for VariantError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "Variant {} not found", id),
            Self::SkuLocked => write!(f, "SKU is assigned by the server and cannot change"),
            Self::InvalidSku(e) => write!(f, "Invalid SKU: {}", e),
            Self::OptionSlot(slot) => write!(f, "No option slot {}", slot),
            Self::Sequence(e) => write!(f, "{}", e),
        }
    }
}
