//! Value objects shared by the storefront and supplier aggregates

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// SKU (Stock Keeping Unit) value object
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sku(String);

impl Sku {
    pub fn new(value: impl Into<String>) -> Result<Self, SkuError> {
        let value = value.into().trim().to_uppercase();
        if value.is_empty() { return Err(SkuError::Empty); }
        if value.len() > 50 { return Err(SkuError::TooLong); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for Sku {
    type Error = SkuError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Sku> for String {
    fn from(sku: Sku) -> Self { sku.0 }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum SkuError { Empty, TooLong }
impl std::error::Error for SkuError {}
impl fmt::Display for SkuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Empty => write!(f, "SKU empty"), Self::TooLong => write!(f, "SKU too long") }
    }
}

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_string() } }
    pub fn inr(amount: Decimal) -> Self { Self::new(amount, "INR") }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn is_positive(&self) -> bool { self.amount > Decimal::ZERO }
    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency { return Err(MoneyError::CurrencyMismatch); }
        Ok(Money::new(self.amount + other.amount, &self.currency))
    }
    pub fn multiply(&self, qty: u32) -> Money { Money::new(self.amount * Decimal::from(qty), &self.currency) }
}

impl Default for Money { fn default() -> Self { Self::zero("INR") } }

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{} {:.2}", self.currency, self.amount) }
}

#[derive(Debug, Clone)] pub enum MoneyError { CurrencyMismatch }
impl std::error::Error for MoneyError {}
impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Currency mismatch") }
}

/// Quantity value object
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Self { Self(value) }
    pub fn value(&self) -> u32 { self.0 }
    pub fn add(&self, other: u32) -> Self { Self(self.0.saturating_add(other)) }
    pub fn subtract(&self, other: u32) -> Option<Self> {
        if other > self.0 { None } else { Some(Self(self.0 - other)) }
    }
    pub fn is_zero(&self) -> bool { self.0 == 0 }
}

// =============================================================================
// Record identifiers
// =============================================================================

const TEMP_PREFIX: &str = "temp-";

/// Identifier of an editable record.
///
/// Records created in the editor carry a `temp-` id until the backend assigns
/// a permanent one. The two spaces never mix: a temporary id is never sent to
/// an update, delete or positions endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordId {
    Temp(String),
    Server(String),
}

impl RecordId {
    pub fn temp() -> Self { Self::Temp(format!("{}{}", TEMP_PREFIX, Uuid::new_v4())) }
    pub fn server(id: impl Into<String>) -> Self { Self::from(id.into()) }
    pub fn is_temporary(&self) -> bool { matches!(self, Self::Temp(_)) }
    pub fn as_str(&self) -> &str {
        match self { Self::Temp(s) | Self::Server(s) => s }
    }
    /// The server id, or `None` for a record the backend has never seen.
    pub fn server_id(&self) -> Option<&str> {
        match self { Self::Server(s) => Some(s), Self::Temp(_) => None }
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        if value.starts_with(TEMP_PREFIX) { Self::Temp(value) } else { Self::Server(value) }
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self { Self::from(value.to_string()) }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        match id { RecordId::Temp(s) | RecordId::Server(s) => s }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

// =============================================================================
// Options
// =============================================================================

/// A single `{name, value}` option attached to a variant, e.g. `Color: Red`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OptionPair {
    pub name: String,
    pub value: String,
}

impl OptionPair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
    pub fn is_blank(&self) -> bool { self.name.trim().is_empty() || self.value.trim().is_empty() }
}

/// Ordered option list. Names are unique among filled slots; blank slots are
/// kept so the editor can show empty rows.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionSet(Vec<OptionPair>);

impl OptionSet {
    pub fn new() -> Self { Self(Vec::new()) }

    pub fn with_blank_slots(count: usize) -> Self { Self(vec![OptionPair::default(); count]) }

    pub fn from_pairs(pairs: impl IntoIterator<Item = OptionPair>) -> Self {
        let mut set = Self::new();
        for pair in pairs { set.set(pair.name, pair.value); }
        set
    }

    pub fn pairs(&self) -> &[OptionPair] { &self.0 }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|p| p.name == name).map(|p| p.value.as_str())
    }

    /// Sets `name` to `value`, replacing an existing entry in place. A blank
    /// name is appended as a new slot.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let (name, value) = (name.into(), value.into());
        if !name.trim().is_empty() {
            if let Some(existing) = self.0.iter_mut().find(|p| p.name == name) {
                existing.value = value;
                return;
            }
        }
        self.0.push(OptionPair { name, value });
    }

    /// Rewrites the slot at `index`. Renaming onto a name held by another
    /// slot merges the two, keeping the earlier position.
    pub fn set_slot(&mut self, index: usize, name: impl Into<String>, value: impl Into<String>) -> bool {
        let (name, value) = (name.into(), value.into());
        if index >= self.0.len() { return false; }
        let clash = self.0.iter().enumerate()
            .find(|(i, p)| *i != index && !name.trim().is_empty() && p.name == name)
            .map(|(i, _)| i);
        match clash {
            Some(other) if other < index => {
                self.0[other].value = value;
                self.0.remove(index);
            }
            Some(other) => {
                self.0[index] = OptionPair { name, value };
                self.0.remove(other);
            }
            None => self.0[index] = OptionPair { name, value },
        }
        true
    }

    pub fn push_blank(&mut self) { self.0.push(OptionPair::default()); }

    pub fn remove_slot(&mut self, index: usize) -> Option<OptionPair> {
        (index < self.0.len()).then(|| self.0.remove(index))
    }

    pub fn filled(&self) -> impl Iterator<Item = &OptionPair> { self.0.iter().filter(|p| !p.is_blank()) }

    /// Value comparison: same filled pairs, regardless of order or blank slots.
    pub fn same_pairs(&self, other: &OptionSet) -> bool {
        let mut a: Vec<&OptionPair> = self.filled().collect();
        let mut b: Vec<&OptionPair> = other.filled().collect();
        a.sort();
        b.sort();
        a == b
    }

    pub fn matches(&self, selection: &[OptionPair]) -> bool {
        selection.iter().filter(|p| !p.is_blank()).all(|p| self.get(&p.name) == Some(p.value.as_str()))
    }
}
