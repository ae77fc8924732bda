//! Domain events
//!
//! Same-process change signals. Writes to local storage are not observable by
//! other components on their own, so every cart mutation is followed by a
//! `CartEvent`.
use crate::domain::aggregates::order::{OrderAction, OrderStatus};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CartEvent {
    Changed { line_count: usize, total_quantity: u32 },
    Reset,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrderEvent {
    ActionApplied { order_id: String, action: OrderAction, status: OrderStatus },
    ListRefreshed { page: u32, total: u64 },
}
