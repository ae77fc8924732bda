//! Order Aggregate
//!
//! Read model of an order as the backend reports it. The client never moves
//! an order between states itself; it asks for an action and copies the
//! status from the server's answer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub order_number: String,
    pub status: OrderStatus,
    pub line_items: Vec<LineItem>,
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub total: Money,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)] pub struct LineItem { pub id: String, pub product_id: String, pub variant_id: Option<String>, pub name: String, pub sku: Option<String>, pub quantity: u32, pub unit_price: Money, pub total: Money }
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)] pub struct Address { pub name: String, pub street1: String, pub street2: Option<String>, pub city: String, pub state: Option<String>, pub zip: String, pub country: String, pub phone: Option<String> }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus { #[default] Pending, Confirmed, Processing, Shipped, Delivered, Cancelled, Refunded }

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        Self::Pending, Self::Confirmed, Self::Processing, Self::Shipped, Self::Delivered, Self::Cancelled, Self::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending", Self::Confirmed => "confirmed", Self::Processing => "processing",
            Self::Shipped => "shipped", Self::Delivered => "delivered", Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }

    pub fn is_terminal(&self) -> bool { matches!(self, Self::Cancelled | Self::Refunded) }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

/// Status-changing requests a customer can make.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderAction { Cancel, Refund }

impl OrderAction {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Cancel => "cancel", Self::Refund => "refund" }
    }

    pub fn allowed_from(&self, status: OrderStatus) -> bool {
        match self {
            Self::Cancel => matches!(status, OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Processing),
            Self::Refund => status == OrderStatus::Delivered,
        }
    }
}

impl Order {
    /// Actions the UI may render for this order. Anything absent here must
    /// not be shown at all.
    pub fn available_actions(&self) -> Vec<OrderAction> {
        [OrderAction::Cancel, OrderAction::Refund].into_iter().filter(|a| a.allowed_from(self.status)).collect()
    }

    pub fn offers(&self, action: OrderAction) -> bool { action.allowed_from(self.status) }

    pub fn item_count(&self) -> u32 { self.line_items.iter().map(|i| i.quantity).sum() }

    /// Copies the authoritative status out of the server's answer.
    pub fn apply_server_result(&mut self, updated: &Order) {
        self.status = updated.status;
        self.updated_at = updated.updated_at;
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelRequest { pub reason: String }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundMethod { #[default] OriginalPayment, StoreCredit, BankTransfer }

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRequest {
    pub reason: String,
    /// Partial amount; `None` refunds the full total.
    pub amount: Option<Decimal>,
    pub method: RefundMethod,
}

impl RefundRequest {
    /// Checks the request against the order it targets.
    pub fn check(&self, order: &Order) -> Result<(), OrderError> {
        if self.reason.trim().is_empty() { return Err(OrderError::MissingReason); }
        if let Some(amount) = self.amount {
            let total = order.total.amount();
            if amount < Decimal::ONE || amount > total {
                return Err(OrderError::RefundOutOfRange { amount, max: total });
            }
        }
        Ok(())
    }
}

/// Per-status counts and spend for the account header.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub total_orders: u64,
    pub total_spent: Decimal,
    pub by_status: Vec<StatusCount>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount { pub status: OrderStatus, pub count: u64 }

impl OrderSummary {
    pub fn count(&self, status: OrderStatus) -> u64 {
        self.by_status.iter().find(|c| c.status == status).map_or(0, |c| c.count)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError { NotOffered { action: OrderAction, status: OrderStatus }, MissingReason, RefundOutOfRange { amount: Decimal, max: Decimal } }
impl std::error::Error for OrderError {}
impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotOffered { action, status } => write!(f, "Cannot {} an order that is {}", action.as_str(), status),
            Self::MissingReason => write!(f, "A reason is required"),
            Self::RefundOutOfRange { amount, max } => write!(f, "Refund amount {} must be between 1 and {}", amount, max),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn order(id: &str, status: OrderStatus, total: i64) -> Order {
        let now = Utc::now();
        let money = Money::inr(Decimal::new(total, 0));
        Order {
            id: id.into(), order_number: format!("ORD-{}", id), status,
            line_items: vec![LineItem {
                id: "li1".into(), product_id: "P1".into(), variant_id: None, name: "Widget".into(), sku: None,
                quantity: 2, unit_price: Money::inr(Decimal::new(total, 0) / Decimal::from(2)), total: money.clone(),
            }],
            subtotal: money.clone(), shipping: Money::zero("INR"), tax: Money::zero("INR"), total: money,
            shipping_address: None, billing_address: None, created_at: now, updated_at: now,
        }
    }

    #[test]
    fn test_available_actions_by_status() {
        assert_eq!(order("1", OrderStatus::Pending, 100).available_actions(), vec![OrderAction::Cancel]);
        assert_eq!(order("1", OrderStatus::Delivered, 100).available_actions(), vec![OrderAction::Refund]);
        assert!(order("1", OrderStatus::Shipped, 100).available_actions().is_empty());
        for status in [OrderStatus::Cancelled, OrderStatus::Refunded] {
            assert!(status.is_terminal());
            assert!(order("1", status, 100).available_actions().is_empty());
        }
    }

    #[test]
    fn test_refund_amount_bounds() {
        let o = order("1", OrderStatus::Delivered, 500);
        let mut req = RefundRequest { reason: "Damaged".into(), amount: Some(Decimal::new(500, 0)), method: RefundMethod::default() };
        assert!(req.check(&o).is_ok());
        req.amount = Some(Decimal::new(5001, 1));
        assert!(matches!(req.check(&o), Err(OrderError::RefundOutOfRange { .. })));
        req.amount = Some(Decimal::new(5, 1));
        assert!(req.check(&o).is_err());
        req.amount = None;
        req.reason = "  ".into();
        assert_eq!(req.check(&o), Err(OrderError::MissingReason));
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(serde_json::to_string(&OrderStatus::Cancelled).unwrap(), "\"cancelled\"");
        let s: OrderStatus = serde_json::from_str("\"refunded\"").unwrap();
        assert_eq!(s, OrderStatus::Refunded);
    }
}
