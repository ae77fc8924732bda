//! Customer order list
//!
//! The backend decides every status transition. Cancel and refund are only
//! requested; on success the returned status replaces the local one and the
//! list and summary are refreshed in the background.

use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use crate::api::{OrdersApi, Paginated, TokenProvider};
use crate::domain::aggregates::{CancelRequest, Order, OrderAction, OrderError, OrderSummary, RefundRequest};
use crate::domain::events::OrderEvent;
use crate::{Result, StoreError};

pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Clone, Debug, Default)]
pub struct OrdersState {
    pub orders: Vec<Order>,
    pub page: u32,
    pub total: u64,
    pub total_pages: u32,
    pub summary: Option<OrderSummary>,
}

impl OrdersState {
    fn apply_page(&mut self, page: Paginated<Order>) {
        self.total_pages = page.total_pages();
        self.page = page.page;
        self.total = page.total;
        self.orders = page.items;
    }
}

/// A successful action. `refresh` resolves once the background reload of the
/// list and summary has finished.
#[derive(Debug)]
pub struct ActionOutcome {
    pub order: Order,
    pub refresh: JoinHandle<()>,
}

pub struct OrdersPage {
    api: Arc<dyn OrdersApi>,
    tokens: Arc<dyn TokenProvider>,
    state: Arc<RwLock<OrdersState>>,
    limit: u32,
    events: broadcast::Sender<OrderEvent>,
}

impl OrdersPage {
    pub fn new(api: Arc<dyn OrdersApi>, tokens: Arc<dyn TokenProvider>) -> Self {
        let (events, _) = broadcast::channel(32);
        Self { api, tokens, state: Arc::new(RwLock::new(OrdersState { page: 1, ..Default::default() })), limit: DEFAULT_PAGE_SIZE, events }
    }

    pub fn with_page_size(mut self, limit: u32) -> Self { self.limit = limit.max(1); self }

    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> { self.events.subscribe() }

    pub async fn state(&self) -> OrdersState { self.state.read().await.clone() }

    fn require_auth(&self) -> Result<()> {
        if self.tokens.bearer_token().is_some() { Ok(()) } else { Err(StoreError::NotAuthenticated) }
    }

    pub async fn load_page(&self, page: u32) -> Result<OrdersState> {
        self.require_auth()?;
        let result = self.api.list_orders(page.max(1), self.limit).await?;
        let total = result.total;
        let mut state = self.state.write().await;
        state.apply_page(result);
        let _ = self.events.send(OrderEvent::ListRefreshed { page: state.page, total });
        Ok(state.clone())
    }

    pub async fn load_summary(&self) -> Result<OrderSummary> {
        self.require_auth()?;
        let summary = self.api.order_summary().await?;
        self.state.write().await.summary = Some(summary.clone());
        Ok(summary)
    }

    /// Order as shown on the page, or fetched when it is not on it.
    async fn find(&self, order_id: &str) -> Result<Order> {
        let local = self.state.read().await.orders.iter().find(|o| o.id == order_id).cloned();
        match local {
            Some(order) => Ok(order),
            None => Ok(self.api.get_order(order_id).await?),
        }
    }

    pub async fn cancel(&self, order_id: &str, reason: impl Into<String>) -> Result<ActionOutcome> {
        self.require_auth()?;
        let order = self.find(order_id).await?;
        ensure_offered(&order, OrderAction::Cancel)?;
        let request = CancelRequest { reason: reason.into() };
        let updated = self.api.cancel_order(order_id, &request).await.inspect_err(|e| {
            warn!(order = %order_id, error = %e, "Cancel request failed");
        })?;
        Ok(self.applied(OrderAction::Cancel, updated).await)
    }

    pub async fn refund(&self, order_id: &str, request: RefundRequest) -> Result<ActionOutcome> {
        self.require_auth()?;
        let order = self.find(order_id).await?;
        ensure_offered(&order, OrderAction::Refund)?;
        request.check(&order)?;
        let updated = self.api.refund_order(order_id, &request).await.inspect_err(|e| {
            warn!(order = %order_id, error = %e, "Refund request failed");
        })?;
        Ok(self.applied(OrderAction::Refund, updated).await)
    }

    async fn applied(&self, action: OrderAction, updated: Order) -> ActionOutcome {
        {
            let mut state = self.state.write().await;
            if let Some(order) = state.orders.iter_mut().find(|o| o.id == updated.id) {
                order.apply_server_result(&updated);
            }
        }
        info!(order = %updated.id, ?action, status = %updated.status, "Order action applied");
        let _ = self.events.send(OrderEvent::ActionApplied { order_id: updated.id.clone(), action, status: updated.status });
        ActionOutcome { order: updated, refresh: self.spawn_refresh() }
    }

    fn spawn_refresh(&self) -> JoinHandle<()> {
        let api = self.api.clone();
        let state = self.state.clone();
        let events = self.events.clone();
        let limit = self.limit;
        tokio::spawn(async move {
            let page = state.read().await.page.max(1);
            match api.list_orders(page, limit).await {
                Ok(result) => {
                    let total = result.total;
                    let mut state = state.write().await;
                    state.apply_page(result);
                    let _ = events.send(OrderEvent::ListRefreshed { page: state.page, total });
                }
                Err(e) => debug!(error = %e, "Background order list refresh failed"),
            }
            match api.order_summary().await {
                Ok(summary) => state.write().await.summary = Some(summary),
                Err(e) => debug!(error = %e, "Background summary refresh failed"),
            }
        })
    }
}

fn ensure_offered(order: &Order, action: OrderAction) -> std::result::Result<(), OrderError> {
    if order.offers(action) { Ok(()) } else { Err(OrderError::NotOffered { action, status: order.status }) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use crate::api::{ApiError, StaticToken};
    use crate::domain::aggregates::order::tests::order;
    use crate::domain::aggregates::{OrderStatus, RefundMethod};

    #[derive(Default)]
    struct FakeOrders {
        orders: Mutex<Vec<Order>>,
        fail_actions: bool,
        fail_refresh: bool,
        list_calls: AtomicUsize,
        action_calls: AtomicUsize,
    }

    impl FakeOrders {
        fn with(orders: Vec<Order>) -> Self { Self { orders: Mutex::new(orders), ..Default::default() } }

        fn transition(&self, id: &str, status: OrderStatus) -> std::result::Result<Order, ApiError> {
            self.action_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_actions {
                return Err(ApiError::Server { status: 422, message: Some("Order already shipped".into()) });
            }
            let mut orders = self.orders.lock().unwrap();
            let o = orders.iter_mut().find(|o| o.id == id).ok_or(ApiError::Server { status: 404, message: None })?;
            o.status = status;
            Ok(o.clone())
        }
    }

    #[async_trait]
    impl OrdersApi for FakeOrders {
        async fn list_orders(&self, page: u32, limit: u32) -> std::result::Result<Paginated<Order>, ApiError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_refresh && self.action_calls.load(Ordering::SeqCst) > 0 {
                return Err(ApiError::Server { status: 500, message: None });
            }
            let orders = self.orders.lock().unwrap();
            let start = ((page - 1) * limit) as usize;
            let items = orders.iter().skip(start).take(limit as usize).cloned().collect();
            Ok(Paginated { items, total: orders.len() as u64, page, limit })
        }

        async fn get_order(&self, order_id: &str) -> std::result::Result<Order, ApiError> {
            self.orders.lock().unwrap().iter().find(|o| o.id == order_id).cloned()
                .ok_or(ApiError::Server { status: 404, message: Some("Order not found".into()) })
        }

        async fn cancel_order(&self, order_id: &str, _request: &CancelRequest) -> std::result::Result<Order, ApiError> {
            self.transition(order_id, OrderStatus::Cancelled)
        }

        async fn refund_order(&self, order_id: &str, _request: &RefundRequest) -> std::result::Result<Order, ApiError> {
            self.transition(order_id, OrderStatus::Refunded)
        }

        async fn order_summary(&self) -> std::result::Result<OrderSummary, ApiError> {
            let orders = self.orders.lock().unwrap();
            Ok(OrderSummary { total_orders: orders.len() as u64, total_spent: Decimal::ZERO, by_status: vec![] })
        }
    }

    fn page_with(api: Arc<FakeOrders>, token: Option<&str>) -> OrdersPage {
        OrdersPage::new(api, Arc::new(StaticToken(token.map(str::to_string)))).with_page_size(2)
    }

    #[tokio::test]
    async fn test_pages_round_up() {
        let api = Arc::new(FakeOrders::with((1..=5).map(|i| order(&format!("o{}", i), OrderStatus::Pending, 100)).collect()));
        let page = page_with(api, Some("t"));
        let state = page.load_page(3).await.unwrap();
        assert_eq!(state.total_pages, 3);
        assert_eq!(state.orders.len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_pending_order_updates_status_locally() {
        let api = Arc::new(FakeOrders::with(vec![order("o1", OrderStatus::Pending, 100)]));
        let page = page_with(api.clone(), Some("t"));
        page.load_page(1).await.unwrap();
        let mut events = page.subscribe();

        let outcome = page.cancel("o1", "Changed my mind").await.unwrap();
        assert_eq!(outcome.order.status, OrderStatus::Cancelled);
        assert_eq!(page.state().await.orders[0].status, OrderStatus::Cancelled);
        assert!(matches!(events.recv().await.unwrap(), OrderEvent::ActionApplied { action: OrderAction::Cancel, .. }));

        outcome.refresh.await.unwrap();
        assert_eq!(api.list_calls.load(Ordering::SeqCst), 2);
        assert_eq!(page.state().await.summary.unwrap().total_orders, 1);
    }

    #[tokio::test]
    async fn test_cancel_delivered_is_not_offered() {
        let api = Arc::new(FakeOrders::with(vec![order("o1", OrderStatus::Delivered, 100)]));
        let page = page_with(api.clone(), Some("t"));
        page.load_page(1).await.unwrap();
        let err = page.cancel("o1", "").await.unwrap_err();
        assert!(matches!(err, StoreError::Order(OrderError::NotOffered { .. })));
        assert_eq!(api.action_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_refund_amount_checked_before_request() {
        let api = Arc::new(FakeOrders::with(vec![order("o1", OrderStatus::Delivered, 500)]));
        let page = page_with(api.clone(), Some("t"));
        let request = RefundRequest { reason: "Damaged".into(), amount: Some(Decimal::new(501, 0)), method: RefundMethod::OriginalPayment };
        assert!(matches!(page.refund("o1", request).await, Err(StoreError::Order(OrderError::RefundOutOfRange { .. }))));
        assert_eq!(api.action_calls.load(Ordering::SeqCst), 0);

        let request = RefundRequest { reason: "Damaged".into(), amount: Some(Decimal::new(200, 0)), method: RefundMethod::StoreCredit };
        let outcome = page.refund("o1", request).await.unwrap();
        assert_eq!(outcome.order.status, OrderStatus::Refunded);
    }

    #[tokio::test]
    async fn test_server_message_passed_through_and_state_untouched() {
        let api = Arc::new(FakeOrders { fail_actions: true, ..FakeOrders::with(vec![order("o1", OrderStatus::Processing, 100)]) });
        let page = page_with(api, Some("t"));
        page.load_page(1).await.unwrap();
        let err = page.cancel("o1", "late").await.unwrap_err();
        assert_eq!(err.user_message(), "Order already shipped");
        assert_eq!(page.state().await.orders[0].status, OrderStatus::Processing);
    }

    #[tokio::test]
    async fn test_background_refresh_failure_is_silent() {
        let api = Arc::new(FakeOrders { fail_refresh: true, ..FakeOrders::with(vec![order("o1", OrderStatus::Pending, 100)]) });
        let page = page_with(api, Some("t"));
        page.load_page(1).await.unwrap();
        let outcome = page.cancel("o1", "").await.unwrap();
        outcome.refresh.await.unwrap();
        assert_eq!(page.state().await.orders[0].status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_requires_sign_in() {
        let api = Arc::new(FakeOrders::with(vec![order("o1", OrderStatus::Pending, 100)]));
        let page = page_with(api.clone(), None);
        assert!(matches!(page.cancel("o1", "").await, Err(StoreError::NotAuthenticated)));
        assert!(matches!(page.load_page(1).await, Err(StoreError::NotAuthenticated)));
        assert_eq!(api.list_calls.load(Ordering::SeqCst), 0);
    }
}
