//! Storefront order endpoints.

use async_trait::async_trait;
use reqwest::Method;
use crate::domain::aggregates::{CancelRequest, Order, OrderSummary, RefundRequest};
use super::{ApiClient, ApiError, Paginated};

#[async_trait]
pub trait OrdersApi: Send + Sync {
    async fn list_orders(&self, page: u32, limit: u32) -> Result<Paginated<Order>, ApiError>;
    async fn get_order(&self, order_id: &str) -> Result<Order, ApiError>;
    async fn cancel_order(&self, order_id: &str, request: &CancelRequest) -> Result<Order, ApiError>;
    async fn refund_order(&self, order_id: &str, request: &RefundRequest) -> Result<Order, ApiError>;
    async fn order_summary(&self) -> Result<OrderSummary, ApiError>;
}

#[async_trait]
impl OrdersApi for ApiClient {
    async fn list_orders(&self, page: u32, limit: u32) -> Result<Paginated<Order>, ApiError> {
        self.get("/api/v1/orders", &[("page", page.to_string()), ("limit", limit.to_string())]).await
    }

    async fn get_order(&self, order_id: &str) -> Result<Order, ApiError> {
        self.get(&format!("/api/v1/orders/{}", order_id), &[]).await
    }

    async fn cancel_order(&self, order_id: &str, request: &CancelRequest) -> Result<Order, ApiError> {
        self.send_json(Method::POST, &format!("/api/v1/orders/{}/cancel", order_id), request).await
    }

    async fn refund_order(&self, order_id: &str, request: &RefundRequest) -> Result<Order, ApiError> {
        self.send_json(Method::POST, &format!("/api/v1/orders/{}/refund", order_id), request).await
    }

    async fn order_summary(&self) -> Result<OrderSummary, ApiError> {
        self.get("/api/v1/account/order-summary", &[]).await
    }
}
