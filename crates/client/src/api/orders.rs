//! Orders resource endpoints.

use async_trait::async_trait;

use tundra_core::{CustomerId, OrderId, OrderStatus};

use super::types::{OrderDto, OrderStatusPayload};
use super::{ApiError, RestClient};

/// Remote order operations.
#[async_trait]
pub trait OrdersApi: Send + Sync {
    /// Fetch all orders placed by a customer, newest first.
    async fn fetch(
        &self,
        customer: CustomerId,
        token: &str,
    ) -> Result<Vec<OrderDto>, ApiError>;

    /// Fetch a single order. `None` when the backend does not know it.
    async fn fetch_one(&self, id: &OrderId, token: &str)
    -> Result<Option<OrderDto>, ApiError>;

    /// Create a new order.
    async fn create(&self, order: &OrderDto, token: &str) -> Result<(), ApiError>;

    /// Replace an order's contents.
    async fn update(&self, id: &OrderId, order: &OrderDto, token: &str)
    -> Result<(), ApiError>;

    /// Set an order's status.
    async fn set_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
        token: &str,
    ) -> Result<(), ApiError>;

    /// Cancel an order.
    async fn cancel(&self, id: &OrderId, token: &str) -> Result<(), ApiError>;

    /// Delete an order.
    async fn delete(&self, id: &OrderId, token: &str) -> Result<(), ApiError>;
}

#[async_trait]
impl OrdersApi for RestClient {
    async fn fetch(
        &self,
        customer: CustomerId,
        token: &str,
    ) -> Result<Vec<OrderDto>, ApiError> {
        let path = format!("orders?customerId={customer}");
        self.get_json(&path, Some(token)).await
    }

    async fn fetch_one(
        &self,
        id: &OrderId,
        token: &str,
    ) -> Result<Option<OrderDto>, ApiError> {
        let path = format!("orders/{id}");
        match self.get_json::<OrderDto>(&path, Some(token)).await {
            Ok(order) => Ok(Some(order)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create(&self, order: &OrderDto, token: &str) -> Result<(), ApiError> {
        self.post_empty("orders", order, Some(token)).await
    }

    async fn update(
        &self,
        id: &OrderId,
        order: &OrderDto,
        token: &str,
    ) -> Result<(), ApiError> {
        let path = format!("orders/{id}");
        self.put_empty(&path, order, Some(token)).await
    }

    async fn set_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
        token: &str,
    ) -> Result<(), ApiError> {
        let path = format!("orders/{id}/status");
        self.patch_empty(&path, &OrderStatusPayload { status }, Some(token))
            .await
    }

    async fn cancel(&self, id: &OrderId, token: &str) -> Result<(), ApiError> {
        let path = format!("orders/{id}/cancel");
        self.patch_empty(&path, &serde_json::json!({}), Some(token))
            .await
    }

    async fn delete(&self, id: &OrderId, token: &str) -> Result<(), ApiError> {
        let path = format!("orders/{id}");
        self.delete_empty(&path, Some(token)).await
    }
}
