//! Wishlist resource endpoints.

use async_trait::async_trait;

use tundra_core::{CustomerId, ProductId};

use super::types::{WishlistEntryDto, WishlistEntryPayload};
use super::{ApiError, RestClient};

/// Remote wishlist operations.
#[async_trait]
pub trait WishlistApi: Send + Sync {
    /// Fetch all wishlist rows for a customer.
    async fn fetch(
        &self,
        customer: CustomerId,
        token: &str,
    ) -> Result<Vec<WishlistEntryDto>, ApiError>;

    /// Add one product to the wishlist.
    async fn add_entry(
        &self,
        entry: &WishlistEntryPayload,
        token: &str,
    ) -> Result<(), ApiError>;

    /// Remove one product from the wishlist.
    async fn remove_entry(&self, product: ProductId, token: &str) -> Result<(), ApiError>;

    /// Remove every wishlist row for a customer.
    async fn clear(&self, customer: CustomerId, token: &str) -> Result<(), ApiError>;

    /// Ask the backend to move a wishlist row into the customer's cart.
    async fn move_to_cart(&self, product: ProductId, token: &str) -> Result<(), ApiError>;
}

#[async_trait]
impl WishlistApi for RestClient {
    async fn fetch(
        &self,
        customer: CustomerId,
        token: &str,
    ) -> Result<Vec<WishlistEntryDto>, ApiError> {
        let path = format!("wishlist?customerId={customer}");
        self.get_json(&path, Some(token)).await
    }

    async fn add_entry(
        &self,
        entry: &WishlistEntryPayload,
        token: &str,
    ) -> Result<(), ApiError> {
        self.post_empty("wishlist", entry, Some(token)).await
    }

    async fn remove_entry(&self, product: ProductId, token: &str) -> Result<(), ApiError> {
        let path = format!("wishlist/{product}");
        self.delete_empty(&path, Some(token)).await
    }

    async fn clear(&self, customer: CustomerId, token: &str) -> Result<(), ApiError> {
        let path = format!("wishlist/clear/{customer}");
        self.delete_empty(&path, Some(token)).await
    }

    async fn move_to_cart(&self, product: ProductId, token: &str) -> Result<(), ApiError> {
        let path = format!("wishlist/{product}/move-to-cart");
        self.post_empty(&path, &serde_json::json!({}), Some(token))
            .await
    }
}
