//! Cart resource endpoints.

use async_trait::async_trait;

use tundra_core::CustomerId;

use super::types::{CartEntryPayload, CartPayload, RemoteCart};
use super::{ApiError, RestClient};

/// Remote cart operations, keyed by customer.
///
/// The backend stores one cart per customer, addressed by the customer id.
#[async_trait]
pub trait CartApi: Send + Sync {
    /// Fetch the customer's cart. `None` when no cart exists yet.
    async fn fetch(
        &self,
        customer: CustomerId,
        token: &str,
    ) -> Result<Option<RemoteCart>, ApiError>;

    /// Add a single item to the cart.
    async fn add_entry(
        &self,
        customer: CustomerId,
        entry: &CartEntryPayload,
        token: &str,
    ) -> Result<(), ApiError>;

    /// Replace the cart's whole item list.
    async fn replace(
        &self,
        customer: CustomerId,
        cart: &CartPayload,
        token: &str,
    ) -> Result<(), ApiError>;

    /// Delete the cart entirely.
    async fn delete(&self, customer: CustomerId, token: &str) -> Result<(), ApiError>;
}

#[async_trait]
impl CartApi for RestClient {
    async fn fetch(
        &self,
        customer: CustomerId,
        token: &str,
    ) -> Result<Option<RemoteCart>, ApiError> {
        let path = format!("carts?customerId={customer}");
        match self.get_json::<RemoteCart>(&path, Some(token)).await {
            Ok(cart) => Ok(Some(cart)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn add_entry(
        &self,
        customer: CustomerId,
        entry: &CartEntryPayload,
        token: &str,
    ) -> Result<(), ApiError> {
        let path = format!("carts/{customer}/items");
        self.patch_empty(&path, entry, Some(token)).await
    }

    async fn replace(
        &self,
        customer: CustomerId,
        cart: &CartPayload,
        token: &str,
    ) -> Result<(), ApiError> {
        let path = format!("carts/{customer}");
        self.put_empty(&path, cart, Some(token)).await
    }

    async fn delete(&self, customer: CustomerId, token: &str) -> Result<(), ApiError> {
        let path = format!("carts/{customer}");
        self.delete_empty(&path, Some(token)).await
    }
}
