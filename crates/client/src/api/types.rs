//! Wire types for the storefront REST API.
//!
//! These mirror the backend's JSON contract (camelCase keys) and are kept
//! separate from the domain types owned by the stores; conversions live
//! next to the domain side.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tundra_core::{CategoryId, CustomerId, OrderStatus, ProductId};

/// Product fields the backend embeds into cart and wishlist responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// A customer's server-side cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCart {
    pub customer_id: CustomerId,
    #[serde(default)]
    pub items: Vec<RemoteCartEntry>,
}

/// One line of a server-side cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCartEntry {
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default)]
    pub product: Option<ProductSummary>,
}

/// Body for the add-one-item cart endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEntryPayload {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Body for the replace-whole-cart endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartPayload {
    pub customer_id: CustomerId,
    pub items: Vec<CartEntryPayload>,
}

/// One wishlist row as returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntryDto {
    pub customer_id: CustomerId,
    pub product_id: ProductId,
    #[serde(default)]
    pub added_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub product: Option<ProductSummary>,
}

/// Body for the add-to-wishlist endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntryPayload {
    pub customer_id: CustomerId,
    pub product_id: ProductId,
    pub added_at: DateTime<Utc>,
}

/// An order as exchanged with the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDto {
    pub id: String,
    pub placed_at: chrono::NaiveDate,
    pub status: OrderStatus,
    pub total: Decimal,
    #[serde(default)]
    pub items: Vec<OrderLineDto>,
}

/// One line of an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineDto {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub price: Decimal,
}

/// Body for the order status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusPayload {
    pub status: OrderStatus,
}

/// A catalog product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A catalog category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDto {
    pub id: CategoryId,
    pub name: String,
}
