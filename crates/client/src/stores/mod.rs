//! Domain stores: cart, wishlist, and orders.
//!
//! Each store holds an in-memory collection of domain items, mirrors it to
//! the remote API (and, for the cart, to local persistence in guest mode),
//! and exposes mutation operations with optimistic local update and
//! best-effort remote sync.
//!
//! The pattern shared by all three:
//!
//! - Mutations serialize through a per-store writer lock held across the
//!   remote suspension point, so overlapping calls cannot lose updates.
//! - The in-memory collection is updated **before** the remote call
//!   resolves. On remote failure the store's error field is set and the
//!   optimistic state is retained; `fetch_all()` is the reconciliation
//!   path back to remote-consistent state.
//! - Validation and authentication problems short-circuit before any
//!   remote call.
//!
//! Stores are constructed once per application session (see
//! [`Storefront`](crate::Storefront)) and passed by reference; there is no
//! ambient global state.

mod cart;
mod orders;
mod wishlist;

pub use cart::{CartItem, CartProduct, CartStats, CartStore, CouponDiscount};
pub use orders::{OrderDraft, OrderLine, OrderStats, OrdersStore, PlacedOrder};
pub use wishlist::{
    SortOrder, WishlistItem, WishlistSortKey, WishlistStats, WishlistStore,
};

use std::sync::Mutex;

use thiserror::Error;

use tundra_core::{OrderId, ProductId};

use crate::api::ApiError;
use crate::storage::StorageError;

/// Errors surfaced by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Operation needs a session and none is active (or its token could
    /// not be refreshed).
    #[error("authentication required")]
    AuthRequired,

    /// The submitted item or argument failed local validation.
    #[error("invalid input: {0}")]
    Invalid(String),

    /// The product is already on the wishlist.
    #[error("product {0} is already on the wishlist")]
    AlreadyInWishlist(ProductId),

    /// The order is not in the local collection.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// The remote call failed; the optimistic local state was kept.
    #[error("remote sync failed: {0}")]
    Api(#[from] ApiError),

    /// Local persistence failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Loading flag and last error of a store, as observed by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStatus {
    /// An operation is in flight.
    pub loading: bool,
    /// Message from the most recent failed operation, cleared when the
    /// next operation starts.
    pub error: Option<String>,
}

/// Interior-mutable [`StoreStatus`] shared by the stores.
#[derive(Debug, Default)]
pub(crate) struct StatusCell(Mutex<StoreStatus>);

impl StatusCell {
    /// Mark an operation as started: loading set, previous error cleared.
    pub fn begin(&self) {
        let mut status = self.0.lock().unwrap_or_else(|e| e.into_inner());
        status.loading = true;
        status.error = None;
    }

    /// Mark the in-flight operation as succeeded.
    pub fn succeed(&self) {
        let mut status = self.0.lock().unwrap_or_else(|e| e.into_inner());
        status.loading = false;
        status.error = None;
    }

    /// Mark the in-flight operation as failed with `message`.
    pub fn fail(&self, message: impl Into<String>) {
        let mut status = self.0.lock().unwrap_or_else(|e| e.into_inner());
        status.loading = false;
        status.error = Some(message.into());
    }

    /// Snapshot the current status.
    pub fn snapshot(&self) -> StoreStatus {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Drop the recorded error, if any.
    pub fn clear_error(&self) {
        let mut status = self.0.lock().unwrap_or_else(|e| e.into_inner());
        status.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_cell_transitions() {
        let cell = StatusCell::default();
        assert_eq!(cell.snapshot(), StoreStatus::default());

        cell.begin();
        assert!(cell.snapshot().loading);

        cell.fail("boom");
        let status = cell.snapshot();
        assert!(!status.loading);
        assert_eq!(status.error.as_deref(), Some("boom"));

        // Starting the next operation clears the previous error
        cell.begin();
        assert_eq!(cell.snapshot().error, None);

        cell.succeed();
        assert_eq!(cell.snapshot(), StoreStatus::default());
    }
}
