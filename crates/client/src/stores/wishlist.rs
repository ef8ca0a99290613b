//! Wishlist store.
//!
//! The wishlist only exists server-side: without a session it is empty and
//! mutations fail with `AuthRequired`. Each product appears at most once;
//! adding a duplicate is rejected before any remote call.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tundra_core::{CustomerId, ProductId};

use crate::api::WishlistApi;
use crate::api::types::{ProductDto, WishlistEntryDto, WishlistEntryPayload};
use crate::auth::SessionManager;

use super::{StatusCell, StoreError, StoreStatus};

const FALLBACK_NAME: &str = "Product";
const FALLBACK_IMAGE: &str = "/images/placeholder.jpg";
const FALLBACK_CATEGORY: &str = "General";

/// One saved product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub image: String,
    pub category: String,
    pub added_at: DateTime<Utc>,
}

/// Aggregate wishlist figures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WishlistStats {
    /// Number of saved products.
    pub total: usize,
    /// Sum of product prices.
    pub total_value: Decimal,
    /// Number of distinct categories.
    pub categories: usize,
}

/// Field to sort a wishlist view by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WishlistSortKey {
    Name,
    Price,
    AddedAt,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Wishlist state container.
pub struct WishlistStore {
    api: Arc<dyn WishlistApi>,
    session: Arc<SessionManager>,
    items: RwLock<Vec<WishlistItem>>,
    status: StatusCell,
    writer: tokio::sync::Mutex<()>,
}

impl WishlistStore {
    /// Create an empty wishlist store.
    #[must_use]
    pub fn new(api: Arc<dyn WishlistApi>, session: Arc<SessionManager>) -> Self {
        Self {
            api,
            session,
            items: RwLock::new(Vec::new()),
            status: StatusCell::default(),
            writer: tokio::sync::Mutex::new(()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────

    /// Snapshot of the saved products.
    #[must_use]
    pub fn items(&self) -> Vec<WishlistItem> {
        self.read_items()
    }

    /// Number of saved products.
    #[must_use]
    pub fn count(&self) -> usize {
        self.read_items().len()
    }

    /// Whether the product is saved.
    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.read_items()
            .iter()
            .any(|item| item.product_id == product_id)
    }

    /// The saved entry for a product, if present.
    #[must_use]
    pub fn find(&self, product_id: ProductId) -> Option<WishlistItem> {
        self.read_items()
            .into_iter()
            .find(|item| item.product_id == product_id)
    }

    /// Aggregate figures over the saved products.
    #[must_use]
    pub fn stats(&self) -> WishlistStats {
        let items = self.read_items();
        let mut categories: Vec<&str> = items.iter().map(|i| i.category.as_str()).collect();
        categories.sort_unstable();
        categories.dedup();

        WishlistStats {
            total: items.len(),
            total_value: items.iter().map(|i| i.price).sum(),
            categories: categories.len(),
        }
    }

    /// Saved products in one category.
    #[must_use]
    pub fn filter_by_category(&self, category: &str) -> Vec<WishlistItem> {
        self.read_items()
            .into_iter()
            .filter(|item| item.category == category)
            .collect()
    }

    /// Saved products within an inclusive price range. Either bound may be
    /// open.
    #[must_use]
    pub fn filter_by_price_range(
        &self,
        min: Option<Decimal>,
        max: Option<Decimal>,
    ) -> Vec<WishlistItem> {
        self.read_items()
            .into_iter()
            .filter(|item| {
                min.is_none_or(|min| item.price >= min)
                    && max.is_none_or(|max| item.price <= max)
            })
            .collect()
    }

    /// Case-insensitive substring search over names and categories.
    #[must_use]
    pub fn search(&self, term: &str) -> Vec<WishlistItem> {
        let term = term.to_lowercase();
        if term.is_empty() {
            return self.read_items();
        }

        self.read_items()
            .into_iter()
            .filter(|item| {
                item.name.to_lowercase().contains(&term)
                    || item.category.to_lowercase().contains(&term)
            })
            .collect()
    }

    /// Saved products sorted by `key` in `order`, as a new collection.
    #[must_use]
    pub fn sorted_by(&self, key: WishlistSortKey, order: SortOrder) -> Vec<WishlistItem> {
        let mut items = self.read_items();
        items.sort_by(|a, b| {
            let ordering = match key {
                WishlistSortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
                WishlistSortKey::Price => a.price.cmp(&b.price),
                WishlistSortKey::AddedAt => a.added_at.cmp(&b.added_at),
            };
            match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            }
        });
        items
    }

    /// Loading flag and last error.
    #[must_use]
    pub fn status(&self) -> StoreStatus {
        self.status.snapshot()
    }

    /// Drop the recorded error, if any.
    pub fn clear_error(&self) {
        self.status.clear_error();
    }

    // ─────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────

    /// Load the wishlist for the current session.
    ///
    /// Without a session the wishlist is an empty collection.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` when the fetch fails; the previous in-memory
    /// state is left untouched in that case.
    pub async fn fetch_all(&self) -> Result<Vec<WishlistItem>, StoreError> {
        let _writer = self.writer.lock().await;
        self.status.begin();

        let Some((customer, token)) = self.auth_context().await else {
            self.replace_items(Vec::new());
            self.status.succeed();
            return Ok(Vec::new());
        };

        match self.api.fetch(customer, token.expose_secret()).await {
            Ok(entries) => {
                let items: Vec<WishlistItem> =
                    entries.into_iter().map(map_remote_entry).collect();
                self.replace_items(items.clone());
                self.status.succeed();
                Ok(items)
            }
            Err(e) => {
                self.status.fail(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Save a product to the wishlist.
    ///
    /// A product already on the list is rejected with
    /// [`StoreError::AlreadyInWishlist`] before any remote call. The
    /// in-memory state is updated before the remote call resolves; on
    /// remote failure the optimistic entry is retained and the store error
    /// is set.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AuthRequired` without a session,
    /// `AlreadyInWishlist` for duplicates, or the sync error.
    #[instrument(skip(self, product), fields(product = %product.id))]
    pub async fn add_item(&self, product: &ProductDto) -> Result<WishlistItem, StoreError> {
        let _writer = self.writer.lock().await;
        self.status.begin();

        if self.contains(product.id) {
            let err = StoreError::AlreadyInWishlist(product.id);
            self.status.fail(err.to_string());
            return Err(err);
        }

        let Some((customer, token)) = self.auth_context().await else {
            self.status.fail(StoreError::AuthRequired.to_string());
            return Err(StoreError::AuthRequired);
        };

        let item = WishlistItem {
            product_id: product.id,
            name: product.name.clone(),
            price: product.price,
            image: product
                .image
                .clone()
                .unwrap_or_else(|| FALLBACK_IMAGE.to_owned()),
            category: product
                .category
                .clone()
                .unwrap_or_else(|| FALLBACK_CATEGORY.to_owned()),
            added_at: Utc::now(),
        };

        {
            let mut items = self.write_items();
            items.push(item.clone());
        }

        let payload = WishlistEntryPayload {
            customer_id: customer,
            product_id: item.product_id,
            added_at: item.added_at,
        };
        match self
            .api
            .add_entry(&payload, token.expose_secret())
            .await
        {
            Ok(()) => {
                self.status.succeed();
                Ok(item)
            }
            Err(e) => {
                self.status.fail(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Remove a product from the wishlist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AuthRequired` without a session, or the sync
    /// error; the optimistic removal is retained on failure.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, product_id: ProductId) -> Result<(), StoreError> {
        let _writer = self.writer.lock().await;
        self.status.begin();

        let Some((_, token)) = self.auth_context().await else {
            self.status.fail(StoreError::AuthRequired.to_string());
            return Err(StoreError::AuthRequired);
        };

        {
            let mut items = self.write_items();
            items.retain(|item| item.product_id != product_id);
        }

        match self
            .api
            .remove_entry(product_id, token.expose_secret())
            .await
        {
            Ok(()) => {
                self.status.succeed();
                Ok(())
            }
            Err(e) => {
                self.status.fail(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Remove every saved product.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AuthRequired` without a session, or the sync
    /// error; the in-memory list stays empty regardless.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), StoreError> {
        let _writer = self.writer.lock().await;
        self.status.begin();

        let Some((customer, token)) = self.auth_context().await else {
            self.status.fail(StoreError::AuthRequired.to_string());
            return Err(StoreError::AuthRequired);
        };

        self.replace_items(Vec::new());

        match self.api.clear(customer, token.expose_secret()).await {
            Ok(()) => {
                self.status.succeed();
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                self.status.succeed();
                Ok(())
            }
            Err(e) => {
                self.status.fail(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Ask the backend to move a saved product into the cart, then drop it
    /// from the local list.
    ///
    /// The cart store picks the product up on its next `fetch_all`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AuthRequired` without a session, or the sync
    /// error; on failure the entry stays on the list.
    #[instrument(skip(self))]
    pub async fn move_to_cart(&self, product_id: ProductId) -> Result<(), StoreError> {
        let _writer = self.writer.lock().await;
        self.status.begin();

        let Some((_, token)) = self.auth_context().await else {
            self.status.fail(StoreError::AuthRequired.to_string());
            return Err(StoreError::AuthRequired);
        };

        match self
            .api
            .move_to_cart(product_id, token.expose_secret())
            .await
        {
            Ok(()) => {
                let mut items = self.write_items();
                items.retain(|item| item.product_id != product_id);
                drop(items);
                self.status.succeed();
                Ok(())
            }
            Err(e) => {
                self.status.fail(e.to_string());
                Err(e.into())
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    fn read_items(&self) -> Vec<WishlistItem> {
        self.items.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn write_items(&self) -> std::sync::RwLockWriteGuard<'_, Vec<WishlistItem>> {
        self.items.write().unwrap_or_else(|e| e.into_inner())
    }

    fn replace_items(&self, items: Vec<WishlistItem>) {
        *self.write_items() = items;
    }

    async fn auth_context(&self) -> Option<(CustomerId, SecretString)> {
        let customer = self.session.customer_id()?;
        let token = self.session.get_valid_token().await?;
        Some((customer, token))
    }
}

fn map_remote_entry(entry: WishlistEntryDto) -> WishlistItem {
    let product = entry.product;
    WishlistItem {
        product_id: entry.product_id,
        name: product
            .as_ref()
            .map_or_else(|| FALLBACK_NAME.to_owned(), |p| p.name.clone()),
        price: product.as_ref().map_or(Decimal::ZERO, |p| p.price),
        image: product
            .as_ref()
            .and_then(|p| p.image.clone())
            .unwrap_or_else(|| FALLBACK_IMAGE.to_owned()),
        category: product
            .and_then(|p| p.category)
            .unwrap_or_else(|| FALLBACK_CATEGORY.to_owned()),
        added_at: entry.added_at.unwrap_or_else(Utc::now),
    }
}
