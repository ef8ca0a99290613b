//! Shopping cart store.
//!
//! The cart is the one store that works without a session: unauthenticated
//! mutations go to the guest-cart snapshot in local persistence, and
//! [`merge_guest_cart`](CartStore::merge_guest_cart) folds that snapshot
//! into the server-side cart after login (quantities summed per product).
//!
//! Remote convention, mirroring the backend: adding pushes a single item,
//! removing and quantity changes push the whole remaining collection, and
//! a mutation that empties the cart deletes the server-side cart instead
//! of updating it to an empty list.

use std::sync::{Arc, RwLock};

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use tundra_core::{CustomerId, ProductId};

use crate::api::CartApi;
use crate::api::types::{CartEntryPayload, CartPayload, ProductDto, RemoteCart};
use crate::auth::SessionManager;
use crate::storage::{KeyValueStore, StorageError, keys};

use super::{StatusCell, StoreError, StoreStatus};

/// Fallbacks for cart rows whose product record is missing on the backend.
const FALLBACK_NAME: &str = "Product";
const FALLBACK_IMAGE: &str = "/images/placeholder.jpg";
const FALLBACK_CATEGORY: &str = "General";

/// One line of the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub image: String,
    pub quantity: u32,
    pub category: String,
}

impl CartItem {
    /// The line's contribution to the cart total.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Product fields needed to put something into the cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartProduct {
    pub product_id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub image: String,
    pub category: String,
}

impl From<&ProductDto> for CartProduct {
    fn from(product: &ProductDto) -> Self {
        Self {
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
        }
    }
}

/// Aggregate cart figures for dashboards and badges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartStats {
    /// Number of distinct lines.
    pub lines: usize,
    /// Sum of line totals.
    pub total_value: Decimal,
    /// Number of distinct categories.
    pub categories: usize,
}

/// Result of applying a coupon code to the current cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponDiscount {
    /// Normalized coupon code.
    pub code: String,
    /// Discount rate applied (0..1).
    pub rate: Decimal,
    /// Discount amount at the current cart total.
    pub amount: Decimal,
}

/// Shopping cart state container.
pub struct CartStore {
    api: Arc<dyn CartApi>,
    session: Arc<SessionManager>,
    storage: Arc<dyn KeyValueStore>,
    items: RwLock<Vec<CartItem>>,
    status: StatusCell,
    writer: tokio::sync::Mutex<()>,
}

impl CartStore {
    /// Create an empty cart store.
    #[must_use]
    pub fn new(
        api: Arc<dyn CartApi>,
        session: Arc<SessionManager>,
        storage: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            api,
            session,
            storage,
            items: RwLock::new(Vec::new()),
            status: StatusCell::default(),
            writer: tokio::sync::Mutex::new(()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────

    /// Snapshot of the cart lines.
    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.read_items()
    }

    /// Sum of price × quantity over all lines.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.read_items().iter().map(CartItem::line_total).sum()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.read_items().iter().map(|item| item.quantity).sum()
    }

    /// Whether the product has a line in the cart.
    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.read_items()
            .iter()
            .any(|item| item.product_id == product_id)
    }

    /// The product's cart line, if present.
    #[must_use]
    pub fn find(&self, product_id: ProductId) -> Option<CartItem> {
        self.read_items()
            .into_iter()
            .find(|item| item.product_id == product_id)
    }

    /// Aggregate figures over the current lines.
    #[must_use]
    pub fn stats(&self) -> CartStats {
        let items = self.read_items();
        let mut categories: Vec<&str> = items.iter().map(|i| i.category.as_str()).collect();
        categories.sort_unstable();
        categories.dedup();

        CartStats {
            lines: items.len(),
            total_value: items.iter().map(CartItem::line_total).sum(),
            categories: categories.len(),
        }
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

    /// Load the cart for the current session.
    ///
    /// With a session the server-side cart is fetched; without one the
    /// guest-cart snapshot from local persistence is loaded.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` when the fetch fails; the previous in-memory
    /// state is left untouched in that case.
    pub async fn fetch_all(&self) -> Result<Vec<CartItem>, StoreError> {
        let _writer = self.writer.lock().await;
        self.status.begin();

        let Some((customer, token)) = self.auth_context().await else {
            return match self.load_guest() {
                Ok(items) => {
                    self.replace_items(items.clone());
                    self.status.succeed();
                    Ok(items)
                }
                Err(e) => {
                    self.status.fail(e.to_string());
                    Err(e)
                }
            };
        };

        match self.api.fetch(customer, token.expose_secret()).await {
            Ok(remote) => {
                let items = remote.map(map_remote_cart).unwrap_or_default();
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

    /// Add `quantity` units of a product.
    ///
    /// An existing line for the same product has its quantity incremented;
    /// otherwise a line is appended. The in-memory state is updated before
    /// the remote call resolves. On remote failure the optimistic state is
    /// retained, the store error is set, and the call reports failure.
    ///
    /// Without a session the mutation goes to the guest-cart snapshot
    /// only.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Invalid` for a zero quantity, or the
    /// sync/persistence error.
    #[instrument(skip(self, product), fields(product = %product.product_id))]
    pub async fn add_item(
        &self,
        product: CartProduct,
        quantity: u32,
    ) -> Result<Vec<CartItem>, StoreError> {
        if quantity == 0 {
            return Err(StoreError::Invalid(
                "quantity must be at least 1".to_owned(),
            ));
        }

        let _writer = self.writer.lock().await;
        self.status.begin();

        let product_id = product.product_id;
        let snapshot = {
            let mut items = self.write_items();
            if let Some(line) = items.iter_mut().find(|i| i.product_id == product_id) {
                line.quantity += quantity;
            } else {
                items.push(CartItem {
                    product_id,
                    name: product.name,
                    price: product.price,
                    image: product.image,
                    quantity,
                    category: product.category,
                });
            }
            items.clone()
        };

        let Some((customer, token)) = self.auth_context().await else {
            return self.finish_guest_write(&snapshot).map(|()| snapshot);
        };

        let entry = CartEntryPayload {
            product_id,
            quantity,
        };
        match self
            .api
            .add_entry(customer, &entry, token.expose_secret())
            .await
        {
            Ok(()) => {
                // Reconcile with the backend's view; keep the optimistic
                // snapshot if the follow-up fetch fails.
                match self.api.fetch(customer, token.expose_secret()).await {
                    Ok(remote) => {
                        let items = remote.map(map_remote_cart).unwrap_or_default();
                        self.replace_items(items.clone());
                        self.status.succeed();
                        Ok(items)
                    }
                    Err(e) => {
                        warn!("cart refetch after add failed: {e}");
                        self.status.succeed();
                        Ok(snapshot)
                    }
                }
            }
            Err(e) => {
                self.status.fail(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Remove a product's line from the cart.
    ///
    /// If the removal empties the cart the server-side cart is deleted;
    /// otherwise the remaining collection is pushed as an update.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` when the sync fails; the optimistic removal is
    /// retained.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, product_id: ProductId) -> Result<(), StoreError> {
        let _writer = self.writer.lock().await;
        self.status.begin();

        let remaining = {
            let mut items = self.write_items();
            items.retain(|item| item.product_id != product_id);
            items.clone()
        };

        let Some((customer, token)) = self.auth_context().await else {
            return self.finish_guest_write(&remaining);
        };

        let result = if remaining.is_empty() {
            tolerate_missing(self.api.delete(customer, token.expose_secret()).await)
        } else {
            self.api
                .replace(
                    customer,
                    &cart_payload(customer, &remaining),
                    token.expose_secret(),
                )
                .await
        };

        match result {
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

    /// Set a line's quantity. A quantity of zero or less removes the line.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` when the sync fails; the optimistic change is
    /// retained.
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<(), StoreError> {
        if quantity <= 0 {
            return self.remove_item(product_id).await;
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);

        let _writer = self.writer.lock().await;
        self.status.begin();

        let updated = {
            let mut items = self.write_items();
            for item in items.iter_mut() {
                if item.product_id == product_id {
                    item.quantity = quantity;
                }
            }
            items.clone()
        };

        let Some((customer, token)) = self.auth_context().await else {
            return self.finish_guest_write(&updated);
        };

        match self
            .api
            .replace(
                customer,
                &cart_payload(customer, &updated),
                token.expose_secret(),
            )
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

    /// Empty the cart.
    ///
    /// Deletes the server-side cart (a cart that is already gone counts as
    /// success, making repeated clears idempotent) or, without a session,
    /// drops the guest-cart snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` when the sync fails; the in-memory cart stays
    /// empty regardless.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), StoreError> {
        let _writer = self.writer.lock().await;
        self.status.begin();

        self.replace_items(Vec::new());

        let Some((customer, token)) = self.auth_context().await else {
            return match self.storage.remove(keys::GUEST_CART) {
                Ok(()) => {
                    self.status.succeed();
                    Ok(())
                }
                Err(e) => {
                    self.status.fail(e.to_string());
                    Err(e.into())
                }
            };
        };

        match tolerate_missing(self.api.delete(customer, token.expose_secret()).await) {
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

    /// Fold the guest-cart snapshot into the server-side cart.
    ///
    /// Called after login. Quantities are summed per product across the
    /// two carts; the merged collection is pushed remotely and the guest
    /// snapshot is dropped. On failure both the snapshot and the previous
    /// in-memory state survive so the merge can be retried.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AuthRequired`] without a session, or the
    /// sync/persistence error.
    #[instrument(skip(self))]
    pub async fn merge_guest_cart(&self) -> Result<Vec<CartItem>, StoreError> {
        let _writer = self.writer.lock().await;
        self.status.begin();

        let Some((customer, token)) = self.auth_context().await else {
            self.status.fail(StoreError::AuthRequired.to_string());
            return Err(StoreError::AuthRequired);
        };

        let guest = match self.load_guest() {
            Ok(items) => items,
            Err(e) => {
                self.status.fail(e.to_string());
                return Err(e);
            }
        };

        let remote = match self.api.fetch(customer, token.expose_secret()).await {
            Ok(remote) => remote.map(map_remote_cart).unwrap_or_default(),
            Err(e) => {
                self.status.fail(e.to_string());
                return Err(e.into());
            }
        };

        let merged = merge_lines(remote, guest);

        if !merged.is_empty()
            && let Err(e) = self
                .api
                .replace(
                    customer,
                    &cart_payload(customer, &merged),
                    token.expose_secret(),
                )
                .await
        {
            self.status.fail(e.to_string());
            return Err(e.into());
        }

        self.replace_items(merged.clone());
        if let Err(e) = self.storage.remove(keys::GUEST_CART) {
            warn!("failed to drop guest cart snapshot after merge: {e}");
        }
        self.status.succeed();
        Ok(merged)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Local pricing helpers
    // ─────────────────────────────────────────────────────────────────────

    /// Apply a coupon code to the current cart total.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Invalid` for an empty code.
    pub fn apply_coupon(&self, code: &str) -> Result<CouponDiscount, StoreError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(StoreError::Invalid("coupon code is empty".to_owned()));
        }

        // TODO: replace the flat rate with the promotions endpoint once the
        // backend exposes one.
        let rate = Decimal::new(10, 2);
        Ok(CouponDiscount {
            code: code.to_uppercase(),
            rate,
            amount: (self.total() * rate).round_dp(2),
        })
    }

    /// Quote shipping for the current cart to a postal code.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Invalid` for an empty postal code.
    pub fn estimate_shipping(&self, postal_code: &str) -> Result<Decimal, StoreError> {
        if postal_code.trim().is_empty() {
            return Err(StoreError::Invalid("postal code is empty".to_owned()));
        }

        // Flat rate; carrier-quoted shipping is priced at checkout.
        Ok(Decimal::new(1590, 2))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    fn read_items(&self) -> Vec<CartItem> {
        self.items.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn write_items(&self) -> std::sync::RwLockWriteGuard<'_, Vec<CartItem>> {
        self.items.write().unwrap_or_else(|e| e.into_inner())
    }

    fn replace_items(&self, items: Vec<CartItem>) {
        *self.write_items() = items;
    }

    async fn auth_context(&self) -> Option<(CustomerId, SecretString)> {
        let customer = self.session.customer_id()?;
        let token = self.session.get_valid_token().await?;
        Some((customer, token))
    }

    fn load_guest(&self) -> Result<Vec<CartItem>, StoreError> {
        match self.storage.get(keys::GUEST_CART)? {
            Some(raw) => Ok(serde_json::from_str(&raw).map_err(StorageError::from)?),
            None => Ok(Vec::new()),
        }
    }

    fn finish_guest_write(&self, items: &[CartItem]) -> Result<(), StoreError> {
        let result = serde_json::to_string(items)
            .map_err(StorageError::from)
            .and_then(|raw| self.storage.set(keys::GUEST_CART, &raw));

        match result {
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
}

fn map_remote_cart(remote: RemoteCart) -> Vec<CartItem> {
    remote
        .items
        .into_iter()
        .map(|entry| {
            let product = entry.product;
            CartItem {
                product_id: entry.product_id,
                name: product
                    .as_ref()
                    .map_or_else(|| FALLBACK_NAME.to_owned(), |p| p.name.clone()),
                price: product.as_ref().map_or(Decimal::ZERO, |p| p.price),
                image: product
                    .as_ref()
                    .and_then(|p| p.image.clone())
                    .unwrap_or_else(|| FALLBACK_IMAGE.to_owned()),
                quantity: entry.quantity,
                category: product
                    .and_then(|p| p.category)
                    .unwrap_or_else(|| FALLBACK_CATEGORY.to_owned()),
            }
        })
        .collect()
}

fn cart_payload(customer: CustomerId, items: &[CartItem]) -> CartPayload {
    CartPayload {
        customer_id: customer,
        items: items
            .iter()
            .map(|item| CartEntryPayload {
                product_id: item.product_id,
                quantity: item.quantity,
            })
            .collect(),
    }
}

/// Merge two carts, summing quantities per product. `base` line order wins;
/// products only present in `extra` are appended in their own order.
fn merge_lines(base: Vec<CartItem>, extra: Vec<CartItem>) -> Vec<CartItem> {
    let mut merged = base;
    for item in extra {
        if let Some(line) = merged
            .iter_mut()
            .find(|existing| existing.product_id == item.product_id)
        {
            line.quantity += item.quantity;
        } else {
            merged.push(item);
        }
    }
    merged
}

fn tolerate_missing(result: Result<(), crate::api::ApiError>) -> Result<(), crate::api::ApiError> {
    match result {
        Err(e) if e.is_not_found() => Ok(()),
        other => other,
    }
}
