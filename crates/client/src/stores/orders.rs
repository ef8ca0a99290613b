//! Order history store.
//!
//! Orders are created client-side (id, date, and initial status assigned
//! here) and pushed to the backend; the collection is kept newest-first.
//! Like the other stores, mutations update memory optimistically and a
//! remote failure records an error without rolling the change back.

use std::sync::{Arc, RwLock};

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tundra_core::{CustomerId, OrderId, OrderStatus, ProductId};

use crate::api::OrdersApi;
use crate::api::types::{OrderDto, OrderLineDto};
use crate::auth::SessionManager;

use super::{StatusCell, StoreError, StoreStatus};

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub price: Decimal,
}

impl OrderLine {
    /// The line's contribution to the order total.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    pub id: OrderId,
    pub placed_at: NaiveDate,
    pub status: OrderStatus,
    pub total: Decimal,
    pub items: Vec<OrderLine>,
}

/// Input for placing an order. The id, date, and status are assigned by
/// the store; the total defaults to the sum of line totals.
#[derive(Debug, Clone, Default)]
pub struct OrderDraft {
    pub items: Vec<OrderLine>,
    pub total: Option<Decimal>,
}

/// Order counts per status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderStats {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub shipped: usize,
    pub delivered: usize,
    pub cancelled: usize,
}

/// Order history state container.
pub struct OrdersStore {
    api: Arc<dyn OrdersApi>,
    session: Arc<SessionManager>,
    orders: RwLock<Vec<PlacedOrder>>,
    status: StatusCell,
    writer: tokio::sync::Mutex<()>,
}

impl OrdersStore {
    /// Create an empty orders store.
    #[must_use]
    pub fn new(api: Arc<dyn OrdersApi>, session: Arc<SessionManager>) -> Self {
        Self {
            api,
            session,
            orders: RwLock::new(Vec::new()),
            status: StatusCell::default(),
            writer: tokio::sync::Mutex::new(()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────

    /// Snapshot of the order history, newest first.
    #[must_use]
    pub fn orders(&self) -> Vec<PlacedOrder> {
        self.read_orders()
    }

    /// Number of orders.
    #[must_use]
    pub fn count(&self) -> usize {
        self.read_orders().len()
    }

    /// The order with the given id, if the store holds it.
    #[must_use]
    pub fn find(&self, id: &OrderId) -> Option<PlacedOrder> {
        self.read_orders().into_iter().find(|o| &o.id == id)
    }

    /// Order counts per status.
    #[must_use]
    pub fn stats(&self) -> OrderStats {
        let orders = self.read_orders();
        let mut stats = OrderStats {
            total: orders.len(),
            ..OrderStats::default()
        };
        for order in &orders {
            match order.status {
                OrderStatus::Pending => stats.pending += 1,
                OrderStatus::Processing => stats.processing += 1,
                OrderStatus::Shipped => stats.shipped += 1,
                OrderStatus::Delivered => stats.delivered += 1,
                OrderStatus::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }

    /// Orders currently in `status`.
    #[must_use]
    pub fn filter_by_status(&self, status: OrderStatus) -> Vec<PlacedOrder> {
        self.read_orders()
            .into_iter()
            .filter(|o| o.status == status)
            .collect()
    }

    /// Orders placed within an inclusive date range. Either bound may be
    /// open.
    #[must_use]
    pub fn filter_by_date_range(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Vec<PlacedOrder> {
        self.read_orders()
            .into_iter()
            .filter(|o| {
                from.is_none_or(|from| o.placed_at >= from)
                    && to.is_none_or(|to| o.placed_at <= to)
            })
            .collect()
    }

    /// Case-insensitive substring search over order ids and line names.
    #[must_use]
    pub fn search(&self, term: &str) -> Vec<PlacedOrder> {
        let term = term.to_lowercase();
        if term.is_empty() {
            return self.read_orders();
        }

        self.read_orders()
            .into_iter()
            .filter(|o| {
                o.id.as_str().to_lowercase().contains(&term)
                    || o.items
                        .iter()
                        .any(|line| line.name.to_lowercase().contains(&term))
            })
            .collect()
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

    /// Load the order history for the current session.
    ///
    /// Without a session the history is an empty collection.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` when the fetch fails; the previous in-memory
    /// state is left untouched in that case.
    pub async fn fetch_all(&self) -> Result<Vec<PlacedOrder>, StoreError> {
        let _writer = self.writer.lock().await;
        self.status.begin();

        let Some((customer, token)) = self.auth_context().await else {
            self.replace_orders(Vec::new());
            self.status.succeed();
            return Ok(Vec::new());
        };

        match self.api.fetch(customer, token.expose_secret()).await {
            Ok(dtos) => {
                let orders: Vec<PlacedOrder> = dtos.into_iter().map(order_from_dto).collect();
                self.replace_orders(orders.clone());
                self.status.succeed();
                Ok(orders)
            }
            Err(e) => {
                self.status.fail(e.to_string());
                Err(e.into())
            }
        }
    }

    /// The order with the given id, from memory or, failing that, from the
    /// backend.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::OrderNotFound`] when neither side knows the
    /// order, `AuthRequired` without a session, or the fetch error.
    pub async fn fetch_by_id(&self, id: &OrderId) -> Result<PlacedOrder, StoreError> {
        if let Some(order) = self.find(id) {
            return Ok(order);
        }

        let Some((_, token)) = self.auth_context().await else {
            return Err(StoreError::AuthRequired);
        };

        match self.api.fetch_one(id, token.expose_secret()).await? {
            Some(dto) => Ok(order_from_dto(dto)),
            None => Err(StoreError::OrderNotFound(id.clone())),
        }
    }

    /// Place a new order.
    ///
    /// The order is assigned a fresh id, today's date, and
    /// [`OrderStatus::Pending`], then prepended to the in-memory history
    /// before the remote call resolves. On remote failure the optimistic
    /// order is retained and the store error is set.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Invalid` for an empty draft,
    /// `AuthRequired` without a session, or the sync error.
    #[instrument(skip(self, draft))]
    pub async fn create(&self, draft: OrderDraft) -> Result<PlacedOrder, StoreError> {
        if draft.items.is_empty() {
            return Err(StoreError::Invalid("order has no items".to_owned()));
        }

        let _writer = self.writer.lock().await;
        self.status.begin();

        let Some((_, token)) = self.auth_context().await else {
            self.status.fail(StoreError::AuthRequired.to_string());
            return Err(StoreError::AuthRequired);
        };

        let total = draft
            .total
            .unwrap_or_else(|| draft.items.iter().map(OrderLine::line_total).sum());
        let order = PlacedOrder {
            id: OrderId::generate(),
            placed_at: Utc::now().date_naive(),
            status: OrderStatus::Pending,
            total,
            items: draft.items,
        };

        {
            let mut orders = self.write_orders();
            orders.insert(0, order.clone());
        }

        match self
            .api
            .create(&dto_from_order(&order), token.expose_secret())
            .await
        {
            Ok(()) => {
                self.status.succeed();
                Ok(order)
            }
            Err(e) => {
                self.status.fail(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Set an order's status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::OrderNotFound`] for an unknown id,
    /// `AuthRequired` without a session, or the sync error; the optimistic
    /// transition is retained on failure.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<(), StoreError> {
        let _writer = self.writer.lock().await;
        self.status.begin();

        let Some((_, token)) = self.auth_context().await else {
            self.status.fail(StoreError::AuthRequired.to_string());
            return Err(StoreError::AuthRequired);
        };

        if !self.transition(id, status) {
            let err = StoreError::OrderNotFound(id.clone());
            self.status.fail(err.to_string());
            return Err(err);
        }

        match self
            .api
            .set_status(id, status, token.expose_secret())
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

    /// Cancel an order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::OrderNotFound`] for an unknown id,
    /// `AuthRequired` without a session, or the sync error.
    #[instrument(skip(self))]
    pub async fn cancel(&self, id: &OrderId) -> Result<(), StoreError> {
        let _writer = self.writer.lock().await;
        self.status.begin();

        let Some((_, token)) = self.auth_context().await else {
            self.status.fail(StoreError::AuthRequired.to_string());
            return Err(StoreError::AuthRequired);
        };

        if !self.transition(id, OrderStatus::Cancelled) {
            let err = StoreError::OrderNotFound(id.clone());
            self.status.fail(err.to_string());
            return Err(err);
        }

        match self.api.cancel(id, token.expose_secret()).await {
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

    /// Replace an order's lines (and total) wholesale.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::OrderNotFound`] for an unknown id,
    /// `AuthRequired` without a session, or the sync error.
    #[instrument(skip(self, draft))]
    pub async fn update(&self, id: &OrderId, draft: OrderDraft) -> Result<PlacedOrder, StoreError> {
        let _writer = self.writer.lock().await;
        self.status.begin();

        let Some((_, token)) = self.auth_context().await else {
            self.status.fail(StoreError::AuthRequired.to_string());
            return Err(StoreError::AuthRequired);
        };

        let total = draft
            .total
            .unwrap_or_else(|| draft.items.iter().map(OrderLine::line_total).sum());

        let updated = {
            let mut orders = self.write_orders();
            let Some(order) = orders.iter_mut().find(|o| &o.id == id) else {
                drop(orders);
                let err = StoreError::OrderNotFound(id.clone());
                self.status.fail(err.to_string());
                return Err(err);
            };
            order.items = draft.items;
            order.total = total;
            order.clone()
        };

        match self
            .api
            .update(id, &dto_from_order(&updated), token.expose_secret())
            .await
        {
            Ok(()) => {
                self.status.succeed();
                Ok(updated)
            }
            Err(e) => {
                self.status.fail(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Delete an order from the history.
    ///
    /// # Errors
    ///
    /// Returns `AuthRequired` without a session, or the sync error; the
    /// optimistic removal is retained on failure.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &OrderId) -> Result<(), StoreError> {
        let _writer = self.writer.lock().await;
        self.status.begin();

        let Some((_, token)) = self.auth_context().await else {
            self.status.fail(StoreError::AuthRequired.to_string());
            return Err(StoreError::AuthRequired);
        };

        {
            let mut orders = self.write_orders();
            orders.retain(|o| &o.id != id);
        }

        match self.api.delete(id, token.expose_secret()).await {
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

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    fn read_orders(&self) -> Vec<PlacedOrder> {
        self.orders
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn write_orders(&self) -> std::sync::RwLockWriteGuard<'_, Vec<PlacedOrder>> {
        self.orders.write().unwrap_or_else(|e| e.into_inner())
    }

    fn replace_orders(&self, orders: Vec<PlacedOrder>) {
        *self.write_orders() = orders;
    }

    /// Apply a status transition in memory. Returns false when the order
    /// is unknown.
    fn transition(&self, id: &OrderId, status: OrderStatus) -> bool {
        let mut orders = self.write_orders();
        orders.iter_mut().any(|order| {
            if &order.id == id {
                order.status = status;
                true
            } else {
                false
            }
        })
    }

    async fn auth_context(&self) -> Option<(CustomerId, SecretString)> {
        let customer = self.session.customer_id()?;
        let token = self.session.get_valid_token().await?;
        Some((customer, token))
    }
}

fn order_from_dto(dto: OrderDto) -> PlacedOrder {
    PlacedOrder {
        id: OrderId::from_string(dto.id),
        placed_at: dto.placed_at,
        status: dto.status,
        total: dto.total,
        items: dto
            .items
            .into_iter()
            .map(|line| OrderLine {
                product_id: line.product_id,
                name: line.name,
                quantity: line.quantity,
                price: line.price,
            })
            .collect(),
    }
}

fn dto_from_order(order: &PlacedOrder) -> OrderDto {
    OrderDto {
        id: order.id.as_str().to_owned(),
        placed_at: order.placed_at,
        status: order.status,
        total: order.total,
        items: order
            .items
            .iter()
            .map(|line| OrderLineDto {
                product_id: line.product_id,
                name: line.name.clone(),
                quantity: line.quantity,
                price: line.price,
            })
            .collect(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use crate::api::ApiError;
    use crate::auth::{Credentials, MockIdentityProvider};
    use crate::storage::MemoryStore;

    use super::*;

    #[derive(Default)]
    struct FakeOrdersApi {
        orders: Mutex<Vec<OrderDto>>,
        fail: AtomicBool,
    }

    impl FakeOrdersApi {
        fn check_fail(&self) -> Result<(), ApiError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(ApiError::Status {
                    status: 503,
                    message: "Service Unavailable".to_owned(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl OrdersApi for FakeOrdersApi {
        async fn fetch(
            &self,
            _customer: CustomerId,
            _token: &str,
        ) -> Result<Vec<OrderDto>, ApiError> {
            self.check_fail()?;
            Ok(self.orders.lock().unwrap().clone())
        }

        async fn fetch_one(
            &self,
            id: &OrderId,
            _token: &str,
        ) -> Result<Option<OrderDto>, ApiError> {
            self.check_fail()?;
            Ok(self
                .orders
                .lock()
                .unwrap()
                .iter()
                .find(|o| o.id == id.as_str())
                .cloned())
        }

        async fn create(&self, order: &OrderDto, _token: &str) -> Result<(), ApiError> {
            self.check_fail()?;
            self.orders.lock().unwrap().insert(0, order.clone());
            Ok(())
        }

        async fn update(
            &self,
            id: &OrderId,
            order: &OrderDto,
            _token: &str,
        ) -> Result<(), ApiError> {
            self.check_fail()?;
            let mut orders = self.orders.lock().unwrap();
            if let Some(existing) = orders.iter_mut().find(|o| o.id == id.as_str()) {
                *existing = order.clone();
            }
            Ok(())
        }

        async fn set_status(
            &self,
            id: &OrderId,
            status: OrderStatus,
            _token: &str,
        ) -> Result<(), ApiError> {
            self.check_fail()?;
            let mut orders = self.orders.lock().unwrap();
            if let Some(existing) = orders.iter_mut().find(|o| o.id == id.as_str()) {
                existing.status = status;
            }
            Ok(())
        }

        async fn cancel(&self, id: &OrderId, token: &str) -> Result<(), ApiError> {
            self.set_status(id, OrderStatus::Cancelled, token).await
        }

        async fn delete(&self, id: &OrderId, _token: &str) -> Result<(), ApiError> {
            self.check_fail()?;
            self.orders.lock().unwrap().retain(|o| o.id != id.as_str());
            Ok(())
        }
    }

    fn line(id: i64, name: &str, price: &str, quantity: u32) -> OrderLine {
        OrderLine {
            product_id: ProductId::new(id),
            name: name.to_owned(),
            quantity,
            price: price.parse().unwrap(),
        }
    }

    async fn logged_in_session() -> Arc<SessionManager> {
        let manager = Arc::new(SessionManager::new(
            Arc::new(MockIdentityProvider::new()),
            Arc::new(MemoryStore::new()),
        ));
        manager
            .login(Credentials::new("user@example.com", "password"))
            .await
            .unwrap();
        manager
    }

    async fn authed_store(api: Arc<FakeOrdersApi>) -> OrdersStore {
        OrdersStore::new(api, logged_in_session().await)
    }

    #[tokio::test]
    async fn test_create_assigns_pending_and_prepends() {
        let store = authed_store(Arc::new(FakeOrdersApi::default())).await;

        let first = store
            .create(OrderDraft {
                items: vec![line(1, "Yoga Slim 7", "6999.99", 1)],
                total: None,
            })
            .await
            .unwrap();
        let second = store
            .create(OrderDraft {
                items: vec![line(2, "Legion 5", "10999.99", 1)],
                total: None,
            })
            .await
            .unwrap();

        assert_eq!(first.status, OrderStatus::Pending);
        assert_eq!(first.total, "6999.99".parse::<Decimal>().unwrap());

        // Newest first
        let orders = store.orders();
        assert_eq!(orders.first().unwrap().id, second.id);
        assert_eq!(orders.len(), 2);
    }

    #[tokio::test]
    async fn test_create_computes_total_from_lines() {
        let store = authed_store(Arc::new(FakeOrdersApi::default())).await;

        let order = store
            .create(OrderDraft {
                items: vec![
                    line(1, "Tab M11", "899.00", 2),
                    line(2, "Smart Clock", "349.00", 1),
                ],
                total: None,
            })
            .await
            .unwrap();

        assert_eq!(order.total, "2147.00".parse::<Decimal>().unwrap());
    }

    #[tokio::test]
    async fn test_empty_draft_rejected() {
        let store = authed_store(Arc::new(FakeOrdersApi::default())).await;
        let err = store.create(OrderDraft::default()).await.unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_cancel_marks_cancelled() {
        let store = authed_store(Arc::new(FakeOrdersApi::default())).await;
        let order = store
            .create(OrderDraft {
                items: vec![line(1, "Yoga Slim 7", "6999.99", 1)],
                total: None,
            })
            .await
            .unwrap();

        store.cancel(&order.id).await.unwrap();
        assert_eq!(
            store.find(&order.id).unwrap().status,
            OrderStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_update_status_unknown_order() {
        let store = authed_store(Arc::new(FakeOrdersApi::default())).await;
        let err = store
            .update_status(&OrderId::from_string("ORD-missing"), OrderStatus::Shipped)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::OrderNotFound(_)));
    }

    #[tokio::test]
    async fn test_fetch_all_round_trips_created_orders() {
        let api = Arc::new(FakeOrdersApi::default());
        let store = authed_store(Arc::clone(&api)).await;

        let created = store
            .create(OrderDraft {
                items: vec![line(1, "Yoga Slim 7", "6999.99", 1)],
                total: None,
            })
            .await
            .unwrap();

        let fetched = store.fetch_all().await.unwrap();
        assert_eq!(fetched.len(), 1);
        let fetched = fetched.into_iter().next().unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.status, OrderStatus::Pending);
        assert_eq!(fetched.items.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_by_id_falls_back_to_remote() {
        let api = Arc::new(FakeOrdersApi::default());
        api.orders.lock().unwrap().push(OrderDto {
            id: "ORD-remote".to_owned(),
            placed_at: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            status: OrderStatus::Delivered,
            total: "6999.99".parse().unwrap(),
            items: Vec::new(),
        });

        let store = authed_store(api).await;
        let order = store
            .fetch_by_id(&OrderId::from_string("ORD-remote"))
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);

        let err = store
            .fetch_by_id(&OrderId::from_string("ORD-nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::OrderNotFound(_)));
    }

    #[tokio::test]
    async fn test_remote_failure_keeps_optimistic_order() {
        let api = Arc::new(FakeOrdersApi::default());
        let store = authed_store(Arc::clone(&api)).await;

        api.fail.store(true, Ordering::SeqCst);
        let err = store
            .create(OrderDraft {
                items: vec![line(1, "Yoga Slim 7", "6999.99", 1)],
                total: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Api(_)));
        assert_eq!(store.count(), 1);
        assert!(store.status().error.is_some());
    }

    #[tokio::test]
    async fn test_stats_and_filters() {
        let store = authed_store(Arc::new(FakeOrdersApi::default())).await;

        let a = store
            .create(OrderDraft {
                items: vec![line(1, "Yoga Slim 7", "6999.99", 1)],
                total: None,
            })
            .await
            .unwrap();
        let b = store
            .create(OrderDraft {
                items: vec![line(2, "Legion 5", "10999.99", 1)],
                total: None,
            })
            .await
            .unwrap();

        store.update_status(&a.id, OrderStatus::Shipped).await.unwrap();
        store.cancel(&b.id).await.unwrap();

        let stats = store.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.shipped, 1);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.pending, 0);

        assert_eq!(store.filter_by_status(OrderStatus::Shipped).len(), 1);
        assert_eq!(store.search("legion").len(), 1);
        assert_eq!(store.search(a.id.as_str()).len(), 1);

        let today = Utc::now().date_naive();
        assert_eq!(store.filter_by_date_range(Some(today), None).len(), 2);
        assert_eq!(
            store
                .filter_by_date_range(None, Some(today - chrono::Days::new(1)))
                .len(),
            0
        );
    }

    #[tokio::test]
    async fn test_delete_tolerates_missing_remote_order() {
        let store = authed_store(Arc::new(FakeOrdersApi::default())).await;
        let order = store
            .create(OrderDraft {
                items: vec![line(1, "Yoga Slim 7", "6999.99", 1)],
                total: None,
            })
            .await
            .unwrap();

        store.delete(&order.id).await.unwrap();
        assert_eq!(store.count(), 0);

        // Deleting again is a no-op locally and tolerated remotely
        store.delete(&order.id).await.unwrap();
        assert_eq!(store.status().error, None);
    }
}
