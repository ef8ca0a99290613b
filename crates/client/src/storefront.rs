//! Application-level handle bundling the session and the domain stores.

use std::sync::Arc;

use tracing::warn;

use crate::api::{CartApi, CatalogApi, OrdersApi, RestClient, WishlistApi};
use crate::auth::{
    Credentials, IdentityProvider, MockIdentityProvider, Registration, Session, SessionManager,
};
use crate::catalog::CatalogClient;
use crate::config::{ClientConfig, StorageLocation};
use crate::error::ClientError;
use crate::storage::{FileStore, KeyValueStore, MemoryStore};
use crate::stores::{CartStore, OrdersStore, WishlistStore};

/// One storefront session: session manager, domain stores, and catalog.
///
/// Constructed once per application run and passed by reference to
/// whatever consumes the SDK; there is no global lookup. Cheaply
/// cloneable via `Arc`.
///
/// Login and logout go through this handle rather than the session
/// manager directly so the domain stores get repopulated (and the guest
/// cart merged) at the right moments.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: ClientConfig,
    session: Arc<SessionManager>,
    cart: CartStore,
    wishlist: WishlistStore,
    orders: OrdersStore,
    catalog: CatalogClient,
}

impl Storefront {
    /// Create a storefront with the development identity provider.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the state file cannot be opened or the
    /// HTTP client cannot be constructed.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        Self::with_provider(config, Arc::new(MockIdentityProvider::new()))
    }

    /// Create a storefront with a specific identity provider.
    ///
    /// Pass the [`RestClient`] itself to authenticate against the
    /// backend's `/auth` endpoints instead of the development mock.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the state file cannot be opened or the
    /// HTTP client cannot be constructed.
    pub fn with_provider(
        config: ClientConfig,
        provider: Arc<dyn IdentityProvider>,
    ) -> Result<Self, ClientError> {
        let storage: Arc<dyn KeyValueStore> = match &config.storage {
            StorageLocation::File(path) => Arc::new(FileStore::open(path)?),
            StorageLocation::Memory => Arc::new(MemoryStore::new()),
        };

        let rest = Arc::new(RestClient::new(&config)?);
        let session = Arc::new(SessionManager::new(provider, Arc::clone(&storage)));

        let cart = CartStore::new(
            Arc::clone(&rest) as Arc<dyn CartApi>,
            Arc::clone(&session),
            Arc::clone(&storage),
        );
        let wishlist = WishlistStore::new(
            Arc::clone(&rest) as Arc<dyn WishlistApi>,
            Arc::clone(&session),
        );
        let orders = OrdersStore::new(
            Arc::clone(&rest) as Arc<dyn OrdersApi>,
            Arc::clone(&session),
        );
        let catalog = CatalogClient::new(
            rest as Arc<dyn CatalogApi>,
            config.catalog_cache_ttl,
        );

        Ok(Self {
            inner: Arc::new(StorefrontInner {
                config,
                session,
                cart,
                wishlist,
                orders,
                catalog,
            }),
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────

    /// The configuration this storefront was built from.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The session manager.
    #[must_use]
    pub fn session(&self) -> &SessionManager {
        &self.inner.session
    }

    /// The shopping cart store.
    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    /// The wishlist store.
    #[must_use]
    pub fn wishlist(&self) -> &WishlistStore {
        &self.inner.wishlist
    }

    /// The orders store.
    #[must_use]
    pub fn orders(&self) -> &OrdersStore {
        &self.inner.orders
    }

    /// The cached catalog client.
    #[must_use]
    pub fn catalog(&self) -> &CatalogClient {
        &self.inner.catalog
    }

    // ─────────────────────────────────────────────────────────────────────
    // Orchestration
    // ─────────────────────────────────────────────────────────────────────

    /// Log in and repopulate the domain stores.
    ///
    /// The guest cart is merged into the server-side cart; wishlist and
    /// order history are fetched. Store hydration is best-effort - a
    /// failing fetch is recorded on the affected store and logged, but
    /// does not fail the login.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` when validation or the identity provider
    /// rejects the credentials.
    pub async fn login(&self, credentials: Credentials) -> Result<Session, ClientError> {
        let session = self.inner.session.login(credentials).await?;
        self.hydrate().await;
        Ok(session)
    }

    /// Register a new account, log it in, and repopulate the stores.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` when validation or the identity provider
    /// rejects the registration.
    pub async fn register(&self, registration: Registration) -> Result<Session, ClientError> {
        let session = self.inner.session.register(registration).await?;
        self.hydrate().await;
        Ok(session)
    }

    /// Log out and reset the stores to their unauthenticated state.
    ///
    /// The cart falls back to the guest snapshot (usually empty); wishlist
    /// and order history become empty collections.
    pub async fn logout(&self) {
        self.inner.session.logout().await;

        if let Err(e) = self.inner.cart.fetch_all().await {
            warn!("failed to reset cart after logout: {e}");
        }
        if let Err(e) = self.inner.wishlist.fetch_all().await {
            warn!("failed to reset wishlist after logout: {e}");
        }
        if let Err(e) = self.inner.orders.fetch_all().await {
            warn!("failed to reset orders after logout: {e}");
        }
    }

    async fn hydrate(&self) {
        if let Err(e) = self.inner.cart.merge_guest_cart().await {
            warn!("guest cart merge failed after login: {e}");
        }
        if let Err(e) = self.inner.wishlist.fetch_all().await {
            warn!("wishlist fetch failed after login: {e}");
        }
        if let Err(e) = self.inner.orders.fetch_all().await {
            warn!("orders fetch failed after login: {e}");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::StorageLocation;

    fn memory_config() -> ClientConfig {
        let vars = [
            ("TUNDRA_API_BASE_URL", "http://localhost:3001"),
            ("TUNDRA_STORAGE_PATH", ":memory:"),
        ];
        ClientConfig::from_lookup(|key| {
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value).to_owned())
        })
        .unwrap()
    }

    #[test]
    fn test_construction_wires_stores() {
        let storefront = Storefront::new(memory_config()).unwrap();

        assert!(matches!(
            storefront.config().storage,
            StorageLocation::Memory
        ));
        assert!(!storefront.session().is_authenticated());
        assert!(storefront.cart().items().is_empty());
        assert_eq!(storefront.wishlist().count(), 0);
        assert_eq!(storefront.orders().count(), 0);
    }
}
