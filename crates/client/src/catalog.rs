//! Cached read-only product catalog.
//!
//! Catalog responses change rarely and are requested constantly while
//! browsing, so every read goes through an in-memory `moka` cache with a
//! configurable TTL. Writes never happen from the client; the cache is
//! only invalidated by time.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use tundra_core::{CategoryId, ProductId};

use crate::api::types::{CategoryDto, ProductDto};
use crate::api::{ApiError, CatalogApi};

const MAX_CACHED_RESPONSES: u64 = 256;

/// Cache key per catalog request shape.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Products,
    Product(ProductId),
    Search(String),
    Category(CategoryId),
    Categories,
}

/// Cached response payloads.
#[derive(Debug, Clone)]
enum CacheValue {
    Products(Vec<ProductDto>),
    Product(Box<ProductDto>),
    Categories(Vec<CategoryDto>),
}

/// Read-only catalog client with TTL response caching.
pub struct CatalogClient {
    api: Arc<dyn CatalogApi>,
    cache: Cache<CacheKey, CacheValue>,
}

impl CatalogClient {
    /// Create a catalog client whose responses live for `ttl`.
    #[must_use]
    pub fn new(api: Arc<dyn CatalogApi>, ttl: Duration) -> Self {
        Self {
            api,
            cache: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(MAX_CACHED_RESPONSES)
                .build(),
        }
    }

    /// The full product list.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` when the backend call fails; failures are not
    /// cached.
    pub async fn products(&self) -> Result<Vec<ProductDto>, ApiError> {
        if let Some(CacheValue::Products(products)) = self.cache.get(&CacheKey::Products).await {
            return Ok(products);
        }

        let products = self.api.products().await?;
        self.cache
            .insert(CacheKey::Products, CacheValue::Products(products.clone()))
            .await;
        Ok(products)
    }

    /// A single product; `None` when the backend does not know the id.
    /// Misses are not cached.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` when the backend call fails.
    pub async fn product(&self, id: ProductId) -> Result<Option<ProductDto>, ApiError> {
        let key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.cache.get(&key).await {
            return Ok(Some(*product));
        }

        let product = self.api.product(id).await?;
        if let Some(product) = &product {
            self.cache
                .insert(key, CacheValue::Product(Box::new(product.clone())))
                .await;
        }
        Ok(product)
    }

    /// Full-text search over the catalog.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` when the backend call fails.
    pub async fn search(&self, query: &str) -> Result<Vec<ProductDto>, ApiError> {
        let key = CacheKey::Search(query.to_lowercase());
        if let Some(CacheValue::Products(products)) = self.cache.get(&key).await {
            return Ok(products);
        }

        let products = self.api.search(query).await?;
        self.cache
            .insert(key, CacheValue::Products(products.clone()))
            .await;
        Ok(products)
    }

    /// Products belonging to one category.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` when the backend call fails.
    pub async fn by_category(&self, category: CategoryId) -> Result<Vec<ProductDto>, ApiError> {
        let key = CacheKey::Category(category);
        if let Some(CacheValue::Products(products)) = self.cache.get(&key).await {
            return Ok(products);
        }

        let products = self.api.by_category(category).await?;
        self.cache
            .insert(key, CacheValue::Products(products.clone()))
            .await;
        Ok(products)
    }

    /// The category list.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` when the backend call fails.
    pub async fn categories(&self) -> Result<Vec<CategoryDto>, ApiError> {
        if let Some(CacheValue::Categories(categories)) =
            self.cache.get(&CacheKey::Categories).await
        {
            return Ok(categories);
        }

        let categories = self.api.categories().await?;
        self.cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(categories.clone()),
            )
            .await;
        Ok(categories)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct FakeCatalogApi {
        product_calls: AtomicUsize,
        list_calls: AtomicUsize,
    }

    fn dto(id: i64, name: &str) -> ProductDto {
        ProductDto {
            id: ProductId::new(id),
            name: name.to_owned(),
            price: "99.00".parse().unwrap(),
            image: None,
            category_id: Some(CategoryId::new(1)),
            category: Some("Laptops".to_owned()),
            description: None,
        }
    }

    #[async_trait]
    impl CatalogApi for FakeCatalogApi {
        async fn products(&self) -> Result<Vec<ProductDto>, ApiError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![dto(1, "Yoga Slim 7"), dto(2, "Legion 5")])
        }

        async fn product(&self, id: ProductId) -> Result<Option<ProductDto>, ApiError> {
            self.product_calls.fetch_add(1, Ordering::SeqCst);
            if id == ProductId::new(404) {
                return Ok(None);
            }
            Ok(Some(dto(id.as_i64(), "Yoga Slim 7")))
        }

        async fn search(&self, _query: &str) -> Result<Vec<ProductDto>, ApiError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![dto(1, "Yoga Slim 7")])
        }

        async fn by_category(&self, _category: CategoryId) -> Result<Vec<ProductDto>, ApiError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![dto(2, "Legion 5")])
        }

        async fn categories(&self) -> Result<Vec<CategoryDto>, ApiError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![CategoryDto {
                id: CategoryId::new(1),
                name: "Laptops".to_owned(),
            }])
        }
    }

    fn client(api: Arc<FakeCatalogApi>) -> CatalogClient {
        CatalogClient::new(api, Duration::from_secs(300))
    }

    #[tokio::test]
    async fn test_product_list_cached() {
        let api = Arc::new(FakeCatalogApi::default());
        let catalog = client(Arc::clone(&api));

        let first = catalog.products().await.unwrap();
        let second = catalog.products().await.unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(first.len(), second.len());
        assert_eq!(api.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_single_product_cached_but_not_misses() {
        let api = Arc::new(FakeCatalogApi::default());
        let catalog = client(Arc::clone(&api));

        assert!(catalog.product(ProductId::new(1)).await.unwrap().is_some());
        assert!(catalog.product(ProductId::new(1)).await.unwrap().is_some());
        assert_eq!(api.product_calls.load(Ordering::SeqCst), 1);

        // Misses go to the backend every time
        assert!(catalog.product(ProductId::new(404)).await.unwrap().is_none());
        assert!(catalog.product(ProductId::new(404)).await.unwrap().is_none());
        assert_eq!(api.product_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_search_cache_is_case_insensitive() {
        let api = Arc::new(FakeCatalogApi::default());
        let catalog = client(Arc::clone(&api));

        catalog.search("Yoga").await.unwrap();
        catalog.search("yoga").await.unwrap();
        assert_eq!(api.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_distinct_requests_cached_separately() {
        let api = Arc::new(FakeCatalogApi::default());
        let catalog = client(Arc::clone(&api));

        catalog.products().await.unwrap();
        catalog.by_category(CategoryId::new(1)).await.unwrap();
        catalog.categories().await.unwrap();
        assert_eq!(api.list_calls.load(Ordering::SeqCst), 3);
    }
}
