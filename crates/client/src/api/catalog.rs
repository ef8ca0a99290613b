//! Product catalog endpoints.
//!
//! Catalog reads are public; no bearer token is required.

use async_trait::async_trait;

use tundra_core::{CategoryId, ProductId};

use super::types::{CategoryDto, ProductDto};
use super::{ApiError, RestClient};

/// Read-only product catalog operations.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Fetch the full product list.
    async fn products(&self) -> Result<Vec<ProductDto>, ApiError>;

    /// Fetch a single product. `None` when the backend does not know it.
    async fn product(&self, id: ProductId) -> Result<Option<ProductDto>, ApiError>;

    /// Full-text search over the catalog.
    async fn search(&self, query: &str) -> Result<Vec<ProductDto>, ApiError>;

    /// Fetch products belonging to one category.
    async fn by_category(&self, category: CategoryId) -> Result<Vec<ProductDto>, ApiError>;

    /// Fetch the category list.
    async fn categories(&self) -> Result<Vec<CategoryDto>, ApiError>;
}

#[async_trait]
impl CatalogApi for RestClient {
    async fn products(&self) -> Result<Vec<ProductDto>, ApiError> {
        self.get_json("products", None).await
    }

    async fn product(&self, id: ProductId) -> Result<Option<ProductDto>, ApiError> {
        let path = format!("products/{id}");
        match self.get_json::<ProductDto>(&path, None).await {
            Ok(product) => Ok(Some(product)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn search(&self, query: &str) -> Result<Vec<ProductDto>, ApiError> {
        let path = format!(
            "products?search={}",
            url::form_urlencoded::byte_serialize(query.as_bytes()).collect::<String>()
        );
        self.get_json(&path, None).await
    }

    async fn by_category(&self, category: CategoryId) -> Result<Vec<ProductDto>, ApiError> {
        let path = format!("products?categoryId={category}");
        self.get_json(&path, None).await
    }

    async fn categories(&self) -> Result<Vec<CategoryDto>, ApiError> {
        self.get_json("categories", None).await
    }
}
