use async_trait::async_trait;
use uuid::Uuid;

use crate::error::ProductResult;
use crate::models::{CreateProduct, Pagination, Product};

/// Repository trait for Product persistence
///
/// This trait defines the data access interface for products.
/// Implementations can use different storage backends (MongoDB, etc.)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Persist a new product.
    ///
    /// Implementations must surface a uniqueness violation on `sku` as
    /// `ProductError::DuplicateSku` so concurrent creates cannot slip past
    /// the service-level existence check.
    async fn create(&self, input: CreateProduct) -> ProductResult<Product>;

    /// Look up a product by its SKU
    async fn find_by_sku(&self, sku: &str) -> ProductResult<Option<Product>>;

    /// Fetch one page of products in creation order
    async fn list(&self, page: Pagination) -> ProductResult<Vec<Product>>;

    /// Count all products, independent of pagination
    async fn count(&self) -> ProductResult<u64>;

    /// Set a product's quantity, returning the post-update record.
    ///
    /// Returns `Ok(None)` when no product has the given id.
    async fn update_quantity(&self, id: Uuid, quantity: i64) -> ProductResult<Option<Product>>;
}
