//! Product Service - Business logic layer

use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ProductError, ProductResult};
use crate::models::{CreateProduct, Product, ProductListQuery, ProductPage, UpdateQuantity};
use crate::repository::ProductRepository;

/// Product service providing business logic operations
///
/// The service layer handles validation, business rules, and orchestrates
/// repository operations.
pub struct ProductService<R: ProductRepository> {
    repository: Arc<R>,
}

impl<R: ProductRepository> ProductService<R> {
    /// Create a new ProductService with the given repository
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    /// Create a new product
    ///
    /// The SKU existence check here gives the common case a clean failure
    /// path; the unique index behind `ProductRepository::create` remains
    /// the authoritative guard for the check-then-insert race window.
    #[instrument(skip(self, input), fields(sku = %input.sku))]
    pub async fn create_product(&self, input: CreateProduct) -> ProductResult<Product> {
        input
            .validate()
            .map_err(|e| ProductError::Validation(e.to_string()))?;

        if self.repository.find_by_sku(&input.sku).await?.is_some() {
            return Err(ProductError::DuplicateSku(input.sku));
        }

        self.repository.create(input).await
    }

    /// List products as one page plus pagination metadata
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: ProductListQuery) -> ProductResult<ProductPage> {
        let page = query.pagination();

        let products = self.repository.list(page).await?;
        let total_products = self.repository.count().await?;

        Ok(ProductPage {
            products,
            current_page: page.page,
            total_pages: page.total_pages(total_products),
            total_products,
        })
    }

    /// Set the stock quantity of a product
    ///
    /// The quantity must be a JSON integer; anything else is rejected
    /// before storage is touched. A path id that does not parse as a UUID
    /// takes the same not-found path as a missing record.
    #[instrument(skip(self, input))]
    pub async fn update_quantity(
        &self,
        id: &str,
        input: UpdateQuantity,
    ) -> ProductResult<Product> {
        let quantity = input
            .quantity
            .as_i64()
            .ok_or(ProductError::InvalidQuantity)?;

        let product_id = match Uuid::parse_str(id) {
            Ok(uuid) => uuid,
            Err(_) => return Err(ProductError::NotFound(id.to_string())),
        };

        self.repository
            .update_quantity(product_id, quantity)
            .await?
            .ok_or_else(|| ProductError::NotFound(id.to_string()))
    }
}

impl<R: ProductRepository> Clone for ProductService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Pagination;
    use crate::repository::MockProductRepository;
    use mockall::predicate::eq;
    use serde_json::json;

    fn create_input(sku: &str) -> CreateProduct {
        CreateProduct {
            name: "Widget".to_string(),
            product_type: "hardware".to_string(),
            sku: sku.to_string(),
            image_url: None,
            description: Some("A widget".to_string()),
            quantity: 3,
            price: 9.99,
        }
    }

    fn stored(sku: &str, quantity: i64) -> Product {
        Product::new(CreateProduct {
            quantity,
            ..create_input(sku)
        })
    }

    #[tokio::test]
    async fn create_with_fresh_sku_succeeds() {
        let mut repo = MockProductRepository::new();
        repo.expect_find_by_sku()
            .with(eq("WID-001"))
            .returning(|_| Ok(None));
        repo.expect_create()
            .returning(|input| Ok(Product::new(input)));

        let service = ProductService::new(repo);
        let product = service.create_product(create_input("WID-001")).await.unwrap();
        assert_eq!(product.sku, "WID-001");
        assert_eq!(product.quantity, 3);
    }

    #[tokio::test]
    async fn create_with_existing_sku_fails_without_insert() {
        let mut repo = MockProductRepository::new();
        repo.expect_find_by_sku()
            .with(eq("WID-001"))
            .returning(|_| Ok(Some(stored("WID-001", 3))));
        // No expect_create: the mock panics if the service tries to insert.

        let service = ProductService::new(repo);
        let err = service
            .create_product(create_input("WID-001"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProductError::DuplicateSku(sku) if sku == "WID-001"));
    }

    #[tokio::test]
    async fn create_surfaces_duplicate_key_from_racing_insert() {
        // Both requests pass the existence check; the second insert hits
        // the unique index and must still come back as DuplicateSku.
        let mut repo = MockProductRepository::new();
        repo.expect_find_by_sku().returning(|_| Ok(None));
        repo.expect_create()
            .returning(|input| Err(ProductError::DuplicateSku(input.sku)));

        let service = ProductService::new(repo);
        let err = service
            .create_product(create_input("WID-001"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProductError::DuplicateSku(_)));
    }

    #[tokio::test]
    async fn create_rejects_blank_sku_before_storage() {
        let repo = MockProductRepository::new();
        let service = ProductService::new(repo);

        let err = service.create_product(create_input("")).await.unwrap_err();
        assert!(matches!(err, ProductError::Validation(_)));
    }

    #[tokio::test]
    async fn list_returns_page_two_of_twenty_five() {
        let mut repo = MockProductRepository::new();
        repo.expect_list()
            .with(eq(Pagination { page: 2, limit: 10 }))
            .returning(|_| Ok((10..20).map(|i| stored(&format!("SKU-{i}"), i)).collect()));
        repo.expect_count().returning(|| Ok(25));

        let service = ProductService::new(repo);
        let page = service
            .list_products(ProductListQuery {
                page: Some(2),
                limit: Some(10),
            })
            .await
            .unwrap();

        assert_eq!(page.products.len(), 10);
        assert_eq!(page.products[0].sku, "SKU-10");
        assert_eq!(page.products[9].sku, "SKU-19");
        assert_eq!(page.current_page, 2);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_products, 25);
    }

    #[tokio::test]
    async fn list_with_defaults_on_empty_store() {
        let mut repo = MockProductRepository::new();
        repo.expect_list()
            .with(eq(Pagination { page: 1, limit: 10 }))
            .returning(|_| Ok(vec![]));
        repo.expect_count().returning(|| Ok(0));

        let service = ProductService::new(repo);
        let page = service.list_products(ProductListQuery::default()).await.unwrap();

        assert!(page.products.is_empty());
        assert_eq!(page.current_page, 1);
        assert_eq!(page.total_pages, 0);
        assert_eq!(page.total_products, 0);
    }

    #[tokio::test]
    async fn list_treats_non_positive_limit_as_default() {
        let mut repo = MockProductRepository::new();
        repo.expect_list()
            .with(eq(Pagination { page: 1, limit: 10 }))
            .returning(|_| Ok(vec![]));
        repo.expect_count().returning(|| Ok(0));

        let service = ProductService::new(repo);
        service
            .list_products(ProductListQuery {
                page: None,
                limit: Some(0),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn update_quantity_with_integer_succeeds() {
        let target = stored("WID-001", 1);
        let id = target.id;

        let mut repo = MockProductRepository::new();
        repo.expect_update_quantity()
            .with(eq(id), eq(5))
            .returning(move |_, q| {
                let mut p = stored("WID-001", 0);
                p.id = id;
                p.quantity = q;
                Ok(Some(p))
            });

        let service = ProductService::new(repo);
        let product = service
            .update_quantity(&id.to_string(), UpdateQuantity { quantity: json!(5) })
            .await
            .unwrap();
        assert_eq!(product.quantity, 5);
    }

    #[tokio::test]
    async fn update_quantity_rejects_float_before_storage() {
        // No expectations: the repository must never be reached.
        let repo = MockProductRepository::new();
        let service = ProductService::new(repo);

        let err = service
            .update_quantity(
                &Uuid::now_v7().to_string(),
                UpdateQuantity {
                    quantity: json!(5.5),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProductError::InvalidQuantity));
    }

    #[tokio::test]
    async fn update_quantity_rejects_numeric_string() {
        let repo = MockProductRepository::new();
        let service = ProductService::new(repo);

        let err = service
            .update_quantity(
                &Uuid::now_v7().to_string(),
                UpdateQuantity {
                    quantity: json!("5"),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProductError::InvalidQuantity));
    }

    #[tokio::test]
    async fn update_quantity_unknown_id_is_not_found() {
        let mut repo = MockProductRepository::new();
        repo.expect_update_quantity().returning(|_, _| Ok(None));

        let service = ProductService::new(repo);
        let err = service
            .update_quantity(
                &Uuid::now_v7().to_string(),
                UpdateQuantity { quantity: json!(5) },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProductError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_quantity_malformed_id_is_not_found() {
        // A path id the store cannot parse takes the not-found path, not a
        // validation error, so the repository is never consulted.
        let repo = MockProductRepository::new();
        let service = ProductService::new(repo);

        let err = service
            .update_quantity("not-a-uuid", UpdateQuantity { quantity: json!(5) })
            .await
            .unwrap_err();
        assert!(matches!(err, ProductError::NotFound(id) if id == "not-a-uuid"));
    }
}
