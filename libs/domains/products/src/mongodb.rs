//! MongoDB implementation of ProductRepository

use async_trait::async_trait;
use mongodb::{
    Collection, Database, IndexModel,
    bson::{Bson, doc, to_bson},
    options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument},
};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{ProductError, ProductResult};
use crate::models::{CreateProduct, Pagination, Product};
use crate::repository::ProductRepository;

/// MongoDB server error code for a unique index violation
const DUPLICATE_KEY: i32 = 11000;

/// MongoDB implementation of the ProductRepository
pub struct MongoProductRepository {
    collection: Collection<Product>,
}

impl MongoProductRepository {
    /// Create a new MongoProductRepository
    pub fn new(db: &Database) -> Self {
        let collection = db.collection::<Product>("products");
        Self { collection }
    }

    /// Create a new MongoProductRepository with a custom collection name
    pub fn with_collection(db: &Database, collection_name: &str) -> Self {
        let collection = db.collection::<Product>(collection_name);
        Self { collection }
    }

    /// Create the indexes this repository relies on.
    ///
    /// The unique `sku` index is the authoritative guard against two
    /// concurrent creates racing past the existence check; the
    /// `(created_at, _id)` index backs the deterministic list ordering.
    pub async fn ensure_indexes(&self) -> ProductResult<()> {
        let indexes = vec![
            IndexModel::builder()
                .keys(doc! { "sku": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .name("idx_sku_unique".to_string())
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "created_at": 1, "_id": 1 })
                .options(
                    IndexOptions::builder()
                        .name("idx_created_order".to_string())
                        .build(),
                )
                .build(),
        ];

        self.collection.create_indexes(indexes).await?;
        tracing::info!("Product indexes created successfully");
        Ok(())
    }

    /// Get the underlying collection for advanced operations
    pub fn collection(&self) -> &Collection<Product> {
        &self.collection
    }
}

/// Whether a MongoDB error is a unique index violation
fn is_duplicate_key_error(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};

    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY
        }
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY,
        _ => false,
    }
}

#[async_trait]
impl ProductRepository for MongoProductRepository {
    #[instrument(skip(self, input), fields(sku = %input.sku))]
    async fn create(&self, input: CreateProduct) -> ProductResult<Product> {
        let product = Product::new(input);

        self.collection.insert_one(&product).await.map_err(|e| {
            if is_duplicate_key_error(&e) {
                ProductError::DuplicateSku(product.sku.clone())
            } else {
                ProductError::from(e)
            }
        })?;

        tracing::info!(product_id = %product.id, "Product created successfully");
        Ok(product)
    }

    #[instrument(skip(self))]
    async fn find_by_sku(&self, sku: &str) -> ProductResult<Option<Product>> {
        let filter = doc! { "sku": sku };
        let product = self.collection.find_one(filter).await?;
        Ok(product)
    }

    #[instrument(skip(self))]
    async fn list(&self, page: Pagination) -> ProductResult<Vec<Product>> {
        use futures_util::TryStreamExt;

        // Creation order keeps page boundaries reproducible; the v7 _id
        // breaks created_at ties in insertion order.
        let options = FindOptions::builder()
            .skip(page.offset())
            .limit(page.limit)
            .sort(doc! { "created_at": 1, "_id": 1 })
            .build();

        let cursor = self.collection.find(doc! {}).with_options(options).await?;
        let products: Vec<Product> = cursor.try_collect().await?;

        Ok(products)
    }

    #[instrument(skip(self))]
    async fn count(&self) -> ProductResult<u64> {
        let count = self.collection.count_documents(doc! {}).await?;
        Ok(count)
    }

    #[instrument(skip(self))]
    async fn update_quantity(&self, id: Uuid, quantity: i64) -> ProductResult<Option<Product>> {
        let filter = doc! { "_id": to_bson(&id).unwrap_or(Bson::Null) };
        let update = doc! {
            "$set": {
                "quantity": quantity,
                "updated_at": to_bson(&chrono::Utc::now()).unwrap_or(Bson::Null),
            }
        };

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let product = self
            .collection
            .find_one_and_update(filter, update)
            .with_options(options)
            .await?;

        if let Some(ref p) = product {
            tracing::info!(product_id = %p.id, quantity, "Product quantity updated");
        }
        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_errors_are_not_duplicate_keys() {
        let err = mongodb::error::Error::custom("boom");
        assert!(!is_duplicate_key_error(&err));
    }

    #[tokio::test]
    #[ignore] // Requires actual MongoDB
    async fn unique_index_rejects_second_sku() {
        let client = mongodb::Client::with_uri_str("mongodb://localhost:27017")
            .await
            .unwrap();
        let db = client.database("domain_products_test");
        let repo = MongoProductRepository::with_collection(&db, "products_unique_sku");
        repo.collection().drop().await.ok();
        repo.ensure_indexes().await.unwrap();

        let input = |sku: &str| CreateProduct {
            name: "Widget".to_string(),
            product_type: "hardware".to_string(),
            sku: sku.to_string(),
            image_url: None,
            description: None,
            quantity: 1,
            price: 9.99,
        };

        repo.create(input("DUP-1")).await.unwrap();
        let err = repo.create(input("DUP-1")).await.unwrap_err();
        assert!(matches!(err, ProductError::DuplicateSku(sku) if sku == "DUP-1"));

        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    #[ignore] // Requires actual MongoDB
    async fn list_pages_follow_creation_order() {
        let client = mongodb::Client::with_uri_str("mongodb://localhost:27017")
            .await
            .unwrap();
        let db = client.database("domain_products_test");
        let repo = MongoProductRepository::with_collection(&db, "products_pagination");
        repo.collection().drop().await.ok();
        repo.ensure_indexes().await.unwrap();

        for i in 0..25 {
            repo.create(CreateProduct {
                name: format!("Product {i}"),
                product_type: "hardware".to_string(),
                sku: format!("SKU-{i:03}"),
                image_url: None,
                description: None,
                quantity: i,
                price: 1.0,
            })
            .await
            .unwrap();
        }

        let page = repo
            .list(Pagination { page: 2, limit: 10 })
            .await
            .unwrap();
        assert_eq!(page.len(), 10);
        assert_eq!(page[0].sku, "SKU-010");
        assert_eq!(page[9].sku, "SKU-019");
        assert_eq!(repo.count().await.unwrap(), 25);
    }
}
