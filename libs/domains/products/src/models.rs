use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Default page size when the client sends no (or an unusable) limit
const DEFAULT_LIMIT: i64 = 10;

/// Product entity - represents a product stored in MongoDB
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    /// Unique identifier (stored as _id in MongoDB)
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,
    /// Product name
    pub name: String,
    /// Free-form category label
    #[serde(rename = "type")]
    pub product_type: String,
    /// Stock Keeping Unit - the unique business key
    pub sku: String,
    /// Optional image URL
    pub image_url: Option<String>,
    /// Optional description
    pub description: Option<String>,
    /// Current stock count; may go negative, the API does not police it
    pub quantity: i64,
    /// Unit price; no currency or precision contract
    pub price: f64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// DTO for creating a new product
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProduct {
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(rename = "type")]
    #[validate(length(min = 1))]
    pub product_type: String,
    #[validate(length(min = 1))]
    pub sku: String,
    pub image_url: Option<String>,
    pub description: Option<String>,
    /// Stock count, defaults to 0 when omitted
    #[serde(default)]
    pub quantity: i64,
    pub price: f64,
}

/// DTO for the update-quantity operation.
///
/// `quantity` is accepted as a raw JSON value so the service can reject
/// non-integer payloads (`5.5`, `"5"`) with a domain error instead of a
/// generic deserialization failure.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateQuantity {
    /// New stock count; must be a JSON integer
    #[schema(value_type = i64)]
    pub quantity: serde_json::Value,
}

/// Query parameters for listing products.
///
/// Absent, unparsable, or non-positive values fall back to the defaults
/// (page 1, limit 10) rather than failing the request.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
pub struct ProductListQuery {
    /// 1-based page number (default 1)
    #[serde(default, deserialize_with = "lenient_int")]
    pub page: Option<i64>,
    /// Page size (default 10)
    #[serde(default, deserialize_with = "lenient_int")]
    pub limit: Option<i64>,
}

/// Normalized pagination window derived from [`ProductListQuery`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

/// One page of products plus pagination metadata
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub current_page: i64,
    pub total_pages: i64,
    pub total_products: u64,
}

/// Response payload for a successful create
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductCreated {
    pub msg: String,
    pub product_id: Uuid,
}

/// Response payload for a successful quantity update
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuantityUpdated {
    pub msg: String,
    pub product: Product,
}

/// Deserialize an optional integer query parameter, mapping anything
/// unparsable to `None` instead of a rejection.
fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer).ok().flatten() {
        Some(Raw::Int(n)) => Some(n),
        Some(Raw::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

impl ProductListQuery {
    /// Resolve the raw query into a usable pagination window.
    ///
    /// Non-positive values count as invalid and take the default, so the
    /// offset arithmetic below never sees a zero or negative limit.
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page.filter(|p| *p > 0).unwrap_or(1),
            limit: self.limit.filter(|l| *l > 0).unwrap_or(DEFAULT_LIMIT),
        }
    }
}

impl Pagination {
    /// Number of records to skip
    pub fn offset(&self) -> u64 {
        ((self.page - 1) * self.limit) as u64
    }

    /// Total pages for a given record count (ceiling division)
    pub fn total_pages(&self, total: u64) -> i64 {
        total.div_ceil(self.limit as u64) as i64
    }
}

impl Product {
    /// Create a new product from a CreateProduct DTO
    pub fn new(input: CreateProduct) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: input.name,
            product_type: input.product_type,
            sku: input.sku,
            image_url: input.image_url,
            description: input.description,
            quantity: input.quantity,
            price: input.price,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query(page: Option<i64>, limit: Option<i64>) -> ProductListQuery {
        ProductListQuery { page, limit }
    }

    #[test]
    fn pagination_defaults() {
        let p = query(None, None).pagination();
        assert_eq!(p, Pagination { page: 1, limit: 10 });
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn pagination_computes_offset() {
        let p = query(Some(2), Some(10)).pagination();
        assert_eq!(p.offset(), 10);

        let p = query(Some(3), Some(25)).pagination();
        assert_eq!(p.offset(), 50);
    }

    #[test]
    fn non_positive_values_fall_back_to_defaults() {
        assert_eq!(
            query(Some(0), Some(0)).pagination(),
            Pagination { page: 1, limit: 10 }
        );
        assert_eq!(
            query(Some(-3), Some(-1)).pagination(),
            Pagination { page: 1, limit: 10 }
        );
    }

    #[test]
    fn total_pages_is_ceiling_division() {
        let p = Pagination { page: 1, limit: 10 };
        assert_eq!(p.total_pages(0), 0);
        assert_eq!(p.total_pages(10), 1);
        assert_eq!(p.total_pages(25), 3);
    }

    #[test]
    fn unparsable_query_values_become_none() {
        let q: ProductListQuery =
            serde_json::from_value(json!({ "page": "abc", "limit": "xyz" })).unwrap();
        assert_eq!(q.page, None);
        assert_eq!(q.limit, None);

        let q: ProductListQuery =
            serde_json::from_value(json!({ "page": "2", "limit": "5" })).unwrap();
        assert_eq!(q.pagination(), Pagination { page: 2, limit: 5 });
    }

    #[test]
    fn create_defaults_quantity_to_zero() {
        let input: CreateProduct = serde_json::from_value(json!({
            "name": "Widget",
            "type": "hardware",
            "sku": "WID-001",
            "price": 9.99
        }))
        .unwrap();

        assert_eq!(input.quantity, 0);

        let product = Product::new(input);
        assert_eq!(product.quantity, 0);
        assert_eq!(product.sku, "WID-001");
        assert_eq!(product.created_at, product.updated_at);
    }

    #[test]
    fn create_rejects_blank_required_fields() {
        let input: CreateProduct = serde_json::from_value(json!({
            "name": "",
            "type": "hardware",
            "sku": "WID-001",
            "price": 9.99
        }))
        .unwrap();

        assert!(input.validate().is_err());
    }

    #[test]
    fn product_serializes_type_and_underscore_id() {
        let product = Product::new(
            serde_json::from_value(json!({
                "name": "Widget",
                "type": "hardware",
                "sku": "WID-001",
                "price": 9.99
            }))
            .unwrap(),
        );

        let value = serde_json::to_value(&product).unwrap();
        assert!(value.get("_id").is_some());
        assert_eq!(value["type"], "hardware");
        assert!(value.get("product_type").is_none());
    }

    #[test]
    fn page_payload_uses_camel_case_keys() {
        let page = ProductPage {
            products: vec![],
            current_page: 1,
            total_pages: 0,
            total_products: 0,
        };

        let value = serde_json::to_value(&page).unwrap();
        assert!(value.get("currentPage").is_some());
        assert!(value.get("totalPages").is_some());
        assert!(value.get("totalProducts").is_some());
    }

    #[test]
    fn created_payload_uses_camel_case_product_id() {
        let created = ProductCreated {
            msg: "Product added successfully".to_string(),
            product_id: Uuid::now_v7(),
        };

        let value = serde_json::to_value(&created).unwrap();
        assert!(value.get("productId").is_some());
    }
}
