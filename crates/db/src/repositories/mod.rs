use async_trait::async_trait;
use sqlx::error::ErrorKind;
use thiserror::Error;

use shelf_core::domain::product::{Product, ProductId};
use shelf_core::errors::ApplicationError;

pub mod memory;
pub mod product;

pub use memory::InMemoryProductRepository;
pub use product::SqlProductRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("no product id left above {0}")]
    IdsExhausted(i64),
}

impl RepositoryError {
    /// Whether repeating the same call could succeed. Constraint violations, a missing
    /// schema and undecodable rows are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Database(sqlx::Error::Database(error)) => {
                matches!(error.kind(), ErrorKind::Other)
                    && !error.message().contains("no such table")
            }
            Self::Database(_) => true,
            Self::Decode(_) | Self::IdsExhausted(_) => false,
        }
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        if value.is_transient() {
            ApplicationError::Persistence(value.to_string())
        } else {
            ApplicationError::Integrity(value.to_string())
        }
    }
}

/// Storage contract for the product table.
///
/// `save` is an upsert keyed on `product.id`: a product without an id is inserted and
/// receives a generated id plus a creation date, a product with an id overwrites that
/// row (or is inserted under that id). `update` and `delete_by_id` are single
/// conditional statements that report whether a row matched.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Product>, RepositoryError>;

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    async fn exists_by_id(&self, id: ProductId) -> Result<bool, RepositoryError>;

    async fn save(&self, product: Product) -> Result<Product, RepositoryError>;

    async fn update(
        &self,
        id: ProductId,
        product: Product,
    ) -> Result<Option<Product>, RepositoryError>;

    async fn delete_by_id(&self, id: ProductId) -> Result<bool, RepositoryError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Product>, RepositoryError>;

    async fn find_by_description_containing(
        &self,
        fragment: &str,
    ) -> Result<Vec<Product>, RepositoryError>;
}
