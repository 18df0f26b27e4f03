use std::sync::Arc;

use shelf_core::domain::product::{Product, ProductId};
use shelf_core::errors::ApplicationError;
use shelf_db::ProductRepository;
use tracing::info;

/// Orchestrates catalog operations over an injected [`ProductRepository`].
///
/// Update and delete rely on the gateway's conditional statements, so "the record
/// existed" and "the record was changed" are decided by a single storage call.
#[derive(Clone)]
pub struct ProductService {
    repository: Arc<dyn ProductRepository>,
}

impl ProductService {
    pub fn new(repository: Arc<dyn ProductRepository>) -> Self {
        Self { repository }
    }

    pub async fn get_products(&self) -> Result<Vec<Product>, ApplicationError> {
        Ok(self.repository.find_all().await?)
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Option<Product>, ApplicationError> {
        Ok(self.repository.find_by_id(id).await?)
    }

    pub async fn save_product(&self, product: Product) -> Result<Product, ApplicationError> {
        let saved = self.repository.save(product).await?;
        info!(
            event_name = "product.saved",
            product_id = ?saved.id,
            "product persisted"
        );
        Ok(saved)
    }

    pub async fn update_product(
        &self,
        id: ProductId,
        product: Product,
    ) -> Result<Option<Product>, ApplicationError> {
        let updated = self.repository.update(id, product.with_id(id)).await?;
        info!(
            event_name = "product.update_attempted",
            product_id = %id,
            matched = updated.is_some(),
            "product update processed"
        );
        Ok(updated)
    }

    pub async fn delete_product(&self, id: ProductId) -> Result<bool, ApplicationError> {
        let deleted = self.repository.delete_by_id(id).await?;
        info!(
            event_name = "product.delete_attempted",
            product_id = %id,
            deleted,
            "product delete processed"
        );
        Ok(deleted)
    }

    pub async fn find_product_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Product>, ApplicationError> {
        Ok(self.repository.find_by_name(name).await?)
    }

    pub async fn search_products(&self, fragment: &str) -> Result<Vec<Product>, ApplicationError> {
        Ok(self.repository.find_by_description_containing(fragment).await?)
    }
}
