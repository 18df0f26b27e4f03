use std::collections::BTreeMap;

use chrono::Utc;
use tokio::sync::RwLock;

use shelf_core::domain::product::{Product, ProductId};

use super::{ProductRepository, RepositoryError};

#[derive(Default)]
struct ProductTable {
    last_id: i64,
    rows: BTreeMap<ProductId, Product>,
}

impl ProductTable {
    fn next_id(&mut self) -> Result<ProductId, RepositoryError> {
        self.last_id =
            self.last_id.checked_add(1).ok_or(RepositoryError::IdsExhausted(self.last_id))?;
        Ok(ProductId(self.last_id))
    }
}

/// Process-local gateway with the same contract as the SQLite one. Ids are handed out
/// from a monotonic counter and never reused, mirroring AUTOINCREMENT.
#[derive(Default)]
pub struct InMemoryProductRepository {
    table: RwLock<ProductTable>,
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let table = self.table.read().await;
        Ok(table.rows.values().cloned().collect())
    }

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let table = self.table.read().await;
        Ok(table.rows.get(&id).cloned())
    }

    async fn exists_by_id(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let table = self.table.read().await;
        Ok(table.rows.contains_key(&id))
    }

    async fn save(&self, mut product: Product) -> Result<Product, RepositoryError> {
        let mut table = self.table.write().await;

        let id = match product.id {
            Some(id) => id,
            None => table.next_id()?,
        };
        table.last_id = table.last_id.max(id.0);
        product.id = Some(id);

        match table.rows.get(&id) {
            Some(existing) => product.created_at = existing.created_at,
            None => product.prepare_for_insert(Utc::now().date_naive()),
        }

        table.rows.insert(id, product.clone());
        Ok(product)
    }

    async fn update(
        &self,
        id: ProductId,
        product: Product,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut table = self.table.write().await;
        let Some(existing) = table.rows.get_mut(&id) else {
            return Ok(None);
        };

        existing.name = product.name;
        existing.price = product.price;
        existing.description = product.description;
        Ok(Some(existing.clone()))
    }

    async fn delete_by_id(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let mut table = self.table.write().await;
        Ok(table.rows.remove(&id).is_some())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Product>, RepositoryError> {
        let table = self.table.read().await;
        Ok(table.rows.values().find(|product| product.name.as_deref() == Some(name)).cloned())
    }

    async fn find_by_description_containing(
        &self,
        fragment: &str,
    ) -> Result<Vec<Product>, RepositoryError> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .filter(|product| {
                product.description.as_deref().is_some_and(|text| text.contains(fragment))
            })
            .cloned()
            .collect())
    }
}
