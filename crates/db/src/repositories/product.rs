use chrono::{NaiveDate, Utc};
use sqlx::Row;

use shelf_core::domain::product::{Product, ProductId, DATE_FORMAT};

use super::{ProductRepository, RepositoryError};
use crate::DbPool;

const PRODUCT_COLUMNS: &str = "id, name, price, description, created_at";

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, mut product: Product) -> Result<Product, RepositoryError> {
        product.prepare_for_insert(Utc::now().date_naive());
        let created_at = product.created_at.map(format_date);

        let row = sqlx::query(&format!(
            "INSERT INTO products (name, price, description, created_at)
             VALUES (?, ?, ?, ?)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&product.name)
        .bind(product.price)
        .bind(&product.description)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;

        row_to_product(&row)
    }

    async fn upsert(&self, id: ProductId, mut product: Product) -> Result<Product, RepositoryError> {
        // Only used when the row is missing; the conflict branch keeps the stored date.
        product.prepare_for_insert(Utc::now().date_naive());
        let created_at = product.created_at.map(format_date);

        let row = sqlx::query(&format!(
            "INSERT INTO products (id, name, price, description, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 price = excluded.price,
                 description = excluded.description
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id.0)
        .bind(&product.name)
        .bind(product.price)
        .bind(&product.description)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;

        row_to_product(&row)
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: Option<String> =
        row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let price: f64 = row.try_get("price").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let description: Option<String> =
        row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let created_at = NaiveDate::parse_from_str(&created_at_str, DATE_FORMAT).map_err(|e| {
        RepositoryError::Decode(format!("product {id} has invalid created_at `{created_at_str}`: {e}"))
    })?;

    Ok(Product {
        id: Some(ProductId(id)),
        name,
        price,
        description,
        created_at: Some(created_at),
    })
}

#[async_trait::async_trait]
impl ProductRepository for SqlProductRepository {
    async fn find_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> =
            sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id"))
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(row_to_product).collect::<Result<Vec<_>, _>>()
    }

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn exists_by_id(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let found: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE id = ?)")
                .bind(id.0)
                .fetch_one(&self.pool)
                .await?;

        Ok(found != 0)
    }

    async fn save(&self, product: Product) -> Result<Product, RepositoryError> {
        match product.id {
            None => self.insert(product).await,
            Some(id) => self.upsert(id, product).await,
        }
    }

    async fn update(
        &self,
        id: ProductId,
        product: Product,
    ) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(&format!(
            "UPDATE products
             SET name = ?, price = ?, description = ?
             WHERE id = ?
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&product.name)
        .bind(product.price)
        .bind(&product.description)
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn delete_by_id(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE name = ? ORDER BY id LIMIT 1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn find_by_description_containing(
        &self,
        fragment: &str,
    ) -> Result<Vec<Product>, RepositoryError> {
        // instr() is case-sensitive and has no wildcard characters, unlike LIKE.
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE description IS NOT NULL AND instr(description, ?) > 0
             ORDER BY id"
        ))
        .bind(fragment)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_product).collect::<Result<Vec<_>, _>>()
    }
}
