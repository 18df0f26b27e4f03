//! `GET /health`: readiness of the catalog store.
//!
//! Ready means the schema is fully migrated and the `products` table answers a count.
//! Anything else is reported as degraded with a 503 so load balancers stop routing here.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use shelf_db::{migrations, DbPool};
use tracing::warn;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    Ready,
    Degraded,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SchemaStatus {
    pub applied: Option<i64>,
    pub known: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CatalogHealth {
    pub status: Readiness,
    pub schema: SchemaStatus,
    pub product_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<CatalogHealth>) {
    let report = inspect_catalog(&state.db_pool).await;

    if let Some(problem) = &report.problem {
        warn!(
            event_name = "system.health.degraded",
            correlation_id = "health",
            problem = %problem,
            "catalog store is not ready"
        );
    }

    let status_code = match report.status {
        Readiness::Ready => StatusCode::OK,
        Readiness::Degraded => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(report))
}

async fn inspect_catalog(pool: &DbPool) -> CatalogHealth {
    let schema = SchemaStatus {
        applied: migrations::applied_count(pool).await,
        known: migrations::MIGRATOR.iter().count() as i64,
    };

    let (product_count, problem) = match schema.applied {
        None => (None, Some("migration history unavailable".to_string())),
        Some(applied) if applied < schema.known => {
            (None, Some(format!("{applied} of {} migration(s) applied", schema.known)))
        }
        Some(_) => match sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products")
            .fetch_one(pool)
            .await
        {
            Ok(count) => (Some(count), None),
            Err(error) => (None, Some(format!("products table unreadable: {error}"))),
        },
    };

    CatalogHealth {
        status: if problem.is_none() { Readiness::Ready } else { Readiness::Degraded },
        schema,
        product_count,
        problem,
        checked_at: Utc::now().to_rfc3339(),
    }
}
