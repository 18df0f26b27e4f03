//! Product catalog routes, nested under the configured API prefix.
//!
//! - `GET    /`: list every product
//! - `POST   /`: create a product, responds with the persisted record
//! - `GET    /search?q=`: products whose description contains `q`
//! - `GET    /by-name/{name}`: first product with exactly this name
//! - `GET    /{id}`: fetch one product
//! - `PUT    /{id}`: overwrite name, price and description of a product
//! - `DELETE /{id}`: remove a product
//!
//! Absent records answer 404 with an empty body.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use shelf_core::domain::product::{Product, ProductId};
use shelf_core::errors::{ApplicationError, InterfaceError};
use tracing::{error, info};

use crate::request_id::RequestId;
use crate::service::ProductService;

#[derive(Clone)]
pub struct ProductState {
    service: ProductService,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub correlation_id: String,
}

#[derive(Debug)]
pub enum ApiError {
    NotFound,
    Interface(InterfaceError),
}

impl ApiError {
    fn from_application(error: ApplicationError, request_id: &RequestId) -> Self {
        error!(
            event_name = "product.request_failed",
            correlation_id = %request_id,
            error = %error,
            "product request failed"
        );
        Self::Interface(error.into_interface(request_id.0.clone()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND.into_response(),
            Self::Interface(interface) => {
                let status = match interface {
                    InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
                    InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                };
                let body = ErrorBody {
                    error: interface.user_message(),
                    correlation_id: interface.correlation_id().to_string(),
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

pub fn router(service: ProductService) -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/search", get(search_products))
        .route("/by-name/{name}", get(get_product_by_name))
        .route("/{id}", get(get_product).put(update_product).delete(delete_product))
        .with_state(ProductState { service })
}

async fn list_products(
    State(state): State<ProductState>,
    request_id: RequestId,
) -> Result<Json<Vec<Product>>, ApiError> {
    let products = state
        .service
        .get_products()
        .await
        .map_err(|error| ApiError::from_application(error, &request_id))?;
    Ok(Json(products))
}

async fn create_product(
    State(state): State<ProductState>,
    request_id: RequestId,
    Json(product): Json<Product>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let saved = state
        .service
        .save_product(product)
        .await
        .map_err(|error| ApiError::from_application(error, &request_id))?;

    info!(
        event_name = "product.created",
        correlation_id = %request_id,
        product_id = ?saved.id,
        "product created"
    );
    Ok((StatusCode::CREATED, Json(saved)))
}

async fn get_product(
    State(state): State<ProductState>,
    request_id: RequestId,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>, ApiError> {
    state
        .service
        .get_product(id)
        .await
        .map_err(|error| ApiError::from_application(error, &request_id))?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

async fn update_product(
    State(state): State<ProductState>,
    request_id: RequestId,
    Path(id): Path<ProductId>,
    Json(product): Json<Product>,
) -> Result<Json<Product>, ApiError> {
    state
        .service
        .update_product(id, product)
        .await
        .map_err(|error| ApiError::from_application(error, &request_id))?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

async fn delete_product(
    State(state): State<ProductState>,
    request_id: RequestId,
    Path(id): Path<ProductId>,
) -> Result<StatusCode, ApiError> {
    let deleted = state
        .service
        .delete_product(id)
        .await
        .map_err(|error| ApiError::from_application(error, &request_id))?;

    if deleted {
        info!(
            event_name = "product.deleted",
            correlation_id = %request_id,
            product_id = %id,
            "product deleted"
        );
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

async fn get_product_by_name(
    State(state): State<ProductState>,
    request_id: RequestId,
    Path(name): Path<String>,
) -> Result<Json<Product>, ApiError> {
    state
        .service
        .find_product_by_name(&name)
        .await
        .map_err(|error| ApiError::from_application(error, &request_id))?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

async fn search_products(
    State(state): State<ProductState>,
    request_id: RequestId,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let products = state
        .service
        .search_products(&query.q)
        .await
        .map_err(|error| ApiError::from_application(error, &request_id))?;
    Ok(Json(products))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        middleware, Router,
    };
    use chrono::Utc;
    use serde_json::{json, Value};
    use shelf_core::domain::product::{Product, ProductId};
    use shelf_db::{
        connect_with_settings, InMemoryProductRepository, ProductRepository, SqlProductRepository,
    };
    use tower::ServiceExt;

    use super::router;
    use crate::request_id::{assign_request_id, REQUEST_ID_HEADER};
    use crate::service::{tests::UnavailableRepository, ProductService};

    const PREFIX: &str = "/api/productos";

    fn app(repository: Arc<dyn ProductRepository>) -> Router {
        Router::new()
            .nest(PREFIX, router(ProductService::new(repository)))
            .layer(middleware::from_fn(assign_request_id))
    }

    fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder().method(method).uri(uri);
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        }
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, body.to_vec())
    }

    fn json_body(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).expect("json body")
    }

    #[tokio::test]
    async fn list_on_empty_store_returns_empty_array() {
        let app = app(Arc::new(InMemoryProductRepository::default()));

        let (status, body) = send(&app, request(Method::GET, PREFIX, None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body), json!([]));
    }

    #[tokio::test]
    async fn create_returns_persisted_record_and_is_readable() {
        let app = app(Arc::new(InMemoryProductRepository::default()));
        let payload = json!({ "name": "Widget", "price": 9.99, "description": "basic" });

        let (status, body) = send(&app, request(Method::POST, PREFIX, Some(payload))).await;
        assert_eq!(status, StatusCode::CREATED);
        let created = json_body(&body);
        let id = created["id"].as_i64().expect("generated id");
        assert_eq!(created["createdAt"], Utc::now().date_naive().format("%Y-%m-%d").to_string());

        let (status, body) = send(&app, request(Method::GET, &format!("{PREFIX}/{id}"), None)).await;
        let fetched = json_body(&body);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["name"], "Widget");
        assert_eq!(fetched["price"], 9.99);
        assert!(!fetched["createdAt"].is_null());
    }

    #[tokio::test]
    async fn create_accepts_payload_without_required_fields() {
        let app = app(Arc::new(InMemoryProductRepository::default()));

        let (status, body) = send(&app, request(Method::POST, PREFIX, Some(json!({})))).await;

        assert_eq!(status, StatusCode::CREATED);
        let created = json_body(&body);
        assert!(created["name"].is_null());
        assert_eq!(created["price"], 0.0);
    }

    #[tokio::test]
    async fn create_treats_null_price_as_zero() {
        let app = app(Arc::new(InMemoryProductRepository::default()));
        let payload = json!({ "name": "Widget", "price": null, "description": "basic" });

        let (status, body) = send(&app, request(Method::POST, PREFIX, Some(payload))).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json_body(&body)["price"], 0.0);
    }

    #[tokio::test]
    async fn create_stamps_today_over_client_created_at() {
        let app = app(Arc::new(InMemoryProductRepository::default()));
        let payload = json!({ "name": "Widget", "price": 1.0, "createdAt": "2000-01-01" });

        let (status, body) = send(&app, request(Method::POST, PREFIX, Some(payload))).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(
            json_body(&body)["createdAt"],
            Utc::now().date_naive().format("%Y-%m-%d").to_string()
        );
    }

    #[tokio::test]
    async fn get_unknown_id_returns_404_with_empty_body() {
        let app = app(Arc::new(InMemoryProductRepository::default()));

        let (status, body) = send(&app, request(Method::GET, &format!("{PREFIX}/999999"), None)).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn delete_existing_then_get_returns_404() {
        let repository = Arc::new(InMemoryProductRepository::default());
        repository
            .save(Product::new("Widget", 9.99, "basic").with_id(ProductId(5)))
            .await
            .expect("seed product 5");
        let app = app(repository);

        let (status, body) = send(&app, request(Method::DELETE, &format!("{PREFIX}/5"), None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_empty());

        let (status, _) = send(&app, request(Method::GET, &format!("{PREFIX}/5"), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_unknown_id_returns_404() {
        let app = app(Arc::new(InMemoryProductRepository::default()));

        let (status, body) = send(&app, request(Method::DELETE, &format!("{PREFIX}/5"), None)).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn put_updates_existing_product_and_404s_otherwise() {
        let repository = Arc::new(InMemoryProductRepository::default());
        let saved = repository.save(Product::new("Widget", 9.99, "basic")).await.expect("seed");
        let id = saved.id.expect("id");
        let app = app(repository);

        let payload = json!({ "name": "Widget", "price": 12.5, "description": "repriced" });
        let (status, body) =
            send(&app, request(Method::PUT, &format!("{PREFIX}/{id}"), Some(payload.clone()))).await;
        assert_eq!(status, StatusCode::OK);
        let updated = json_body(&body);
        assert_eq!(updated["id"], id.0);
        assert_eq!(updated["price"], 12.5);

        let (status, body) =
            send(&app, request(Method::PUT, &format!("{PREFIX}/4040"), Some(payload))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn lookup_routes_use_name_and_description_queries() {
        let repository = Arc::new(InMemoryProductRepository::default());
        repository.save(Product::new("Widget", 9.99, "steel widget")).await.expect("seed");
        repository.save(Product::new("Gadget", 4.0, "plastic gadget")).await.expect("seed");
        let app = app(repository);

        let (status, body) =
            send(&app, request(Method::GET, &format!("{PREFIX}/by-name/Gadget"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body)["name"], "Gadget");

        let (status, _) =
            send(&app, request(Method::GET, &format!("{PREFIX}/by-name/Sprocket"), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) =
            send(&app, request(Method::GET, &format!("{PREFIX}/search?q=steel"), None)).await;
        assert_eq!(status, StatusCode::OK);
        let matches = json_body(&body);
        assert_eq!(matches.as_array().map(Vec::len), Some(1));
        assert_eq!(matches[0]["name"], "Widget");
    }

    #[tokio::test]
    async fn malformed_json_is_rejected_by_extractor() {
        let app = app(Arc::new(InMemoryProductRepository::default()));
        let request = Request::builder()
            .method(Method::POST)
            .uri(PREFIX)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .expect("request");

        let (status, _) = send(&app, request).await;

        assert!(status.is_client_error());
    }

    #[tokio::test]
    async fn storage_failure_maps_to_503_with_correlation_id() {
        let app = app(Arc::new(UnavailableRepository));
        let request = Request::builder()
            .uri(PREFIX)
            .header(REQUEST_ID_HEADER, "req-503")
            .body(Body::empty())
            .expect("request");

        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(&body);
        assert_eq!(body["correlation_id"], "req-503");
        assert_eq!(body["error"], "The service is temporarily unavailable. Please retry shortly.");
    }

    #[tokio::test]
    async fn missing_schema_maps_to_500_with_correlation_id() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        let app = app(Arc::new(SqlProductRepository::new(pool.clone())));
        let request = Request::builder()
            .uri(PREFIX)
            .header(REQUEST_ID_HEADER, "req-500")
            .body(Body::empty())
            .expect("request");

        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(&body);
        assert_eq!(body["correlation_id"], "req-500");
        assert_eq!(body["error"], "An unexpected internal error occurred.");

        pool.close().await;
    }
}
