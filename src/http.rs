//! HTTP transport for the catalog. Uses axum for routing.
//!
//! ## Routes
//!
//! - `GET /api/products?page&limit&title` : paginated listing
//! - `GET /api/products/:id` : single product
//! - `POST /api/products` : multipart create (`images` file fields)
//! - `PUT /api/products/:id` : multipart update
//! - `DELETE /api/products/:id` : delete, 204 even when absent
//! - `GET /assets/:filename` : stored image bytes
//! - `GET /health` : `{ "ok": true, "products": n }`
//!
//! Products on the wire carry image locators, not stored filenames.

use crate::asset::RawAsset;
use crate::catalog::{CatalogService, ProductFields};
use crate::error::ApiError;
use crate::store::{ListQuery, Product};
use crate::types::ProductId;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Room for form fields and multipart framing on top of file bytes
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Product as rendered to clients
#[derive(Debug, Serialize)]
pub struct ProductView {
    pub id: ProductId,
    pub title: String,
    pub description: String,
    pub status: String,
    pub price: f64,
    pub images: Vec<String>,
}

impl ProductView {
    fn render(product: Product, service: &CatalogService) -> Self {
        Self {
            images: product
                .images
                .iter()
                .map(|f| service.asset_url(f))
                .collect(),
            id: product.id,
            title: product.title,
            description: product.description,
            status: product.status,
            price: product.price,
        }
    }
}

/// Listing response body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
    pub products: Vec<ProductView>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else {
            debug!(error = %self, status = status.as_u16(), "Request rejected");
        }
        (status, Json(json!({ "message": self.public_message() }))).into_response()
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::Validation(format!("expected multipart form data: {}", rejection.body_text()))
    }
}

/// Build an axum `Router` serving the catalog.
pub fn router(service: Arc<CatalogService>) -> Router {
    let limits = service.validator().limits();
    let body_limit = limits
        .max_files
        .saturating_mul(limits.max_file_bytes)
        .saturating_add(FORM_OVERHEAD_BYTES);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/products", get(list_handler).post(create_handler))
        .route(
            "/api/products/:id",
            get(get_handler).put(update_handler).delete(delete_handler),
        )
        .route("/assets/:filename", get(asset_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(service)
}

/// Serve the catalog at `addr` until `shutdown` resolves.
pub async fn serve<F>(
    service: Arc<CatalogService>,
    addr: &str,
    shutdown: F,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(service);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Catalog server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

/// Run a synchronous catalog operation off the async executor.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::from(std::io::Error::other(e.to_string())))?
}

/// Path ids that are not positive integers address no product.
fn parse_id(raw: &str) -> Option<ProductId> {
    raw.trim().parse::<ProductId>().ok().filter(|id| *id > 0)
}

/// `GET /health`
async fn health_handler(State(service): State<Arc<CatalogService>>) -> impl IntoResponse {
    Json(json!({ "ok": true, "products": service.store().len() }))
}

/// `GET /api/products`
async fn list_handler(
    State(service): State<Arc<CatalogService>>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let query = ListQuery::from_raw(
        params.get("page").map(String::as_str),
        params.get("limit").map(String::as_str),
        params.get("title").map(String::as_str),
    );
    let (info, products) = service
        .list(&query)
        .map(|p| ProductView::render(p, &service));
    Json(ListResponse {
        page: info.page,
        limit: info.limit,
        total: info.total,
        total_pages: info.total_pages,
        products,
    })
}

/// `GET /api/products/:id`
async fn get_handler(
    State(service): State<Arc<CatalogService>>,
    Path(id): Path<String>,
) -> Result<Json<ProductView>, ApiError> {
    let id = parse_id(&id).ok_or(ApiError::NotFound(0))?;
    let product = service.get(id).ok_or(ApiError::NotFound(id))?;
    Ok(Json(ProductView::render(product, &service)))
}

/// `POST /api/products`
async fn create_handler(
    State(service): State<Arc<CatalogService>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let (fields, files) = read_form(multipart?, service.validator().limits().max_files).await?;
    let svc = Arc::clone(&service);
    let product = blocking(move || svc.create(fields, files)).await?;
    Ok((
        StatusCode::CREATED,
        Json(ProductView::render(product, &service)),
    ))
}

/// `PUT /api/products/:id`
async fn update_handler(
    State(service): State<Arc<CatalogService>>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ProductView>, ApiError> {
    let id = parse_id(&id).ok_or(ApiError::NotFound(0))?;
    let (fields, files) = read_form(multipart?, service.validator().limits().max_files).await?;
    let svc = Arc::clone(&service);
    let product = blocking(move || svc.update(id, fields, files)).await?;
    Ok(Json(ProductView::render(product, &service)))
}

/// `DELETE /api/products/:id`
async fn delete_handler(
    State(service): State<Arc<CatalogService>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if let Some(id) = parse_id(&id) {
        blocking(move || service.delete(id)).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /assets/:filename`
async fn asset_handler(
    State(service): State<Arc<CatalogService>>,
    Path(filename): Path<String>,
) -> Response {
    let lookup = blocking(move || match service.load_asset(&filename) {
        Err(ApiError::InvalidAsset { .. }) => Ok(None),
        other => other,
    })
    .await;

    match lookup {
        Ok(Some((bytes, kind))) => {
            let content_type = kind
                .map(|k| k.content_type())
                .unwrap_or("application/octet-stream");
            ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Asset not found" })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Collect product fields and `images` uploads from a multipart body.
async fn read_form(
    mut multipart: Multipart,
    max_files: usize,
) -> Result<(ProductFields, Vec<RawAsset>), ApiError> {
    let malformed = |e: axum::extract::multipart::MultipartError| {
        ApiError::Validation(format!("malformed form data: {}", e.body_text()))
    };

    let mut fields = ProductFields::default();
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "images" => {
                let declared = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(malformed)?;
                // Browsers send an empty part when no file was picked
                if declared.is_empty() && bytes.is_empty() {
                    continue;
                }
                if files.len() == max_files {
                    return Err(ApiError::invalid_asset(
                        "images",
                        format!("at most {} files per request", max_files),
                    ));
                }
                files.push(RawAsset::new(declared, bytes.to_vec()));
            }
            "title" => fields.title = Some(field.text().await.map_err(malformed)?),
            "description" => fields.description = Some(field.text().await.map_err(malformed)?),
            "status" => fields.status = Some(field.text().await.map_err(malformed)?),
            "price" => fields.price = Some(field.text().await.map_err(malformed)?),
            other => debug!(field = other, "Ignoring unknown form field"),
        }
    }

    Ok((fields, files))
}
