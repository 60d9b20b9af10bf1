//! HTTP API for the Price Estimator.
//!
//! This module exposes the estimator over a minimal REST API using the
//! [`axum`](https://crates.io/crates/axum) framework.  Clients either
//! send the service snapshot inline with the intent, or price against
//! a snapshot held in the shared [`CatalogStore`].  Request bodies use
//! the loose widget/backend shapes and are normalised by
//! [`crate::adapter`] before estimation.

use crate::adapter::{self, AdapterError};
use crate::catalog::CatalogStore;
use crate::engine::{estimate, estimate_batch};
use crate::models::{BookingIntent, PriceBreakdown, ServiceCatalog};
use anyhow::Result;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Application state shared across requests.
pub struct AppState {
    pub catalogs: RwLock<CatalogStore>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unknown service {0}")]
    UnknownService(String),
    #[error(transparent)]
    Body(#[from] JsonRejection),
    #[error("invalid request body: {0}")]
    InvalidBody(&'static str),
    #[error(transparent)]
    Payload(#[from] AdapterError),
    #[error("estimation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::UnknownService(_) => StatusCode::NOT_FOUND,
            ApiError::Body(ref rejection) => rejection.status(),
            ApiError::InvalidBody(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Payload(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// JSON body extractor whose rejections render as [`ApiError`].
type JsonBody = Result<Json<Value>, JsonRejection>;

/// Take `key` out of a request body object; `null` when absent.
fn take_field(body: &mut Value, key: &str) -> Value {
    body.get_mut(key).map(Value::take).unwrap_or(Value::Null)
}

/// Build the API router around an existing state handle.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/estimate", post(estimate_handler))
        .route("/api/estimate/batch", post(batch_handler))
        .route("/api/services/:service_id/estimate", post(service_estimate_handler))
        .route("/api/services/:service_id/catalog", put(replace_catalog_handler))
        .with_state(state)
}

/// Build the API router and seed catalog snapshots from the given
/// directory.  Returns the router and a handle to the state.
pub fn build_router(catalog_dir: PathBuf) -> Result<(Router, Arc<AppState>)> {
    let store = CatalogStore::load_from_dir(&catalog_dir)?;
    let state = Arc::new(AppState {
        catalogs: RwLock::new(store),
    });
    Ok((router(state.clone()), state))
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Handler for POST /api/estimate, body `{ intent, service }`
async fn estimate_handler(body: JsonBody) -> Result<Json<PriceBreakdown>, ApiError> {
    let Json(mut body) = body?;
    let intent: BookingIntent = adapter::intent_from_value(take_field(&mut body, "intent"))?;
    let catalog: ServiceCatalog = adapter::catalog_from_value(take_field(&mut body, "service"))?;
    Ok(Json(estimate(&intent, &catalog)))
}

/// Handler for POST /api/estimate/batch, body `{ intents: [...], service }`
async fn batch_handler(body: JsonBody) -> Result<Json<Vec<PriceBreakdown>>, ApiError> {
    let Json(mut body) = body?;
    let Value::Array(raw_intents) = take_field(&mut body, "intents") else {
        return Err(ApiError::InvalidBody("`intents` must be an array"));
    };
    let catalog: ServiceCatalog = adapter::catalog_from_value(take_field(&mut body, "service"))?;
    let intents = raw_intents
        .into_iter()
        .map(adapter::intent_from_value)
        .collect::<Result<Vec<BookingIntent>, AdapterError>>()?;
    debug!(count = intents.len(), "batch estimate");
    // CPU-bound; keep it off the async executor threads.
    let results = tokio::task::spawn_blocking(move || estimate_batch(&intents, &catalog)).await?;
    Ok(Json(results))
}

/// Handler for POST /api/services/{service_id}/estimate
async fn service_estimate_handler(
    State(app_state): State<Arc<AppState>>,
    Path(service_id): Path<String>,
    body: JsonBody,
) -> Result<Json<PriceBreakdown>, ApiError> {
    let Json(intent) = body?;
    let intent = adapter::intent_from_value(intent)?;
    let catalogs = app_state.catalogs.read().await;
    let catalog = catalogs
        .get(&service_id)
        .ok_or_else(|| ApiError::UnknownService(service_id.clone()))?;
    Ok(Json(estimate(&intent, catalog)))
}

/// Handler for PUT /api/services/{service_id}/catalog
async fn replace_catalog_handler(
    State(app_state): State<Arc<AppState>>,
    Path(service_id): Path<String>,
    body: JsonBody,
) -> Result<StatusCode, ApiError> {
    let Json(service) = body?;
    let catalog = adapter::catalog_from_value(service)?;
    debug!(%service_id, tiers = catalog.ticket_tiers.len(), "replacing catalog snapshot");
    app_state.catalogs.write().await.insert(service_id, catalog);
    Ok(StatusCode::NO_CONTENT)
}

/// Launch the API server.  This function builds the router from the
/// given catalog directory and binds to the supplied address.  It
/// blocks until the server terminates (e.g. when interrupted).
pub async fn serve(addr: SocketAddr, catalog_dir: PathBuf) -> Result<()> {
    let (router, _state) = build_router(catalog_dir)?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "server listening");
    axum::serve(listener, router).await?;
    Ok(())
}
