//! HTTP surface: router, request handling, and error-to-status mapping.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::entity_list::{self, EntityListError};
use crate::extract::extract_frequencies;
use crate::models::ModelCatalog;
use crate::schema::{ExtractRequest, ResultDocument};

pub const SERVICE_NAME: &str = "biolex-extractor";

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<ModelCatalog>,
    pub http: reqwest::Client,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct ServiceInfo {
    service: &'static str,
    version: &'static str,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/extractor", post(extractor))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    "ok"
}

async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn extractor(
    State(state): State<AppState>,
    payload: Result<Json<ExtractRequest>, JsonRejection>,
) -> Result<Json<ResultDocument>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::Validation(rejection.body_text()))?;

    let model = state.catalog.get(request.language).map_err(|e| {
        error!("loading model for {} failed: {e:#}", request.language);
        ApiError::Internal
    })?;

    let resolved = entity_list::resolve(request.entity_list, request.language);
    let document = entity_list::load(&state.http, resolved).await?;

    let result = extract_frequencies(&request.segments, document, |text| model.annotate(text));
    Ok(Json(result))
}

/// Request-level failures, one variant per taxonomy entry.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Retrieval(String),
    #[error("{0}")]
    Schema(String),
    #[error("internal server error")]
    Internal,
}

impl From<EntityListError> for ApiError {
    fn from(err: EntityListError) -> Self {
        match err {
            EntityListError::Retrieval { .. } => ApiError::Retrieval(err.to_string()),
            EntityListError::Schema(_) => ApiError::Schema(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Retrieval(_) => StatusCode::BAD_GATEWAY,
            ApiError::Schema(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}
