mod extract;
mod fields;

use std::sync::Arc;

use axum::{
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use prodex_extractor::{ErrorKind, Extractor, ExtractorError, FetchMode};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{request_id, RequestId, REQUEST_ID_HEADER};

#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<Extractor>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
}

/// Query string shared by `/extract` and `/debug/fields`.
#[derive(Debug, Deserialize)]
pub(super) struct PageQuery {
    pub url: Option<String>,
    /// Skip browser escalation so a markerless page answers 204 instead of
    /// being rendered.
    #[serde(default)]
    pub static_only: bool,
}

impl PageQuery {
    pub(super) fn required_url(&self, req_id: &RequestId) -> Result<&str, ApiError> {
        match self.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Ok(url),
            _ => Err(ApiError::new(
                req_id.0.clone(),
                "validation_error",
                "missing required query parameter: url",
            )),
        }
    }

    pub(super) fn fetch_mode(&self) -> FetchMode {
        if self.static_only {
            FetchMode::StaticOnly
        } else {
            FetchMode::Escalate
        }
    }
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            // 204 must not carry a body.
            "no_product_markers" => return StatusCode::NO_CONTENT.into_response(),
            "fetch_error" | "browser_error" => StatusCode::BAD_GATEWAY,
            "gateway_timeout" => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_extractor_error(request_id: String, error: &ExtractorError) -> ApiError {
    let code = match error.kind() {
        ErrorKind::InvalidInput => "validation_error",
        ErrorKind::NoMarkers => "no_product_markers",
        ErrorKind::Fetch => "fetch_error",
        ErrorKind::Browser => "browser_error",
        ErrorKind::Timeout => "gateway_timeout",
    };
    match error.kind() {
        ErrorKind::InvalidInput | ErrorKind::NoMarkers => {
            tracing::info!(request_id = %request_id, error = %error, code, "extraction declined");
        }
        ErrorKind::Fetch | ErrorKind::Browser | ErrorKind::Timeout => {
            tracing::warn!(request_id = %request_id, error = %error, code, "extraction failed");
        }
    }
    ApiError::new(request_id, code, error.to_string())
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/extract", get(extract::extract_product))
        .route("/extract/", get(extract::extract_product))
        .route("/debug/fields", get(fields::debug_fields))
        .route("/debug/fields/", get(fields::debug_fields))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(Extension(req_id): Extension<RequestId>) -> impl IntoResponse {
    Json(ApiResponse {
        data: HealthData { status: "ok" },
        meta: ResponseMeta::new(req_id.0),
    })
}
