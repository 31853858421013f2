use axum::{
    extract::{Query, State},
    Extension, Json,
};
use prodex_core::ProductRecord;
use serde::Serialize;

use crate::middleware::RequestId;

use super::{map_extractor_error, ApiError, AppState, PageQuery};

/// Body of a successful `/extract`: the record and nothing else. The request
/// id is only sent as the `x-request-id` header.
#[derive(Debug, Serialize)]
pub(super) struct ExtractResponse {
    pub data: ProductRecord,
}

pub(super) async fn extract_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ExtractResponse>, ApiError> {
    let url = query.required_url(&req_id)?;

    let extraction = state
        .extractor
        .extract_traced(url, query.fetch_mode())
        .await
        .map_err(|e| map_extractor_error(req_id.0.clone(), &e))?;

    tracing::debug!(
        request_id = %req_id.0,
        stage = %extraction.stage,
        attempts = extraction.attempts.len(),
        "extract request served"
    );

    Ok(Json(ExtractResponse {
        data: extraction.record,
    }))
}
