use axum::{
    extract::{Query, State},
    Extension, Json,
};
use prodex_extractor::FieldReport;

use crate::middleware::RequestId;

use super::{map_extractor_error, ApiError, ApiResponse, AppState, PageQuery, ResponseMeta};

/// Lists the linked-data keys, itemprop values, and meta tags of a page.
/// Each entry is also logged at `info`.
pub(super) async fn debug_fields(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<FieldReport>>, ApiError> {
    let url = query.required_url(&req_id)?;

    let report = state
        .extractor
        .describe_fields(url, query.fetch_mode())
        .await
        .map_err(|e| map_extractor_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: report,
        meta: ResponseMeta::new(req_id.0),
    }))
}
