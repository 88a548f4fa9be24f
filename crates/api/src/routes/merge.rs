use std::collections::BTreeMap;

use axum::{extract::rejection::JsonRejection, routing::post, Json, Router};
use docvault_core::structured::merge::UpdateShape;
use docvault_core::structured::{
    merge, MergeStatus, PartialUpdate, Sections, StructuredDocument, Vocabulary,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/merge", post(merge_fields))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MergeRequest {
    /// The whole structured document as last saved.
    previous: Value,
    /// What the widget reported. May carry the deletion marker.
    update: BTreeMap<String, String>,
    /// Overrides shape inference.
    #[serde(default)]
    shape: Option<UpdateShape>,
    /// Section layout, e.g. `lean` or `business_model`.
    #[serde(default)]
    canvas_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct MergeResponse {
    document: BTreeMap<String, String>,
    /// The merged document grouped for the canvas layout.
    sections: Sections,
    #[serde(flatten)]
    status: MergeStatus,
}

/// Pure merge helper: no document is read or written.
async fn merge_fields(
    payload: Result<Json<MergeRequest>, JsonRejection>,
) -> ApiResult<Json<MergeResponse>> {
    let Json(request) = payload?;

    let previous = StructuredDocument::parse(&request.previous.to_string())
        .map_err(|e| ApiError::BadRequest(format!("previous: {e}")))?;
    let vocabulary = match request.canvas_type.as_deref() {
        None => Vocabulary::special_only(),
        Some(name) => Vocabulary::named(name)
            .ok_or_else(|| ApiError::BadRequest(format!("unknown canvas type {name:?}")))?,
    };
    let mut update = PartialUpdate::from_raw(request.update);
    if let Some(shape) = request.shape {
        update.shape = shape;
    }

    let outcome = merge(&previous, &update, &vocabulary);
    let sections = outcome.document.sections(&vocabulary);
    Ok(Json(MergeResponse {
        document: outcome.document.into_map(),
        sections,
        status: outcome.status,
    }))
}
