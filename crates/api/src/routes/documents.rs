use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use docvault_core::document::{
    Document, DocumentId, OwnerId, Snapshot, SnapshotOrigin, SnapshotPayload, VersionSummary,
};
use docvault_core::mutation::PruneReport;
use docvault_core::versioning::{AutosaveOutcome, NewDocument, VersionDiff};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::AppState;

/// Document and version history routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/documents", post(create_document).get(list_documents))
        .route(
            "/v1/documents/{id}",
            get(get_document).delete(delete_document),
        )
        .route("/v1/documents/{id}/save", post(save_draft))
        .route("/v1/documents/{id}/autosave", post(autosave))
        .route("/v1/documents/{id}/versions", get(list_versions))
        .route("/v1/documents/{id}/versions/{version}", get(get_version))
        .route(
            "/v1/documents/{id}/versions/{version}/restore",
            post(restore_version),
        )
        .route("/v1/documents/{id}/diff", get(diff_versions))
        .route("/v1/documents/{id}/prune", post(prune))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentWithSnapshot {
    document: Document,
    snapshot: Snapshot,
}

#[derive(Debug, Deserialize)]
struct OwnerQuery {
    owner: OwnerId,
}

#[derive(Debug, Deserialize)]
struct SaveRequest {
    title: String,
    #[serde(default)]
    content: String,
    /// `automated` marks content written by a generator.
    #[serde(default)]
    origin: SnapshotOrigin,
}

#[derive(Debug, Deserialize)]
struct DiffQuery {
    from: i32,
    to: i32,
}

#[derive(Debug, Deserialize)]
struct PruneQuery {
    keep: Option<usize>,
}

async fn create_document(
    State(state): State<AppState>,
    payload: Result<Json<NewDocument>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<DocumentWithSnapshot>)> {
    let Json(new) = payload?;
    let (document, snapshot) = state.manager().create_document(new).await?;
    Ok((
        StatusCode::CREATED,
        Json(DocumentWithSnapshot { document, snapshot }),
    ))
}

async fn list_documents(
    State(state): State<AppState>,
    query: Result<Query<OwnerQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Document>>> {
    let Query(query) = query?;
    Ok(Json(state.manager().list_documents(query.owner).await?))
}

async fn get_document(
    State(state): State<AppState>,
    id: Result<Path<DocumentId>, PathRejection>,
) -> ApiResult<Json<DocumentWithSnapshot>> {
    let Path(id) = id?;
    let document = state.manager().get_document(id).await?;
    let snapshot = state.manager().current_snapshot(id).await?;
    Ok(Json(DocumentWithSnapshot { document, snapshot }))
}

async fn delete_document(
    State(state): State<AppState>,
    id: Result<Path<DocumentId>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    state.manager().delete_document(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Explicit save: always commits a new version.
async fn save_draft(
    State(state): State<AppState>,
    id: Result<Path<DocumentId>, PathRejection>,
    payload: Result<Json<SaveRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Snapshot>)> {
    let Path(id) = id?;
    let Json(request) = payload?;
    let payload = SnapshotPayload::new(request.title, request.content);
    let snapshot = match request.origin {
        SnapshotOrigin::Human => state.manager().save_draft(id, payload).await?,
        SnapshotOrigin::Automated => state.manager().record_generated(id, payload).await?,
    };
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// Debounced client save: folds into the current version while its editing
/// session is live.
async fn autosave(
    State(state): State<AppState>,
    id: Result<Path<DocumentId>, PathRejection>,
    payload: Result<Json<SnapshotPayload>, JsonRejection>,
) -> ApiResult<Json<AutosaveOutcome>> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    Ok(Json(state.manager().autosave(id, payload).await?))
}

async fn list_versions(
    State(state): State<AppState>,
    id: Result<Path<DocumentId>, PathRejection>,
) -> ApiResult<Json<Vec<VersionSummary>>> {
    let Path(id) = id?;
    Ok(Json(state.manager().list_versions(id).await?))
}

async fn get_version(
    State(state): State<AppState>,
    path: Result<Path<(DocumentId, i32)>, PathRejection>,
) -> ApiResult<Json<Snapshot>> {
    let Path((id, version)) = path?;
    Ok(Json(state.manager().get_version(id, version).await?))
}

async fn restore_version(
    State(state): State<AppState>,
    path: Result<Path<(DocumentId, i32)>, PathRejection>,
) -> ApiResult<(StatusCode, Json<Snapshot>)> {
    let Path((id, version)) = path?;
    let source = state.manager().get_version(id, version).await?;
    let snapshot = state.manager().restore_version(source.id).await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

async fn diff_versions(
    State(state): State<AppState>,
    id: Result<Path<DocumentId>, PathRejection>,
    query: Result<Query<DiffQuery>, QueryRejection>,
) -> ApiResult<Json<VersionDiff>> {
    let Path(id) = id?;
    let Query(query) = query?;
    Ok(Json(
        state.manager().diff_versions(id, query.from, query.to).await?,
    ))
}

async fn prune(
    State(state): State<AppState>,
    id: Result<Path<DocumentId>, PathRejection>,
    query: Result<Query<PruneQuery>, QueryRejection>,
) -> ApiResult<Json<PruneReport>> {
    let Path(id) = id?;
    let Query(query) = query?;
    let keep = query
        .keep
        .unwrap_or(state.config().versioning.retention_keep);
    Ok(Json(state.manager().prune(id, keep).await?))
}
