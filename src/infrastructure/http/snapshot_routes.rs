use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::director_error;
use crate::application::dto::SnapshotRequest;
use crate::domain::entities::SnapshotSummary;
use crate::domain::value_objects::SnapshotId;
use crate::infrastructure::state::AppState;

pub async fn list_snapshots(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SnapshotSummary>>, (StatusCode, String)> {
    state
        .director
        .list_snapshots()
        .await
        .map(Json)
        .map_err(director_error)
}

pub async fn create_snapshot(
    State(state): State<Arc<AppState>>,
    body: Option<Json<SnapshotRequest>>,
) -> Result<(StatusCode, Json<SnapshotSummary>), (StatusCode, String)> {
    let label = body.and_then(|Json(request)| request.label);
    let summary = state
        .director
        .create_snapshot(label)
        .await
        .map_err(director_error)?;
    Ok((StatusCode::CREATED, Json(summary)))
}

pub async fn restore_snapshot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SnapshotId>,
) -> Result<Json<SnapshotSummary>, (StatusCode, String)> {
    state
        .director
        .restore_snapshot(id)
        .await
        .map(Json)
        .map_err(director_error)
}

pub async fn delete_snapshot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SnapshotId>,
) -> Result<StatusCode, (StatusCode, String)> {
    let removed = state
        .director
        .delete_snapshot(id)
        .await
        .map_err(director_error)?;
    Ok(if removed {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    })
}
