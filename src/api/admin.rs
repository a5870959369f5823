//! Admin API endpoints: ingestion, image back-fill, wipe, reindex.
//!
//! All routes here sit behind the PSK middleware.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::{DeletedCounts, IngestRequest, IngestSummary, UpdateItemImageRequest};
use crate::{snapshot, AppState};

/// Counts of stored entities.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountsResponse {
    pub locations: i64,
    pub items: i64,
}

/// Result of a search reindex.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReindexResponse {
    pub indexed: usize,
}

async fn rebuild_index(state: &AppState) -> Result<usize, AppError> {
    let live = state.repo.list_item_records().await?;
    let records = snapshot::reconcile(live, &state.snapshot);
    state.search.rebuild(&records).await?;
    Ok(records.len())
}

/// POST /api/admin/ingest - Batch-ingest flat item records.
pub async fn ingest(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> ApiResult<IngestSummary> {
    if request.items.is_empty() {
        return Err(AppError::Validation("No items provided".to_string()));
    }

    let summary = state.repo.ingest_records(&request.items).await?;
    tracing::info!(
        "Ingested {} items across {} new locations",
        summary.items,
        summary.locations
    );

    if let Err(e) = rebuild_index(&state).await {
        tracing::warn!("Failed to rebuild search index after ingest: {}", e);
    }

    success(summary)
}

/// POST /api/admin/items/:id/image - Back-fill image fields for an item.
pub async fn update_item_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateItemImageRequest>,
) -> ApiResult<()> {
    state
        .repo
        .update_item_image(&id, &request.image_path, &request.image_url)
        .await?;
    success(())
}

/// GET /api/admin/counts - Entity counts.
pub async fn get_counts(State(state): State<AppState>) -> ApiResult<CountsResponse> {
    let locations = state.repo.count_locations().await?;
    let items = state.repo.count_items().await?;
    success(CountsResponse { locations, items })
}

/// DELETE /api/admin/data - Delete all items, hours, and locations.
pub async fn clear_data(State(state): State<AppState>) -> ApiResult<DeletedCounts> {
    let deleted = state.repo.clear_all_data().await?;
    tracing::info!(
        "Cleared {} items, {} hours, {} locations",
        deleted.items,
        deleted.hours,
        deleted.locations
    );

    if let Err(e) = rebuild_index(&state).await {
        tracing::warn!("Failed to rebuild search index after wipe: {}", e);
    }

    success(deleted)
}

/// POST /api/admin/reindex - Rebuild the search index from both sources.
pub async fn reindex(State(state): State<AppState>) -> ApiResult<ReindexResponse> {
    let indexed = rebuild_index(&state).await?;
    success(ReindexResponse { indexed })
}
