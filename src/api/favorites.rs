//! Favorite API endpoints.

use axum::extract::{Path, State};

use super::{success, ApiResult};
use crate::auth::Identity;
use crate::models::{Favorite, ToggleFavoriteResponse};
use crate::AppState;

/// GET /api/favorites - List the caller's favorites.
pub async fn list_favorites(
    State(state): State<AppState>,
    Identity(user_id): Identity,
) -> ApiResult<Vec<Favorite>> {
    let favorites = state.repo.list_favorites(&user_id).await?;
    success(favorites)
}

/// POST /api/favorites/:item_id/toggle - Toggle the caller's favorite.
pub async fn toggle_favorite(
    State(state): State<AppState>,
    Identity(user_id): Identity,
    Path(item_id): Path<String>,
) -> ApiResult<ToggleFavoriteResponse> {
    let favorited = state.repo.toggle_favorite(&user_id, &item_id).await?;
    success(ToggleFavoriteResponse { favorited })
}
