//! Rating API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use super::{success, ApiResult};
use crate::auth::{Identity, MaybeIdentity};
use crate::errors::AppError;
use crate::models::{ItemRatingResponse, Rating, SetRatingRequest};
use crate::AppState;

/// Response body for rating deletion.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRatingResponse {
    pub deleted: bool,
}

/// PUT /api/ratings/:item_id - Set or update the caller's rating.
pub async fn set_rating(
    State(state): State<AppState>,
    Identity(user_id): Identity,
    Path(item_id): Path<String>,
    Json(request): Json<SetRatingRequest>,
) -> ApiResult<Rating> {
    // Only whole numbers 1-5 are accepted; averages alone carry decimals.
    if !(1..=5).contains(&request.rating) {
        return Err(AppError::Validation(
            "Rating must be a whole number between 1 and 5".to_string(),
        ));
    }

    let rating = state
        .repo
        .set_rating(&user_id, &item_id, request.rating, request.review.as_deref())
        .await?;
    success(rating)
}

/// DELETE /api/ratings/:item_id - Delete the caller's rating.
pub async fn delete_rating(
    State(state): State<AppState>,
    Identity(user_id): Identity,
    Path(item_id): Path<String>,
) -> ApiResult<DeleteRatingResponse> {
    let deleted = state.repo.delete_rating(&user_id, &item_id).await?;
    success(DeleteRatingResponse { deleted })
}

/// GET /api/ratings/:item_id - Aggregate stats plus the caller's own rating.
pub async fn get_item_rating(
    State(state): State<AppState>,
    MaybeIdentity(user_id): MaybeIdentity,
    Path(item_id): Path<String>,
) -> ApiResult<ItemRatingResponse> {
    let stats = state.repo.get_item_rating_stats(&item_id).await?;
    let user_rating = match user_id {
        Some(user) => state.repo.get_user_rating(&user, &item_id).await?,
        None => None,
    };

    success(ItemRatingResponse {
        average_rating: stats.average_rating,
        rating_count: stats.rating_count,
        user_rating,
    })
}
