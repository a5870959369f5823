//! Rating model: one user's 1-5 score for one item.

use serde::{Deserialize, Serialize};

/// A stored rating. Unique per (user, item); re-submission updates in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub id: String,
    pub user_id: String,
    pub item_id: String,
    pub rating: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Request body for setting or updating a rating.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRatingRequest {
    /// Whole number 1-5.
    pub rating: i64,
    #[serde(default)]
    pub review: Option<String>,
}

/// Aggregate rating statistics for an item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingStats {
    /// Rounded to one decimal place. 0.0 when `rating_count == 0`.
    pub average_rating: f64,
    pub rating_count: i64,
}

/// Stats plus the caller's own rating, if any.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRatingResponse {
    pub average_rating: f64,
    pub rating_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_rating: Option<i64>,
}
