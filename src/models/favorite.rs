//! Favorite model: one (user, item) membership marker.

use serde::{Deserialize, Serialize};

/// A stored favorite. Unique per (user, item); toggled, never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub id: String,
    pub user_id: String,
    pub item_id: String,
    pub created_at: String,
}

/// Response body for the toggle operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleFavoriteResponse {
    pub favorited: bool,
}
