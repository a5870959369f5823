//! Search API endpoints.

use std::collections::HashMap;

use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use super::{locations::assemble_locations, success, ApiResult};
use crate::auth::MaybeIdentity;
use crate::models::Location;
use crate::AppState;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Search query string.
    pub q: String,
    /// Maximum number of results (default: 20).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    20
}

/// Search result with locations and metadata.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// Single search result item.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub location: Location,
    pub score: f32,
}

/// Maximum number of search results allowed.
const MAX_SEARCH_LIMIT: usize = 100;

/// GET /api/search - Full-text search, resolved onto aggregated locations.
pub async fn search_locations(
    State(state): State<AppState>,
    MaybeIdentity(user_id): MaybeIdentity,
    Query(params): Query<SearchQuery>,
) -> ApiResult<SearchResponse> {
    // Limit the maximum number of results
    let limit = params.limit.min(MAX_SEARCH_LIMIT);

    // Item-level hits; a location scores as its best-matching item.
    let hits = state.search.search(&params.q, limit, params.offset)?;
    let mut score_by_key: HashMap<String, f32> = HashMap::new();
    for hit in hits {
        let entry = score_by_key.entry(hit.item_key).or_insert(hit.score);
        if hit.score > *entry {
            *entry = hit.score;
        }
    }

    let locations = assemble_locations(&state, user_id.as_deref()).await?;

    let mut results: Vec<SearchResultItem> = locations
        .into_iter()
        .filter_map(|location| {
            let score = location
                .items
                .iter()
                .filter_map(|item| {
                    item.item_key
                        .as_ref()
                        .and_then(|key| score_by_key.get(key))
                        .copied()
                })
                .fold(None::<f32>, |best, score| {
                    Some(best.map_or(score, |b| b.max(score)))
                })?;
            Some(SearchResultItem { location, score })
        })
        .collect();

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let total = results.len();

    success(SearchResponse {
        results,
        total,
        limit,
        offset: params.offset,
    })
}
