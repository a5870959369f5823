//! Location API endpoints.
//!
//! These handlers run the full aggregation pipeline on every request: live
//! records reconciled with the snapshot, grouped into locations, enriched,
//! filtered, sorted, paginated. Both components are pure, so each request
//! works over a fresh materialization.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::{success, ApiResult};
use crate::auth::MaybeIdentity;
use crate::errors::AppError;
use crate::models::{
    EnrichmentRequest, ItemEnrichment, ItemType, Location, LocationFilter, LocationPin, SortKey,
};
use crate::{aggregate, snapshot, AppState};

/// Query parameters for the location list. Absent fields do not filter.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationsQuery {
    #[serde(default)]
    pub search_term: Option<String>,
    #[serde(default)]
    pub neighborhood: Option<String>,
    #[serde(default)]
    pub gluten_free: Option<bool>,
    #[serde(default)]
    pub allow_minors: Option<bool>,
    #[serde(default)]
    pub allow_takeout: Option<bool>,
    #[serde(default)]
    pub allow_delivery: Option<bool>,
    #[serde(default)]
    pub is_open_now: Option<bool>,
    #[serde(default, rename = "type")]
    pub item_type: Option<ItemType>,
    #[serde(default)]
    pub favorites_only: Option<bool>,
    #[serde(default)]
    pub sort: Option<SortKey>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

impl LocationsQuery {
    fn filter(&self) -> LocationFilter {
        LocationFilter {
            search_term: self.search_term.clone(),
            neighborhood: self.neighborhood.clone(),
            gluten_free: self.gluten_free,
            allow_minors: self.allow_minors,
            allow_takeout: self.allow_takeout,
            allow_delivery: self.allow_delivery,
            is_open_now: self.is_open_now,
            item_type: self.item_type,
            favorites_only: self.favorites_only,
        }
    }
}

/// Paginated location list.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationsResponse {
    pub locations: Vec<Location>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// Maximum page size for the location list.
const MAX_LOCATIONS_LIMIT: usize = 200;

const DEFAULT_LOCATIONS_LIMIT: usize = 50;

/// Run the source-reconciliation half of the pipeline: live records merged
/// with the snapshot, grouped, enriched for the given user, stats applied.
pub(crate) async fn assemble_locations(
    state: &AppState,
    user_id: Option<&str>,
) -> Result<Vec<Location>, AppError> {
    let live = state.repo.list_item_records().await?;
    let records = snapshot::reconcile(live, &state.snapshot);

    let keys: Vec<String> = records.iter().filter_map(|r| r.item_key.clone()).collect();
    let enrichment = state.repo.enrichment_by_keys(&keys, user_id).await?;

    let locations = aggregate::group_items_by_location(&records);
    let locations = aggregate::enrich_locations(locations, &enrichment);
    Ok(aggregate::apply_location_stats(locations))
}

async fn filtered_locations(
    state: &AppState,
    user_id: Option<&str>,
    query: &LocationsQuery,
) -> Result<Vec<Location>, AppError> {
    let locations = assemble_locations(state, user_id).await?;

    let favorite_item_ids = match (query.favorites_only, user_id) {
        (Some(true), Some(user)) => state.repo.favorite_item_ids(user).await?,
        _ => HashSet::new(),
    };

    let filtered = aggregate::filter_locations(
        &locations,
        &query.filter(),
        &favorite_item_ids,
        Utc::now(),
    );
    Ok(aggregate::sort_locations(
        filtered,
        query.sort.unwrap_or_default(),
    ))
}

/// GET /api/locations - List locations through the filter pipeline.
pub async fn list_locations(
    State(state): State<AppState>,
    MaybeIdentity(user_id): MaybeIdentity,
    Query(query): Query<LocationsQuery>,
) -> ApiResult<LocationsResponse> {
    let sorted = filtered_locations(&state, user_id.as_deref(), &query).await?;

    let total = sorted.len();
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LOCATIONS_LIMIT)
        .min(MAX_LOCATIONS_LIMIT);
    let offset = query.offset.unwrap_or(0);
    let locations: Vec<Location> = sorted.into_iter().skip(offset).take(limit).collect();

    success(LocationsResponse {
        locations,
        total,
        limit,
        offset,
    })
}

/// GET /api/locations/pins - Map-pin projection of the filtered list.
pub async fn list_location_pins(
    State(state): State<AppState>,
    MaybeIdentity(user_id): MaybeIdentity,
    Query(query): Query<LocationsQuery>,
) -> ApiResult<Vec<LocationPin>> {
    let sorted = filtered_locations(&state, user_id.as_deref(), &query).await?;

    let pins = sorted
        .into_iter()
        .filter_map(|location| {
            let latitude = location.latitude?;
            let longitude = location.longitude?;
            Some(LocationPin {
                id: location.id,
                restaurant_name: location.restaurant_name,
                neighborhood: location.neighborhood,
                latitude,
                longitude,
                address: location.address,
                allow_minors: location.allow_minors,
                allow_takeout: location.allow_takeout,
                allow_delivery: location.allow_delivery,
                purchase_limits: location.purchase_limits,
            })
        })
        .collect();

    success(pins)
}

/// GET /api/locations/:id - Get a single location with full details.
pub async fn get_location(
    State(state): State<AppState>,
    MaybeIdentity(user_id): MaybeIdentity,
    Path(id): Path<String>,
) -> ApiResult<Location> {
    match state.repo.get_location(&id, user_id.as_deref()).await? {
        Some(location) => success(location),
        None => Err(AppError::NotFound(format!("Location {} not found", id))),
    }
}

/// GET /api/neighborhoods - Distinct neighborhoods across both data sources.
pub async fn list_neighborhoods(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    let mut neighborhoods = state.repo.list_neighborhoods().await?;
    neighborhoods.extend(state.snapshot.iter().map(|r| r.neighborhood.clone()));
    neighborhoods.sort();
    neighborhoods.dedup();
    success(neighborhoods)
}

/// POST /api/enrichment - Rating/favorite facts for a set of item keys.
pub async fn get_enrichment(
    State(state): State<AppState>,
    MaybeIdentity(user_id): MaybeIdentity,
    Json(request): Json<EnrichmentRequest>,
) -> ApiResult<HashMap<String, ItemEnrichment>> {
    let enrichment = state
        .repo
        .enrichment_by_keys(&request.item_keys, user_id.as_deref())
        .await?;
    success(enrichment)
}
