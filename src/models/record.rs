//! Flat item records: the ingestion format and aggregator input.
//!
//! One record is one menu offering carrying its own location-level fields.
//! This is the schema of the static JSON snapshot and of the batch-ingest
//! request body; the live database read path is flattened back into the
//! same shape so both sources feed one aggregation pipeline.

use serde::{Deserialize, Serialize};

use super::HourEntry;

/// One flat item row from either data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    pub restaurant_name: String,
    pub address: String,
    pub neighborhood: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    // Snapshot files carry these two in snake_case.
    #[serde(
        default,
        rename = "geocoded_address",
        skip_serializing_if = "Option::is_none"
    )]
    pub geocoded_address: Option<String>,
    #[serde(
        default,
        rename = "geocoding_method",
        skip_serializing_if = "Option::is_none"
    )]
    pub geocoding_method: Option<String>,
    pub allow_minors: bool,
    pub allow_takeout: bool,
    pub allow_delivery: bool,
    pub purchase_limits: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default)]
    pub hours: Vec<HourEntry>,
    pub item_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_description: Option<String>,
    /// Legacy string form: a single token or a comma-separated list.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    #[serde(default)]
    pub gluten_free: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_key: Option<String>,
}

/// Per-item rating/favorite facts merged onto items after grouping,
/// looked up by content-derived item key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemEnrichment {
    pub item_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
    pub rating_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_rating: Option<i64>,
    pub is_favorited: bool,
}

/// Request body for batch ingestion.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    pub items: Vec<ItemRecord>,
}

/// Summary of a batch ingestion run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    pub locations: usize,
    pub items: usize,
    pub hours: usize,
}

/// Request body for the enrichment lookup.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentRequest {
    pub item_keys: Vec<String>,
}

/// Counts returned by the full-wipe operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedCounts {
    pub items: u64,
    pub hours: u64,
    pub locations: u64,
}

/// Request body for the image back-fill operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemImageRequest {
    pub image_url: String,
    pub image_path: String,
}
