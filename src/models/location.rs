//! Location model: one restaurant/venue grouping one or more items.

use serde::{Deserialize, Serialize};

use super::Item;

/// One calendar day's operating-hours statement for a location.
///
/// `full_date` is the ISO calendar date used as the join key for "today";
/// `hours` is the free-text range (`"11 am–10 pm"`, `"4–10 pm"`, `"Closed"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourEntry {
    pub day_of_week: String,
    pub date: String,
    pub hours: String,
    pub full_date: String,
}

/// A restaurant/venue with its items, hours, and derived statistics.
///
/// Grouping is by restaurant name; the location is reconstructible purely
/// from its constituent items sharing that name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: String,
    pub restaurant_name: String,
    pub address: String,
    pub neighborhood: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geocoded_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geocoding_method: Option<String>,
    pub allow_minors: bool,
    pub allow_takeout: bool,
    pub allow_delivery: bool,
    pub purchase_limits: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default)]
    pub hours: Vec<HourEntry>,
    #[serde(default)]
    pub items: Vec<Item>,
    /// Mean of item averages over items with at least one rating. 0.0 with
    /// `review_count == 0` is the "no reviews yet" sentinel, never a real
    /// 0-star average (ratings are 1-5).
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub review_count: i64,
}

/// Derived rating statistics for a location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationStats {
    pub average_rating: f64,
    pub review_count: i64,
}

/// Lightweight map-pin projection of a location.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPin {
    pub id: String,
    pub restaurant_name: String,
    pub neighborhood: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub allow_minors: bool,
    pub allow_takeout: bool,
    pub allow_delivery: bool,
    pub purchase_limits: bool,
}
