//! Filter contract for the location list.
//!
//! Every field is optional: an absent criterion means "don't filter", never
//! "filter for false/empty". Boolean criteria are tri-state.

use serde::Deserialize;

use super::ItemType;

/// The flat predicate set applied to the aggregated location list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationFilter {
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
}

/// Sort order applied after filtering. The aggregator itself never sorts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    Name,
    Rating,
    Neighborhood,
}

impl Default for SortKey {
    fn default() -> Self {
        SortKey::Name
    }
}
