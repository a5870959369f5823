//! Item model: one menu offering at one location.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Dietary classification of an item.
///
/// Variant order matches the alphabetical order of the wire tokens, so a
/// `BTreeSet<ItemType>` iterates in stable display order and its first
/// element is the primary type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Meat,
    Vegan,
    Vegetarian,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Meat => "meat",
            ItemType::Vegan => "vegan",
            ItemType::Vegetarian => "vegetarian",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "meat" => Some(ItemType::Meat),
            "vegan" => Some(ItemType::Vegan),
            "vegetarian" => Some(ItemType::Vegetarian),
            _ => None,
        }
    }
}

/// Decode the legacy free-text `type` field into a type set.
///
/// The field may be a single token or a comma-separated list, any case,
/// arbitrary surrounding whitespace. Unrecognized tokens are dropped. An
/// empty or unparseable value yields `{meat}`; the set is never empty.
pub fn parse_type_set(raw: &str) -> BTreeSet<ItemType> {
    let mut types: BTreeSet<ItemType> = raw
        .to_lowercase()
        .split(',')
        .filter_map(|token| ItemType::from_str(token.trim()))
        .collect();

    if types.is_empty() {
        types.insert(ItemType::Meat);
    }
    types
}

/// The first (alphabetically) element of a parsed type set, retained for
/// single-valued consumers.
pub fn primary_type(types: &BTreeSet<ItemType>) -> ItemType {
    types.iter().next().copied().unwrap_or(ItemType::Meat)
}

/// Compute the stable content-derived key correlating the same logical item
/// across the live database and the static snapshot: a truncated hash of
/// the normalized (restaurant, item, address) triple.
pub fn item_key(restaurant_name: &str, item_name: &str, address: &str) -> String {
    let combined = format!(
        "{}_{}_{}",
        restaurant_name.to_lowercase().trim(),
        item_name.to_lowercase().trim(),
        address.to_lowercase().trim()
    );
    let digest = Sha256::digest(combined.as_bytes());
    digest
        .iter()
        .take(6)
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// A menu offering with enrichment facts attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub location_id: String,
    pub item_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_description: Option<String>,
    /// Primary type for single-valued consumers.
    #[serde(rename = "type")]
    pub primary_type: ItemType,
    /// Full parsed type set, sorted for stable display order.
    pub types: BTreeSet<ItemType>,
    pub gluten_free: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub rating_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_rating: Option<i64>,
    #[serde(default)]
    pub is_favorited: bool,
}
