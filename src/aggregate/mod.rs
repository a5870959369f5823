//! Location aggregation and filtering.
//!
//! Pure functions over already-materialized collections: flat item records
//! are grouped into locations, per-item enrichment is merged in, derived
//! statistics are computed, and a multi-predicate filter set produces the
//! final visible list. No I/O, no mutation of inputs, no panics on
//! malformed data.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::hours;
use crate::models::{
    parse_type_set, primary_type, Item, ItemEnrichment, ItemRecord, Location, LocationFilter,
    LocationStats, SortKey,
};

/// Group flat item records into locations by restaurant name.
///
/// The first record seen for a name seeds the location-level fields
/// (address, coordinates, policy flags, hours); later records only
/// contribute items. Records without coordinates or a restaurant name are
/// skipped. Each item's legacy type string is decoded into its type set
/// here, in one place.
pub fn group_items_by_location(records: &[ItemRecord]) -> Vec<Location> {
    let mut locations: Vec<Location> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        if record.restaurant_name.is_empty()
            || record.latitude.is_none()
            || record.longitude.is_none()
        {
            continue;
        }

        let idx = match index.get(&record.restaurant_name) {
            Some(&idx) => idx,
            None => {
                locations.push(seed_location(record));
                let idx = locations.len() - 1;
                index.insert(record.restaurant_name.clone(), idx);
                idx
            }
        };

        let location_id = locations[idx].id.clone();
        locations[idx].items.push(build_item(record, location_id));
    }

    locations
}

fn seed_location(record: &ItemRecord) -> Location {
    let slug = record.restaurant_name.to_lowercase().replace(' ', "-");
    Location {
        id: format!("json-{}", slug),
        restaurant_name: record.restaurant_name.clone(),
        address: record.address.clone(),
        neighborhood: record.neighborhood.clone(),
        latitude: record.latitude,
        longitude: record.longitude,
        geocoded_address: record.geocoded_address.clone(),
        geocoding_method: record.geocoding_method.clone(),
        allow_minors: record.allow_minors,
        allow_takeout: record.allow_takeout,
        allow_delivery: record.allow_delivery,
        purchase_limits: record.purchase_limits,
        phone: record.phone.clone(),
        website: record.website.clone(),
        hours: record.hours.clone(),
        items: Vec::new(),
        average_rating: 0.0,
        review_count: 0,
    }
}

fn build_item(record: &ItemRecord, location_id: String) -> Item {
    let types = parse_type_set(record.item_type.as_deref().unwrap_or(""));
    let primary = primary_type(&types);
    let placeholder_id = match &record.item_key {
        Some(key) => format!("temp-{}", key),
        None => format!("temp-{}", record.item_name.to_lowercase().replace(' ', "-")),
    };

    Item {
        id: placeholder_id,
        location_id,
        item_name: record.item_name.clone(),
        description: record.description.clone(),
        alt_description: record.alt_description.clone(),
        primary_type: primary,
        types,
        gluten_free: record.gluten_free,
        price: record.price,
        url: record.url.clone(),
        image: record.image.clone(),
        image_url: record.image_url.clone(),
        item_key: record.item_key.clone(),
        average_rating: None,
        rating_count: 0,
        user_rating: None,
        is_favorited: false,
    }
}

/// Merge per-item enrichment facts (keyed by content-derived item key) onto
/// the grouped locations. Items without a matching record keep zero/None
/// enrichment rather than erroring.
pub fn enrich_locations(
    locations: Vec<Location>,
    enrichment_by_key: &HashMap<String, ItemEnrichment>,
) -> Vec<Location> {
    locations
        .into_iter()
        .map(|mut location| {
            for item in &mut location.items {
                let Some(enrichment) = item
                    .item_key
                    .as_ref()
                    .and_then(|key| enrichment_by_key.get(key))
                else {
                    continue;
                };
                item.id = enrichment.item_id.clone();
                item.average_rating = enrichment.average_rating;
                item.rating_count = enrichment.rating_count;
                item.user_rating = enrichment.user_rating;
                item.is_favorited = enrichment.is_favorited;
            }
            location
        })
        .collect()
}

/// Derived rating statistics for one location.
///
/// The average is the mean of item averages over items with at least one
/// rating; unrated items are excluded from the mean, not counted as zero.
/// `(0.0, 0)` is the "no reviews yet" sentinel, distinguishable from a real
/// average because ratings are 1-5.
pub fn compute_location_stats(location: &Location) -> LocationStats {
    let rated: Vec<&Item> = location
        .items
        .iter()
        .filter(|item| item.rating_count > 0 && item.average_rating.is_some())
        .collect();

    if rated.is_empty() {
        return LocationStats {
            average_rating: 0.0,
            review_count: 0,
        };
    }

    let total: f64 = rated.iter().filter_map(|item| item.average_rating).sum();
    let review_count: i64 = rated.iter().map(|item| item.rating_count).sum();

    LocationStats {
        average_rating: total / rated.len() as f64,
        review_count,
    }
}

/// Write each location's derived statistics onto it.
pub fn apply_location_stats(locations: Vec<Location>) -> Vec<Location> {
    locations
        .into_iter()
        .map(|mut location| {
            let stats = compute_location_stats(&location);
            location.average_rating = stats.average_rating;
            location.review_count = stats.review_count;
            location
        })
        .collect()
}

/// Apply the filter predicate set, short-circuiting on the first failing
/// predicate. Locations are returned unmodified in content; item-level
/// predicates decide inclusion of the whole location, they never strip
/// items from it.
///
/// `now` is the instant used for the open-now predicate, threaded in
/// explicitly so filtering stays deterministic.
pub fn filter_locations(
    locations: &[Location],
    filter: &LocationFilter,
    favorite_item_ids: &HashSet<String>,
    now: DateTime<Utc>,
) -> Vec<Location> {
    locations
        .iter()
        .filter(|location| location_matches(location, filter, favorite_item_ids, now))
        .cloned()
        .collect()
}

fn location_matches(
    location: &Location,
    filter: &LocationFilter,
    favorite_item_ids: &HashSet<String>,
    now: DateTime<Utc>,
) -> bool {
    if let Some(term) = &filter.search_term {
        let term = term.to_lowercase();
        let matches_location = location.restaurant_name.to_lowercase().contains(&term)
            || location.neighborhood.to_lowercase().contains(&term);
        let matches_items = location.items.iter().any(|item| {
            item.item_name.to_lowercase().contains(&term)
                || item
                    .description
                    .as_ref()
                    .is_some_and(|d| d.to_lowercase().contains(&term))
                || item
                    .alt_description
                    .as_ref()
                    .is_some_and(|d| d.to_lowercase().contains(&term))
        });
        if !matches_location && !matches_items {
            return false;
        }
    }

    if let Some(neighborhood) = &filter.neighborhood {
        if &location.neighborhood != neighborhood {
            return false;
        }
    }

    if let Some(allow_minors) = filter.allow_minors {
        if location.allow_minors != allow_minors {
            return false;
        }
    }

    if let Some(allow_takeout) = filter.allow_takeout {
        if location.allow_takeout != allow_takeout {
            return false;
        }
    }

    if let Some(allow_delivery) = filter.allow_delivery {
        if location.allow_delivery != allow_delivery {
            return false;
        }
    }

    if filter.is_open_now == Some(true) && !hours::is_open_now(&location.hours, now) {
        return false;
    }

    let gluten_free = filter.gluten_free == Some(true);
    if gluten_free || filter.item_type.is_some() {
        let has_matching_item = location.items.iter().any(|item| {
            let matches_gluten_free = !gluten_free || item.gluten_free;
            // Membership is checked against the full type set, not just the
            // primary type.
            let matches_type = filter
                .item_type
                .map_or(true, |wanted| item.types.contains(&wanted));
            matches_gluten_free && matches_type
        });
        if !has_matching_item {
            return false;
        }
    }

    if filter.favorites_only == Some(true) {
        let has_favorite = location
            .items
            .iter()
            .any(|item| favorite_item_ids.contains(&item.id));
        if !has_favorite {
            return false;
        }
    }

    true
}

/// Stable, caller-selected ordering applied after filtering.
pub fn sort_locations(mut locations: Vec<Location>, sort: SortKey) -> Vec<Location> {
    match sort {
        SortKey::Name => {
            locations.sort_by(|a, b| a.restaurant_name.cmp(&b.restaurant_name));
        }
        SortKey::Rating => {
            locations.sort_by(|a, b| {
                b.average_rating
                    .partial_cmp(&a.average_rating)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
        SortKey::Neighborhood => {
            locations.sort_by(|a, b| a.neighborhood.cmp(&b.neighborhood));
        }
    }
    locations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HourEntry, ItemType};
    use chrono::TimeZone;

    fn record(restaurant: &str, item: &str, item_type: &str) -> ItemRecord {
        ItemRecord {
            restaurant_name: restaurant.to_string(),
            address: "123 Main St".to_string(),
            neighborhood: "Alberta".to_string(),
            latitude: Some(45.55),
            longitude: Some(-122.65),
            geocoded_address: None,
            geocoding_method: None,
            allow_minors: true,
            allow_takeout: true,
            allow_delivery: false,
            purchase_limits: false,
            phone: None,
            website: None,
            hours: Vec::new(),
            item_name: item.to_string(),
            description: Some("crispy wings".to_string()),
            alt_description: None,
            item_type: Some(item_type.to_string()),
            gluten_free: false,
            price: None,
            url: None,
            image: None,
            image_url: None,
            item_key: Some(crate::models::item_key(restaurant, item, "123 Main St")),
        }
    }

    fn flatten(locations: &[Location]) -> Vec<ItemRecord> {
        let mut records = Vec::new();
        for location in locations {
            for item in &location.items {
                let mut r = record(
                    &location.restaurant_name,
                    &item.item_name,
                    item.primary_type.as_str(),
                );
                r.item_type = Some(
                    item.types
                        .iter()
                        .map(|t| t.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                );
                records.push(r);
            }
        }
        records
    }

    #[test]
    fn test_grouping_by_restaurant_name() {
        let records = vec![
            record("Wing Spot", "Buffalo", "meat"),
            record("Wing Spot", "Cauliflower", "vegan"),
            record("Other Place", "Korean", "meat"),
        ];
        let locations = group_items_by_location(&records);
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].restaurant_name, "Wing Spot");
        assert_eq!(locations[0].items.len(), 2);
        assert_eq!(locations[1].items.len(), 1);
    }

    #[test]
    fn test_grouping_skips_records_without_coordinates() {
        let mut bad = record("No Geo", "Wings", "meat");
        bad.latitude = None;
        let locations = group_items_by_location(&[bad]);
        assert!(locations.is_empty());
    }

    #[test]
    fn test_grouping_first_seen_wins_for_location_fields() {
        let first = record("Wing Spot", "Buffalo", "meat");
        let mut second = record("Wing Spot", "Cauliflower", "vegan");
        second.address = "999 Other St".to_string();
        second.allow_delivery = true;

        let locations = group_items_by_location(&[first, second]);
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].address, "123 Main St");
        assert!(!locations[0].allow_delivery);
    }

    #[test]
    fn test_grouping_decodes_type_sets() {
        let records = vec![record("Wing Spot", "Mixed", "vegan, vegetarian")];
        let locations = group_items_by_location(&records);
        let item = &locations[0].items[0];
        assert_eq!(item.primary_type, ItemType::Vegan);
        assert_eq!(
            item.types.iter().copied().collect::<Vec<_>>(),
            vec![ItemType::Vegan, ItemType::Vegetarian]
        );
    }

    #[test]
    fn test_grouping_idempotent() {
        let records = vec![
            record("Wing Spot", "Buffalo", "meat,vegan"),
            record("Wing Spot", "Cauliflower", "vegan"),
            record("Other Place", "Korean", "meat"),
        ];
        let first_pass = group_items_by_location(&records);
        let second_pass = group_items_by_location(&flatten(&first_pass));

        assert_eq!(first_pass.len(), second_pass.len());
        for (a, b) in first_pass.iter().zip(second_pass.iter()) {
            assert_eq!(a.restaurant_name, b.restaurant_name);
            assert_eq!(a.address, b.address);
            assert_eq!(a.items.len(), b.items.len());
            for (x, y) in a.items.iter().zip(b.items.iter()) {
                assert_eq!(x.item_name, y.item_name);
                assert_eq!(x.types, y.types);
            }
        }
    }

    fn enrichment(item_id: &str, avg: Option<f64>, count: i64) -> ItemEnrichment {
        ItemEnrichment {
            item_id: item_id.to_string(),
            average_rating: avg,
            rating_count: count,
            user_rating: None,
            is_favorited: false,
        }
    }

    #[test]
    fn test_enrichment_by_key_with_misses() {
        let records = vec![
            record("Wing Spot", "Buffalo", "meat"),
            record("Wing Spot", "Cauliflower", "vegan"),
        ];
        let locations = group_items_by_location(&records);
        let key = locations[0].items[0].item_key.clone().unwrap();

        let mut by_key = HashMap::new();
        by_key.insert(key, enrichment("db-item-1", Some(4.0), 2));

        let enriched = enrich_locations(locations, &by_key);
        let items = &enriched[0].items;
        assert_eq!(items[0].id, "db-item-1");
        assert_eq!(items[0].average_rating, Some(4.0));
        assert_eq!(items[0].rating_count, 2);
        // Miss keeps zero/None enrichment and its placeholder id.
        assert!(items[1].id.starts_with("temp-"));
        assert_eq!(items[1].average_rating, None);
        assert_eq!(items[1].rating_count, 0);
    }

    #[test]
    fn test_stats_exclude_unrated_items() {
        let records = vec![
            record("Wing Spot", "A", "meat,vegan"),
            record("Wing Spot", "B", "vegetarian"),
        ];
        let locations = group_items_by_location(&records);
        let key_a = locations[0].items[0].item_key.clone().unwrap();

        let mut by_key = HashMap::new();
        by_key.insert(key_a, enrichment("a", Some(4.0), 2));

        let enriched = apply_location_stats(enrich_locations(locations, &by_key));
        assert_eq!(enriched.len(), 1);
        assert_eq!(enriched[0].items.len(), 2);
        assert_eq!(enriched[0].average_rating, 4.0);
        assert_eq!(enriched[0].review_count, 2);
    }

    #[test]
    fn test_stats_sentinel_when_no_rated_items() {
        let records = vec![record("Wing Spot", "A", "meat")];
        let locations = apply_location_stats(group_items_by_location(&records));
        assert_eq!(locations[0].average_rating, 0.0);
        assert_eq!(locations[0].review_count, 0);
    }

    fn now() -> DateTime<Utc> {
        // 22:00 UTC = 15:00 at the fixed UTC-7 offset.
        Utc.with_ymd_and_hms(2025, 9, 30, 22, 0, 0).unwrap()
    }

    #[test]
    fn test_filter_unset_passes_everything() {
        let records = vec![
            record("Wing Spot", "Buffalo", "meat"),
            record("Other Place", "Korean", "meat"),
        ];
        let locations = group_items_by_location(&records);
        let filtered = filter_locations(
            &locations,
            &LocationFilter::default(),
            &HashSet::new(),
            now(),
        );
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_filter_search_term_matches_items_too() {
        let records = vec![
            record("Wing Spot", "Gochujang Wings", "meat"),
            record("Other Place", "Buffalo", "meat"),
        ];
        let locations = group_items_by_location(&records);

        let filter = LocationFilter {
            search_term: Some("gochujang".to_string()),
            ..Default::default()
        };
        let filtered = filter_locations(&locations, &filter, &HashSet::new(), now());
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].restaurant_name, "Wing Spot");

        let filter = LocationFilter {
            search_term: Some("alberta".to_string()),
            ..Default::default()
        };
        let filtered = filter_locations(&locations, &filter, &HashSet::new(), now());
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_filter_neighborhood_exact() {
        let mut records = vec![
            record("Wing Spot", "Buffalo", "meat"),
            record("Other Place", "Korean", "meat"),
        ];
        records[1].neighborhood = "Hawthorne".to_string();
        let locations = group_items_by_location(&records);

        let filter = LocationFilter {
            neighborhood: Some("Hawthorne".to_string()),
            ..Default::default()
        };
        let filtered = filter_locations(&locations, &filter, &HashSet::new(), now());
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].restaurant_name, "Other Place");
    }

    #[test]
    fn test_filter_policy_flags_tri_state() {
        let mut records = vec![
            record("Wing Spot", "Buffalo", "meat"),
            record("Other Place", "Korean", "meat"),
        ];
        records[1].allow_delivery = true;
        let locations = group_items_by_location(&records);

        let filter = LocationFilter {
            allow_delivery: Some(true),
            ..Default::default()
        };
        let filtered = filter_locations(&locations, &filter, &HashSet::new(), now());
        assert_eq!(filtered.len(), 1);

        // Explicit false is a real criterion, distinct from unset.
        let filter = LocationFilter {
            allow_delivery: Some(false),
            ..Default::default()
        };
        let filtered = filter_locations(&locations, &filter, &HashSet::new(), now());
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].restaurant_name, "Wing Spot");
    }

    #[test]
    fn test_filter_open_now() {
        let mut open = record("Open Spot", "Buffalo", "meat");
        open.hours = vec![HourEntry {
            day_of_week: "Tue".to_string(),
            date: "Sep 30".to_string(),
            hours: "11 am–10 pm".to_string(),
            full_date: "2025-09-30".to_string(),
        }];
        let mut shut = record("Shut Spot", "Korean", "meat");
        shut.hours = vec![HourEntry {
            day_of_week: "Tue".to_string(),
            date: "Sep 30".to_string(),
            hours: "Closed".to_string(),
            full_date: "2025-09-30".to_string(),
        }];
        let locations = group_items_by_location(&[open, shut]);

        let filter = LocationFilter {
            is_open_now: Some(true),
            ..Default::default()
        };
        let filtered = filter_locations(&locations, &filter, &HashSet::new(), now());
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].restaurant_name, "Open Spot");
    }

    #[test]
    fn test_filter_type_checks_full_set() {
        let records = vec![
            record("Wing Spot", "Mixed", "meat, vegan"),
            record("Other Place", "Korean", "meat"),
        ];
        let locations = group_items_by_location(&records);

        // "Mixed" has primary type meat; the vegan filter must still match
        // it through the full set.
        let filter = LocationFilter {
            item_type: Some(ItemType::Vegan),
            ..Default::default()
        };
        let filtered = filter_locations(&locations, &filter, &HashSet::new(), now());
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].restaurant_name, "Wing Spot");
    }

    #[test]
    fn test_filter_gluten_free_and_type_conjunction() {
        let mut a = record("Wing Spot", "GF Vegan", "vegan");
        a.gluten_free = true;
        let b = record("Wing Spot", "Glutenful Vegan", "vegan");
        let mut c = record("Other Place", "GF Meat", "meat");
        c.gluten_free = true;
        let locations = group_items_by_location(&[a, b, c]);

        // One item must satisfy both predicates at once.
        let filter = LocationFilter {
            gluten_free: Some(true),
            item_type: Some(ItemType::Vegan),
            ..Default::default()
        };
        let filtered = filter_locations(&locations, &filter, &HashSet::new(), now());
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].restaurant_name, "Wing Spot");
        // The location is returned intact, items are not stripped.
        assert_eq!(filtered[0].items.len(), 2);
    }

    #[test]
    fn test_filter_favorites_only() {
        let records = vec![
            record("Wing Spot", "Buffalo", "meat"),
            record("Other Place", "Korean", "meat"),
        ];
        let locations = group_items_by_location(&records);

        let filter = LocationFilter {
            favorites_only: Some(true),
            ..Default::default()
        };

        // Empty favorite set excludes every location that has items.
        let filtered = filter_locations(&locations, &filter, &HashSet::new(), now());
        assert!(filtered.is_empty());

        let mut favorites = HashSet::new();
        favorites.insert(locations[0].items[0].id.clone());
        let filtered = filter_locations(&locations, &filter, &favorites, now());
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].restaurant_name, "Wing Spot");
    }

    #[test]
    fn test_end_to_end_scenario() {
        let records = vec![
            record("Wing Spot", "A", "meat,vegan"),
            record("Wing Spot", "B", "vegetarian"),
        ];
        let locations = group_items_by_location(&records);
        let key_a = locations[0].items[0].item_key.clone().unwrap();

        let mut by_key = HashMap::new();
        by_key.insert(key_a, enrichment("a", Some(4.0), 2));

        let locations = apply_location_stats(enrich_locations(locations, &by_key));
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].items.len(), 2);
        assert_eq!(locations[0].average_rating, 4.0);
        assert_eq!(locations[0].review_count, 2);
    }

    #[test]
    fn test_sort_locations() {
        let mut records = vec![
            record("Zapata Wings", "A", "meat"),
            record("Alberta Wings", "B", "meat"),
        ];
        records[0].neighborhood = "Belmont".to_string();
        let locations = group_items_by_location(&records);

        let by_name = sort_locations(locations.clone(), SortKey::Name);
        assert_eq!(by_name[0].restaurant_name, "Alberta Wings");

        let mut rated = locations.clone();
        rated[0].average_rating = 4.5;
        rated[0].review_count = 3;
        let by_rating = sort_locations(rated, SortKey::Rating);
        assert_eq!(by_rating[0].restaurant_name, "Zapata Wings");

        let by_neighborhood = sort_locations(locations, SortKey::Neighborhood);
        assert_eq!(by_neighborhood[0].restaurant_name, "Alberta Wings");
    }
}
