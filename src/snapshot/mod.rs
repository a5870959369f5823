//! Static JSON snapshot of item records.
//!
//! The application serves from two data sources: the live database and a
//! bundled JSON snapshot of scraped items. The snapshot is loaded once at
//! startup; records missing a content-derived key get one back-filled so
//! both sources can be reconciled on the same key.

use std::collections::HashSet;
use std::path::Path;

use crate::errors::AppError;
use crate::models::{item_key, ItemRecord};

/// Load and key the snapshot file. A missing file is an error; callers that
/// treat the snapshot as optional should not configure a path.
pub fn load_snapshot(path: &Path) -> Result<Vec<ItemRecord>, AppError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        AppError::Internal(format!("Failed to read snapshot {}: {}", path.display(), e))
    })?;
    let mut records: Vec<ItemRecord> = serde_json::from_str(&raw)
        .map_err(|e| AppError::Internal(format!("Failed to parse snapshot: {}", e)))?;

    for record in &mut records {
        if record.item_key.is_none() {
            record.item_key = Some(item_key(
                &record.restaurant_name,
                &record.item_name,
                &record.address,
            ));
        }
    }

    tracing::info!("Loaded {} snapshot records from {}", records.len(), path.display());
    Ok(records)
}

/// Reconcile live database records with snapshot records on the
/// content-derived item key. The live record wins when a key exists in both
/// sources; snapshot-only records are appended after the live ones.
pub fn reconcile(live: Vec<ItemRecord>, snapshot: &[ItemRecord]) -> Vec<ItemRecord> {
    let live_keys: HashSet<String> = live
        .iter()
        .filter_map(|r| r.item_key.clone())
        .collect();

    let mut merged = live;
    merged.extend(
        snapshot
            .iter()
            .filter(|r| {
                r.item_key
                    .as_ref()
                    .map_or(true, |key| !live_keys.contains(key))
            })
            .cloned(),
    );
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(restaurant: &str, item: &str, key: Option<&str>) -> ItemRecord {
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
            description: None,
            alt_description: None,
            item_type: Some("meat".to_string()),
            gluten_free: false,
            price: None,
            url: None,
            image: None,
            image_url: None,
            item_key: key.map(|k| k.to_string()),
        }
    }

    #[test]
    fn test_load_snapshot_backfills_keys() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("items.json");
        let records = vec![record("Wing Spot", "Buffalo", None)];
        std::fs::write(&path, serde_json::to_string(&records).unwrap()).unwrap();

        let loaded = load_snapshot(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(
            loaded[0].item_key.as_deref(),
            Some(item_key("Wing Spot", "Buffalo", "123 Main St").as_str())
        );
    }

    #[test]
    fn test_load_snapshot_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_snapshot(&temp_dir.path().join("absent.json"));
        assert!(result.is_err());
    }

    #[test]
    fn test_reconcile_live_wins() {
        let mut live = record("Wing Spot", "Buffalo", Some("k1"));
        live.description = Some("from the database".to_string());
        let mut snap = record("Wing Spot", "Buffalo", Some("k1"));
        snap.description = Some("from the snapshot".to_string());
        let snap_only = record("Other Place", "Korean", Some("k2"));

        let merged = reconcile(vec![live], &[snap, snap_only]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].description.as_deref(), Some("from the database"));
        assert_eq!(merged[1].restaurant_name, "Other Place");
    }

    #[test]
    fn test_reconcile_empty_live() {
        let snap = record("Wing Spot", "Buffalo", Some("k1"));
        let merged = reconcile(Vec::new(), &[snap]);
        assert_eq!(merged.len(), 1);
    }
}
