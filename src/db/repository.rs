//! Database repository for CRUD operations.
//!
//! Uses prepared statements and transactions for data integrity. The read
//! path for the aggregation pipeline is deliberately flat: items are joined
//! with their location fields back into `ItemRecord`s so the live database
//! and the static snapshot feed the same grouping code.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    item_key, parse_type_set, primary_type, DeletedCounts, Favorite, HourEntry, IngestSummary,
    Item, ItemEnrichment, ItemRecord, ItemType, Location, Rating, RatingStats,
};

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== INGESTION ====================

    /// Batch-ingest flat item records: upsert locations keyed by restaurant
    /// name, insert hours once per new location, insert every item with its
    /// decoded primary type and a computed content key.
    pub async fn ingest_records(&self, records: &[ItemRecord]) -> Result<IngestSummary, AppError> {
        let mut summary = IngestSummary {
            locations: 0,
            items: 0,
            hours: 0,
        };

        // Use a transaction for atomicity
        let mut tx = self.pool.begin().await?;
        let mut location_ids: HashMap<String, String> = HashMap::new();

        for record in records {
            if record.restaurant_name.trim().is_empty() {
                continue;
            }

            let location_id = match location_ids.get(&record.restaurant_name) {
                Some(id) => id.clone(),
                None => {
                    let existing =
                        sqlx::query("SELECT id FROM locations WHERE restaurant_name = ?")
                            .bind(&record.restaurant_name)
                            .fetch_optional(&mut *tx)
                            .await?;

                    let id = match existing {
                        Some(row) => row.get("id"),
                        None => {
                            let id = uuid::Uuid::new_v4().to_string();
                            let now = Utc::now().to_rfc3339();

                            sqlx::query(
                                r#"INSERT INTO locations (
                                    id, restaurant_name, address, neighborhood,
                                    latitude, longitude, geocoded_address, geocoding_method,
                                    allow_minors, allow_takeout, allow_delivery, purchase_limits,
                                    phone, website, created_at, updated_at
                                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
                            )
                            .bind(&id)
                            .bind(&record.restaurant_name)
                            .bind(&record.address)
                            .bind(&record.neighborhood)
                            .bind(record.latitude)
                            .bind(record.longitude)
                            .bind(&record.geocoded_address)
                            .bind(&record.geocoding_method)
                            .bind(record.allow_minors as i32)
                            .bind(record.allow_takeout as i32)
                            .bind(record.allow_delivery as i32)
                            .bind(record.purchase_limits as i32)
                            .bind(&record.phone)
                            .bind(&record.website)
                            .bind(&now)
                            .bind(&now)
                            .execute(&mut *tx)
                            .await?;

                            summary.locations += 1;

                            // Hours are location-level and arrive on every
                            // record; insert them once, with the first
                            // record that creates the location.
                            for hour in &record.hours {
                                let result = sqlx::query(
                                    r#"INSERT OR IGNORE INTO location_hours
                                        (id, location_id, day_of_week, date, hours, full_date, created_at, updated_at)
                                    VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
                                )
                                .bind(uuid::Uuid::new_v4().to_string())
                                .bind(&id)
                                .bind(&hour.day_of_week)
                                .bind(&hour.date)
                                .bind(&hour.hours)
                                .bind(&hour.full_date)
                                .bind(&now)
                                .bind(&now)
                                .execute(&mut *tx)
                                .await?;
                                summary.hours += result.rows_affected() as usize;
                            }

                            id
                        }
                    };

                    location_ids.insert(record.restaurant_name.clone(), id.clone());
                    id
                }
            };

            let types = parse_type_set(record.item_type.as_deref().unwrap_or(""));
            let primary = primary_type(&types);
            let types_json = serde_json::to_string(
                &types.iter().map(|t| t.as_str()).collect::<Vec<_>>(),
            )
            .unwrap_or_default();
            let key = record.item_key.clone().unwrap_or_else(|| {
                item_key(&record.restaurant_name, &record.item_name, &record.address)
            });
            let now = Utc::now().to_rfc3339();

            sqlx::query(
                r#"INSERT INTO location_items (
                    id, location_id, item_name, description, alt_description,
                    item_type, types, gluten_free, price, url, image, image_url,
                    item_key, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(&location_id)
            .bind(&record.item_name)
            .bind(&record.description)
            .bind(&record.alt_description)
            .bind(primary.as_str())
            .bind(&types_json)
            .bind(record.gluten_free as i32)
            .bind(record.price)
            .bind(&record.url)
            .bind(&record.image)
            .bind(&record.image_url)
            .bind(&key)
            .execute(&mut *tx)
            .await?;

            summary.items += 1;
        }

        tx.commit().await?;

        Ok(summary)
    }

    // ==================== READ PATH ====================

    /// Flatten items x locations x hours back into item records, the input
    /// shape of the aggregation pipeline.
    pub async fn list_item_records(&self) -> Result<Vec<ItemRecord>, AppError> {
        let hour_rows = sqlx::query(
            "SELECT location_id, day_of_week, date, hours, full_date FROM location_hours ORDER BY full_date",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut hours_by_location: HashMap<String, Vec<HourEntry>> = HashMap::new();
        for row in &hour_rows {
            let location_id: String = row.get("location_id");
            hours_by_location
                .entry(location_id)
                .or_default()
                .push(hour_entry_from_row(row));
        }

        let rows = sqlx::query(
            r#"SELECT i.item_name, i.description, i.alt_description, i.types,
                      i.gluten_free, i.price, i.url, i.image, i.image_url, i.item_key,
                      l.id AS location_id, l.restaurant_name, l.address, l.neighborhood,
                      l.latitude, l.longitude, l.geocoded_address, l.geocoding_method,
                      l.allow_minors, l.allow_takeout, l.allow_delivery, l.purchase_limits,
                      l.phone, l.website
               FROM location_items i
               JOIN locations l ON l.id = i.location_id
               ORDER BY l.restaurant_name, i.item_name"#,
        )
        .fetch_all(&self.pool)
        .await?;

        let records = rows
            .iter()
            .map(|row| {
                let location_id: String = row.get("location_id");
                let gluten_free: i32 = row.get("gluten_free");
                let allow_minors: i32 = row.get("allow_minors");
                let allow_takeout: i32 = row.get("allow_takeout");
                let allow_delivery: i32 = row.get("allow_delivery");
                let purchase_limits: i32 = row.get("purchase_limits");
                let types_json: String = row.get("types");

                ItemRecord {
                    restaurant_name: row.get("restaurant_name"),
                    address: row.get("address"),
                    neighborhood: row.get("neighborhood"),
                    latitude: row.get("latitude"),
                    longitude: row.get("longitude"),
                    geocoded_address: row.get("geocoded_address"),
                    geocoding_method: row.get("geocoding_method"),
                    allow_minors: allow_minors != 0,
                    allow_takeout: allow_takeout != 0,
                    allow_delivery: allow_delivery != 0,
                    purchase_limits: purchase_limits != 0,
                    phone: row.get("phone"),
                    website: row.get("website"),
                    hours: hours_by_location
                        .get(&location_id)
                        .cloned()
                        .unwrap_or_default(),
                    item_name: row.get("item_name"),
                    description: row.get("description"),
                    alt_description: row.get("alt_description"),
                    item_type: Some(types_to_legacy_string(&types_json)),
                    gluten_free: gluten_free != 0,
                    price: row.get("price"),
                    url: row.get("url"),
                    image: row.get("image"),
                    image_url: row.get("image_url"),
                    item_key: row.get("item_key"),
                }
            })
            .collect();

        Ok(records)
    }

    /// Get a single location with items, hours, and per-item rating facts.
    pub async fn get_location(
        &self,
        id: &str,
        user_id: Option<&str>,
    ) -> Result<Option<Location>, AppError> {
        let Some(location_row) = sqlx::query(
            r#"SELECT id, restaurant_name, address, neighborhood, latitude, longitude,
                      geocoded_address, geocoding_method, allow_minors, allow_takeout,
                      allow_delivery, purchase_limits, phone, website
               FROM locations WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let item_rows = sqlx::query(
            r#"SELECT id, location_id, item_name, description, alt_description,
                      item_type, types, gluten_free, price, url, image, image_url, item_key
               FROM location_items WHERE location_id = ? ORDER BY item_name"#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let stats_rows = sqlx::query(
            r#"SELECT r.item_id, AVG(r.rating) AS average_rating, COUNT(*) AS rating_count
               FROM item_ratings r
               JOIN location_items i ON i.id = r.item_id
               WHERE i.location_id = ?
               GROUP BY r.item_id"#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let mut stats_by_item: HashMap<String, (Option<f64>, i64)> = HashMap::new();
        for row in &stats_rows {
            let item_id: String = row.get("item_id");
            stats_by_item.insert(item_id, (row.get("average_rating"), row.get("rating_count")));
        }

        let user_ratings = match user_id {
            Some(user) => {
                let rows = sqlx::query(
                    r#"SELECT r.item_id, r.rating FROM item_ratings r
                       JOIN location_items i ON i.id = r.item_id
                       WHERE i.location_id = ? AND r.user_id = ?"#,
                )
                .bind(id)
                .bind(user)
                .fetch_all(&self.pool)
                .await?;
                rows.iter()
                    .map(|row| (row.get::<String, _>("item_id"), row.get::<i64, _>("rating")))
                    .collect::<HashMap<_, _>>()
            }
            None => HashMap::new(),
        };

        let favorited = match user_id {
            Some(user) => self.favorite_item_ids(user).await?,
            None => HashSet::new(),
        };

        let items: Vec<Item> = item_rows
            .iter()
            .map(|row| {
                let item_id: String = row.get("id");
                let (average_rating, rating_count) = stats_by_item
                    .get(&item_id)
                    .copied()
                    .unwrap_or((None, 0));
                let gluten_free: i32 = row.get("gluten_free");
                let types_json: String = row.get("types");
                let types = parse_type_set(&types_to_legacy_string(&types_json));

                Item {
                    id: item_id.clone(),
                    location_id: row.get("location_id"),
                    item_name: row.get("item_name"),
                    description: row.get("description"),
                    alt_description: row.get("alt_description"),
                    primary_type: primary_type(&types),
                    types,
                    gluten_free: gluten_free != 0,
                    price: row.get("price"),
                    url: row.get("url"),
                    image: row.get("image"),
                    image_url: row.get("image_url"),
                    item_key: row.get("item_key"),
                    average_rating,
                    rating_count,
                    user_rating: user_ratings.get(&item_id).copied(),
                    is_favorited: favorited.contains(&item_id),
                }
            })
            .collect();

        let hour_rows = sqlx::query(
            "SELECT day_of_week, date, hours, full_date FROM location_hours WHERE location_id = ? ORDER BY full_date",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let allow_minors: i32 = location_row.get("allow_minors");
        let allow_takeout: i32 = location_row.get("allow_takeout");
        let allow_delivery: i32 = location_row.get("allow_delivery");
        let purchase_limits: i32 = location_row.get("purchase_limits");

        let mut location = Location {
            id: location_row.get("id"),
            restaurant_name: location_row.get("restaurant_name"),
            address: location_row.get("address"),
            neighborhood: location_row.get("neighborhood"),
            latitude: location_row.get("latitude"),
            longitude: location_row.get("longitude"),
            geocoded_address: location_row.get("geocoded_address"),
            geocoding_method: location_row.get("geocoding_method"),
            allow_minors: allow_minors != 0,
            allow_takeout: allow_takeout != 0,
            allow_delivery: allow_delivery != 0,
            purchase_limits: purchase_limits != 0,
            phone: location_row.get("phone"),
            website: location_row.get("website"),
            hours: hour_rows.iter().map(hour_entry_from_row).collect(),
            items,
            average_rating: 0.0,
            review_count: 0,
        };

        let stats = crate::aggregate::compute_location_stats(&location);
        location.average_rating = stats.average_rating;
        location.review_count = stats.review_count;

        Ok(Some(location))
    }

    /// List distinct neighborhoods, sorted.
    pub async fn list_neighborhoods(&self) -> Result<Vec<String>, AppError> {
        let rows = sqlx::query("SELECT DISTINCT neighborhood FROM locations ORDER BY neighborhood")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("neighborhood")).collect())
    }

    // ==================== RATING OPERATIONS ====================

    /// Set or update the user's rating for an item. Unique per (user, item):
    /// re-submission updates in place.
    pub async fn set_rating(
        &self,
        user_id: &str,
        item_id: &str,
        rating: i64,
        review: Option<&str>,
    ) -> Result<Rating, AppError> {
        self.ensure_item_exists(item_id).await?;

        let now = Utc::now().to_rfc3339();
        let existing = sqlx::query(
            "SELECT id, created_at FROM item_ratings WHERE user_id = ? AND item_id = ?",
        )
        .bind(user_id)
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        match existing {
            Some(row) => {
                let rating_id: String = row.get("id");
                let created_at: String = row.get("created_at");

                sqlx::query(
                    "UPDATE item_ratings SET rating = ?, review = ?, updated_at = ? WHERE id = ?",
                )
                .bind(rating)
                .bind(review)
                .bind(&now)
                .bind(&rating_id)
                .execute(&self.pool)
                .await?;

                Ok(Rating {
                    id: rating_id,
                    user_id: user_id.to_string(),
                    item_id: item_id.to_string(),
                    rating,
                    review: review.map(|r| r.to_string()),
                    created_at,
                    updated_at: now,
                })
            }
            None => {
                let rating_id = uuid::Uuid::new_v4().to_string();

                sqlx::query(
                    "INSERT INTO item_ratings (id, user_id, item_id, rating, review, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(&rating_id)
                .bind(user_id)
                .bind(item_id)
                .bind(rating)
                .bind(review)
                .bind(&now)
                .bind(&now)
                .execute(&self.pool)
                .await?;

                Ok(Rating {
                    id: rating_id,
                    user_id: user_id.to_string(),
                    item_id: item_id.to_string(),
                    rating,
                    review: review.map(|r| r.to_string()),
                    created_at: now.clone(),
                    updated_at: now,
                })
            }
        }
    }

    /// Delete the user's rating for an item. Returns whether one existed.
    pub async fn delete_rating(&self, user_id: &str, item_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM item_ratings WHERE user_id = ? AND item_id = ?")
            .bind(user_id)
            .bind(item_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Aggregate rating statistics for an item, average rounded to one
    /// decimal place. (0.0, 0) when the item has no ratings.
    pub async fn get_item_rating_stats(&self, item_id: &str) -> Result<RatingStats, AppError> {
        let row = sqlx::query(
            "SELECT AVG(rating) AS average_rating, COUNT(*) AS rating_count FROM item_ratings WHERE item_id = ?",
        )
        .bind(item_id)
        .fetch_one(&self.pool)
        .await?;

        let average: Option<f64> = row.get("average_rating");
        let count: i64 = row.get("rating_count");

        Ok(RatingStats {
            average_rating: average.map(|a| (a * 10.0).round() / 10.0).unwrap_or(0.0),
            rating_count: count,
        })
    }

    /// The user's own rating for an item, if any.
    pub async fn get_user_rating(
        &self,
        user_id: &str,
        item_id: &str,
    ) -> Result<Option<i64>, AppError> {
        let row = sqlx::query("SELECT rating FROM item_ratings WHERE user_id = ? AND item_id = ?")
            .bind(user_id)
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("rating")))
    }

    // ==================== FAVORITE OPERATIONS ====================

    /// List the user's favorites.
    pub async fn list_favorites(&self, user_id: &str) -> Result<Vec<Favorite>, AppError> {
        let rows = sqlx::query(
            "SELECT id, user_id, item_id, created_at FROM favorites WHERE user_id = ? ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| Favorite {
                id: row.get("id"),
                user_id: row.get("user_id"),
                item_id: row.get("item_id"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    /// Item ids the user has favorited.
    pub async fn favorite_item_ids(&self, user_id: &str) -> Result<HashSet<String>, AppError> {
        let rows = sqlx::query("SELECT item_id FROM favorites WHERE user_id = ?")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("item_id")).collect())
    }

    /// Toggle the user's favorite for an item. Returns the new state.
    pub async fn toggle_favorite(&self, user_id: &str, item_id: &str) -> Result<bool, AppError> {
        self.ensure_item_exists(item_id).await?;

        let existing = sqlx::query("SELECT id FROM favorites WHERE user_id = ? AND item_id = ?")
            .bind(user_id)
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?;

        match existing {
            Some(row) => {
                let favorite_id: String = row.get("id");
                sqlx::query("DELETE FROM favorites WHERE id = ?")
                    .bind(&favorite_id)
                    .execute(&self.pool)
                    .await?;
                Ok(false)
            }
            None => {
                sqlx::query(
                    "INSERT INTO favorites (id, user_id, item_id, created_at) VALUES (?, ?, ?, ?)",
                )
                .bind(uuid::Uuid::new_v4().to_string())
                .bind(user_id)
                .bind(item_id)
                .bind(Utc::now().to_rfc3339())
                .execute(&self.pool)
                .await?;
                Ok(true)
            }
        }
    }

    // ==================== ENRICHMENT ====================

    /// Rating/favorite facts for the given content keys, keyed by item key.
    /// Keys with no matching item are simply absent from the result.
    pub async fn enrichment_by_keys(
        &self,
        item_keys: &[String],
        user_id: Option<&str>,
    ) -> Result<HashMap<String, ItemEnrichment>, AppError> {
        let wanted: HashSet<&String> = item_keys.iter().collect();

        let item_rows =
            sqlx::query("SELECT id, item_key FROM location_items WHERE item_key IS NOT NULL")
                .fetch_all(&self.pool)
                .await?;

        let matching: Vec<(String, String)> = item_rows
            .iter()
            .filter_map(|row| {
                let key: String = row.get("item_key");
                wanted
                    .contains(&key)
                    .then(|| (key, row.get::<String, _>("id")))
            })
            .collect();

        if matching.is_empty() {
            return Ok(HashMap::new());
        }

        let rating_rows = sqlx::query("SELECT item_id, user_id, rating FROM item_ratings")
            .fetch_all(&self.pool)
            .await?;

        let mut ratings_by_item: HashMap<String, Vec<(String, i64)>> = HashMap::new();
        for row in &rating_rows {
            let item_id: String = row.get("item_id");
            ratings_by_item
                .entry(item_id)
                .or_default()
                .push((row.get("user_id"), row.get("rating")));
        }

        let favorited = match user_id {
            Some(user) => self.favorite_item_ids(user).await?,
            None => HashSet::new(),
        };

        let mut enrichment = HashMap::new();
        for (key, item_id) in matching {
            let ratings = ratings_by_item.get(&item_id).map(Vec::as_slice).unwrap_or(&[]);
            let average_rating = (!ratings.is_empty()).then(|| {
                ratings.iter().map(|(_, r)| *r as f64).sum::<f64>() / ratings.len() as f64
            });
            let user_rating = user_id.and_then(|user| {
                ratings
                    .iter()
                    .find(|(rater, _)| rater == user)
                    .map(|(_, r)| *r)
            });

            enrichment.insert(
                key,
                ItemEnrichment {
                    item_id: item_id.clone(),
                    average_rating,
                    rating_count: ratings.len() as i64,
                    user_rating,
                    is_favorited: favorited.contains(&item_id),
                },
            );
        }

        Ok(enrichment)
    }

    // ==================== ADMIN OPERATIONS ====================

    /// Back-fill image fields for an item.
    pub async fn update_item_image(
        &self,
        item_id: &str,
        image_path: &str,
        image_url: &str,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE location_items SET image = ?, image_url = ?, updated_at = ? WHERE id = ?",
        )
        .bind(image_path)
        .bind(image_url)
        .bind(Utc::now().to_rfc3339())
        .bind(item_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Item {} not found", item_id)));
        }
        Ok(())
    }

    /// Count locations.
    pub async fn count_locations(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM locations")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("count"))
    }

    /// Count items.
    pub async fn count_items(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM location_items")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("count"))
    }

    /// Delete all items, hours, and locations. Ratings and favorites are
    /// left untouched; their item ids stop resolving until re-ingestion
    /// assigns new ones.
    pub async fn clear_all_data(&self) -> Result<DeletedCounts, AppError> {
        let mut tx = self.pool.begin().await?;

        let items = sqlx::query("DELETE FROM location_items")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let hours = sqlx::query("DELETE FROM location_hours")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let locations = sqlx::query("DELETE FROM locations")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        Ok(DeletedCounts {
            items,
            hours,
            locations,
        })
    }

    async fn ensure_item_exists(&self, item_id: &str) -> Result<(), AppError> {
        let row = sqlx::query("SELECT id FROM location_items WHERE id = ?")
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?;
        if row.is_none() {
            return Err(AppError::NotFound(format!("Item {} not found", item_id)));
        }
        Ok(())
    }
}

// Helper functions for row conversion

fn hour_entry_from_row(row: &sqlx::sqlite::SqliteRow) -> HourEntry {
    HourEntry {
        day_of_week: row.get("day_of_week"),
        date: row.get("date"),
        hours: row.get("hours"),
        full_date: row.get("full_date"),
    }
}

/// Rebuild the legacy comma-separated type string from the stored JSON
/// token array, e.g. `["vegan","vegetarian"]` -> `"vegan, vegetarian"`.
fn types_to_legacy_string(types_json: &str) -> String {
    let tokens: Vec<String> = serde_json::from_str(types_json).unwrap_or_default();
    if tokens.is_empty() {
        ItemType::Meat.as_str().to_string()
    } else {
        tokens.join(", ")
    }
}
