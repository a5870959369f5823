//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for live application data; a static JSON
//! snapshot supplements it at read time (see the snapshot module).

mod repository;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run embedded migrations
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Create tables if they don't exist
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS locations (
            id TEXT PRIMARY KEY,
            restaurant_name TEXT NOT NULL,
            address TEXT NOT NULL,
            neighborhood TEXT NOT NULL,
            latitude REAL,
            longitude REAL,
            geocoded_address TEXT,
            geocoding_method TEXT,
            allow_minors INTEGER NOT NULL DEFAULT 0,
            allow_takeout INTEGER NOT NULL DEFAULT 0,
            allow_delivery INTEGER NOT NULL DEFAULT 0,
            purchase_limits INTEGER NOT NULL DEFAULT 0,
            phone TEXT,
            website TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS location_items (
            id TEXT PRIMARY KEY,
            location_id TEXT NOT NULL,
            item_name TEXT NOT NULL,
            description TEXT,
            alt_description TEXT,
            item_type TEXT NOT NULL,
            types TEXT NOT NULL,
            gluten_free INTEGER NOT NULL DEFAULT 0,
            price REAL,
            url TEXT,
            image TEXT,
            image_url TEXT,
            item_key TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS location_hours (
            id TEXT PRIMARY KEY,
            location_id TEXT NOT NULL,
            day_of_week TEXT NOT NULL,
            date TEXT NOT NULL,
            hours TEXT NOT NULL,
            full_date TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (location_id, full_date)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS item_ratings (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            item_id TEXT NOT NULL,
            rating INTEGER NOT NULL,
            review TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (user_id, item_id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS favorites (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            item_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (user_id, item_id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_locations_restaurant_name ON locations(restaurant_name);
        CREATE INDEX IF NOT EXISTS idx_locations_neighborhood ON locations(neighborhood);
        CREATE INDEX IF NOT EXISTS idx_items_location_id ON location_items(location_id);
        CREATE INDEX IF NOT EXISTS idx_items_item_type ON location_items(item_type);
        CREATE INDEX IF NOT EXISTS idx_items_item_key ON location_items(item_key);
        CREATE INDEX IF NOT EXISTS idx_hours_location_id ON location_hours(location_id);
        CREATE INDEX IF NOT EXISTS idx_hours_full_date ON location_hours(full_date);
        CREATE INDEX IF NOT EXISTS idx_ratings_item_id ON item_ratings(item_id);
        CREATE INDEX IF NOT EXISTS idx_ratings_user_id ON item_ratings(user_id);
        CREATE INDEX IF NOT EXISTS idx_favorites_user_id ON favorites(user_id);
        CREATE INDEX IF NOT EXISTS idx_favorites_item_id ON favorites(item_id);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
