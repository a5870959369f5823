//! Wing Finder Backend
//!
//! A production-grade REST backend with SQLite persistence and Tantivy full-text search,
//! serving aggregated restaurant/item data for the Wing Finder frontend.

mod aggregate;
mod api;
mod auth;
mod config;
mod db;
mod errors;
mod hours;
mod models;
mod search;
mod snapshot;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use models::ItemRecord;
use search::SearchIndex;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub search: Arc<SearchIndex>,
    pub config: Arc<Config>,
    /// Static item snapshot, loaded once at startup.
    pub snapshot: Arc<Vec<ItemRecord>>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Wing Finder Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Index path: {:?}", config.index_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Warn if PSK is not configured
    if config.admin_psk.is_none() {
        tracing::warn!("No admin PSK configured (WINGS_ADMIN_PSK). Admin endpoints are open!");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Load the static snapshot, if configured
    let snapshot_records = match &config.snapshot_path {
        Some(path) => snapshot::load_snapshot(path)?,
        None => {
            tracing::info!("No snapshot configured (WINGS_SNAPSHOT_PATH). Serving live data only");
            Vec::new()
        }
    };
    let snapshot_records = Arc::new(snapshot_records);

    // Initialize search index
    let search = Arc::new(SearchIndex::open(&config.index_path)?);

    // Build initial search index from both data sources
    tracing::info!("Building search index...");
    let live = repo.list_item_records().await?;
    let records = snapshot::reconcile(live, &snapshot_records);
    search.rebuild(&records).await?;
    tracing::info!("Search index built with {} item records", records.len());

    // Create application state
    let state = AppState {
        repo,
        search,
        config: Arc::new(config.clone()),
        snapshot: snapshot_records,
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone PSK for the auth layer
    let psk = state.config.admin_psk.clone();

    // Public API routes; per-user endpoints read the identity header
    let api_routes = Router::new()
        // Locations
        .route("/locations", get(api::list_locations))
        .route("/locations/pins", get(api::list_location_pins))
        .route("/locations/{id}", get(api::get_location))
        .route("/neighborhoods", get(api::list_neighborhoods))
        // Search
        .route("/search", get(api::search_locations))
        // Enrichment
        .route("/enrichment", post(api::get_enrichment))
        // Ratings
        .route("/ratings/{item_id}", get(api::get_item_rating))
        .route("/ratings/{item_id}", put(api::set_rating))
        .route("/ratings/{item_id}", delete(api::delete_rating))
        // Favorites
        .route("/favorites", get(api::list_favorites))
        .route("/favorites/{item_id}/toggle", post(api::toggle_favorite));

    // Admin routes behind the PSK middleware
    let admin_routes = Router::new()
        .route("/ingest", post(api::ingest))
        .route("/items/{id}/image", post(api::update_item_image))
        .route("/counts", get(api::get_counts))
        .route("/data", delete(api::clear_data))
        .route("/reindex", post(api::reindex))
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .nest("/api/admin", admin_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
