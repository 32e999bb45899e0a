//! Mirror Server - reference remote store for mirror data sources.
//!
//! Serves a single in-memory record table over the four-operation record
//! protocol (read, create, update, destroy), so a `DataSource` can be driven
//! against a real HTTP endpoint in tests and during local development.

pub mod config;
pub mod error;
pub mod routes;
pub mod store;

use crate::config::Config;
use crate::store::RecordStore;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RecordStore>,
    pub config: Arc<Config>,
}

impl AppState {
    /// State with an empty store using the configured identity field.
    pub fn new(config: Config) -> Self {
        Self {
            store: Arc::new(RecordStore::new(config.id_attribute.clone())),
            config: Arc::new(config),
        }
    }
}

/// Build the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
