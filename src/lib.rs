//! Stowhouse booking core.
//!
//! Capacity-aware booking admission and deterministic pricing for the
//! Stowhouse warehouse-storage marketplace, exposed as a JSON web service.

pub mod booking;
pub mod cache;
pub mod error;

use axum::{routing::get, Router};
use sqlx::PgPool;

use cache::AppCache;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub cache: AppCache,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .nest("/api", booking::routes::router())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}
