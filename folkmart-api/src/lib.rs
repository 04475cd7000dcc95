//! folkmart-api library: folk-artist marketplace booking service
//!
//! Accounts, artist profiles, and the session booking & rating workflow over
//! a SQLite store, served as a JSON HTTP API.

use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod accounts;
pub mod api;
pub mod booking;
pub mod db;
pub mod error;
pub mod models;
pub mod pagination;
pub mod profiles;
pub mod retry;

use accounts::AccountService;
use booking::{BookingService, TransitionPolicy};
use profiles::ProfileService;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Shared secret for bearer tokens (0 disables signature checks)
    pub shared_secret: i64,
    /// Maximum token age
    pub token_ttl_ms: i64,
    pub accounts: AccountService,
    pub profiles: ProfileService,
    pub bookings: BookingService,
}

/// Tunables that are not part of the database
#[derive(Debug, Clone, Copy)]
pub struct ServiceOptions {
    pub token_ttl_ms: i64,
    pub transition_policy: TransitionPolicy,
    pub max_lock_wait_ms: u64,
    pub max_duration_minutes: i64,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            token_ttl_ms: 24 * 60 * 60 * 1000,
            transition_policy: TransitionPolicy::Strict,
            max_lock_wait_ms: 5000,
            max_duration_minutes: booking::DEFAULT_MAX_DURATION_MINUTES,
        }
    }
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, shared_secret: i64, options: ServiceOptions) -> Self {
        Self {
            accounts: AccountService::new(db.clone(), shared_secret),
            profiles: ProfileService::new(db.clone(), options.max_lock_wait_ms),
            bookings: BookingService::new(
                db.clone(),
                options.transition_policy,
                options.max_lock_wait_ms,
            )
            .with_max_duration(options.max_duration_minutes),
            db,
            shared_secret,
            token_ttl_ms: options.token_ttl_ms,
        }
    }
}

/// Build application router
///
/// `/health`, `POST /users`, and the artist listing are public; everything
/// else authenticates through the `Caller` extractor.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::users::user_routes())
        .merge(api::artists::artist_routes())
        .merge(api::sessions::session_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
