use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::db::SqliteBookingStore;
use crate::handlers;
use crate::services::pricing::FlatRate;
use crate::services::scheduling::BookingEngine;
use crate::state::AppState;

/// Wires the SQLite store, flat pricing and the configured offset into shared state.
pub fn build_state(config: AppConfig, conn: rusqlite::Connection) -> Arc<AppState> {
    let engine = BookingEngine::new(
        Arc::new(SqliteBookingStore::new(conn)),
        Arc::new(FlatRate::new(config.slot_price)),
        config.reporting_offset(),
    );
    Arc::new(AppState { engine, config })
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/api/courts/:court_id/slots",
            get(handlers::bookings::list_slots),
        )
        .route("/api/bookings", post(handlers::bookings::create_booking))
        .route("/api/bookings/:id", get(handlers::bookings::get_booking))
        .route(
            "/api/users/:user_id/bookings",
            get(handlers::bookings::user_bookings),
        )
        .route("/api/admin/bookings", get(handlers::admin::get_bookings))
        .route(
            "/api/admin/bookings/:id/status",
            post(handlers::admin::update_booking_status),
        )
        .route(
            "/calendar/:booking_id",
            get(handlers::calendar::download_ics),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
