use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use wattline_charging::{ChargeRegistry, ChargingEngine, ListenerHub};
use wattline_core::config::WattlineConfig;
use wattline_sessions::SqliteSessionStore;

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: WattlineConfig,
    pub store: Arc<SqliteSessionStore>,
    pub registry: Arc<ChargeRegistry>,
    pub hub: Arc<ListenerHub>,
    pub engine: Arc<ChargingEngine>,
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route(
            "/api/sessions",
            post(crate::http::sessions::create_session).get(crate::http::sessions::list_sessions),
        )
        .route(
            "/api/sessions/{id}/cancel",
            post(crate::http::sessions::cancel_session),
        )
        .route("/ws", get(crate::ws::connection::ws_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
