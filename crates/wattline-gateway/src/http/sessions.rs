use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use wattline_sessions::{ChargingSession, NewSession};

use crate::app::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub user_id: String,
    pub vehicle_id: String,
    pub station_id: String,
    pub pump_number: u32,
    pub battery_capacity: u64,
    #[serde(default)]
    pub is_reserved: bool,
    pub start_time: Option<DateTime<Utc>>,
}

/// POST /api/sessions — create a charging session.
///
/// Walk-in sessions start charging immediately; reservations are left
/// for the engine's scan to pick up once their start time arrives.
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let new = NewSession {
        user_id: req.user_id,
        vehicle_id: req.vehicle_id,
        station_id: req.station_id,
        pump_number: req.pump_number,
        battery_capacity: req.battery_capacity,
        reserved: req.is_reserved,
        start_time: req.start_time,
    };

    let session = state
        .store
        .create(&new)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let started = if session.reserved {
        info!(
            session_id = %session.id,
            start_time = ?session.start_time,
            "session reserved, scheduler will pick it up"
        );
        false
    } else {
        info!(session_id = %session.id, "walk-in session, starting immediately");
        state.engine.start_now(session.clone()).await
    };

    Ok(Json(json!({ "id": session.id, "started": started })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFilters {
    pub user_id: Option<String>,
    pub is_completed: Option<bool>,
    pub is_charging: Option<bool>,
}

/// GET /api/sessions — list sessions with optional filters.
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Query(filters): Query<SessionFilters>,
) -> Result<Json<Vec<ChargingSession>>, (StatusCode, String)> {
    let sessions = state
        .store
        .list_filtered(
            filters.user_id.as_deref(),
            filters.is_completed,
            filters.is_charging,
        )
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(sessions))
}

/// POST /api/sessions/{id}/cancel — stop a running session.
///
/// Cooperative: the worker observes the signal at its next tick and
/// unwinds through its recovery path, leaving the record eligible for a
/// later restart. Returns whether a live worker was signalled.
pub async fn cancel_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<Value> {
    let cancelled = state.registry.cancel(&id);
    if cancelled {
        info!(session_id = %id, "cancellation requested");
    }
    Json(json!({ "id": id, "cancelled": cancelled }))
}
