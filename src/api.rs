use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use crate::db::{AlertRepository, WeatherAlert};
use crate::services::alert_service::ProductionAlertService;
use crate::services::PassSummary;

#[derive(Clone)]
pub struct AppState {
    pub alert_service: Arc<ProductionAlertService>,
    pub alert_repo: AlertRepository,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct RecentParams {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Deserialize)]
pub struct EvaluateParams {
    /// Optional clock override so operators can replay a window.
    pub now: Option<DateTime<Utc>>,
}

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health))
        .route("/alerts/recent", get(get_recent_alerts))
        .route("/alerts/booking/{booking_id}", get(get_booking_alerts))
        .route("/evaluate", post(evaluate))
        .with_state(state);

    Router::new().nest("/api/v1", api_routes)
}

#[instrument(skip(_state))]
async fn health(State(_state): State<AppState>) -> impl IntoResponse {
    debug!("Health check requested");
    let response = HealthResponse {
        status: "healthy".to_string(),
    };
    (StatusCode::OK, Json(response))
}

#[instrument(skip(state))]
async fn get_recent_alerts(
    State(state): State<AppState>,
    Query(params): Query<RecentParams>,
) -> Result<Json<Vec<WeatherAlert>>, StatusCode> {
    let alerts = state
        .alert_repo
        .find_recent(params.limit)
        .await
        .map_err(|e| {
            error!("Failed to fetch recent alerts: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    info!("Retrieved {} recent alerts", alerts.len());
    Ok(Json(alerts))
}

#[instrument(skip(state), fields(booking_id = %booking_id))]
async fn get_booking_alerts(
    State(state): State<AppState>,
    Path(booking_id): Path<i64>,
) -> Result<Json<Vec<WeatherAlert>>, StatusCode> {
    let alerts = state
        .alert_repo
        .find_by_booking(booking_id)
        .await
        .map_err(|e| {
            error!("Failed to fetch alerts for booking {}: {}", booking_id, e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    info!(
        "Retrieved {} alerts for booking {}",
        alerts.len(),
        booking_id
    );
    Ok(Json(alerts))
}

/// Kick off one evaluation pass out of schedule, optionally pinned to a
/// caller-supplied `now`.
#[instrument(skip(state))]
async fn evaluate(
    State(state): State<AppState>,
    Query(params): Query<EvaluateParams>,
) -> Result<Json<PassSummary>, StatusCode> {
    let now = params.now.unwrap_or_else(Utc::now);
    info!("Manual evaluation pass requested for {}", now);

    let summary = state.alert_service.run_pass(now).await.map_err(|e| {
        error!("Manual evaluation pass failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(summary))
}
