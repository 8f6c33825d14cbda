//! REST API and SSE routes

use crate::manager;
use crate::playback::PlaybackInfo;
use crate::positions::DEFAULT_LATEST_LIMIT;
use crate::sinks::SinkConfig;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{delete, get, post},
    Json, Router,
};
use fp_core::{
    model::{DirectionsRequest, EventFilter, Point, RouteSummary},
    PlaybackError, PositionReport,
};
use futures::stream::{Stream, StreamExt as FuturesStreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::cors::CorsLayer;

type ApiError = (StatusCode, String);

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/directions", post(directions))
        .route("/api/playback", get(playback_info).delete(playback_reset))
        .route("/api/playback/start", post(playback_start))
        .route("/api/playback/cancel", post(playback_cancel))
        .route("/api/playback/stream", get(playback_stream))
        .route("/api/sinks", get(list_sinks).post(create_sink))
        .route("/api/sinks/:id", delete(delete_sink))
        .route("/api/positions", post(record_position))
        .route("/api/positions/latest", get(latest_positions))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn playback_error(e: PlaybackError) -> ApiError {
    let status = match e {
        PlaybackError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        PlaybackError::NotRunning => StatusCode::CONFLICT,
        PlaybackError::ReportDelivery(_) => StatusCode::BAD_GATEWAY,
    };
    (status, e.to_string())
}

// === Directions Endpoint ===

#[derive(Serialize)]
struct DirectionsResponse {
    provider: String,
    polyline: Vec<Point>,
    summary: RouteSummary,
    distance_label: String,
    duration_label: String,
}

async fn directions(
    State(state): State<AppState>,
    Json(request): Json<DirectionsRequest>,
) -> Result<Json<DirectionsResponse>, ApiError> {
    request.validate().map_err(playback_error)?;

    let route = state.directions.route(&request).await.map_err(|e| {
        tracing::warn!("{} directions failed: {:#}", state.directions.name(), e);
        (StatusCode::BAD_GATEWAY, format!("Directions failed: {:#}", e))
    })?;

    Ok(Json(DirectionsResponse {
        provider: state.directions.name().to_string(),
        distance_label: route.summary.distance_label(),
        duration_label: route.summary.duration_label(),
        summary: route.summary,
        polyline: route.polyline.into(),
    }))
}

// === Playback Endpoints ===

#[derive(Deserialize)]
struct StartRequest {
    /// Unvalidated so that a short polyline is reported as invalid input
    polyline: Vec<Point>,
    duration_ms: Option<u64>,
    #[serde(alias = "vehicleId")]
    vehicle_id: String,
    summary: Option<RouteSummary>,
}

async fn playback_start(
    State(state): State<AppState>,
    Json(request): Json<StartRequest>,
) -> Result<Json<PlaybackInfo>, ApiError> {
    let duration = request
        .duration_ms
        .map(Duration::from_millis)
        .unwrap_or(state.config.default_duration);

    let info = manager::start_playback(
        &state,
        request.polyline,
        duration,
        request.vehicle_id,
        request.summary,
    )
    .await
    .map_err(playback_error)?;

    Ok(Json(info))
}

async fn playback_cancel(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let event = manager::cancel_playback(&state)
        .await
        .map_err(playback_error)?;

    Ok(Json(serde_json::json!({
        "status": "cancelled",
        "session": event.session()
    })))
}

async fn playback_info(State(state): State<AppState>) -> Json<PlaybackInfo> {
    let engine = state.playback.read().await;
    Json(engine.info())
}

async fn playback_reset(State(state): State<AppState>) -> StatusCode {
    manager::reset_playback(&state).await;
    tracing::info!("Playback reset to idle");
    StatusCode::NO_CONTENT
}

#[derive(Deserialize)]
struct StreamQuery {
    events: Option<String>,
}

async fn playback_stream(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe();
    let filter = query
        .events
        .map(|e| EventFilter::parse(&e))
        .unwrap_or_else(EventFilter::all);

    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        let filter = filter.clone();
        async move {
            match result {
                Ok(event) if filter.matches(&event) => {
                    match Event::default().event(event.kind()).json_data(&event) {
                        Ok(sse) => Some(Ok(sse)),
                        Err(e) => {
                            tracing::error!("Failed to serialize event: {}", e);
                            None
                        }
                    }
                }
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!("Broadcast stream error: {}", e);
                    None
                }
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

// === Sink Management Endpoints ===

async fn list_sinks(State(state): State<AppState>) -> Json<Vec<SinkConfig>> {
    let sinks = state.sinks.read().await;
    Json(sinks.clone())
}

async fn create_sink(
    State(state): State<AppState>,
    Json(mut config): Json<SinkConfig>,
) -> Result<impl IntoResponse, ApiError> {
    let mut sinks = state.sinks.write().await;

    // Generate ID if not provided
    if config.id.is_empty() {
        let mut n = sinks.len() + 1;
        while sinks.iter().any(|s| s.id == format!("sink-{}", n)) {
            n += 1;
        }
        config.id = format!("sink-{}", n);
    } else if sinks.iter().any(|s| s.id == config.id) {
        return Err((
            StatusCode::CONFLICT,
            format!("Sink {} already exists", config.id),
        ));
    }

    tracing::info!("Registered position sink {}", config.id);
    sinks.push(config.clone());

    Ok((StatusCode::CREATED, Json(config)))
}

async fn delete_sink(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    let mut sinks = state.sinks.write().await;

    if let Some(pos) = sinks.iter().position(|s| s.id == id) {
        sinks.remove(pos);
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

// === Position Endpoints ===

async fn record_position(
    State(state): State<AppState>,
    Json(report): Json<PositionReport>,
) -> Result<StatusCode, ApiError> {
    if report.vehicle_id.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "vehicle_id is required".to_string()));
    }
    if !report.point.is_finite() {
        return Err((
            StatusCode::BAD_REQUEST,
            "point has non-finite coordinates".to_string(),
        ));
    }
    state.positions.record(report);
    Ok(StatusCode::CREATED)
}

#[derive(Deserialize)]
struct LatestQuery {
    #[serde(alias = "vehicleId")]
    vehicle_id: Option<String>,
    limit: Option<usize>,
}

async fn latest_positions(
    State(state): State<AppState>,
    Query(query): Query<LatestQuery>,
) -> Result<Json<Vec<PositionReport>>, ApiError> {
    let vehicle_id = query
        .vehicle_id
        .filter(|v| !v.trim().is_empty())
        .ok_or((StatusCode::BAD_REQUEST, "vehicle_id is required".to_string()))?;
    let limit = query.limit.unwrap_or(DEFAULT_LATEST_LIMIT);

    Ok(Json(state.positions.latest(&vehicle_id, limit)))
}
