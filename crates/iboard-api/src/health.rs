use std::time::Instant;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::{error, info};

use iboard_types::api::{HealthReport, ProbeReport, ServiceHealth, ServiceInfo, ServiceStatus};

use crate::state::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// GET /health: full report, 503 when the database does not answer.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let started = Instant::now();
    let db_healthy = ping_database(&state).await;
    let response_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let report = HealthReport {
        status: if db_healthy { "healthy" } else { "unhealthy" }.into(),
        timestamp: chrono::Utc::now(),
        uptime_secs: state.started_at.elapsed().as_secs_f64(),
        response_time_ms,
        environment: state.environment.as_str().into(),
        version: VERSION.into(),
        services: ServiceHealth {
            database: if db_healthy {
                ServiceStatus::Up
            } else {
                ServiceStatus::Down
            },
            server: ServiceStatus::Up,
        },
    };

    if db_healthy {
        info!("Health check passed in {}ms", response_time_ms);
        (StatusCode::OK, Json(report))
    } else {
        error!("Health check failed: database unhealthy");
        (StatusCode::SERVICE_UNAVAILABLE, Json(report))
    }
}

/// GET /health/ready
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    if ping_database(&state).await {
        (StatusCode::OK, Json(probe("ready", None, None)))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(probe(
                "not ready",
                None,
                Some("Database connection failed".into()),
            )),
        )
    }
}

/// GET /health/live: answers as long as the process can serve requests.
pub async fn live(State(state): State<AppState>) -> impl IntoResponse {
    Json(probe(
        "alive",
        Some(state.started_at.elapsed().as_secs_f64()),
        None,
    ))
}

/// GET / and GET /api
pub async fn info(State(state): State<AppState>) -> impl IntoResponse {
    Json(ServiceInfo {
        name: "IBoard API".into(),
        version: VERSION.into(),
        environment: state.environment.as_str().into(),
        endpoints: vec!["/api/ideas".into(), "/api/health".into()],
    })
}

async fn ping_database(state: &AppState) -> bool {
    let state = state.clone();
    tokio::task::spawn_blocking(move || state.ideas.database_healthy())
        .await
        .unwrap_or_else(|e| {
            error!("spawn_blocking join error: {}", e);
            false
        })
}

fn probe(status: &str, uptime_secs: Option<f64>, reason: Option<String>) -> ProbeReport {
    ProbeReport {
        status: status.into(),
        timestamp: chrono::Utc::now(),
        uptime_secs,
        reason,
    }
}
