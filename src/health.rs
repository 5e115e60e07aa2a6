use crate::error::Result;
use crate::models::{Instrument, SchedulerPhase};
use crate::state::BotState;
use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

pub const SERVICE_NAME: &str = "demo-signal-bot";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub status: &'static str,
    pub service: &'static str,
    pub instruments: Vec<Instrument>,
    pub scheduler: SchedulerPhase,
    pub uptime_secs: u64,
    pub timestamp: DateTime<Utc>,
}

/// Liveness routes. Handlers only read atomics and never touch the delivery
/// pipeline, so a slow chat API cannot hold up a probe.
pub fn router(state: Arc<BotState>) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(port: u16, state: Arc<BotState>) -> Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Liveness endpoint listening on {}", addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (StatusCode::OK, Json(HealthResponse { status: "healthy" }))
}

async fn service_info(State(state): State<Arc<BotState>>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        status: "running",
        service: SERVICE_NAME,
        instruments: state.instruments().to_vec(),
        scheduler: state.phase(),
        uptime_secs: state.uptime().as_secs(),
        timestamp: Utc::now(),
    })
}
