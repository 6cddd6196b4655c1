// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP surface of the scanner.
//
//   GET  /status       camera state and whether a scan is running
//   POST /scan         start a scan (202) or refuse while one runs (429)
//   GET  /last_result  the most recent `ScanResult`
//   GET  /health       liveness probe
//
// Handlers never wait on a scan. The trigger only reports admission; the
// outcome is fetched from `/last_result`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::debug;

use docscan_core::error::DocscanError;
use docscan_core::types::{CameraState, Resolution, ScanResult, ScanStatus, unix_seconds};

use crate::orchestrator::{Admission, ScanOrchestrator};

const SCAN_STARTED: &str = "Scan started successfully";

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

/// Body of `GET /status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub camera_online: bool,
    pub resolution: Option<Resolution>,
    pub status: CameraState,
    pub scan_in_progress: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<ScanStatus> for StatusResponse {
    fn from(status: ScanStatus) -> Self {
        Self {
            camera_online: status.camera.online,
            resolution: status.camera.resolution,
            status: status.camera.state(),
            scan_in_progress: status.in_progress,
            error: status.camera.error,
        }
    }
}

/// Body of `POST /scan`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Unix seconds.
    pub timestamp: f64,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the router for all scanner endpoints.
pub fn router(orchestrator: ScanOrchestrator) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/scan", post(scan))
        .route("/last_result", get(last_result))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(orchestrator)
}

async fn status(State(orchestrator): State<ScanOrchestrator>) -> Json<StatusResponse> {
    let status = orchestrator.get_status().await;
    debug!(online = status.camera.online, in_progress = status.in_progress, "Status queried");
    Json(status.into())
}

async fn scan(State(orchestrator): State<ScanOrchestrator>) -> (StatusCode, Json<ScanResponse>) {
    match orchestrator.trigger_scan() {
        Admission::Started(_) => (
            StatusCode::ACCEPTED,
            Json(ScanResponse {
                success: true,
                message: Some(SCAN_STARTED.into()),
                error: None,
            }),
        ),
        Admission::AlreadyRunning => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ScanResponse {
                success: false,
                message: None,
                error: Some(DocscanError::ConcurrentScanRejected.to_string()),
            }),
        ),
    }
}

async fn last_result(State(orchestrator): State<ScanOrchestrator>) -> Json<ScanResult> {
    Json(orchestrator.get_last_result())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        timestamp: unix_seconds::to_seconds(&Utc::now()),
    })
}
