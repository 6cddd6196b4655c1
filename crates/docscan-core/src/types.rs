// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Docscan document scanner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a scan job (used for log correlation only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Capture resolution in pixels. Serialized as `[width, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(u32, u32)", into = "(u32, u32)")]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl From<(u32, u32)> for Resolution {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

impl From<Resolution> for (u32, u32) {
    fn from(res: Resolution) -> Self {
        (res.width, res.height)
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Coarse camera state reported by the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraState {
    Online,
    Offline,
    /// The availability probe itself failed (not merely "no camera").
    Error,
}

/// Live camera status. Derived on demand, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraStatus {
    pub online: bool,
    pub resolution: Option<Resolution>,
    pub error: Option<String>,
}

impl CameraStatus {
    /// Camera answered the probe; report the configured resolution.
    pub fn online(resolution: Resolution) -> Self {
        Self {
            online: true,
            resolution: Some(resolution),
            error: None,
        }
    }

    pub fn offline() -> Self {
        Self {
            online: false,
            resolution: None,
            error: None,
        }
    }

    /// The probe could not be carried out at all.
    pub fn probe_error(message: impl Into<String>) -> Self {
        Self {
            online: false,
            resolution: None,
            error: Some(message.into()),
        }
    }

    pub fn state(&self) -> CameraState {
        match (self.online, &self.error) {
            (_, Some(_)) => CameraState::Error,
            (true, None) => CameraState::Online,
            (false, None) => CameraState::Offline,
        }
    }
}

/// Lifecycle stages of a single scan job.
///
/// `Idle → Admitted → Capturing → Enhancing → Recognizing → Publishing → Idle`.
/// Every non-idle stage returns to `Idle` on success and on failure alike.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStage {
    #[default]
    Idle,
    Admitted,
    Capturing,
    Enhancing,
    Recognizing,
    Publishing,
}

impl ScanStage {
    /// A job exists while the stage is anything but `Idle`.
    pub fn is_active(self) -> bool {
        self != Self::Idle
    }
}

/// Outcome of the most recently completed scan.
///
/// Exactly one instance is live at a time; it is replaced wholesale when a
/// job finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub text: String,
    #[serde(with = "unix_seconds")]
    pub timestamp: Option<DateTime<Utc>>,
    pub success: bool,
    pub error: Option<String>,
}

impl ScanResult {
    pub fn succeeded(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            timestamp: Some(Utc::now()),
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            timestamp: Some(Utc::now()),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Combined view returned by the orchestrator's status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanStatus {
    pub camera: CameraStatus,
    pub in_progress: bool,
}

/// Status of the embedded HTTP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerStatus {
    Stopped,
    Starting,
    Running,
    Error,
}

/// Timestamps on the wire are floating-point Unix seconds, `null` when unset.
pub mod unix_seconds {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn to_seconds(ts: &DateTime<Utc>) -> f64 {
        ts.timestamp_micros() as f64 / 1_000_000.0
    }

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => serializer.serialize_some(&to_seconds(ts)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let Some(secs) = Option::<f64>::deserialize(deserializer)? else {
            return Ok(None);
        };
        let micros = (secs * 1_000_000.0).round() as i64;
        DateTime::from_timestamp_micros(micros)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {secs}")))
    }
}
