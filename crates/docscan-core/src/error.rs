// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Docscan.

use std::time::Duration;

use thiserror::Error;

/// Top-level error type for all Docscan operations.
#[derive(Debug, Error)]
pub enum DocscanError {
    // -- Camera errors --
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("no frame within {}s", .timeout.as_secs_f32())]
    CaptureTimeout { timeout: Duration },

    #[error("{0}")]
    CaptureFailed(String),

    // -- Recognition errors --
    #[error("recognition engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("{0}")]
    RecognitionFailed(String),

    // -- Orchestration --
    #[error("Scan already in progress")]
    ConcurrentScanRejected,

    /// Unexpected failure inside the scan pipeline (task panic, staging I/O).
    #[error("{0}")]
    InternalFault(String),

    // -- Infrastructure --
    #[error("image processing failed: {0}")]
    Image(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("HTTP server error: {0}")]
    Server(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DocscanError {
    /// Whether this error means the engine itself is missing or misconfigured,
    /// as opposed to failing on one particular input.
    pub fn is_engine_unavailable(&self) -> bool {
        matches!(self, Self::EngineUnavailable(_))
    }

    /// Whether this error originated at the camera boundary.
    pub fn is_capture_error(&self) -> bool {
        matches!(
            self,
            Self::DeviceUnavailable(_) | Self::CaptureTimeout { .. } | Self::CaptureFailed(_)
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocscanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_message_matches_http_contract() {
        assert_eq!(
            DocscanError::ConcurrentScanRejected.to_string(),
            "Scan already in progress"
        );
    }

    #[test]
    fn engine_unavailable_is_distinct_from_recognition_failure() {
        let missing = DocscanError::EngineUnavailable("tesseract not found".into());
        let failed = DocscanError::RecognitionFailed("bad input".into());
        assert!(missing.is_engine_unavailable());
        assert!(!failed.is_engine_unavailable());
        assert!(missing.to_string().contains("unavailable"));
    }

    #[test]
    fn capture_errors_are_classified() {
        assert!(DocscanError::DeviceUnavailable("x".into()).is_capture_error());
        assert!(
            DocscanError::CaptureTimeout {
                timeout: Duration::from_secs(30)
            }
            .is_capture_error()
        );
        assert!(!DocscanError::RecognitionFailed("x".into()).is_capture_error());
    }

    #[test]
    fn internal_fault_carries_bare_detail() {
        let fault = DocscanError::InternalFault("task panicked".into());
        assert_eq!(fault.to_string(), "task panicked");
        assert!(!fault.is_capture_error());
        assert!(!fault.is_engine_unavailable());
    }

    #[test]
    fn timeout_message_reports_seconds() {
        let err = DocscanError::CaptureTimeout {
            timeout: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "no frame within 1.5s");
    }
}
