// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub frame source for builds without a camera backend.
//
// The camera always reads as offline and every capture fails with
// `DeviceUnavailable`. The real implementation lives in the `v4l2` module.

use docscan_core::error::{DocscanError, Result};

use crate::traits::{CaptureRequest, Frame, FrameSource};

/// No-op frame source returned when no camera backend is compiled in.
#[derive(Debug, Default)]
pub struct StubFrameSource;

impl FrameSource for StubFrameSource {
    fn backend_name(&self) -> &str {
        "stub"
    }

    fn is_available(&self, device_index: u32) -> bool {
        tracing::debug!(device_index, "FrameSource::is_available called on stub backend");
        false
    }

    fn capture(&self, request: &CaptureRequest) -> Result<Frame> {
        tracing::warn!(
            device_index = request.device_index,
            "FrameSource::capture called on stub backend"
        );
        Err(DocscanError::DeviceUnavailable(format!(
            "could not open camera {}: no camera backend compiled in (rebuild with the `v4l2` feature)",
            request.device_index
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use docscan_core::Resolution;

    use super::*;

    #[test]
    fn stub_is_never_available() {
        assert!(!StubFrameSource.is_available(0));
        assert!(!StubFrameSource.is_available(7));
    }

    #[test]
    fn stub_capture_reports_device_unavailable() {
        let request = CaptureRequest {
            device_index: 3,
            resolution: Resolution::new(640, 480),
            warm_up_frames: 5,
            warm_up_interval: Duration::from_millis(100),
            timeout: Duration::from_secs(1),
        };
        let err = StubFrameSource.capture(&request).unwrap_err();
        assert!(matches!(err, DocscanError::DeviceUnavailable(_)));
        assert!(err.to_string().contains("camera 3"));
    }
}
