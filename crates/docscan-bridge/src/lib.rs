// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docscan-bridge — Camera abstraction for the Docscan scanner.
//
// Defines the `FrameSource` contract and selects a backend at compile time:
// Video4Linux2 when the `v4l2` feature is enabled on Linux, otherwise a stub
// that always reports the camera offline.

pub mod traits;

#[cfg(all(feature = "v4l2", target_os = "linux"))]
pub mod v4l2;

#[cfg(not(all(feature = "v4l2", target_os = "linux")))]
pub mod stub;

pub use traits::{CaptureRequest, Frame, FrameSource};

/// Returns the frame source compiled into this build.
pub fn frame_source() -> Box<dyn FrameSource> {
    #[cfg(all(feature = "v4l2", target_os = "linux"))]
    {
        Box::new(v4l2::V4l2FrameSource::new())
    }
    #[cfg(not(all(feature = "v4l2", target_os = "linux")))]
    {
        Box::new(stub::StubFrameSource)
    }
}
