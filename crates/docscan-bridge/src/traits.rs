// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic camera contract.
//
// Calls are synchronous and may block for up to the capture deadline; async
// callers are expected to run them on the blocking pool.

use std::time::Duration;

use docscan_core::Resolution;
use docscan_core::error::Result;
use image::DynamicImage;

/// Parameters for a single capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    /// Device index (`/dev/videoN` on Linux).
    pub device_index: u32,
    /// Requested resolution. Best effort: the device may pick another.
    pub resolution: Resolution,
    /// Frames read and thrown away before the returned frame.
    pub warm_up_frames: u32,
    /// Pause after each warm-up frame.
    pub warm_up_interval: Duration,
    /// Deadline for the whole capture, warm-up included.
    pub timeout: Duration,
}

/// A single raw image sample from the camera.
///
/// Owned by the frame source until handed to the caller; never shared.
#[derive(Debug, Clone)]
pub struct Frame {
    image: DynamicImage,
}

impl Frame {
    pub fn new(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_image(self) -> DynamicImage {
        self.image
    }
}

/// A camera that can be probed and captured from.
pub trait FrameSource: Send + Sync {
    /// Human-readable backend name (e.g. "v4l2", "stub").
    fn backend_name(&self) -> &str;

    /// Open the device, attempt one read, close it again.
    ///
    /// Never leaves the device held open and never errors: every failure
    /// reads as `false`.
    fn is_available(&self, device_index: u32) -> bool;

    /// Capture one frame after discarding the warm-up frames.
    ///
    /// The device handle is released on every exit path.
    fn capture(&self, request: &CaptureRequest) -> Result<Frame>;
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, Luma};

    use super::*;

    #[test]
    fn frame_reports_dimensions_and_hands_over_pixels() {
        let frame = Frame::new(DynamicImage::ImageLuma8(GrayImage::from_pixel(7, 3, Luma([9]))));
        assert_eq!((frame.width(), frame.height()), (7, 3));

        let image = frame.into_image();
        assert_eq!(image.as_luma8().map(|g| g.get_pixel(6, 2).0[0]), Some(9));
    }
}
