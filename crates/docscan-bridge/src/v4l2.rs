// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Video4Linux2 frame source (Linux USB webcams).
//
// Frames are pulled through a memory-mapped capture stream. MJPG is
// requested first because most UVC cameras only reach full resolution in a
// compressed format; YUYV is converted in software as a fallback.
//
// The `Device` and its `Stream` are plain RAII values, so every return path
// (including `?` propagation) closes the device.

use std::io;
use std::time::{Duration, Instant};

use image::{DynamicImage, ImageFormat, RgbImage};
use tracing::{debug, info, instrument, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, Format, FourCC};

use docscan_core::error::{DocscanError, Result};

use crate::traits::{CaptureRequest, Frame, FrameSource};

/// Number of mmap buffers queued with the driver.
const BUFFER_COUNT: u32 = 4;

/// Read timeout used by the availability probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

const MJPG: FourCC = FourCC { repr: *b"MJPG" };
const YUYV: FourCC = FourCC { repr: *b"YUYV" };

/// Frame source backed by `/dev/videoN`.
#[derive(Debug, Default)]
pub struct V4l2FrameSource;

impl V4l2FrameSource {
    pub fn new() -> Self {
        Self
    }
}

impl FrameSource for V4l2FrameSource {
    fn backend_name(&self) -> &str {
        "v4l2"
    }

    #[instrument(skip(self))]
    fn is_available(&self, device_index: u32) -> bool {
        match probe(device_index) {
            Ok(available) => available,
            Err(e) => {
                debug!(device_index, error = %e, "camera probe failed");
                false
            }
        }
    }

    #[instrument(skip(self), fields(
        device_index = request.device_index,
        resolution = %request.resolution,
    ))]
    fn capture(&self, request: &CaptureRequest) -> Result<Frame> {
        let deadline = Instant::now() + request.timeout;

        info!("initialising camera");
        let device = Device::new(request.device_index as usize).map_err(|e| {
            DocscanError::DeviceUnavailable(format!(
                "could not open camera {}: {e}",
                request.device_index
            ))
        })?;

        let format = negotiate_format(&device, request)?;
        let mut stream = Stream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT)
            .map_err(|e| DocscanError::CaptureFailed(format!("failed to start capture stream: {e}")))?;

        // Let auto-exposure and white balance converge.
        for i in 0..request.warm_up_frames {
            read_frame(&mut stream, deadline, request.timeout).map_err(|err| match err {
                DocscanError::CaptureTimeout { .. } => err,
                other => DocscanError::CaptureFailed(format!(
                    "failed to capture initial frames: {other}"
                )),
            })?;
            debug!(frame = i + 1, of = request.warm_up_frames, "warm-up frame discarded");
            std::thread::sleep(request.warm_up_interval);
        }

        let data = read_frame(&mut stream, deadline, request.timeout)?;
        let frame = Frame::new(decode_frame(&data, &format)?);
        info!(
            width = frame.width(),
            height = frame.height(),
            "image captured"
        );

        // `stream` and `device` drop here, releasing the camera.
        Ok(frame)
    }
}

/// Open the device, read one frame, close it.
fn probe(device_index: u32) -> io::Result<bool> {
    let device = Device::new(device_index as usize)?;
    let mut stream = Stream::with_buffers(&device, Type::VideoCapture, 1)?;
    stream.set_timeout(PROBE_TIMEOUT);
    let (buf, meta) = stream.next()?;
    Ok(!buf.is_empty() && meta.bytesused > 0)
}

/// Ask for MJPG at the requested size; keep whatever the driver settles on.
fn negotiate_format(device: &Device, request: &CaptureRequest) -> Result<Format> {
    let wanted = Format::new(request.resolution.width, request.resolution.height, MJPG);
    let actual = device.set_format(&wanted).or_else(|e| {
        warn!(error = %e, "driver rejected requested format; keeping current format");
        device.format()
    });
    let actual = actual
        .map_err(|e| DocscanError::CaptureFailed(format!("failed to query camera format: {e}")))?;

    if actual.width != request.resolution.width || actual.height != request.resolution.height {
        warn!(
            requested = %request.resolution,
            width = actual.width,
            height = actual.height,
            "camera did not honour requested resolution"
        );
    }
    if actual.fourcc != MJPG && actual.fourcc != YUYV {
        return Err(DocscanError::CaptureFailed(format!(
            "unsupported pixel format {}",
            actual.fourcc
        )));
    }
    Ok(actual)
}

/// Dequeue one buffer, copying out the used bytes.
fn read_frame(stream: &mut Stream<'_>, deadline: Instant, timeout: Duration) -> Result<Vec<u8>> {
    let remaining = deadline
        .checked_duration_since(Instant::now())
        .filter(|d| !d.is_zero())
        .ok_or(DocscanError::CaptureTimeout { timeout })?;
    stream.set_timeout(remaining);

    match stream.next() {
        Ok((buf, meta)) => {
            let used = (meta.bytesused as usize).min(buf.len());
            if used == 0 {
                return Err(DocscanError::CaptureFailed(
                    "failed to capture image frame: empty buffer".into(),
                ));
            }
            Ok(buf[..used].to_vec())
        }
        Err(e) if e.kind() == io::ErrorKind::TimedOut => {
            Err(DocscanError::CaptureTimeout { timeout })
        }
        Err(e) => Err(DocscanError::CaptureFailed(format!(
            "failed to capture image frame: {e}"
        ))),
    }
}

fn decode_frame(data: &[u8], format: &Format) -> Result<DynamicImage> {
    if format.fourcc == MJPG {
        image::load_from_memory_with_format(data, ImageFormat::Jpeg)
            .map_err(|e| DocscanError::CaptureFailed(format!("failed to decode MJPG frame: {e}")))
    } else {
        yuyv_to_rgb(data, format.width, format.height).map(DynamicImage::ImageRgb8)
    }
}

/// Convert packed YUYV 4:2:2 (BT.601, limited range) to RGB.
fn yuyv_to_rgb(data: &[u8], width: u32, height: u32) -> Result<RgbImage> {
    let expected = width as usize * height as usize * 2;
    if data.len() < expected || width % 2 != 0 {
        return Err(DocscanError::CaptureFailed(format!(
            "short YUYV frame: {} bytes for {width}x{height}",
            data.len()
        )));
    }

    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
    for chunk in data[..expected].chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        rgb.extend_from_slice(&yuv_pixel(y0, u, v));
        rgb.extend_from_slice(&yuv_pixel(y1, u, v));
    }

    RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| DocscanError::CaptureFailed("YUYV buffer size mismatch".into()))
}

fn yuv_pixel(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = (y as i32 - 16).max(0);
    let d = u as i32 - 128;
    let e = v as i32 - 128;
    let clamp = |x: i32| ((x + 128) >> 8).clamp(0, 255) as u8;
    [
        clamp(298 * c + 409 * e),
        clamp(298 * c - 100 * d - 208 * e),
        clamp(298 * c + 516 * d),
    ]
}
