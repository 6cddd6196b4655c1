// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanner configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{DocscanError, Result};
use crate::types::Resolution;

/// Which text-recognition backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecognitionEngine {
    /// System `tesseract` binary.
    #[default]
    Tesseract,
    /// Pure-Rust `ocrs` engine (requires the `ocrs` feature).
    Ocrs,
}

impl std::str::FromStr for RecognitionEngine {
    type Err = DocscanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tesseract" => Ok(Self::Tesseract),
            "ocrs" => Ok(Self::Ocrs),
            other => Err(DocscanError::Config(format!(
                "unknown recognition engine `{other}` (expected `tesseract` or `ocrs`)"
            ))),
        }
    }
}

/// Application settings. Purely in-memory state is never written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Camera device index (`/dev/videoN`).
    pub camera_index: u32,
    /// Requested capture resolution; the device may not honour it.
    pub resolution: Resolution,
    /// Frames discarded before the real capture so exposure can settle.
    pub warm_up_frames: u32,
    /// Pause between warm-up frames, in milliseconds.
    pub warm_up_interval_ms: u64,
    /// Overall capture deadline, in seconds.
    pub capture_timeout_secs: u64,
    /// Recognition language code(s), e.g. `eng` or `eng+deu`.
    pub ocr_language: String,
    /// Recognition mode string, e.g. `--psm 6`.
    pub ocr_mode: String,
    pub engine: RecognitionEngine,
    /// Text published when recognition succeeds but finds nothing.
    pub empty_text_placeholder: String,
    /// Directory for the staged enhanced image; system temp dir when unset.
    pub scratch_dir: Option<PathBuf>,
    pub host: IpAddr,
    pub port: u16,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            camera_index: 0,
            resolution: Resolution::new(1920, 1080),
            warm_up_frames: 5,
            warm_up_interval_ms: 100,
            capture_timeout_secs: 30,
            ocr_language: "eng".into(),
            ocr_mode: "--psm 6".into(),
            engine: RecognitionEngine::Tesseract,
            empty_text_placeholder: "No text detected".into(),
            scratch_dir: None,
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 5000,
            log_filter: "info".into(),
        }
    }
}

impl ScannerConfig {
    /// Read a JSON config file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no configuration file; using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Check the values that would otherwise only fail mid-scan.
    ///
    /// Recognition mode strings are engine-specific and are checked by the
    /// recognizer when it is built.
    pub fn validate(&self) -> Result<()> {
        if self.resolution.width == 0 || self.resolution.height == 0 {
            return Err(DocscanError::Config(format!(
                "resolution must be non-zero, got {}",
                self.resolution
            )));
        }
        if self.capture_timeout_secs == 0 {
            return Err(DocscanError::Config(
                "capture timeout must be at least one second".into(),
            ));
        }
        validate_language(&self.ocr_language)?;
        if self.empty_text_placeholder.trim().is_empty() {
            return Err(DocscanError::Config(
                "empty-text placeholder must not be blank".into(),
            ));
        }
        Ok(())
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_secs(self.capture_timeout_secs)
    }

    pub fn warm_up_interval(&self) -> Duration {
        Duration::from_millis(self.warm_up_interval_ms)
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Scratch directory for staged images.
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Language codes are passed to an external engine, so only plain
/// identifiers joined by `+` are accepted.
fn validate_language(language: &str) -> Result<()> {
    let valid = !language.is_empty()
        && language.split('+').all(|code| {
            !code.is_empty() && code.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if valid {
        Ok(())
    } else {
        Err(DocscanError::Config(format!(
            "invalid recognition language `{language}`"
        )))
    }
}
