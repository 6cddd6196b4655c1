// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line interface.
//
// Settings are layered: built-in defaults, then the JSON config file, then
// any flag or `DOCSCAN_*` environment variable given here.

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use docscan_core::{RecognitionEngine, Resolution, ScannerConfig};

use crate::paths::default_config_path;

/// Camera document scanner with a pollable HTTP API.
#[derive(Debug, Parser)]
#[command(name = "docscan", version, about)]
pub struct Cli {
    /// JSON config file. Defaults to `$XDG_CONFIG_HOME/docscan/config.json`.
    #[arg(short, long, env = "DOCSCAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Camera device index (`/dev/videoN`).
    #[arg(long, env = "DOCSCAN_CAMERA")]
    pub camera: Option<u32>,

    /// Requested capture resolution, e.g. `1920x1080`.
    #[arg(long, env = "DOCSCAN_RESOLUTION", value_parser = parse_resolution)]
    pub resolution: Option<Resolution>,

    /// Capture deadline in seconds.
    #[arg(long, env = "DOCSCAN_CAPTURE_TIMEOUT")]
    pub capture_timeout: Option<u64>,

    /// Recognition language, e.g. `eng` or `eng+deu`.
    #[arg(long, env = "DOCSCAN_LANGUAGE")]
    pub language: Option<String>,

    /// Recognition mode, e.g. `--psm 6`.
    #[arg(long, env = "DOCSCAN_OCR_MODE", allow_hyphen_values = true)]
    pub ocr_mode: Option<String>,

    /// Recognition engine: `tesseract` or `ocrs`.
    #[arg(long, env = "DOCSCAN_ENGINE")]
    pub engine: Option<RecognitionEngine>,

    /// Directory for the staged enhanced image.
    #[arg(long, env = "DOCSCAN_SCRATCH_DIR")]
    pub scratch_dir: Option<PathBuf>,

    /// Listen address.
    #[arg(long, env = "DOCSCAN_HOST")]
    pub host: Option<IpAddr>,

    /// Listen port.
    #[arg(short, long, env = "DOCSCAN_PORT")]
    pub port: Option<u16>,
}

impl Cli {
    /// Resolve the effective configuration and validate it.
    ///
    /// A missing default config file is fine; an explicitly named one must
    /// exist and parse.
    pub fn load_config(&self) -> Result<ScannerConfig> {
        let mut config = match &self.config {
            Some(path) => ScannerConfig::load(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?,
            None => {
                let path = default_config_path();
                ScannerConfig::load_or_default(&path)
                    .with_context(|| format!("failed to read config file {}", path.display()))?
            }
        };

        self.apply_overrides(&mut config);
        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut ScannerConfig) {
        if let Some(camera) = self.camera {
            config.camera_index = camera;
        }
        if let Some(resolution) = self.resolution {
            config.resolution = resolution;
        }
        if let Some(timeout) = self.capture_timeout {
            config.capture_timeout_secs = timeout;
        }
        if let Some(language) = &self.language {
            config.ocr_language = language.clone();
        }
        if let Some(mode) = &self.ocr_mode {
            config.ocr_mode = mode.clone();
        }
        if let Some(engine) = self.engine {
            config.engine = engine;
        }
        if let Some(dir) = &self.scratch_dir {
            config.scratch_dir = Some(dir.clone());
        }
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
    }
}

fn parse_resolution(value: &str) -> std::result::Result<Resolution, String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got `{value}`"))?;
    let width = width.trim().parse().map_err(|_| format!("bad width in `{value}`"))?;
    let height = height.trim().parse().map_err(|_| format!("bad height in `{value}`"))?;
    Ok(Resolution::new(width, height))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"camera_index": 1, "port": 8080, "ocr_language": "deu"}}"#).unwrap();
        let path = file.path().to_str().unwrap();

        let cli = Cli::try_parse_from([
            "docscan",
            "--config",
            path,
            "--port",
            "9000",
            "--resolution",
            "1280x720",
            "--ocr-mode",
            "--psm 4",
        ])
        .unwrap();
        let config = cli.load_config().unwrap();

        assert_eq!(config.camera_index, 1);
        assert_eq!(config.ocr_language, "deu");
        assert_eq!(config.port, 9000);
        assert_eq!(config.resolution, Resolution::new(1280, 720));
        assert_eq!(config.ocr_mode, "--psm 4");
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        let cli = Cli::try_parse_from(["docscan", "--config", missing.to_str().unwrap()]).unwrap();
        assert!(cli.load_config().is_err());
    }

    #[test]
    fn invalid_override_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.json");
        std::fs::write(&file, "{}").unwrap();
        let cli = Cli::try_parse_from([
            "docscan",
            "--config",
            file.to_str().unwrap(),
            "--capture-timeout",
            "0",
        ])
        .unwrap();
        let err = cli.load_config().unwrap_err();
        assert!(format!("{err:#}").contains("capture timeout"), "{err:#}");
    }

    #[test]
    fn engine_flag_parses() {
        let cli = Cli::try_parse_from(["docscan", "--engine", "ocrs"]).unwrap();
        assert_eq!(cli.engine, Some(RecognitionEngine::Ocrs));
        assert!(Cli::try_parse_from(["docscan", "--engine", "gocr"]).is_err());
    }

    #[test]
    fn resolution_parser() {
        assert_eq!(parse_resolution("640x480").unwrap(), Resolution::new(640, 480));
        assert_eq!(parse_resolution("800X600").unwrap(), Resolution::new(800, 600));
        assert!(parse_resolution("640").is_err());
        assert!(parse_resolution("axb").is_err());
    }
}
