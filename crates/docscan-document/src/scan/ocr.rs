// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pure-Rust recognizer backed by `ocrs`.
//
// # Feature Gate
//
// Only compiled with the `ocrs` feature:
//
// ```toml
// docscan-document = { path = "crates/docscan-document", features = ["ocrs"] }
// ```
//
// # Model Setup
//
// The engine needs two model files in `$XDG_CACHE_HOME/ocrs` (typically
// `~/.cache/ocrs`):
//
// - `text-detection.rten` locates text regions.
// - `text-recognition.rten` decodes characters from each region.
//
// Running `ocrs-cli` once downloads both. Models load on the first scan, so
// a missing model is reported as an unavailable engine in the scan result
// rather than at startup.
//
// The models are English-only and take no mode string; both arguments are
// accepted and ignored.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use ocrs::{ImageSource, OcrEngine, OcrEngineParams};
use rten::Model;
use tracing::{debug, info, instrument, warn};

use docscan_core::error::{DocscanError, Result};

use crate::scan::recognize::Recognizer;
use crate::scan::staging::EnhancedImage;

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// `$XDG_CACHE_HOME/ocrs`, falling back to `~/.cache/ocrs`.
fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Recognizer running the `ocrs` neural models in-process.
pub struct OcrsRecognizer {
    model_dir: PathBuf,
    engine: OnceLock<OcrEngine>,
}

impl OcrsRecognizer {
    /// Models are looked up in `dir` when first needed.
    pub fn from_model_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: dir.into(),
            engine: OnceLock::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::from_model_dir(default_model_dir())
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// Load the models on first use. A failed load is not cached, so
    /// installing the models fixes the next scan without a restart.
    fn engine(&self) -> Result<&OcrEngine> {
        if let Some(engine) = self.engine.get() {
            return Ok(engine);
        }
        let loaded = load_engine(&self.model_dir)?;
        Ok(self.engine.get_or_init(|| loaded))
    }
}

impl Recognizer for OcrsRecognizer {
    fn name(&self) -> &str {
        "ocrs"
    }

    #[instrument(skip_all, fields(
        width = image.image().width(),
        height = image.image().height(),
    ))]
    fn recognize(&self, image: &EnhancedImage, language: &str, _mode: &str) -> Result<String> {
        if language != "eng" {
            warn!(language, "ocrs models are English-only; language ignored");
        }
        let engine = self.engine()?;

        // ocrs expects RGB8.
        let rgb = image.image().to_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            DocscanError::RecognitionFailed(format!(
                "failed to create image source ({width}x{height}): {err}"
            ))
        })?;
        let input = engine
            .prepare_input(source)
            .map_err(|err| DocscanError::RecognitionFailed(format!("OCR preprocessing failed: {err}")))?;
        let text = engine
            .get_text(&input)
            .map_err(|err| DocscanError::RecognitionFailed(format!("OCR text recognition failed: {err}")))?;

        debug!(
            line_count = text.lines().count(),
            char_count = text.len(),
            "OCR recognition complete"
        );
        Ok(text)
    }
}

#[instrument]
fn load_engine(model_dir: &Path) -> Result<OcrEngine> {
    let detection_path = model_dir.join(DETECTION_MODEL_FILENAME);
    let recognition_path = model_dir.join(RECOGNITION_MODEL_FILENAME);

    for path in [&detection_path, &recognition_path] {
        if !path.exists() {
            return Err(DocscanError::EngineUnavailable(format!(
                "ocrs model not found at {}; run `ocrs-cli` once to download models",
                path.display()
            )));
        }
    }

    info!("Loading OCR detection model");
    let detection_model = Model::load_file(&detection_path).map_err(|err| {
        DocscanError::EngineUnavailable(format!(
            "failed to load detection model from {}: {err}",
            detection_path.display()
        ))
    })?;

    info!("Loading OCR recognition model");
    let recognition_model = Model::load_file(&recognition_path).map_err(|err| {
        DocscanError::EngineUnavailable(format!(
            "failed to load recognition model from {}: {err}",
            recognition_path.display()
        ))
    })?;

    let engine = OcrEngine::new(OcrEngineParams {
        detection_model: Some(detection_model),
        recognition_model: Some(recognition_model),
        ..Default::default()
    })
    .map_err(|err| DocscanError::EngineUnavailable(format!("failed to initialise OCR engine: {err}")))?;

    info!("OCR engine initialised");
    Ok(engine)
}
