// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tesseract recognizer.
//
// Drives the system `tesseract` binary through `rusty-tesseract`. The engine
// reads the staged PNG from disk; mode strings use the tesseract command-line
// spelling (`--psm 6`, `--oem 1`, `--dpi 300`, `-c key=value`).

use std::collections::HashMap;

use rusty_tesseract::{Args, Image, TessError};
use tracing::{debug, info, instrument};

use docscan_core::error::{DocscanError, Result};

use crate::scan::recognize::Recognizer;
use crate::scan::staging::EnhancedImage;

/// Shown when the `tesseract` binary cannot be found.
pub const INSTALL_HINT: &str =
    "Tesseract OCR not installed. Please run: sudo apt install tesseract-ocr";

/// Marker tesseract prints when a traineddata file is missing.
const MISSING_LANGUAGE: &str = "Failed loading language";

/// Recognizer backed by the system `tesseract` binary.
#[derive(Debug, Default)]
pub struct TesseractRecognizer;

impl TesseractRecognizer {
    pub fn new() -> Self {
        Self
    }
}

impl Recognizer for TesseractRecognizer {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn validate_mode(&self, mode: &str) -> Result<()> {
        TesseractMode::parse(mode).map(|_| ())
    }

    #[instrument(skip(self, image), fields(path = %image.path().display()))]
    fn recognize(&self, image: &EnhancedImage, language: &str, mode: &str) -> Result<String> {
        let version = rusty_tesseract::get_tesseract_version().map_err(|e| match e {
            TessError::TesseractNotFoundError => DocscanError::EngineUnavailable(INSTALL_HINT.into()),
            other => DocscanError::EngineUnavailable(other.to_string()),
        })?;
        debug!(version = version.trim(), "Tesseract found");

        if !image.path().exists() {
            return Err(DocscanError::RecognitionFailed("image file not found".into()));
        }

        let args = TesseractMode::parse(mode)?.into_args(language);
        let input = Image::from_path(image.path())
            .map_err(|e| DocscanError::RecognitionFailed(e.to_string()))?;

        let text = rusty_tesseract::image_to_string(&input, &args)
            .map_err(|e| classify_failure(&e, language))?;

        info!(chars = text.len(), "Tesseract recognition complete");
        Ok(text)
    }
}

/// Missing language data is an installation problem, not a bad input.
fn classify_failure(err: &TessError, language: &str) -> DocscanError {
    let detail = format!("{err:?}");
    if detail.contains(MISSING_LANGUAGE) {
        DocscanError::EngineUnavailable(format!(
            "Tesseract language data for `{language}` is not installed"
        ))
    } else {
        DocscanError::RecognitionFailed(err.to_string())
    }
}

/// Parsed form of a tesseract mode string.
#[derive(Debug, Default, PartialEq, Eq)]
struct TesseractMode {
    psm: Option<i32>,
    oem: Option<i32>,
    dpi: Option<i32>,
    variables: HashMap<String, String>,
}

impl TesseractMode {
    fn parse(mode: &str) -> Result<Self> {
        let mut parsed = Self::default();
        let mut tokens = mode.split_whitespace();

        while let Some(token) = tokens.next() {
            let (flag, inline) = match token.split_once('=') {
                Some((flag, value)) if flag.starts_with("--") => (flag, Some(value)),
                _ => (token, None),
            };
            let mut value = |name: &str| {
                inline
                    .or_else(|| tokens.next())
                    .ok_or_else(|| DocscanError::Config(format!("`{name}` needs a value")))
            };

            match flag {
                "--psm" => parsed.psm = Some(number("--psm", value("--psm")?)?),
                "--oem" => parsed.oem = Some(number("--oem", value("--oem")?)?),
                "--dpi" => parsed.dpi = Some(number("--dpi", value("--dpi")?)?),
                "-c" => {
                    let assignment = value("-c")?;
                    let (key, val) = assignment.split_once('=').ok_or_else(|| {
                        DocscanError::Config(format!("`-c {assignment}` is not key=value"))
                    })?;
                    parsed.variables.insert(key.to_string(), val.to_string());
                }
                other => {
                    return Err(DocscanError::Config(format!(
                        "unsupported recognition mode option `{other}`"
                    )));
                }
            }
        }
        Ok(parsed)
    }

    fn into_args(self, language: &str) -> Args {
        Args {
            lang: language.to_string(),
            config_variables: self.variables,
            dpi: self.dpi,
            psm: self.psm,
            oem: self.oem,
        }
    }
}

fn number(flag: &str, value: &str) -> Result<i32> {
    value
        .parse()
        .map_err(|_| DocscanError::Config(format!("`{flag}` expects a number, got `{value}`")))
}
