// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text-recognition contract and backend selection.

use docscan_core::RecognitionEngine;
use docscan_core::error::Result;

use crate::scan::staging::EnhancedImage;
use crate::scan::tesseract::TesseractRecognizer;

/// A text-recognition engine.
///
/// Calls are stateless and blocking. The caller owns the image for the
/// duration of the call and disposes of it afterwards.
pub trait Recognizer: Send + Sync {
    /// Short backend name for logs and diagnostics.
    fn name(&self) -> &str;

    /// Check a mode string before any scan runs.
    fn validate_mode(&self, _mode: &str) -> Result<()> {
        Ok(())
    }

    /// Recognize the text in `image`.
    ///
    /// Returns `EngineUnavailable` when the engine is missing or misconfigured
    /// and `RecognitionFailed` when it ran but failed on this input.
    fn recognize(&self, image: &EnhancedImage, language: &str, mode: &str) -> Result<String>;
}

/// Build the recognizer selected by `engine`.
pub fn build_recognizer(engine: RecognitionEngine) -> Result<Box<dyn Recognizer>> {
    match engine {
        RecognitionEngine::Tesseract => Ok(Box::new(TesseractRecognizer::new())),
        #[cfg(feature = "ocrs")]
        RecognitionEngine::Ocrs => Ok(Box::new(crate::scan::ocr::OcrsRecognizer::with_defaults())),
        #[cfg(not(feature = "ocrs"))]
        RecognitionEngine::Ocrs => Err(docscan_core::DocscanError::Config(
            "the `ocrs` engine is not compiled in (rebuild with the `ocrs` feature)".into(),
        )),
    }
}
