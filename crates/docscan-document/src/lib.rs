// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docscan-document — Image side of the Docscan pipeline.
//
// Provides the fixed enhancement pipeline (grayscale, denoise, local contrast
// equalization, Otsu binarization), staging of the enhanced image in a
// scratch directory, and the text-recognition backends.

pub mod scan;

// Re-export the primary items so callers can use `docscan_document::enhance` etc.
pub use scan::enhance::{ScanEnhancer, enhance};
pub use scan::recognize::{Recognizer, build_recognizer};
pub use scan::staging::EnhancedImage;
pub use scan::tesseract::TesseractRecognizer;

#[cfg(feature = "ocrs")]
pub use scan::ocr::OcrsRecognizer;
