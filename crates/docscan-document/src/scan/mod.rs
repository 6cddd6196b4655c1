// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline — enhancement, staging, and optical character recognition.

pub mod enhance;
pub mod recognize;
pub mod staging;
pub mod tesseract;

#[cfg(feature = "ocrs")]
pub mod ocr;

pub use enhance::ScanEnhancer;
pub use recognize::Recognizer;
pub use staging::EnhancedImage;
