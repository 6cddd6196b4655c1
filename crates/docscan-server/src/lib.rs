// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Docscan Server — the single-flight scan orchestrator and the HTTP surface
// that triggers scans and publishes their results.  This crate composes the
// camera (`docscan-bridge`) with enhancement and recognition
// (`docscan-document`).

pub mod http;
pub mod orchestrator;
pub mod server;

pub use http::router;
pub use orchestrator::{Admission, ScanOrchestrator, ScanSettings};
pub use server::HttpServer;
