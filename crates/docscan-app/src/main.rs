// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Docscan — camera document scanner service.
//
// Entry point. Resolves configuration, initialises logging, wires the camera,
// enhancer and recognizer into the scan orchestrator, and serves the HTTP API
// until Ctrl-C or SIGTERM.

mod cli;
mod paths;
mod shutdown;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

use docscan_bridge::{FrameSource, frame_source};
use docscan_core::ScannerConfig;
use docscan_document::{Recognizer, build_recognizer};
use docscan_server::{HttpServer, ScanOrchestrator, ScanSettings};

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli, env_filter_or("info"), std::io::stdout)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter_or(&config.log_filter))
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Docscan starting");

    let frames: Arc<dyn FrameSource> = Arc::from(frame_source());
    let recognizer: Arc<dyn Recognizer> =
        Arc::from(build_recognizer(config.engine).context("recognition engine")?);
    recognizer
        .validate_mode(&config.ocr_mode)
        .context("invalid recognition mode")?;

    tracing::info!(
        camera_backend = frames.backend_name(),
        camera_index = config.camera_index,
        resolution = %config.resolution,
        recognizer = recognizer.name(),
        language = %config.ocr_language,
        mode = %config.ocr_mode,
        "scanner configured"
    );

    let orchestrator = ScanOrchestrator::new(frames, recognizer, ScanSettings::from(&config));

    let mut server = HttpServer::new(config.listen_addr());
    server
        .start(orchestrator)
        .await
        .context("failed to start HTTP server")?;

    shutdown::shutdown_signal().await;

    server.stop().await.context("failed to stop HTTP server")?;
    tracing::info!("Docscan stopped");
    Ok(())
}

/// `RUST_LOG` if set, otherwise `fallback`.
fn env_filter_or(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Load the configuration under a bootstrap subscriber. The configured log
/// filter is only known once loading is done.
fn resolve_config<W>(cli: &Cli, filter: EnvFilter, writer: W) -> Result<ScannerConfig>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .finish();
    tracing::subscriber::with_default(bootstrap, || cli.load_config())
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn config_loading_is_logged_before_logging_is_configured() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.json");
        std::fs::write(&file, r#"{"log_filter": "warn"}"#).unwrap();
        let cli = Cli::try_parse_from(["docscan", "--config", file.to_str().unwrap()]).unwrap();

        let captured = Captured::default();
        let sink = captured.clone();
        let config = resolve_config(&cli, EnvFilter::new("debug"), move || sink.clone()).unwrap();

        assert_eq!(config.log_filter, "warn");
        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("configuration loaded"), "{output}");
    }
}
