// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Embedded HTTP server lifecycle.
//
// `start` binds the listener and serves the router on a spawned task;
// `stop` signals graceful shutdown and waits for in-flight requests to
// finish. A scan job that is still running is not affected by `stop`.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use docscan_core::error::{DocscanError, Result};
use docscan_core::types::ServerStatus;

use crate::http::router;
use crate::orchestrator::ScanOrchestrator;

/// HTTP server for the scanner endpoints.
pub struct HttpServer {
    /// Address to bind. Port 0 picks a free port.
    addr: SocketAddr,
    status: ServerStatus,
    /// Address actually bound, once running.
    local_addr: Option<SocketAddr>,
    shutdown_signal: Arc<Notify>,
    task_handle: Option<JoinHandle<()>>,
}

impl HttpServer {
    /// Create a server for `addr` in the `Stopped` state.
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            status: ServerStatus::Stopped,
            local_addr: None,
            shutdown_signal: Arc::new(Notify::new()),
            task_handle: None,
        }
    }

    pub fn status(&self) -> ServerStatus {
        self.status
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Bind and start serving. A second call while running is a no-op.
    pub async fn start(&mut self, orchestrator: ScanOrchestrator) -> Result<()> {
        if self.status == ServerStatus::Running {
            debug!(addr = %self.addr, "HTTP server already running");
            return Ok(());
        }

        self.status = ServerStatus::Starting;

        let listener = match TcpListener::bind(self.addr).await {
            Ok(listener) => listener,
            Err(e) => {
                self.status = ServerStatus::Error;
                return Err(DocscanError::Server(format!("bind {}: {e}", self.addr)));
            }
        };
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, "HTTP server listening");

        let app = router(orchestrator);
        let shutdown = Arc::clone(&self.shutdown_signal);

        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.notified().await })
                .await;
            if let Err(e) = served {
                error!(error = %e, "HTTP server terminated with an error");
            }
        });

        self.local_addr = Some(local_addr);
        self.task_handle = Some(handle);
        self.status = ServerStatus::Running;
        Ok(())
    }

    /// Stop accepting connections and wait for open requests to complete.
    pub async fn stop(&mut self) -> Result<()> {
        if self.status != ServerStatus::Running {
            return Ok(());
        }

        info!(addr = ?self.local_addr, "stopping HTTP server");

        // `notify_one` stores a permit, so a shutdown future that has not
        // been polled yet still sees it.
        self.shutdown_signal.notify_one();

        if let Some(handle) = self.task_handle.take() {
            handle
                .await
                .map_err(|e| DocscanError::Server(format!("task join: {e}")))?;
        }

        self.status = ServerStatus::Stopped;
        self.local_addr = None;
        info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use docscan_bridge::frame_source;
    use docscan_core::ScannerConfig;
    use docscan_document::TesseractRecognizer;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    use super::*;
    use crate::orchestrator::ScanSettings;

    fn orchestrator() -> ScanOrchestrator {
        ScanOrchestrator::new(
            Arc::from(frame_source()),
            Arc::new(TesseractRecognizer::new()),
            ScanSettings::from(&ScannerConfig::default()),
        )
    }

    fn loopback() -> SocketAddr {
        (Ipv4Addr::LOCALHOST, 0).into()
    }

    #[test]
    fn new_server_is_stopped() {
        let server = HttpServer::new(loopback());
        assert_eq!(server.status(), ServerStatus::Stopped);
        assert_eq!(server.local_addr(), None);
    }

    #[tokio::test]
    async fn serves_health_over_tcp_and_stops() {
        let mut server = HttpServer::new(loopback());
        server.start(orchestrator()).await.unwrap();
        assert_eq!(server.status(), ServerStatus::Running);
        let addr = server.local_addr().unwrap();
        assert_ne!(addr.port(), 0);

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert!(response.contains(r#""status":"healthy""#), "{response}");

        server.stop().await.unwrap();
        assert_eq!(server.status(), ServerStatus::Stopped);
        assert!(TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn start_is_idempotent_and_stop_without_start_is_noop() {
        let mut server = HttpServer::new(loopback());
        server.stop().await.unwrap();

        server.start(orchestrator()).await.unwrap();
        let addr = server.local_addr();
        server.start(orchestrator()).await.unwrap();
        assert_eq!(server.local_addr(), addr);

        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn bind_conflict_reports_error_status() {
        let holder = std::net::TcpListener::bind(loopback()).unwrap();
        let taken = holder.local_addr().unwrap();

        let mut server = HttpServer::new(taken);
        let err = server.start(orchestrator()).await.unwrap_err();
        assert!(matches!(err, DocscanError::Server(_)));
        assert_eq!(server.status(), ServerStatus::Error);
    }
}
