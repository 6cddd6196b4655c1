// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Single-flight scan orchestrator.
//
// At most one scan job runs at a time. `trigger_scan` performs the admission
// check-and-set under a short-lived lock and spawns the pipeline
// (capture -> enhance -> recognize -> publish) as a detached task. The only
// state the task shares with the orchestrator is the stage slot and the
// result slot it writes back to.
//
// # State
//
//   - `stage`  -- `Mutex<ScanStage>`, the single critical section. Anything
//                 but `Idle` means a job is in progress.
//   - `result` -- `watch` channel holding the last `ScanResult`. Readers
//                 always see a complete snapshot; the pipeline replaces it
//                 wholesale on completion.
//
// Every exit path of the pipeline (success, capture failure, recognition
// failure, task panic) publishes a result and returns the stage to `Idle`.
// The reset lives in `AdmissionGuard::drop` so that unwinding takes the same
// path.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::spawn_blocking;
use tracing::{Instrument, debug, info, info_span, warn};

use docscan_bridge::{CaptureRequest, FrameSource};
use docscan_core::error::DocscanError;
use docscan_core::types::{CameraStatus, JobId, Resolution, ScanResult, ScanStage, ScanStatus};
use docscan_core::ScannerConfig;
use docscan_document::{EnhancedImage, Recognizer, enhance};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Per-scan parameters, fixed for the lifetime of the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSettings {
    pub device_index: u32,
    pub resolution: Resolution,
    pub warm_up_frames: u32,
    pub warm_up_interval: Duration,
    pub capture_timeout: Duration,
    pub language: String,
    pub mode: String,
    pub empty_text_placeholder: String,
    /// Where the enhanced image is staged for the recognizer.
    pub scratch_dir: PathBuf,
}

impl From<&ScannerConfig> for ScanSettings {
    fn from(config: &ScannerConfig) -> Self {
        Self {
            device_index: config.camera_index,
            resolution: config.resolution,
            warm_up_frames: config.warm_up_frames,
            warm_up_interval: config.warm_up_interval(),
            capture_timeout: config.capture_timeout(),
            language: config.ocr_language.clone(),
            mode: config.ocr_mode.clone(),
            empty_text_placeholder: config.empty_text_placeholder.clone(),
            scratch_dir: config.scratch_dir(),
        }
    }
}

impl ScanSettings {
    fn capture_request(&self) -> CaptureRequest {
        CaptureRequest {
            device_index: self.device_index,
            resolution: self.resolution,
            warm_up_frames: self.warm_up_frames,
            warm_up_interval: self.warm_up_interval,
            timeout: self.capture_timeout,
        }
    }
}

// ---------------------------------------------------------------------------
// Admission
// ---------------------------------------------------------------------------

/// Outcome of a scan trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A new job was admitted and is running in the background.
    Started(JobId),
    /// A job was already in progress; nothing was started.
    AlreadyRunning,
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Started(_))
    }
}

/// How a pipeline run failed. The `Display` text is what gets published.
#[derive(Debug, Error)]
enum PipelineError {
    #[error("capture failed: {0}")]
    Capture(DocscanError),

    #[error("recognition failed: {0}")]
    Recognition(DocscanError),

    #[error("unexpected error: {0}")]
    Internal(DocscanError),
}

impl PipelineError {
    fn cause(&self) -> &DocscanError {
        match self {
            Self::Capture(e) | Self::Recognition(e) | Self::Internal(e) => e,
        }
    }

    fn internal(detail: impl std::fmt::Display) -> Self {
        Self::Internal(DocscanError::InternalFault(detail.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

struct Shared {
    frames: Arc<dyn FrameSource>,
    recognizer: Arc<dyn Recognizer>,
    settings: ScanSettings,
    stage: Mutex<ScanStage>,
    result: watch::Sender<ScanResult>,
}

impl Shared {
    /// The guarded value is a plain enum, so a poisoned lock is still usable.
    fn lock_stage(&self) -> MutexGuard<'_, ScanStage> {
        self.stage.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owns the scan job state and composes the camera, enhancer and recognizer
/// into one pipeline run per admitted trigger.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct ScanOrchestrator {
    shared: Arc<Shared>,
}

impl ScanOrchestrator {
    pub fn new(
        frames: Arc<dyn FrameSource>,
        recognizer: Arc<dyn Recognizer>,
        settings: ScanSettings,
    ) -> Self {
        let (result, _) = watch::channel(ScanResult::default());
        Self {
            shared: Arc::new(Shared {
                frames,
                recognizer,
                settings,
                stage: Mutex::new(ScanStage::Idle),
                result,
            }),
        }
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.shared.settings
    }

    /// Admit a new scan unless one is already running.
    ///
    /// The lock is held only for the check-and-set; the pipeline runs on a
    /// spawned task, so this returns immediately. Must be called from within
    /// a Tokio runtime.
    pub fn trigger_scan(&self) -> Admission {
        {
            let mut stage = self.shared.lock_stage();
            if stage.is_active() {
                info!(stage = ?*stage, "Scan rejected: already in progress");
                return Admission::AlreadyRunning;
            }
            *stage = ScanStage::Admitted;
        }

        let job = JobId::new();
        let guard = AdmissionGuard {
            shared: Arc::clone(&self.shared),
        };
        let span = info_span!("scan_job", job_id = %job);
        tokio::spawn(run_job(guard).instrument(span));

        info!(job_id = %job, "Scan admitted");
        Admission::Started(job)
    }

    /// Live camera probe plus the in-progress flag.
    ///
    /// The probe runs on the blocking pool and is never cached.
    pub async fn get_status(&self) -> ScanStatus {
        let frames = Arc::clone(&self.shared.frames);
        let device_index = self.shared.settings.device_index;
        let resolution = self.shared.settings.resolution;

        let camera = match spawn_blocking(move || frames.is_available(device_index)).await {
            Ok(true) => CameraStatus::online(resolution),
            Ok(false) => CameraStatus::offline(),
            Err(e) => {
                warn!(error = %e, "Camera probe aborted");
                CameraStatus::probe_error(e.to_string())
            }
        };

        ScanStatus {
            camera,
            in_progress: self.in_progress(),
        }
    }

    /// Snapshot of the most recently published result.
    pub fn get_last_result(&self) -> ScanResult {
        self.shared.result.borrow().clone()
    }

    pub fn in_progress(&self) -> bool {
        self.stage().is_active()
    }

    pub fn stage(&self) -> ScanStage {
        *self.shared.lock_stage()
    }

    /// Receiver that is notified every time a result is published.
    pub fn subscribe(&self) -> watch::Receiver<ScanResult> {
        self.shared.result.subscribe()
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Holds the admission for one job. Dropping it reopens admission.
struct AdmissionGuard {
    shared: Arc<Shared>,
}

impl AdmissionGuard {
    fn enter(&self, stage: ScanStage) {
        *self.shared.lock_stage() = stage;
        debug!(?stage, "Scan stage");
    }
}

impl Drop for AdmissionGuard {
    fn drop(&mut self) {
        *self.shared.lock_stage() = ScanStage::Idle;
        debug!("Scan slot released");
    }
}

async fn run_job(guard: AdmissionGuard) {
    let result = match run_pipeline(&guard).await {
        Ok(text) => {
            info!(chars = text.len(), "Scan complete");
            ScanResult::succeeded(text)
        }
        Err(e) => {
            let cause = e.cause();
            warn!(
                error = %e,
                capture_error = cause.is_capture_error(),
                engine_unavailable = cause.is_engine_unavailable(),
                "Scan failed"
            );
            ScanResult::failed(e.to_string())
        }
    };

    guard.enter(ScanStage::Publishing);
    guard.shared.result.send_replace(result);
    // `guard` drops here and the stage returns to `Idle`.
}

async fn run_pipeline(guard: &AdmissionGuard) -> Result<String, PipelineError> {
    let shared = &guard.shared;
    let settings = &shared.settings;

    guard.enter(ScanStage::Capturing);
    let frames = Arc::clone(&shared.frames);
    let request = settings.capture_request();
    let frame = blocking(move || frames.capture(&request))
        .await?
        .map_err(PipelineError::Capture)?;
    debug!(width = frame.width(), height = frame.height(), "Frame captured");

    guard.enter(ScanStage::Enhancing);
    let scratch_dir = settings.scratch_dir.clone();
    let image = frame.into_image();
    let staged = blocking(move || EnhancedImage::stage(enhance(&image), &scratch_dir))
        .await?
        .map_err(|e| PipelineError::internal(format!("failed to stage enhanced image: {e}")))?;

    guard.enter(ScanStage::Recognizing);
    let recognizer = Arc::clone(&shared.recognizer);
    let language = settings.language.clone();
    let mode = settings.mode.clone();
    let text = blocking(move || {
        let outcome = recognizer.recognize(&staged, &language, &mode);
        staged.discard();
        outcome
    })
    .await?
    .map_err(PipelineError::Recognition)?;

    let text = text.trim();
    if text.is_empty() {
        debug!("Recognizer returned no text");
        Ok(settings.empty_text_placeholder.clone())
    } else {
        Ok(text.to_string())
    }
}

/// Run a blocking step on the blocking pool. A panic in the step becomes an
/// internal fault.
async fn blocking<T, F>(step: F) -> Result<T, PipelineError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    spawn_blocking(step).await.map_err(PipelineError::internal)
}
