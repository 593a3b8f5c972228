use std::sync::Arc;

use anyhow::Result;

use crate::capture::{CaptureController, CaptureSummary, Frame, FrameSource, GateStats};
use crate::db::{Database, Snapshot};
use crate::detection::{Detector, FilteredDetector};
use crate::error::PipelineError;
use crate::overlay::{GeometryMapper, OverlayState, ViewSize};
use crate::pipeline::{Delivery, DetectionPipeline, OverlayPresenter, ProcessedFrame};
use crate::settings::PipelineSettings;
use crate::snapshot::SnapshotComposer;

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

/// A running detection screen: capture feeds the pipeline, the render
/// context pumps results into the overlay, and snapshots freeze what is
/// currently shown.
pub struct DetectionSession {
    pipeline: Arc<DetectionPipeline>,
    presenter: OverlayPresenter,
    composer: SnapshotComposer,
    capture: CaptureController,
}

impl DetectionSession {
    /// Must be called from inside a tokio runtime. `detector` is the raw
    /// backend; the configured confidence and IoU thresholds are applied to
    /// its output before anything reaches the overlay.
    pub fn new(
        settings: &PipelineSettings,
        detector: Arc<dyn Detector>,
        db: Database,
        view: ViewSize,
    ) -> Result<Self, PipelineError> {
        settings.validate()?;

        let filtered = FilteredDetector::new(detector, settings.thresholds())?;
        let (pipeline, outcomes) = DetectionPipeline::on_current_runtime(
            settings.frame_interval,
            settings.inference_timeout(),
            Arc::new(filtered),
        )?;
        let mapper = GeometryMapper::new(settings.capture_aspect, view);

        Ok(Self {
            pipeline: Arc::new(pipeline),
            presenter: OverlayPresenter::new(settings.slot_count, mapper, outcomes),
            composer: SnapshotComposer::new(db, settings.thumbnail_edge),
            capture: CaptureController::new(),
        })
    }

    /// Push a single frame, for hosts that own their own capture callback.
    pub fn deliver(&self, frame: Frame) -> Delivery {
        self.pipeline.deliver(frame)
    }

    pub fn start_capture<S: FrameSource>(&mut self, source: S) -> Result<()> {
        self.capture.start(source, Arc::clone(&self.pipeline))
    }

    pub async fn stop_capture(&mut self) -> Result<Option<CaptureSummary>> {
        self.capture.stop().await
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.is_running()
    }

    /// Render-context step: apply whatever results are ready.
    pub fn pump(&mut self) -> usize {
        self.presenter.pump()
    }

    pub async fn next_update(&mut self) -> Option<u64> {
        self.presenter.next_update().await
    }

    pub fn resize_view(&mut self, view: ViewSize) {
        self.presenter.resize(view);
    }

    pub fn overlay(&self) -> &OverlayState {
        self.presenter.overlay()
    }

    pub fn presenter(&self) -> &OverlayPresenter {
        &self.presenter
    }

    pub fn current(&self) -> Option<&ProcessedFrame> {
        self.presenter.current()
    }

    pub fn gate_stats(&self) -> GateStats {
        self.pipeline.stats()
    }

    /// Persist the frame and detections currently on screen.
    pub async fn take_snapshot(&self) -> Result<Snapshot, PipelineError> {
        let result = self.composer.commit(self.presenter.current().cloned()).await;
        if let Err(err) = &result {
            if err.is_fatal() {
                log_error!("snapshot failed: {err}");
            }
        }
        result
    }
}

/// Whether live detection could be brought up. A configuration problem
/// disables the feature instead of taking the host down.
pub enum DetectionFeature {
    Ready(Box<DetectionSession>),
    Unavailable { reason: String },
}

impl DetectionFeature {
    pub fn initialize<F>(
        settings: &PipelineSettings,
        db: Database,
        view: ViewSize,
        build_detector: F,
    ) -> Self
    where
        F: FnOnce(&PipelineSettings) -> Result<Arc<dyn Detector>, PipelineError>,
    {
        let session = settings
            .validate()
            .and_then(|()| build_detector(settings))
            .and_then(|detector| DetectionSession::new(settings, detector, db, view));

        match session {
            Ok(session) => {
                log_info!(
                    "detection ready (interval {}, {} slots)",
                    settings.frame_interval,
                    settings.slot_count
                );
                DetectionFeature::Ready(Box::new(session))
            }
            Err(err) => {
                log_error!("detection unavailable: {err}");
                DetectionFeature::Unavailable {
                    reason: err.to_string(),
                }
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, DetectionFeature::Ready(_))
    }

    pub fn session_mut(&mut self) -> Option<&mut DetectionSession> {
        match self {
            DetectionFeature::Ready(session) => Some(&mut **session),
            DetectionFeature::Unavailable { .. } => None,
        }
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            DetectionFeature::Ready(_) => None,
            DetectionFeature::Unavailable { reason } => Some(reason.as_str()),
        }
    }
}
