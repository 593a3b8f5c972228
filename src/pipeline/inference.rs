use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::capture::{Admission, Frame, FrameGate, GateStats, InferencePermit, InferenceState};
use crate::detection::{Detection, Detector};
use crate::error::PipelineError;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceStatus {
    Completed,
    /// Detector returned an error or panicked; counts as zero detections.
    Failed(String),
    /// Exceeded the configured timeout; the late result is discarded.
    TimedOut,
}

/// One finished inference, delivered to the render context in order.
#[derive(Debug, Clone)]
pub struct InferenceOutcome {
    pub frame: Frame,
    pub detections: Arc<[Detection]>,
    pub status: InferenceStatus,
    pub elapsed: Duration,
}

/// What happened to a delivered frame, without the permit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Admitted,
    SkippedInterval,
    SkippedBusy,
}

/// Capture-side half of the pipeline: gates frames and runs the detector
/// off the render context. Results leave through the outcome channel.
pub struct DetectionPipeline {
    gate: FrameGate,
    detector: Arc<dyn Detector>,
    outcomes: mpsc::UnboundedSender<InferenceOutcome>,
    timeout: Option<Duration>,
    runtime: Handle,
}

impl DetectionPipeline {
    pub fn new(
        frame_interval: u32,
        timeout: Option<Duration>,
        detector: Arc<dyn Detector>,
        runtime: Handle,
    ) -> (Self, mpsc::UnboundedReceiver<InferenceOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let pipeline = Self {
            gate: FrameGate::new(frame_interval),
            detector,
            outcomes: tx,
            timeout,
            runtime,
        };
        (pipeline, rx)
    }

    /// Like [`new`](Self::new) but bound to the runtime of the calling task.
    pub fn on_current_runtime(
        frame_interval: u32,
        timeout: Option<Duration>,
        detector: Arc<dyn Detector>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<InferenceOutcome>), PipelineError> {
        let runtime = Handle::try_current().map_err(|err| {
            PipelineError::configuration(format!("no async runtime available: {err}"))
        })?;
        Ok(Self::new(frame_interval, timeout, detector, runtime))
    }

    /// Entry point for the capture context. Never blocks; an admitted frame
    /// is handed to a spawned inference task.
    pub fn deliver(&self, frame: Frame) -> Delivery {
        match self.gate.on_frame(frame) {
            Admission::Admitted(permit) => {
                log_debug!("frame {} admitted", permit.frame().sequence);
                self.runtime.spawn(run_inference(
                    permit,
                    Arc::clone(&self.detector),
                    self.timeout,
                    self.outcomes.clone(),
                ));
                Delivery::Admitted
            }
            Admission::SkippedInterval => Delivery::SkippedInterval,
            Admission::SkippedBusy => Delivery::SkippedBusy,
        }
    }

    pub fn inference_state(&self) -> InferenceState {
        self.gate.state()
    }

    pub fn stats(&self) -> GateStats {
        self.gate.stats()
    }

    pub fn detector_name(&self) -> &str {
        self.detector.name()
    }
}

async fn run_inference(
    permit: InferencePermit,
    detector: Arc<dyn Detector>,
    timeout: Option<Duration>,
    outcomes: mpsc::UnboundedSender<InferenceOutcome>,
) {
    let frame = permit.frame().clone();
    let sequence = frame.sequence;
    let started = Instant::now();

    let job = tokio::task::spawn_blocking({
        let frame = frame.clone();
        move || detector.detect(&frame.image, frame.metadata.intrinsics.as_ref())
    });

    // A timed-out blocking call is detached, not stopped; it may still be
    // running when the permit below is released.
    let joined = match timeout {
        Some(limit) => tokio::time::timeout(limit, job).await.ok(),
        None => Some(job.await),
    };

    let (detections, status) = match joined {
        Some(Ok(Ok(detections))) => (detections, InferenceStatus::Completed),
        Some(Ok(Err(err))) => {
            let failure = PipelineError::TransientFrame {
                sequence,
                reason: format!("{err:#}"),
            };
            log_warn!("{failure}");
            (Vec::new(), InferenceStatus::Failed(format!("{err:#}")))
        }
        Some(Err(join_err)) => {
            log_error!("detector task for frame {sequence} did not finish: {join_err}");
            (Vec::new(), InferenceStatus::Failed(join_err.to_string()))
        }
        None => {
            log_warn!(
                "inference for frame {sequence} exceeded {:?}; abandoning it",
                timeout.unwrap_or_default()
            );
            (Vec::new(), InferenceStatus::TimedOut)
        }
    };

    let elapsed = started.elapsed();
    log_debug!(
        "frame {sequence}: {} detections in {}ms",
        detections.len(),
        elapsed.as_millis()
    );

    let outcome = InferenceOutcome {
        frame,
        detections: detections.into(),
        status,
        elapsed,
    };
    if outcomes.send(outcome).is_err() {
        log_debug!("render side gone; dropping outcome for frame {sequence}");
    }

    // Released only after the outcome is queued so the next result cannot
    // overtake this one.
    drop(permit);
}
