use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::capture::Frame;
use crate::detection::Detection;
use crate::overlay::{CaptureAspect, GeometryMapper, OverlayState, ViewSize};

use super::inference::{InferenceOutcome, InferenceStatus};

/// The frame that produced the detections currently on screen.
#[derive(Debug, Clone)]
pub struct ProcessedFrame {
    pub frame: Frame,
    pub detections: Arc<[Detection]>,
}

/// Render-context owner of the overlay.
///
/// Inference results only touch the overlay through [`pump`](Self::pump) or
/// [`next_update`](Self::next_update), which the render loop calls on its own
/// thread; outcomes are applied in the order they were produced.
pub struct OverlayPresenter {
    overlay: OverlayState,
    mapper: GeometryMapper,
    outcomes: mpsc::UnboundedReceiver<InferenceOutcome>,
    current: Option<ProcessedFrame>,
    applied: u64,
    failed: u64,
}

impl OverlayPresenter {
    pub fn new(
        slot_count: usize,
        mapper: GeometryMapper,
        outcomes: mpsc::UnboundedReceiver<InferenceOutcome>,
    ) -> Self {
        Self {
            overlay: OverlayState::new(slot_count),
            mapper,
            outcomes,
            current: None,
            applied: 0,
            failed: 0,
        }
    }

    /// Apply every outcome that is ready without waiting. Returns how many
    /// were applied.
    pub fn pump(&mut self) -> usize {
        let mut count = 0;
        loop {
            match self.outcomes.try_recv() {
                Ok(outcome) => {
                    self.apply(outcome);
                    count += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        count
    }

    /// Wait for the next outcome and apply it. Returns the frame sequence,
    /// or `None` once the pipeline has been dropped.
    pub async fn next_update(&mut self) -> Option<u64> {
        let outcome = self.outcomes.recv().await?;
        let sequence = outcome.frame.sequence;
        self.apply(outcome);
        Some(sequence)
    }

    fn apply(&mut self, outcome: InferenceOutcome) {
        if outcome.status != InferenceStatus::Completed {
            self.failed += 1;
        }
        self.overlay.show(&outcome.detections, &self.mapper);
        self.current = Some(ProcessedFrame {
            frame: outcome.frame,
            detections: outcome.detections,
        });
        self.applied += 1;
    }

    /// Re-derive the transform for a new view size and re-lay out the
    /// current detections.
    pub fn resize(&mut self, view: ViewSize) {
        self.mapper.resize(view);
        self.relayout();
    }

    pub fn set_aspect(&mut self, aspect: CaptureAspect) {
        self.mapper.set_aspect(aspect);
        self.relayout();
    }

    fn relayout(&mut self) {
        match &self.current {
            Some(current) => self.overlay.show(&current.detections, &self.mapper),
            None => self.overlay.clear(),
        }
    }

    pub fn overlay(&self) -> &OverlayState {
        &self.overlay
    }

    pub fn mapper(&self) -> &GeometryMapper {
        &self.mapper
    }

    pub fn current(&self) -> Option<&ProcessedFrame> {
        self.current.as_ref()
    }

    pub fn applied(&self) -> u64 {
        self.applied
    }

    /// Outcomes that failed or timed out (shown as empty frames).
    pub fn failed(&self) -> u64 {
        self.failed
    }
}
