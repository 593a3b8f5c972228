use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::pipeline::DetectionPipeline;

use super::frame::FrameSource;
use super::loop_worker::{capture_loop, CaptureSummary};

/// Owns the background task that feeds a frame source into the pipeline.
pub struct CaptureController {
    handle: Option<JoinHandle<CaptureSummary>>,
    cancel_token: Option<CancellationToken>,
}

impl CaptureController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    pub fn start<S: FrameSource>(
        &mut self,
        source: S,
        pipeline: Arc<DetectionPipeline>,
    ) -> Result<()> {
        if self.is_running() {
            bail!("capture already active");
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(capture_loop(source, pipeline, cancel_token.clone()));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Cancel the loop and wait for it. In-flight inference is not cancelled;
    /// its result still reaches the presenter.
    pub async fn stop(&mut self) -> Result<Option<CaptureSummary>> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        match self.handle.take() {
            Some(handle) => {
                let summary = handle.await.context("capture loop task failed to join")?;
                info!(
                    "capture stopped: {} delivered, {} admitted",
                    summary.delivered, summary.admitted
                );
                Ok(Some(summary))
            }
            None => Ok(None),
        }
    }
}

impl Default for CaptureController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Frame;
    use crate::detection::ScriptedDetector;
    use image::RgbaImage;
    use std::time::Duration;

    /// Emits `remaining` frames, one every `period`.
    struct TickingSource {
        next: u64,
        remaining: u64,
        period: Duration,
    }

    impl FrameSource for TickingSource {
        async fn next_frame(&mut self) -> Option<Frame> {
            if self.remaining == 0 {
                return None;
            }
            tokio::time::sleep(self.period).await;
            self.remaining -= 1;
            let frame = Frame::new(self.next, RgbaImage::new(2, 2));
            self.next += 1;
            Some(frame)
        }
    }

    fn pipeline(interval: u32) -> Arc<DetectionPipeline> {
        let detector = Arc::new(ScriptedDetector::new(Vec::new()));
        let (pipeline, _rx) =
            DetectionPipeline::on_current_runtime(interval, None, detector).unwrap();
        Arc::new(pipeline)
    }

    #[tokio::test]
    async fn finite_source_runs_to_completion() {
        let mut controller = CaptureController::new();
        let source = TickingSource {
            next: 0,
            remaining: 12,
            period: Duration::from_millis(1),
        };
        let pipeline = pipeline(4);
        controller.start(source, pipeline.clone()).unwrap();

        let summary = controller.stop_after_source_ends().await;
        assert_eq!(summary.delivered, 12);
        assert_eq!(pipeline.stats().delivered, 12);
        assert!(summary.admitted <= 3);
    }

    #[tokio::test]
    async fn stop_cancels_an_endless_source() {
        let mut controller = CaptureController::new();
        let source = TickingSource {
            next: 0,
            remaining: u64::MAX,
            period: Duration::from_millis(2),
        };
        controller.start(source, pipeline(1)).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(controller.is_running());

        let summary = controller.stop().await.unwrap().expect("was running");
        assert!(summary.delivered > 0);
        assert!(!controller.is_running());
        assert!(controller.stop().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn refuses_a_second_concurrent_start() {
        let mut controller = CaptureController::new();
        let endless = || TickingSource {
            next: 0,
            remaining: u64::MAX,
            period: Duration::from_millis(5),
        };
        let pipeline = pipeline(1);
        controller.start(endless(), pipeline.clone()).unwrap();
        assert!(controller.start(endless(), pipeline).is_err());
        controller.stop().await.unwrap();
    }

    impl CaptureController {
        async fn stop_after_source_ends(&mut self) -> CaptureSummary {
            let handle = self.handle.take().expect("started");
            self.cancel_token.take();
            handle.await.expect("join")
        }
    }
}
