use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::pipeline::{DetectionPipeline, Delivery};

use super::frame::FrameSource;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Counts for one run of the capture loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureSummary {
    pub delivered: u64,
    pub admitted: u64,
}

/// Pull frames from `source` at its own cadence and hand each one to the
/// pipeline until the source ends or the token is cancelled.
pub async fn capture_loop<S: FrameSource>(
    mut source: S,
    pipeline: Arc<DetectionPipeline>,
    cancel_token: CancellationToken,
) -> CaptureSummary {
    let mut summary = CaptureSummary::default();
    log_info!("capture loop started (detector: {})", pipeline.detector_name());

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                log_info!("capture loop shutting down");
                break;
            }
            next = source.next_frame() => {
                let Some(frame) = next else {
                    log_info!("frame source ended after {} frames", summary.delivered);
                    break;
                };
                let sequence = frame.sequence;
                summary.delivered += 1;
                match pipeline.deliver(frame) {
                    Delivery::Admitted => summary.admitted += 1,
                    Delivery::SkippedBusy => log_debug!("frame {sequence} dropped: inference busy"),
                    Delivery::SkippedInterval => {}
                }
            }
        }
    }

    summary
}
