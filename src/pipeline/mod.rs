pub mod inference;
pub mod presenter;

pub use inference::{DetectionPipeline, Delivery, InferenceOutcome, InferenceStatus};
pub use presenter::{OverlayPresenter, ProcessedFrame};
