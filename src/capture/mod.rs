pub mod controller;
pub mod frame;
pub mod gate;
pub mod loop_worker;

pub use controller::CaptureController;
pub use frame::{CameraIntrinsics, Frame, FrameMetadata, FrameSource};
pub use gate::{Admission, FrameGate, GateStats, InferencePermit, InferenceState};
pub use loop_worker::CaptureSummary;
