pub mod capture;
pub mod db;
pub mod detection;
pub mod error;
pub mod overlay;
pub mod pipeline;
pub mod session;
pub mod settings;
pub mod snapshot;
pub mod utils;

pub use capture::{CameraIntrinsics, Frame, FrameSource, GateStats, InferenceState};
pub use db::{Database, ObjectRecord, Snapshot, SnapshotSummary};
pub use detection::{Detection, Detector, DetectorThresholds, FilteredDetector, NormalizedRect};
pub use error::PipelineError;
pub use overlay::{CaptureAspect, DisplayBox, GeometryMapper, OverlayState, ViewRect, ViewSize};
pub use pipeline::{Delivery, DetectionPipeline, OverlayPresenter, ProcessedFrame};
pub use session::{DetectionFeature, DetectionSession};
pub use settings::{PipelineSettings, SettingsStore};
pub use snapshot::SnapshotComposer;
pub use utils::init_logging;

/// File names inside the data directory.
pub const DATABASE_FILE: &str = "snapdetect.sqlite3";
pub const SETTINGS_FILE: &str = "settings.json";
