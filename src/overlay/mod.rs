pub mod geometry;
pub mod state;

pub use geometry::{CaptureAspect, GeometryMapper, ViewRect, ViewSize};
pub use state::{color_for_label, Color, DisplayBox, OverlayState, SlotVisibility};
