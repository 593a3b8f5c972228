pub mod postprocess;
pub mod scripted;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::capture::CameraIntrinsics;

pub use postprocess::{suppress, DetectorThresholds, FilteredDetector};
pub use scripted::ScriptedDetector;

/// Axis-aligned box in normalized model space: origin top-left, y down,
/// every component in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl NormalizedRect {
    pub const FULL: NormalizedRect = NormalizedRect {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };

    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Clamp into the unit square, shrinking the size so the box stays inside.
    /// Non-finite components collapse to 0.
    pub fn clamped(self) -> Self {
        let x = clamp_finite(self.x, 1.0);
        let y = clamp_finite(self.y, 1.0);
        Self {
            x,
            y,
            width: clamp_finite(self.width, 1.0 - x),
            height: clamp_finite(self.height, 1.0 - y),
        }
    }

    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    pub fn intersection_area(&self, other: &NormalizedRect) -> f32 {
        let w = self.max_x().min(other.max_x()) - self.x.max(other.x);
        let h = self.max_y().min(other.max_y()) - self.y.max(other.y);
        if w <= 0.0 || h <= 0.0 {
            0.0
        } else {
            w * h
        }
    }

    /// Intersection over union; 0 when both boxes are degenerate.
    pub fn iou(&self, other: &NormalizedRect) -> f32 {
        let inter = self.intersection_area(other);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

fn clamp_finite(value: f32, max: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, max)
    } else {
        0.0
    }
}

/// One labeled box for a single frame. `label`/`confidence` are the top
/// class and its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bbox: NormalizedRect,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32, bbox: NormalizedRect) -> Self {
        Self {
            label: label.into(),
            confidence: clamp_finite(confidence, 1.0),
            bbox: bbox.clamped(),
        }
    }
}

/// Opaque object-detection backend.
///
/// Implementations must be callable from a blocking worker thread; backends
/// with mutable model state guard it internally. `hints` is best-effort and
/// may be ignored.
pub trait Detector: Send + Sync {
    fn detect(
        &self,
        image: &RgbaImage,
        hints: Option<&CameraIntrinsics>,
    ) -> anyhow::Result<Vec<Detection>>;

    fn name(&self) -> &str {
        "detector"
    }
}

impl<D: Detector + ?Sized> Detector for std::sync::Arc<D> {
    fn detect(
        &self,
        image: &RgbaImage,
        hints: Option<&CameraIntrinsics>,
    ) -> anyhow::Result<Vec<Detection>> {
        (**self).detect(image, hints)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
