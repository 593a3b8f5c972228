//! Model space to view space.
//!
//! Model boxes are normalized with a top-left origin and y pointing down.
//! View rects use a bottom-left origin with y pointing up. The video is drawn
//! aspect-fill across the full view width, so its rendered height is
//! `view_width * long / short` and it is centred vertically; when that height
//! exceeds the view the top and bottom are cropped and the offset goes
//! negative.

use serde::{Deserialize, Serialize};

use crate::detection::NormalizedRect;

/// Capture aspect as `long:short`, e.g. 16:9 for a portrait 1080x1920 feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureAspect {
    pub long: u32,
    pub short: u32,
}

impl Default for CaptureAspect {
    fn default() -> Self {
        Self { long: 16, short: 9 }
    }
}

impl CaptureAspect {
    pub fn height_per_width(&self) -> f32 {
        if self.short == 0 {
            return 0.0;
        }
        self.long as f32 / self.short as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewSize {
    pub width: f32,
    pub height: f32,
}

impl ViewSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Rectangle in view coordinates, origin bottom-left, y up.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ViewRect {
    pub fn mid_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn mid_y(&self) -> f32 {
        self.y + self.height / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryMapper {
    aspect: CaptureAspect,
    view: ViewSize,
    computed_height: f32,
    vertical_offset: f32,
}

impl GeometryMapper {
    pub fn new(aspect: CaptureAspect, view: ViewSize) -> Self {
        let mut mapper = Self {
            aspect,
            view,
            computed_height: 0.0,
            vertical_offset: 0.0,
        };
        mapper.derive();
        mapper
    }

    fn derive(&mut self) {
        self.computed_height = self.view.width * self.aspect.height_per_width();
        self.vertical_offset = (self.view.height - self.computed_height) / 2.0;
    }

    pub fn resize(&mut self, view: ViewSize) {
        self.view = view;
        self.derive();
    }

    pub fn set_aspect(&mut self, aspect: CaptureAspect) {
        self.aspect = aspect;
        self.derive();
    }

    pub fn aspect(&self) -> CaptureAspect {
        self.aspect
    }

    pub fn view(&self) -> ViewSize {
        self.view
    }

    /// Height of the rendered video region (may exceed the view).
    pub fn computed_height(&self) -> f32 {
        self.computed_height
    }

    pub fn vertical_offset(&self) -> f32 {
        self.vertical_offset
    }

    pub fn to_view(&self, bbox: &NormalizedRect) -> ViewRect {
        let width = bbox.width * self.view.width;
        let height = bbox.height * self.computed_height;
        let flipped_y = 1.0 - bbox.y - bbox.height;
        ViewRect {
            x: bbox.x * self.view.width,
            y: flipped_y * self.computed_height + self.vertical_offset,
            width,
            height,
        }
    }

    /// Inverse of [`to_view`](Self::to_view). `None` when the view has no area.
    pub fn to_normalized(&self, rect: &ViewRect) -> Option<NormalizedRect> {
        if self.view.width <= 0.0 || self.computed_height <= 0.0 {
            return None;
        }
        let width = rect.width / self.view.width;
        let height = rect.height / self.computed_height;
        let flipped_y = (rect.y - self.vertical_offset) / self.computed_height;
        Some(NormalizedRect {
            x: rect.x / self.view.width,
            y: 1.0 - flipped_y - height,
            width,
            height,
        })
    }
}
