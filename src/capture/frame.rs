use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Row-major 3x3 camera intrinsic matrix (`fx 0 cx / 0 fy cy / 0 0 1`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub matrix: [[f32; 3]; 3],
}

impl CameraIntrinsics {
    pub fn new(fx: f32, fy: f32, cx: f32, cy: f32) -> Self {
        Self {
            matrix: [[fx, 0.0, cx], [0.0, fy, cy], [0.0, 0.0, 1.0]],
        }
    }

    pub fn focal_length(&self) -> (f32, f32) {
        (self.matrix[0][0], self.matrix[1][1])
    }

    pub fn principal_point(&self) -> (f32, f32) {
        (self.matrix[0][2], self.matrix[1][2])
    }
}

/// Optional side-channel data delivered alongside a frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameMetadata {
    pub intrinsics: Option<CameraIntrinsics>,
}

/// One captured video frame. The pixel buffer is shared, so cloning a frame
/// to hand it to the detector does not copy pixels.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Capture order assigned by the source.
    pub sequence: u64,
    pub captured_at: DateTime<Utc>,
    pub image: Arc<RgbaImage>,
    pub metadata: FrameMetadata,
}

impl Frame {
    pub fn new(sequence: u64, image: RgbaImage) -> Self {
        Self {
            sequence,
            captured_at: Utc::now(),
            image: Arc::new(image),
            metadata: FrameMetadata::default(),
        }
    }

    pub fn with_intrinsics(mut self, intrinsics: CameraIntrinsics) -> Self {
        self.metadata.intrinsics = Some(intrinsics);
        self
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// A pull-based video source. Cadence is owned by the implementation: the
/// future resolves when the device has the next frame, or `None` once the
/// stream has ended.
pub trait FrameSource: Send + 'static {
    fn next_frame(&mut self) -> impl Future<Output = Option<Frame>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cloned_frames_share_pixels() {
        let frame = Frame::new(3, RgbaImage::new(4, 2));
        let copy = frame.clone();
        assert!(Arc::ptr_eq(&frame.image, &copy.image));
        assert_eq!(copy.dimensions(), (4, 2));
    }

    #[test]
    fn intrinsics_accessors_read_the_matrix() {
        let k = CameraIntrinsics::new(1400.0, 1410.0, 960.0, 540.0);
        assert_eq!(k.focal_length(), (1400.0, 1410.0));
        assert_eq!(k.principal_point(), (960.0, 540.0));

        let frame = Frame::new(0, RgbaImage::new(1, 1)).with_intrinsics(k);
        assert_eq!(frame.metadata.intrinsics, Some(k));
    }
}
