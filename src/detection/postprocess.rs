use std::cmp::Ordering;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::capture::CameraIntrinsics;
use crate::error::PipelineError;

use super::{Detection, Detector};

/// Fixed at detector construction; never changed per frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorThresholds {
    pub iou: f32,
    pub confidence: f32,
}

impl Default for DetectorThresholds {
    fn default() -> Self {
        Self {
            iou: 0.45,
            confidence: 0.25,
        }
    }
}

impl DetectorThresholds {
    pub fn validate(&self) -> Result<(), PipelineError> {
        for (name, value) in [("iou", self.iou), ("confidence", self.confidence)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PipelineError::configuration(format!(
                    "{name} threshold {value} is outside [0, 1]"
                )));
            }
        }
        Ok(())
    }
}

/// Drop low-confidence boxes, then greedy class-wise non-maximum suppression.
/// Output is ordered by descending confidence.
pub fn suppress(raw: Vec<Detection>, thresholds: &DetectorThresholds) -> Vec<Detection> {
    let mut candidates: Vec<Detection> = raw
        .into_iter()
        .filter(|d| d.confidence >= thresholds.confidence)
        .collect();
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut kept: Vec<Detection> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let overlaps = kept.iter().any(|k| {
            k.label == candidate.label && k.bbox.iou(&candidate.bbox) > thresholds.iou
        });
        if !overlaps {
            kept.push(candidate);
        }
    }
    kept
}

/// Wraps a raw backend so its output always honours the thresholds.
pub struct FilteredDetector<D> {
    backend: D,
    thresholds: DetectorThresholds,
}

impl<D: Detector> FilteredDetector<D> {
    pub fn new(backend: D, thresholds: DetectorThresholds) -> Result<Self, PipelineError> {
        thresholds.validate()?;
        Ok(Self {
            backend,
            thresholds,
        })
    }

    pub fn thresholds(&self) -> DetectorThresholds {
        self.thresholds
    }
}

impl<D: Detector> Detector for FilteredDetector<D> {
    fn detect(
        &self,
        image: &RgbaImage,
        hints: Option<&CameraIntrinsics>,
    ) -> anyhow::Result<Vec<Detection>> {
        let raw = self.backend.detect(image, hints)?;
        Ok(suppress(raw, &self.thresholds))
    }

    fn name(&self) -> &str {
        self.backend.name()
    }
}
