use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
    time::Duration,
};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::detection::DetectorThresholds;
use crate::error::PipelineError;
use crate::overlay::CaptureAspect;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineSettings {
    /// Admit one frame in every `frame_interval` delivered.
    pub frame_interval: u32,
    pub slot_count: usize,
    pub iou_threshold: f32,
    pub confidence_threshold: f32,
    pub capture_aspect: CaptureAspect,
    /// Abandon an inference after this long. `None` waits forever.
    ///
    /// Setting this gives up the one-inference-at-a-time guarantee: the
    /// abandoned detector call cannot be interrupted and keeps running while
    /// the gate admits the next frame, so two calls may overlap.
    pub inference_timeout_ms: Option<u64>,
    /// Longest edge of the stored snapshot thumbnail, in pixels.
    pub thumbnail_edge: u32,
    /// Page size for the snapshot catalog.
    pub list_limit: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            frame_interval: 1,
            slot_count: 10,
            iou_threshold: 0.45,
            confidence_threshold: 0.25,
            capture_aspect: CaptureAspect::default(),
            inference_timeout_ms: None,
            thumbnail_edge: 160,
            list_limit: 20,
        }
    }
}

impl PipelineSettings {
    pub fn thresholds(&self) -> DetectorThresholds {
        DetectorThresholds {
            iou: self.iou_threshold,
            confidence: self.confidence_threshold,
        }
    }

    pub fn inference_timeout(&self) -> Option<Duration> {
        self.inference_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.frame_interval == 0 {
            return Err(PipelineError::configuration("frame interval must be at least 1"));
        }
        if self.slot_count == 0 {
            return Err(PipelineError::configuration("slot count must be at least 1"));
        }
        if self.capture_aspect.long == 0 || self.capture_aspect.short == 0 {
            return Err(PipelineError::configuration(format!(
                "capture aspect {}:{} has a zero component",
                self.capture_aspect.long, self.capture_aspect.short
            )));
        }
        if self.inference_timeout_ms == Some(0) {
            return Err(PipelineError::configuration("inference timeout must be positive"));
        }
        self.thresholds().validate()
    }
}

/// JSON-file backed settings, loaded once and written through on update.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<PipelineSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "Ignoring unreadable settings at {} ({err}); using defaults",
                    path.display()
                );
                PipelineSettings::default()
            })
        } else {
            PipelineSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pipeline(&self) -> PipelineSettings {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Validates before writing; an invalid value leaves the store untouched.
    pub fn update(&self, settings: PipelineSettings) -> Result<()> {
        settings.validate()?;
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    /// Write the current values out, creating the file if needed.
    pub fn save(&self) -> Result<()> {
        self.persist(&self.pipeline())
    }

    fn persist(&self, data: &PipelineSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
