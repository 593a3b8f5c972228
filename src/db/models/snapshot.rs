//! Persisted snapshot records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One detected object frozen into a snapshot. Owned by its snapshot and
/// deleted with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRecord {
    pub name: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: String,
    pub created_at: DateTime<Utc>,
    /// Sequence of the frame the image was taken from.
    pub frame_sequence: u64,
    /// PNG-encoded still.
    #[serde(skip_serializing, default)]
    pub image_data: Vec<u8>,
    #[serde(skip_serializing, default)]
    pub thumbnail: Vec<u8>,
    /// In detection order.
    pub objects: Vec<ObjectRecord>,
}

/// Row of the snapshot catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub object_count: usize,
    #[serde(skip_serializing, default)]
    pub thumbnail: Vec<u8>,
}

impl SnapshotSummary {
    pub fn caption(&self) -> String {
        format!("{} objects found", self.object_count)
    }
}
