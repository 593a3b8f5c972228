use chrono::Utc;
use uuid::Uuid;

use crate::db::{Database, ObjectRecord, Snapshot};
use crate::error::PipelineError;
use crate::pipeline::ProcessedFrame;

use super::encode::{encode_png, encode_thumbnail};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Freezes what is on screen into a persisted snapshot.
#[derive(Clone)]
pub struct SnapshotComposer {
    db: Database,
    thumbnail_edge: u32,
}

impl SnapshotComposer {
    pub fn new(db: Database, thumbnail_edge: u32) -> Self {
        Self { db, thumbnail_edge }
    }

    /// `capture` is the frame that produced the current detections, not
    /// the latest delivered frame. Encoding and the write both run off the
    /// caller's thread; the write is all-or-nothing.
    pub async fn commit(&self, capture: Option<ProcessedFrame>) -> Result<Snapshot, PipelineError> {
        let Some(capture) = capture else {
            log_warn!("snapshot requested before any frame was processed");
            return Err(PipelineError::NothingToCapture);
        };

        let image = capture.frame.image.clone();
        let thumbnail_edge = self.thumbnail_edge;
        let (image_data, thumbnail) = tokio::task::spawn_blocking(move || {
            let still = encode_png(&image)?;
            let thumbnail = encode_thumbnail(&image, thumbnail_edge)?;
            Ok::<_, anyhow::Error>((still, thumbnail))
        })
        .await
        .map_err(|err| PipelineError::Encoding(anyhow::Error::new(err)))?
        .map_err(PipelineError::Encoding)?;

        let snapshot = Snapshot {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            frame_sequence: capture.frame.sequence,
            image_data,
            thumbnail,
            objects: capture
                .detections
                .iter()
                .map(|detection| ObjectRecord {
                    name: detection.label.clone(),
                    confidence: detection.confidence,
                })
                .collect(),
        };

        self.db
            .insert_snapshot(&snapshot)
            .await
            .map_err(PipelineError::Persistence)?;

        log_info!(
            "snapshot {} saved: {} objects, {} bytes (frame {})",
            snapshot.id,
            snapshot.objects.len(),
            snapshot.image_data.len(),
            snapshot.frame_sequence
        );
        Ok(snapshot)
    }
}
