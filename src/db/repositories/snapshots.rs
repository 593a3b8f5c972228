use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime, to_i64, to_u64},
    models::{ObjectRecord, Snapshot, SnapshotSummary},
};

fn row_to_summary(row: &Row) -> Result<SnapshotSummary> {
    let created_at: String = row.get("created_at")?;
    let object_count: i64 = row.get("object_count")?;

    Ok(SnapshotSummary {
        id: row.get("id")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        object_count: to_u64(object_count, "object_count")? as usize,
        thumbnail: row.get("thumbnail")?,
    })
}

impl Database {
    /// Write a snapshot and all of its objects in one transaction. On any
    /// failure nothing is kept.
    pub async fn insert_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let record = snapshot.clone();
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO snapshots (id, created_at, frame_sequence, image_data, thumbnail)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.id,
                    format_datetime(&record.created_at),
                    to_i64(record.frame_sequence)?,
                    record.image_data,
                    record.thumbnail,
                ],
            )
            .context("failed to insert snapshot")?;

            {
                let mut stmt = tx.prepare(
                    "INSERT INTO snapshot_objects (snapshot_id, position, name, confidence)
                     VALUES (?1, ?2, ?3, ?4)",
                )?;
                for (position, object) in record.objects.iter().enumerate() {
                    stmt.execute(params![
                        record.id,
                        position as i64,
                        object.name,
                        object.confidence as f64,
                    ])
                    .with_context(|| format!("failed to insert object {position}"))?;
                }
            }

            tx.commit().context("failed to commit snapshot")?;
            Ok(())
        })
        .await
    }

    /// Newest first.
    pub async fn list_snapshot_summaries(&self, limit: usize) -> Result<Vec<SnapshotSummary>> {
        let limit = limit as i64;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT s.id, s.created_at, s.thumbnail,
                        (SELECT COUNT(*) FROM snapshot_objects o WHERE o.snapshot_id = s.id)
                            AS object_count
                 FROM snapshots s
                 ORDER BY s.created_at DESC, s.rowid DESC
                 LIMIT ?1",
            )?;

            let mut rows = stmt.query(params![limit])?;
            let mut summaries = Vec::new();
            while let Some(row) = rows.next()? {
                summaries.push(row_to_summary(row)?);
            }

            Ok(summaries)
        })
        .await
    }

    pub async fn get_snapshot(&self, snapshot_id: &str) -> Result<Option<Snapshot>> {
        let snapshot_id = snapshot_id.to_string();
        self.execute(move |conn| {
            let header = conn
                .query_row(
                    "SELECT id, created_at, frame_sequence, image_data, thumbnail
                     FROM snapshots
                     WHERE id = ?1",
                    params![snapshot_id],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, i64>(2)?,
                            row.get::<_, Vec<u8>>(3)?,
                            row.get::<_, Vec<u8>>(4)?,
                        ))
                    },
                )
                .optional()?;

            let Some((id, created_at, frame_sequence, image_data, thumbnail)) = header else {
                return Ok(None);
            };

            let mut stmt = conn.prepare(
                "SELECT name, confidence
                 FROM snapshot_objects
                 WHERE snapshot_id = ?1
                 ORDER BY position ASC",
            )?;
            let mut rows = stmt.query(params![id])?;
            let mut objects = Vec::new();
            while let Some(row) = rows.next()? {
                objects.push(ObjectRecord {
                    name: row.get(0)?,
                    confidence: row.get::<_, f64>(1)? as f32,
                });
            }

            Ok(Some(Snapshot {
                id,
                created_at: parse_datetime(&created_at, "created_at")?,
                frame_sequence: to_u64(frame_sequence, "frame_sequence")?,
                image_data,
                thumbnail,
                objects,
            }))
        })
        .await
    }

    /// Returns whether a snapshot was removed. Objects go with it via
    /// `ON DELETE CASCADE`.
    pub async fn delete_snapshot(&self, snapshot_id: &str) -> Result<bool> {
        let snapshot_id = snapshot_id.to_string();
        self.execute(move |conn| {
            let rows_affected =
                conn.execute("DELETE FROM snapshots WHERE id = ?1", params![snapshot_id])?;
            Ok(rows_affected > 0)
        })
        .await
    }

    pub async fn count_snapshots(&self) -> Result<usize> {
        self.execute(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM snapshots", [], |row| row.get(0))?;
            Ok(to_u64(count, "count")? as usize)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn snapshot(id: &str, names: &[&str], offset_secs: i64) -> Snapshot {
        Snapshot {
            id: id.to_string(),
            created_at: Utc::now() + Duration::seconds(offset_secs),
            frame_sequence: 42,
            image_data: vec![1, 2, 3],
            thumbnail: vec![9],
            objects: names
                .iter()
                .enumerate()
                .map(|(i, name)| ObjectRecord {
                    name: name.to_string(),
                    confidence: 0.5 + i as f32 * 0.1,
                })
                .collect(),
        }
    }

    async fn object_rows(db: &Database) -> i64 {
        db.execute(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM snapshot_objects", [], |row| row.get(0))?)
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn insert_and_read_back_preserves_object_order() {
        let db = Database::in_memory().unwrap();
        let original = snapshot("a", &["person", "dog", "kite"], 0);
        db.insert_snapshot(&original).await.unwrap();

        let loaded = db.get_snapshot("a").await.unwrap().expect("stored");
        assert_eq!(loaded.objects, original.objects);
        assert_eq!(loaded.image_data, original.image_data);
        assert_eq!(loaded.frame_sequence, 42);
        assert_eq!(
            format_datetime(&loaded.created_at),
            format_datetime(&original.created_at)
        );
    }

    #[tokio::test]
    async fn empty_object_list_is_a_valid_snapshot() {
        let db = Database::in_memory().unwrap();
        db.insert_snapshot(&snapshot("empty", &[], 0)).await.unwrap();
        let loaded = db.get_snapshot("empty").await.unwrap().expect("stored");
        assert!(loaded.objects.is_empty());
    }

    #[tokio::test]
    async fn failed_object_insert_rolls_back_the_snapshot() {
        let db = Database::in_memory().unwrap();
        db.execute(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER reject_kites BEFORE INSERT ON snapshot_objects
                 WHEN NEW.name = 'kite'
                 BEGIN SELECT RAISE(ABORT, 'simulated write failure'); END;",
            )?;
            Ok(())
        })
        .await
        .unwrap();

        let result = db.insert_snapshot(&snapshot("x", &["person", "kite"], 0)).await;
        assert!(result.is_err());
        assert_eq!(db.count_snapshots().await.unwrap(), 0);
        assert_eq!(object_rows(&db).await, 0);
    }

    #[tokio::test]
    async fn duplicate_id_leaves_the_original_untouched() {
        let db = Database::in_memory().unwrap();
        db.insert_snapshot(&snapshot("same", &["cup"], 0)).await.unwrap();
        assert!(db
            .insert_snapshot(&snapshot("same", &["a", "b"], 1))
            .await
            .is_err());
        let loaded = db.get_snapshot("same").await.unwrap().unwrap();
        assert_eq!(loaded.objects.len(), 1);
        assert_eq!(object_rows(&db).await, 1);
    }

    #[tokio::test]
    async fn summaries_are_newest_first_and_limited() {
        let db = Database::in_memory().unwrap();
        for (i, id) in ["old", "mid", "new"].iter().enumerate() {
            db.insert_snapshot(&snapshot(id, &vec!["obj"; i + 1], i as i64))
                .await
                .unwrap();
        }

        let all = db.list_snapshot_summaries(20).await.unwrap();
        let ids: Vec<_> = all.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
        assert_eq!(all[0].object_count, 3);
        assert_eq!(all[0].caption(), "3 objects found");
        assert_eq!(all[0].thumbnail, vec![9]);

        let page = db.list_snapshot_summaries(2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, "new");
    }

    #[tokio::test]
    async fn same_timestamp_falls_back_to_insert_order() {
        let db = Database::in_memory().unwrap();
        let mut first = snapshot("first", &[], 0);
        let mut second = snapshot("second", &[], 0);
        second.created_at = first.created_at;
        first.frame_sequence = 1;
        db.insert_snapshot(&first).await.unwrap();
        db.insert_snapshot(&second).await.unwrap();
        let ids: Vec<_> = db
            .list_snapshot_summaries(10)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn delete_cascades_to_objects() {
        let db = Database::in_memory().unwrap();
        db.insert_snapshot(&snapshot("gone", &["a", "b"], 0)).await.unwrap();
        db.insert_snapshot(&snapshot("kept", &["c"], 1)).await.unwrap();

        assert!(db.delete_snapshot("gone").await.unwrap());
        assert!(!db.delete_snapshot("gone").await.unwrap());
        assert!(db.get_snapshot("gone").await.unwrap().is_none());
        assert_eq!(object_rows(&db).await, 1);
        assert_eq!(db.count_snapshots().await.unwrap(), 1);
    }
}
