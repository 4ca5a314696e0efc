use anyhow::Result;
use rusqlite::{Connection, Row, params};
use serde_json::Value;

use super::metrics::load_stats;
use super::types::{BoardColumn, BoardSnapshot, KanbanColumn, MirroredActivity, PollBatch};
use super::{MirrorStore, open_conn};
use crate::core::activity::empty_object;

const ACTIVITY_COLUMNS: &str = "id, type, description, metadata, status, timestamp, \
                                completed_at, result, column_position, synced_at";

impl MirrorStore {
    /// Upsert every activity and append every metric sample in one
    /// transaction. Returns the number of activity rows written.
    pub async fn apply_poll(&self, batch: &PollBatch) -> Result<usize> {
        let mut guard = self.lock().await;
        let db = open_conn(&mut guard)?;
        let tx = db.transaction()?;
        {
            let mut upsert = tx.prepare(
                "INSERT OR REPLACE INTO activities
                 (id, type, description, metadata, status, timestamp,
                  completed_at, result, column_position, synced_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for a in &batch.activities {
                upsert.execute(params![
                    a.id,
                    a.kind,
                    a.description,
                    a.metadata.to_string(),
                    a.status,
                    a.timestamp,
                    a.completed_at,
                    a.result.as_ref().map(Value::to_string),
                    a.column_position,
                    a.synced_at,
                ])?;
            }

            let mut sample = tx.prepare(
                "INSERT INTO system_metrics (timestamp, metric_name, metric_value)
                 VALUES (?1, ?2, ?3)",
            )?;
            for (name, value) in &batch.metrics {
                sample.execute(params![batch.polled_at, name, value])?;
            }
        }
        tx.commit()?;
        Ok(batch.activities.len())
    }

    /// Newest first. `status` is an exact match.
    pub async fn list_activities(
        &self,
        status: Option<&str>,
        limit: usize,
    ) -> Result<Vec<MirroredActivity>> {
        let mut guard = self.lock().await;
        let db = open_conn(&mut guard)?;
        Ok(load_activities(db, status, limit)?)
    }

    pub async fn columns(&self) -> Result<Vec<BoardColumn>> {
        let mut guard = self.lock().await;
        let db = open_conn(&mut guard)?;
        Ok(load_columns(db)?)
    }

    /// Every column with its activities, newest first.
    pub async fn kanban(&self) -> Result<Vec<KanbanColumn>> {
        let mut guard = self.lock().await;
        let db = open_conn(&mut guard)?;
        let columns = load_columns(db)?;
        let mut stmt = db.prepare(&format!(
            "SELECT {} FROM activities WHERE column_position = ?1
             ORDER BY timestamp DESC, id",
            ACTIVITY_COLUMNS
        ))?;

        let mut board = Vec::with_capacity(columns.len());
        for column in columns {
            let activities = stmt
                .query_map(params![column.position], row_to_activity)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            board.push(KanbanColumn { column, activities });
        }
        Ok(board)
    }

    /// Latest activities, columns and stats read under one lock, so all
    /// three describe the same committed poll.
    pub async fn snapshot(&self, limit: usize) -> Result<BoardSnapshot> {
        let mut guard = self.lock().await;
        let db = open_conn(&mut guard)?;
        Ok(BoardSnapshot {
            activities: load_activities(db, None, limit)?,
            columns: load_columns(db)?,
            stats: load_stats(db)?,
        })
    }
}

fn load_activities(
    db: &Connection,
    status: Option<&str>,
    limit: usize,
) -> rusqlite::Result<Vec<MirroredActivity>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    match status {
        Some(status) => {
            let mut stmt = db.prepare(&format!(
                "SELECT {} FROM activities WHERE status = ?1
                 ORDER BY timestamp DESC, id LIMIT ?2",
                ACTIVITY_COLUMNS
            ))?;
            stmt.query_map(params![status, limit], row_to_activity)?
                .collect()
        }
        None => {
            let mut stmt = db.prepare(&format!(
                "SELECT {} FROM activities ORDER BY timestamp DESC, id LIMIT ?1",
                ACTIVITY_COLUMNS
            ))?;
            stmt.query_map(params![limit], row_to_activity)?.collect()
        }
    }
}

fn load_columns(db: &Connection) -> rusqlite::Result<Vec<BoardColumn>> {
    let mut stmt =
        db.prepare("SELECT id, name, position, color FROM board_columns ORDER BY position")?;
    stmt.query_map([], |row| {
        Ok(BoardColumn {
            id: row.get(0)?,
            name: row.get(1)?,
            position: row.get(2)?,
            color: row.get(3)?,
        })
    })?
    .collect()
}

fn row_to_activity(row: &Row<'_>) -> rusqlite::Result<MirroredActivity> {
    let metadata: String = row.get(3)?;
    let result: Option<String> = row.get(7)?;
    Ok(MirroredActivity {
        id: row.get(0)?,
        kind: row.get(1)?,
        description: row.get(2)?,
        metadata: serde_json::from_str(&metadata).unwrap_or_else(|_| empty_object()),
        status: row.get(4)?,
        timestamp: row.get(5)?,
        completed_at: row.get(6)?,
        result: result.and_then(|r| serde_json::from_str(&r).ok()),
        column_position: row.get(8)?,
        synced_at: row.get(9)?,
    })
}
