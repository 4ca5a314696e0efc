mod activities;
mod metrics;
pub mod types;

pub use metrics::DEFAULT_METRICS_WINDOW_HOURS;
pub use types::{BoardColumn, BoardStats, MirroredActivity, PollBatch};

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::core::activity::Column;

/// SQLite-backed mirror of the tracker's activities plus sampled metrics.
///
/// One connection behind one async mutex: poll batches are written inside a
/// single transaction while holding the lock, so readers only ever see whole
/// batches.
#[derive(Clone)]
pub struct MirrorStore {
    db: Arc<Mutex<Option<Connection>>>,
    path: Option<PathBuf>,
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS activities (
        id TEXT PRIMARY KEY,
        type TEXT NOT NULL,
        description TEXT NOT NULL,
        metadata TEXT NOT NULL DEFAULT '{}',
        status TEXT NOT NULL,
        timestamp TEXT NOT NULL,
        completed_at TEXT,
        result TEXT,
        column_position INTEGER NOT NULL DEFAULT 0,
        synced_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS board_columns (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        position INTEGER NOT NULL,
        color TEXT
    );

    CREATE TABLE IF NOT EXISTS system_metrics (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        metric_name TEXT NOT NULL,
        metric_value REAL NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_activities_status ON activities(status);
    CREATE INDEX IF NOT EXISTS idx_activities_timestamp ON activities(timestamp DESC);
    CREATE INDEX IF NOT EXISTS idx_metrics_timestamp ON system_metrics(timestamp DESC);
";

impl MirrorStore {
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating store directory {}", parent.display()))?;
        }

        let db = Connection::open(&path)
            .with_context(|| format!("opening mirror store {}", path.display()))?;
        let mode: String =
            db.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        info!("Mirror store opened at {} (journal_mode={})", path.display(), mode);

        Self::bootstrap(db, Some(path))
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::bootstrap(Connection::open_in_memory()?, None)
    }

    fn bootstrap(db: Connection, path: Option<PathBuf>) -> Result<Self> {
        db.execute_batch(SCHEMA)?;

        let mut seed = db.prepare(
            "INSERT OR IGNORE INTO board_columns (name, position, color) VALUES (?1, ?2, ?3)",
        )?;
        for column in Column::ALL {
            seed.execute(rusqlite::params![
                column.name(),
                column.position(),
                column.color()
            ])?;
        }
        drop(seed);

        Ok(Self {
            db: Arc::new(Mutex::new(Some(db))),
            path,
        })
    }

    async fn lock(&self) -> MutexGuard<'_, Option<Connection>> {
        self.db.lock().await
    }

    /// Flush and close the connection. Later calls fail with "store is closed".
    pub async fn close(&self) -> Result<()> {
        let mut guard = self.lock().await;
        if let Some(db) = guard.take() {
            db.close().map_err(|(_, e)| e)?;
            match &self.path {
                Some(path) => info!("Mirror store {} closed", path.display()),
                None => info!("In-memory mirror store closed"),
            }
        }
        Ok(())
    }
}

fn open_conn(guard: &mut Option<Connection>) -> Result<&mut Connection> {
    guard
        .as_mut()
        .ok_or_else(|| anyhow::anyhow!("mirror store is closed"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn columns_are_seeded_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("board.db");

        let store = MirrorStore::open(&path).await.unwrap();
        store.close().await.unwrap();
        let store = MirrorStore::open(&path).await.unwrap();

        let columns = store.columns().await.unwrap();
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Pending", "In Progress", "Completed", "Failed"]);
        assert_eq!(store.path.as_deref(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn closed_store_rejects_queries() {
        let store = MirrorStore::open_in_memory().unwrap();
        store.close().await.unwrap();
        let err = store.columns().await.unwrap_err();
        assert!(err.to_string().contains("closed"));
        // Closing twice is harmless.
        store.close().await.unwrap();
    }
}
