use anyhow::Result;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::core::activity::timestamp_now;
use crate::core::mirror::{BoardColumn, BoardStats, MirrorStore, MirroredActivity};

const SNAPSHOT_LIMIT: usize = 100;

/// Messages pushed to dashboard subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoardEvent {
    FullUpdate {
        activities: Vec<MirroredActivity>,
        columns: Vec<BoardColumn>,
        stats: BoardStats,
        timestamp: String,
    },
    Update {
        activities: usize,
        timestamp: String,
    },
}

impl BoardEvent {
    /// The greeting a fresh subscriber receives, read from the store.
    pub async fn snapshot(store: &MirrorStore) -> Result<Self> {
        let snapshot = store.snapshot(SNAPSHOT_LIMIT).await?;
        Ok(BoardEvent::FullUpdate {
            activities: snapshot.activities,
            columns: snapshot.columns,
            stats: snapshot.stats,
            timestamp: timestamp_now(),
        })
    }

    pub fn update(activities: usize) -> Self {
        BoardEvent::Update {
            activities,
            timestamp: timestamp_now(),
        }
    }
}

/// Fan-out of serialized board events. Sending never blocks; slow
/// subscribers lose the oldest messages.
#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<String>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Returns how many subscribers the event was queued for.
    pub fn publish(&self, event: &BoardEvent) -> usize {
        let payload = match serde_json::to_string(event) {
            Ok(p) => p,
            Err(e) => {
                warn!("Failed to serialize board event: {}", e);
                return 0;
            }
        };
        match self.tx.send(payload) {
            Ok(n) => n,
            Err(_) => {
                debug!("No dashboard subscribers connected");
                0
            }
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(64)
    }
}
