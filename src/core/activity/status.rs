use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Lifecycle status of an activity.
///
/// The wire format is a free-form string. Known values map onto dedicated
/// variants; anything else is kept verbatim in `Unrecognized` so that
/// round-tripping never loses information.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivityStatus {
    Pending,
    Running,
    InProgress,
    Completed,
    Success,
    Failed,
    Error,
    Unrecognized(String),
}

impl ActivityStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "pending" => Self::Pending,
            "running" => Self::Running,
            "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            "success" => Self::Success,
            "failed" => Self::Failed,
            "error" => Self::Error,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Error => "error",
            Self::Unrecognized(raw) => raw,
        }
    }

    /// Board column for this status. Unrecognized statuses land in
    /// `Column::Pending`; use [`classify`] when the fallback should be logged.
    pub fn column(&self) -> Column {
        match self {
            Self::Pending | Self::Unrecognized(_) => Column::Pending,
            Self::Running | Self::InProgress => Column::InProgress,
            Self::Completed | Self::Success => Column::Completed,
            Self::Failed | Self::Error => Column::Failed,
        }
    }
}

impl From<String> for ActivityStatus {
    fn from(raw: String) -> Self {
        match Self::parse(&raw) {
            Self::Unrecognized(_) => Self::Unrecognized(raw),
            known => known,
        }
    }
}

impl From<ActivityStatus> for String {
    fn from(status: ActivityStatus) -> Self {
        match status {
            ActivityStatus::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display bucket on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl Column {
    pub const ALL: [Column; 4] = [
        Column::Pending,
        Column::InProgress,
        Column::Completed,
        Column::Failed,
    ];

    pub fn position(self) -> i64 {
        match self {
            Column::Pending => 0,
            Column::InProgress => 1,
            Column::Completed => 2,
            Column::Failed => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Column::Pending => "Pending",
            Column::InProgress => "In Progress",
            Column::Completed => "Completed",
            Column::Failed => "Failed",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Column::Pending => "#94a3b8",
            Column::InProgress => "#3b82f6",
            Column::Completed => "#22c55e",
            Column::Failed => "#ef4444",
        }
    }
}

/// Classify a status into its column, warning when the fallback bucket is used.
pub fn classify(status: &ActivityStatus) -> Column {
    if let ActivityStatus::Unrecognized(raw) = status {
        warn!(status = %raw, "Unrecognized activity status, placing in Pending column");
    }
    status.column()
}
