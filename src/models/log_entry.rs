//! Log entry record shared by the store, the cache and the HTTP API.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Storable record with a store-assigned integer identity.
pub trait Entity {
    fn id(&self) -> i64;
    fn set_id(&mut self, id: i64);
}

/// Application log entry
///
/// `id <= 0` means the entry has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub level: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    /// Create an unsaved entry stamped with the current time
    pub fn new(level: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: 0,
            level: level.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn is_persisted(&self) -> bool {
        self.id > 0
    }

    /// Round the timestamp down to the microsecond precision kept by the stores.
    pub(crate) fn normalize_timestamp(&mut self) {
        self.timestamp = self.timestamp.trunc_subsecs(6);
    }
}

impl Entity for LogEntry {
    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

/// Request body for creating a log entry
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateLogEntry {
    pub level: String,
    pub message: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl CreateLogEntry {
    pub fn into_entry(self) -> LogEntry {
        LogEntry {
            id: 0,
            level: self.level,
            message: self.message,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
        }
    }
}
