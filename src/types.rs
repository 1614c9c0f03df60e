use std::fmt;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Opaque identity used for deduplication: an external id or a content
/// fingerprint.
pub type ItemKey = String;

/// Which upstream source a poller serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    SourceA,
    SourceB,
}

impl SourceId {
    /// Owner name used with the coordinator.
    pub fn owner(&self) -> &'static str {
        match self {
            SourceId::SourceA => "source_a",
            SourceId::SourceB => "source_b",
        }
    }

    /// Registry category holding this source's processed item ids.
    pub fn category(&self) -> Category {
        match self {
            SourceId::SourceA => Category::SourceA,
            SourceId::SourceB => Category::SourceB,
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.owner())
    }
}

/// Registry category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    SourceA,
    SourceB,
    Files,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::SourceA => "source_a",
            Category::SourceB => "source_b",
            Category::Files => "files",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last successful send of the daily report, in the fixed zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyActionRecord {
    pub last_sent_date: NaiveDate,
    pub last_sent_time: NaiveTime,
}

/// Candidate listed by a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDescriptor {
    /// Stable external identifier.
    pub id: ItemKey,
    pub source: SourceId,
    /// Free-form listing metadata (subject line, department, ...).
    pub label: String,
}

/// Raw bytes fetched from a source or read from a scratch file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawArtifact {
    /// Where the bytes came from (item id or file path).
    pub origin: String,
    pub bytes: Vec<u8>,
}

impl RawArtifact {
    pub fn new(origin: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            origin: origin.into(),
            bytes: bytes.into(),
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Structured record extracted from an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_key: String,
    pub title: String,
    pub due_date: Option<NaiveDate>,
    pub source: Option<SourceId>,
}

/// Message handed to a notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    pub attachments: Vec<PathBuf>,
}

/// Outcome of one poller cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    pub listed: usize,
    pub new: usize,
    pub processed: usize,
    pub no_data: usize,
    pub failed: usize,
    /// Items left for the next cycle because the resource was busy.
    pub deferred: usize,
}

/// Outcome of one orchestrator tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub rolled_over: bool,
    pub daily_sent: bool,
    pub posted: usize,
    pub post_failures: usize,
}
