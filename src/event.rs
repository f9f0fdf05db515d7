use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// The kind of change reported for a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventType {
    Created,
    Modified,
    Deleted,
    DirectoryCreated,
    DirectoryDeleted,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Created => "created",
            EventType::Modified => "modified",
            EventType::Deleted => "deleted",
            EventType::DirectoryCreated => "directoryCreated",
            EventType::DirectoryDeleted => "directoryDeleted",
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, EventType::DirectoryCreated | EventType::DirectoryDeleted)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Urgency tier of an event. `Critical` (1) is the most urgent.
///
/// The derived ordering follows the tier number, so sorting ascending puts
/// critical events first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical = 1,
    High = 2,
    Medium = 3,
    Low = 4,
}

impl Priority {
    pub fn tier(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        };
        f.write_str(name)
    }
}

/// A raw notification as delivered by the watcher, before any triage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub event_type: EventType,
    pub path: PathBuf,
}

impl RawEvent {
    pub fn new(event_type: EventType, path: impl Into<PathBuf>) -> Self {
        Self {
            event_type,
            path: path.into(),
        }
    }
}

/// A classified, hashed file event.
///
/// Built once per admitted notification and never mutated afterwards; the
/// fields are private so every stage downstream of capture only reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    event_type: EventType,
    file_path: PathBuf,
    timestamp: DateTime<Utc>,
    file_size: u64,
    file_hash: String,
    priority: Priority,
}

impl FileEvent {
    pub fn new(
        event_type: EventType,
        file_path: PathBuf,
        timestamp: DateTime<Utc>,
        file_size: u64,
        file_hash: String,
        priority: Priority,
    ) -> Self {
        FileEvent {
            event_type,
            file_path,
            timestamp,
            file_size,
            file_hash,
            priority,
        }
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Size in bytes at capture time, `0` when the file could not be read.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Hex SHA-256 digest at capture time, empty when the file could not be read.
    pub fn file_hash(&self) -> &str {
        &self.file_hash
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Directory containing the file, or the path itself when it has no parent.
    pub fn source_directory(&self) -> &Path {
        self.file_path.parent().unwrap_or(&self.file_path)
    }
}

/// An ordered, immutable group of events released together by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    events: Vec<FileEvent>,
}

impl Batch {
    pub(crate) fn new(events: Vec<FileEvent>) -> Self {
        Batch { events }
    }

    pub fn events(&self) -> &[FileEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_events(self) -> Vec<FileEvent> {
        self.events
    }
}

impl From<Vec<FileEvent>> for Batch {
    fn from(events: Vec<FileEvent>) -> Self {
        Batch::new(events)
    }
}
