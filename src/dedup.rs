use crate::event::{EventType, FileEvent};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Identity used for duplicate suppression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    path: PathBuf,
    event_type: EventType,
}

impl DedupKey {
    pub fn new(path: &Path, event_type: EventType) -> Self {
        DedupKey {
            path: path.to_path_buf(),
            event_type,
        }
    }
}

/// Suppresses repeated `(path, event type)` notifications inside a window.
///
/// Expired entries are dropped lazily on every admission; there is no
/// background sweeper.
#[derive(Debug)]
pub struct DeduplicationCache {
    window: Duration,
    seen: HashMap<DedupKey, Instant>,
}

impl DeduplicationCache {
    pub fn new(window: Duration) -> Self {
        DeduplicationCache {
            window,
            seen: HashMap::new(),
        }
    }

    /// Returns `true` if the event is novel and should proceed.
    pub fn admit(&mut self, event: &FileEvent, now: Instant) -> bool {
        self.admit_key(DedupKey::new(event.file_path(), event.event_type()), now)
    }

    /// Same as [`admit`](Self::admit) for callers that have not built the
    /// event yet.
    ///
    /// A key seen within the window is suppressed and its timestamp is left
    /// untouched, so a steady stream of duplicates cannot extend the window.
    pub fn admit_key(&mut self, key: DedupKey, now: Instant) -> bool {
        self.evict_expired(now);

        if let Some(last) = self.seen.get(&key) {
            if now.saturating_duration_since(*last) < self.window {
                return false;
            }
        }

        self.seen.insert(key, now);
        true
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    fn evict_expired(&mut self, now: Instant) {
        let window = self.window;
        self.seen
            .retain(|_, last| now.saturating_duration_since(*last) < window);
    }
}
