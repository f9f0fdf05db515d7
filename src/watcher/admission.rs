use crate::classify::classify;
use crate::config::PipelineConfig;
use crate::dedup::{DedupKey, DeduplicationCache};
use crate::event::{EventType, FileEvent, Priority, RawEvent};
use crate::filter::PathFilter;
use crate::hasher::{FileDigest, hash_file_bounded};
use crate::rate::{RateDecision, RateLimiter};
use crate::stats::{PipelineStats, bump};
use chrono::Utc;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Hot-path state of the single admission worker.
///
/// Owned by exactly one task, so the cache and the limiter need no locks.
#[derive(Debug)]
pub(crate) struct Admission {
    filter: PathFilter,
    // Quarantine directory and incident database files written by the
    // pipeline itself. Events on them are filtered out.
    own_dirs: Vec<PathBuf>,
    own_files: Vec<PathBuf>,
    limiter: RateLimiter,
    dedup: DeduplicationCache,
    hash_timeout: Duration,
    stats: Arc<PipelineStats>,
}

impl Admission {
    pub(crate) fn new(config: &PipelineConfig, stats: Arc<PipelineStats>) -> Self {
        Admission {
            filter: PathFilter::new(&config.include, &config.exclude),
            own_dirs: vec![config.quarantine_dir.clone()],
            own_files: database_files(&config.incident_db),
            limiter: RateLimiter::new(config.rate_limit_per_minute, Instant::now()),
            dedup: DeduplicationCache::new(config.dedup_window()),
            hash_timeout: config.hash_timeout(),
            stats,
        }
    }

    /// Filter, rate limit, classify and deduplicate one raw event.
    ///
    /// Returns the assigned priority when the event should continue to hashing.
    pub(crate) fn admit(&mut self, raw: &RawEvent, now: Instant) -> Option<Priority> {
        bump(&self.stats.received);

        if self.is_own_output(&raw.path) || !self.filter.should_process(&raw.path) {
            bump(&self.stats.filtered);
            trace!(path = %raw.path.display(), "excluded by path filter");
            return None;
        }

        match self.limiter.check(now) {
            RateDecision::Allowed => {}
            RateDecision::Rejected { first_in_window } => {
                bump(&self.stats.rate_limited);
                if first_in_window {
                    warn!("event rate limit reached, dropping events until the window resets");
                }
                return None;
            }
        }

        let priority = classify(raw.event_type, &raw.path);

        if !self
            .dedup
            .admit_key(DedupKey::new(&raw.path, raw.event_type), now)
        {
            bump(&self.stats.duplicates);
            trace!(path = %raw.path.display(), event_type = %raw.event_type, "duplicate suppressed");
            return None;
        }

        bump(&self.stats.admitted);
        Some(priority)
    }

    fn is_own_output(&self, path: &Path) -> bool {
        self.own_dirs.iter().any(|dir| path.starts_with(dir))
            || self.own_files.iter().any(|file| path == file)
    }
}

/// The SQLite database and the sidecar files it may create next to it.
fn database_files(db: &Path) -> Vec<PathBuf> {
    let mut files = vec![db.to_path_buf()];
    for suffix in ["-journal", "-wal", "-shm"] {
        let mut name = OsString::from(db.as_os_str());
        name.push(suffix);
        files.push(PathBuf::from(name));
    }
    files
}

/// Pulls raw events, admits them, and queues a hash task per admitted event.
///
/// Hash tasks are queued in admission order. On `shutdown` the input is
/// closed and whatever was already buffered is still admitted.
pub(crate) async fn run_admission(
    mut admission: Admission,
    mut input: mpsc::UnboundedReceiver<RawEvent>,
    mut shutdown: oneshot::Receiver<()>,
    output: mpsc::Sender<JoinHandle<FileEvent>>,
) {
    let mut closing = false;

    loop {
        let raw = tokio::select! {
            maybe = input.recv() => match maybe {
                Some(raw) => raw,
                None => break,
            },
            _ = &mut shutdown, if !closing => {
                debug!("admission closing input");
                input.close();
                closing = true;
                continue;
            }
        };

        let Some(priority) = admission.admit(&raw, Instant::now()) else {
            continue;
        };

        let handle = tokio::spawn(capture(raw, priority, admission.hash_timeout));
        if output.send(handle).await.is_err() {
            warn!("event queue closed, stopping admission");
            break;
        }
    }

    debug!("admission stopped");
}

/// Hands finished events to the scheduler in the order they were admitted.
pub(crate) async fn run_forwarder(
    mut input: mpsc::Receiver<JoinHandle<FileEvent>>,
    output: mpsc::Sender<FileEvent>,
) {
    while let Some(handle) = input.recv().await {
        match handle.await {
            Ok(event) => {
                if output.send(event).await.is_err() {
                    warn!("scheduler gone, stopping forwarder");
                    break;
                }
            }
            Err(e) => warn!(error = %e, "event capture task failed"),
        }
    }
}

async fn capture(raw: RawEvent, priority: Priority, hash_timeout: Duration) -> FileEvent {
    let timestamp = Utc::now();

    let digest = match raw.event_type {
        EventType::Created | EventType::Modified => {
            hash_file_bounded(raw.path.clone(), hash_timeout).await
        }
        _ => FileDigest::default(),
    };

    FileEvent::new(
        raw.event_type,
        raw.path,
        timestamp,
        digest.size,
        digest.digest,
        priority,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PipelineConfig {
        PipelineConfig {
            rate_limit_per_minute: 3,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn excluded_paths_do_not_consume_rate_budget() {
        let stats = Arc::new(PipelineStats::new());
        let mut admission = Admission::new(&config(), stats.clone());
        let now = Instant::now();

        for i in 0..5 {
            let raw = RawEvent::new(EventType::Created, format!("/w/build{i}.log"));
            assert!(admission.admit(&raw, now).is_none());
        }
        let raw = RawEvent::new(EventType::Created, "/w/report.pdf");
        assert_eq!(admission.admit(&raw, now), Some(Priority::High));

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.filtered, 5);
        assert_eq!(snapshot.rate_limited, 0);
        assert_eq!(snapshot.admitted, 1);
    }

    #[test]
    fn duplicates_are_counted_separately() {
        let stats = Arc::new(PipelineStats::new());
        let mut admission = Admission::new(&config(), stats.clone());
        let now = Instant::now();
        let raw = RawEvent::new(EventType::Modified, "/w/notes.txt");

        assert_eq!(admission.admit(&raw, now), Some(Priority::Medium));
        assert!(admission.admit(&raw, now).is_none());

        let other = RawEvent::new(EventType::Deleted, "/w/notes.txt");
        assert!(admission.admit(&other, now).is_some());

        assert_eq!(stats.snapshot().duplicates, 1);
    }

    #[test]
    fn own_quarantine_and_database_paths_are_filtered() {
        let stats = Arc::new(PipelineStats::new());
        let cfg = PipelineConfig {
            exclude: Vec::new(),
            quarantine_dir: PathBuf::from("/home/me/.local/share/vigil/quarantine"),
            incident_db: PathBuf::from("/home/me/.local/share/vigil/incidents.db"),
            ..config()
        };
        let mut admission = Admission::new(&cfg, stats.clone());
        let now = Instant::now();

        let own = [
            "/home/me/.local/share/vigil/quarantine/20260101T000000000Z_password_stealer.exe",
            "/home/me/.local/share/vigil/incidents.db",
            "/home/me/.local/share/vigil/incidents.db-journal",
            "/home/me/.local/share/vigil/incidents.db-wal",
        ];
        for path in own {
            let raw = RawEvent::new(EventType::Created, path);
            assert!(admission.admit(&raw, now).is_none(), "{path} was admitted");
        }

        // Sibling names that only share a prefix are still watched.
        let sibling = RawEvent::new(EventType::Created, "/home/me/.local/share/vigil/quarantined.txt");
        assert_eq!(admission.admit(&sibling, now), Some(Priority::Medium));

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.filtered, 4);
        assert_eq!(snapshot.rate_limited, 0);
        assert_eq!(snapshot.admitted, 1);
    }
}
