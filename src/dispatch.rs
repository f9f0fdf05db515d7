use crate::classify::has_risky_extension;
use crate::event::{Batch, EventType, FileEvent, Priority};
use crate::incident::{IncidentReport, IncidentStore};
use crate::quarantine::Quarantine;
use crate::sink::{Notifier, Severity};
use crate::stats::{PipelineStats, bump};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

/// What the dispatcher did with one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Notified,
    Quarantined(PathBuf),
    QuarantineFailed(String),
    Logged,
    Silent,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRecord {
    pub path: PathBuf,
    pub priority: Priority,
    pub action: Action,
}

/// Routes released batches to the per-tier handlers.
pub struct Dispatcher {
    notifier: Arc<dyn Notifier>,
    quarantine: Option<Quarantine>,
    incidents: Option<IncidentStore>,
    stats: Arc<PipelineStats>,
}

impl Dispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Dispatcher {
            notifier,
            quarantine: None,
            incidents: None,
            stats: Arc::new(PipelineStats::new()),
        }
    }

    /// Enables automatic quarantine of risky executables in the critical tier.
    pub fn with_quarantine(mut self, quarantine: Quarantine) -> Self {
        self.quarantine = Some(quarantine);
        self
    }

    pub fn with_incident_store(mut self, store: IncidentStore) -> Self {
        self.incidents = Some(store);
        self
    }

    pub fn with_stats(mut self, stats: Arc<PipelineStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Handles every event of the batch, most urgent tier first.
    ///
    /// The sort is stable so events of one tier keep their arrival order.
    /// A failing event is recorded and the rest of the batch still runs.
    pub async fn dispatch(&self, batch: Batch) -> Vec<DispatchRecord> {
        let mut events = batch.into_events();
        events.sort_by_key(|event| event.priority());

        bump(&self.stats.batches);
        debug!(size = events.len(), "dispatching batch");

        let mut records = Vec::with_capacity(events.len());
        for event in &events {
            let action = match event.priority() {
                Priority::Critical => self.handle_critical(event).await,
                Priority::High => self.handle_high(event),
                Priority::Medium => {
                    info!(
                        path = %event.file_path().display(),
                        event_type = %event.event_type(),
                        size = event.file_size(),
                        "medium priority file event"
                    );
                    Action::Logged
                }
                Priority::Low => {
                    trace!(path = %event.file_path().display(), event_type = %event.event_type(), "low priority file event");
                    Action::Silent
                }
            };

            bump(&self.stats.dispatched);
            if matches!(action, Action::Failed(_) | Action::QuarantineFailed(_)) {
                bump(&self.stats.failures);
            }

            records.push(DispatchRecord {
                path: event.file_path().to_path_buf(),
                priority: event.priority(),
                action,
            });
        }

        records
    }

    async fn handle_critical(&self, event: &FileEvent) -> Action {
        let notified = self.send(event, Severity::Critical);

        let quarantine = match &self.quarantine {
            Some(q) if should_quarantine(event) => q,
            _ => return notified,
        };

        // The record carries the quarantine outcome, so count a failed
        // notification here or it is lost.
        if matches!(notified, Action::Failed(_)) {
            bump(&self.stats.failures);
        }

        match quarantine.isolate(event.file_path()).await {
            Ok(dest) => {
                bump(&self.stats.quarantined);
                warn!(
                    path = %event.file_path().display(),
                    quarantine = %dest.display(),
                    "file quarantined"
                );
                self.report(event, &dest).await;
                Action::Quarantined(dest)
            }
            Err(e) => {
                error!(path = %event.file_path().display(), error = %e, "quarantine failed");
                Action::QuarantineFailed(e.to_string())
            }
        }
    }

    fn handle_high(&self, event: &FileEvent) -> Action {
        self.send(event, Severity::High)
    }

    async fn report(&self, event: &FileEvent, dest: &std::path::Path) {
        let Some(store) = &self.incidents else {
            return;
        };

        let report =
            IncidentReport::quarantined(event.file_path(), dest, event.file_hash(), event.file_size());
        if let Err(e) = store.record(&report).await {
            bump(&self.stats.failures);
            error!(path = %event.file_path().display(), error = %e, "incident report not written");
        }
    }

    fn send(&self, event: &FileEvent, severity: Severity) -> Action {
        let message = format_message(event, severity);
        let notifier = &self.notifier;

        match panic::catch_unwind(AssertUnwindSafe(|| notifier.notify(&message, severity))) {
            Ok(Ok(())) => {
                bump(&self.stats.notifications);
                Action::Notified
            }
            Ok(Err(e)) => {
                error!(path = %event.file_path().display(), error = %e, "notification failed");
                Action::Failed(e.to_string())
            }
            Err(_) => {
                error!(path = %event.file_path().display(), "notifier panicked");
                Action::Failed("notifier panicked".to_owned())
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("quarantine", &self.quarantine)
            .field("incidents", &self.incidents.is_some())
            .finish_non_exhaustive()
    }
}

/// Drains `input` until every sender is gone.
pub async fn run_dispatcher(dispatcher: Dispatcher, mut input: mpsc::Receiver<Batch>) {
    while let Some(batch) = input.recv().await {
        dispatcher.dispatch(batch).await;
    }
    debug!("dispatcher stopped");
}

// Deleted paths and directories have nothing left to move.
fn should_quarantine(event: &FileEvent) -> bool {
    matches!(event.event_type(), EventType::Created | EventType::Modified)
        && has_risky_extension(event.file_path())
}

fn format_message(event: &FileEvent, severity: Severity) -> String {
    let label = match severity {
        Severity::Critical => "CRITICAL",
        Severity::High => "HIGH",
    };
    format!(
        "[{label}] {} {} ({} bytes) at {}",
        event.event_type(),
        event.file_path().display(),
        event.file_size(),
        event.timestamp().to_rfc3339()
    )
}
