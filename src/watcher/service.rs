use crate::batch::{BatchScheduler, run_scheduler};
use crate::config::PipelineConfig;
use crate::dispatch::{Dispatcher, run_dispatcher};
use crate::error::VigilError;
use crate::event::RawEvent;
use crate::incident::IncidentStore;
use crate::quarantine::Quarantine;
use crate::sink::Notifier;
use crate::stats::{PipelineStats, StatsSnapshot};
use crate::watcher::admission::{Admission, run_admission, run_forwarder};
use crate::watcher::watcher::setup_file_watcher;
use notify::RecommendedWatcher;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Sending half for raw `(event type, path)` notifications.
pub type RawEventSender = mpsc::UnboundedSender<RawEvent>;

const CAPTURE_QUEUE: usize = 256;
const EVENT_QUEUE: usize = 1024;
const BATCH_QUEUE: usize = 64;

/// Owns the triage pipeline: OS watcher, admission worker, hash forwarder,
/// batch scheduler and dispatcher, one tokio task each.
pub struct TriageService {
    config: PipelineConfig,
    dispatcher: Option<Dispatcher>,
    stats: Arc<PipelineStats>,
    watcher: Option<RecommendedWatcher>,
    tasks: Vec<JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TriageService {
    /// Validates the config and prepares the side-effect handlers.
    ///
    /// With `auto_quarantine` set the incident database is opened here, so a
    /// bad store location fails at startup rather than at the first incident.
    pub async fn create(
        config: PipelineConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, VigilError> {
        config.validate()?;

        let stats = Arc::new(PipelineStats::new());
        let mut dispatcher = Dispatcher::new(notifier).with_stats(stats.clone());

        if config.auto_quarantine {
            let store = IncidentStore::open(&config.incident_db, config.retry_delay()).await?;
            dispatcher = dispatcher
                .with_quarantine(Quarantine::new(&config.quarantine_dir, config.retry_delay()))
                .with_incident_store(store);
        }

        Ok(TriageService {
            config,
            dispatcher: Some(dispatcher),
            stats,
            watcher: None,
            tasks: Vec::new(),
            shutdown_tx: None,
        })
    }

    /// Starts the pipeline and attaches the OS watcher to the configured roots.
    pub fn run(&mut self) -> Result<(), VigilError> {
        let raw_tx = self.spawn_pipeline()?;
        match setup_file_watcher(&self.config.roots, raw_tx) {
            Ok(watcher) => {
                self.watcher = Some(watcher);
                Ok(())
            }
            Err(e) => {
                // Let the already spawned tasks wind down before reporting.
                self.shutdown_tx.take();
                Err(e)
            }
        }
    }

    /// Starts the pipeline without an OS watcher; events come from the
    /// returned sender instead.
    pub fn run_detached(&mut self) -> Result<RawEventSender, VigilError> {
        self.spawn_pipeline()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Stops accepting events, flushes every stage in order and waits for
    /// the dispatcher to finish the last batch.
    pub async fn shutdown(&mut self) -> Result<(), VigilError> {
        // NOTE: dropping the watcher releases its sender as well.
        self.watcher.take();
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!(error = %e, "pipeline task ended abnormally");
            }
        }

        info!("triage pipeline stopped");
        Ok(())
    }

    fn spawn_pipeline(&mut self) -> Result<RawEventSender, VigilError> {
        let dispatcher = self
            .dispatcher
            .take()
            .ok_or_else(|| VigilError::Other("pipeline already running".into()))?;

        let (raw_tx, raw_rx) = mpsc::unbounded_channel::<RawEvent>();
        let (capture_tx, capture_rx) = mpsc::channel(CAPTURE_QUEUE);
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE);
        let (batch_tx, batch_rx) = mpsc::channel(BATCH_QUEUE);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let admission = Admission::new(&self.config, self.stats.clone());
        let scheduler = BatchScheduler::new(self.config.batch_size, self.config.batch_interval());

        self.tasks = vec![
            tokio::spawn(run_admission(admission, raw_rx, shutdown_rx, capture_tx)),
            tokio::spawn(run_forwarder(capture_rx, event_tx)),
            tokio::spawn(run_scheduler(scheduler, event_rx, batch_tx)),
            tokio::spawn(run_dispatcher(dispatcher, batch_rx)),
        ];
        self.shutdown_tx = Some(shutdown_tx);

        info!(
            batch_size = self.config.batch_size,
            batch_interval_ms = self.config.batch_interval_ms,
            rate_limit = self.config.rate_limit_per_minute,
            "triage pipeline started"
        );

        Ok(raw_tx)
    }
}
