//! Size- and time-bounded batching.
//!
//! [`BatchScheduler`] is a plain two-state machine (`Idle`, `Collecting`).
//! Every release goes through one `&mut self` transition that takes the
//! buffered events and clears the deadline together, so a size-triggered
//! release and an expired timer can never both release the same batch.
//! [`run_scheduler`] drives it from a channel with a `select!` over the
//! next event and the armed deadline.

use crate::event::{Batch, FileEvent};
use std::mem;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

#[derive(Debug)]
enum State {
    Idle,
    Collecting {
        events: Vec<FileEvent>,
        deadline: Instant,
    },
}

#[derive(Debug)]
pub struct BatchScheduler {
    threshold: usize,
    interval: Duration,
    state: State,
}

impl BatchScheduler {
    /// A `threshold` of zero is treated as one.
    pub fn new(threshold: usize, interval: Duration) -> Self {
        BatchScheduler {
            threshold: threshold.max(1),
            interval,
            state: State::Idle,
        }
    }

    /// Appends an event, arming the timer when idle.
    ///
    /// Returns the released batch when the size threshold is reached.
    pub fn add(&mut self, event: FileEvent, now: Instant) -> Option<Batch> {
        match self.state {
            State::Idle => {
                self.state = State::Collecting {
                    events: vec![event],
                    deadline: now + self.interval,
                };
            }
            State::Collecting { ref mut events, .. } => events.push(event),
        }

        if self.len() >= self.threshold {
            self.release()
        } else {
            None
        }
    }

    /// Releases the batch if its deadline has passed.
    pub fn expire(&mut self, now: Instant) -> Option<Batch> {
        match self.deadline() {
            Some(deadline) if now >= deadline => self.release(),
            _ => None,
        }
    }

    /// Forces out whatever is buffered. A no-op when idle.
    pub fn stop(&mut self) -> Option<Batch> {
        self.release()
    }

    /// The armed release deadline, `None` when idle.
    pub fn deadline(&self) -> Option<Instant> {
        match &self.state {
            State::Idle => None,
            State::Collecting { deadline, .. } => Some(*deadline),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::Idle)
    }

    pub fn len(&self) -> usize {
        match &self.state {
            State::Idle => 0,
            State::Collecting { events, .. } => events.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&mut self) -> Option<Batch> {
        match mem::replace(&mut self.state, State::Idle) {
            State::Idle => None,
            State::Collecting { events, .. } => Some(Batch::new(events)),
        }
    }
}

/// Feeds events from `input` into the scheduler and sends released batches
/// to `output`.
///
/// When `input` closes the buffered batch is flushed before returning.
pub async fn run_scheduler(
    mut scheduler: BatchScheduler,
    mut input: mpsc::Receiver<FileEvent>,
    output: mpsc::Sender<Batch>,
) {
    loop {
        let deadline = scheduler.deadline();

        let released = tokio::select! {
            maybe = input.recv() => match maybe {
                Some(event) => scheduler.add(event, Instant::now()),
                None => break,
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                scheduler.expire(Instant::now())
            }
        };

        if let Some(batch) = released {
            debug!(size = batch.len(), "releasing batch");
            if output.send(batch).await.is_err() {
                warn!("dispatcher gone, stopping scheduler");
                return;
            }
        }
    }

    if let Some(batch) = scheduler.stop() {
        debug!(size = batch.len(), "flushing batch on shutdown");
        if output.send(batch).await.is_err() {
            warn!("dispatcher gone, final batch dropped");
        }
    }
}
