//! # vigil_core
//!
//! A file-event ingestion and triage pipeline. It watches directories, turns
//! raw filesystem notifications into classified events, suppresses noise,
//! batches what is left and routes every event to a handler matching its
//! urgency, quarantining dangerous executables on the way.
//!
//! ## Features
//!
//! - **Path filtering**: include/exclude globs with segment-aware `*`, `?` and `**`
//! - **Classification**: deterministic, first-match-wins priority tiers (1 = critical)
//! - **Content identity**: streaming SHA-256 with a bounded read time, off the hot path
//! - **Noise control**: a time-windowed duplicate cache and a per-minute rate ceiling
//! - **Batching**: size- or time-triggered release with exactly one release per batch
//! - **Dispatch**: priority-ordered handlers, automatic quarantine and SQLite incident reports
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vigil_core::{PipelineConfig, TracingNotifier, TriageService};
//!
//! # async fn start() -> Result<(), vigil_core::VigilError> {
//! let config = PipelineConfig {
//!     roots: vec!["/home/me/Downloads".into()],
//!     ..Default::default()
//! };
//!
//! let mut service = TriageService::create(config, Arc::new(TracingNotifier)).await?;
//! service.run()?;
//!
//! // ... later, flush buffered events and stop every stage
//! service.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! Each stage is a tokio task connected to the next by a channel:
//!
//! ```text
//! watcher -> admission (filter, rate limit, classify, dedup)
//!         -> hash tasks (awaited in admission order)
//!         -> batch scheduler -> dispatcher -> notifier / quarantine / incidents
//! ```
//!
//! - **[`filter`]**: include/exclude glob matching
//! - **[`classify`]**: priority tiers
//! - **[`hasher`]**: content digests
//! - **[`dedup`]** and **[`rate`]**: noise suppression
//! - **[`batch`]**: the batch state machine and its driver
//! - **[`dispatch`]**, **[`quarantine`]**, **[`incident`]**, **[`sink`]**: side effects
//! - **[`watcher`]**: OS notifications and the [`TriageService`] that wires it all
//!
//! ## Error Handling
//!
//! Startup returns [`VigilResult<T>`]. Once running, failures are contained to
//! the event that caused them: they are logged, counted in
//! [`StatsSnapshot::failures`] and never interrupt a batch.

pub mod batch;
pub mod classify;
pub mod config;
pub mod dedup;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod filter;
pub mod hasher;
pub mod incident;
pub mod logging;
pub mod quarantine;
pub mod rate;
pub mod sink;
pub mod stats;
pub mod watcher;

/// Re-exports the most commonly used types for convenience.
pub use config::PipelineConfig;
pub use error::{VigilError, VigilResult};
pub use event::{Batch, EventType, FileEvent, Priority, RawEvent};
pub use sink::{Notifier, RecordingNotifier, Severity, TracingNotifier};
pub use stats::StatsSnapshot;
pub use watcher::service::{RawEventSender, TriageService};
