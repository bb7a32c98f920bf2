//! Run-wide shared context: stop signal, worker slots, activity gauge, events.
//!
//! One `RunContext` is created per harvest run and cloned into every episode
//! pipeline. It is the only state the pipelines share; everything in it is
//! atomic or channel based.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::scheduler::{ActivityGauge, EpisodeEvent, EventKind, WorkerSlots};

#[derive(Clone)]
pub struct RunContext {
    cancel: CancellationToken,
    slots: Arc<WorkerSlots>,
    gauge: Arc<ActivityGauge>,
    events: Option<mpsc::Sender<EpisodeEvent>>,
}

impl RunContext {
    /// Context with `max_concurrent` worker slots (at least one).
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            cancel: CancellationToken::new(),
            slots: Arc::new(WorkerSlots::new(max_concurrent)),
            gauge: Arc::new(ActivityGauge::default()),
            events: None,
        }
    }

    /// Publishes stage events on `tx`.
    pub fn with_events(mut self, tx: mpsc::Sender<EpisodeEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Uses an externally owned stop signal (e.g. one wired to Ctrl-C).
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Fires the global stop signal.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    pub fn slots(&self) -> &Arc<WorkerSlots> {
        &self.slots
    }

    pub fn gauge(&self) -> &Arc<ActivityGauge> {
        &self.gauge
    }

    /// Sends an event if a listener is attached. A closed channel is ignored.
    pub async fn emit(&self, episode: u32, kind: EventKind) {
        if let Some(tx) = &self.events {
            let _ = tx.send(EpisodeEvent { episode, kind }).await;
        }
    }
}
