//! Structured pipeline events for external observers.
//!
//! The pipeline never persists anything itself; everything an external
//! persistence or status layer needs (resolved decisions, dedup drops,
//! backend failures) is published here as serializable events. Publishing
//! is fire-and-forget: a bus with no subscribers drops events silently, and
//! slow subscribers lag rather than block the pipeline.

use serde::Serialize;
use tokio::sync::broadcast;

/// Buffered events per subscriber before lagging sets in.
const DEFAULT_CAPACITY: usize = 256;

/// Everything observable about the pipeline, in emission order.
///
/// `cycle_id` correlates the events of one decision cycle.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A window's elements did not form a dialog.
    DialogDiscarded {
        app: String,
        reason: String,
    },
    /// An unchanged dialog was suppressed before resolution.
    DialogDeduplicated {
        app: String,
    },
    /// A single backend attempt failed; the fallback chain continues.
    BackendFailed {
        provider: String,
        error: String,
    },
    /// A decision was produced.
    DecisionResolved {
        cycle_id: String,
        app: String,
        chosen_option: String,
        confidence: f32,
        via: String,
        needs_confirmation: bool,
    },
    /// The decision is held for a human; it will not be executed.
    AwaitingConfirmation {
        cycle_id: String,
        app: String,
        chosen_option: String,
    },
    /// The executor performed the decision.
    ActionExecuted {
        cycle_id: String,
        app: String,
        chosen_option: String,
    },
    /// The executor reported a failure.
    ActionFailed {
        cycle_id: String,
        app: String,
        error: String,
    },
    /// No resolution path produced a decision; the dialog is left for a human.
    DialogUnhandled {
        cycle_id: String,
        app: String,
    },
}

/// Broadcast bus carrying [`PipelineEvent`]s to any number of subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Open a new subscription. Events published before this call are not
    /// replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Never blocks; no subscribers is not an error.
    pub fn publish(&self, event: PipelineEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
