//! Progress event broadcasting.
//!
//! Progress is pushed, one event per line of tool output or pipeline step.
//! Delivery is best-effort: with no subscribers events are dropped, and a
//! subscriber that falls behind the channel capacity loses the oldest events.
//! There is no replay for late subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default number of events buffered per subscriber.
pub const DEFAULT_PROGRESS_CAPACITY: usize = 1024;

/// A single progress line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub timestamp: DateTime<Utc>,
    pub text: String,
}

impl ProgressEvent {
    /// Event stamped with the current wall-clock time.
    pub fn now(text: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            text: text.into(),
        }
    }
}

/// Fan-out sender for progress events. Cloning shares the same channel.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: broadcast::Sender<ProgressEvent>,
}

impl Default for ProgressSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_PROGRESS_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Register a new subscriber. Only events emitted afterwards are seen.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish a line. Never blocks and never fails.
    pub fn emit(&self, text: impl Into<String>) {
        let event = ProgressEvent::now(text);
        tracing::debug!(target: "clipcraft::progress", "{}", event.text);
        // No subscribers is not an error.
        let _ = self.tx.send(event);
    }
}
