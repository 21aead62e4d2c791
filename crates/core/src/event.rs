//! Session events: what a running session reports to the outside world.
//!
//! Sessions receive an [`EventSink`] at construction and never reach for a
//! process-wide emitter. Publishing is fire-and-forget: a sink must not block
//! the session on slow subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Event types emitted by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Status/progress snapshot.
    #[serde(rename = "agent:state")]
    AgentState,
    /// One executed (or rejected) tool call.
    #[serde(rename = "agent:action")]
    AgentAction,
    /// Producer reasoning for a turn.
    #[serde(rename = "agent:thinking")]
    AgentThinking,
    /// Session finished successfully.
    #[serde(rename = "agent:complete")]
    AgentComplete,
    /// Recoverable or terminal error.
    #[serde(rename = "agent:error")]
    AgentError,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AgentState => "agent:state",
            Self::AgentAction => "agent:action",
            Self::AgentThinking => "agent:thinking",
            Self::AgentComplete => "agent:complete",
            Self::AgentError => "agent:error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A published event with its routing metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub competition_id: String,
    pub event_id: String,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// Event transport consumed by sessions. Must be safe for concurrent
/// publish from many sessions.
pub trait EventSink: Send + Sync {
    fn publish(&self, kind: EventKind, competition_id: &str, payload: serde_json::Value, event_id: &str);
}

/// A broadcast-based event sink.
///
/// Uses `tokio::sync::broadcast`: publishing never waits, and subscribers
/// that fall behind lose the oldest events instead of stalling sessions.
pub struct BroadcastEventSink {
    sender: broadcast::Sender<Arc<EventEnvelope>>,
}

impl BroadcastEventSink {
    /// Create a new sink with the given per-subscriber buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<EventEnvelope>> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastEventSink {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventSink for BroadcastEventSink {
    fn publish(&self, kind: EventKind, competition_id: &str, payload: serde_json::Value, event_id: &str) {
        let envelope = EventEnvelope {
            kind,
            competition_id: competition_id.into(),
            event_id: event_id.into(),
            payload,
            timestamp: Utc::now(),
        };
        // No subscribers is fine
        if self.sender.send(Arc::new(envelope)).is_err() {
            tracing::trace!(%kind, "No event subscribers");
        }
    }
}
