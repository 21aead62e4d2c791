//! Audit trail of safety denials.
//!
//! Entries name the agent, the tool and the gate that fired. They never hold
//! the rejected arguments, so the trail is safe to export.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub agent_id: String,
    /// Tool name as proposed, which may be outside the vocabulary.
    pub tool: String,
    pub event: AuditEvent,
    pub outcome: AuditOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Which gate stopped the action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    ToolDenied,
    ArgumentsRejected,
    /// Rule names only.
    ContentBlocked { rules: Vec<String> },
    EgressDenied { host: String },
}

/// `Denied` for structural rejections, `Blocked` for safety hits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Denied,
    Blocked,
}

/// Where entries go besides the in-memory trail.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditEntry);
}

/// Per-session audit trail. Single writer: owned by the session's executor.
pub struct AuditLogger {
    entries: Vec<AuditEntry>,
    sinks: Vec<Box<dyn AuditSink>>,
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("entries", &self.entries.len())
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

/// Logs through [`TracingSink`].
impl Default for AuditLogger {
    fn default() -> Self {
        Self::new().with_sink(Box::new(TracingSink))
    }
}

impl AuditLogger {
    /// A trail with no sinks attached.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            sinks: Vec::new(),
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn AuditSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn record(
        &mut self,
        agent_id: &str,
        tool: &str,
        event: AuditEvent,
        outcome: AuditOutcome,
        reason: Option<String>,
    ) {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            agent_id: agent_id.to_string(),
            tool: tool.to_string(),
            event,
            outcome,
            reason,
        };
        self.sinks.iter().for_each(|sink| sink.record(&entry));
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn by_outcome(&self, outcome: AuditOutcome) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter().filter(move |e| e.outcome == outcome)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Emits each entry as a `warn` event under the `audit` target.
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, entry: &AuditEntry) {
        tracing::warn!(
            target: "audit",
            agent = %entry.agent_id,
            tool = %entry.tool,
            event = ?entry.event,
            outcome = ?entry.outcome,
            reason = entry.reason.as_deref().unwrap_or(""),
            "Tool call stopped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn sample() -> AuditLogger {
        let mut trail = AuditLogger::new();
        trail.record("agent-1", "execute_shell", AuditEvent::ToolDenied, AuditOutcome::Denied, None);
        trail.record(
            "agent-1",
            "type",
            AuditEvent::ContentBlocked { rules: vec!["eval".into()] },
            AuditOutcome::Blocked,
            None,
        );
        trail.record(
            "agent-1",
            "api_call",
            AuditEvent::EgressDenied { host: "10.0.0.1".into() },
            AuditOutcome::Blocked,
            Some("private address blocked".into()),
        );
        trail
    }

    #[test]
    fn entries_keep_order() {
        let trail = sample();
        let tools: Vec<&str> = trail.entries().iter().map(|e| e.tool.as_str()).collect();
        assert_eq!(tools, ["execute_shell", "type", "api_call"]);
    }

    #[test]
    fn filter_by_outcome() {
        let trail = sample();
        assert_eq!(trail.by_outcome(AuditOutcome::Denied).count(), 1);
        assert_eq!(trail.by_outcome(AuditOutcome::Blocked).count(), 2);
    }

    #[test]
    fn clear_empties_the_trail() {
        let mut trail = sample();
        trail.clear();
        assert!(trail.is_empty());
    }

    #[test]
    fn entry_wire_format() {
        let trail = sample();
        let json = serde_json::to_value(&trail.entries()[2]).unwrap();
        assert_eq!(json["agentId"], "agent-1");
        assert_eq!(json["event"]["type"], "egress_denied");
        assert_eq!(json["event"]["host"], "10.0.0.1");
        assert_eq!(json["outcome"], "blocked");

        let json = serde_json::to_value(&trail.entries()[0]).unwrap();
        assert!(json.get("reason").is_none());
    }

    #[test]
    fn sinks_see_every_entry() {
        struct Collect(Arc<Mutex<Vec<String>>>);

        impl AuditSink for Collect {
            fn record(&self, entry: &AuditEntry) {
                self.0.lock().unwrap().push(entry.tool.clone());
            }
        }

        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut trail = AuditLogger::new().with_sink(Box::new(Collect(seen.clone())));
        trail.record("a", "read_file", AuditEvent::ToolDenied, AuditOutcome::Denied, None);
        assert_eq!(*seen.lock().unwrap(), ["read_file"]);
    }

    #[test]
    fn default_attaches_tracing_sink() {
        let dbg = format!("{:?}", AuditLogger::default());
        assert!(dbg.contains("sinks: 1"));
    }
}
