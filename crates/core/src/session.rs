//! Session data model: agent identity, lifecycle state, action log entries,
//! task definitions and outcomes.

use crate::error::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Identity of the agent driving a session. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: Uuid,
    pub name: String,
    /// Model identifier, e.g. `claude-opus-4-20250514`. Drives pricing.
    pub model: String,
    pub provider: String,
}

impl AgentConfig {
    /// Build an agent identity. The id must be a well-formed UUID; numeric or
    /// free-form ids are rejected rather than trusted.
    pub fn new(
        id: &str,
        name: impl Into<String>,
        model: impl Into<String>,
        provider: impl Into<String>,
    ) -> Result<Self, Error> {
        let id = Uuid::parse_str(id.trim()).map_err(|_| Error::Config {
            message: format!("agent id must be a UUID, got '{id}'"),
        })?;
        Ok(Self {
            id,
            name: name.into(),
            model: model.into(),
            provider: provider.into(),
        })
    }
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Idle,
    Initializing,
    Running,
    Completed,
    Failed,
    Timeout,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Timeout)
    }

    /// Allowed moves: idle → initializing → running → terminal. Failure is
    /// reachable from any non-terminal state.
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        match (self, next) {
            (Idle, Initializing) | (Initializing, Running) => true,
            (Running, Completed) | (Running, Timeout) => true,
            (Idle | Initializing | Running, Failed) => true,
            _ => false,
        }
    }
}

/// Observable state of a session. Callers only ever get clones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub status: SessionStatus,
    /// 0 to 100; below 100 until completion.
    pub progress: u8,
    pub action_count: usize,
    pub current_action: Option<String>,
    pub last_url: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// One entry of the append-only action log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    pub timestamp: DateTime<Utc>,
    pub agent_id: String,
    pub tool_name: String,
    /// Short, sanitized description of the target (never a blocked payload).
    pub target: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A task a session is asked to complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    pub id: String,
    pub name: String,
    /// First page the session navigates to.
    pub start_url: String,
    pub task_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Wall-clock limit for the whole task.
    pub time_limit_secs: u64,
    /// Overrides the runner's max turns when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_turns: Option<u32>,
}

impl TaskDefinition {
    pub fn time_limit(&self) -> Duration {
        Duration::from_secs(self.time_limit_secs)
    }
}

/// Structured result of `run_task`. Every failure mode ends up here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOutcome {
    pub success: bool,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time_ms: Option<u64>,
    pub actions: Vec<ActionRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}
