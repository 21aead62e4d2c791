//! Turn producer trait: the abstraction over the external decision maker.
//!
//! A producer looks at the current page and proposes what to do next. The
//! sandbox treats everything it returns as untrusted: `process_turn` yields
//! raw JSON which the controller validates with
//! [`TurnResult::from_value`](crate::turn::TurnResult::from_value).

use crate::browser::InteractiveElement;
use crate::error::ProducerError;
use crate::tool::ToolResultMessage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Snapshot of the page handed to the producer each turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageState {
    pub url: String,
    pub title: String,

    /// Accessibility tree as indented text, or a `role "name"` line per
    /// element when it came from the manual scan.
    pub accessibility_tree: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interactive_elements: Vec<InteractiveElement>,

    pub turn_number: u32,

    /// Error from the previous turn's last failed action, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The external decision maker driving a session.
///
/// Implementations: webhook agents, LLM adapters, scripted test producers.
#[async_trait]
pub trait TurnProducer: Send + Sync {
    /// Prime the producer with the session's prompts. Called once per task.
    async fn initialize(&self, system_prompt: &str, task_prompt: &str) -> Result<(), ProducerError>;

    /// Propose the next turn for the given page state.
    async fn process_turn(&self, page_state: &PageState) -> Result<serde_json::Value, ProducerError>;

    /// Receive the results of the tool calls executed for the last turn.
    async fn supply_tool_results(&self, results: &[ToolResultMessage]) -> Result<(), ProducerError>;
}
