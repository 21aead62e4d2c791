//! Tool vocabulary: the closed set of actions an agent may propose.
//!
//! Tool calls arrive from model output and are untrusted: the `name` is kept
//! as a raw string until the allowlist has resolved it to a [`ToolName`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Arguments of a tool call, as proposed by the turn producer.
pub type ToolArguments = serde_json::Map<String, serde_json::Value>;

/// Every tool the sandbox knows how to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    Navigate,
    Click,
    Type,
    Select,
    Scroll,
    Wait,
    Submit,
    Done,
    ApiCall,
}

impl ToolName {
    /// The complete vocabulary, in wire order.
    pub const ALL: [ToolName; 9] = [
        Self::Navigate,
        Self::Click,
        Self::Type,
        Self::Select,
        Self::Scroll,
        Self::Wait,
        Self::Submit,
        Self::Done,
        Self::ApiCall,
    ];

    /// Wire name of the tool.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Navigate => "navigate",
            Self::Click => "click",
            Self::Type => "type",
            Self::Select => "select",
            Self::Scroll => "scroll",
            Self::Wait => "wait",
            Self::Submit => "submit",
            Self::Done => "done",
            Self::ApiCall => "api_call",
        }
    }

    /// Resolve a wire name. Matching is exact: `"Navigate"` is not a tool.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    /// Tools whose target is a URL and therefore go through the egress guard.
    pub fn touches_network(self) -> bool {
        matches!(self, Self::Navigate | Self::ApiCall)
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to execute a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID assigned by the producer
    pub id: String,

    /// Name of the tool to execute (unvalidated)
    pub name: String,

    /// Arguments as a JSON object
    #[serde(default)]
    pub arguments: ToolArguments,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: ToolArguments) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// String argument lookup.
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }

    /// Numeric argument lookup.
    pub fn f64_arg(&self, key: &str) -> Option<f64> {
        self.arguments.get(key).and_then(|v| v.as_f64())
    }
}

/// The result of one tool call, fed back to the producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultMessage {
    pub tool_call_id: String,
    pub tool_name: String,
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResultMessage {
    pub fn ok(call: &ToolCall, result: impl Into<String>) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            result: result.into(),
            error: None,
        }
    }

    pub fn failed(call: &ToolCall, error: impl Into<String>) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            result: String::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
