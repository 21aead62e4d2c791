//! Turn results: what a producer returns for one turn.
//!
//! Producers hand back raw JSON. [`TurnResult::from_value`] is the only way
//! to obtain a `TurnResult` from producer output, so every field the
//! controller relies on has been checked structurally first.

use crate::tool::{ToolArguments, ToolCall};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Token accounting reported by the producer for one turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// A structurally valid turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,

    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,

    #[serde(default)]
    pub done: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

/// Why a producer response was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid turn result: {0}")]
pub struct InvalidTurn(pub String);

impl TurnResult {
    /// A turn that only signals completion.
    pub fn finished(result: Option<Value>) -> Self {
        Self {
            done: true,
            result,
            ..Default::default()
        }
    }

    /// Validate the shape of raw producer output.
    ///
    /// Accepted: an object whose optional `toolCalls` is an array of objects
    /// with a string `name`, optional string `id` and object-or-JSON-string
    /// `arguments`; optional boolean `done`; optional string `thinking`;
    /// optional `usage` with non-negative integer token counts.
    pub fn from_value(value: &Value) -> Result<Self, InvalidTurn> {
        let obj = value
            .as_object()
            .ok_or_else(|| InvalidTurn("expected an object".into()))?;

        let thinking = match obj.get("thinking") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => return Err(InvalidTurn("thinking must be a string".into())),
        };

        let done = match obj.get("done") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(_) => return Err(InvalidTurn("done must be a boolean".into())),
        };

        let tool_calls = match obj.get("toolCalls") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| parse_tool_call(i, item))
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(InvalidTurn("toolCalls must be an array".into())),
        };

        let usage = match obj.get("usage") {
            None | Some(Value::Null) => None,
            Some(u) => Some(parse_usage(u)?),
        };

        Ok(Self {
            thinking,
            tool_calls,
            done,
            result: obj.get("result").filter(|v| !v.is_null()).cloned(),
            usage,
        })
    }
}

fn parse_tool_call(index: usize, item: &Value) -> Result<ToolCall, InvalidTurn> {
    let obj = item
        .as_object()
        .ok_or_else(|| InvalidTurn(format!("toolCalls[{index}] must be an object")))?;

    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| InvalidTurn(format!("toolCalls[{index}].name must be a string")))?;

    let id = match obj.get("id") {
        None | Some(Value::Null) => format!("call_{index}"),
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err(InvalidTurn(format!("toolCalls[{index}].id must be a string"))),
    };

    let arguments = match obj.get("arguments") {
        None | Some(Value::Null) => ToolArguments::new(),
        Some(Value::Object(map)) => map.clone(),
        // Providers frequently hand back function arguments as a JSON string.
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            _ => {
                return Err(InvalidTurn(format!(
                    "toolCalls[{index}].arguments is not a JSON object"
                )));
            }
        },
        Some(_) => {
            return Err(InvalidTurn(format!(
                "toolCalls[{index}].arguments must be an object"
            )));
        }
    };

    Ok(ToolCall::new(id, name, arguments))
}

fn parse_usage(value: &Value) -> Result<TokenUsage, InvalidTurn> {
    let obj = value
        .as_object()
        .ok_or_else(|| InvalidTurn("usage must be an object".into()))?;
    let count = |key: &str| match obj.get(key) {
        None | Some(Value::Null) => Ok(0),
        Some(v) => v
            .as_u64()
            .ok_or_else(|| InvalidTurn(format!("usage.{key} must be a non-negative integer"))),
    };
    Ok(TokenUsage {
        input_tokens: count("inputTokens")?,
        output_tokens: count("outputTokens")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_turn_parses() {
        let turn = TurnResult::from_value(&json!({
            "thinking": "click the button",
            "toolCalls": [
                {"id": "t1", "name": "click", "arguments": {"element": "Submit"}},
                {"name": "scroll", "arguments": "{\"direction\":\"down\"}"}
            ],
            "done": false,
            "usage": {"inputTokens": 1200, "outputTokens": 80}
        }))
        .unwrap();

        assert_eq!(turn.thinking.as_deref(), Some("click the button"));
        assert_eq!(turn.tool_calls.len(), 2);
        assert_eq!(turn.tool_calls[0].id, "t1");
        assert_eq!(turn.tool_calls[1].id, "call_1");
        assert_eq!(turn.tool_calls[1].str_arg("direction"), Some("down"));
        assert_eq!(
            turn.usage,
            Some(TokenUsage {
                input_tokens: 1200,
                output_tokens: 80
            })
        );
    }

    #[test]
    fn done_only_turn() {
        let turn = TurnResult::from_value(&json!({"done": true, "result": {"answer": 42}})).unwrap();
        assert!(turn.done);
        assert!(turn.tool_calls.is_empty());
        assert_eq!(turn.result, Some(json!({"answer": 42})));
    }

    #[test]
    fn non_object_rejected() {
        assert!(TurnResult::from_value(&json!("click stuff")).is_err());
        assert!(TurnResult::from_value(&json!(null)).is_err());
    }

    #[test]
    fn wrong_field_types_rejected() {
        assert!(TurnResult::from_value(&json!({"done": "yes"})).is_err());
        assert!(TurnResult::from_value(&json!({"toolCalls": {"name": "click"}})).is_err());
        assert!(TurnResult::from_value(&json!({"toolCalls": [{"arguments": {}}]})).is_err());
        assert!(TurnResult::from_value(&json!({"toolCalls": [{"name": "x", "arguments": [1]}]})).is_err());
        assert!(TurnResult::from_value(&json!({"usage": {"inputTokens": -5}})).is_err());
    }

    #[test]
    fn unparseable_string_arguments_rejected() {
        let err = TurnResult::from_value(&json!({
            "toolCalls": [{"name": "type", "arguments": "not json"}]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("arguments"));
    }
}
