//! Tool allowlist and argument validation.
//!
//! The allowlist is a configuration constant, never derived from what the
//! model claims to support. Argument validation checks shape only: required
//! fields present, scalar types as expected, and every string bounded in
//! length, nested ones included. Unknown fields are otherwise ignored.

use crate::content::strings_in;
use arenaguard_core::tool::{ToolArguments, ToolName};
use serde_json::Value;
use std::collections::HashSet;

/// The closed set of tools the executor will run.
#[derive(Debug, Clone)]
pub struct ToolAllowlist {
    allowed: HashSet<ToolName>,
}

impl ToolAllowlist {
    /// Allow exactly the given tools.
    pub fn new(tools: impl IntoIterator<Item = ToolName>) -> Self {
        Self {
            allowed: tools.into_iter().collect(),
        }
    }

    /// Check a raw tool name from model output.
    pub fn is_allowed(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Resolve a raw name to an allowed tool.
    pub fn resolve(&self, name: &str) -> Option<ToolName> {
        ToolName::from_name(name).filter(|t| self.allowed.contains(t))
    }
}

impl Default for ToolAllowlist {
    /// The full vocabulary.
    fn default() -> Self {
        Self::new(ToolName::ALL)
    }
}

/// Why a tool call's arguments were rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("{tool}: {field} required")]
    Missing { tool: ToolName, field: &'static str },

    #[error("{tool}: {field} must be a {expected}")]
    WrongType {
        tool: ToolName,
        field: String,
        expected: &'static str,
    },

    #[error("{tool}: {field} too long (max {max} characters)")]
    TooLong { tool: ToolName, field: String, max: usize },

    #[error("{tool}: {field} {reason}")]
    InvalidValue {
        tool: ToolName,
        field: &'static str,
        reason: String,
    },
}

#[derive(Clone, Copy)]
enum Kind {
    Text,
    Number,
}

struct FieldSpec {
    name: &'static str,
    kind: Kind,
    required: bool,
}

const fn text(name: &'static str, required: bool) -> FieldSpec {
    FieldSpec {
        name,
        kind: Kind::Text,
        required,
    }
}

const fn number(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind: Kind::Number,
        required: false,
    }
}

fn schema(tool: ToolName) -> &'static [FieldSpec] {
    const NAVIGATE: &[FieldSpec] = &[text("url", true)];
    const CLICK: &[FieldSpec] = &[text("element", true)];
    const TYPE: &[FieldSpec] = &[text("element", true), text("text", true)];
    const SELECT: &[FieldSpec] = &[text("element", true), text("option", true)];
    const SCROLL: &[FieldSpec] = &[text("direction", false), number("amount")];
    const WAIT: &[FieldSpec] = &[number("ms"), text("selector", false), text("state", false)];
    const SUBMIT: &[FieldSpec] = &[text("element", false)];
    const API_CALL: &[FieldSpec] = &[text("url", true), text("method", false), text("body", false)];

    match tool {
        ToolName::Navigate => NAVIGATE,
        ToolName::Click => CLICK,
        ToolName::Type => TYPE,
        ToolName::Select => SELECT,
        ToolName::Scroll => SCROLL,
        ToolName::Wait => WAIT,
        ToolName::Submit => SUBMIT,
        ToolName::ApiCall => API_CALL,
        ToolName::Done => &[],
    }
}

/// Per-tool argument shape checks.
#[derive(Debug, Clone)]
pub struct ArgumentValidator {
    max_string_length: usize,
    max_wait_ms: u64,
    max_scroll_amount: f64,
}

impl ArgumentValidator {
    pub fn new(max_string_length: usize, max_wait_ms: u64) -> Self {
        Self {
            max_string_length,
            max_wait_ms,
            max_scroll_amount: 10_000.0,
        }
    }

    pub fn max_string_length(&self) -> usize {
        self.max_string_length
    }

    /// Validate the arguments of a call to `name`.
    ///
    /// `done` accepts anything: its payload is logged, never executed.
    pub fn validate_args(&self, name: &str, args: &ToolArguments) -> Result<(), ArgumentError> {
        let tool = ToolName::from_name(name).ok_or_else(|| ArgumentError::UnknownTool(name.into()))?;
        if tool == ToolName::Done {
            return Ok(());
        }

        for spec in schema(tool) {
            match (args.get(spec.name), spec.kind) {
                (None | Some(Value::Null), _) if spec.required => {
                    return Err(ArgumentError::Missing {
                        tool,
                        field: spec.name,
                    });
                }
                (None | Some(Value::Null), _) => {}
                (Some(Value::String(s)), Kind::Text) if s.trim().is_empty() && spec.required => {
                    return Err(ArgumentError::Missing {
                        tool,
                        field: spec.name,
                    });
                }
                (Some(Value::String(_)), Kind::Text) => {}
                (Some(v), Kind::Number) if numeric(v).is_some() => {}
                (Some(_), kind) => {
                    return Err(ArgumentError::WrongType {
                        tool,
                        field: spec.name.into(),
                        expected: match kind {
                            Kind::Text => "string",
                            Kind::Number => "number",
                        },
                    });
                }
            }
        }

        // Every string bounded, known field or not, however deeply nested
        for (field, value) in args {
            if strings_in(value).any(|s| s.chars().count() > self.max_string_length) {
                return Err(ArgumentError::TooLong {
                    tool,
                    field: field.clone(),
                    max: self.max_string_length,
                });
            }
        }

        self.validate_values(tool, args)
    }

    fn validate_values(&self, tool: ToolName, args: &ToolArguments) -> Result<(), ArgumentError> {
        match tool {
            ToolName::Scroll => {
                if let Some(dir) = args.get("direction").and_then(Value::as_str) {
                    if !matches!(dir.to_ascii_lowercase().as_str(), "up" | "down" | "left" | "right") {
                        return Err(ArgumentError::InvalidValue {
                            tool,
                            field: "direction",
                            reason: "must be one of up, down, left, right".into(),
                        });
                    }
                }
                if let Some(amount) = args.get("amount").and_then(numeric) {
                    if !(0.0..=self.max_scroll_amount).contains(&amount) {
                        return Err(ArgumentError::InvalidValue {
                            tool,
                            field: "amount",
                            reason: format!("must be between 0 and {}", self.max_scroll_amount),
                        });
                    }
                }
            }
            ToolName::Wait => {
                if let Some(ms) = args.get("ms").and_then(numeric) {
                    if !(0.0..=self.max_wait_ms as f64).contains(&ms) {
                        return Err(ArgumentError::InvalidValue {
                            tool,
                            field: "ms",
                            reason: format!("must be between 0 and {}", self.max_wait_ms),
                        });
                    }
                }
                if let Some(state) = args.get("state").and_then(Value::as_str) {
                    if arenaguard_core::browser::LoadState::from_name(state).is_none() {
                        return Err(ArgumentError::InvalidValue {
                            tool,
                            field: "state",
                            reason: "must be load, domcontentloaded or networkidle".into(),
                        });
                    }
                }
            }
            ToolName::ApiCall => {
                if let Some(method) = args.get("method").and_then(Value::as_str) {
                    if !matches!(method.trim().to_ascii_uppercase().as_str(), "GET" | "POST") {
                        return Err(ArgumentError::InvalidValue {
                            tool,
                            field: "method",
                            reason: "must be GET or POST".into(),
                        });
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }
}

impl Default for ArgumentValidator {
    fn default() -> Self {
        Self::new(10_000, 10_000)
    }
}

/// Numbers, or strings holding a number ("500").
pub fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(v: serde_json::Value) -> ToolArguments {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn default_allowlist_is_the_vocabulary() {
        let list = ToolAllowlist::default();
        for name in [
            "navigate", "click", "type", "select", "scroll", "wait", "submit", "done", "api_call",
        ] {
            assert!(list.is_allowed(name), "{name}");
        }
        assert!(!list.is_allowed("shell"));
        assert!(!list.is_allowed("execute_javascript"));
        assert!(!list.is_allowed("CLICK"));
    }

    #[test]
    fn narrowed_allowlist() {
        let list = ToolAllowlist::new([ToolName::Navigate, ToolName::Done]);
        assert!(list.is_allowed("navigate"));
        assert!(!list.is_allowed("api_call"));
        assert_eq!(list.resolve("done"), Some(ToolName::Done));
    }

    #[test]
    fn navigate_url_too_long() {
        let v = ArgumentValidator::default();
        let err = v
            .validate_args("navigate", &args(json!({"url": "x".repeat(20_000)})))
            .unwrap_err();
        assert!(err.to_string().contains("too long"), "{err}");
    }

    #[test]
    fn navigate_url_required() {
        let v = ArgumentValidator::default();
        let err = v.validate_args("navigate", &ToolArguments::new()).unwrap_err();
        assert!(err.to_string().contains("url required"), "{err}");
    }

    #[test]
    fn done_accepts_anything() {
        let v = ArgumentValidator::default();
        assert!(v.validate_args("done", &ToolArguments::new()).is_ok());
        assert!(
            v.validate_args("done", &args(json!({"result": "y".repeat(50_000), "nested": {"a": [1, 2]}})))
                .is_ok()
        );
    }

    #[test]
    fn wrong_types_rejected() {
        let v = ArgumentValidator::default();
        let err = v.validate_args("click", &args(json!({"element": 42}))).unwrap_err();
        assert!(err.to_string().contains("must be a string"));

        let err = v
            .validate_args("scroll", &args(json!({"amount": {"px": 3}})))
            .unwrap_err();
        assert!(err.to_string().contains("must be a number"));
    }

    #[test]
    fn type_requires_element_and_text() {
        let v = ArgumentValidator::default();
        let err = v.validate_args("type", &args(json!({"element": "Email"}))).unwrap_err();
        assert!(err.to_string().contains("text required"));
        assert!(
            v.validate_args("type", &args(json!({"element": "Email", "text": "a@b.co"})))
                .is_ok()
        );
    }

    #[test]
    fn unknown_fields_ignored_but_bounded() {
        let v = ArgumentValidator::new(100, 10_000);
        assert!(
            v.validate_args("click", &args(json!({"element": "OK", "extra": [1, 2, 3]})))
                .is_ok()
        );
        let err = v
            .validate_args("click", &args(json!({"element": "OK", "note": "z".repeat(101)})))
            .unwrap_err();
        assert!(err.to_string().contains("note too long"));
    }

    #[test]
    fn nested_strings_bounded() {
        let v = ArgumentValidator::new(100, 10_000);
        let err = v
            .validate_args("click", &args(json!({"element": "OK", "extra": ["z".repeat(1_000_000)]})))
            .unwrap_err();
        assert_eq!(
            err,
            ArgumentError::TooLong {
                tool: ToolName::Click,
                field: "extra".into(),
                max: 100,
            }
        );
        let deep = json!({"element": "OK", "extra": {"a": [{"b": "z".repeat(101)}]}});
        assert!(v.validate_args("click", &args(deep)).is_err());
        let fits = json!({"element": "OK", "extra": {"a": ["z".repeat(100)]}});
        assert!(v.validate_args("click", &args(fits)).is_ok());
    }

    #[test]
    fn numeric_strings_accepted() {
        let v = ArgumentValidator::default();
        assert!(
            v.validate_args("scroll", &args(json!({"direction": "down", "amount": "500"})))
                .is_ok()
        );
    }

    #[test]
    fn value_ranges_enforced() {
        let v = ArgumentValidator::new(10_000, 5_000);
        assert!(v.validate_args("wait", &args(json!({"ms": 60_000}))).is_err());
        assert!(v.validate_args("wait", &args(json!({"ms": 1_000}))).is_ok());
        assert!(v.validate_args("wait", &args(json!({"state": "idle"}))).is_err());
        assert!(v.validate_args("scroll", &args(json!({"direction": "sideways"}))).is_err());
        assert!(v.validate_args("scroll", &args(json!({"amount": -5}))).is_err());
    }

    #[test]
    fn api_call_methods() {
        let v = ArgumentValidator::default();
        let base = |m: &str| args(json!({"url": "https://api.example.com", "method": m}));
        assert!(v.validate_args("api_call", &base("get")).is_ok());
        assert!(v.validate_args("api_call", &base("POST")).is_ok());
        assert!(v.validate_args("api_call", &base(" POST ")).is_ok());
        assert!(v.validate_args("api_call", &base("\tget\n")).is_ok());
        let err = v.validate_args("api_call", &base("DELETE")).unwrap_err();
        assert!(err.to_string().contains("GET or POST"));
    }

    #[test]
    fn unknown_tool_reported() {
        let v = ArgumentValidator::default();
        let err = v.validate_args("shell", &ToolArguments::new()).unwrap_err();
        assert_eq!(err, ArgumentError::UnknownTool("shell".into()));
    }
}
