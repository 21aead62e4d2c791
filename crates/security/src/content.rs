//! Content safety scanning for tool arguments.
//!
//! Catches injection and exfiltration attempts riding inside otherwise
//! well-formed tool calls. Findings name the field and the rule that fired;
//! they never carry the offending text, so a blocked payload cannot leak
//! back into a prompt or log through the finding itself.

use arenaguard_core::tool::ToolArguments;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Category of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    CodeExecution,
    MarkupInjection,
    EventHandlerInjection,
    EncodedPayload,
}

/// One suspicious marker found in one argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub field: String,
    pub kind: FindingKind,
    pub rule: &'static str,
}

/// Markers matched against lowercased text with whitespace removed, so
/// `eval (x)` and `EVAL(x)` hit the same rule.
const CODE_EXECUTION_MARKERS: &[(&str, &str)] = &[
    ("eval", "eval("),
    ("function_constructor", "newfunction("),
    ("dynamic_import", "import("),
    ("require", "require("),
    ("child_process", "child_process"),
    ("process_env", "process.env"),
    ("process_exit", "process.exit"),
    ("process_binding", "process.binding"),
    ("exec", "exec("),
    ("exec_sync", "execsync("),
    ("spawn", "spawn("),
    ("fs_read", "fs.readfile"),
    ("fs_write", "fs.writefile"),
    ("fs_unlink", "fs.unlink"),
    ("constructor_escape", "constructor.constructor"),
    ("proto_pollution", "__proto__"),
    ("deno_api", "deno.run("),
];

const MARKUP_MARKERS: &[(&str, &str)] = &[
    ("script_tag", "<script"),
    ("iframe_tag", "<iframe"),
    ("object_tag", "<object"),
    ("embed_tag", "<embed"),
    ("javascript_uri", "javascript:"),
    ("vbscript_uri", "vbscript:"),
    ("html_data_uri", "data:text/html"),
];

/// Strings longer than this are checked for an encoded payload.
const ENCODED_MIN_LENGTH: usize = 1000;
/// Share of base64-alphabet characters above which a long string is flagged.
const ENCODED_RATIO: f64 = 0.9;

/// Scans string-valued tool arguments for suspicious content.
#[derive(Debug, Clone, Default)]
pub struct ContentScanner;

impl ContentScanner {
    pub fn new() -> Self {
        Self
    }

    /// Scan every string argument, including strings nested in arrays and
    /// objects. Findings name the top-level field. Empty result means clean.
    pub fn scan(&self, tool_name: &str, args: &ToolArguments) -> Vec<Finding> {
        let mut findings = Vec::new();
        for (field, value) in args {
            for text in strings_in(value) {
                scan_text(field, text, &mut findings);
            }
        }
        if !findings.is_empty() {
            tracing::debug!(
                tool = %tool_name,
                findings = findings.len(),
                "Suspicious content in tool arguments"
            );
        }
        findings
    }
}

/// Every string inside `value`, nested arrays and objects included.
/// Object keys are not yielded.
pub(crate) fn strings_in(value: &Value) -> impl Iterator<Item = &str> {
    let mut stack = vec![value];
    std::iter::from_fn(move || {
        while let Some(v) = stack.pop() {
            match v {
                Value::String(s) => return Some(s.as_str()),
                Value::Array(items) => stack.extend(items.iter().rev()),
                Value::Object(map) => stack.extend(map.values().rev()),
                _ => {}
            }
        }
        None
    })
}

fn scan_text(field: &str, text: &str, findings: &mut Vec<Finding>) {
    let lower = text.to_lowercase();
    let compact: String = lower.chars().filter(|c| !c.is_whitespace()).collect();

    for &(rule, marker) in CODE_EXECUTION_MARKERS {
        if compact.contains(marker) {
            findings.push(Finding {
                field: field.into(),
                kind: FindingKind::CodeExecution,
                rule,
            });
        }
    }

    for &(rule, marker) in MARKUP_MARKERS {
        if compact.contains(marker) {
            findings.push(Finding {
                field: field.into(),
                kind: FindingKind::MarkupInjection,
                rule,
            });
        }
    }

    if has_event_handler(&lower) {
        findings.push(Finding {
            field: field.into(),
            kind: FindingKind::EventHandlerInjection,
            rule: "event_handler_attribute",
        });
    }

    if looks_encoded(text) {
        findings.push(Finding {
            field: field.into(),
            kind: FindingKind::EncodedPayload,
            rule: "base64_blob",
        });
    }
}

/// `onerror=`, `onload =`, `onClick=` … as a standalone attribute name.
/// `button=` or `iconsize=` do not count.
fn has_event_handler(lower: &str) -> bool {
    let bytes = lower.as_bytes();
    let mut i = 0;
    while let Some(pos) = lower[i..].find("on") {
        let start = i + pos;
        let standalone = start == 0 || !bytes[start - 1].is_ascii_alphanumeric();
        let mut j = start + 2;
        while j < bytes.len() && bytes[j].is_ascii_lowercase() {
            j += 1;
        }
        let name_len = j - (start + 2);
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if standalone && name_len >= 3 && j < bytes.len() && bytes[j] == b'=' {
            return true;
        }
        i = start + 2;
    }
    false
}

fn looks_encoded(text: &str) -> bool {
    let len = text.chars().count();
    if len <= ENCODED_MIN_LENGTH {
        return false;
    }
    let alphabet = text
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='))
        .count();
    alphabet as f64 / len as f64 > ENCODED_RATIO
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scan(tool: &str, v: serde_json::Value) -> Vec<Finding> {
        ContentScanner::new().scan(tool, v.as_object().unwrap())
    }

    #[test]
    fn eval_is_flagged() {
        let findings = scan("type", json!({"text": "eval(maliciousCode)"}));
        assert!(!findings.is_empty());
        assert_eq!(findings[0].kind, FindingKind::CodeExecution);
        assert_eq!(findings[0].field, "text");
    }

    #[test]
    fn plain_text_is_clean() {
        assert!(scan("type", json!({"text": "hello world"})).is_empty());
        assert!(scan("click", json!({"element": "Submit"})).is_empty());
        assert!(scan("type", json!({"text": "Please evaluate the options"})).is_empty());
    }

    #[test]
    fn spacing_and_case_do_not_evade() {
        assert!(!scan("type", json!({"text": "EVAL ( x )"})).is_empty());
        assert!(!scan("type", json!({"text": "require ('child_process')"})).is_empty());
        assert!(!scan("type", json!({"text": "await import('fs')"})).is_empty());
    }

    #[test]
    fn markup_injection_flagged() {
        let findings = scan("type", json!({"text": "<SCRIPT>alert(1)</SCRIPT>"}));
        assert!(findings.iter().any(|f| f.kind == FindingKind::MarkupInjection));
        let findings = scan("navigate", json!({"url": "javascript:alert(document.cookie)"}));
        assert!(findings.iter().any(|f| f.rule == "javascript_uri"));
    }

    #[test]
    fn event_handlers_flagged() {
        let findings = scan("type", json!({"text": "<img src=x onerror=alert(1)>"}));
        assert!(findings.iter().any(|f| f.kind == FindingKind::EventHandlerInjection));
        assert!(has_event_handler("<body onload = steal()>"));
        assert!(!has_event_handler("button=primary iconsize=3"));
        assert!(!has_event_handler("online shopping"));
    }

    #[test]
    fn long_base64_blob_flagged() {
        let blob = "QUJD".repeat(300);
        let findings = scan("type", json!({"text": blob}));
        assert!(findings.iter().any(|f| f.kind == FindingKind::EncodedPayload));
    }

    #[test]
    fn long_prose_not_flagged_as_encoded() {
        let prose = "the quick brown fox jumps over the lazy dog. ".repeat(40);
        assert!(prose.len() > ENCODED_MIN_LENGTH);
        assert!(scan("type", json!({"text": prose})).is_empty());
    }

    #[test]
    fn short_base64_not_flagged() {
        assert!(scan("type", json!({"text": "QUJD".repeat(100)})).is_empty());
    }

    #[test]
    fn non_string_arguments_skipped() {
        assert!(scan("scroll", json!({"amount": 500, "flags": [true, null, 3]})).is_empty());
    }

    #[test]
    fn nested_strings_are_scanned() {
        let findings = scan("click", json!({"element": "Buy", "extra": ["ok", {"deep": ["eval(x)"]}]}));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].field, "extra");
        assert_eq!(findings[0].kind, FindingKind::CodeExecution);

        let findings = scan("type", json!({"text": "hi", "meta": {"html": "<script>x</script>"}}));
        assert!(findings.iter().any(|f| f.field == "meta" && f.kind == FindingKind::MarkupInjection));
    }

    #[test]
    fn strings_in_walks_depth_first_in_order() {
        let value = json!(["a", {"k": "b", "n": 1}, [["c"]], "d"]);
        assert_eq!(strings_in(&value).collect::<Vec<_>>(), ["a", "b", "c", "d"]);
    }

    #[test]
    fn findings_do_not_echo_payload() {
        let findings = scan("type", json!({"text": "eval(secret_payload_xyz)"}));
        let rendered = serde_json::to_string(&findings).unwrap();
        assert!(!rendered.contains("secret_payload_xyz"));
    }
}
