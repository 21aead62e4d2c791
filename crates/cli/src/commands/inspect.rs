//! `arenaguard inspect`: dry-run a tool call through the safety gates.
//!
//! Nothing is executed. The report names the rule and field that fired but
//! never echoes argument values.

use super::load_config;
use arenaguard_config::AppConfig;
use arenaguard_core::tool::ToolArguments;
use arenaguard_security::{ArgumentValidator, ContentScanner, EgressGuard, ToolAllowlist};
use std::path::Path;

#[derive(Debug, PartialEq)]
enum Verdict {
    NotAllowed,
    Invalid(String),
    Suspicious(Vec<String>),
    EgressDenied(String),
    Clean,
}

fn evaluate(config: &AppConfig, tool: &str, args: &ToolArguments) -> Verdict {
    let allowlist = ToolAllowlist::new(config.allowed_tools());
    if !allowlist.is_allowed(tool) {
        return Verdict::NotAllowed;
    }

    let validator = ArgumentValidator::new(config.security.max_argument_length, config.security.max_wait_ms);
    if let Err(e) = validator.validate_args(tool, args) {
        return Verdict::Invalid(e.to_string());
    }

    let findings = ContentScanner::new().scan(tool, args);
    if !findings.is_empty() {
        return Verdict::Suspicious(
            findings
                .iter()
                .map(|f| format!("{} in '{}' ({:?})", f.rule, f.field, f.kind))
                .collect(),
        );
    }

    let url = args.get("url").and_then(|v| v.as_str());
    let guard = EgressGuard::new(config.api_port);
    let decision = match (tool, url) {
        ("navigate", Some(url)) => guard.check_navigation_url(url),
        ("api_call", Some(url)) => guard.check_outbound_api_url(url),
        _ => return Verdict::Clean,
    };
    match decision.reason() {
        Some(reason) => Verdict::EgressDenied(reason.to_string()),
        None => Verdict::Clean,
    }
}

pub fn run(config_path: Option<&Path>, tool: &str, raw_args: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let args: ToolArguments =
        serde_json::from_str(raw_args).map_err(|e| format!("arguments must be a JSON object: {e}"))?;

    println!("🔍 Inspecting '{tool}' ({} argument(s))", args.len());
    match evaluate(&config, tool, &args) {
        Verdict::NotAllowed => println!("   ⛔ Tool is not allowed"),
        Verdict::Invalid(reason) => println!("   ⛔ Invalid arguments: {reason}"),
        Verdict::Suspicious(rules) => {
            println!("   ⛔ Blocked: suspicious content");
            for rule in rules {
                println!("      - {rule}");
            }
        }
        Verdict::EgressDenied(reason) => println!("   ⛔ Blocked destination: {reason}"),
        Verdict::Clean => println!("   ✅ Would execute"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: serde_json::Value) -> ToolArguments {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn unknown_tool_not_allowed() {
        let config = AppConfig::default();
        assert_eq!(evaluate(&config, "shell", &args(json!({}))), Verdict::NotAllowed);
    }

    #[test]
    fn missing_url_is_invalid() {
        let verdict = evaluate(&AppConfig::default(), "navigate", &args(json!({})));
        assert_eq!(verdict, Verdict::Invalid("navigate: url required".into()));
    }

    #[test]
    fn suspicious_report_omits_payload() {
        let verdict = evaluate(
            &AppConfig::default(),
            "type",
            &args(json!({"element": "Search", "text": "eval(stealCookies)"})),
        );
        let Verdict::Suspicious(rules) = verdict else {
            panic!("expected suspicious verdict");
        };
        assert!(rules.iter().any(|r| r.starts_with("eval in 'text'")));
        assert!(!rules.iter().any(|r| r.contains("stealCookies")));
    }

    #[test]
    fn private_api_call_denied() {
        let verdict = evaluate(
            &AppConfig::default(),
            "api_call",
            &args(json!({"url": "http://10.0.0.5/admin", "method": "GET"})),
        );
        assert!(matches!(verdict, Verdict::EgressDenied(r) if r.contains("private")));
    }

    #[test]
    fn plain_click_is_clean() {
        let verdict = evaluate(&AppConfig::default(), "click", &args(json!({"element": "Submit"})));
        assert_eq!(verdict, Verdict::Clean);
    }
}
