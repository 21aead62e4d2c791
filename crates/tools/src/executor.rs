//! Gated execution of a single tool call.
//!
//! Every call passes, in order: allowlist, argument validation, content
//! scan, rate limit, egress guard. Only then does it reach the page or the
//! network. Whatever happens, the caller gets back exactly one
//! [`ActionRecord`] and one [`ToolResultMessage`].

use crate::api_call::{ApiMethod, ApiRequest, ApiTransport};
use crate::browser::{BrowserActionError, BrowserActions};
use arenaguard_config::AppConfig;
use arenaguard_core::browser::BrowserPage;
use arenaguard_core::error::ToolError;
use arenaguard_core::session::ActionRecord;
use arenaguard_core::tool::{ToolCall, ToolName, ToolResultMessage};
use arenaguard_security::{
    ArgumentValidator, AuditEvent, AuditLogger, AuditOutcome, ContentScanner, EgressGuard,
    RateLimiter, ToolAllowlist,
};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Longest target description kept in an action record.
const MAX_TARGET_CHARS: usize = 120;

/// Static gating configuration for one session.
#[derive(Debug, Clone)]
pub struct ExecutorPolicy {
    pub allowlist: ToolAllowlist,
    pub validator: ArgumentValidator,
    pub egress: EgressGuard,
    pub max_actions_per_second: usize,
    pub navigation_timeout: Duration,
    pub max_wait: Duration,
}

impl ExecutorPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            allowlist: ToolAllowlist::new(config.allowed_tools()),
            validator: ArgumentValidator::new(
                config.security.max_argument_length,
                config.security.max_wait_ms,
            ),
            egress: EgressGuard::new(config.api_port),
            max_actions_per_second: config.security.max_actions_per_second,
            navigation_timeout: config.runner.navigation_timeout(),
            max_wait: Duration::from_millis(config.security.max_wait_ms),
        }
    }
}

impl Default for ExecutorPolicy {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// The `done` tool fired.
#[derive(Debug, Clone, PartialEq)]
pub struct DoneSignal {
    pub result: Option<Value>,
}

/// Outcome of one tool call.
#[derive(Debug, Clone)]
pub struct Execution {
    pub record: ActionRecord,
    pub tool_result: ToolResultMessage,
    pub done: Option<DoneSignal>,
    /// The driver reported the page gone; the session cannot continue.
    pub page_lost: bool,
}

pub struct ActionExecutor {
    agent_id: String,
    allowlist: ToolAllowlist,
    validator: ArgumentValidator,
    scanner: ContentScanner,
    egress: EgressGuard,
    limiter: RateLimiter,
    audit: AuditLogger,
    browser: BrowserActions,
    transport: Arc<dyn ApiTransport>,
}

impl ActionExecutor {
    pub fn new(agent_id: impl Into<String>, policy: ExecutorPolicy, transport: Arc<dyn ApiTransport>) -> Self {
        Self {
            agent_id: agent_id.into(),
            allowlist: policy.allowlist,
            validator: policy.validator,
            scanner: ContentScanner::new(),
            egress: policy.egress,
            limiter: RateLimiter::new(policy.max_actions_per_second),
            audit: AuditLogger::default(),
            browser: BrowserActions::new(policy.navigation_timeout, policy.max_wait),
            transport,
        }
    }

    /// Replace the audit log, e.g. to attach extra sinks.
    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = audit;
        self
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    /// Clear the rate window and the audit trail.
    pub fn reset(&mut self) {
        self.limiter.reset();
        self.audit.clear();
    }

    pub async fn execute(&mut self, page: &dyn BrowserPage, call: &ToolCall) -> Execution {
        let Some(tool) = self.allowlist.resolve(&call.name) else {
            let err = ToolError::NotAllowed(call.name.clone());
            self.deny(AuditEvent::ToolDenied, call, AuditOutcome::Denied, None);
            return self.rejected(call, String::new(), err.to_string());
        };

        if let Err(e) = self.validator.validate_args(&call.name, &call.arguments) {
            self.deny(AuditEvent::ArgumentsRejected, call, AuditOutcome::Denied, Some(e.to_string()));
            let err = ToolError::InvalidArguments(e.to_string());
            return self.rejected(call, String::new(), err.to_string());
        }

        let findings = self.scanner.scan(&call.name, &call.arguments);
        if !findings.is_empty() {
            let mut rules: Vec<String> = findings.iter().map(|f| f.rule.to_string()).collect();
            rules.dedup();
            self.deny(AuditEvent::ContentBlocked { rules }, call, AuditOutcome::Blocked, None);
            return self.rejected(call, String::new(), ToolError::SuspiciousContent.to_string());
        }

        self.limiter.acquire().await;

        if tool.touches_network() {
            let url = call.str_arg("url").unwrap_or_default();
            let decision = match tool {
                ToolName::ApiCall => self.egress.check_outbound_api_url(url),
                _ => self.egress.check_navigation_url(url),
            };
            if let Some(reason) = decision.reason() {
                let reason = reason.to_string();
                let host = host_of(url);
                self.deny(
                    AuditEvent::EgressDenied { host: host.clone() },
                    call,
                    AuditOutcome::Blocked,
                    Some(reason.clone()),
                );
                return self.rejected(call, host, ToolError::EgressDenied(reason).to_string());
            }
        }

        let target = describe_target(tool, call);
        match tool {
            ToolName::Done => {
                let result = call.arguments.get("result").cloned();
                debug!(agent = %self.agent_id, "Agent signalled done");
                let mut execution = self.finished(call, target, Ok("Task marked done".into()));
                execution.done = Some(DoneSignal { result });
                execution
            }
            ToolName::ApiCall => {
                let outcome = self.api_call(call).await;
                self.finished(call, target, outcome)
            }
            _ => match self.browser.perform(page, tool, call).await {
                Ok(text) => self.finished(call, target, Ok(text)),
                Err(e) => {
                    let page_lost = e.is_fatal();
                    let mut execution = self.finished(call, target, Err(e.to_string()));
                    execution.page_lost = page_lost;
                    execution
                }
            },
        }
    }

    async fn api_call(&self, call: &ToolCall) -> Result<String, String> {
        let method = call
            .str_arg("method")
            .map(ApiMethod::parse)
            .unwrap_or(Some(ApiMethod::Get))
            .ok_or_else(|| "api_call: method must be GET or POST".to_string())?;
        let request = ApiRequest {
            method,
            url: call.str_arg("url").unwrap_or_default().to_string(),
            body: call.str_arg("body").map(str::to_string),
        };
        let response = self
            .transport
            .send(&request)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_string(&response).map_err(|e| e.to_string())
    }

    fn deny(&mut self, event: AuditEvent, call: &ToolCall, outcome: AuditOutcome, reason: Option<String>) {
        self.audit.record(&self.agent_id, &call.name, event, outcome, reason);
    }

    fn rejected(&self, call: &ToolCall, target: String, error: String) -> Execution {
        warn!(agent = %self.agent_id, tool = %call.name, %error, "Tool call rejected");
        self.finished(call, target, Err(error))
    }

    fn finished(&self, call: &ToolCall, target: String, outcome: Result<String, String>) -> Execution {
        let (tool_result, error) = match outcome {
            Ok(text) => (ToolResultMessage::ok(call, text), None),
            Err(e) => (ToolResultMessage::failed(call, e.clone()), Some(e)),
        };
        Execution {
            record: ActionRecord {
                timestamp: Utc::now(),
                agent_id: self.agent_id.clone(),
                tool_name: call.name.clone(),
                target,
                success: error.is_none(),
                error,
            },
            tool_result,
            done: None,
            page_lost: false,
        }
    }
}

fn host_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

/// What the action was aimed at. Never includes typed text or request bodies.
fn describe_target(tool: ToolName, call: &ToolCall) -> String {
    let raw = match tool {
        ToolName::Navigate => call.str_arg("url").unwrap_or_default().to_string(),
        ToolName::Click | ToolName::Type | ToolName::Select => {
            call.str_arg("element").unwrap_or_default().to_string()
        }
        ToolName::Submit => call.str_arg("element").unwrap_or("form").to_string(),
        ToolName::Scroll => call.str_arg("direction").unwrap_or("down").to_string(),
        ToolName::Wait => call
            .str_arg("selector")
            .or_else(|| call.str_arg("state"))
            .unwrap_or("timeout")
            .to_string(),
        ToolName::ApiCall => {
            let method = call.str_arg("method").unwrap_or("GET").trim().to_ascii_uppercase();
            format!("{method} {}", host_of(call.str_arg("url").unwrap_or_default()))
        }
        ToolName::Done => String::new(),
    };
    raw.chars().take(MAX_TARGET_CHARS).collect()
}
