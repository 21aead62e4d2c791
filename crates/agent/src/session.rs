//! The session turn loop.
//!
//! One `AgentSession` drives one agent through one task in one browser
//! context. Every proposed tool call goes through the [`ActionExecutor`];
//! the loop owns status, progress, cost accounting and event emission.

use crate::page_state;
use arenaguard_config::AppConfig;
use arenaguard_core::browser::{BrowserDriver, BrowserPage};
use arenaguard_core::error::Error;
use arenaguard_core::event::{EventKind, EventSink};
use arenaguard_core::producer::TurnProducer;
use arenaguard_core::session::{
    ActionRecord, AgentConfig, SessionState, SessionStatus, TaskDefinition, TaskOutcome,
};
use arenaguard_core::tool::ToolName;
use arenaguard_core::turn::TurnResult;
use arenaguard_security::{AuditEntry, EgressGuard};
use arenaguard_telemetry::{CostStats, CostTracker, ModelPricing, PricingTable};
use arenaguard_tools::{ActionExecutor, ApiTransport, ExecutorPolicy, HttpTransport};
use chrono::Utc;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const PAGE_LOST: &str = "page closed/crashed";
const MAX_TURNS_EXCEEDED: &str = "max turns exceeded";
const NOT_INITIALIZED: &str = "session not initialized";

/// Used when a task brings no system prompt of its own.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are operating a web browser to complete a task. \
Each turn you receive the page URL, title and accessibility tree. Respond with tool calls from: \
navigate(url), click(element), type(element, text), select(element, option), \
scroll(direction, amount), wait(ms | selector | state), submit(element?), \
api_call(url, method, body?) and done(result). Call done when the task is complete.";

/// How the turn loop ended.
#[derive(Debug, Clone, PartialEq)]
enum Termination {
    Completed(Option<Value>),
    Failed(String),
    Timeout,
}

pub struct AgentSession {
    agent: AgentConfig,
    config: AppConfig,
    driver: Arc<dyn BrowserDriver>,
    producer: Arc<dyn TurnProducer>,
    events: Arc<dyn EventSink>,
    executor: ActionExecutor,
    cost: CostTracker,
    state: SessionState,
    actions: Vec<ActionRecord>,
    page: Option<Box<dyn BrowserPage>>,
    competition_id: String,
    event_id: String,
}

impl std::fmt::Debug for AgentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentSession")
            .field("agent_id", &self.agent.id)
            .field("status", &self.state.status)
            .field("actions", &self.actions.len())
            .finish()
    }
}

impl AgentSession {
    /// Build a session using the real HTTP transport for `api_call`.
    pub fn new(
        agent: AgentConfig,
        config: AppConfig,
        driver: Arc<dyn BrowserDriver>,
        producer: Arc<dyn TurnProducer>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self, Error> {
        let transport = HttpTransport::from_config(&config.api_call).map_err(|e| Error::Config {
            message: e.to_string(),
        })?;
        Self::with_transport(agent, config, driver, producer, events, Arc::new(transport))
    }

    pub fn with_transport(
        agent: AgentConfig,
        config: AppConfig,
        driver: Arc<dyn BrowserDriver>,
        producer: Arc<dyn TurnProducer>,
        events: Arc<dyn EventSink>,
        transport: Arc<dyn ApiTransport>,
    ) -> Result<Self, Error> {
        config.validate().map_err(|e| Error::Config {
            message: e.to_string(),
        })?;

        let pricing = PricingTable::with_overrides(config.pricing.iter().map(|p| {
            (
                p.pattern.clone(),
                ModelPricing::new(p.input_per_1k, p.output_per_1k),
            )
        }));
        let cost = CostTracker::new(&agent.model, config.budget.max_cost_usd, &pricing)
            .map_err(|e| Error::Config {
                message: e.to_string(),
            })?
            .with_warn_ratio(config.budget.warn_ratio);

        let executor = ActionExecutor::new(
            agent.id.to_string(),
            ExecutorPolicy::from_config(&config),
            transport,
        );

        Ok(Self {
            agent,
            config,
            driver,
            producer,
            events,
            executor,
            cost,
            state: SessionState::default(),
            actions: Vec::new(),
            page: None,
            competition_id: String::new(),
            event_id: String::new(),
        })
    }

    pub fn agent(&self) -> &AgentConfig {
        &self.agent
    }

    pub fn state(&self) -> SessionState {
        self.state.clone()
    }

    pub fn actions(&self) -> Vec<ActionRecord> {
        self.actions.clone()
    }

    pub fn cost_stats(&self) -> CostStats {
        self.cost.stats()
    }

    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.executor.audit().entries().to_vec()
    }

    /// Open the browser context for this session.
    pub async fn initialize(&mut self, competition_id: &str, event_id: &str) -> Result<(), Error> {
        if self.state.status != SessionStatus::Idle {
            return Err(Error::InvalidState(format!(
                "cannot initialize a session in state {:?}",
                self.state.status
            )));
        }
        self.competition_id = competition_id.to_string();
        self.event_id = event_id.to_string();
        self.transition(SessionStatus::Initializing);
        self.emit_state();

        let options = self.config.runner.context_options();
        match self.driver.open_page(&options).await {
            Ok(page) => {
                self.page = Some(page);
                info!(agent = %self.agent.id, competition = %competition_id, "Session initialized");
                Ok(())
            }
            Err(e) => {
                self.state.error = Some(e.to_string());
                self.transition(SessionStatus::Failed);
                self.emit(EventKind::AgentError, json!({ "error": e.to_string() }));
                self.emit_state();
                Err(e.into())
            }
        }
    }

    /// Drive the task to a terminal state. Never returns an error: every
    /// failure is reported in the outcome.
    pub async fn run_task(&mut self, task: &TaskDefinition) -> TaskOutcome {
        let Some(page) = self.page.take() else {
            return self.unstarted_outcome();
        };
        if self.state.status != SessionStatus::Initializing {
            self.page = Some(page);
            return self.unstarted_outcome();
        }

        self.transition(SessionStatus::Running);
        self.state.start_time = Some(Utc::now());
        self.emit_state();
        info!(agent = %self.agent.id, task = %task.id, "Task started");

        let started = Instant::now();
        let termination = self.drive(page.as_ref(), task, started).await;

        if let Err(e) = page.close().await {
            debug!(error = %e, "Page close failed");
        }
        self.finish(termination, started)
    }

    /// Release everything the session holds.
    pub async fn cleanup(&mut self) -> Result<(), Error> {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                debug!(error = %e, "Page close failed");
            }
        }
        self.actions.clear();
        self.state.action_count = 0;
        self.executor.reset();
        self.cost.reset();
        self.driver.close().await?;
        debug!(agent = %self.agent.id, "Session cleaned up");
        Ok(())
    }

    async fn drive(&mut self, page: &dyn BrowserPage, task: &TaskDefinition, started: Instant) -> Termination {
        let deadline = started + task.time_limit();

        let system_prompt = task.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT);
        if let Err(e) = self.producer.initialize(system_prompt, &task.task_prompt).await {
            return Termination::Failed(format!("producer initialization failed: {e}"));
        }

        let egress = EgressGuard::new(self.config.api_port);
        if let Some(reason) = egress.check_navigation_url(&task.start_url).reason() {
            return Termination::Failed(format!("start URL refused: {reason}"));
        }
        if let Err(e) = page
            .goto(&task.start_url, self.config.runner.navigation_timeout())
            .await
        {
            return if e.is_fatal() {
                Termination::Failed(PAGE_LOST.into())
            } else {
                Termination::Failed(e.to_string())
            };
        }

        let max_turns = task.max_turns.unwrap_or(self.config.runner.max_turns).max(1);
        let turn_timeout = self.config.runner.turn_timeout();
        let mut last_error: Option<String> = None;

        for turn in 1..=max_turns {
            if page.is_closed() || !self.driver.is_connected() {
                return Termination::Failed(PAGE_LOST.into());
            }
            if Instant::now() >= deadline {
                return Termination::Timeout;
            }

            let page_state = match page_state::capture(page, turn, last_error.take()).await {
                Ok(state) => state,
                Err(_) => return Termination::Failed(PAGE_LOST.into()),
            };
            self.state.last_url = Some(page_state.url.clone());

            let raw = match tokio::time::timeout(turn_timeout, self.producer.process_turn(&page_state)).await {
                Ok(Ok(raw)) => raw,
                Ok(Err(e)) => {
                    last_error = Some(self.turn_failed(turn, max_turns, e.to_string()));
                    continue;
                }
                Err(_) => {
                    last_error = Some(self.turn_failed(turn, max_turns, "turn timeout".into()));
                    continue;
                }
            };

            let turn_result = match TurnResult::from_value(&raw) {
                Ok(t) => t,
                Err(e) => {
                    last_error = Some(self.turn_failed(turn, max_turns, e.to_string()));
                    continue;
                }
            };

            if let Some(thinking) = &turn_result.thinking {
                self.emit(EventKind::AgentThinking, json!({ "turn": turn, "thinking": thinking }));
            }

            if let Some(usage) = turn_result.usage {
                self.cost.track_usage(usage.input_tokens, usage.output_tokens);
            }
            if let Err(e) = self.cost.ensure_within_budget() {
                return Termination::Failed(e.to_string());
            }

            let limit = self.config.runner.max_tool_calls_per_turn;
            if turn_result.tool_calls.len() > limit {
                warn!(
                    agent = %self.agent.id,
                    turn,
                    proposed = turn_result.tool_calls.len(),
                    limit,
                    "Dropping excess tool calls"
                );
            }

            let mut completed = turn_result.done;
            let mut result = turn_result.result.clone();
            let mut tool_results = Vec::new();
            let mut stop: Option<Termination> = None;

            for call in turn_result.tool_calls.iter().take(limit) {
                if page.is_closed() {
                    stop = Some(Termination::Failed(PAGE_LOST.into()));
                    break;
                }

                self.state.current_action = Some(call.name.clone());
                let execution = self.executor.execute(page, call).await;
                if let Some(error) = &execution.record.error {
                    last_error = Some(error.clone());
                }
                if ToolName::from_name(&call.name) == Some(ToolName::Navigate) && execution.record.success {
                    self.state.last_url = call.str_arg("url").map(str::to_string);
                }

                self.emit(
                    EventKind::AgentAction,
                    serde_json::to_value(&execution.record).unwrap_or(Value::Null),
                );
                self.actions.push(execution.record);
                self.state.action_count = self.actions.len();
                tool_results.push(execution.tool_result);

                if let Some(done) = execution.done {
                    completed = true;
                    if result.is_none() {
                        result = done.result;
                    }
                }
                if execution.page_lost {
                    stop = Some(Termination::Failed(PAGE_LOST.into()));
                    break;
                }
                if Instant::now() >= deadline {
                    stop = Some(Termination::Timeout);
                    break;
                }
            }
            self.state.current_action = None;

            if !tool_results.is_empty() {
                if let Err(e) = self.producer.supply_tool_results(&tool_results).await {
                    warn!(agent = %self.agent.id, error = %e, "Producer rejected tool results");
                }
            }

            if let Some(stop) = stop {
                return stop;
            }
            if completed {
                return Termination::Completed(result);
            }

            self.advance_progress(turn, max_turns);
            self.emit_state();
        }

        Termination::Failed(MAX_TURNS_EXCEEDED.into())
    }

    /// A recoverable turn failure. Returns the message for the next page state.
    fn turn_failed(&mut self, turn: u32, max_turns: u32, error: String) -> String {
        warn!(agent = %self.agent.id, turn, %error, "Turn failed");
        self.emit(EventKind::AgentError, json!({ "turn": turn, "error": error, "recoverable": true }));
        self.advance_progress(turn, max_turns);
        self.emit_state();
        error
    }

    fn finish(&mut self, termination: Termination, started: Instant) -> TaskOutcome {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        self.state.end_time = Some(Utc::now());
        self.state.current_action = None;

        let (status, error, result) = match termination {
            Termination::Completed(result) => (SessionStatus::Completed, None, result),
            Termination::Failed(error) => (SessionStatus::Failed, Some(error), None),
            Termination::Timeout => (SessionStatus::Timeout, Some("task time limit exceeded".to_string()), None),
        };
        self.transition(status);
        if status == SessionStatus::Completed {
            self.state.progress = 100;
        }
        self.state.error = error.clone();

        let success = status == SessionStatus::Completed;
        let outcome = TaskOutcome {
            success,
            status,
            completion_time_ms: success.then_some(elapsed_ms),
            actions: self.actions.clone(),
            error,
            result,
        };

        match &outcome.error {
            Some(error) => {
                warn!(agent = %self.agent.id, ?status, %error, "Task ended");
                self.emit(EventKind::AgentError, json!({ "error": error, "recoverable": false }));
            }
            None => info!(agent = %self.agent.id, elapsed_ms, "Task completed"),
        }
        self.emit(
            EventKind::AgentComplete,
            json!({
                "success": outcome.success,
                "status": outcome.status,
                "completionTimeMs": outcome.completion_time_ms,
                "actionCount": outcome.actions.len(),
                "error": outcome.error,
                "result": outcome.result,
            }),
        );
        self.emit_state();
        outcome
    }

    fn unstarted_outcome(&self) -> TaskOutcome {
        TaskOutcome {
            success: false,
            status: self.state.status,
            completion_time_ms: None,
            actions: Vec::new(),
            error: Some(NOT_INITIALIZED.into()),
            result: None,
        }
    }

    fn transition(&mut self, next: SessionStatus) {
        if self.state.status.can_transition_to(next) {
            self.state.status = next;
        } else {
            warn!(from = ?self.state.status, to = ?next, "Ignoring invalid status transition");
        }
    }

    /// Monotone and below 100 until completion.
    fn advance_progress(&mut self, turn: u32, max_turns: u32) {
        let pct = (u64::from(turn) * 100 / u64::from(max_turns.max(1))).min(99) as u8;
        self.state.progress = self.state.progress.max(pct);
    }

    fn emit_state(&self) {
        let payload = serde_json::to_value(&self.state).unwrap_or(Value::Null);
        self.emit(EventKind::AgentState, payload);
    }

    fn emit(&self, kind: EventKind, payload: Value) {
        let payload = match payload {
            Value::Object(mut obj) => {
                obj.insert("agentId".into(), json!(self.agent.id));
                Value::Object(obj)
            }
            other => json!({ "agentId": self.agent.id, "data": other }),
        };
        self.events
            .publish(kind, &self.competition_id, payload, &self.event_id);
    }
}

/// Run one task end to end: initialize, run, clean up.
pub async fn run_session(
    session: &mut AgentSession,
    competition_id: &str,
    event_id: &str,
    task: &TaskDefinition,
) -> TaskOutcome {
    let outcome = match session.initialize(competition_id, event_id).await {
        Ok(()) => session.run_task(task).await,
        Err(e) => TaskOutcome {
            success: false,
            status: SessionStatus::Failed,
            completion_time_ms: None,
            actions: Vec::new(),
            error: Some(e.to_string()),
            result: None,
        },
    };
    if let Err(e) = session.cleanup().await {
        warn!(error = %e, "Session cleanup failed");
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prompt_names_every_tool() {
        for tool in ToolName::ALL {
            assert!(
                DEFAULT_SYSTEM_PROMPT.contains(&format!("{}(", tool.as_str())),
                "{tool} missing"
            );
        }
    }

    #[test]
    fn termination_variants_distinct() {
        assert_ne!(Termination::Timeout, Termination::Failed(MAX_TURNS_EXCEEDED.into()));
        assert_eq!(Termination::Completed(None), Termination::Completed(None));
    }
}
