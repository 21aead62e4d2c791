//! Webhook turn producer.
//!
//! Each turn is a signed `POST` to an operator-registered URL. The agent
//! answers with `{thinking, actions: [{tool, args}], done, result}`; this
//! producer rewrites that into the sandbox's turn shape and leaves all
//! validation to the controller.

use crate::signing::{AGENT_ID_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER, sign_payload};
use arenaguard_config::WebhookConfig;
use arenaguard_core::error::ProducerError;
use arenaguard_core::producer::{PageState, TurnProducer};
use arenaguard_core::tool::ToolResultMessage;
use arenaguard_security::EgressGuard;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// One MiB.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 1 << 20;
/// How much of an error body is kept for the error message.
const ERROR_BODY_BYTES: usize = 1024;
/// Tool results echoed back to the agent as `previousActions`.
const MAX_PREVIOUS_ACTIONS: usize = 10;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskPrompts {
    task_prompt: String,
    system_prompt: String,
}

#[derive(Debug, Default)]
struct Conversation {
    task: Option<TaskPrompts>,
    previous_actions: Vec<ToolResultMessage>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TurnRequest<'a> {
    agent_id: &'a str,
    task: &'a TaskPrompts,
    page_state: &'a PageState,
    turn_number: u32,
    previous_actions: &'a [ToolResultMessage],
}

pub struct WebhookTurnProducer {
    client: reqwest::Client,
    url: String,
    secret: Option<String>,
    agent_id: String,
    max_response_bytes: usize,
    conversation: Mutex<Conversation>,
}

impl std::fmt::Debug for WebhookTurnProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookTurnProducer")
            .field("url", &self.url)
            .field("agent_id", &self.agent_id)
            .field("signed", &self.secret.is_some())
            .field("max_response_bytes", &self.max_response_bytes)
            .finish()
    }
}

impl WebhookTurnProducer {
    /// The URL must pass the outbound egress check. Requests go direct, with
    /// no proxy and no redirects, so the checked host is the one contacted.
    pub fn new(
        url: impl Into<String>,
        secret: Option<String>,
        agent_id: impl Into<String>,
        timeout: Duration,
        egress: &EgressGuard,
    ) -> Result<Self, ProducerError> {
        let url = url.into();
        if let Some(reason) = egress.check_outbound_api_url(&url).reason() {
            return Err(ProducerError::Rejected(format!("webhook URL refused: {reason}")));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .build()
            .map_err(|e| ProducerError::Network(e.to_string()))?;
        Ok(Self {
            client,
            url,
            secret: secret.filter(|s| !s.is_empty()),
            agent_id: agent_id.into(),
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            conversation: Mutex::new(Conversation::default()),
        })
    }

    pub fn with_max_response_bytes(mut self, limit: usize) -> Self {
        self.max_response_bytes = limit;
        self
    }

    pub fn from_config(
        config: &WebhookConfig,
        agent_id: impl Into<String>,
        egress: &EgressGuard,
    ) -> Result<Self, ProducerError> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| ProducerError::Rejected("webhook.url is not configured".into()))?;
        let timeout = Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let limit = config.max_response_bytes.unwrap_or(DEFAULT_MAX_RESPONSE_BYTES);
        Ok(Self::new(url, config.secret.clone(), agent_id, timeout, egress)?.with_max_response_bytes(limit))
    }

    fn encode_turn(&self, conversation: &Conversation, page_state: &PageState) -> Result<Vec<u8>, ProducerError> {
        let task = conversation.task.as_ref().ok_or(ProducerError::NotInitialized)?;
        let request = TurnRequest {
            agent_id: &self.agent_id,
            task,
            page_state,
            turn_number: page_state.turn_number,
            previous_actions: &conversation.previous_actions,
        };
        serde_json::to_vec(&request).map_err(|e| ProducerError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl TurnProducer for WebhookTurnProducer {
    async fn initialize(&self, system_prompt: &str, task_prompt: &str) -> Result<(), ProducerError> {
        let mut conversation = self.conversation.lock().await;
        conversation.task = Some(TaskPrompts {
            task_prompt: task_prompt.to_string(),
            system_prompt: system_prompt.to_string(),
        });
        conversation.previous_actions.clear();
        Ok(())
    }

    async fn process_turn(&self, page_state: &PageState) -> Result<Value, ProducerError> {
        let body = {
            let conversation = self.conversation.lock().await;
            self.encode_turn(&conversation, page_state)?
        };

        let timestamp = chrono::Utc::now().timestamp_millis();
        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header(TIMESTAMP_HEADER, timestamp.to_string())
            .header(AGENT_ID_HEADER, &self.agent_id);
        if let Some(secret) = &self.secret {
            request = request.header(SIGNATURE_HEADER, sign_payload(secret, timestamp, &body));
        }

        debug!(agent = %self.agent_id, turn = page_state.turn_number, "Calling webhook agent");
        let mut response = request
            .body(body)
            .send()
            .await
            .map_err(|e| ProducerError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let excerpt = read_capped(&mut response, ERROR_BODY_BYTES)
                .await
                .map(|body| body.bytes)
                .unwrap_or_default();
            warn!(status, "Webhook agent returned error");
            return Err(ProducerError::Http {
                status_code: status,
                message: String::from_utf8_lossy(&excerpt).chars().take(200).collect(),
            });
        }

        if response
            .content_length()
            .is_some_and(|len| len > self.max_response_bytes as u64)
        {
            return Err(oversized(self.max_response_bytes));
        }
        let body = read_capped(&mut response, self.max_response_bytes)
            .await
            .map_err(|e| ProducerError::Network(e.to_string()))?;
        if body.truncated {
            warn!(agent = %self.agent_id, limit = self.max_response_bytes, "Webhook response too large");
            return Err(oversized(self.max_response_bytes));
        }

        let raw: Value =
            serde_json::from_slice(&body.bytes).map_err(|e| ProducerError::InvalidResponse(e.to_string()))?;
        Ok(translate_response(raw, page_state.turn_number))
    }

    async fn supply_tool_results(&self, results: &[ToolResultMessage]) -> Result<(), ProducerError> {
        let mut conversation = self.conversation.lock().await;
        conversation.previous_actions.extend_from_slice(results);
        let excess = conversation
            .previous_actions
            .len()
            .saturating_sub(MAX_PREVIOUS_ACTIONS);
        conversation.previous_actions.drain(..excess);
        Ok(())
    }
}

struct CappedBody {
    bytes: Vec<u8>,
    truncated: bool,
}

/// Stream the body, stopping once `limit` bytes are held.
async fn read_capped(response: &mut reqwest::Response, limit: usize) -> Result<CappedBody, reqwest::Error> {
    let mut bytes = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = limit.saturating_sub(bytes.len());
        if chunk.len() > room {
            bytes.extend_from_slice(&chunk[..room]);
            return Ok(CappedBody { bytes, truncated: true });
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(CappedBody { bytes, truncated: false })
}

fn oversized(limit: usize) -> ProducerError {
    ProducerError::InvalidResponse(format!("response body exceeds {limit} bytes"))
}

/// Rewrite `{actions: [{tool, args}]}` into `{toolCalls: [{id, name, arguments}]}`.
///
/// Ids are `call_<turn>_<index>`. Anything that does not look like an action
/// is passed through untouched for the controller to reject.
pub fn translate_response(raw: Value, turn: u32) -> Value {
    let Value::Object(mut obj) = raw else {
        return raw;
    };
    if let Some(actions) = obj.remove("actions") {
        let calls = match actions {
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| translate_action(item, turn, i))
                    .collect(),
            ),
            other => other,
        };
        obj.insert("toolCalls".into(), calls);
    }
    Value::Object(obj)
}

fn translate_action(item: Value, turn: u32, index: usize) -> Value {
    let Value::Object(mut action) = item else {
        return item;
    };
    let mut call = Map::new();
    call.insert("id".into(), json!(format!("call_{turn}_{index}")));
    if let Some(tool) = action.remove("tool") {
        call.insert("name".into(), tool);
    }
    call.insert(
        "arguments".into(),
        action.remove("args").unwrap_or_else(|| json!({})),
    );
    Value::Object(call)
}
