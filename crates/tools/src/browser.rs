//! Browser tools mapped onto driver primitives.
//!
//! Elements are addressed the way a model describes them ("Submit",
//! "Email address") and resolved by trying accessible role, label,
//! placeholder and visible text in turn.

use arenaguard_core::browser::{ActOutcome, BrowserPage, ElementAction, LoadState, Locator};
use arenaguard_core::error::BrowserError;
use arenaguard_core::tool::{ToolCall, ToolName};
use arenaguard_security::allowlist::numeric;
use std::time::Duration;

const DEFAULT_SCROLL_PX: f64 = 500.0;
const DEFAULT_WAIT_MS: u64 = 1_000;

#[derive(Debug, thiserror::Error)]
pub enum BrowserActionError {
    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("timed out waiting for {0}")]
    WaitTimedOut(String),

    #[error("{0}")]
    Unsupported(String),

    #[error(transparent)]
    Browser(#[from] BrowserError),
}

impl BrowserActionError {
    /// The page can no longer be driven.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Browser(e) if e.is_fatal())
    }
}

/// Runs browser-facing tools against one page.
#[derive(Debug, Clone, Copy)]
pub struct BrowserActions {
    navigation_timeout: Duration,
    max_wait: Duration,
}

impl BrowserActions {
    pub fn new(navigation_timeout: Duration, max_wait: Duration) -> Self {
        Self {
            navigation_timeout,
            max_wait,
        }
    }

    /// Execute an already-validated call. Returns the result text for the producer.
    pub async fn perform(
        &self,
        page: &dyn BrowserPage,
        tool: ToolName,
        call: &ToolCall,
    ) -> Result<String, BrowserActionError> {
        match tool {
            ToolName::Navigate => {
                let url = call.str_arg("url").unwrap_or_default();
                page.goto(url, self.navigation_timeout).await?;
                Ok(format!("Navigated to {url}"))
            }
            ToolName::Click => {
                let element = call.str_arg("element").unwrap_or_default();
                act_on_first(page, &click_candidates(element), &ElementAction::Click, element).await?;
                Ok(format!("Clicked {element}"))
            }
            ToolName::Type => {
                let element = call.str_arg("element").unwrap_or_default();
                let text = call.str_arg("text").unwrap_or_default();
                let action = ElementAction::Fill(text.to_string());
                act_on_first(page, &field_candidates(element), &action, element).await?;
                Ok(format!("Typed {} characters into {element}", text.chars().count()))
            }
            ToolName::Select => {
                let element = call.str_arg("element").unwrap_or_default();
                let option = call.str_arg("option").unwrap_or_default();
                let action = ElementAction::SelectOption(option.to_string());
                act_on_first(page, &select_candidates(element), &action, element).await?;
                Ok(format!("Selected {option} in {element}"))
            }
            ToolName::Scroll => {
                let direction = call.str_arg("direction").unwrap_or("down");
                let amount = call
                    .arguments
                    .get("amount")
                    .and_then(numeric)
                    .unwrap_or(DEFAULT_SCROLL_PX);
                let (dx, dy) = scroll_delta(direction, amount)?;
                page.mouse_wheel(dx, dy).await?;
                Ok(format!("Scrolled {direction} {amount}px"))
            }
            ToolName::Wait => self.wait(page, call).await,
            ToolName::Submit => {
                match call.str_arg("element").filter(|e| !e.trim().is_empty()) {
                    Some(element) => {
                        act_on_first(page, &submit_candidates(element), &ElementAction::Click, element)
                            .await?;
                    }
                    None => {
                        let submit = Locator::Css("[type=submit]".into());
                        if page.act(&submit, &ElementAction::Click).await? == ActOutcome::NotFound {
                            return Err(BrowserActionError::ElementNotFound("submit control".into()));
                        }
                    }
                }
                Ok("Submitted".into())
            }
            ToolName::Done | ToolName::ApiCall => Err(BrowserActionError::Unsupported(format!(
                "{tool} is not a browser action"
            ))),
        }
    }

    async fn wait(&self, page: &dyn BrowserPage, call: &ToolCall) -> Result<String, BrowserActionError> {
        let requested = call
            .arguments
            .get("ms")
            .and_then(numeric)
            .map(|ms| Duration::from_millis(ms.max(0.0) as u64));

        if let Some(selector) = call.str_arg("selector") {
            let timeout = requested.unwrap_or(self.max_wait).min(self.max_wait);
            return match page.wait_for_selector(selector, timeout).await? {
                ActOutcome::Done => Ok(format!("Found {selector}")),
                ActOutcome::NotFound => Err(BrowserActionError::WaitTimedOut(selector.into())),
            };
        }

        if let Some(state) = call.str_arg("state").and_then(LoadState::from_name) {
            let timeout = requested.unwrap_or(self.max_wait).min(self.max_wait);
            page.wait_for_load_state(state, timeout).await?;
            return Ok(format!("Reached load state {state:?}"));
        }

        let pause = requested
            .unwrap_or(Duration::from_millis(DEFAULT_WAIT_MS))
            .min(self.max_wait);
        tokio::time::sleep(pause).await;
        Ok(format!("Waited {}ms", pause.as_millis()))
    }
}

/// Try each locator until one matches.
async fn act_on_first(
    page: &dyn BrowserPage,
    candidates: &[Locator],
    action: &ElementAction,
    element: &str,
) -> Result<Locator, BrowserActionError> {
    for locator in candidates {
        if page.act(locator, action).await? == ActOutcome::Done {
            tracing::trace!(%locator, "Element resolved");
            return Ok(locator.clone());
        }
    }
    Err(BrowserActionError::ElementNotFound(element.to_string()))
}

fn looks_like_css(element: &str) -> bool {
    let e = element.trim_start();
    e.starts_with('#') || e.starts_with('.') || e.contains('[')
}

fn with_css(element: &str, mut rest: Vec<Locator>) -> Vec<Locator> {
    if looks_like_css(element) {
        rest.insert(0, Locator::Css(element.to_string()));
    }
    rest
}

fn role(role: &str, name: &str) -> Locator {
    Locator::Role {
        role: role.into(),
        name: name.into(),
    }
}

pub fn click_candidates(element: &str) -> Vec<Locator> {
    with_css(
        element,
        vec![
            role("button", element),
            role("link", element),
            Locator::Text(element.into()),
        ],
    )
}

pub fn field_candidates(element: &str) -> Vec<Locator> {
    with_css(
        element,
        vec![
            Locator::Label(element.into()),
            Locator::Placeholder(element.into()),
            role("textbox", element),
        ],
    )
}

pub fn select_candidates(element: &str) -> Vec<Locator> {
    with_css(
        element,
        vec![Locator::Label(element.into()), role("combobox", element)],
    )
}

pub fn submit_candidates(element: &str) -> Vec<Locator> {
    with_css(element, vec![role("button", element), Locator::Text(element.into())])
}

fn scroll_delta(direction: &str, amount: f64) -> Result<(f64, f64), BrowserActionError> {
    match direction.to_ascii_lowercase().as_str() {
        "down" => Ok((0.0, amount)),
        "up" => Ok((0.0, -amount)),
        "right" => Ok((amount, 0.0)),
        "left" => Ok((-amount, 0.0)),
        other => Err(BrowserActionError::Unsupported(format!(
            "unknown scroll direction '{other}'"
        ))),
    }
}
