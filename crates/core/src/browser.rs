//! Browser driver traits, the abstraction over browser automation.
//!
//! The sandbox never talks to a browser directly. A driver implementation
//! (Playwright bridge, CDP client, test fake) provides a [`BrowserDriver`]
//! that opens exactly one [`BrowserPage`] per session.
//!
//! "No element matched" is an expected outcome when acting on model-chosen
//! targets, so it is reported as [`ActOutcome::NotFound`]. `Err` is reserved
//! for real driver faults.

use crate::error::BrowserError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Browser viewport size in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Options for opening a session's browser context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextOptions {
    pub viewport: Viewport,
    pub headless: bool,
    pub record_video: bool,
}

/// How to find an element on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// ARIA role plus accessible name, e.g. `button` / `Submit`.
    Role { role: String, name: String },
    /// Form control by its label text.
    Label(String),
    /// Input by placeholder text.
    Placeholder(String),
    /// Any element by visible text.
    Text(String),
    /// Raw CSS selector.
    Css(String),
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role { role, name } => write!(f, "role={role}[name=\"{name}\"]"),
            Self::Label(l) => write!(f, "label=\"{l}\""),
            Self::Placeholder(p) => write!(f, "placeholder=\"{p}\""),
            Self::Text(t) => write!(f, "text=\"{t}\""),
            Self::Css(c) => write!(f, "css={c}"),
        }
    }
}

/// What to do with a located element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementAction {
    Click,
    /// Replace the element's value with the given text.
    Fill(String),
    /// Choose an `<option>` by value or label.
    SelectOption(String),
    /// Press a key while the element is focused.
    Press(String),
}

/// Outcome of an element interaction that did not fail in the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActOutcome {
    Done,
    NotFound,
}

/// Page load milestones a driver can wait for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    Load,
    DomContentLoaded,
    NetworkIdle,
}

impl LoadState {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "load" => Some(Self::Load),
            "domcontentloaded" => Some(Self::DomContentLoaded),
            "networkidle" => Some(Self::NetworkIdle),
            _ => None,
        }
    }
}

/// An element the agent could interact with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractiveElement {
    pub role: String,
    pub name: String,
}

/// Launches browsers and hands out session pages.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Open a fresh, isolated context with one page. Launches the browser
    /// on first use.
    async fn open_page(&self, options: &ContextOptions) -> Result<Box<dyn BrowserPage>, BrowserError>;

    /// Whether the underlying browser process is still reachable.
    fn is_connected(&self) -> bool;

    /// Shut the browser down.
    async fn close(&self) -> Result<(), BrowserError>;
}

/// A single page owned by one session.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Set by the driver when the page crashed, was closed, or its browser
    /// disconnected. Must be cheap; it is polled before every action.
    fn is_closed(&self) -> bool;

    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), BrowserError>;

    async fn act(&self, locator: &Locator, action: &ElementAction) -> Result<ActOutcome, BrowserError>;

    async fn mouse_wheel(&self, delta_x: f64, delta_y: f64) -> Result<(), BrowserError>;

    async fn wait_for_load_state(&self, state: LoadState, timeout: Duration) -> Result<(), BrowserError>;

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<ActOutcome, BrowserError>;

    async fn url(&self) -> Result<String, BrowserError>;

    async fn title(&self) -> Result<String, BrowserError>;

    /// Accessibility tree rendered as indented text.
    async fn accessibility_snapshot(&self) -> Result<String, BrowserError>;

    /// Manual scan of links, buttons and form controls.
    async fn interactive_elements(&self) -> Result<Vec<InteractiveElement>, BrowserError>;

    /// Release the page and its context.
    async fn close(&self) -> Result<(), BrowserError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locator_display() {
        let loc = Locator::Role {
            role: "button".into(),
            name: "Submit".into(),
        };
        assert_eq!(loc.to_string(), "role=button[name=\"Submit\"]");
        assert_eq!(Locator::Css("#email".into()).to_string(), "css=#email");
    }

    #[test]
    fn load_state_names() {
        assert_eq!(LoadState::from_name("networkidle"), Some(LoadState::NetworkIdle));
        assert_eq!(LoadState::from_name("DOMContentLoaded"), Some(LoadState::DomContentLoaded));
        assert_eq!(LoadState::from_name("idle"), None);
    }

    #[test]
    fn default_viewport() {
        let v = Viewport::default();
        assert_eq!((v.width, v.height), (1280, 720));
    }
}
