//! In-memory page used by this crate's tests.

use arenaguard_core::browser::{
    ActOutcome, BrowserPage, ElementAction, InteractiveElement, LoadState, Locator,
};
use arenaguard_core::error::BrowserError;
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[derive(Default)]
struct PageLog {
    url: String,
    acted: Vec<(String, ElementAction)>,
    wheel: Vec<(f64, f64)>,
}

/// A page whose elements are `(kind, name)` pairs. `kind` is a role, or
/// `label` / `placeholder` / `text` / `css`.
pub struct FakePage {
    elements: Vec<(String, String)>,
    closed: AtomicBool,
    log: Mutex<PageLog>,
}

impl FakePage {
    pub fn with_elements(elements: &[(&str, &str)]) -> Self {
        Self {
            elements: elements
                .iter()
                .map(|(k, n)| (k.to_string(), n.to_string()))
                .collect(),
            closed: AtomicBool::new(false),
            log: Mutex::new(PageLog {
                url: "about:blank".into(),
                ..Default::default()
            }),
        }
    }

    pub fn crash(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn acted(&self) -> Vec<(String, ElementAction)> {
        self.log.lock().unwrap().acted.clone()
    }

    pub fn wheel(&self) -> Vec<(f64, f64)> {
        self.log.lock().unwrap().wheel.clone()
    }

    pub fn current_url(&self) -> String {
        self.log.lock().unwrap().url.clone()
    }

    fn matches(&self, locator: &Locator) -> bool {
        let (kind, name) = match locator {
            Locator::Role { role, name } => (role.as_str(), name.as_str()),
            Locator::Label(n) => ("label", n.as_str()),
            Locator::Placeholder(n) => ("placeholder", n.as_str()),
            Locator::Text(n) => ("text", n.as_str()),
            Locator::Css(n) => ("css", n.as_str()),
        };
        self.elements.iter().any(|(k, n)| k == kind && n == name)
    }

    fn check_open(&self) -> Result<(), BrowserError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(BrowserError::PageClosed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BrowserPage for FakePage {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn goto(&self, url: &str, _timeout: Duration) -> Result<(), BrowserError> {
        self.check_open()?;
        self.log.lock().unwrap().url = url.to_string();
        Ok(())
    }

    async fn act(&self, locator: &Locator, action: &ElementAction) -> Result<ActOutcome, BrowserError> {
        self.check_open()?;
        if !self.matches(locator) {
            return Ok(ActOutcome::NotFound);
        }
        self.log
            .lock()
            .unwrap()
            .acted
            .push((locator.to_string(), action.clone()));
        Ok(ActOutcome::Done)
    }

    async fn mouse_wheel(&self, delta_x: f64, delta_y: f64) -> Result<(), BrowserError> {
        self.check_open()?;
        self.log.lock().unwrap().wheel.push((delta_x, delta_y));
        Ok(())
    }

    async fn wait_for_load_state(&self, _state: LoadState, _timeout: Duration) -> Result<(), BrowserError> {
        self.check_open()
    }

    async fn wait_for_selector(&self, selector: &str, _timeout: Duration) -> Result<ActOutcome, BrowserError> {
        self.check_open()?;
        Ok(if self.matches(&Locator::Css(selector.into())) {
            ActOutcome::Done
        } else {
            ActOutcome::NotFound
        })
    }

    async fn url(&self) -> Result<String, BrowserError> {
        self.check_open()?;
        Ok(self.current_url())
    }

    async fn title(&self) -> Result<String, BrowserError> {
        self.check_open()?;
        Ok("Fake".into())
    }

    async fn accessibility_snapshot(&self) -> Result<String, BrowserError> {
        self.check_open()?;
        Ok(String::new())
    }

    async fn interactive_elements(&self) -> Result<Vec<InteractiveElement>, BrowserError> {
        self.check_open()?;
        Ok(Vec::new())
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.crash();
        Ok(())
    }
}
