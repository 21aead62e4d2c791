//! Page-state capture for the producer.

use arenaguard_core::browser::{BrowserPage, InteractiveElement};
use arenaguard_core::error::BrowserError;
use arenaguard_core::producer::PageState;
use tracing::debug;

/// Accessibility trees beyond this many characters are cut.
pub const MAX_TREE_CHARS: usize = 50_000;

/// Read URL, title and an accessibility summary.
///
/// Falls back to the driver's interactive-element scan when the snapshot is
/// empty or fails. Only a lost page is an error.
pub async fn capture(
    page: &dyn BrowserPage,
    turn_number: u32,
    error: Option<String>,
) -> Result<PageState, BrowserError> {
    let url = soft(page.url().await)?.unwrap_or_default();
    let title = soft(page.title().await)?.unwrap_or_default();

    let tree = soft(page.accessibility_snapshot().await)?
        .filter(|t| !t.trim().is_empty())
        .map(|t| truncate(t, MAX_TREE_CHARS));

    let (accessibility_tree, interactive_elements) = match tree {
        Some(tree) => (tree, Vec::new()),
        None => {
            debug!(turn = turn_number, "Accessibility snapshot empty, scanning elements");
            let elements = soft(page.interactive_elements().await)?.unwrap_or_default();
            (summarize_elements(&elements), elements)
        }
    };

    Ok(PageState {
        url,
        title,
        accessibility_tree,
        interactive_elements,
        turn_number,
        error,
    })
}

/// Render scanned elements the way a snapshot would read.
fn summarize_elements(elements: &[InteractiveElement]) -> String {
    elements
        .iter()
        .map(|e| format!("{} \"{}\"", e.role, e.name))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Non-fatal driver errors become `None`.
fn soft<T>(result: Result<T, BrowserError>) -> Result<Option<T>, BrowserError> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            debug!(error = %e, "Page read failed");
            Ok(None)
        }
    }
}

fn truncate(mut text: String, max_chars: usize) -> String {
    if let Some((idx, _)) = text.char_indices().nth(max_chars) {
        text.truncate(idx);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use arenaguard_core::browser::{ActOutcome, ElementAction, LoadState, Locator};
    use async_trait::async_trait;
    use std::time::Duration;

    struct SnapshotPage {
        snapshot: Result<String, BrowserError>,
        closed: bool,
    }

    #[async_trait]
    impl BrowserPage for SnapshotPage {
        fn is_closed(&self) -> bool {
            self.closed
        }
        async fn goto(&self, _: &str, _: Duration) -> Result<(), BrowserError> {
            Ok(())
        }
        async fn act(&self, _: &Locator, _: &ElementAction) -> Result<ActOutcome, BrowserError> {
            Ok(ActOutcome::NotFound)
        }
        async fn mouse_wheel(&self, _: f64, _: f64) -> Result<(), BrowserError> {
            Ok(())
        }
        async fn wait_for_load_state(&self, _: LoadState, _: Duration) -> Result<(), BrowserError> {
            Ok(())
        }
        async fn wait_for_selector(&self, _: &str, _: Duration) -> Result<ActOutcome, BrowserError> {
            Ok(ActOutcome::NotFound)
        }
        async fn url(&self) -> Result<String, BrowserError> {
            if self.closed {
                return Err(BrowserError::PageClosed);
            }
            Ok("http://localhost:3002/tasks/shop".into())
        }
        async fn title(&self) -> Result<String, BrowserError> {
            Err(BrowserError::Driver("title unavailable".into()))
        }
        async fn accessibility_snapshot(&self) -> Result<String, BrowserError> {
            self.snapshot.clone()
        }
        async fn interactive_elements(&self) -> Result<Vec<InteractiveElement>, BrowserError> {
            Ok(vec![InteractiveElement {
                role: "button".into(),
                name: "Add to cart".into(),
            }])
        }
        async fn close(&self) -> Result<(), BrowserError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn uses_snapshot_when_present() {
        let page = SnapshotPage {
            snapshot: Ok("heading \"Shop\"\nbutton \"Add to cart\"".into()),
            closed: false,
        };
        let state = capture(&page, 3, None).await.unwrap();
        assert_eq!(state.url, "http://localhost:3002/tasks/shop");
        assert_eq!(state.title, "");
        assert!(state.accessibility_tree.contains("Add to cart"));
        assert!(state.interactive_elements.is_empty());
        assert_eq!(state.turn_number, 3);
    }

    #[tokio::test]
    async fn falls_back_to_element_scan() {
        for snapshot in [Ok("   ".to_string()), Err(BrowserError::Driver("no a11y".into()))] {
            let page = SnapshotPage { snapshot, closed: false };
            let state = capture(&page, 1, Some("element not found: Buy".into())).await.unwrap();
            assert_eq!(state.accessibility_tree, "button \"Add to cart\"");
            assert_eq!(state.interactive_elements.len(), 1);
            assert_eq!(state.error.as_deref(), Some("element not found: Buy"));
        }
    }

    #[tokio::test]
    async fn closed_page_is_an_error() {
        let page = SnapshotPage {
            snapshot: Ok(String::new()),
            closed: true,
        };
        assert!(matches!(capture(&page, 1, None).await, Err(BrowserError::PageClosed)));
    }

    #[test]
    fn truncates_on_char_boundary() {
        assert_eq!(truncate("héllo".into(), 2), "hé");
        assert_eq!(truncate("abc".into(), 10), "abc");
    }
}
