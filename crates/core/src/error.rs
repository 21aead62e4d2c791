//! Error types for the ArenaGuard domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each external collaborator has its own error enum.

use thiserror::Error;

/// The top-level error type for all ArenaGuard operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Browser driver errors ---
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    // --- Turn producer errors ---
    #[error("Turn producer error: {0}")]
    Producer(#[from] ProducerError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Session lifecycle ---
    #[error("Invalid session state: {0}")]
    InvalidState(String),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Collaborator errors ---

/// Failures raised by the browser automation backend.
///
/// "Element not found" is *not* an error; see [`crate::browser::ActOutcome`].
#[derive(Debug, Clone, Error)]
pub enum BrowserError {
    #[error("Browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("Page closed or crashed")]
    PageClosed,

    #[error("Browser disconnected")]
    Disconnected,

    #[error("Navigation to {url} failed: {reason}")]
    NavigationFailed { url: String, reason: String },

    #[error("Timed out after {timeout_ms}ms waiting for {what}")]
    Timeout { what: String, timeout_ms: u64 },

    #[error("Driver error: {0}")]
    Driver(String),
}

impl BrowserError {
    /// Whether this error means the page handle can no longer be used.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::PageClosed | Self::Disconnected)
    }
}

/// Failures raised by a turn producer.
#[derive(Debug, Clone, Error)]
pub enum ProducerError {
    #[error("Turn producer not initialized")]
    NotInitialized,

    #[error("Request failed: {message} (status: {status_code})")]
    Http { status_code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Producer configuration rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool '{0}' is not allowed")]
    NotAllowed(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Blocked: suspicious content")]
    SuspiciousContent,

    #[error("Blocked destination: {0}")]
    EgressDenied(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browser_error_displays_correctly() {
        let err = Error::Browser(BrowserError::NavigationFailed {
            url: "http://localhost:3002/task".into(),
            reason: "net::ERR_CONNECTION_REFUSED".into(),
        });
        assert!(err.to_string().contains("localhost:3002"));
        assert!(err.to_string().contains("ERR_CONNECTION_REFUSED"));
    }

    #[test]
    fn suspicious_content_message_is_generic() {
        let err = ToolError::SuspiciousContent;
        assert_eq!(err.to_string(), "Blocked: suspicious content");
    }

    #[test]
    fn fatal_browser_errors() {
        assert!(BrowserError::PageClosed.is_fatal());
        assert!(BrowserError::Disconnected.is_fatal());
        assert!(!BrowserError::Driver("boom".into()).is_fatal());
    }
}
