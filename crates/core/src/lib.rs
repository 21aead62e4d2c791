//! # ArenaGuard Core
//!
//! Domain types, traits, and error definitions for the ArenaGuard agent
//! sandbox. This crate has **no runtime dependencies on the other crates**;
//! it defines the vocabulary every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Everything the sandbox consumes from the outside world is a trait here:
//! - [`TurnProducer`]: the external decision maker (untrusted)
//! - [`BrowserDriver`] / [`BrowserPage`]: the browser automation backend
//! - [`EventSink`]: the event transport
//!
//! Implementations live in their respective crates (or in the embedding
//! application). Tests use in-memory fakes of the same traits.

pub mod browser;
pub mod error;
pub mod event;
pub mod producer;
pub mod session;
pub mod tool;
pub mod turn;

// Re-export key types at crate root for ergonomics
pub use browser::{
    ActOutcome, BrowserDriver, BrowserPage, ContextOptions, ElementAction, InteractiveElement,
    LoadState, Locator, Viewport,
};
pub use error::{BrowserError, Error, ProducerError, Result, ToolError};
pub use event::{BroadcastEventSink, EventEnvelope, EventKind, EventSink};
pub use producer::{PageState, TurnProducer};
pub use session::{ActionRecord, AgentConfig, SessionState, SessionStatus, TaskDefinition, TaskOutcome};
pub use tool::{ToolArguments, ToolCall, ToolName, ToolResultMessage};
pub use turn::{InvalidTurn, TokenUsage, TurnResult};
