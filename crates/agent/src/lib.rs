//! The session runner for ArenaGuard.
//!
//! An [`AgentSession`] owns one browser context and runs one task through
//! a sequential turn loop:
//!
//! 1. **Capture** the page (URL, title, accessibility summary)
//! 2. **Ask** the turn producer for the next move, under a per-turn timeout
//! 3. **Validate** the turn and charge its token usage against the budget
//! 4. **Execute** each proposed tool call through the gated executor
//! 5. **Feed back** the tool results and repeat
//!
//! The loop ends on `done`, page loss, budget exhaustion, the task deadline
//! or the turn limit. Every ending is reported as a [`TaskOutcome`].
//!
//! [`TaskOutcome`]: arenaguard_core::TaskOutcome

pub mod page_state;
pub mod session;

pub use session::{AgentSession, DEFAULT_SYSTEM_PROMPT, run_session};
