//! Tool execution for ArenaGuard sessions.
//!
//! The nine tools an agent may call are implemented here:
//! browser interactions mapped onto a [`BrowserPage`](arenaguard_core::browser::BrowserPage),
//! `api_call` over a guarded HTTP transport, and `done` as a pure signal.
//! [`ActionExecutor`] is the only entry point; it gates every call through
//! the security checks before anything runs.

pub mod api_call;
pub mod browser;
pub mod executor;

#[cfg(test)]
mod testing;

pub use api_call::{ApiCallError, ApiMethod, ApiRequest, ApiResponse, ApiTransport, HttpTransport};
pub use browser::{BrowserActionError, BrowserActions};
pub use executor::{ActionExecutor, DoneSignal, Execution, ExecutorPolicy};
