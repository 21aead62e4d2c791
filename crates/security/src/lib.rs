//! Security module for ArenaGuard, the boundary between model output and
//! real side effects.
//!
//! Provides:
//! - **Allowlist**: closed tool vocabulary and per-tool argument validation
//! - **Content scanning**: injection / exfiltration markers in arguments
//! - **Egress guard**: SSRF defense for navigation and outbound API calls
//! - **Rate limiting**: sliding-window backpressure on action execution
//! - **Audit logging**: structured record of every safety denial
//!
//! The allowlist, scanner and egress guard are pure; the rate limiter and
//! audit log are owned by exactly one session.

pub mod allowlist;
pub mod audit;
pub mod content;
pub mod egress;
pub mod rate_limit;

pub use allowlist::{ArgumentError, ArgumentValidator, ToolAllowlist};
pub use audit::{AuditEntry, AuditEvent, AuditLogger, AuditOutcome, AuditSink, TracingSink};
pub use content::{ContentScanner, Finding, FindingKind};
pub use egress::{EgressDecision, EgressGuard};
pub use rate_limit::RateLimiter;
