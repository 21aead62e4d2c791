//! Cost tracking and budget enforcement for ArenaGuard.
//!
//! Converts producer-reported token usage into estimated USD using
//! per-model-family rates, and tells the turn loop when a session has
//! spent past its ceiling.

pub mod budget;
pub mod pricing;

pub use budget::{CostState, CostStats, CostTracker};
pub use pricing::{ModelPricing, PricingTable};

/// Errors from the telemetry subsystem.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("budget exceeded: spent ${spent:.4} of ${budget:.2}")]
    BudgetExceeded { spent: f64, budget: f64 },

    #[error("invalid budget: {0}")]
    InvalidBudget(f64),
}
