//! Per-session cost accounting.
//!
//! Single-writer: the session's turn loop owns its tracker. Totals only grow
//! until [`CostTracker::reset`] at teardown.

use crate::TelemetryError;
use crate::pricing::{ModelPricing, PricingTable};
use serde::{Deserialize, Serialize};

/// Running totals for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostState {
    pub total_cost: f64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
}

/// Snapshot for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostStats {
    pub model: String,
    #[serde(flatten)]
    pub state: CostState,
    pub budget: f64,
    pub remaining: f64,
    pub exceeded: bool,
    /// The approaching-budget warning has fired.
    pub warned: bool,
}

#[derive(Debug, Clone)]
pub struct CostTracker {
    model: String,
    pricing: ModelPricing,
    budget: f64,
    warn_ratio: f64,
    warned: bool,
    state: CostState,
}

impl CostTracker {
    /// Rates are resolved once from `table` for `model`.
    pub fn new(model: &str, budget_usd: f64, table: &PricingTable) -> Result<Self, TelemetryError> {
        if !(budget_usd.is_finite() && budget_usd > 0.0) {
            return Err(TelemetryError::InvalidBudget(budget_usd));
        }
        Ok(Self {
            model: model.to_string(),
            pricing: table.resolve(model),
            budget: budget_usd,
            warn_ratio: 0.8,
            warned: false,
            state: CostState::default(),
        })
    }

    /// Fraction of the budget at which a one-time warning is logged.
    pub fn with_warn_ratio(mut self, ratio: f64) -> Self {
        self.warn_ratio = ratio.clamp(f64::MIN_POSITIVE, 1.0);
        self
    }

    /// Record one turn's usage and return its cost.
    pub fn track_usage(&mut self, input_tokens: u64, output_tokens: u64) -> f64 {
        let cost = self.pricing.cost(input_tokens, output_tokens);
        self.state.total_cost += cost.max(0.0);
        self.state.total_input_tokens = self.state.total_input_tokens.saturating_add(input_tokens);
        self.state.total_output_tokens = self.state.total_output_tokens.saturating_add(output_tokens);

        tracing::debug!(
            model = %self.model,
            input_tokens,
            output_tokens,
            cost,
            total = self.state.total_cost,
            "Usage tracked"
        );

        if !self.warned && self.state.total_cost >= self.budget * self.warn_ratio {
            self.warned = true;
            tracing::warn!(
                model = %self.model,
                spent = self.state.total_cost,
                budget = self.budget,
                "Session cost approaching budget"
            );
        }
        cost
    }

    pub fn is_budget_exceeded(&self) -> bool {
        self.state.total_cost > self.budget
    }

    /// `Err` once the budget is exceeded.
    pub fn ensure_within_budget(&self) -> Result<(), TelemetryError> {
        if self.is_budget_exceeded() {
            Err(TelemetryError::BudgetExceeded {
                spent: self.state.total_cost,
                budget: self.budget,
            })
        } else {
            Ok(())
        }
    }

    pub fn budget_remaining(&self) -> f64 {
        (self.budget - self.state.total_cost).max(0.0)
    }

    pub fn budget_warned(&self) -> bool {
        self.warned
    }

    pub fn state(&self) -> CostState {
        self.state
    }

    pub fn stats(&self) -> CostStats {
        CostStats {
            model: self.model.clone(),
            state: self.state,
            budget: self.budget,
            remaining: self.budget_remaining(),
            exceeded: self.is_budget_exceeded(),
            warned: self.warned,
        }
    }

    pub fn reset(&mut self) {
        self.state = CostState::default();
        self.warned = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_subscriber::layer::{Context, SubscriberExt};

    /// Counts `warn`-level events.
    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarnCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn opus_tracker() -> CostTracker {
        CostTracker::new("claude-3-opus-20240229", 5.0, &PricingTable::with_defaults()).unwrap()
    }

    #[test]
    fn large_output_exceeds_budget() {
        let mut tracker = opus_tracker();
        tracker.track_usage(0, 70_000);
        assert!(tracker.is_budget_exceeded());
        assert_eq!(tracker.budget_remaining(), 0.0);
        assert!(matches!(
            tracker.ensure_within_budget(),
            Err(TelemetryError::BudgetExceeded { .. })
        ));
    }

    #[test]
    fn small_input_leaves_most_of_budget() {
        let mut tracker = opus_tracker();
        tracker.track_usage(1_000, 0);
        let remaining = tracker.budget_remaining();
        assert!(remaining > 4.90 && remaining < 5.00, "{remaining}");
        assert!(!tracker.is_budget_exceeded());
        assert!(tracker.ensure_within_budget().is_ok());
    }

    #[test]
    fn totals_are_monotone() {
        let mut tracker = opus_tracker();
        let mut last = 0.0;
        for (i, o) in [(100, 50), (0, 0), (2_000, 10), (1, 1)] {
            tracker.track_usage(i, o);
            assert!(tracker.state().total_cost >= last);
            last = tracker.state().total_cost;
        }
        assert_eq!(tracker.state().total_input_tokens, 2_101);
        assert_eq!(tracker.state().total_output_tokens, 61);
    }

    #[test]
    fn exactly_at_budget_is_not_exceeded() {
        let table = PricingTable::with_overrides([("flat", ModelPricing::new(1.0, 0.0))]);
        let mut tracker = CostTracker::new("flat", 5.0, &table).unwrap();
        tracker.track_usage(5_000, 0);
        assert!(!tracker.is_budget_exceeded());
        tracker.track_usage(1, 0);
        assert!(tracker.is_budget_exceeded());
    }

    #[test]
    fn reset_clears_state() {
        let mut tracker = opus_tracker();
        tracker.track_usage(10_000, 10_000);
        tracker.reset();
        assert_eq!(tracker.state(), CostState::default());
        assert_eq!(tracker.budget_remaining(), 5.0);
    }

    #[test]
    fn approaching_budget_warns_once_until_reset() {
        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(warnings.clone()));
        let table = PricingTable::with_overrides([("flat", ModelPricing::new(1.0, 0.0))]);
        let mut tracker = CostTracker::new("flat", 5.0, &table).unwrap().with_warn_ratio(0.5);

        tracing::subscriber::with_default(subscriber, || {
            tracker.track_usage(2_000, 0);
            assert!(!tracker.stats().warned);
            assert_eq!(warnings.load(Ordering::SeqCst), 0);

            // crosses 50% of $5, then stays above it
            tracker.track_usage(1_000, 0);
            tracker.track_usage(1_000, 0);
            assert!(tracker.stats().warned);
            assert_eq!(warnings.load(Ordering::SeqCst), 1);

            tracker.reset();
            assert!(!tracker.budget_warned());
            tracker.track_usage(3_000, 0);
            assert!(tracker.budget_warned());
            assert_eq!(warnings.load(Ordering::SeqCst), 2);
        });
    }

    #[test]
    fn rejects_non_positive_budget() {
        let table = PricingTable::with_defaults();
        assert!(CostTracker::new("x", 0.0, &table).is_err());
        assert!(CostTracker::new("x", -1.0, &table).is_err());
        assert!(CostTracker::new("x", f64::NAN, &table).is_err());
    }

    #[test]
    fn stats_serialize_flat_camel_case() {
        let mut tracker = opus_tracker();
        tracker.track_usage(1_000, 0);
        let json = serde_json::to_value(tracker.stats()).unwrap();
        assert_eq!(json["totalInputTokens"], 1_000);
        assert_eq!(json["budget"], 5.0);
        assert_eq!(json["exceeded"], false);
        assert_eq!(json["warned"], false);
    }
}
