//! Per-model-family token pricing.
//!
//! Prices are in USD per 1 000 tokens. A model identifier resolves to the
//! first family whose pattern appears in it (case-insensitive), so
//! `claude-3-opus-20240229` and `anthropic/claude-opus-4` both price as
//! opus. Order matters: more specific patterns come first.

use serde::{Deserialize, Serialize};

/// Per-1K-token pricing for a model family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

impl ModelPricing {
    pub const fn new(input_per_1k: f64, output_per_1k: f64) -> Self {
        Self {
            input_per_1k,
            output_per_1k,
        }
    }

    /// Compute cost for the given token counts.
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 * self.input_per_1k + output_tokens as f64 * self.output_per_1k)
            / 1_000.0
    }
}

/// Rate used when no family pattern matches.
pub const DEFAULT_PRICING: ModelPricing = ModelPricing::new(0.003, 0.015);

const BUILTIN: &[(&str, ModelPricing)] = &[
    // Anthropic
    ("opus", ModelPricing::new(0.015, 0.075)),
    ("sonnet", ModelPricing::new(0.003, 0.015)),
    ("haiku", ModelPricing::new(0.00025, 0.00125)),
    // OpenAI
    ("gpt-4o-mini", ModelPricing::new(0.00015, 0.0006)),
    ("gpt-4o", ModelPricing::new(0.0025, 0.01)),
    ("gpt-4-turbo", ModelPricing::new(0.01, 0.03)),
    ("gpt-4", ModelPricing::new(0.03, 0.06)),
    ("gpt-3.5", ModelPricing::new(0.0005, 0.0015)),
    ("o1-mini", ModelPricing::new(0.003, 0.012)),
    ("o1", ModelPricing::new(0.015, 0.06)),
    // Google
    ("gemini-1.5-flash", ModelPricing::new(0.000075, 0.0003)),
    ("gemini-2.0-flash", ModelPricing::new(0.0001, 0.0004)),
    ("gemini", ModelPricing::new(0.00125, 0.005)),
];

/// Ordered family table. Overrides are consulted before built-ins.
#[derive(Debug, Clone)]
pub struct PricingTable {
    families: Vec<(String, ModelPricing)>,
    fallback: ModelPricing,
}

impl PricingTable {
    /// Create a pricing table with built-in family rates.
    pub fn with_defaults() -> Self {
        Self {
            families: BUILTIN
                .iter()
                .map(|(pattern, p)| ((*pattern).to_string(), *p))
                .collect(),
            fallback: DEFAULT_PRICING,
        }
    }

    /// Built-ins preceded by the given overrides, in order.
    pub fn with_overrides<I, S>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (S, ModelPricing)>,
        S: Into<String>,
    {
        let mut table = Self::with_defaults();
        let mut custom: Vec<(String, ModelPricing)> = overrides
            .into_iter()
            .map(|(pattern, p)| (pattern.into().to_lowercase(), p))
            .collect();
        custom.append(&mut table.families);
        table.families = custom;
        table
    }

    /// Resolve the rate for a model identifier.
    pub fn resolve(&self, model: &str) -> ModelPricing {
        let model = model.to_lowercase();
        self.families
            .iter()
            .find(|(pattern, _)| model.contains(pattern.as_str()))
            .map(|(_, p)| *p)
            .unwrap_or(self.fallback)
    }

    /// Pattern that would price `model`, or `None` for the fallback rate.
    pub fn matched_family(&self, model: &str) -> Option<&str> {
        let model = model.to_lowercase();
        self.families
            .iter()
            .find(|(pattern, _)| model.contains(pattern.as_str()))
            .map(|(pattern, _)| pattern.as_str())
    }

    pub fn compute_cost(&self, model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
        self.resolve(model).cost(input_tokens, output_tokens)
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}
