//! `arenaguard estimate`: price a token count.

use super::load_config;
use arenaguard_config::AppConfig;
use arenaguard_telemetry::{CostTracker, ModelPricing, PricingTable};
use std::path::Path;

fn pricing_table(config: &AppConfig) -> PricingTable {
    PricingTable::with_overrides(
        config
            .pricing
            .iter()
            .map(|p| (p.pattern.clone(), ModelPricing::new(p.input_per_1k, p.output_per_1k))),
    )
}

pub fn run(
    config_path: Option<&Path>,
    model: &str,
    input: u64,
    output: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let table = pricing_table(&config);
    let rate = table.resolve(model);

    let mut tracker = CostTracker::new(model, config.budget.max_cost_usd, &table)?;
    let cost = tracker.track_usage(input, output);
    let stats = tracker.stats();

    println!("💰 Cost estimate");
    println!("─────────────────────────────────────");
    println!("  Model:      {model}");
    println!(
        "  Family:     {}",
        table.matched_family(model).unwrap_or("(default rate)")
    );
    println!(
        "  Rate/1K:    ${:.4} in, ${:.4} out",
        rate.input_per_1k, rate.output_per_1k
    );
    println!("  Tokens:     {input} in, {output} out");
    println!("  Cost:       ${cost:.4}");
    println!("  Budget:     ${:.2}", stats.budget);
    if stats.exceeded {
        println!("  ⛔ Exceeds the session budget");
    } else {
        println!("  Remaining:  ${:.4}", stats.remaining);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arenaguard_config::PricingOverrideConfig;

    #[test]
    fn config_overrides_take_precedence() {
        let mut config = AppConfig::default();
        config.pricing.push(PricingOverrideConfig {
            pattern: "Opus".into(),
            input_per_1k: 0.001,
            output_per_1k: 0.002,
        });
        let table = pricing_table(&config);
        assert_eq!(table.matched_family("claude-opus-4"), Some("opus"));
        assert!((table.compute_cost("claude-opus-4", 1000, 1000) - 0.003).abs() < 1e-9);
    }
}
