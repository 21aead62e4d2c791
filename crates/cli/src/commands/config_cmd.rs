//! `arenaguard config`: configuration management commands.

use super::load_config;
use arenaguard_config::AppConfig;
use std::path::Path;

pub fn show(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    if config.webhook.secret.is_some() {
        config.webhook.secret = Some("<redacted>".into());
    }
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub fn validate(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    };
    println!("   ✅ Config parsed successfully");

    let mut warnings = Vec::new();
    if config.webhook.url.is_some() && config.webhook.secret.is_none() {
        warnings.push("Webhook URL set without a secret; requests will be unsigned");
    }
    if !config.runner.headless {
        warnings.push("Browser runs headed; not suitable for unattended hosts");
    }
    if config.allowed_tools().len() < arenaguard_core::tool::ToolName::ALL.len() {
        warnings.push("Tool allowlist is narrowed; some agents may fail tasks");
    }

    if warnings.is_empty() {
        println!("   ✅ All checks passed");
    } else {
        println!();
        for w in &warnings {
            println!("   ⚠️  {w}");
        }
    }

    println!();
    println!("   API port:  {}", config.api_port);
    println!("   Max turns: {}", config.runner.max_turns);
    println!("   Budget:    ${:.2}", config.budget.max_cost_usd);
    println!("   Tools:     {}", config.security.allowed_tools.join(", "));
    Ok(())
}

/// Write the default configuration. Refuses to overwrite unless `force`.
pub fn init(config_path: Option<&Path>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let target = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));
    if target.exists() && !force {
        return Err(format!("{} already exists (use --force to overwrite)", target.display()).into());
    }
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&target, AppConfig::default_toml())?;
    println!("✅ Wrote {}", target.display());
    Ok(())
}

pub fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}
