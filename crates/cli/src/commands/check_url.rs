//! `arenaguard check-url`: run a URL through the egress guard.

use super::load_config;
use arenaguard_security::{EgressDecision, EgressGuard};
use std::path::Path;

/// Which guard a URL is checked against.
fn decide(guard: &EgressGuard, url: &str, navigation: bool) -> EgressDecision {
    if navigation {
        guard.check_navigation_url(url)
    } else {
        guard.check_outbound_api_url(url)
    }
}

pub fn run(config_path: Option<&Path>, url: &str, navigation: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let guard = EgressGuard::new(config.api_port);
    let rules = if navigation { "navigation" } else { "api_call" };

    match decide(&guard, url, navigation) {
        EgressDecision::Allowed => {
            println!("✅ allowed ({rules} rules, api port {})", guard.api_port());
            Ok(())
        }
        EgressDecision::Denied { reason } => {
            println!("⛔ denied ({rules} rules): {reason}");
            Err(format!("{url} is not reachable under {rules} rules").into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_rules_are_looser_on_loopback() {
        let guard = EgressGuard::new(3003);
        let url = "http://localhost:3002/tasks/form";
        assert!(decide(&guard, url, true).is_allowed());
        assert!(!decide(&guard, url, false).is_allowed());
    }

    #[test]
    fn metadata_denied_under_both() {
        let guard = EgressGuard::new(3003);
        for navigation in [true, false] {
            let decision = decide(&guard, "http://169.254.169.254/latest", navigation);
            assert!(decision.reason().unwrap().contains("metadata"));
        }
    }
}
