//! Network egress guard: SSRF defense for agent-directed requests.
//!
//! Two entry points with different trust requirements:
//! - [`EgressGuard::check_outbound_api_url`] for `api_call`: loopback is
//!   denied except for the service's own API port.
//! - [`EgressGuard::check_navigation_url`] for browser navigation: task pages
//!   are served locally, so loopback is always permitted.
//!
//! Both are pure and never touch the network. Hostnames are not resolved;
//! IP literals in any form the URL parser normalizes (decimal, hex) are
//! classified after normalization. IPv6 literals that carry an IPv4 address
//! (mapped, compatible, NAT64, 6to4) are classified by that IPv4 address.

use std::net::{Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

/// Hostnames that serve cloud instance metadata.
const METADATA_HOSTNAMES: &[&str] = &["metadata.google.internal", "metadata.goog"];
const METADATA_V4: Ipv4Addr = Ipv4Addr::new(169, 254, 169, 254);
/// AWS IMDS over IPv6.
const METADATA_V6: Ipv6Addr = Ipv6Addr::new(0xfd00, 0x0ec2, 0, 0, 0, 0, 0, 0x0254);

/// Verdict of an egress check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EgressDecision {
    Allowed,
    Denied { reason: String },
}

impl EgressDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Allowed => None,
            Self::Denied { reason } => Some(reason),
        }
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self::Denied {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopbackPolicy {
    /// Loopback only on this port.
    OnlyPort(u16),
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HostClass {
    Public,
    Loopback,
    Metadata,
    Private(&'static str),
}

/// SSRF guard configured with the service's own API port.
#[derive(Debug, Clone, Copy)]
pub struct EgressGuard {
    api_port: u16,
}

impl EgressGuard {
    pub fn new(api_port: u16) -> Self {
        Self { api_port }
    }

    pub fn api_port(&self) -> u16 {
        self.api_port
    }

    /// Check a destination for an out-of-band API call.
    pub fn check_outbound_api_url(&self, url: &str) -> EgressDecision {
        check(url, LoopbackPolicy::OnlyPort(self.api_port))
    }

    /// Check a browser navigation target.
    pub fn check_navigation_url(&self, url: &str) -> EgressDecision {
        check(url, LoopbackPolicy::Always)
    }
}

fn check(raw: &str, loopback: LoopbackPolicy) -> EgressDecision {
    let Ok(url) = Url::parse(raw.trim()) else {
        return EgressDecision::deny("invalid URL");
    };

    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return EgressDecision::deny(format!("scheme '{scheme}' is not allowed"));
    }

    let Some(host) = url.host() else {
        return EgressDecision::deny("invalid URL: missing host");
    };

    match classify(&host) {
        HostClass::Public => EgressDecision::Allowed,
        HostClass::Metadata => {
            EgressDecision::deny("cloud metadata endpoint blocked (private infrastructure)")
        }
        HostClass::Private(range) => EgressDecision::deny(format!("private address blocked: {range}")),
        HostClass::Loopback => match loopback {
            LoopbackPolicy::Always => EgressDecision::Allowed,
            LoopbackPolicy::OnlyPort(port) if url.port_or_known_default() == Some(port) => {
                EgressDecision::Allowed
            }
            LoopbackPolicy::OnlyPort(port) => EgressDecision::deny(format!(
                "loopback address blocked: only port {port} is permitted"
            )),
        },
    }
}

fn classify(host: &Host<&str>) -> HostClass {
    match host {
        Host::Domain(name) => {
            let name = name.trim_end_matches('.').to_ascii_lowercase();
            if METADATA_HOSTNAMES.contains(&name.as_str()) {
                HostClass::Metadata
            } else if name == "localhost" || name.ends_with(".localhost") {
                HostClass::Loopback
            } else {
                HostClass::Public
            }
        }
        Host::Ipv4(ip) => classify_v4(*ip),
        Host::Ipv6(ip) => classify_v6(*ip),
    }
}

fn classify_v4(ip: Ipv4Addr) -> HostClass {
    let [a, b, ..] = ip.octets();
    if ip == METADATA_V4 {
        HostClass::Metadata
    } else if ip.is_loopback() || ip.is_unspecified() {
        HostClass::Loopback
    } else if ip.is_private() {
        HostClass::Private("RFC 1918 private range")
    } else if ip.is_link_local() {
        HostClass::Private("link-local (private) range")
    } else if a == 100 && (64..128).contains(&b) {
        HostClass::Private("carrier-grade NAT (private) range")
    } else if ip.is_broadcast() {
        HostClass::Private("broadcast (private) address")
    } else {
        HostClass::Public
    }
}

fn classify_v6(ip: Ipv6Addr) -> HostClass {
    if let Some(v4) = embedded_v4(ip) {
        return classify_v4(v4);
    }
    let first = ip.segments()[0];
    if ip == METADATA_V6 {
        HostClass::Metadata
    } else if ip.is_loopback() || ip.is_unspecified() {
        HostClass::Loopback
    } else if (first & 0xfe00) == 0xfc00 {
        HostClass::Private("unique-local (private) range")
    } else if (first & 0xffc0) == 0xfe80 {
        HostClass::Private("link-local (private) range")
    } else {
        HostClass::Public
    }
}

/// IPv4 address carried inside an IPv6 literal: IPv4-mapped (`::ffff:0:0/96`),
/// IPv4-compatible (`::/96`, except `::` and `::1`), NAT64 (`64:ff9b::/96`)
/// or 6to4 (`2002::/16`).
fn embedded_v4(ip: Ipv6Addr) -> Option<Ipv4Addr> {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return Some(v4);
    }
    let seg = ip.segments();
    let join = |hi: u16, lo: u16| Ipv4Addr::from((u32::from(hi) << 16) | u32::from(lo));
    match seg {
        [0, 0, 0, 0, 0, 0, hi, lo] if hi != 0 || lo > 1 => Some(join(hi, lo)),
        [0x0064, 0xff9b, 0, 0, 0, 0, hi, lo] => Some(join(hi, lo)),
        [0x2002, hi, lo, ..] => Some(join(hi, lo)),
        _ => None,
    }
}
