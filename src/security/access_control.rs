//! IP and region denylists.
//!
//! IP entries that parse as addresses are compared in canonical form, so
//! `2001:db8::1` and `2001:0db8:0:0:0:0:0:1` are the same entry. Anything
//! else (including `unknown`) is compared as an exact string. Region codes
//! are compared case-insensitively.

use std::collections::HashSet;
use std::net::IpAddr;

use crate::config::AccessConfig;

/// Result of checking a client against the denylists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessVerdict {
    Allow,
    DenyIp,
    DenyRegion,
}

impl AccessVerdict {
    /// Label used in logs and metrics.
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            AccessVerdict::Allow => None,
            AccessVerdict::DenyIp => Some("ip"),
            AccessVerdict::DenyRegion => Some("region"),
        }
    }

    /// Plain-text body returned with the 403.
    pub fn rejection_body(&self) -> Option<&'static str> {
        match self {
            AccessVerdict::Allow => None,
            AccessVerdict::DenyIp => Some("Access denied: IP blocked"),
            AccessVerdict::DenyRegion => Some("Access denied: Region blocked"),
        }
    }
}

/// Static denylists built once from configuration.
#[derive(Debug, Clone, Default)]
pub struct Denylist {
    ips: HashSet<String>,
    regions: HashSet<String>,
}

impl Denylist {
    pub fn from_config(config: &AccessConfig) -> Self {
        Self {
            ips: config.blocked_ips.iter().map(|ip| canonical_ip(ip)).collect(),
            regions: config
                .blocked_regions
                .iter()
                .map(|r| r.to_ascii_uppercase())
                .collect(),
        }
    }

    /// IP is checked first; the first match wins.
    pub fn check(&self, ip: &str, region: &str) -> AccessVerdict {
        if !self.ips.is_empty() && self.ips.contains(&canonical_ip(ip)) {
            return AccessVerdict::DenyIp;
        }
        if !self.regions.is_empty() && self.regions.contains(&region.to_ascii_uppercase()) {
            return AccessVerdict::DenyRegion;
        }
        AccessVerdict::Allow
    }
}

fn canonical_ip(ip: &str) -> String {
    let trimmed = ip.trim();
    match trimmed.parse::<IpAddr>() {
        Ok(addr) => addr.to_canonical().to_string(),
        Err(_) => trimmed.to_string(),
    }
}
