// Copyright (c) 2025 sokdak, dns-ingress
// SPDX-License-Identifier: MIT

//! Name derivation helpers for projected `Domain` objects.
//!
//! The Ingress projector names each `Domain` after its source `Ingress` plus a
//! digest of the virtual-host, so that renaming a rule host produces a new
//! object instead of mutating an unrelated one.

/// Hex-encoded MD5 digest of the input.
///
/// # Arguments
///
/// * `input` - The string to digest
///
/// # Returns
///
/// A 32-character lowercase hex string.
///
/// # Example
///
/// ```rust
/// # use dns_ingress::naming::md5_hex;
/// assert_eq!(md5_hex(""), "d41d8cd98f00b204e9800998ecf8427e");
/// ```
#[must_use]
pub fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

/// Object name for a projected `Domain`: `<ingressName>-<md5(host)>`.
///
/// # Arguments
///
/// * `ingress_name` - Name of the source `Ingress`
/// * `host` - The rule host being projected
///
/// # Returns
///
/// The `Domain` object name, stable for a given (ingress, host) pair.
///
/// # Example
///
/// ```rust
/// # use dns_ingress::naming::projected_domain_name;
/// let name = projected_domain_name("web", "a.example.com");
/// assert!(name.starts_with("web-"));
/// ```
#[must_use]
pub fn projected_domain_name(ingress_name: &str, host: &str) -> String {
    format!("{}-{}", ingress_name, md5_hex(host))
}

/// Derive the record label from a rule host by stripping the zone suffix.
///
/// Requires `host == "<label>." + zone` exactly; anything else (host equal to
/// the zone, host in a different zone, a label that merely contains the zone
/// as a substring) yields `None` and the projection for that rule fails.
///
/// # Arguments
///
/// * `host` - The rule host (e.g., "app.example.com")
/// * `zone` - The effective zone apex (e.g., "example.com")
///
/// # Returns
///
/// * `Some(label)` - The host sits directly under the zone
/// * `None` - The host does not end with `"." + zone`, or the label is empty
///
/// # Example
///
/// ```rust
/// # use dns_ingress::naming::host_label;
/// assert_eq!(host_label("app.example.com", "example.com"), Some("app"));
/// assert_eq!(host_label("app.other.org", "example.com"), None);
/// ```
#[must_use]
pub fn host_label<'a>(host: &'a str, zone: &str) -> Option<&'a str> {
    if zone.is_empty() {
        return None;
    }
    let suffix = format!(".{zone}");
    match host.strip_suffix(suffix.as_str()) {
        Some(label) if !label.is_empty() => Some(label),
        _ => None,
    }
}

#[cfg(test)]
#[path = "naming_tests.rs"]
mod naming_tests;
