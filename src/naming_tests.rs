// Copyright (c) 2025 sokdak, dns-ingress
// SPDX-License-Identifier: MIT

//! Unit tests for `naming.rs`

#[cfg(test)]
mod tests {
    use super::super::{host_label, md5_hex, projected_domain_name};

    /// MD5 digests are hex-encoded and stable
    #[test]
    fn test_md5_hex_known_value() {
        // Well-known MD5 test vector
        assert_eq!(md5_hex(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(
            md5_hex("a.example.com"),
            md5_hex("a.example.com"),
            "Digest should be deterministic"
        );
        assert_ne!(md5_hex("a.example.com"), md5_hex("b.example.com"));
    }

    /// Projected names carry the ingress name and the host digest
    #[test]
    fn test_projected_domain_name_format() {
        let name = projected_domain_name("web", "a.example.com");
        assert!(name.starts_with("web-"), "Name should start with ingress name");
        assert_eq!(
            name.len(),
            "web-".len() + 32,
            "Suffix should be a 32-char hex digest"
        );
    }

    /// Hosts directly under the zone strip to their label
    #[test]
    fn test_host_label_strips_zone_suffix() {
        assert_eq!(host_label("app.example.com", "example.com"), Some("app"));
        assert_eq!(
            host_label("a.b.example.com", "example.com"),
            Some("a.b"),
            "Multi-level labels are kept intact"
        );
    }

    /// A host equal to the zone has no label
    #[test]
    fn test_host_label_rejects_apex() {
        assert_eq!(host_label("example.com", "example.com"), None);
    }

    /// Hosts outside the zone fail the projection
    #[test]
    fn test_host_label_rejects_foreign_zone() {
        assert_eq!(host_label("app.other.org", "example.com"), None);
    }

    /// A label containing the zone as a substring is not confused with the suffix
    #[test]
    fn test_host_label_rejects_embedded_zone_substring() {
        // The naive split-on-zone approach would mangle this host
        assert_eq!(host_label("example.com.evil.org", "example.com"), None);
        assert_eq!(
            host_label("my-example.com.example.com", "example.com"),
            Some("my-example.com")
        );
    }

    /// Empty zones and empty labels are rejected
    #[test]
    fn test_host_label_rejects_degenerate_inputs() {
        assert_eq!(host_label("app.example.com", ""), None);
        assert_eq!(host_label(".example.com", "example.com"), None);
    }
}
