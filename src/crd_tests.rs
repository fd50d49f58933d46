// Copyright (c) 2025 sokdak, dns-ingress
// SPDX-License-Identifier: MIT

//! Unit tests for `crd.rs`

#[cfg(test)]
mod tests {
    use super::super::{Condition, Domain, DomainSpec, DomainStatus, RecordStatus, ZoneStatus};
    use kube::core::CustomResourceExt;

    fn sample_spec() -> DomainSpec {
        DomainSpec {
            provider: "cloudflare".to_string(),
            r#type: "A".to_string(),
            name: "app".to_string(),
            zone: "example.com".to_string(),
            records: vec!["1.2.3.4".to_string()],
            ttl: 120,
        }
    }

    /// Spec fields serialize camelCase and round-trip
    #[test]
    fn test_domain_spec_serde_round_trip() {
        let spec = sample_spec();
        let json = serde_json::to_value(&spec).unwrap();

        assert_eq!(json["provider"], "cloudflare");
        assert_eq!(json["type"], "A");
        assert_eq!(json["zone"], "example.com");
        assert_eq!(json["ttl"], 120);

        let back: DomainSpec = serde_json::from_value(json).unwrap();
        assert_eq!(back, spec);
    }

    /// Type, records, and ttl are optional in the manifest
    #[test]
    fn test_domain_spec_defaults_optional_fields() {
        let spec: DomainSpec = serde_json::from_value(serde_json::json!({
            "provider": "cloudflare",
            "name": "app",
            "zone": "example.com",
        }))
        .unwrap();

        assert!(spec.r#type.is_empty(), "Type should default to empty");
        assert!(spec.records.is_empty(), "Records should default to empty");
        assert_eq!(spec.ttl, 0, "TTL should default to zero");
    }

    /// Empty status serializes to an empty object, not a forest of nulls
    #[test]
    fn test_domain_status_empty_serialization() {
        let status = DomainStatus::default();
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }

    /// Populated status round-trips with substatus intact
    #[test]
    fn test_domain_status_round_trip() {
        let status = DomainStatus {
            provider: "cloudflare".to_string(),
            fqdn: "app.example.com.".to_string(),
            zone: Some(ZoneStatus {
                name: "example.com".to_string(),
                id: "Z1".to_string(),
                activated: Some(true),
            }),
            record: Some(RecordStatus {
                name: "app".to_string(),
                id: "R1".to_string(),
                r#type: "A".to_string(),
                records: vec!["1.2.3.4".to_string()],
                ttl: Some(120),
                activated: Some(true),
            }),
            conditions: vec![Condition {
                r#type: "Ready".to_string(),
                status: "True".to_string(),
                ..Condition::default()
            }],
            ..DomainStatus::default()
        };

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["zone"]["id"], "Z1");
        assert_eq!(json["record"]["ttl"], 120);
        assert_eq!(json["conditions"][0]["type"], "Ready");

        let back: DomainStatus = serde_json::from_value(json).unwrap();
        assert_eq!(back, status);
    }

    /// The generated CRD carries the expected group, kind, and printer columns
    #[test]
    fn test_crd_definition_shape() {
        let crd = Domain::crd();
        assert_eq!(crd.spec.group, "dns-ingress.io");
        assert_eq!(crd.spec.names.kind, "Domain");
        assert_eq!(crd.spec.names.plural, "domains");

        let version = &crd.spec.versions[0];
        assert_eq!(version.name, "v1alpha1");
        assert!(
            version
                .subresources
                .as_ref()
                .and_then(|s| s.status.as_ref())
                .is_some(),
            "Status subresource should be enabled"
        );

        let columns = version.additional_printer_columns.as_ref().unwrap();
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["provider", "virtualhost", "activated"]);
    }
}
