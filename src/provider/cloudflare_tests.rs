// Copyright (c) 2025 sokdak, dns-ingress
// SPDX-License-Identifier: MIT

//! Unit tests for `cloudflare.rs`

#[cfg(test)]
mod tests {
    use super::super::{
        find_exact_record, find_exact_zone, map_record, parse_envelope, qualified_name,
        relative_name, wire_ttl, wire_type, Envelope, RecordPayload, ZonePayload,
    };
    use crate::provider::ProviderError;

    fn record_payload(name: &str) -> RecordPayload {
        RecordPayload {
            id: "R1".to_string(),
            name: name.to_string(),
            record_type: "A".to_string(),
            content: "1.2.3.4".to_string(),
            ttl: 120,
            zone_id: "Z1".to_string(),
            zone_name: "example.com".to_string(),
        }
    }

    /// A realistic zone listing decodes through the envelope
    #[test]
    fn test_parse_envelope_zone_listing() {
        let body = r#"{
            "success": true,
            "errors": [],
            "messages": [],
            "result": [
                {"id": "Z1", "name": "example.com", "paused": false, "status": "active"}
            ]
        }"#;

        let envelope: Envelope<Vec<ZonePayload>> = parse_envelope(200, body).unwrap();
        let zones = envelope.result.unwrap();
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].id, "Z1");
        assert!(!zones[0].paused);
    }

    /// Non-2xx statuses map to an Api error carrying the first error message
    #[test]
    fn test_parse_envelope_api_error() {
        let body = r#"{
            "success": false,
            "errors": [{"code": 9109, "message": "Invalid access token"}],
            "result": null
        }"#;

        let err = parse_envelope::<Vec<ZonePayload>>(403, body).unwrap_err();
        match err {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 403);
                assert!(message.contains("Invalid access token"));
                assert!(message.contains("9109"));
            }
            other => panic!("Expected Api error, got {other:?}"),
        }
    }

    /// Garbage bodies on error statuses still produce an Api error
    #[test]
    fn test_parse_envelope_error_with_unparseable_body() {
        let err = parse_envelope::<ZonePayload>(502, "<html>bad gateway</html>").unwrap_err();
        match err {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 502);
                assert!(message.contains("bad gateway"));
            }
            other => panic!("Expected Api error, got {other:?}"),
        }
    }

    /// Garbage bodies on success statuses are malformed responses
    #[test]
    fn test_parse_envelope_malformed_success_body() {
        let err = parse_envelope::<ZonePayload>(200, "not json").unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    /// The name filter can return near matches; only the exact zone wins
    #[test]
    fn test_find_exact_zone() {
        let zones = vec![
            ZonePayload {
                id: "Z2".to_string(),
                name: "sub.example.com".to_string(),
                paused: false,
            },
            ZonePayload {
                id: "Z1".to_string(),
                name: "example.com".to_string(),
                paused: true,
            },
        ];

        assert_eq!(find_exact_zone(&zones, "example.com").unwrap().id, "Z1");
        assert!(find_exact_zone(&zones, "other.org").is_none());
    }

    /// Among multiple listed records only an exact FQDN match is chosen
    #[test]
    fn test_find_exact_record() {
        let records = vec![
            record_payload("app.example.com.extra"),
            record_payload("app.example.com"),
        ];

        let found = find_exact_record(&records, "app.example.com").unwrap();
        assert_eq!(found.name, "app.example.com");
        assert!(
            find_exact_record(&records, "other.example.com").is_none(),
            "No exact match means not found"
        );
    }

    /// Qualified names join label and zone; empty labels mean the apex
    #[test]
    fn test_qualified_name() {
        assert_eq!(qualified_name("app", "example.com"), "app.example.com");
        assert_eq!(qualified_name("", "example.com"), "example.com");
    }

    /// Relative names strip exactly the zone suffix
    #[test]
    fn test_relative_name() {
        assert_eq!(relative_name("app.example.com", "example.com"), "app");
        assert_eq!(relative_name("a.b.example.com", "example.com"), "a.b");
        // names outside the zone pass through untouched
        assert_eq!(relative_name("app.other.org", "example.com"), "app.other.org");
        assert_eq!(relative_name("app.example.com", ""), "app.example.com");
    }

    /// Zero TTL and empty type fall back to provider defaults on the wire
    #[test]
    fn test_wire_defaults() {
        assert_eq!(wire_ttl(0), 1, "Zero TTL should become Cloudflare auto");
        assert_eq!(wire_ttl(-5), 1);
        assert_eq!(wire_ttl(120), 120);
        assert_eq!(wire_type(""), "A");
        assert_eq!(wire_type("CNAME"), "CNAME");
    }

    /// Payload mapping produces a relative name and a dotted FQDN
    #[test]
    fn test_map_record_shape() {
        let record = map_record(&record_payload("app.example.com"), "example.com");

        assert_eq!(record.id, "R1");
        assert_eq!(record.name, "app", "Name should be zone-relative");
        assert_eq!(record.fqdn, "app.example.com.", "FQDN carries a trailing dot");
        assert_eq!(record.records, vec!["1.2.3.4".to_string()]);
        assert_eq!(record.ttl, 120);
        assert_eq!(record.zone_name, "example.com");
        assert!(record.activated);
    }

    /// A payload without zone_name falls back to the caller's zone
    #[test]
    fn test_map_record_zone_name_fallback() {
        let mut payload = record_payload("app.example.com");
        payload.zone_name = String::new();

        let record = map_record(&payload, "example.com");
        assert_eq!(record.name, "app");
        assert_eq!(record.zone_name, "example.com");
    }
}
