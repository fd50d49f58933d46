// Copyright (c) 2025 sokdak, dns-ingress
// SPDX-License-Identifier: MIT

//! Unit tests for `status.rs`

#[cfg(test)]
mod tests {
    use super::super::{
        delete_condition, find_condition, is_true, mark_false, mark_true, STATUS_FALSE,
        STATUS_TRUE,
    };
    use crate::crd::Condition;

    /// mark_true adds a bare True condition
    #[test]
    fn test_mark_true_adds_condition() {
        let mut conditions = Vec::new();
        mark_true(&mut conditions, "Ready");

        assert_eq!(conditions.len(), 1);
        let c = &conditions[0];
        assert_eq!(c.r#type, "Ready");
        assert_eq!(c.status, STATUS_TRUE);
        assert!(c.reason.is_none());
        assert!(c.severity.is_none());
        assert!(c.last_transition_time.is_some());
    }

    /// mark_false carries reason, severity, and message
    #[test]
    fn test_mark_false_carries_details() {
        let mut conditions = Vec::new();
        mark_false(
            &mut conditions,
            "ZoneInfoLoaded",
            "ZoneNotFound",
            "Error",
            "zone example.com is not available",
        );

        let c = &conditions[0];
        assert_eq!(c.status, STATUS_FALSE);
        assert_eq!(c.reason.as_deref(), Some("ZoneNotFound"));
        assert_eq!(c.severity.as_deref(), Some("Error"));
        assert_eq!(
            c.message.as_deref(),
            Some("zone example.com is not available")
        );
    }

    /// Re-marking an identical condition keeps its transition time
    #[test]
    fn test_remark_is_idempotent() {
        let mut conditions = Vec::new();
        mark_false(&mut conditions, "ProviderLoaded", "ProviderNotFound", "Error", "missing");
        let first_time = conditions[0].last_transition_time.clone();

        mark_false(&mut conditions, "ProviderLoaded", "ProviderNotFound", "Error", "missing");
        assert_eq!(conditions.len(), 1, "No duplicate condition should appear");
        assert_eq!(
            conditions[0].last_transition_time, first_time,
            "Unchanged condition keeps its transition time"
        );
    }

    /// Flipping status replaces the condition and its timestamp payload
    #[test]
    fn test_status_flip_replaces_condition() {
        let mut conditions = Vec::new();
        mark_false(&mut conditions, "RecordSetCreated", "ServiceAPIRequestFailed", "Error", "boom");
        mark_true(&mut conditions, "RecordSetCreated");

        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].status, STATUS_TRUE);
        assert!(conditions[0].reason.is_none(), "Reason is cleared on True");
    }

    /// is_true distinguishes True, False, and absent
    #[test]
    fn test_is_true() {
        let mut conditions = Vec::new();
        assert!(!is_true(&conditions, "Ready"));

        mark_false(&mut conditions, "Ready", "ServiceAPIRequestFailed", "Error", "x");
        assert!(!is_true(&conditions, "Ready"));

        mark_true(&mut conditions, "Ready");
        assert!(is_true(&conditions, "Ready"));
    }

    /// delete_condition removes only the named type
    #[test]
    fn test_delete_condition_is_scoped() {
        let mut conditions = Vec::new();
        mark_true(&mut conditions, "RecordSetCreated");
        mark_true(&mut conditions, "RecordSetUpdated");

        delete_condition(&mut conditions, "RecordSetCreated");
        assert!(find_condition(&conditions, "RecordSetCreated").is_none());
        assert!(find_condition(&conditions, "RecordSetUpdated").is_some());

        // deleting an absent type is a no-op
        delete_condition(&mut conditions, "RecordSetCreated");
        assert_eq!(conditions.len(), 1);
    }

    /// Conditions of different types accumulate
    #[test]
    fn test_multiple_condition_types_coexist() {
        let mut conditions = vec![Condition {
            r#type: "ProviderChanged".to_string(),
            status: STATUS_TRUE.to_string(),
            ..Condition::default()
        }];
        mark_true(&mut conditions, "ZoneInfoLoaded");

        assert_eq!(conditions.len(), 2);
        assert!(is_true(&conditions, "ProviderChanged"));
        assert!(is_true(&conditions, "ZoneInfoLoaded"));
    }
}
