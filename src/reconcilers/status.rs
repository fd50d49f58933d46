// Copyright (c) 2025 sokdak, dns-ingress
// SPDX-License-Identifier: MIT

//! Status condition helpers for `Domain` resources.
//!
//! Conditions follow Kubernetes conventions: a `type`, a `status` of
//! True/False/Unknown, and for failures a CamelCase `reason`, a `severity`,
//! and a human-readable `message`. Marking a condition that is already in the
//! requested state is a no-op so repeated reconciles do not churn
//! `lastTransitionTime` or trigger spurious writes.
//!
//! # Example
//!
//! ```rust
//! use dns_ingress::reconcilers::status::{is_true, mark_true};
//!
//! let mut conditions = Vec::new();
//! mark_true(&mut conditions, "Ready");
//! assert!(is_true(&conditions, "Ready"));
//! ```

use crate::crd::Condition;
use chrono::Utc;

/// Condition status value for a passing condition.
pub const STATUS_TRUE: &str = "True";

/// Condition status value for a failing condition.
pub const STATUS_FALSE: &str = "False";

/// Find a condition by type in a list of conditions.
///
/// # Arguments
///
/// * `conditions` - The list of conditions to search
/// * `condition_type` - The type of condition to find (e.g., "Ready")
///
/// # Returns
///
/// The matching condition if found, otherwise `None`.
///
/// # Example
///
/// ```rust,no_run
/// # use dns_ingress::reconcilers::status::find_condition;
/// # use dns_ingress::crd::Condition;
/// let conditions: Vec<Condition> = vec![]; // from resource status
/// if let Some(ready) = find_condition(&conditions, "Ready") {
///     println!("Ready status: {}", ready.status);
/// }
/// ```
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Check whether a condition of the given type exists with status True.
///
/// # Arguments
///
/// * `conditions` - The list of conditions to search
/// * `condition_type` - The type of condition to check (e.g., "ProviderChanged")
///
/// # Returns
///
/// * `true` - The condition is present and its status is "True"
/// * `false` - The condition is absent, or present with any other status
///
/// # Example
///
/// ```rust
/// # use dns_ingress::reconcilers::status::{is_true, mark_true};
/// let mut conditions = Vec::new();
/// assert!(!is_true(&conditions, "Ready"));
/// mark_true(&mut conditions, "Ready");
/// assert!(is_true(&conditions, "Ready"));
/// ```
#[must_use]
pub fn is_true(conditions: &[Condition], condition_type: &str) -> bool {
    find_condition(conditions, condition_type).is_some_and(|c| c.status == STATUS_TRUE)
}

/// Set a condition to True with no reason or severity.
///
/// Change-detect conditions (`ProviderChanged`, `ZoneChanged`) and terminal
/// success conditions are marked this way. An already-True condition is left
/// untouched, preserving its `lastTransitionTime`.
///
/// # Arguments
///
/// * `conditions` - The condition list to mutate
/// * `condition_type` - The type of condition to set (e.g., "Ready")
///
/// # Example
///
/// ```rust
/// # use dns_ingress::reconcilers::status::mark_true;
/// let mut conditions = Vec::new();
/// mark_true(&mut conditions, "ZoneInfoLoaded");
/// assert_eq!(conditions[0].status, "True");
/// ```
pub fn mark_true(conditions: &mut Vec<Condition>, condition_type: &str) {
    let desired = Condition {
        r#type: condition_type.to_string(),
        status: STATUS_TRUE.to_string(),
        reason: None,
        severity: None,
        message: None,
        last_transition_time: Some(Utc::now().to_rfc3339()),
    };
    upsert(conditions, desired);
}

/// Set a condition to False with a reason, severity, and message.
///
/// A condition whose status, reason, severity, and message already match is
/// left untouched, preserving its `lastTransitionTime`; combined with the
/// write-skipping in the update helpers, a failing phase that keeps failing
/// the same way produces no status churn.
///
/// # Arguments
///
/// * `conditions` - The condition list to mutate
/// * `condition_type` - The type of condition to set (e.g., "`ZoneInfoLoaded`")
/// * `reason` - A programmatic identifier in `CamelCase` (e.g., "`ZoneNotFound`")
/// * `severity` - The failure severity: "Error", "Warning", or "Info"
/// * `message` - A human-readable explanation
///
/// # Example
///
/// ```rust
/// # use dns_ingress::reconcilers::status::mark_false;
/// let mut conditions = Vec::new();
/// mark_false(
///     &mut conditions,
///     "ZoneInfoLoaded",
///     "ZoneNotFound",
///     "Error",
///     "zone example.com is not available",
/// );
/// assert_eq!(conditions[0].reason.as_deref(), Some("ZoneNotFound"));
/// ```
pub fn mark_false(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    reason: &str,
    severity: &str,
    message: &str,
) {
    let desired = Condition {
        r#type: condition_type.to_string(),
        status: STATUS_FALSE.to_string(),
        reason: Some(reason.to_string()),
        severity: Some(severity.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    };
    upsert(conditions, desired);
}

/// Remove a condition by type, if present.
///
/// The operation is idempotent - removing an absent type has no effect.
///
/// # Arguments
///
/// * `conditions` - The condition list to mutate
/// * `condition_type` - The type of condition to remove
///
/// # Example
///
/// ```rust
/// # use dns_ingress::reconcilers::status::{delete_condition, mark_true};
/// let mut conditions = Vec::new();
/// mark_true(&mut conditions, "RecordSetCreated");
/// delete_condition(&mut conditions, "RecordSetCreated");
/// assert!(conditions.is_empty());
/// ```
pub fn delete_condition(conditions: &mut Vec<Condition>, condition_type: &str) {
    conditions.retain(|c| c.r#type != condition_type);
}

/// Replace or append a condition, keeping the old entry when nothing but the
/// timestamp would change.
fn upsert(conditions: &mut Vec<Condition>, desired: Condition) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == desired.r#type) {
        let unchanged = existing.status == desired.status
            && existing.reason == desired.reason
            && existing.severity == desired.severity
            && existing.message == desired.message;
        if !unchanged {
            *existing = desired;
        }
    } else {
        conditions.push(desired);
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
