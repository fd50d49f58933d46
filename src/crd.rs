// Copyright (c) 2025 sokdak, dns-ingress
// SPDX-License-Identifier: MIT

//! Custom Resource Definition for declarative DNS records.
//!
//! A [`Domain`] declares a single DNS record (one name in one zone at one
//! provider). The Domain reconciler drives provider state toward the spec and
//! tracks its progress in the status subresource; the Ingress projector
//! materializes `Domain` objects from `Ingress` virtual-hosts.
//!
//! # Example
//!
//! ```rust,no_run
//! use dns_ingress::crd::DomainSpec;
//!
//! let spec = DomainSpec {
//!     provider: "cloudflare".to_string(),
//!     r#type: "A".to_string(),
//!     name: "app".to_string(),
//!     zone: "example.com".to_string(),
//!     records: vec!["1.2.3.4".to_string()],
//!     ttl: 120,
//! };
//! ```

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ============================================================================
// Condition Types
// ============================================================================

/// The spec provider diverged from the observed provider; teardown pending
pub const CONDITION_TYPE_PROVIDER_CHANGED: &str = "ProviderChanged";

/// The spec zone diverged from the observed zone; teardown pending
pub const CONDITION_TYPE_ZONE_CHANGED: &str = "ZoneChanged";

/// The provider registry lookup outcome
pub const CONDITION_TYPE_PROVIDER_LOADED: &str = "ProviderLoaded";

/// The provider-side zone lookup outcome
pub const CONDITION_TYPE_ZONE_INFO_LOADED: &str = "ZoneInfoLoaded";

/// The provider-side record lookup outcome
pub const CONDITION_TYPE_RECORD_SET_RETRIEVED: &str = "RecordSetRetrieved";

/// The provider-side record creation outcome
pub const CONDITION_TYPE_RECORD_SET_CREATED: &str = "RecordSetCreated";

/// The provider-side record update outcome
pub const CONDITION_TYPE_RECORD_SET_UPDATED: &str = "RecordSetUpdated";

/// Terminal success condition; replaces the transient record conditions
pub const CONDITION_TYPE_READY: &str = "Ready";

// ============================================================================
// Condition Reasons
// ============================================================================

/// A provider API request failed
pub const CONDITION_REASON_SERVICE_API_FAILED: &str = "ServiceAPIRequestFailed";

/// The spec names a provider key absent from the registry
pub const CONDITION_REASON_PROVIDER_NOT_FOUND: &str = "ProviderNotFound";

/// The provider has no zone matching the spec
pub const CONDITION_REASON_ZONE_NOT_FOUND: &str = "ZoneNotFound";

// ============================================================================
// Condition Severities
// ============================================================================

/// Severity for conditions that block reconciliation
pub const CONDITION_SEVERITY_ERROR: &str = "Error";

/// Condition represents an observation of a resource's current state.
///
/// Conditions are used in the status subresource to communicate the state of
/// a resource to users and controllers.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition, one of the `CONDITION_TYPE_*` constants.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Severity of the condition when status is False: Error, Warning, or Info.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// Observed provider-side zone state.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ZoneStatus {
    /// Zone apex name as the provider reports it.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Provider-assigned zone identifier.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Whether the zone is serving at the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activated: Option<bool>,
}

/// Observed provider-side record state.
///
/// `records` is stored in lexicographic order regardless of the order the
/// provider or the spec supplies.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecordStatus {
    /// Record name relative to the zone.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Provider-assigned record identifier.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Record type as the provider reports it.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub r#type: String,

    /// Record values, sorted lexicographically.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub records: Vec<String>,

    /// Record TTL in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,

    /// Whether the record is live at the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activated: Option<bool>,
}

/// `DomainStatus` defines the observed state of a [`Domain`].
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DomainStatus {
    /// Provider key the reconciler is currently operating against.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub provider: String,

    /// Fully qualified record name, with trailing dot.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub fqdn: String,

    /// Name of the `Ingress` this object was projected from, when applicable.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ingress_name: String,

    /// Reconciliation progress conditions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Observed provider-side zone, set once the zone lookup succeeds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<ZoneStatus>,

    /// Observed provider-side record, set once the record is adopted or created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<RecordStatus>,
}

/// `Domain` declares a single DNS record to be reconciled against an external
/// DNS provider.
///
/// The record value list is semantically a set; its first element is the
/// payload sent to single-value providers. Zones must pre-exist at the
/// provider, the operator never creates them.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[kube(
    group = "dns-ingress.io",
    version = "v1alpha1",
    kind = "Domain",
    namespaced,
    status = "DomainStatus",
    printcolumn = r#"{"name":"provider","type":"string","jsonPath":".spec.provider"}"#,
    printcolumn = r#"{"name":"virtualhost","type":"string","jsonPath":".status.fqdn"}"#,
    printcolumn = r#"{"name":"activated","type":"boolean","jsonPath":".status.record.activated"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DomainSpec {
    /// Registry key of the DNS provider to reconcile against.
    pub provider: String,

    /// DNS record type (e.g. `A`, `CNAME`). Empty means the provider default.
    #[serde(default)]
    pub r#type: String,

    /// Record name relative to the zone (subdomain label).
    pub name: String,

    /// Zone apex domain the record lives in. Must pre-exist at the provider.
    pub zone: String,

    /// Record values; treated as a set whose first element is the payload for
    /// single-value providers.
    #[serde(default)]
    pub records: Vec<String>,

    /// Record TTL in seconds. Zero means the provider default.
    #[serde(default)]
    pub ttl: i64,
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
