// Copyright (c) 2025 sokdak, dns-ingress
// SPDX-License-Identifier: MIT

//! Global constants for the dns-ingress operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for the dns-ingress CRDs
pub const API_GROUP: &str = "dns-ingress.io";

/// API version for the dns-ingress CRDs
pub const API_VERSION: &str = "v1alpha1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "dns-ingress.io/v1alpha1";

/// Kind name for the `Domain` resource
pub const KIND_DOMAIN: &str = "Domain";

/// Kind name for the upstream `Ingress` resource
pub const KIND_INGRESS: &str = "Ingress";

// ============================================================================
// Provider Constants
// ============================================================================

/// Registry key for the Cloudflare provider
pub const PROVIDER_KEY_CLOUDFLARE: &str = "cloudflare";

/// Comment attached to every record the operator creates at the provider
pub const PROVIDER_RECORD_COMMENT: &str = "created and managed by dns-ingress.io";

/// Page size for provider record listing requests
pub const PROVIDER_LIST_PAGE_SIZE: u32 = 100;

// ============================================================================
// Controller Error Handling Constants
// ============================================================================

/// Requeue duration for controller errors (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Initial delay for per-phase provider backoff (1 second)
pub const PHASE_BACKOFF_INITIAL_SECS: u64 = 1;

/// Maximum delay for per-phase provider backoff (5 minutes)
pub const PHASE_BACKOFF_MAX_SECS: u64 = 300;

// ============================================================================
// Optimistic Concurrency Constants
// ============================================================================

/// Maximum number of retries after a 409 Conflict on a control-plane write
pub const CONFLICT_RETRY_STEPS: u32 = 4;

/// Initial delay between conflict retries (10 milliseconds)
pub const CONFLICT_RETRY_BASE_MILLIS: u64 = 10;

/// Multiplier applied to the conflict retry delay after each attempt
pub const CONFLICT_RETRY_FACTOR: u32 = 5;

// ============================================================================
// Leader Election Constants
// ============================================================================

/// Default leader election lease duration (15 seconds)
pub const DEFAULT_LEASE_DURATION_SECS: u64 = 15;

/// Default leader election retry period (2 seconds)
pub const DEFAULT_LEASE_RETRY_PERIOD_SECS: u64 = 2;

/// Default namespace for the leader election lease
pub const DEFAULT_LEASE_NAMESPACE: &str = "dns-system";

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for the Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Port for the Prometheus metrics HTTP server
pub const METRICS_SERVER_PORT: u16 = 8080;

/// Path for the Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Bind address for the metrics HTTP server
pub const METRICS_SERVER_BIND_ADDRESS: &str = "0.0.0.0";
