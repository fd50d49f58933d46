// Copyright (c) 2025 sokdak, dns-ingress
// SPDX-License-Identifier: MIT

//! Common label, annotation, and finalizer constants used across the reconcilers.
//!
//! The exact strings here form the operator's external contract: the mapping
//! label ties projected `Domain` objects back to their source `Ingress`, the
//! annotations carry per-Ingress overrides, and the finalizer guards provider
//! cleanup. The same constant must be used everywhere a string appears.

// ============================================================================
// dns-ingress Labels
// ============================================================================

/// Label on every projected `Domain`, valued with the source `Ingress` name
pub const LABEL_MAPPED_INGRESS: &str = "dns-ingress.io/mapped-ingress";

// ============================================================================
// Ingress Annotations
// ============================================================================

/// Annotation selecting the DNS provider registry key for an `Ingress`
pub const ANNOTATION_SERVICE_PROVIDER: &str = "dns-ingress.io/service-provider";

/// Annotation carrying the endpoint address that projected records point at
pub const ANNOTATION_INGRESS_ENDPOINT: &str = "dns-ingress.io/ingress-endpoint";

/// Annotation selecting the DNS zone (apex domain) for an `Ingress`
pub const ANNOTATION_ZONE: &str = "dns-ingress.io/zone";

// ============================================================================
// Finalizers
// ============================================================================

/// Finalizer for `Domain` resources; held until the provider record is gone
pub const FINALIZER_DOMAIN: &str = "dns-ingress.io/finalizer";
