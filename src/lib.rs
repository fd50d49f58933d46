// Copyright (c) 2025 sokdak, dns-ingress
// SPDX-License-Identifier: MIT

//! # dns-ingress - declarative DNS operator for Kubernetes
//!
//! dns-ingress is a Kubernetes operator that keeps external DNS providers in
//! sync with declarative intent. It runs two cooperating control loops:
//!
//! - the **Ingress projector** derives `Domain` objects from the
//!   virtual-hosts of `Ingress` rules (plus annotations), owning their
//!   create/update/delete lifecycle;
//! - the **Domain reconciler** drives each `Domain` through zone lookup,
//!   record adopt-or-create, drift repair, and finalized teardown against the
//!   selected DNS provider.
//!
//! ## Modules
//!
//! - [`crd`] - the `Domain` Custom Resource Definition
//! - [`reconcilers`] - the two control loops and their shared helpers
//! - [`provider`] - the DNS provider abstraction and implementations
//! - [`backoff`] - phase-keyed exponential requeue backoff
//! - [`environment`] - immutable startup configuration
//! - [`metrics`] - Prometheus instrumentation
//!
//! ## Example
//!
//! ```rust,no_run
//! use dns_ingress::crd::DomainSpec;
//!
//! // Declare app.example.com -> 1.2.3.4 at Cloudflare
//! let spec = DomainSpec {
//!     provider: "cloudflare".to_string(),
//!     r#type: "A".to_string(),
//!     name: "app".to_string(),
//!     zone: "example.com".to_string(),
//!     records: vec!["1.2.3.4".to_string()],
//!     ttl: 120,
//! };
//! ```
//!
//! Eventual consistency is the contract: the loops requeue with per-phase
//! exponential backoff on provider failures and rely on the control plane's
//! per-key serialization instead of locks.

pub mod backoff;
pub mod constants;
pub mod crd;
pub mod environment;
pub mod labels;
pub mod metrics;
pub mod naming;
pub mod provider;
pub mod reconcilers;
