// Copyright (c) 2025 sokdak, dns-ingress
// SPDX-License-Identifier: MIT

//! Reconciliation logic for the dns-ingress operator.
//!
//! Two loops cooperate through the control plane: the [`ingress`] projector
//! derives the set of `Domain` objects an `Ingress` implies, and the
//! [`domain`] state machine drives each `Domain` to its provider. They share
//! the condition helpers in [`status`] and the conflict-aware mutation
//! helpers in [`retry`].

pub mod domain;
pub mod ingress;
pub mod retry;
pub mod status;

pub use domain::{reconcile_domain, Outcome};
pub use ingress::reconcile_ingress;
