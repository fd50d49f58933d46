// Copyright (c) 2025 sokdak, dns-ingress
// SPDX-License-Identifier: MIT

//! Conflict-aware mutation helpers for `Domain` objects.
//!
//! Both reconcilers mutate control-plane objects under optimistic
//! concurrency. The contract here: re-fetch the latest object into a scratch
//! copy, apply the caller's mutator to that scratch copy, and persist the
//! scratch copy, retrying the whole cycle on 409 Conflict with a bounded
//! exponential delay. The persisted object is returned so callers can carry
//! on with the fresh resource version.
//!
//! A mutation that leaves the object unchanged is detected before the write
//! and skipped entirely; steady-state reconciles make no API writes.

use anyhow::Result;
use kube::api::PostParams;
use kube::{Api, Client, ResourceExt};
use std::time::Duration;
use tracing::debug;

use crate::constants::{CONFLICT_RETRY_BASE_MILLIS, CONFLICT_RETRY_FACTOR, CONFLICT_RETRY_STEPS};
use crate::crd::{Domain, DomainStatus};

/// Check whether a Kubernetes API error is a 409 Conflict.
///
/// # Arguments
///
/// * `err` - The Kubernetes API error to check
///
/// # Returns
///
/// `true` if the error is an API response with status code 409, `false`
/// otherwise.
///
/// # Example
///
/// ```rust,no_run
/// # use dns_ingress::reconcilers::retry::is_conflict;
/// # fn example(err: &kube::Error) {
/// if is_conflict(err) {
///     // refetch and retry the write
/// }
/// # }
/// ```
#[must_use]
pub fn is_conflict(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 409)
}

/// Check whether a Kubernetes API error is a 404 Not Found.
///
/// Deletion paths use this to treat an already-deleted object as success.
///
/// # Arguments
///
/// * `err` - The Kubernetes API error to check
///
/// # Returns
///
/// `true` if the error is an API response with status code 404, `false`
/// otherwise.
#[must_use]
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 404)
}

/// Refetch, mutate, and persist a `Domain` (spec and metadata), retrying on
/// conflict.
///
/// The mutator is applied to the refetched scratch copy, never to the
/// caller's possibly-stale object.
///
/// # Arguments
///
/// * `client` - Kubernetes client for accessing the API
/// * `domain` - The caller's copy, used only for its namespace and name
/// * `mutate` - Mutation applied to the refetched scratch copy
///
/// # Returns
///
/// The persisted object, or the scratch copy untouched when the mutation was
/// a no-op.
///
/// # Errors
///
/// Returns an error when the refetch fails, when a non-conflict write error
/// occurs, or when the conflict retry budget is exhausted.
///
/// # Example
///
/// ```rust,no_run
/// # use dns_ingress::crd::Domain;
/// # use dns_ingress::reconcilers::retry::update_domain;
/// # use kube::Client;
/// # async fn example(client: Client, domain: Domain) -> anyhow::Result<()> {
/// let updated = update_domain(&client, &domain, |d| {
///     d.metadata.finalizers.get_or_insert_with(Vec::new).clear();
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn update_domain<F>(client: &Client, domain: &Domain, mutate: F) -> Result<Domain>
where
    F: Fn(&mut Domain),
{
    let namespace = domain.namespace().unwrap_or_default();
    let name = domain.name_any();
    let api: Api<Domain> = Api::namespaced(client.clone(), &namespace);

    let mut attempt: u32 = 0;
    let mut delay = Duration::from_millis(CONFLICT_RETRY_BASE_MILLIS);

    loop {
        let mut scratch = api.get(&name).await?;
        let before = serde_json::to_value(&scratch)?;
        mutate(&mut scratch);
        if serde_json::to_value(&scratch)? == before {
            debug!(namespace = %namespace, name = %name, "domain unchanged, skipping update");
            return Ok(scratch);
        }

        match api.replace(&name, &PostParams::default(), &scratch).await {
            Ok(updated) => return Ok(updated),
            Err(e) if is_conflict(&e) && attempt < CONFLICT_RETRY_STEPS => {
                attempt += 1;
                debug!(
                    namespace = %namespace,
                    name = %name,
                    attempt,
                    "conflict updating domain, retrying"
                );
                tokio::time::sleep(delay).await;
                delay *= CONFLICT_RETRY_FACTOR;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Refetch, mutate, and persist a `Domain` status subresource, retrying on
/// conflict.
///
/// The mutator receives the scratch copy's status, default-initialized when
/// absent; the caller's copy is never mutated.
///
/// # Arguments
///
/// * `client` - Kubernetes client for accessing the API
/// * `domain` - The caller's copy, used only for its namespace and name
/// * `mutate` - Mutation applied to the refetched scratch copy's status
///
/// # Returns
///
/// The persisted object, or the scratch copy untouched when the mutation was
/// a no-op.
///
/// # Errors
///
/// Returns an error when the refetch fails, when a non-conflict write error
/// occurs, or when the conflict retry budget is exhausted.
///
/// # Example
///
/// ```rust,no_run
/// # use dns_ingress::crd::Domain;
/// # use dns_ingress::reconcilers::retry::update_domain_status;
/// # use dns_ingress::reconcilers::status::mark_true;
/// # use kube::Client;
/// # async fn example(client: Client, domain: Domain) -> anyhow::Result<()> {
/// let updated = update_domain_status(&client, &domain, |status| {
///     mark_true(&mut status.conditions, "Ready");
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn update_domain_status<F>(client: &Client, domain: &Domain, mutate: F) -> Result<Domain>
where
    F: Fn(&mut DomainStatus),
{
    let namespace = domain.namespace().unwrap_or_default();
    let name = domain.name_any();
    let api: Api<Domain> = Api::namespaced(client.clone(), &namespace);

    let mut attempt: u32 = 0;
    let mut delay = Duration::from_millis(CONFLICT_RETRY_BASE_MILLIS);

    loop {
        let mut scratch = api.get(&name).await?;
        let before = serde_json::to_value(&scratch)?;
        mutate(scratch.status.get_or_insert_with(DomainStatus::default));
        if serde_json::to_value(&scratch)? == before {
            debug!(namespace = %namespace, name = %name, "status unchanged, skipping update");
            return Ok(scratch);
        }

        match api
            .replace_status(&name, &PostParams::default(), serde_json::to_vec(&scratch)?)
            .await
        {
            Ok(updated) => return Ok(updated),
            Err(e) if is_conflict(&e) && attempt < CONFLICT_RETRY_STEPS => {
                attempt += 1;
                debug!(
                    namespace = %namespace,
                    name = %name,
                    attempt,
                    "conflict updating domain status, retrying"
                );
                tokio::time::sleep(delay).await;
                delay *= CONFLICT_RETRY_FACTOR;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
