// Copyright (c) 2025 sokdak, dns-ingress
// SPDX-License-Identifier: MIT

//! `Domain` reconciliation state machine.
//!
//! One reconcile call advances a `Domain` by at most one transition; phases
//! are evaluated top to bottom and the first matching phase runs and returns.
//! The control plane's change notification (or an explicit requeue) triggers
//! the next step:
//!
//! 1. fetch, 2. provider resolution, 3. deletion path, 4. finalizer install,
//! 5. `ProviderChanged` flush, 6. provider drift detect, 7. provider
//! bootstrap, 8. `ZoneChanged` flush, 9. zone drift detect, 10. zone load,
//! 11. record adopt-or-create, 12. drift reconcile, 13. `Ready` rollup,
//! 14. done.
//!
//! Provider failures requeue with per-phase exponential backoff; the backoff
//! key is the phase label, so a flapping zone lookup never slows record
//! retries for the same object.

use anyhow::Result;
use kube::{Api, Client, Resource, ResourceExt};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::backoff::BackoffStore;
use crate::crd::{
    Domain, DomainSpec, RecordStatus, ZoneStatus, CONDITION_REASON_PROVIDER_NOT_FOUND,
    CONDITION_REASON_SERVICE_API_FAILED, CONDITION_REASON_ZONE_NOT_FOUND,
    CONDITION_SEVERITY_ERROR, CONDITION_TYPE_PROVIDER_CHANGED, CONDITION_TYPE_PROVIDER_LOADED,
    CONDITION_TYPE_READY, CONDITION_TYPE_RECORD_SET_CREATED, CONDITION_TYPE_RECORD_SET_RETRIEVED,
    CONDITION_TYPE_RECORD_SET_UPDATED, CONDITION_TYPE_ZONE_CHANGED,
    CONDITION_TYPE_ZONE_INFO_LOADED,
};
use crate::labels::FINALIZER_DOMAIN;
use crate::provider::{ProviderClient, ProviderError, ProviderRegistry};
use crate::reconcilers::retry::{update_domain, update_domain_status};
use crate::reconcilers::status::{delete_condition, is_true, mark_false, mark_true};

/// Shared state for the `Domain` controller.
pub struct Context {
    /// Kubernetes API client.
    pub client: Client,
    /// Provider registry, read-only after startup.
    pub registry: ProviderRegistry,
    /// Phase-keyed requeue backoff.
    pub backoff: BackoffStore,
}

/// What one reconcile step decided.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing left to do; wait for the next change notification.
    Done,
    /// Re-enqueue immediately to run the next phase.
    Requeue,
    /// Re-enqueue after a backoff delay.
    RequeueAfter(Duration),
}

/// Run one step of the `Domain` state machine.
///
/// Phases are evaluated top to bottom; the first matching phase runs and
/// returns, so one call advances the object by at most one transition.
///
/// # Arguments
///
/// * `ctx` - Shared controller state (client, provider registry, backoff)
/// * `namespace` - Namespace of the `Domain` to reconcile
/// * `name` - Name of the `Domain` to reconcile
///
/// # Returns
///
/// The [`Outcome`] of this step: done, immediate requeue, or a delayed
/// requeue paced by the phase's backoff.
///
/// # Errors
///
/// Returns an error only for control-plane failures the work queue should
/// retry at its own cadence; provider failures are absorbed into conditions
/// and delayed requeues.
///
/// # Example
///
/// ```rust,no_run
/// # use dns_ingress::reconcilers::domain::{Context, reconcile_domain};
/// # async fn example(ctx: Context) -> anyhow::Result<()> {
/// let outcome = reconcile_domain(&ctx, "default", "app-domain").await?;
/// # Ok(())
/// # }
/// ```
#[allow(clippy::too_many_lines)]
pub async fn reconcile_domain(ctx: &Context, namespace: &str, name: &str) -> Result<Outcome> {
    debug!(namespace, name, "start reconcile");

    // fetch the domain object
    let api: Api<Domain> = Api::namespaced(ctx.client.clone(), namespace);
    let Some(domain) = api.get_opt(name).await? else {
        return Ok(Outcome::Done);
    };

    // check provider available
    let Some(service) = ctx.registry.get(&domain.spec.provider).cloned() else {
        let message = format!(
            "dns provider {} not found on configuration",
            domain.spec.provider
        );
        update_domain_status(&ctx.client, &domain, |status| {
            mark_false(
                &mut status.conditions,
                CONDITION_TYPE_PROVIDER_LOADED,
                CONDITION_REASON_PROVIDER_NOT_FOUND,
                CONDITION_SEVERITY_ERROR,
                &message,
            );
        })
        .await?;
        return Ok(Outcome::Done);
    };

    let has_finalizer = domain.finalizers().iter().any(|f| f == FINALIZER_DOMAIN);

    // if it has a deletionTimestamp with the finalizer, delete the record
    if domain.meta().deletion_timestamp.is_some() && has_finalizer {
        return delete_domain(ctx, &domain, service.as_ref(), namespace, name).await;
    }

    // if it doesn't have the finalizer yet, add it
    if !has_finalizer {
        update_domain(&ctx.client, &domain, |d| {
            let finalizers = d.metadata.finalizers.get_or_insert_with(Vec::new);
            if !finalizers.iter().any(|f| f == FINALIZER_DOMAIN) {
                finalizers.push(FINALIZER_DOMAIN.to_string());
            }
        })
        .await?;
        return Ok(Outcome::Requeue);
    }

    let conditions = domain
        .status
        .as_ref()
        .map(|s| s.conditions.as_slice())
        .unwrap_or_default();

    // if ProviderChanged is true, tear down the record and start over
    if is_true(conditions, CONDITION_TYPE_PROVIDER_CHANGED) {
        info!(namespace, name, "provider change detected");
        return flush_changed_condition(
            ctx,
            &domain,
            service.as_ref(),
            CONDITION_TYPE_PROVIDER_CHANGED,
            "ProviderChanged-Delete",
            "ProviderChanged-UpdateCR",
            namespace,
            name,
        )
        .await;
    }

    // if status.provider is present and doesn't match spec.provider, mark ProviderChanged
    let observed_provider = domain
        .status
        .as_ref()
        .map(|s| s.provider.as_str())
        .unwrap_or_default();
    if !observed_provider.is_empty() && observed_provider != domain.spec.provider {
        update_domain_status(&ctx.client, &domain, |status| {
            mark_true(&mut status.conditions, CONDITION_TYPE_PROVIDER_CHANGED);
        })
        .await?;
        return Ok(Outcome::Done);
    }

    // if status.provider is not present, copy it from spec
    if observed_provider.is_empty() {
        update_domain_status(&ctx.client, &domain, |status| {
            status.provider = domain.spec.provider.clone();
        })
        .await?;
        return Ok(Outcome::Requeue);
    }

    // if ZoneChanged is true, tear down the record and start over
    if is_true(conditions, CONDITION_TYPE_ZONE_CHANGED) {
        info!(namespace, name, "zone change detected");
        return flush_changed_condition(
            ctx,
            &domain,
            service.as_ref(),
            CONDITION_TYPE_ZONE_CHANGED,
            "ZoneChanged-Delete",
            "ZoneChanged-UpdateCR",
            namespace,
            name,
        )
        .await;
    }

    // if status.zone is present and doesn't match spec.zone, mark ZoneChanged
    let zone_status = domain.status.as_ref().and_then(|s| s.zone.clone());
    if let Some(zone) = &zone_status {
        if zone.name != domain.spec.zone {
            update_domain_status(&ctx.client, &domain, |status| {
                mark_true(&mut status.conditions, CONDITION_TYPE_ZONE_CHANGED);
            })
            .await?;
            return Ok(Outcome::Done);
        }
    }

    // if status.zone is not present, load the zone info
    let Some(zone_status) = zone_status else {
        return load_zone(ctx, &domain, service.as_ref(), namespace, name).await;
    };

    // if status.record is empty, try to adopt or create the record
    let record_status = domain.status.as_ref().and_then(|s| s.record.clone());
    let Some(record_status) = record_status else {
        return adopt_or_create_record(ctx, &domain, service.as_ref(), &zone_status, namespace, name)
            .await;
    };

    // if status.record and spec diverge, update the record
    if record_needs_update(&domain.spec, &record_status) {
        return update_record(
            ctx,
            &domain,
            service.as_ref(),
            &zone_status,
            &record_status,
            namespace,
            name,
        )
        .await;
    }

    // collapse the transient conditions into Ready, the sole terminal one
    if is_true(conditions, CONDITION_TYPE_RECORD_SET_CREATED)
        || is_true(conditions, CONDITION_TYPE_RECORD_SET_UPDATED)
        || is_true(conditions, CONDITION_TYPE_RECORD_SET_RETRIEVED)
    {
        if let Err(e) = update_domain_status(&ctx.client, &domain, |status| {
            delete_condition(&mut status.conditions, CONDITION_TYPE_RECORD_SET_CREATED);
            delete_condition(&mut status.conditions, CONDITION_TYPE_RECORD_SET_UPDATED);
            delete_condition(&mut status.conditions, CONDITION_TYPE_RECORD_SET_RETRIEVED);
            delete_condition(&mut status.conditions, CONDITION_TYPE_ZONE_INFO_LOADED);
            mark_true(&mut status.conditions, CONDITION_TYPE_READY);
        })
        .await
        {
            error!(namespace, name, error = %e, "reconciler error");
        }
        return Ok(Outcome::Requeue);
    }

    debug!(namespace, name, "end reconcile");
    Ok(Outcome::Done)
}

/// Deletion path: verify the provider record, remove it, then release the
/// finalizer.
///
/// The provider `get` runs first so a record that is already gone never
/// triggers a `delete` call.
async fn delete_domain(
    ctx: &Context,
    domain: &Domain,
    service: &dyn ProviderClient,
    namespace: &str,
    name: &str,
) -> Result<Outcome> {
    let record = domain.status.as_ref().and_then(|s| s.record.as_ref());
    let zone = domain.status.as_ref().and_then(|s| s.zone.as_ref());

    if let (Some(record), Some(zone)) = (record, zone) {
        if !record.id.is_empty() && !zone.id.is_empty() {
            let existing = match service.get(&record.id, &zone.id).await {
                Ok(existing) => existing,
                Err(e) => {
                    error!(namespace, name, error = %e, "reconciler error");
                    return Ok(Outcome::RequeueAfter(
                        ctx.backoff.next(namespace, name, "Delete-Get"),
                    ));
                }
            };
            ctx.backoff.reset(namespace, name, "Delete-Get");

            // if the recordset still exists, try to delete it
            if existing.is_some() {
                if let Err(e) = service.delete(&record.id, &zone.id).await {
                    error!(namespace, name, error = %e, "reconciler error");
                    return Ok(Outcome::RequeueAfter(
                        ctx.backoff.next(namespace, name, "Delete"),
                    ));
                }
                ctx.backoff.reset(namespace, name, "Delete");
            }
        }
    }

    update_domain(&ctx.client, domain, |d| {
        if let Some(finalizers) = d.metadata.finalizers.as_mut() {
            finalizers.retain(|f| f != FINALIZER_DOMAIN);
        }
    })
    .await?;
    info!(namespace, name, "released finalizer");
    Ok(Outcome::Done)
}

/// Flush a `ProviderChanged`/`ZoneChanged` condition: tear down the provider
/// record, then clear the observed status so reconciliation starts over.
///
/// The record in status was created at the provider named by
/// `status.provider`, so teardown resolves that provider; the spec's provider
/// only serves as a fallback while status carries no provider yet.
#[allow(clippy::too_many_arguments)]
async fn flush_changed_condition(
    ctx: &Context,
    domain: &Domain,
    service: &dyn ProviderClient,
    condition_type: &str,
    delete_phase: &str,
    update_phase: &str,
    namespace: &str,
    name: &str,
) -> Result<Outcome> {
    let observed_provider = domain
        .status
        .as_ref()
        .map(|s| s.provider.as_str())
        .unwrap_or_default();
    let observed_service = ctx.registry.get(observed_provider).cloned();
    let teardown_service: &dyn ProviderClient = observed_service
        .as_deref()
        .unwrap_or(service);

    if let Err(e) = teardown_record_set(teardown_service, domain).await {
        error!(namespace, name, error = %e, "reconciler error");
        return Ok(Outcome::RequeueAfter(
            ctx.backoff.next(namespace, name, delete_phase),
        ));
    }
    ctx.backoff.reset(namespace, name, delete_phase);

    match update_domain_status(&ctx.client, domain, |status| {
        delete_condition(&mut status.conditions, condition_type);
        status.provider.clear();
        status.fqdn.clear();
        status.zone = None;
        status.record = None;
    })
    .await
    {
        Ok(_) => {
            ctx.backoff.reset(namespace, name, update_phase);
            Ok(Outcome::Requeue)
        }
        Err(e) => {
            error!(namespace, name, error = %e, "reconciler error");
            Ok(Outcome::RequeueAfter(
                ctx.backoff.next(namespace, name, update_phase),
            ))
        }
    }
}

/// Zone load phase: resolve `spec.zone` at the provider into `status.zone`.
async fn load_zone(
    ctx: &Context,
    domain: &Domain,
    service: &dyn ProviderClient,
    namespace: &str,
    name: &str,
) -> Result<Outcome> {
    let zone = match service.get_zone(&domain.spec.zone).await {
        Ok(zone) => zone,
        Err(e) => {
            let message = format!("request failed: {e}");
            if let Err(err) = update_domain_status(&ctx.client, domain, |status| {
                mark_false(
                    &mut status.conditions,
                    CONDITION_TYPE_ZONE_INFO_LOADED,
                    CONDITION_REASON_SERVICE_API_FAILED,
                    CONDITION_SEVERITY_ERROR,
                    &message,
                );
            })
            .await
            {
                error!(namespace, name, error = %err, "reconciler error");
            }
            return Ok(Outcome::RequeueAfter(
                ctx.backoff.next(namespace, name, "Zone-Get"),
            ));
        }
    };
    ctx.backoff.reset(namespace, name, "Zone-Get");

    // if the zone is not found, retry after backoff; the zone may appear later
    let Some(zone) = zone else {
        let message = format!("zone {} is not available", domain.spec.zone);
        if let Err(err) = update_domain_status(&ctx.client, domain, |status| {
            mark_false(
                &mut status.conditions,
                CONDITION_TYPE_ZONE_INFO_LOADED,
                CONDITION_REASON_ZONE_NOT_FOUND,
                CONDITION_SEVERITY_ERROR,
                &message,
            );
        })
        .await
        {
            error!(namespace, name, error = %err, "reconciler error");
        }
        return Ok(Outcome::RequeueAfter(
            ctx.backoff.next(namespace, name, "Zone-NotFound"),
        ));
    };
    ctx.backoff.reset(namespace, name, "Zone-NotFound");

    match update_domain_status(&ctx.client, domain, |status| {
        mark_true(&mut status.conditions, CONDITION_TYPE_ZONE_INFO_LOADED);
        status.zone = Some(ZoneStatus {
            name: zone.name.clone(),
            id: zone.id.clone(),
            activated: Some(zone.activated),
        });
    })
    .await
    {
        Ok(_) => {
            ctx.backoff.reset(namespace, name, "Zone-UpdateCR");
            info!(namespace, name, zone = %zone.name, zone_id = %zone.id, "zone info loaded");
            Ok(Outcome::Requeue)
        }
        Err(e) => {
            error!(namespace, name, error = %e, "reconciler error");
            Ok(Outcome::RequeueAfter(
                ctx.backoff.next(namespace, name, "Zone-UpdateCR"),
            ))
        }
    }
}

/// Record adopt-or-create phase: prefer an existing provider record matching
/// by name, create one only if absent, then project it into `status.record`.
async fn adopt_or_create_record(
    ctx: &Context,
    domain: &Domain,
    service: &dyn ProviderClient,
    zone: &ZoneStatus,
    namespace: &str,
    name: &str,
) -> Result<Outcome> {
    let found = match service.get_by_name(&domain.spec.name, &zone.id).await {
        Ok(found) => found,
        Err(e) => {
            let message = format!("request failed: {e}");
            if let Err(err) = update_domain_status(&ctx.client, domain, |status| {
                mark_false(
                    &mut status.conditions,
                    CONDITION_TYPE_RECORD_SET_RETRIEVED,
                    CONDITION_REASON_SERVICE_API_FAILED,
                    CONDITION_SEVERITY_ERROR,
                    &message,
                );
            })
            .await
            {
                error!(namespace, name, error = %err, "reconciler error");
            }
            return Ok(Outcome::RequeueAfter(
                ctx.backoff.next(namespace, name, "Record-Get"),
            ));
        }
    };
    ctx.backoff.reset(namespace, name, "Record-Get");

    let record = match found {
        Some(record) => record,
        None => {
            match service
                .create(
                    &domain.spec.name,
                    &zone.id,
                    &domain.spec.r#type,
                    &domain.spec.records,
                    domain.spec.ttl,
                )
                .await
            {
                Ok(record) => {
                    ctx.backoff.reset(namespace, name, "Record-Create");
                    info!(namespace, name, record_id = %record.id, "created provider record");
                    record
                }
                Err(e) => {
                    let message = format!("request failed: {e}");
                    if let Err(err) = update_domain_status(&ctx.client, domain, |status| {
                        delete_condition(&mut status.conditions, CONDITION_TYPE_RECORD_SET_RETRIEVED);
                        mark_false(
                            &mut status.conditions,
                            CONDITION_TYPE_RECORD_SET_CREATED,
                            CONDITION_REASON_SERVICE_API_FAILED,
                            CONDITION_SEVERITY_ERROR,
                            &message,
                        );
                    })
                    .await
                    {
                        error!(namespace, name, error = %err, "reconciler error");
                    }
                    return Ok(Outcome::RequeueAfter(
                        ctx.backoff.next(namespace, name, "Record-Create"),
                    ));
                }
            }
        }
    };

    // record values are stored sorted
    let records = sorted(&record.records);
    match update_domain_status(&ctx.client, domain, |status| {
        delete_condition(&mut status.conditions, CONDITION_TYPE_RECORD_SET_RETRIEVED);
        mark_true(&mut status.conditions, CONDITION_TYPE_RECORD_SET_CREATED);
        status.record = Some(RecordStatus {
            name: record.name.clone(),
            id: record.id.clone(),
            r#type: record.r#type.clone(),
            records: records.clone(),
            ttl: Some(record.ttl),
            activated: Some(record.activated),
        });
        status.fqdn = record.fqdn.clone();
    })
    .await
    {
        Ok(_) => {
            ctx.backoff.reset(namespace, name, "Record-Create-UpdateCR");
            Ok(Outcome::Requeue)
        }
        Err(e) => {
            error!(namespace, name, error = %e, "reconciler error");
            Ok(Outcome::RequeueAfter(
                ctx.backoff.next(namespace, name, "Record-Create-UpdateCR"),
            ))
        }
    }
}

/// Drift reconcile phase: push the spec's values to the provider and refresh
/// `status.record` from the reply.
#[allow(clippy::too_many_arguments)]
async fn update_record(
    ctx: &Context,
    domain: &Domain,
    service: &dyn ProviderClient,
    zone: &ZoneStatus,
    record_status: &RecordStatus,
    namespace: &str,
    name: &str,
) -> Result<Outcome> {
    let want = sorted(&domain.spec.records);
    let updated = match service
        .update(
            &record_status.id,
            &zone.id,
            &domain.spec.r#type,
            &want,
            domain.spec.ttl,
        )
        .await
    {
        Ok(updated) => updated,
        Err(e) => {
            let message = format!("update request failed: {e}");
            if let Err(err) = update_domain_status(&ctx.client, domain, |status| {
                mark_false(
                    &mut status.conditions,
                    CONDITION_TYPE_RECORD_SET_UPDATED,
                    CONDITION_REASON_SERVICE_API_FAILED,
                    CONDITION_SEVERITY_ERROR,
                    &message,
                );
            })
            .await
            {
                error!(namespace, name, error = %err, "reconciler error");
            }
            return Ok(Outcome::RequeueAfter(
                ctx.backoff.next(namespace, name, "Record-Update"),
            ));
        }
    };
    ctx.backoff.reset(namespace, name, "Record-Update");

    // integrity failed, evict the entire record status and re-adopt
    let Some(record) = updated else {
        if let Err(e) = update_domain_status(&ctx.client, domain, |status| {
            delete_condition(&mut status.conditions, CONDITION_TYPE_RECORD_SET_CREATED);
            delete_condition(&mut status.conditions, CONDITION_TYPE_RECORD_SET_UPDATED);
            delete_condition(&mut status.conditions, CONDITION_TYPE_RECORD_SET_RETRIEVED);
            delete_condition(&mut status.conditions, CONDITION_TYPE_READY);
            status.record = None;
            status.fqdn.clear();
        })
        .await
        {
            error!(namespace, name, error = %e, "reconciler error");
        }
        return Ok(Outcome::Requeue);
    };

    let records = sorted(&record.records);
    match update_domain_status(&ctx.client, domain, |status| {
        mark_true(&mut status.conditions, CONDITION_TYPE_RECORD_SET_UPDATED);
        status.record = Some(RecordStatus {
            name: record.name.clone(),
            id: record.id.clone(),
            r#type: record.r#type.clone(),
            records: records.clone(),
            ttl: Some(record.ttl),
            activated: Some(record.activated),
        });
        status.fqdn = record.fqdn.clone();
    })
    .await
    {
        Ok(_) => {
            ctx.backoff.reset(namespace, name, "Record-Update-UpdateCR");
            info!(namespace, name, record_id = %record.id, "updated provider record");
            Ok(Outcome::Requeue)
        }
        Err(e) => {
            error!(namespace, name, error = %e, "reconciler error");
            Ok(Outcome::RequeueAfter(
                ctx.backoff.next(namespace, name, "Record-Update-UpdateCR"),
            ))
        }
    }
}

/// Delete the provider record recorded in status, if any.
///
/// # Arguments
///
/// * `service` - The provider client to delete through
/// * `domain` - The `Domain` whose `status.record`/`status.zone` name the
///   record
///
/// # Errors
///
/// Returns the provider error when the delete call fails; the caller
/// converts it into a delayed requeue.
async fn teardown_record_set(
    service: &dyn ProviderClient,
    domain: &Domain,
) -> Result<(), ProviderError> {
    let Some(status) = domain.status.as_ref() else {
        return Ok(());
    };
    if let (Some(record), Some(zone)) = (status.record.as_ref(), status.zone.as_ref()) {
        if !record.id.is_empty() {
            service.delete(&record.id, &zone.id).await?;
        }
    }
    Ok(())
}

/// Check whether the observed record diverges from the spec.
///
/// Zero-valued `ttl` and empty `type` in the spec mean "provider default"
/// and never count as drift; otherwise fields are compared strictly, with
/// record values compared as sorted sets.
///
/// # Arguments
///
/// * `spec` - The declared record
/// * `record` - The observed record from `status.record`
///
/// # Returns
///
/// `true` when an `update` call is needed to converge the provider.
fn record_needs_update(spec: &DomainSpec, record: &RecordStatus) -> bool {
    let want = sorted(&spec.records);
    record.name != spec.name
        || (!spec.r#type.is_empty() && record.r#type != spec.r#type)
        || record.records != want
        || (spec.ttl != 0 && record.ttl != Some(spec.ttl))
}

/// Lexicographically sorted copy of a record value list.
fn sorted(records: &[String]) -> Vec<String> {
    let mut sorted = records.to_vec();
    sorted.sort();
    sorted
}

#[cfg(test)]
#[path = "domain_tests.rs"]
mod domain_tests;
