// Copyright (c) 2025 sokdak, dns-ingress
// SPDX-License-Identifier: MIT

//! `Ingress` projector: materializes the set of `Domain` objects an
//! `Ingress` implies.
//!
//! The desired set is one `Domain` per rule host; the observed set is every
//! `Domain` in the namespace carrying the mapping label for this `Ingress`.
//! One reconcile pass creates missing members, repairs spec drift on existing
//! ones, and deletes dangling ones. Per-host failures are aggregated into a
//! single error so the work queue retries the whole key while unaffected
//! hosts still converge.
//!
//! Projected `Domain` objects carry a controller owner reference to the
//! `Ingress`, so deleting the `Ingress` cascades through garbage collection;
//! the projector itself only deletes on host removal.

use anyhow::{anyhow, Context as AnyhowContext, Result};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{DeleteParams, ListParams, PostParams};
use kube::{Api, Client, Resource, ResourceExt};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, error, info};

use crate::crd::{Domain, DomainSpec};
use crate::labels::{
    ANNOTATION_INGRESS_ENDPOINT, ANNOTATION_SERVICE_PROVIDER, ANNOTATION_ZONE,
    LABEL_MAPPED_INGRESS,
};
use crate::naming::{host_label, projected_domain_name};
use crate::reconcilers::retry::{is_not_found, update_domain};

/// Projector fallbacks used when an `Ingress` carries no annotation.
#[derive(Clone, Debug, Default)]
pub struct ProjectorDefaults {
    /// Fallback provider registry key.
    pub provider: String,
    /// Fallback record value (the ingress endpoint address).
    pub ingress_endpoint: String,
    /// Fallback zone apex.
    pub zone: String,
}

/// Shared state for the `Ingress` controller.
pub struct Context {
    /// Kubernetes API client.
    pub client: Client,
    /// Operator-wide projection defaults.
    pub defaults: ProjectorDefaults,
}

/// Effective projection settings for one `Ingress`: annotations first,
/// operator defaults second.
#[derive(Clone, Debug, PartialEq, Eq)]
struct EffectiveSettings {
    provider: String,
    endpoint: String,
    zone: String,
}

/// Reconcile the projected `Domain` set for one `Ingress`.
///
/// One pass creates a `Domain` per rule host not yet observed, repairs spec
/// drift on observed ones, and deletes observed ones whose host is gone.
///
/// # Arguments
///
/// * `ctx` - Shared controller state (client, projection defaults)
/// * `namespace` - Namespace of the `Ingress` to reconcile
/// * `name` - Name of the `Ingress` to reconcile
///
/// # Returns
///
/// `Ok(())` once every host converged; a deleted `Ingress` is also success,
/// since owner references cascade the `Domain` deletion.
///
/// # Errors
///
/// Returns an aggregated error when any host fails to project; the queue
/// retries the whole key.
///
/// # Example
///
/// ```rust,no_run
/// # use dns_ingress::reconcilers::ingress::{Context, reconcile_ingress};
/// # async fn example(ctx: Context) -> anyhow::Result<()> {
/// reconcile_ingress(&ctx, "default", "web").await?;
/// # Ok(())
/// # }
/// ```
pub async fn reconcile_ingress(ctx: &Context, namespace: &str, name: &str) -> Result<()> {
    debug!(namespace, name, "start reconcile");

    // if the ingress is gone, owner references cascade the domain deletion
    let ingress_api: Api<Ingress> = Api::namespaced(ctx.client.clone(), namespace);
    let Some(ingress) = ingress_api.get_opt(name).await? else {
        info!(namespace, name, "ignoring since ingress object has been deleted");
        return Ok(());
    };

    let settings = effective_settings(ingress.annotations(), &ctx.defaults);
    let hosts = rule_hosts(&ingress);
    info!(namespace, name, vhosts = hosts.len(), "got ingress rules");

    // observed domains, keyed by "<spec.name>.<spec.zone>"
    let domain_api: Api<Domain> = Api::namespaced(ctx.client.clone(), namespace);
    let selector = format!("{LABEL_MAPPED_INGRESS}={name}");
    let observed_list = domain_api
        .list(&ListParams::default().labels(&selector))
        .await
        .context("can't list domain objects")?;
    let mut observed: HashMap<String, Domain> = observed_list
        .items
        .into_iter()
        .map(|d| (domain_host_key(&d), d))
        .collect();
    info!(namespace, name, count = observed.len(), "listed actual domains");

    let mut errors: Vec<String> = Vec::new();

    // sync new vhosts and refresh existing entries
    for host in &hosts {
        let result = match observed.get(host) {
            None => handle_domain_creation(&domain_api, &ingress, &settings, host).await,
            Some(domain) => handle_domain_update(ctx, &settings, domain).await,
        };
        if let Err(e) = result {
            error!(namespace, name, vhost = %host, error = %e, "occurred error while syncing domain resource");
            errors.push(format!("{host}: {e:#}"));
        }
    }

    // sync dangling entries
    let host_set: HashSet<&String> = hosts.iter().collect();
    let dangling: Vec<String> = observed
        .keys()
        .filter(|k| !host_set.contains(k))
        .cloned()
        .collect();

    for host in dangling {
        let Some(domain) = observed.remove(&host) else {
            continue;
        };
        info!(
            namespace,
            name,
            vhost = %host,
            domain = %domain.name_any(),
            "deleting dangling domain"
        );
        if let Err(e) = domain_api
            .delete(&domain.name_any(), &DeleteParams::default())
            .await
        {
            // already deleted elsewhere counts as done
            if is_not_found(&e) {
                continue;
            }
            error!(namespace, name, vhost = %host, error = %e, "occurred error while deleting domain resource");
            errors.push(format!("{host}: {e}"));
        }
    }

    if !errors.is_empty() {
        return Err(anyhow!(
            "{} of {} host(s) failed to reconcile: {}",
            errors.len(),
            hosts.len(),
            errors.join("; ")
        ));
    }

    debug!(namespace, name, "end reconcile");
    Ok(())
}

/// Create the `Domain` projection for one rule host.
async fn handle_domain_creation(
    domain_api: &Api<Domain>,
    ingress: &Ingress,
    settings: &EffectiveSettings,
    host: &str,
) -> Result<()> {
    let domain = new_projected_domain(ingress, settings, host)?;
    domain_api
        .create(&PostParams::default(), &domain)
        .await
        .context("can't create domain")?;

    info!(
        namespace = %ingress.namespace().unwrap_or_default(),
        ingress = %ingress.name_any(),
        vhost = %host,
        provider = %settings.provider,
        ingress_ep = %settings.endpoint,
        zone = %settings.zone,
        "created domain resource"
    );
    Ok(())
}

/// Repair spec drift on an existing projection with conflict retry.
///
/// Only `provider`, the first record value, and `zone` are repaired; label or
/// owner drift is left alone.
async fn handle_domain_update(
    ctx: &Context,
    settings: &EffectiveSettings,
    domain: &Domain,
) -> Result<()> {
    let before = domain.spec.clone();

    update_domain(&ctx.client, domain, |d| {
        if d.spec.provider != settings.provider {
            d.spec.provider = settings.provider.clone();
        }
        if d.spec.records.first() != Some(&settings.endpoint) {
            d.spec.records = vec![settings.endpoint.clone()];
        }
        if d.spec.zone != settings.zone {
            d.spec.zone = settings.zone.clone();
        }
    })
    .await?;

    let drifted = before.provider != settings.provider
        || before.records.first() != Some(&settings.endpoint)
        || before.zone != settings.zone;
    if drifted {
        info!(
            domain = %domain.name_any(),
            provider = %format!("{} -> {}", before.provider, settings.provider),
            ingress_ep = %format!(
                "{} -> {}",
                before.records.first().cloned().unwrap_or_default(),
                settings.endpoint
            ),
            zone = %format!("{} -> {}", before.zone, settings.zone),
            "updated domain resource"
        );
    }
    Ok(())
}

/// Build the `Domain` object projected from one rule host.
///
/// # Arguments
///
/// * `ingress` - The source `Ingress` (owner and namespace anchor)
/// * `settings` - The effective provider/endpoint/zone for this `Ingress`
/// * `host` - The rule host being projected
///
/// # Returns
///
/// A `Domain` carrying the digest name, the mapping label, a controller
/// owner reference, and a spec whose `type`/`ttl` are left to provider
/// defaults.
///
/// # Errors
///
/// Fails when the host does not sit directly under the effective zone, or
/// when the `Ingress` cannot anchor an owner reference yet.
fn new_projected_domain(
    ingress: &Ingress,
    settings: &EffectiveSettings,
    host: &str,
) -> Result<Domain> {
    let ingress_name = ingress.name_any();

    let label = host_label(host, &settings.zone)
        .ok_or_else(|| anyhow!("host {host} does not end with zone {}", settings.zone))?;

    let owner_ref = ingress
        .controller_owner_ref(&())
        .ok_or_else(|| anyhow!("ingress {ingress_name} has no name or uid for owner reference"))?;

    let mut domain = Domain::new(
        &projected_domain_name(&ingress_name, host),
        DomainSpec {
            provider: settings.provider.clone(),
            r#type: String::new(),
            name: label.to_string(),
            zone: settings.zone.clone(),
            records: vec![settings.endpoint.clone()],
            ttl: 0,
        },
    );
    domain.metadata.namespace = ingress.namespace();
    domain.metadata.labels = Some(BTreeMap::from([(
        LABEL_MAPPED_INGRESS.to_string(),
        ingress_name,
    )]));
    domain.metadata.owner_references = Some(vec![owner_ref]);
    Ok(domain)
}

/// Resolve the effective projection settings for one `Ingress`.
///
/// # Arguments
///
/// * `annotations` - The `Ingress` annotations
/// * `defaults` - Operator-wide fallbacks
///
/// # Returns
///
/// Settings with annotations overriding defaults field by field.
fn effective_settings(
    annotations: &BTreeMap<String, String>,
    defaults: &ProjectorDefaults,
) -> EffectiveSettings {
    EffectiveSettings {
        provider: annotations
            .get(ANNOTATION_SERVICE_PROVIDER)
            .cloned()
            .unwrap_or_else(|| defaults.provider.clone()),
        endpoint: annotations
            .get(ANNOTATION_INGRESS_ENDPOINT)
            .cloned()
            .unwrap_or_else(|| defaults.ingress_endpoint.clone()),
        zone: annotations
            .get(ANNOTATION_ZONE)
            .cloned()
            .unwrap_or_else(|| defaults.zone.clone()),
    }
}

/// Rule hosts of an `Ingress`, deduplicated, in rule order.
fn rule_hosts(ingress: &Ingress) -> Vec<String> {
    let mut seen = HashSet::new();
    ingress
        .spec
        .as_ref()
        .and_then(|s| s.rules.as_ref())
        .map(|rules| {
            rules
                .iter()
                .filter_map(|r| r.host.clone())
                .filter(|h| seen.insert(h.clone()))
                .collect()
        })
        .unwrap_or_default()
}

/// Canonical host key of an observed `Domain`: `"<spec.name>.<spec.zone>"`.
fn domain_host_key(domain: &Domain) -> String {
    format!("{}.{}", domain.spec.name, domain.spec.zone)
}

#[cfg(test)]
#[path = "ingress_tests.rs"]
mod ingress_tests;
