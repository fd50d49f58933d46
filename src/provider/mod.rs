// Copyright (c) 2025 sokdak, dns-ingress
// SPDX-License-Identifier: MIT

//! DNS provider abstraction and registry.
//!
//! A [`ProviderClient`] wraps one external DNS provider's API behind the small
//! capability set the Domain reconciler needs: zone lookup, record get by id
//! or name, create, update, delete. Implementations are discovered at startup
//! into a name-keyed [`ProviderRegistry`]; a `Domain` selects its provider by
//! registry key in `spec.provider`.
//!
//! Contract notes the reconciler relies on:
//!
//! - "not found" is an `Ok(None)`, never an error, on all read paths;
//! - `delete` of a record that no longer exists succeeds;
//! - `get_by_name` matches exactly on the fully qualified record name the
//!   provider uses; among multiple results the first exact match wins.

pub mod cloudflare;

#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::constants::PROVIDER_KEY_CLOUDFLARE;
use crate::environment::Environment;

/// Provider-side DNS zone.
#[derive(Clone, Debug, PartialEq)]
pub struct Zone {
    /// Provider-assigned zone identifier.
    pub id: String,
    /// Zone apex name.
    pub name: String,
    /// Whether the zone is serving.
    pub activated: bool,
}

/// Provider-side DNS record set.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    /// Provider-assigned record identifier.
    pub id: String,
    /// Record name relative to the zone.
    pub name: String,
    /// Record type (e.g. `A`, `CNAME`).
    pub r#type: String,
    /// Record values.
    pub records: Vec<String>,
    /// Record TTL in seconds.
    pub ttl: i64,
    /// Identifier of the zone the record lives in.
    pub zone_id: String,
    /// Name of the zone the record lives in.
    pub zone_name: String,
    /// Fully qualified record name with trailing dot.
    pub fqdn: String,
    /// Whether the record is live at the provider.
    pub activated: bool,
}

/// Errors surfaced by provider implementations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The HTTP request itself failed (connection, timeout, TLS).
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider API rejected the request.
    #[error("provider API returned {status}: {message}")]
    Api {
        /// HTTP status code of the response.
        status: u16,
        /// Error detail from the response body.
        message: String,
    },

    /// The provider responded with a body the client could not interpret.
    #[error("provider returned malformed response: {0}")]
    InvalidResponse(String),
}

/// Capability set every DNS provider implementation exposes.
///
/// All operations are cancel-safe: dropping the future aborts the underlying
/// request.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Look up a zone by its apex name.
    ///
    /// # Arguments
    ///
    /// * `zone_name` - The zone apex to resolve (e.g., "example.com")
    ///
    /// # Returns
    ///
    /// * `Ok(Some(zone))` - A zone with exactly this name exists
    /// * `Ok(None)` - The provider has no exactly matching zone
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] when the provider API call fails.
    async fn get_zone(&self, zone_name: &str) -> Result<Option<Zone>, ProviderError>;

    /// Look up a record by relative name within a zone.
    ///
    /// Matching is exact on the fully qualified record name the provider
    /// uses; among multiple results the first exact match wins.
    ///
    /// # Arguments
    ///
    /// * `name` - The record name relative to the zone (e.g., "app")
    /// * `zone_id` - The provider-assigned zone identifier
    ///
    /// # Returns
    ///
    /// * `Ok(Some(record))` - A record with exactly this name exists
    /// * `Ok(None)` - No record in the zone matches the name exactly
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] when the provider API call fails.
    async fn get_by_name(&self, name: &str, zone_id: &str)
        -> Result<Option<Record>, ProviderError>;

    /// Look up a record by provider id.
    ///
    /// # Arguments
    ///
    /// * `id` - The provider-assigned record identifier
    /// * `zone_id` - The provider-assigned zone identifier
    ///
    /// # Returns
    ///
    /// * `Ok(Some(record))` - The record still exists
    /// * `Ok(None)` - The id is gone; deletion paths treat this as done
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] when the provider API call fails.
    async fn get(&self, id: &str, zone_id: &str) -> Result<Option<Record>, ProviderError>;

    /// Create a record.
    ///
    /// # Arguments
    ///
    /// * `name` - The record name relative to the zone
    /// * `zone_id` - The provider-assigned zone identifier
    /// * `record_type` - The record type; empty means the provider default
    /// * `records` - The record values; the first element is the payload for
    ///   single-value providers
    /// * `ttl` - The record TTL in seconds; zero means the provider default
    ///
    /// # Returns
    ///
    /// The record as the provider reports it after creation.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] when the provider API call fails.
    async fn create(
        &self,
        name: &str,
        zone_id: &str,
        record_type: &str,
        records: &[String],
        ttl: i64,
    ) -> Result<Record, ProviderError>;

    /// Update a record in place.
    ///
    /// # Arguments
    ///
    /// * `id` - The provider-assigned record identifier
    /// * `zone_id` - The provider-assigned zone identifier
    /// * `record_type` - The record type; empty means the provider default
    /// * `records` - The record values to write
    /// * `ttl` - The record TTL in seconds; zero means the provider default
    ///
    /// # Returns
    ///
    /// * `Ok(Some(record))` - The record as the provider reports it after
    ///   the update
    /// * `Ok(None)` - Integrity failure: the provider accepted the request
    ///   but returned no record, so the caller must re-adopt from scratch
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] when the provider API call fails.
    async fn update(
        &self,
        id: &str,
        zone_id: &str,
        record_type: &str,
        records: &[String],
        ttl: i64,
    ) -> Result<Option<Record>, ProviderError>;

    /// Delete a record.
    ///
    /// Deleting a record that no longer exists succeeds; the reconciler
    /// treats not-found on delete as done.
    ///
    /// # Arguments
    ///
    /// * `id` - The provider-assigned record identifier
    /// * `zone_id` - The provider-assigned zone identifier
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] when the provider API call fails for any
    /// reason other than the record already being gone.
    async fn delete(&self, id: &str, zone_id: &str) -> Result<(), ProviderError>;
}

/// Read-mostly mapping from provider key to client, populated once at startup.
pub type ProviderRegistry = Arc<HashMap<String, Arc<dyn ProviderClient>>>;

/// Build the provider registry from environment configuration.
///
/// Providers with incomplete credentials are skipped, not errors: a cluster
/// that only projects to one provider should not need the others configured.
/// A `Domain` naming an unregistered provider gets a terminal
/// `ProviderLoaded=False` condition instead.
///
/// # Arguments
///
/// * `env` - The environment configuration loaded at startup
///
/// # Returns
///
/// The registry, keyed by provider name (e.g., "cloudflare").
///
/// # Errors
///
/// Returns an error when a configured provider's client cannot be constructed.
///
/// # Example
///
/// ```rust,no_run
/// use dns_ingress::environment::Environment;
/// use dns_ingress::provider::build_registry;
///
/// # fn example() -> anyhow::Result<()> {
/// let env = Environment::load();
/// let registry = build_registry(&env)?;
/// if let Some(provider) = registry.get("cloudflare") {
///     // hand the provider to the Domain reconciler
/// }
/// # Ok(())
/// # }
/// ```
pub fn build_registry(env: &Environment) -> anyhow::Result<ProviderRegistry> {
    let mut registry: HashMap<String, Arc<dyn ProviderClient>> = HashMap::new();

    if let (Some(key), Some(email)) = (&env.cloudflare_auth_key, &env.cloudflare_auth_email) {
        let client = cloudflare::CloudflareClient::new(
            key,
            email,
            cloudflare::ClientTuning {
                debug: env.cloudflare_client_debug_mode,
                rate_limit: env.cloudflare_client_rate_limit,
                retry_min_delay_secs: env.cloudflare_client_retry_min_delay,
                retry_max_delay_secs: env.cloudflare_client_retry_max_delay,
                retry_max_count: env.cloudflare_client_retry_max_count,
            },
        )?;
        registry.insert(PROVIDER_KEY_CLOUDFLARE.to_string(), Arc::new(client));
        info!(provider = PROVIDER_KEY_CLOUDFLARE, "registered DNS provider");
    }

    if registry.is_empty() {
        info!("no DNS providers configured; Domain reconciliation will mark ProviderNotFound");
    }

    Ok(registry.into())
}
