// Copyright (c) 2025 sokdak, dns-ingress
// SPDX-License-Identifier: MIT

//! Cloudflare implementation of the provider capability set.
//!
//! Speaks the Cloudflare v4 REST API directly over `reqwest`, authenticating
//! with the legacy API-key headers (`X-Auth-Key` / `X-Auth-Email`). Record
//! lookups always send the API's `name=` filter with a bounded page size so
//! matching never depends on unpaginated listings.
//!
//! Cloudflare reports record names fully qualified; this client converts them
//! to zone-relative names on the way out so the reconciler compares like with
//! like, and exposes the qualified form via [`Record::fqdn`] with a trailing
//! dot.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{ProviderClient, ProviderError, Record, Zone};
use crate::constants::{PROVIDER_LIST_PAGE_SIZE, PROVIDER_RECORD_COMMENT};
use crate::metrics;

/// Cloudflare v4 API endpoint.
const API_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Request timeout for a single provider call.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// TTL sent when the spec leaves it at zero; 1 means "automatic" to Cloudflare.
const WIRE_TTL_AUTO: i64 = 1;

/// Record type sent when the spec leaves it empty.
const WIRE_TYPE_DEFAULT: &str = "A";

/// HTTP-level tuning knobs, loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct ClientTuning {
    /// Log every request and response body at debug level.
    pub debug: bool,
    /// Maximum requests per second; zero disables throttling.
    pub rate_limit: f64,
    /// Minimum delay between retries, in seconds.
    pub retry_min_delay_secs: u64,
    /// Maximum delay between retries, in seconds.
    pub retry_max_delay_secs: u64,
    /// Maximum number of retries on 429/5xx/transport failures.
    pub retry_max_count: u32,
}

/// Cloudflare API client.
pub struct CloudflareClient {
    http: reqwest::Client,
    base_url: String,
    tuning: ClientTuning,
    /// Instant of the last dispatched request, for rate limiting.
    last_request: Mutex<Option<Instant>>,
    /// Zone id to zone name, resolved lazily for FQDN construction.
    zone_names: Mutex<HashMap<String, String>>,
}

impl CloudflareClient {
    /// Build a client from API-key credentials and tuning.
    ///
    /// # Arguments
    ///
    /// * `auth_key` - The Cloudflare API key (`X-Auth-Key`)
    /// * `auth_email` - The Cloudflare account email (`X-Auth-Email`)
    /// * `tuning` - HTTP-level knobs loaded from the environment
    ///
    /// # Returns
    ///
    /// A ready client; no request is made until the first operation.
    ///
    /// # Errors
    ///
    /// Returns an error when the credentials contain bytes that cannot form
    /// HTTP header values, or the HTTP client cannot be constructed.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use dns_ingress::provider::cloudflare::{ClientTuning, CloudflareClient};
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let client = CloudflareClient::new(
    ///     "api-key",
    ///     "admin@example.com",
    ///     ClientTuning {
    ///         debug: false,
    ///         rate_limit: 4.0,
    ///         retry_min_delay_secs: 1,
    ///         retry_max_delay_secs: 3,
    ///         retry_max_count: 30,
    ///     },
    /// )?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(auth_key: &str, auth_email: &str, tuning: ClientTuning) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("X-Auth-Key", HeaderValue::from_str(auth_key)?);
        headers.insert("X-Auth-Email", HeaderValue::from_str(auth_email)?);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base_url: API_BASE_URL.to_string(),
            tuning,
            last_request: Mutex::new(None),
            zone_names: Mutex::new(HashMap::new()),
        })
    }

    /// Delay until the configured request rate allows another dispatch.
    async fn throttle(&self) {
        if self.tuning.rate_limit <= 0.0 {
            return;
        }
        let min_gap = Duration::from_secs_f64(1.0 / self.tuning.rate_limit);
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < min_gap {
                tokio::time::sleep(min_gap - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Send one API request, retrying 429/5xx and transport failures with
    /// exponential delay between the configured min and max.
    ///
    /// # Arguments
    ///
    /// * `method` - The HTTP method
    /// * `path` - The API path, appended to the base URL
    /// * `query` - Query parameters; empty slice sends none
    /// * `body` - Optional JSON request body
    ///
    /// # Returns
    ///
    /// The final response's status code and body text, after retries.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Transport`] when the request keeps failing at
    /// the connection level after the retry budget is spent.
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<(u16, String), ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt: u32 = 0;
        let mut delay = Duration::from_secs(self.tuning.retry_min_delay_secs.max(1));
        let max_delay = Duration::from_secs(
            self.tuning
                .retry_max_delay_secs
                .max(self.tuning.retry_min_delay_secs.max(1)),
        );

        loop {
            self.throttle().await;

            let mut request = self.http.request(method.clone(), &url);
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(json) = &body {
                request = request.json(json);
            }

            if self.tuning.debug {
                debug!(method = %method, url = %url, body = ?body, "cloudflare request");
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    let text = response.text().await?;

                    if self.tuning.debug {
                        debug!(status = status.as_u16(), body = %text, "cloudflare response");
                    }

                    let retryable = status.as_u16() == 429 || status.is_server_error();
                    if retryable && attempt < self.tuning.retry_max_count {
                        attempt += 1;
                        warn!(
                            url = %url,
                            status = status.as_u16(),
                            attempt,
                            retry_after = ?delay,
                            "retryable cloudflare API status"
                        );
                        tokio::time::sleep(delay).await;
                        delay = (delay * 2).min(max_delay);
                        continue;
                    }

                    return Ok((status.as_u16(), text));
                }
                Err(e) => {
                    if attempt < self.tuning.retry_max_count {
                        attempt += 1;
                        warn!(
                            url = %url,
                            error = %e,
                            attempt,
                            retry_after = ?delay,
                            "cloudflare request failed, will retry"
                        );
                        tokio::time::sleep(delay).await;
                        delay = (delay * 2).min(max_delay);
                        continue;
                    }
                    return Err(ProviderError::Transport(e));
                }
            }
        }
    }

    /// Resolve a zone id to its apex name, caching the answer.
    ///
    /// # Arguments
    ///
    /// * `zone_id` - The provider-assigned zone identifier
    ///
    /// # Returns
    ///
    /// The zone's apex name, used to build FQDN name filters.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] when the zone detail request fails or the
    /// response carries no zone.
    async fn zone_name(&self, zone_id: &str) -> Result<String, ProviderError> {
        {
            let cache = self.zone_names.lock().await;
            if let Some(name) = cache.get(zone_id) {
                return Ok(name.clone());
            }
        }

        let (status, body) = self
            .send(Method::GET, &format!("/zones/{zone_id}"), &[], None)
            .await?;
        let envelope: Envelope<ZonePayload> = parse_envelope(status, &body)?;
        let zone = envelope
            .result
            .ok_or_else(|| ProviderError::InvalidResponse("zone detail has no result".into()))?;

        let mut cache = self.zone_names.lock().await;
        cache.insert(zone_id.to_string(), zone.name.clone());
        Ok(zone.name)
    }
}

#[async_trait]
impl ProviderClient for CloudflareClient {
    async fn get_zone(&self, zone_name: &str) -> Result<Option<Zone>, ProviderError> {
        let result = async {
            // the name filter narrows the listing to exact and near matches
            let (status, body) = self
                .send(
                    Method::GET,
                    "/zones",
                    &[("name", zone_name.to_string())],
                    None,
                )
                .await?;
            let envelope: Envelope<Vec<ZonePayload>> = parse_envelope(status, &body)?;
            let zones = envelope.result.unwrap_or_default();

            let Some(zone) = find_exact_zone(&zones, zone_name) else {
                return Ok(None);
            };

            let mut cache = self.zone_names.lock().await;
            cache.insert(zone.id.clone(), zone.name.clone());

            Ok(Some(Zone {
                id: zone.id.clone(),
                name: zone.name.clone(),
                activated: !zone.paused,
            }))
        }
        .await;
        metrics::record_provider_api_call("GetZone", result.is_ok());
        result
    }

    async fn get_by_name(
        &self,
        name: &str,
        zone_id: &str,
    ) -> Result<Option<Record>, ProviderError> {
        let result = async {
            let zone_name = self.zone_name(zone_id).await?;
            let fqdn = qualified_name(name, &zone_name);

            let (status, body) = self
                .send(
                    Method::GET,
                    &format!("/zones/{zone_id}/dns_records"),
                    &[
                        ("name", fqdn.clone()),
                        ("per_page", PROVIDER_LIST_PAGE_SIZE.to_string()),
                    ],
                    None,
                )
                .await?;
            let envelope: Envelope<Vec<RecordPayload>> = parse_envelope(status, &body)?;
            let records = envelope.result.unwrap_or_default();

            Ok(find_exact_record(&records, &fqdn).map(|r| map_record(r, &zone_name)))
        }
        .await;
        metrics::record_provider_api_call("GetByName", result.is_ok());
        result
    }

    async fn get(&self, id: &str, zone_id: &str) -> Result<Option<Record>, ProviderError> {
        let result = async {
            let (status, body) = self
                .send(
                    Method::GET,
                    &format!("/zones/{zone_id}/dns_records/{id}"),
                    &[],
                    None,
                )
                .await?;
            if status == 404 {
                return Ok(None);
            }
            let envelope: Envelope<RecordPayload> = parse_envelope(status, &body)?;
            Ok(envelope.result.map(|r| {
                let zone_name = r.zone_name.clone();
                map_record(&r, &zone_name)
            }))
        }
        .await;
        metrics::record_provider_api_call("Get", result.is_ok());
        result
    }

    async fn create(
        &self,
        name: &str,
        zone_id: &str,
        record_type: &str,
        records: &[String],
        ttl: i64,
    ) -> Result<Record, ProviderError> {
        let result = async {
            let content = records.first().cloned().unwrap_or_default();
            let body = serde_json::json!({
                "type": wire_type(record_type),
                "name": name,
                "content": content,
                "ttl": wire_ttl(ttl),
                "proxied": false,
                "locked": true,
                "comment": PROVIDER_RECORD_COMMENT,
            });

            let (status, text) = self
                .send(
                    Method::POST,
                    &format!("/zones/{zone_id}/dns_records"),
                    &[],
                    Some(body),
                )
                .await?;
            let envelope: Envelope<RecordPayload> = parse_envelope(status, &text)?;
            let payload = envelope
                .result
                .ok_or_else(|| ProviderError::InvalidResponse("create returned no record".into()))?;
            let zone_name = payload.zone_name.clone();
            Ok(map_record(&payload, &zone_name))
        }
        .await;
        metrics::record_provider_api_call("Create", result.is_ok());
        result
    }

    async fn update(
        &self,
        id: &str,
        zone_id: &str,
        record_type: &str,
        records: &[String],
        ttl: i64,
    ) -> Result<Option<Record>, ProviderError> {
        let result = async {
            let content = records.first().cloned().unwrap_or_default();
            let body = serde_json::json!({
                "type": wire_type(record_type),
                "content": content,
                "ttl": wire_ttl(ttl),
                "proxied": false,
            });

            let (status, text) = self
                .send(
                    Method::PATCH,
                    &format!("/zones/{zone_id}/dns_records/{id}"),
                    &[],
                    Some(body),
                )
                .await?;
            let envelope: Envelope<RecordPayload> = parse_envelope(status, &text)?;
            Ok(envelope.result.map(|r| {
                let zone_name = r.zone_name.clone();
                map_record(&r, &zone_name)
            }))
        }
        .await;
        metrics::record_provider_api_call("Update", result.is_ok());
        result
    }

    async fn delete(&self, id: &str, zone_id: &str) -> Result<(), ProviderError> {
        let result = async {
            let (status, body) = self
                .send(
                    Method::DELETE,
                    &format!("/zones/{zone_id}/dns_records/{id}"),
                    &[],
                    None,
                )
                .await?;
            // a record that is already gone counts as deleted
            if status == 404 {
                return Ok(());
            }
            let _: Envelope<serde_json::Value> = parse_envelope(status, &body)?;
            Ok(())
        }
        .await;
        metrics::record_provider_api_call("Delete", result.is_ok());
        result
    }
}

// ============================================================================
// Wire Payloads
// ============================================================================

/// Cloudflare v4 response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

/// One entry of the envelope's `errors` array.
#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// Zone as the API reports it.
#[derive(Debug, Deserialize)]
struct ZonePayload {
    id: String,
    name: String,
    #[serde(default)]
    paused: bool,
}

/// DNS record as the API reports it; `name` is fully qualified.
#[derive(Debug, Deserialize)]
struct RecordPayload {
    id: String,
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    ttl: i64,
    #[serde(default)]
    zone_id: String,
    #[serde(default)]
    zone_name: String,
}

// ============================================================================
// Mapping Helpers
// ============================================================================

/// Decode a response body through the v4 envelope.
///
/// # Arguments
///
/// * `status` - The HTTP status code of the response
/// * `body` - The raw response body text
///
/// # Returns
///
/// The decoded envelope on 2xx statuses.
///
/// # Errors
///
/// Non-2xx statuses map to [`ProviderError::Api`] carrying the first API
/// error message when one is present; unparseable 2xx bodies map to
/// [`ProviderError::InvalidResponse`].
fn parse_envelope<T: serde::de::DeserializeOwned>(
    status: u16,
    body: &str,
) -> Result<Envelope<T>, ProviderError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<Envelope<serde_json::Value>>(body)
            .ok()
            .and_then(|e| {
                e.errors
                    .first()
                    .map(|m| format!("{} (code {})", m.message, m.code))
            })
            .unwrap_or_else(|| body.trim().to_string());
        return Err(ProviderError::Api { status, message });
    }
    serde_json::from_str(body).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
}

/// Exact-name zone match; the API's `name=` filter can return near matches.
fn find_exact_zone<'a>(zones: &'a [ZonePayload], name: &str) -> Option<&'a ZonePayload> {
    zones.iter().find(|z| z.name == name)
}

/// Exact-FQDN record match; first exact match wins.
fn find_exact_record<'a>(records: &'a [RecordPayload], fqdn: &str) -> Option<&'a RecordPayload> {
    records.iter().find(|r| r.name == fqdn)
}

/// Fully qualified record name for a relative name within a zone.
fn qualified_name(name: &str, zone_name: &str) -> String {
    if name.is_empty() {
        zone_name.to_string()
    } else {
        format!("{name}.{zone_name}")
    }
}

/// Record name relative to its zone.
fn relative_name(fqdn: &str, zone_name: &str) -> String {
    if zone_name.is_empty() {
        return fqdn.to_string();
    }
    fqdn.strip_suffix(&format!(".{zone_name}"))
        .unwrap_or(fqdn)
        .to_string()
}

/// TTL value placed on the wire; zero becomes Cloudflare's "automatic".
fn wire_ttl(ttl: i64) -> i64 {
    if ttl <= 0 {
        WIRE_TTL_AUTO
    } else {
        ttl
    }
}

/// Record type placed on the wire; empty becomes the default type.
fn wire_type(record_type: &str) -> &str {
    if record_type.is_empty() {
        WIRE_TYPE_DEFAULT
    } else {
        record_type
    }
}

/// Convert a wire payload into the provider-neutral record value.
///
/// # Arguments
///
/// * `payload` - The record as the API reports it (FQDN name)
/// * `zone_name` - Fallback zone name when the payload omits one
///
/// # Returns
///
/// A [`Record`] with a zone-relative `name`, a single-element value list
/// holding the content, and a trailing-dot `fqdn`.
fn map_record(payload: &RecordPayload, zone_name: &str) -> Record {
    let zone = if payload.zone_name.is_empty() {
        zone_name
    } else {
        &payload.zone_name
    };
    Record {
        id: payload.id.clone(),
        name: relative_name(&payload.name, zone),
        r#type: payload.record_type.clone(),
        records: vec![payload.content.clone()],
        ttl: payload.ttl,
        zone_id: payload.zone_id.clone(),
        zone_name: zone.to_string(),
        fqdn: format!("{}.", payload.name),
        activated: true,
    }
}

#[cfg(test)]
#[path = "cloudflare_tests.rs"]
mod cloudflare_tests;
