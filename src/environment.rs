// Copyright (c) 2025 sokdak, dns-ingress
// SPDX-License-Identifier: MIT

//! Environment-derived operator configuration.
//!
//! All process configuration is read once at startup into an immutable
//! [`Environment`] value which is then injected where needed; no module reads
//! `std::env` after bootstrap.
//!
//! # Variables
//!
//! | Variable | Default | Purpose |
//! |----------|---------|---------|
//! | `CLOUDFLARE_AUTH_KEY` | unset | Cloudflare API key |
//! | `CLOUDFLARE_AUTH_EMAIL` | unset | Cloudflare account email |
//! | `CLOUDFLARE_CLIENT_DEBUG_MODE` | `false` | Log provider requests/responses |
//! | `CLOUDFLARE_CLIENT_RATE_LIMIT` | `4.0` | Max provider requests per second |
//! | `CLOUDFLARE_CLIENT_RETRY_MAX_DELAY` | `3` | Max provider retry delay (seconds) |
//! | `CLOUDFLARE_CLIENT_RETRY_MIN_DELAY` | `1` | Min provider retry delay (seconds) |
//! | `CLOUDFLARE_CLIENT_RETRY_MAX_COUNT` | `30` | Max provider retry attempts |
//! | `DNS_INGRESS_DEFAULT_PROVIDER` | empty | Projector fallback provider key |
//! | `DNS_INGRESS_DEFAULT_ENDPOINT` | empty | Projector fallback record value |
//! | `DNS_INGRESS_DEFAULT_ZONE` | empty | Projector fallback zone |

/// Immutable process configuration, built once at startup.
#[derive(Clone, Debug)]
pub struct Environment {
    /// Cloudflare API key; the Cloudflare provider is only registered when
    /// both this and the email are present.
    pub cloudflare_auth_key: Option<String>,
    /// Cloudflare account email.
    pub cloudflare_auth_email: Option<String>,
    /// Log provider requests and responses at debug level.
    pub cloudflare_client_debug_mode: bool,
    /// Maximum provider requests per second.
    pub cloudflare_client_rate_limit: f64,
    /// Maximum delay between provider retries, in seconds.
    pub cloudflare_client_retry_max_delay: u64,
    /// Minimum delay between provider retries, in seconds.
    pub cloudflare_client_retry_min_delay: u64,
    /// Maximum number of provider retry attempts.
    pub cloudflare_client_retry_max_count: u32,
    /// Provider key used when an `Ingress` carries no provider annotation.
    pub default_dns_provider: String,
    /// Record value used when an `Ingress` carries no endpoint annotation.
    pub default_ingress_endpoint: String,
    /// Zone used when an `Ingress` carries no zone annotation.
    pub default_domain_zone: String,
}

impl Environment {
    /// Read the full configuration from process environment variables.
    ///
    /// Missing variables fall back to their documented defaults; malformed
    /// values are treated as missing rather than failing startup.
    ///
    /// # Returns
    ///
    /// The complete configuration snapshot. Call once at startup and inject
    /// the result; later environment changes are not observed.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use dns_ingress::environment::Environment;
    ///
    /// let env = Environment::load();
    /// if env.cloudflare_auth_key.is_some() {
    ///     // Cloudflare provider will be registered
    /// }
    /// ```
    #[must_use]
    pub fn load() -> Self {
        Self {
            cloudflare_auth_key: string_env("CLOUDFLARE_AUTH_KEY"),
            cloudflare_auth_email: string_env("CLOUDFLARE_AUTH_EMAIL"),
            cloudflare_client_debug_mode: bool_env_or("CLOUDFLARE_CLIENT_DEBUG_MODE", false),
            cloudflare_client_rate_limit: f64_env_or("CLOUDFLARE_CLIENT_RATE_LIMIT", 4.0),
            cloudflare_client_retry_max_delay: u64_env_or("CLOUDFLARE_CLIENT_RETRY_MAX_DELAY", 3),
            cloudflare_client_retry_min_delay: u64_env_or("CLOUDFLARE_CLIENT_RETRY_MIN_DELAY", 1),
            cloudflare_client_retry_max_count: u32_env_or("CLOUDFLARE_CLIENT_RETRY_MAX_COUNT", 30),
            default_dns_provider: string_env_or("DNS_INGRESS_DEFAULT_PROVIDER", ""),
            default_ingress_endpoint: string_env_or("DNS_INGRESS_DEFAULT_ENDPOINT", ""),
            default_domain_zone: string_env_or("DNS_INGRESS_DEFAULT_ZONE", ""),
        }
    }
}

/// Read a string variable.
///
/// # Arguments
///
/// * `key` - The environment variable name
///
/// # Returns
///
/// The value, or `None` when unset or not valid UTF-8.
fn string_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Read a string variable with a default.
///
/// # Arguments
///
/// * `key` - The environment variable name
/// * `default` - Value used when the variable is unset
fn string_env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read a boolean variable with a default.
///
/// Accepts `true`/`false` in any case; anything else falls back to the
/// default.
///
/// # Arguments
///
/// * `key` - The environment variable name
/// * `default` - Value used when the variable is unset or unparseable
fn bool_env_or(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(value) => match value.to_lowercase().as_str() {
            "true" => true,
            "false" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

/// Read an unsigned integer variable with a default.
///
/// # Arguments
///
/// * `key` - The environment variable name
/// * `default` - Value used when the variable is unset or unparseable
fn u64_env_or(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

/// Read an unsigned 32-bit integer variable with a default.
///
/// # Arguments
///
/// * `key` - The environment variable name
/// * `default` - Value used when the variable is unset or unparseable
fn u32_env_or(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(default)
}

/// Read a floating-point variable with a default.
///
/// # Arguments
///
/// * `key` - The environment variable name
/// * `default` - Value used when the variable is unset or unparseable
fn f64_env_or(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "environment_tests.rs"]
mod environment_tests;
