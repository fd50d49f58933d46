// Copyright (c) 2025 sokdak, dns-ingress
// SPDX-License-Identifier: MIT

use anyhow::Result;
use axum::{routing::get, Router};
use dns_ingress::{
    backoff::BackoffStore,
    constants::{
        DEFAULT_LEASE_DURATION_SECS, DEFAULT_LEASE_NAMESPACE, DEFAULT_LEASE_RETRY_PERIOD_SECS,
        ERROR_REQUEUE_DURATION_SECS, KIND_DOMAIN, KIND_INGRESS, METRICS_SERVER_BIND_ADDRESS,
        METRICS_SERVER_PATH, METRICS_SERVER_PORT, PHASE_BACKOFF_INITIAL_SECS,
        PHASE_BACKOFF_MAX_SECS, TOKIO_WORKER_THREADS,
    },
    crd::Domain,
    environment::Environment,
    metrics,
    provider::{build_registry, ProviderRegistry},
    reconcilers::{
        domain, ingress, ingress::ProjectorDefaults, reconcile_domain, reconcile_ingress, Outcome,
    },
};
use futures::StreamExt;
use k8s_openapi::api::networking::v1::Ingress;
use kube::{
    runtime::{controller::Action, watcher::Config, Controller},
    Api, Client, ResourceExt,
};
use kube_lease_manager::{LeaseManager, LeaseManagerBuilder};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct ReconcileError(#[from] anyhow::Error);

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("dns-ingress-controller")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

/// Initialize logging with custom format
///
/// Respects `RUST_LOG` environment variable if set, otherwise defaults to INFO level.
/// Respects `RUST_LOG_FORMAT` environment variable for output format (json or text).
fn initialize_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    info!("Starting dns-ingress operator");
}

/// Start the Prometheus metrics HTTP server
///
/// Serves metrics on the configured port and path (default: 0.0.0.0:8080/metrics)
///
/// # Returns
///
/// A `JoinHandle` that can be used to monitor the server task
fn start_metrics_server() -> tokio::task::JoinHandle<()> {
    info!(
        bind_address = METRICS_SERVER_BIND_ADDRESS,
        port = METRICS_SERVER_PORT,
        path = METRICS_SERVER_PATH,
        "Starting Prometheus metrics HTTP server"
    );

    tokio::spawn(async move {
        async fn metrics_handler() -> String {
            match metrics::gather_metrics() {
                Ok(metrics_text) => metrics_text,
                Err(e) => {
                    error!("Failed to gather metrics: {}", e);
                    String::from("# Error gathering metrics\n")
                }
            }
        }

        let app = Router::new().route(METRICS_SERVER_PATH, get(metrics_handler));

        let bind_addr = format!("{METRICS_SERVER_BIND_ADDRESS}:{METRICS_SERVER_PORT}");
        let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to bind metrics server to {bind_addr}: {e}");
                return;
            }
        };

        info!("Metrics server listening on http://{bind_addr}{METRICS_SERVER_PATH}");

        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {e}");
        }
    })
}

/// Leader election configuration
struct LeaderElectionConfig {
    enabled: bool,
    lease_name: String,
    lease_namespace: String,
    identity: String,
    lease_duration: u64,
    retry_period: u64,
}

/// Load leader election configuration from environment variables
fn load_leader_election_config() -> LeaderElectionConfig {
    let enabled = std::env::var("DNS_INGRESS_ENABLE_LEADER_ELECTION")
        .unwrap_or_else(|_| "true".to_string())
        .parse::<bool>()
        .unwrap_or(true);

    let lease_name = std::env::var("DNS_INGRESS_LEASE_NAME")
        .unwrap_or_else(|_| "dns-ingress-leader".to_string());

    let lease_namespace = std::env::var("DNS_INGRESS_LEASE_NAMESPACE")
        .or_else(|_| std::env::var("POD_NAMESPACE"))
        .unwrap_or_else(|_| DEFAULT_LEASE_NAMESPACE.to_string());

    let lease_duration = std::env::var("DNS_INGRESS_LEASE_DURATION_SECONDS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_LEASE_DURATION_SECS);

    let retry_period = std::env::var("DNS_INGRESS_LEASE_RETRY_PERIOD_SECONDS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_LEASE_RETRY_PERIOD_SECS);

    let identity = std::env::var("POD_NAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .unwrap_or_else(|_| format!("dns-ingress-{}", rand::random::<u32>()));

    LeaderElectionConfig {
        enabled,
        lease_name,
        lease_namespace,
        identity,
        lease_duration,
        retry_period,
    }
}

/// Create a default watcher configuration.
///
/// The Domain controller advances its state machine on status updates, so it
/// watches all changes rather than spec-semantic ones only.
#[inline]
fn default_watcher_config() -> Config {
    Config::default()
}

async fn async_main() -> Result<()> {
    initialize_logging();

    let environment = Environment::load();
    let defaults = ProjectorDefaults {
        provider: environment.default_dns_provider.clone(),
        ingress_endpoint: environment.default_ingress_endpoint.clone(),
        zone: environment.default_domain_zone.clone(),
    };

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;

    let registry = build_registry(&environment)?;

    // Start the metrics HTTP server
    let _metrics_handle = start_metrics_server();

    let config = load_leader_election_config();

    if config.enabled {
        info!(
            lease_name = %config.lease_name,
            lease_namespace = %config.lease_namespace,
            identity = %config.identity,
            lease_duration_secs = config.lease_duration,
            "Leader election enabled"
        );

        info!("Starting leader election, waiting to acquire leadership...");

        let lease_manager = LeaseManagerBuilder::new(client.clone(), &config.lease_name)
            .with_namespace(&config.lease_namespace)
            .with_identity(&config.identity)
            .with_duration(config.lease_duration)
            .with_grace(config.retry_period)
            .build()
            .await?;

        let (leader_rx, lease_handle) = lease_manager.watch().await;

        // Wait until we become leader
        let mut rx = leader_rx.clone();
        while !*rx.borrow_and_update() {
            rx.changed().await?;
        }

        info!("Leadership acquired, starting controllers");

        run_controllers_with_leader_election(client, registry, defaults, leader_rx, lease_handle)
            .await?;
    } else {
        run_controllers_without_leader_election(client, registry, defaults).await?;
    }

    Ok(())
}

/// Monitor leadership status - returns when leadership is lost or an error occurs
async fn monitor_leadership(
    mut leader_rx: tokio::sync::watch::Receiver<bool>,
) -> Result<(), anyhow::Error> {
    loop {
        leader_rx.changed().await?;
        if !*leader_rx.borrow() {
            // Leadership lost
            return Ok(());
        }
    }
}

/// Wait for SIGTERM (Kubernetes sends this when deleting pods)
async fn wait_for_sigterm() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        sigterm.recv().await;
        Ok(())
    }
    #[cfg(not(unix))]
    {
        // On non-Unix platforms, just wait forever
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Run both controllers; neither should ever exit on its own
async fn run_all_controllers(
    client: Client,
    registry: ProviderRegistry,
    defaults: ProjectorDefaults,
) -> Result<()> {
    tokio::select! {
        result = run_domain_controller(client.clone(), registry) => {
            error!("CRITICAL: Domain controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Domain controller exited unexpectedly without error")
        }
        result = run_ingress_controller(client.clone(), defaults) => {
            error!("CRITICAL: Ingress controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Ingress controller exited unexpectedly without error")
        }
    }
}

/// Run controllers without leader election, with signal handling
async fn run_controllers_without_leader_election(
    client: Client,
    registry: ProviderRegistry,
    defaults: ProjectorDefaults,
) -> Result<()> {
    warn!("Leader election DISABLED - running without high availability");
    info!("Starting all controllers with signal handling");

    let shutdown_result: Result<()> = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
            result.map_err(anyhow::Error::from)
        }
        result = wait_for_sigterm() => {
            info!("Received SIGTERM (pod termination), initiating graceful shutdown...");
            result
        }
        result = run_all_controllers(client, registry, defaults) => {
            result
        }
    };

    shutdown_result?;
    info!("Graceful shutdown completed successfully");
    Ok(())
}

/// Run controllers with leader election
///
/// If leadership is lost or SIGTERM/SIGINT is received, all controllers are
/// stopped and the process exits gracefully.
async fn run_controllers_with_leader_election(
    client: Client,
    registry: ProviderRegistry,
    defaults: ProjectorDefaults,
    leader_rx: tokio::sync::watch::Receiver<bool>,
    _lease_handle: tokio::task::JoinHandle<
        Result<LeaseManager, kube_lease_manager::LeaseManagerError>,
    >,
) -> Result<()> {
    info!("Running controllers with leader election and signal handling");

    let shutdown_result: Result<()> = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
            result.map_err(anyhow::Error::from)
        }
        result = wait_for_sigterm() => {
            info!("Received SIGTERM (pod termination), initiating graceful shutdown...");
            result
        }
        result = monitor_leadership(leader_rx) => {
            match result {
                Ok(()) => {
                    warn!("Leadership lost! Stopping all controllers...");
                    anyhow::bail!("Leadership lost - stepping down")
                }
                Err(e) => {
                    error!("Leadership monitor error: {:?}", e);
                    anyhow::bail!("Leadership monitoring failed: {e}")
                }
            }
        }
        result = run_all_controllers(client, registry, defaults) => {
            result
        }
    };

    shutdown_result?;
    info!("Graceful shutdown completed successfully, leader election lease released");
    Ok(())
}

/// Run the `Domain` controller
async fn run_domain_controller(client: Client, registry: ProviderRegistry) -> Result<()> {
    info!("Starting Domain controller");

    let api = Api::<Domain>::all(client.clone());
    let context = Arc::new(domain::Context {
        client,
        registry,
        backoff: BackoffStore::new(
            Duration::from_secs(PHASE_BACKOFF_INITIAL_SECS),
            Duration::from_secs(PHASE_BACKOFF_MAX_SECS),
        ),
    });

    // The state machine advances on its own status writes, so the watcher
    // must deliver status updates too.
    Controller::new(api, default_watcher_config())
        .run(reconcile_domain_wrapper, error_policy_domain, context)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Run the `Ingress` controller
async fn run_ingress_controller(client: Client, defaults: ProjectorDefaults) -> Result<()> {
    info!("Starting Ingress controller");

    let api = Api::<Ingress>::all(client.clone());
    let domain_api = Api::<Domain>::all(client.clone());
    let context = Arc::new(ingress::Context { client, defaults });

    Controller::new(api, default_watcher_config())
        .owns(domain_api, default_watcher_config())
        .run(reconcile_ingress_wrapper, error_policy_ingress, context)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Reconcile wrapper for `Domain`
async fn reconcile_domain_wrapper(
    object: Arc<Domain>,
    ctx: Arc<domain::Context>,
) -> Result<Action, ReconcileError> {
    let start = std::time::Instant::now();
    let namespace = object.namespace().unwrap_or_default();
    let name = object.name_any();

    let result = reconcile_domain(&ctx, &namespace, &name).await;
    let duration = start.elapsed();

    match result {
        Ok(outcome) => {
            debug!(namespace = %namespace, name = %name, outcome = ?outcome, "reconciled Domain");
            metrics::record_reconciliation_success(KIND_DOMAIN, duration);
            Ok(match outcome {
                Outcome::Done => Action::await_change(),
                Outcome::Requeue => Action::requeue(Duration::ZERO),
                Outcome::RequeueAfter(delay) => Action::requeue(delay),
            })
        }
        Err(e) => {
            error!(namespace = %namespace, name = %name, "Failed to reconcile Domain: {e:#}");
            metrics::record_reconciliation_error(KIND_DOMAIN, duration);
            metrics::record_error(KIND_DOMAIN, "reconcile_error");
            Err(e.into())
        }
    }
}

/// Reconcile wrapper for `Ingress`
async fn reconcile_ingress_wrapper(
    object: Arc<Ingress>,
    ctx: Arc<ingress::Context>,
) -> Result<Action, ReconcileError> {
    let start = std::time::Instant::now();
    let namespace = object.namespace().unwrap_or_default();
    let name = object.name_any();

    let result = reconcile_ingress(&ctx, &namespace, &name).await;
    let duration = start.elapsed();

    match result {
        Ok(()) => {
            debug!(namespace = %namespace, name = %name, "reconciled Ingress");
            metrics::record_reconciliation_success(KIND_INGRESS, duration);
            Ok(Action::await_change())
        }
        Err(e) => {
            error!(namespace = %namespace, name = %name, "Failed to reconcile Ingress: {e:#}");
            metrics::record_reconciliation_error(KIND_INGRESS, duration);
            metrics::record_error(KIND_INGRESS, "reconcile_error");
            Err(e.into())
        }
    }
}

/// Generic error policy for all controllers.
///
/// Requeues the failed key after a fixed delay; per-phase provider backoff is
/// handled inside the reconcilers themselves.
///
/// # Arguments
///
/// * `_resource` - The resource being reconciled (unused)
/// * `_err` - The reconciliation error that occurred (unused)
/// * `_ctx` - The controller context (unused)
///
/// # Returns
///
/// An `Action` to requeue the resource after `ERROR_REQUEUE_DURATION_SECS` seconds.
fn error_policy<T, C>(_resource: Arc<T>, _err: &ReconcileError, _ctx: Arc<C>) -> Action
where
    T: std::fmt::Debug,
{
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}

/// Error policy for the `Domain` controller.
fn error_policy_domain(
    resource: Arc<Domain>,
    err: &ReconcileError,
    ctx: Arc<domain::Context>,
) -> Action {
    error_policy(resource, err, ctx)
}

/// Error policy for the `Ingress` controller.
fn error_policy_ingress(
    resource: Arc<Ingress>,
    err: &ReconcileError,
    ctx: Arc<ingress::Context>,
) -> Action {
    error_policy(resource, err, ctx)
}

// Tests are in main_tests.rs
#[cfg(test)]
mod main_tests;
