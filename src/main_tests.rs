// Copyright (c) 2025 sokdak, dns-ingress
// SPDX-License-Identifier: MIT

//! Unit tests for `main.rs`

#[cfg(test)]
mod tests {
    use super::super::{error_policy, load_leader_election_config, ReconcileError};
    use dns_ingress::constants::{
        DEFAULT_LEASE_DURATION_SECS, DEFAULT_LEASE_NAMESPACE, DEFAULT_LEASE_RETRY_PERIOD_SECS,
        ERROR_REQUEUE_DURATION_SECS,
    };
    use kube::runtime::controller::Action;
    use std::sync::Arc;
    use std::time::Duration;

    /// Leader election is on by default with the documented lease settings
    #[test]
    fn test_leader_election_defaults() {
        std::env::remove_var("DNS_INGRESS_ENABLE_LEADER_ELECTION");
        std::env::remove_var("DNS_INGRESS_LEASE_NAME");
        std::env::remove_var("DNS_INGRESS_LEASE_DURATION_SECONDS");
        std::env::remove_var("DNS_INGRESS_LEASE_RETRY_PERIOD_SECONDS");

        let config = load_leader_election_config();

        assert!(config.enabled, "Leader election should default to enabled");
        assert_eq!(config.lease_name, "dns-ingress-leader");
        assert_eq!(config.lease_duration, DEFAULT_LEASE_DURATION_SECS);
        assert_eq!(config.retry_period, DEFAULT_LEASE_RETRY_PERIOD_SECS);
    }

    /// The enable flag parses booleans and ignores garbage
    #[test]
    fn test_leader_election_enable_flag_parsing() {
        std::env::set_var("DNS_INGRESS_ENABLE_LEADER_ELECTION", "false");
        assert!(
            !load_leader_election_config().enabled,
            "Explicit false should disable leader election"
        );

        std::env::set_var("DNS_INGRESS_ENABLE_LEADER_ELECTION", "not-a-bool");
        assert!(
            load_leader_election_config().enabled,
            "Unparseable values should fall back to enabled"
        );

        std::env::remove_var("DNS_INGRESS_ENABLE_LEADER_ELECTION");
    }

    /// Lease namespace falls back DNS_INGRESS_LEASE_NAMESPACE -> POD_NAMESPACE -> default
    #[test]
    fn test_lease_namespace_fallback_chain() {
        std::env::remove_var("DNS_INGRESS_LEASE_NAMESPACE");
        std::env::remove_var("POD_NAMESPACE");
        assert_eq!(
            load_leader_election_config().lease_namespace,
            DEFAULT_LEASE_NAMESPACE,
            "With nothing set, the default namespace applies"
        );

        std::env::set_var("POD_NAMESPACE", "pod-ns");
        assert_eq!(
            load_leader_election_config().lease_namespace,
            "pod-ns",
            "POD_NAMESPACE fills in when the lease namespace is unset"
        );

        std::env::set_var("DNS_INGRESS_LEASE_NAMESPACE", "lease-ns");
        assert_eq!(
            load_leader_election_config().lease_namespace,
            "lease-ns",
            "The explicit lease namespace wins over POD_NAMESPACE"
        );

        std::env::remove_var("DNS_INGRESS_LEASE_NAMESPACE");
        std::env::remove_var("POD_NAMESPACE");
    }

    /// Identity falls back POD_NAME -> HOSTNAME -> random suffix
    #[test]
    fn test_identity_fallback_chain() {
        std::env::set_var("POD_NAME", "dns-ingress-7f6d");
        assert_eq!(load_leader_election_config().identity, "dns-ingress-7f6d");

        std::env::remove_var("POD_NAME");
        std::env::set_var("HOSTNAME", "node-a");
        assert_eq!(
            load_leader_election_config().identity,
            "node-a",
            "HOSTNAME fills in when POD_NAME is unset"
        );

        std::env::remove_var("HOSTNAME");
        assert!(
            load_leader_election_config()
                .identity
                .starts_with("dns-ingress-"),
            "With neither set, a generated identity is used"
        );
    }

    /// Lease duration parses numbers and ignores garbage
    #[test]
    fn test_lease_duration_parsing() {
        std::env::set_var("DNS_INGRESS_LEASE_DURATION_SECONDS", "45");
        assert_eq!(load_leader_election_config().lease_duration, 45);

        std::env::set_var("DNS_INGRESS_LEASE_DURATION_SECONDS", "not-a-number");
        assert_eq!(
            load_leader_election_config().lease_duration,
            DEFAULT_LEASE_DURATION_SECS,
            "Unparseable durations should fall back to the default"
        );

        std::env::remove_var("DNS_INGRESS_LEASE_DURATION_SECONDS");
    }

    /// The error policy requeues after the fixed error delay
    #[test]
    fn test_error_policy_requeue_duration() {
        let err = ReconcileError::from(anyhow::anyhow!("reconcile failed"));

        let action = error_policy(Arc::new(()), &err, Arc::new(()));

        assert_eq!(
            action,
            Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS)),
            "Errors should requeue after the fixed delay"
        );
    }
}
