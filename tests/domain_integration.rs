// Copyright (c) 2025 sokdak, dns-ingress
// SPDX-License-Identifier: MIT

//! Integration tests for the dns-ingress operator.
//!
//! These tests verify basic CRUD behavior of the `Domain` CRD against a real
//! Kubernetes cluster. They skip gracefully when no cluster is reachable, so
//! `cargo test` stays green on developer machines without kubeconfig.

mod common;

use common::{create_test_namespace, delete_test_namespace, get_kube_client_or_skip};
use dns_ingress::crd::{Domain, DomainSpec};
use dns_ingress::labels::LABEL_MAPPED_INGRESS;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use std::collections::BTreeMap;

const TEST_NAMESPACE: &str = "dns-ingress-integration-test";

fn sample_domain(name: &str) -> Domain {
    let mut domain = Domain::new(
        name,
        DomainSpec {
            provider: "cloudflare".to_string(),
            r#type: "A".to_string(),
            name: "app".to_string(),
            zone: "example.com".to_string(),
            records: vec!["1.2.3.4".to_string()],
            ttl: 120,
        },
    );
    domain.metadata.labels = Some(BTreeMap::from([(
        LABEL_MAPPED_INGRESS.to_string(),
        "integration-test".to_string(),
    )]));
    domain
}

/// A Domain object round-trips through the API server
#[tokio::test]
async fn test_domain_crud_round_trip() {
    let Some(client) = get_kube_client_or_skip().await else {
        return;
    };
    if create_test_namespace(&client, TEST_NAMESPACE).await.is_err() {
        eprintln!("Skipping: cannot create test namespace");
        return;
    }

    let api: Api<Domain> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    let name = "integration-app";

    match api.create(&PostParams::default(), &sample_domain(name)).await {
        Ok(_) => {}
        Err(kube::Error::Api(ae)) if ae.code == 404 => {
            // CRD not installed in this cluster; nothing to verify
            eprintln!("Skipping: Domain CRD not installed");
            delete_test_namespace(&client, TEST_NAMESPACE).await;
            return;
        }
        Err(e) => panic!("create failed: {e}"),
    }

    let fetched = api.get(name).await.expect("get after create");
    assert_eq!(fetched.spec.provider, "cloudflare");
    assert_eq!(fetched.spec.name, "app");
    assert_eq!(fetched.spec.zone, "example.com");
    assert_eq!(fetched.spec.records, vec!["1.2.3.4".to_string()]);

    let listed = api
        .list(&ListParams::default().labels(&format!("{LABEL_MAPPED_INGRESS}=integration-test")))
        .await
        .expect("list by mapping label");
    assert!(
        listed.items.iter().any(|d| d.metadata.name.as_deref() == Some(name)),
        "Created domain should be visible through the mapping label selector"
    );

    api.delete(name, &DeleteParams::default())
        .await
        .expect("delete");

    delete_test_namespace(&client, TEST_NAMESPACE).await;
}
