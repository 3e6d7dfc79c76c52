// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Readiness predicates and status summaries shared by both backends

use super::ops::{ResourceState, SecretSource};
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{Pod, Secret, Service};
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use kube::ResourceExt;
use serde::Deserialize;
use std::collections::BTreeMap;

/// The `items` of a `kubectl get -o json` list
#[derive(Deserialize, Debug)]
pub struct ObjectList<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// Build the secret object for a credential file
pub fn build_secret(source: &SecretSource, namespace: &str, data: Vec<u8>) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(source.name.clone()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        data: Some(BTreeMap::from([(source.key.clone(), ByteString(data))])),
        type_: Some("Opaque".to_string()),
        ..Default::default()
    }
}

/// First ingress IP or hostname assigned by the load balancer
pub fn service_address(service: &Service) -> Option<String> {
    service
        .status
        .as_ref()
        .and_then(|s| s.load_balancer.as_ref())
        .and_then(|lb| lb.ingress.as_ref())
        .and_then(|ingress| {
            ingress
                .iter()
                .find_map(|i| i.ip.clone().or_else(|| i.hostname.clone()))
        })
        .filter(|address| !address.is_empty())
}

/// Check if a pod reports condition Ready=True
pub fn is_pod_ready(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        })
}

/// All pods ready, and at least one of them
pub fn all_pods_ready(pods: &[Pod]) -> bool {
    !pods.is_empty() && pods.iter().all(is_pod_ready)
}

/// All deployments available, and at least one of them
pub fn all_deployments_available(deployments: &[Deployment]) -> bool {
    !deployments.is_empty() && deployments.iter().all(is_deployment_available)
}

/// Check if a deployment reports condition Available=True
pub fn is_deployment_available(deployment: &Deployment) -> bool {
    deployment
        .status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Available" && c.status == "True")
        })
}

pub fn deployment_state(deployment: &Deployment) -> ResourceState {
    let desired = deployment
        .spec
        .as_ref()
        .and_then(|s| s.replicas)
        .unwrap_or(1);
    let ready = deployment
        .status
        .as_ref()
        .and_then(|s| s.ready_replicas)
        .unwrap_or(0);

    ResourceState {
        kind: "Deployment".to_string(),
        name: deployment.name_any(),
        status: format!("{}/{} ready", ready, desired),
    }
}

pub fn statefulset_state(statefulset: &StatefulSet) -> ResourceState {
    let desired = statefulset
        .spec
        .as_ref()
        .and_then(|s| s.replicas)
        .unwrap_or(1);
    let ready = statefulset
        .status
        .as_ref()
        .and_then(|s| s.ready_replicas)
        .unwrap_or(0);

    ResourceState {
        kind: "StatefulSet".to_string(),
        name: statefulset.name_any(),
        status: format!("{}/{} ready", ready, desired),
    }
}

pub fn service_state(service: &Service) -> ResourceState {
    let service_type = service
        .spec
        .as_ref()
        .and_then(|s| s.type_.clone())
        .unwrap_or_else(|| "ClusterIP".to_string());

    let address = if service_type == "LoadBalancer" {
        service_address(service).unwrap_or_else(|| "<pending>".to_string())
    } else {
        service
            .spec
            .as_ref()
            .and_then(|s| s.cluster_ip.clone())
            .unwrap_or_else(|| "<none>".to_string())
    };

    ResourceState {
        kind: "Service".to_string(),
        name: service.name_any(),
        status: format!("{} {}", service_type, address),
    }
}

pub fn pod_state(pod: &Pod) -> ResourceState {
    let phase = pod
        .status
        .as_ref()
        .and_then(|s| s.phase.clone())
        .unwrap_or_else(|| "Unknown".to_string());
    let statuses = pod
        .status
        .as_ref()
        .and_then(|s| s.container_statuses.as_ref());
    let total = statuses.map_or(0, |s| s.len());
    let ready = statuses.map_or(0, |s| s.iter().filter(|c| c.ready).count());

    ResourceState {
        kind: "Pod".to_string(),
        name: pod.name_any(),
        status: format!("{} ({}/{} ready)", phase, ready, total),
    }
}
