// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cluster operations against the Kubernetes API server

use super::namespaces::{delete_namespace, ensure_namespace_exists};
use super::ops::{ClusterOps, Deletion, Manifest, ResourceState, SecretSource, WaitTarget};
use super::resources::{
    all_deployments_available, all_pods_ready, build_secret, deployment_state, pod_state,
    service_address, service_state, statefulset_state,
};
use crate::constants::FIELD_MANAGER;
use crate::error::{GatewayError, Result};
use crate::poll::{poll, PollOutcome, PollPolicy};
use async_trait::async_trait;
use futures::future::try_join_all;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{Pod, Secret, Service};
use k8s_openapi::NamespaceResourceScope;
use kube::{
    api::{
        DeleteParams, DynamicObject, GroupVersionKind, ListParams, LogParams, Patch, PatchParams,
        PostParams,
    },
    discovery::{self, Scope},
    Api, Client, Resource, ResourceExt,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt::Debug;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Talks to the API server through a kube [`Client`]
#[derive(Clone)]
pub struct KubeApi {
    client: Client,
    poll_interval: Duration,
}

impl KubeApi {
    pub fn new(client: Client, poll_interval: Duration) -> Self {
        Self {
            client,
            poll_interval,
        }
    }

    fn secrets(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// Poll objects matching `selector` until `ready` holds for the list
    async fn wait_for_selected<K>(
        &self,
        namespace: &str,
        target: &WaitTarget,
        selector: &str,
        timeout: Duration,
        ready: fn(&[K]) -> bool,
    ) -> Result<()>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        K::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let params = ListParams::default().labels(selector);
        let policy = PollPolicy::for_timeout(timeout, self.poll_interval);

        let outcome = poll(&policy, selector, |_| {
            let api = api.clone();
            let params = params.clone();
            async move {
                let list = api.list(&params).await?;
                Ok::<_, kube::Error>(ready(&list.items).then_some(()))
            }
        })
        .await;

        match outcome {
            PollOutcome::Ready(()) => Ok(()),
            PollOutcome::Exhausted { .. } => Err(GatewayError::ReadinessTimeout {
                target: target.to_string(),
                timeout,
            }),
        }
    }

    /// Server-side apply one manifest document
    async fn apply_object(&self, namespace: &str, object: DynamicObject, manifest: &Path) -> Result<()> {
        let Some(types) = object.types.as_ref() else {
            return Err(GatewayError::ManifestError {
                path: manifest.to_path_buf(),
                reason: "document has no apiVersion/kind".to_string(),
            });
        };
        let gvk = GroupVersionKind::try_from(types).map_err(|e| GatewayError::ManifestError {
            path: manifest.to_path_buf(),
            reason: e.to_string(),
        })?;
        let name = object.name_any();

        let (resource, capabilities) = discovery::pinned_kind(&self.client, &gvk).await?;
        let api: Api<DynamicObject> = if capabilities.scope == Scope::Cluster {
            Api::all_with(self.client.clone(), &resource)
        } else {
            let target = object.namespace().unwrap_or_else(|| namespace.to_string());
            Api::namespaced_with(self.client.clone(), &target, &resource)
        };

        let params = PatchParams::apply(FIELD_MANAGER).force();
        api.patch(&name, &params, &Patch::Apply(&object)).await?;
        debug!("Applied {}/{}", gvk.kind, name);
        Ok(())
    }
}

/// Split a multi-document manifest, skipping empty documents
pub fn parse_manifest(contents: &str, manifest: &Path) -> Result<Vec<DynamicObject>> {
    let mut objects = Vec::new();
    for document in serde_yaml::Deserializer::from_str(contents) {
        let value = serde_yaml::Value::deserialize(document)?;
        if value.is_null() {
            continue;
        }
        let object: DynamicObject =
            serde_yaml::from_value(value).map_err(|e| GatewayError::ManifestError {
                path: manifest.to_path_buf(),
                reason: e.to_string(),
            })?;
        objects.push(object);
    }
    Ok(objects)
}

#[async_trait]
impl ClusterOps for KubeApi {
    async fn check_access(&self) -> Result<()> {
        let version = self
            .client
            .apiserver_version()
            .await
            .map_err(|e| GatewayError::ClusterUnreachable(e.to_string()))?;
        debug!("API server version {}", version.git_version);
        Ok(())
    }

    async fn ensure_namespace(&self, namespace: &str) -> Result<()> {
        ensure_namespace_exists(&self.client, namespace).await
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<Deletion> {
        delete_namespace(&self.client, namespace).await
    }

    #[instrument(skip(self))]
    async fn delete_secret(&self, namespace: &str, name: &str) -> Result<Deletion> {
        match self.secrets(namespace).delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(Deletion::Deleted),
            Err(kube::Error::Api(err)) if err.code == 404 => Ok(Deletion::NotFound),
            Err(e) => Err(GatewayError::SecretError(format!(
                "Failed to delete secret {}/{}: {}",
                namespace, name, e
            ))),
        }
    }

    #[instrument(skip(self, secret), fields(secret = %secret.name))]
    async fn create_secret(&self, namespace: &str, secret: &SecretSource) -> Result<()> {
        let object = build_secret(secret, namespace, secret.read()?);
        self.secrets(namespace)
            .create(&PostParams::default(), &object)
            .await
            .map_err(|e| {
                GatewayError::SecretError(format!(
                    "Failed to create secret {}/{}: {}",
                    namespace, secret.name, e
                ))
            })?;
        Ok(())
    }

    #[instrument(skip(self, secret), fields(secret = %secret.name))]
    async fn apply_secret(&self, namespace: &str, secret: &SecretSource) -> Result<()> {
        let object = build_secret(secret, namespace, secret.read()?);
        let pp = PatchParams::apply(FIELD_MANAGER).force();
        self.secrets(namespace)
            .patch(&secret.name, &pp, &Patch::Apply(&object))
            .await
            .map_err(|e| {
                GatewayError::SecretError(format!(
                    "Failed to apply secret {}/{}: {}",
                    namespace, secret.name, e
                ))
            })?;
        Ok(())
    }

    #[instrument(skip(self, manifest), fields(manifest = %manifest.path.display()))]
    async fn apply_manifest(&self, namespace: &str, manifest: &Manifest) -> Result<()> {
        for object in parse_manifest(&manifest.contents, &manifest.path)? {
            self.apply_object(namespace, object, &manifest.path).await?;
        }
        info!("Applied {}", manifest.path.display());
        Ok(())
    }

    #[instrument(skip(self, target), fields(waiting_for = %target))]
    async fn wait_for(&self, namespace: &str, target: &WaitTarget, timeout: Duration) -> Result<()> {
        match target {
            WaitTarget::PodsReady { selector } => {
                self.wait_for_selected::<Pod>(namespace, target, selector, timeout, all_pods_ready)
                    .await
            }
            WaitTarget::DeploymentsAvailable { selector } => {
                self.wait_for_selected::<Deployment>(
                    namespace,
                    target,
                    selector,
                    timeout,
                    all_deployments_available,
                )
                .await
            }
        }
    }

    async fn load_balancer_address(&self, namespace: &str, service: &str) -> Result<Option<String>> {
        let services: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        Ok(services
            .get_opt(service)
            .await?
            .as_ref()
            .and_then(service_address))
    }

    async fn list_resources(&self, namespace: &str) -> Result<Vec<ResourceState>> {
        let lp = ListParams::default();
        let deployments: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        let statefulsets: Api<StatefulSet> = Api::namespaced(self.client.clone(), namespace);
        let services: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);

        let (deployments, statefulsets, services, pods) = tokio::try_join!(
            deployments.list(&lp),
            statefulsets.list(&lp),
            services.list(&lp),
            pods.list(&lp)
        )?;

        let mut states = Vec::new();
        states.extend(deployments.items.iter().map(deployment_state));
        states.extend(statefulsets.items.iter().map(statefulset_state));
        states.extend(services.items.iter().map(service_state));
        states.extend(pods.items.iter().map(pod_state));
        Ok(states)
    }

    async fn logs(&self, namespace: &str, selector: &str, tail: i64) -> Result<String> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let matching = pods.list(&ListParams::default().labels(selector)).await?;
        let params = LogParams {
            tail_lines: Some(tail),
            ..Default::default()
        };

        let chunks = try_join_all(matching.items.iter().map(|pod| {
            let pods = pods.clone();
            let params = params.clone();
            let name = pod.name_any();
            async move {
                let text = pods.logs(&name, &params).await?;
                Ok::<_, kube::Error>(format!("==> {} <==\n{}", name, text))
            }
        }))
        .await?;

        Ok(chunks.join("\n"))
    }
}
