// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cluster operations through the `kubectl` command line

use super::ops::{ClusterOps, Deletion, Manifest, ResourceState, SecretSource, WaitTarget};
use super::resources::{
    deployment_state, pod_state, service_address, service_state, statefulset_state, ObjectList,
};
use crate::error::{GatewayError, Result};
use crate::poll::deadline_after;
use crate::process::{check_output, display_command, CommandOutput, CommandRunner};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{Pod, Service};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument};

/// Runs `kubectl` through a [`CommandRunner`]
#[derive(Clone)]
pub struct KubectlCli {
    runner: Arc<dyn CommandRunner>,
    program: String,
    kubeconfig: Option<PathBuf>,
    context: Option<String>,
    retry_interval: Duration,
}

impl KubectlCli {
    pub fn new(runner: Arc<dyn CommandRunner>, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
            kubeconfig: None,
            context: None,
            retry_interval: Duration::from_secs(2),
        }
    }

    pub fn with_kubeconfig(mut self, kubeconfig: Option<PathBuf>, context: Option<String>) -> Self {
        self.kubeconfig = kubeconfig;
        self.context = context;
        self
    }

    /// Interval between `kubectl wait` attempts while no matching pods exist yet
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    fn args(&self, args: &[&str]) -> Vec<String> {
        let mut full: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        if let Some(path) = &self.kubeconfig {
            full.push(format!("--kubeconfig={}", path.display()));
        }
        if let Some(context) = &self.context {
            full.push(format!("--context={}", context));
        }
        full
    }

    async fn exec(&self, args: &[&str], stdin: Option<&[u8]>) -> Result<CommandOutput> {
        let args = self.args(args);
        debug!("Running {}", display_command(&self.program, &args));
        self.runner.run(&self.program, &args, stdin).await
    }

    async fn exec_checked(&self, args: &[&str], stdin: Option<&[u8]>) -> Result<CommandOutput> {
        let output = self.exec(args, stdin).await?;
        check_output(&self.program, &self.args(args), output)
    }

    async fn delete(&self, args: &[&str]) -> Result<Deletion> {
        let output = self.exec(args, None).await?;
        if output.success() {
            Ok(Deletion::Deleted)
        } else if output.is_not_found() {
            Ok(Deletion::NotFound)
        } else {
            check_output(&self.program, &self.args(args), output).map(|_| Deletion::Deleted)
        }
    }

    async fn get_list<T: DeserializeOwned>(&self, namespace: &str, kind: &str) -> Result<Vec<T>> {
        let output = self
            .exec_checked(&["get", kind, "--namespace", namespace, "-o", "json"], None)
            .await?;
        let list: ObjectList<T> = serde_json::from_str(&output.stdout)?;
        Ok(list.items)
    }

    fn secret_args<'a>(namespace: &'a str, secret: &'a SecretSource, from_file: &'a str) -> Vec<&'a str> {
        vec![
            "create",
            "secret",
            "generic",
            secret.name.as_str(),
            "--namespace",
            namespace,
            from_file,
        ]
    }
}

fn from_file_arg(secret: &SecretSource) -> String {
    format!("--from-file={}={}", secret.key, secret.path.display())
}

/// Seconds rounded up, so a fresh deadline renders as the configured timeout
fn whole_seconds(duration: Duration) -> u64 {
    duration.as_millis().div_ceil(1000) as u64
}

fn wait_args(target: &WaitTarget) -> (String, Vec<String>) {
    match target {
        WaitTarget::PodsReady { selector } => (
            "--for=condition=ready".to_string(),
            vec!["pod".to_string(), "--selector".to_string(), selector.clone()],
        ),
        WaitTarget::DeploymentsAvailable { selector } => (
            "--for=condition=available".to_string(),
            vec!["deployment".to_string(), "--selector".to_string(), selector.clone()],
        ),
    }
}

#[async_trait]
impl ClusterOps for KubectlCli {
    async fn check_access(&self) -> Result<()> {
        let output = self.exec(&["cluster-info"], None).await?;
        if output.success() {
            Ok(())
        } else {
            Err(GatewayError::ClusterUnreachable(
                output.stderr.trim().to_string(),
            ))
        }
    }

    #[instrument(skip(self))]
    async fn ensure_namespace(&self, namespace: &str) -> Result<()> {
        let output = self.exec(&["get", "namespace", namespace], None).await?;
        if output.success() {
            debug!("Namespace {} already exists", namespace);
            return Ok(());
        }
        if !output.is_not_found() {
            return Err(GatewayError::NamespaceError(format!(
                "Failed to check namespace {}: {}",
                namespace,
                output.stderr.trim()
            )));
        }

        info!("Creating namespace {}", namespace);
        self.exec_checked(&["create", "namespace", namespace], None)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_namespace(&self, namespace: &str) -> Result<Deletion> {
        self.delete(&["delete", "namespace", namespace]).await
    }

    #[instrument(skip(self))]
    async fn delete_secret(&self, namespace: &str, name: &str) -> Result<Deletion> {
        self.delete(&["delete", "secret", name, "--namespace", namespace])
            .await
    }

    #[instrument(skip(self, secret), fields(secret = %secret.name))]
    async fn create_secret(&self, namespace: &str, secret: &SecretSource) -> Result<()> {
        let from_file = from_file_arg(secret);
        self.exec_checked(&Self::secret_args(namespace, secret, &from_file), None)
            .await
            .map_err(|e| GatewayError::SecretError(e.to_string()))?;
        Ok(())
    }

    #[instrument(skip(self, secret), fields(secret = %secret.name))]
    async fn apply_secret(&self, namespace: &str, secret: &SecretSource) -> Result<()> {
        let from_file = from_file_arg(secret);
        let mut render = Self::secret_args(namespace, secret, &from_file);
        render.extend(["--dry-run=client", "-o", "yaml"]);

        let rendered = self
            .exec_checked(&render, None)
            .await
            .map_err(|e| GatewayError::SecretError(e.to_string()))?;

        self.exec_checked(
            &["apply", "--namespace", namespace, "-f", "-"],
            Some(rendered.stdout.as_bytes()),
        )
        .await
        .map_err(|e| GatewayError::SecretError(e.to_string()))?;
        Ok(())
    }

    #[instrument(skip(self, manifest), fields(manifest = %manifest.path.display()))]
    async fn apply_manifest(&self, namespace: &str, manifest: &Manifest) -> Result<()> {
        self.exec_checked(
            &["apply", "--namespace", namespace, "-f", "-"],
            Some(manifest.contents.as_bytes()),
        )
        .await?;
        info!("Applied {}", manifest.path.display());
        Ok(())
    }

    #[instrument(skip(self, target), fields(waiting_for = %target))]
    async fn wait_for(&self, namespace: &str, target: &WaitTarget, timeout: Duration) -> Result<()> {
        let deadline = deadline_after(timeout);
        let (condition, resource) = wait_args(target);

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(GatewayError::ReadinessTimeout {
                    target: target.to_string(),
                    timeout,
                });
            }

            let timeout_arg = format!("--timeout={}s", whole_seconds(remaining).max(1));
            let mut args: Vec<&str> = vec!["wait", condition.as_str()];
            args.extend(resource.iter().map(String::as_str));
            args.extend(["--namespace", namespace, timeout_arg.as_str()]);

            let output = self.exec(&args, None).await?;
            if output.success() {
                return Ok(());
            }

            let stderr = output.stderr.to_ascii_lowercase();
            if stderr.contains("timed out") {
                return Err(GatewayError::ReadinessTimeout {
                    target: target.to_string(),
                    timeout,
                });
            }
            // `kubectl wait` fails at once while the selector matches nothing
            if stderr.contains("no matching resources") || output.is_not_found() {
                debug!("Nothing to wait on yet, retrying");
                sleep(self.retry_interval.min(remaining)).await;
                continue;
            }

            return check_output(&self.program, &self.args(&args), output).map(|_| ());
        }
    }

    async fn load_balancer_address(&self, namespace: &str, service: &str) -> Result<Option<String>> {
        let args = ["get", "service", service, "--namespace", namespace, "-o", "json"];
        let output = self.exec(&args, None).await?;
        if !output.success() && output.is_not_found() {
            debug!("Service {} does not exist", service);
            return Ok(None);
        }
        let output = check_output(&self.program, &self.args(&args), output)?;
        let service: Service = serde_json::from_str(&output.stdout)?;
        Ok(service_address(&service))
    }

    async fn list_resources(&self, namespace: &str) -> Result<Vec<ResourceState>> {
        let mut states = Vec::new();
        states.extend(
            self.get_list::<Deployment>(namespace, "deployments")
                .await?
                .iter()
                .map(deployment_state),
        );
        states.extend(
            self.get_list::<StatefulSet>(namespace, "statefulsets")
                .await?
                .iter()
                .map(statefulset_state),
        );
        states.extend(
            self.get_list::<Service>(namespace, "services")
                .await?
                .iter()
                .map(service_state),
        );
        states.extend(
            self.get_list::<Pod>(namespace, "pods")
                .await?
                .iter()
                .map(pod_state),
        );
        Ok(states)
    }

    async fn logs(&self, namespace: &str, selector: &str, tail: i64) -> Result<String> {
        let tail_arg = format!("--tail={}", tail);
        let output = self
            .exec_checked(
                &[
                    "logs",
                    "--namespace",
                    namespace,
                    "--selector",
                    selector,
                    "--prefix",
                    tail_arg.as_str(),
                ],
                None,
            )
            .await?;
        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ScriptedRunner;
    use std::path::Path;

    fn kubectl(runner: &Arc<ScriptedRunner>) -> KubectlCli {
        KubectlCli::new(runner.clone(), "kubectl").with_retry_interval(Duration::from_millis(1))
    }

    fn source() -> SecretSource {
        SecretSource::new("creds", "credentials.json", Path::new("/tmp/credentials.json"))
    }

    #[tokio::test]
    async fn test_check_access_failure_is_unreachable() {
        let runner = Arc::new(
            ScriptedRunner::new().on(&["kubectl", "cluster-info"], 1, "", "connection refused"),
        );

        let err = kubectl(&runner).check_access().await.unwrap_err();

        assert!(matches!(err, GatewayError::ClusterUnreachable(msg) if msg == "connection refused"));
    }

    #[tokio::test]
    async fn test_ensure_namespace_creates_when_missing() {
        let runner = Arc::new(ScriptedRunner::new().on(
            &["kubectl", "get", "namespace", "ai"],
            1,
            "",
            "Error from server (NotFound): namespaces \"ai\" not found",
        ));

        kubectl(&runner).ensure_namespace("ai").await.unwrap();

        assert_eq!(
            runner.command_lines(),
            vec!["kubectl get namespace ai", "kubectl create namespace ai"]
        );
    }

    #[tokio::test]
    async fn test_ensure_namespace_skips_existing() {
        let runner = Arc::new(ScriptedRunner::new());

        kubectl(&runner).ensure_namespace("ai").await.unwrap();

        assert_eq!(runner.command_lines(), vec!["kubectl get namespace ai"]);
    }

    #[tokio::test]
    async fn test_delete_secret_not_found() {
        let runner = Arc::new(ScriptedRunner::new().on(
            &["kubectl", "delete", "secret"],
            1,
            "",
            "Error from server (NotFound): secrets \"creds\" not found",
        ));

        let deletion = kubectl(&runner).delete_secret("ai", "creds").await.unwrap();

        assert_eq!(deletion, Deletion::NotFound);
    }

    #[tokio::test]
    async fn test_delete_secret_other_failure_is_error() {
        let runner = Arc::new(ScriptedRunner::new().on(
            &["kubectl", "delete", "secret"],
            1,
            "",
            "Error from server (Forbidden): forbidden",
        ));

        let err = kubectl(&runner).delete_secret("ai", "creds").await.unwrap_err();

        assert!(matches!(err, GatewayError::CommandFailed { .. }));
    }

    #[tokio::test]
    async fn test_create_secret_arguments() {
        let runner = Arc::new(ScriptedRunner::new());

        kubectl(&runner).create_secret("ai", &source()).await.unwrap();

        assert_eq!(
            runner.command_lines(),
            vec!["kubectl create secret generic creds --namespace ai --from-file=credentials.json=/tmp/credentials.json"]
        );
    }

    #[tokio::test]
    async fn test_apply_secret_pipes_rendered_manifest() {
        let runner = Arc::new(ScriptedRunner::new().on(
            &["kubectl", "create", "secret"],
            0,
            "kind: Secret\n",
            "",
        ));

        kubectl(&runner).apply_secret("ai", &source()).await.unwrap();

        let lines = runner.command_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("--dry-run=client -o yaml"));
        assert_eq!(lines[1], "kubectl apply --namespace ai -f -");
        assert_eq!(runner.stdin_of(1).as_deref(), Some("kind: Secret\n"));
    }

    #[tokio::test]
    async fn test_kubeconfig_and_context_are_passed() {
        let runner = Arc::new(ScriptedRunner::new());
        let cli = kubectl(&runner)
            .with_kubeconfig(Some(PathBuf::from("/etc/kube/config")), Some("prod".to_string()));

        cli.apply_manifest("ai", &Manifest::new(Path::new("k8s/postgres.yaml"), "kind: Service\n"))
            .await
            .unwrap();

        assert_eq!(
            runner.command_lines(),
            vec!["kubectl apply --namespace ai -f - --kubeconfig=/etc/kube/config --context=prod"]
        );
        assert_eq!(runner.stdin_of(0).as_deref(), Some("kind: Service\n"));
    }

    #[tokio::test]
    async fn test_wait_for_deployments_uses_release_selector() {
        let runner = Arc::new(ScriptedRunner::new());
        let target = WaitTarget::DeploymentsAvailable {
            selector: "app.kubernetes.io/instance=llm-gateway".to_string(),
        };

        kubectl(&runner)
            .wait_for("ai", &target, Duration::from_secs(600))
            .await
            .unwrap();

        assert_eq!(
            runner.command_lines(),
            vec!["kubectl wait --for=condition=available deployment --selector app.kubernetes.io/instance=llm-gateway --namespace ai --timeout=600s"]
        );
    }

    #[tokio::test]
    async fn test_wait_for_accepts_huge_timeout() {
        let runner = Arc::new(ScriptedRunner::new());
        let target = WaitTarget::PodsReady {
            selector: "app=postgres".to_string(),
        };

        kubectl(&runner)
            .wait_for("ai", &target, Duration::from_secs(u64::MAX))
            .await
            .unwrap();

        assert_eq!(runner.command_lines().len(), 1);
    }

    #[tokio::test]
    async fn test_wait_for_pods_arguments() {
        let runner = Arc::new(ScriptedRunner::new());
        let target = WaitTarget::PodsReady {
            selector: "app=postgres".to_string(),
        };

        kubectl(&runner)
            .wait_for("ai", &target, Duration::from_secs(300))
            .await
            .unwrap();

        let lines = runner.command_lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with(
            "kubectl wait --for=condition=ready pod --selector app=postgres --namespace ai --timeout="
        ));
    }

    #[tokio::test]
    async fn test_wait_for_timeout_is_readiness_timeout() {
        let runner = Arc::new(ScriptedRunner::new().on(
            &["kubectl", "wait"],
            1,
            "",
            "error: timed out waiting for the condition on deployments/llm-gateway",
        ));
        let target = WaitTarget::DeploymentsAvailable {
            selector: "app.kubernetes.io/instance=llm-gateway".to_string(),
        };

        let err = kubectl(&runner)
            .wait_for("ai", &target, Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_wait_for_retries_until_pods_exist() {
        let runner = Arc::new(ScriptedRunner::new().on_times(
            &["kubectl", "wait"],
            2,
            1,
            "",
            "error: no matching resources found",
        ));
        let target = WaitTarget::PodsReady {
            selector: "app=postgres".to_string(),
        };

        kubectl(&runner)
            .wait_for("ai", &target, Duration::from_secs(30))
            .await
            .unwrap();

        assert_eq!(runner.command_lines().len(), 3);
    }

    #[tokio::test]
    async fn test_load_balancer_address_parses_service() {
        let service = serde_json::json!({
            "apiVersion": "v1",
            "kind": "Service",
            "metadata": { "name": "llm-gateway-public" },
            "status": { "loadBalancer": { "ingress": [{ "ip": "34.1.2.3" }] } }
        });
        let runner = Arc::new(ScriptedRunner::new().on(
            &["kubectl", "get", "service"],
            0,
            &service.to_string(),
            "",
        ));

        let address = kubectl(&runner)
            .load_balancer_address("ai", "llm-gateway-public")
            .await
            .unwrap();

        assert_eq!(address.as_deref(), Some("34.1.2.3"));
    }

    #[tokio::test]
    async fn test_load_balancer_address_of_missing_service_is_none() {
        let runner = Arc::new(ScriptedRunner::new().on(
            &["kubectl", "get", "service"],
            1,
            "",
            "Error from server (NotFound): services \"llm-gateway-public\" not found",
        ));

        let address = kubectl(&runner)
            .load_balancer_address("ai", "llm-gateway-public")
            .await
            .unwrap();

        assert_eq!(address, None);
    }

    #[tokio::test]
    async fn test_load_balancer_address_other_failure_is_error() {
        let runner = Arc::new(ScriptedRunner::new().on(
            &["kubectl", "get", "service"],
            1,
            "",
            "Error from server (Forbidden): services is forbidden",
        ));

        let err = kubectl(&runner)
            .load_balancer_address("ai", "llm-gateway-public")
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::CommandFailed { .. }));
    }

    #[tokio::test]
    async fn test_list_resources_summarises_every_kind() {
        let empty = r#"{"apiVersion":"v1","kind":"List","items":[]}"#;
        let pods = serde_json::json!({
            "apiVersion": "v1",
            "kind": "List",
            "items": [{
                "apiVersion": "v1",
                "kind": "Pod",
                "metadata": { "name": "postgres-0" },
                "status": { "phase": "Pending" }
            }]
        });
        let runner = Arc::new(
            ScriptedRunner::new()
                .on(&["kubectl", "get", "deployments"], 0, empty, "")
                .on(&["kubectl", "get", "statefulsets"], 0, empty, "")
                .on(&["kubectl", "get", "services"], 0, empty, "")
                .on(&["kubectl", "get", "pods"], 0, &pods.to_string(), ""),
        );

        let states = kubectl(&runner).list_resources("ai").await.unwrap();

        assert_eq!(
            states,
            vec![ResourceState {
                kind: "Pod".to_string(),
                name: "postgres-0".to_string(),
                status: "Pending (0/0 ready)".to_string(),
            }]
        );
    }
}
