// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Ordered deployment of the gateway and its dependencies.
//!
//! Failures come in three tiers. Missing prerequisites, a failed secret
//! create and readiness timeouts are returned as errors and stop the run.
//! An unassigned load-balancer address and a failed health check are logged
//! as warnings and the run continues. Deleting something that is already gone
//! counts as success.

use super::credentials::credential_secret;
use super::manifests::render;
use super::report::{Endpoint, StatusReport};
use crate::config::{Config, SecretStrategy};
use crate::constants::{manifests, selectors};
use crate::error::{GatewayError, Result};
use crate::health::HealthProbe;
use crate::helm::{PackageOps, Release};
use crate::kubernetes::{ClusterOps, Deletion, WaitTarget};
use crate::poll::{poll, PollOutcome};
use crate::process::CommandRunner;
use crate::values::{load_or_seed, DeploymentValues, ExposureType};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy)]
pub struct DeployOptions {
    /// Issue one health-check request once the endpoint is known
    pub health_check: bool,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self { health_check: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthOutcome {
    Healthy(u16),
    Unhealthy(String),
    /// No endpoint to check, or the check was not requested
    Skipped,
}

#[derive(Debug, Clone)]
pub struct DeployOutcome {
    pub report: StatusReport,
    pub health: HealthOutcome,
}

/// Sequences cluster and package operations for one target namespace
pub struct Orchestrator<'a> {
    cluster: &'a dyn ClusterOps,
    packages: &'a dyn PackageOps,
    tools: &'a dyn CommandRunner,
    health: &'a dyn HealthProbe,
    config: &'a Config,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        cluster: &'a dyn ClusterOps,
        packages: &'a dyn PackageOps,
        tools: &'a dyn CommandRunner,
        health: &'a dyn HealthProbe,
        config: &'a Config,
    ) -> Self {
        Self {
            cluster,
            packages,
            tools,
            health,
            config,
        }
    }

    /// Render a manifest from the manifests directory and apply it
    async fn apply(&self, namespace: &str, name: &str, values: &DeploymentValues) -> Result<()> {
        let manifest = render(&self.config.manifest(name), values)?;
        self.cluster.apply_manifest(namespace, &manifest).await
    }

    fn namespace(&self, values: &DeploymentValues) -> String {
        self.config
            .namespace
            .clone()
            .unwrap_or_else(|| values.namespace_or_default().to_string())
    }

    /// Fail before touching the cluster unless every prerequisite holds
    #[instrument(skip(self))]
    pub async fn preflight(&self) -> Result<()> {
        for tool in self.config.required_tools() {
            if !self.tools.is_installed(tool).await {
                return Err(GatewayError::ToolMissing(tool.to_string()));
            }
            debug!("Found {}", tool);
        }

        if !self.config.credentials_file.is_file() {
            return Err(GatewayError::CredentialsMissing(
                self.config.credentials_file.clone(),
            ));
        }

        self.cluster.check_access().await?;
        info!("Preflight checks passed");
        Ok(())
    }

    /// Replace the credential secret with the current credential file
    #[instrument(skip(self))]
    pub async fn rotate_secret(&self, namespace: &str) -> Result<()> {
        let secret = credential_secret(&self.config.credentials_file);

        match self.config.secret_strategy {
            SecretStrategy::DeleteCreate => {
                match self.cluster.delete_secret(namespace, &secret.name).await? {
                    Deletion::Deleted => info!("Deleted previous secret {}", secret.name),
                    Deletion::NotFound => debug!("Secret {} did not exist yet", secret.name),
                }
                self.cluster.create_secret(namespace, &secret).await?;
            }
            SecretStrategy::Apply => {
                self.cluster.apply_secret(namespace, &secret).await?;
            }
        }

        info!("Secret {} is up to date", secret.name);
        Ok(())
    }

    /// Run the whole deployment in dependency order
    #[instrument(skip(self, options))]
    pub async fn deploy(&self, options: DeployOptions) -> Result<DeployOutcome> {
        self.preflight().await?;

        let values = load_or_seed(&self.config.values_file, &self.config.values_template)?;
        let namespace = self.namespace(&values);
        let release = values.release_or_default().to_string();
        info!("Deploying release {} into namespace {}", release, namespace);

        self.cluster.ensure_namespace(&namespace).await?;
        self.rotate_secret(&namespace).await?;

        info!("Deploying database");
        self.apply(&namespace, manifests::DATABASE, &values).await?;
        self.cluster
            .wait_for(
                &namespace,
                &WaitTarget::PodsReady {
                    selector: selectors::DATABASE.to_string(),
                },
                self.config.database_timeout(),
            )
            .await?;
        info!("Database is ready");

        self.apply(&namespace, manifests::CONFIGURATION, &values).await?;

        info!("Installing gateway release {}", release);
        self.packages
            .upgrade_install(&Release {
                name: release.clone(),
                chart: self.config.chart.clone(),
                namespace: namespace.clone(),
                values_files: vec![self.config.values_file.clone()],
                timeout: self.config.workload_timeout(),
            })
            .await?;
        self.cluster
            .wait_for(
                &namespace,
                &WaitTarget::DeploymentsAvailable {
                    selector: values.workload_selector(),
                },
                self.config.workload_timeout(),
            )
            .await?;
        info!("Gateway is available");

        let exposure = match values.exposure.exposure_type {
            ExposureType::LoadBalancer => manifests::LOAD_BALANCER,
            ExposureType::Gateway => manifests::GATEWAY_ROUTE,
        };
        self.apply(&namespace, exposure, &values).await?;

        let endpoint = self.await_endpoint(&namespace, &values).await;
        let report = self.report(&namespace, &values, endpoint).await?;

        let health = if options.health_check {
            self.check_health(&report.endpoint).await
        } else {
            HealthOutcome::Skipped
        };

        info!("Deployment complete, endpoint {}", report.endpoint);
        Ok(DeployOutcome { report, health })
    }

    /// Poll for the external endpoint; running out of attempts is not fatal
    async fn await_endpoint(&self, namespace: &str, values: &DeploymentValues) -> Endpoint {
        if values.exposure.exposure_type == ExposureType::Gateway {
            return Endpoint::Routed {
                host: values.exposure.host.clone(),
            };
        }

        let service = values.exposure.service_name.as_str();
        let policy = self.config.address_poll();
        info!(
            "Waiting for an external address on service {} ({} attempts, {}s apart)",
            service,
            policy.max_attempts,
            policy.interval.as_secs()
        );

        let cluster = self.cluster;
        match poll(&policy, "load-balancer address", move |_| {
            cluster.load_balancer_address(namespace, service)
        })
        .await
        {
            PollOutcome::Ready(address) => Endpoint::Assigned {
                address,
                port: values.exposure.port,
            },
            PollOutcome::Exhausted { attempts } => {
                warn!(
                    "No external address assigned to {} after {} attempts, reporting it as pending",
                    service, attempts
                );
                Endpoint::Pending
            }
        }
    }

    /// Read the external endpoint once; a missing service is still pending
    async fn current_endpoint(&self, namespace: &str, values: &DeploymentValues) -> Result<Endpoint> {
        match values.exposure.exposure_type {
            ExposureType::Gateway => Ok(Endpoint::Routed {
                host: values.exposure.host.clone(),
            }),
            ExposureType::LoadBalancer => Ok(self
                .cluster
                .load_balancer_address(namespace, &values.exposure.service_name)
                .await?
                .map_or(Endpoint::Pending, |address| Endpoint::Assigned {
                    address,
                    port: values.exposure.port,
                })),
        }
    }

    async fn report(
        &self,
        namespace: &str,
        values: &DeploymentValues,
        endpoint: Endpoint,
    ) -> Result<StatusReport> {
        let release = values.release_or_default();
        let resources = self.cluster.list_resources(namespace).await?;
        let release_status = self.packages.release_status(namespace, release).await?;

        Ok(StatusReport {
            namespace: namespace.to_string(),
            release: release.to_string(),
            release_status,
            endpoint,
            resources,
        })
    }

    /// One request against the liveliness endpoint; failures are warnings
    async fn check_health(&self, endpoint: &Endpoint) -> HealthOutcome {
        let Some(url) = endpoint.health_url() else {
            warn!("No external endpoint yet, skipping health check");
            return HealthOutcome::Skipped;
        };

        match self.health.check(&url).await {
            Ok(status) => {
                info!("Gateway at {} is healthy (HTTP {})", url, status);
                HealthOutcome::Healthy(status)
            }
            Err(e) => {
                warn!("Health check against {} failed: {}", url, e);
                HealthOutcome::Unhealthy(e.to_string())
            }
        }
    }

    /// Read-only report of the deployed resources and endpoint
    #[instrument(skip(self))]
    pub async fn status(&self) -> Result<StatusReport> {
        let values = DeploymentValues::load_or_default(&self.config.values_file)?;
        let namespace = self.namespace(&values);
        let endpoint = self.current_endpoint(&namespace, &values).await?;
        self.report(&namespace, &values, endpoint).await
    }

    /// Issue a single health-check request against the current endpoint
    #[instrument(skip(self))]
    pub async fn test(&self) -> Result<HealthOutcome> {
        let values = DeploymentValues::load_or_default(&self.config.values_file)?;
        let namespace = self.namespace(&values);
        let endpoint = self.current_endpoint(&namespace, &values).await?;
        Ok(self.check_health(&endpoint).await)
    }

    /// Tail of the gateway pod logs
    pub async fn logs(&self, tail: i64) -> Result<String> {
        let values = DeploymentValues::load_or_default(&self.config.values_file)?;
        let namespace = self.namespace(&values);
        self.cluster
            .logs(&namespace, &values.workload_selector(), tail)
            .await
    }

    /// Delete the namespace and everything in it
    #[instrument(skip(self))]
    pub async fn cleanup(&self) -> Result<Deletion> {
        let values = DeploymentValues::load_or_default(&self.config.values_file)?;
        let namespace = self.namespace(&values);

        let deletion = self.cluster.delete_namespace(&namespace).await?;
        match deletion {
            Deletion::Deleted => info!("Namespace {} is being deleted", namespace),
            Deletion::NotFound => info!("Namespace {} is already absent", namespace),
        }
        Ok(deletion)
    }
}
