// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::{files, timing, DEFAULT_CHART};
use crate::poll::PollPolicy;
use clap::{Args, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Which client talks to the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Run kubectl as a subprocess
    Kubectl,
    /// Talk to the API server directly
    Api,
}

/// How the credential secret is replaced on every deploy
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SecretStrategy {
    /// Delete the old secret, then create the new one. Not atomic: a failed
    /// create leaves the namespace without the secret.
    DeleteCreate,
    /// Replace the secret in a single server-side apply
    Apply,
}

/// Tool configuration, from command-line flags or their environment variables
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Cloud provider credential file stored in the cluster secret
    #[arg(long = "credentials", env = "GATEWAY_CREDENTIALS", default_value = files::CREDENTIALS, global = true)]
    pub credentials_file: PathBuf,

    /// Deployment values document handed to Helm
    #[arg(long = "values", env = "GATEWAY_VALUES", default_value = files::VALUES, global = true)]
    pub values_file: PathBuf,

    /// Template copied to the values file when it does not exist
    #[arg(long = "values-template", env = "GATEWAY_VALUES_TEMPLATE", default_value = files::VALUES_TEMPLATE, global = true)]
    pub values_template: PathBuf,

    /// Directory holding the database, configuration and exposure manifests
    #[arg(long = "manifests", env = "GATEWAY_MANIFESTS", default_value = files::MANIFESTS_DIR, global = true)]
    pub manifests_dir: PathBuf,

    /// Helm chart of the gateway workload
    #[arg(long, env = "GATEWAY_CHART", default_value = DEFAULT_CHART, global = true)]
    pub chart: String,

    /// Overrides the namespace from the values file
    #[arg(long, short = 'n', env = "GATEWAY_NAMESPACE", global = true)]
    pub namespace: Option<String>,

    #[arg(long, env = "GATEWAY_BACKEND", value_enum, default_value_t = Backend::Kubectl, global = true)]
    pub backend: Backend,

    #[arg(long, env = "GATEWAY_SECRET_STRATEGY", value_enum, default_value_t = SecretStrategy::DeleteCreate, global = true)]
    pub secret_strategy: SecretStrategy,

    /// Seconds to wait for the database to become ready
    #[arg(long, env = "GATEWAY_DATABASE_TIMEOUT", default_value_t = timing::DATABASE_TIMEOUT_SECS, global = true)]
    pub database_timeout: u64,

    /// Seconds to wait for the gateway deployment to become available
    #[arg(long, env = "GATEWAY_WORKLOAD_TIMEOUT", default_value_t = timing::WORKLOAD_TIMEOUT_SECS, global = true)]
    pub workload_timeout: u64,

    /// Number of load-balancer address reads before reporting it pending
    #[arg(long, env = "GATEWAY_ADDRESS_ATTEMPTS", default_value_t = timing::ADDRESS_POLL_ATTEMPTS, global = true)]
    pub address_attempts: u32,

    /// Seconds between load-balancer address reads
    #[arg(long, env = "GATEWAY_ADDRESS_INTERVAL", default_value_t = timing::ADDRESS_POLL_INTERVAL_SECS, global = true)]
    pub address_interval: u64,

    /// Seconds between readiness checks
    #[arg(long, env = "GATEWAY_READINESS_INTERVAL", default_value_t = timing::READINESS_POLL_INTERVAL_SECS, global = true)]
    pub readiness_interval: u64,

    #[arg(long, env = "KUBECTL", default_value = "kubectl", global = true)]
    pub kubectl: String,

    #[arg(long, env = "HELM", default_value = "helm", global = true)]
    pub helm: String,

    /// Kubeconfig file; the usual discovery rules apply when unset
    #[arg(long, env = "GATEWAY_KUBECONFIG", global = true)]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long, env = "GATEWAY_CONTEXT", global = true)]
    pub context: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            credentials_file: PathBuf::from(files::CREDENTIALS),
            values_file: PathBuf::from(files::VALUES),
            values_template: PathBuf::from(files::VALUES_TEMPLATE),
            manifests_dir: PathBuf::from(files::MANIFESTS_DIR),
            chart: DEFAULT_CHART.to_string(),
            namespace: None,
            backend: Backend::Kubectl,
            secret_strategy: SecretStrategy::DeleteCreate,
            database_timeout: timing::DATABASE_TIMEOUT_SECS,
            workload_timeout: timing::WORKLOAD_TIMEOUT_SECS,
            address_attempts: timing::ADDRESS_POLL_ATTEMPTS,
            address_interval: timing::ADDRESS_POLL_INTERVAL_SECS,
            readiness_interval: timing::READINESS_POLL_INTERVAL_SECS,
            kubectl: "kubectl".to_string(),
            helm: "helm".to_string(),
            kubeconfig: None,
            context: None,
        }
    }
}

impl Config {
    /// External executables the selected backend shells out to
    pub fn required_tools(&self) -> Vec<&str> {
        match self.backend {
            Backend::Kubectl => vec![self.kubectl.as_str(), self.helm.as_str()],
            Backend::Api => vec![self.helm.as_str()],
        }
    }

    pub fn manifest(&self, name: &str) -> PathBuf {
        self.manifests_dir.join(name)
    }

    pub fn database_timeout(&self) -> Duration {
        Duration::from_secs(self.database_timeout)
    }

    pub fn workload_timeout(&self) -> Duration {
        Duration::from_secs(self.workload_timeout)
    }

    pub fn readiness_interval(&self) -> Duration {
        Duration::from_secs(self.readiness_interval)
    }

    /// Polling policy for the load-balancer address
    pub fn address_poll(&self) -> PollPolicy {
        PollPolicy::new(
            self.address_attempts,
            Duration::from_secs(self.address_interval),
        )
    }
}
