// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Failed to load kubeconfig: {0}")]
    KubeconfigError(String),

    #[error("Required tool '{0}' was not found on PATH")]
    ToolMissing(String),

    #[error("Credential file {} does not exist", .0.display())]
    CredentialsMissing(PathBuf),

    #[error("Cluster is not reachable: {0}")]
    ClusterUnreachable(String),

    #[error("Neither {} nor template {} exist", .values.display(), .template.display())]
    ValuesMissing { values: PathBuf, template: PathBuf },

    #[error(
        "Created {} from template; edit it and rerun. Fields to fill in: {}",
        .path.display(),
        .problems.join(", ")
    )]
    ValuesSeeded { path: PathBuf, problems: Vec<String> },

    #[error("Values file {} is incomplete: {}", .path.display(), .problems.join(", "))]
    InvalidValues { path: PathBuf, problems: Vec<String> },

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Timed out after {}s waiting for {target}", .timeout.as_secs())]
    ReadinessTimeout { target: String, timeout: Duration },

    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Namespace operation failed: {0}")]
    NamespaceError(String),

    #[error("Secret operation failed: {0}")]
    SecretError(String),

    #[error("Invalid manifest {}: {reason}", .path.display())]
    ManifestError { path: PathBuf, reason: String },

    #[error("Health check failed: {0}")]
    HealthCheckError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl GatewayError {
    /// Fatal readiness timeouts are distinguished from other failures in reports
    pub fn is_timeout(&self) -> bool {
        matches!(self, GatewayError::ReadinessTimeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
