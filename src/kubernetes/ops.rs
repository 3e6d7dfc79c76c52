// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The cluster capability the orchestrator is written against

use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Outcome of a delete that tolerates an absent object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    Deleted,
    NotFound,
}

/// Something the orchestrator blocks on before continuing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitTarget {
    /// At least one pod matches the selector and all matching pods are Ready
    PodsReady { selector: String },
    /// At least one deployment matches the selector and all matching
    /// deployments report condition Available=True
    DeploymentsAvailable { selector: String },
}

impl fmt::Display for WaitTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitTarget::PodsReady { selector } => write!(f, "pods '{}' to be ready", selector),
            WaitTarget::DeploymentsAvailable { selector } => {
                write!(f, "deployments '{}' to be available", selector)
            }
        }
    }
}

/// A generic secret built from a single local file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretSource {
    pub name: String,
    pub key: String,
    pub path: PathBuf,
}

impl SecretSource {
    pub fn new(name: impl Into<String>, key: impl Into<String>, path: &Path) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            path: path.to_path_buf(),
        }
    }

    pub fn read(&self) -> Result<Vec<u8>> {
        Ok(fs::read(&self.path)?)
    }
}

/// Manifest documents rendered from a file, ready to apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// File the documents were rendered from
    pub path: PathBuf,
    pub contents: String,
}

impl Manifest {
    pub fn new(path: &Path, contents: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            contents: contents.into(),
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// One line of the status report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceState {
    pub kind: String,
    pub name: String,
    pub status: String,
}

/// Operations on named cluster resources
#[async_trait]
pub trait ClusterOps: Send + Sync {
    /// Fails with `ClusterUnreachable` when the API server cannot be reached
    async fn check_access(&self) -> Result<()>;

    async fn ensure_namespace(&self, namespace: &str) -> Result<()>;

    async fn delete_namespace(&self, namespace: &str) -> Result<Deletion>;

    async fn delete_secret(&self, namespace: &str, name: &str) -> Result<Deletion>;

    /// Create the secret; fails when it already exists
    async fn create_secret(&self, namespace: &str, secret: &SecretSource) -> Result<()>;

    /// Create or replace the secret in one request
    async fn apply_secret(&self, namespace: &str, secret: &SecretSource) -> Result<()>;

    async fn apply_manifest(&self, namespace: &str, manifest: &Manifest) -> Result<()>;

    /// Block until `target` holds; fails with `ReadinessTimeout` after `timeout`
    async fn wait_for(&self, namespace: &str, target: &WaitTarget, timeout: Duration) -> Result<()>;

    /// Address assigned to a LoadBalancer service; `None` while unassigned
    /// or when the service does not exist
    async fn load_balancer_address(&self, namespace: &str, service: &str) -> Result<Option<String>>;

    async fn list_resources(&self, namespace: &str) -> Result<Vec<ResourceState>>;

    async fn logs(&self, namespace: &str, selector: &str, tail: i64) -> Result<String>;
}
