// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Package operations through the `helm` command line

use crate::error::Result;
use crate::process::{check_output, CommandRunner};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// A chart installed under a release name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub name: String,
    pub chart: String,
    pub namespace: String,
    pub values_files: Vec<PathBuf>,
    pub timeout: Duration,
}

/// Install and inspect chart releases
#[async_trait]
pub trait PackageOps: Send + Sync {
    /// Install the release or upgrade it in place
    async fn upgrade_install(&self, release: &Release) -> Result<()>;

    /// Status of a release (e.g. "deployed"), `None` when not installed
    async fn release_status(&self, namespace: &str, name: &str) -> Result<Option<String>>;
}

#[derive(Deserialize, Debug)]
struct ReleaseStatus {
    info: ReleaseInfo,
}

#[derive(Deserialize, Debug)]
struct ReleaseInfo {
    status: String,
}

/// Runs `helm` through a [`CommandRunner`]
#[derive(Clone)]
pub struct HelmCli {
    runner: Arc<dyn CommandRunner>,
    program: String,
    kubeconfig: Option<PathBuf>,
    context: Option<String>,
}

impl HelmCli {
    pub fn new(runner: Arc<dyn CommandRunner>, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
            kubeconfig: None,
            context: None,
        }
    }

    pub fn with_kubeconfig(mut self, kubeconfig: Option<PathBuf>, context: Option<String>) -> Self {
        self.kubeconfig = kubeconfig;
        self.context = context;
        self
    }

    fn connection_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(path) = &self.kubeconfig {
            args.push(format!("--kubeconfig={}", path.display()));
        }
        if let Some(context) = &self.context {
            args.push(format!("--kube-context={}", context));
        }
        args
    }
}

/// Arguments of `helm upgrade --install`
pub fn upgrade_install_args(release: &Release) -> Vec<String> {
    let mut args = vec![
        "upgrade".to_string(),
        "--install".to_string(),
        release.name.clone(),
        release.chart.clone(),
        "--namespace".to_string(),
        release.namespace.clone(),
    ];
    for file in &release.values_files {
        args.push("--values".to_string());
        args.push(file.display().to_string());
    }
    args.push(format!("--timeout={}s", release.timeout.as_secs()));
    args
}

#[async_trait]
impl PackageOps for HelmCli {
    #[instrument(skip(self, release), fields(release = %release.name, chart = %release.chart))]
    async fn upgrade_install(&self, release: &Release) -> Result<()> {
        let mut args = upgrade_install_args(release);
        args.extend(self.connection_args());

        let output = self.runner.run(&self.program, &args, None).await?;
        check_output(&self.program, &args, output)?;
        info!("Release {} installed", release.name);
        Ok(())
    }

    async fn release_status(&self, namespace: &str, name: &str) -> Result<Option<String>> {
        let mut args: Vec<String> = ["status", name, "--namespace", namespace, "-o", "json"]
            .iter()
            .map(|a| a.to_string())
            .collect();
        args.extend(self.connection_args());

        let output = self.runner.run(&self.program, &args, None).await?;
        if !output.success() && output.is_not_found() {
            return Ok(None);
        }
        let output = check_output(&self.program, &args, output)?;
        let status: ReleaseStatus = serde_json::from_str(&output.stdout)?;
        Ok(Some(status.info.status))
    }
}
