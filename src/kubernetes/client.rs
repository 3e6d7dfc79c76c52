// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes client creation and kubeconfig utilities

use crate::config::Config;
use crate::error::{GatewayError, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config as KConfig};
use std::path::Path;
use tracing::{debug, instrument};

/// Create a Kubernetes client honouring the configured kubeconfig and context
#[instrument(skip(config))]
pub async fn create_client(config: &Config) -> Result<Client> {
    let client_config = match (&config.kubeconfig, &config.context) {
        (Some(path), context) => config_from_file(path, context.clone()).await?,
        (None, Some(context)) => KConfig::from_kubeconfig(&options(Some(context.clone())))
            .await
            .map_err(|e| {
                GatewayError::KubeconfigError(format!(
                    "Failed to load context {}: {}",
                    context, e
                ))
            })?,
        (None, None) => KConfig::infer()
            .await
            .map_err(|e| GatewayError::KubeconfigError(format!("Failed to infer config: {}", e)))?,
    };

    debug!("Using API server {}", client_config.cluster_url);

    Client::try_from(client_config)
        .map_err(|e| GatewayError::KubeconfigError(format!("Failed to create client: {}", e)))
}

/// Load a client configuration from an explicit kubeconfig file
async fn config_from_file(path: &Path, context: Option<String>) -> Result<KConfig> {
    let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
        GatewayError::KubeconfigError(format!(
            "Failed to read kubeconfig {}: {}",
            path.display(),
            e
        ))
    })?;

    KConfig::from_custom_kubeconfig(kubeconfig, &options(context))
        .await
        .map_err(|e| GatewayError::KubeconfigError(format!("Failed to create config: {}", e)))
}

fn options(context: Option<String>) -> KubeConfigOptions {
    KubeConfigOptions {
        context,
        ..Default::default()
    }
}
