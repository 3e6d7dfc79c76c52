// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The deployment values document.
//!
//! Helm consumes the whole file; only the keys the orchestrator itself needs
//! are modelled here and everything else is ignored.

use crate::constants::{DEFAULT_NAMESPACE, DEFAULT_RELEASE};
use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentValues {
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub release_name: String,
    #[serde(default)]
    pub master_key: String,
    #[serde(default)]
    pub cloud: CloudValues,
    #[serde(default)]
    pub database: DatabaseValues,
    #[serde(default)]
    pub exposure: ExposureValues,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudValues {
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub region: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseValues {
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExposureType {
    #[default]
    LoadBalancer,
    Gateway,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExposureValues {
    #[serde(default, rename = "type")]
    pub exposure_type: ExposureType,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Public host name routed by the API gateway
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_service_name() -> String {
    format!("{}-public", DEFAULT_RELEASE)
}

fn default_port() -> u16 {
    80
}

impl Default for ExposureValues {
    fn default() -> Self {
        Self {
            exposure_type: ExposureType::default(),
            service_name: default_service_name(),
            host: String::new(),
            port: default_port(),
        }
    }
}

impl DeploymentValues {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        // An empty document deserializes to null
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Load for read-only commands: a missing file yields defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!(
                "Values file {} not found, using defaults",
                path.display()
            );
            Ok(Self::default())
        }
    }

    /// Every problem that must be fixed before the document can be applied
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        let required = [
            ("namespace", &self.namespace),
            ("releaseName", &self.release_name),
            ("masterKey", &self.master_key),
            ("cloud.projectId", &self.cloud.project_id),
            ("cloud.region", &self.cloud.region),
            ("database.password", &self.database.password),
            ("exposure.serviceName", &self.exposure.service_name),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                problems.push(format!("{} is required", key));
            }
        }

        if !self.master_key.trim().is_empty() && !self.master_key.starts_with("sk-") {
            problems.push("masterKey must start with 'sk-'".to_string());
        }

        if self.exposure.exposure_type == ExposureType::Gateway && self.exposure.host.trim().is_empty()
        {
            problems.push("exposure.host is required when exposure.type is Gateway".to_string());
        }

        problems
    }

    pub fn namespace_or_default(&self) -> &str {
        non_empty_or(&self.namespace, DEFAULT_NAMESPACE)
    }

    pub fn release_or_default(&self) -> &str {
        non_empty_or(&self.release_name, DEFAULT_RELEASE)
    }

    /// Label selector matching the gateway pods of this release
    pub fn workload_selector(&self) -> String {
        format!(
            "{}={}",
            crate::constants::selectors::RELEASE_INSTANCE,
            self.release_or_default()
        )
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

/// Strict load used before mutating the cluster.
///
/// A missing values file is seeded from the template and the run stops so the
/// operator can fill it in; an incomplete file stops the run listing every
/// problem.
pub fn load_or_seed(values: &Path, template: &Path) -> Result<DeploymentValues> {
    if !values.exists() {
        if !template.exists() {
            return Err(GatewayError::ValuesMissing {
                values: values.to_path_buf(),
                template: template.to_path_buf(),
            });
        }

        fs::copy(template, values)?;
        info!(
            "Created {} from {}",
            values.display(),
            template.display()
        );

        let seeded = DeploymentValues::load(values)?;
        return Err(GatewayError::ValuesSeeded {
            path: values.to_path_buf(),
            problems: seeded.validate(),
        });
    }

    let loaded = DeploymentValues::load(values)?;
    let problems = loaded.validate();
    if !problems.is_empty() {
        return Err(GatewayError::InvalidValues {
            path: values.to_path_buf(),
            problems,
        });
    }

    Ok(loaded)
}
