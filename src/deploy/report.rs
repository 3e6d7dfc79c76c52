// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Human-readable deployment status

use crate::constants::HEALTH_PATH;
use crate::kubernetes::ResourceState;
use std::fmt;
use url::Url;

/// Where the gateway can be reached from outside the cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Address assigned to the load-balancer service
    Assigned { address: String, port: u16 },
    /// Host name routed by the API gateway
    Routed { host: String },
    /// No address assigned yet
    Pending,
}

impl Endpoint {
    pub fn base_url(&self) -> Option<String> {
        match self {
            Endpoint::Assigned { address, port: 80 } => Some(format!("http://{}", address)),
            Endpoint::Assigned { address, port } => Some(format!("http://{}:{}", address, port)),
            Endpoint::Routed { host } => Some(format!("https://{}", host)),
            Endpoint::Pending => None,
        }
    }

    /// URL of the liveliness endpoint, when the gateway is reachable at all
    pub fn health_url(&self) -> Option<Url> {
        self.base_url()
            .and_then(|base| Url::parse(&format!("{}{}", base, HEALTH_PATH)).ok())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.base_url() {
            Some(url) => write!(f, "{}", url),
            None => write!(f, "pending"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub namespace: String,
    pub release: String,
    /// Helm release status, `None` when the release is not installed
    pub release_status: Option<String>,
    pub endpoint: Endpoint,
    pub resources: Vec<ResourceState>,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Namespace: {}", self.namespace)?;
        writeln!(
            f,
            "Release:   {} ({})",
            self.release,
            self.release_status.as_deref().unwrap_or("not installed")
        )?;
        writeln!(f, "Endpoint:  {}", self.endpoint)?;

        if self.resources.is_empty() {
            return writeln!(f, "Resources: none");
        }

        writeln!(f, "Resources:")?;
        let width = self
            .resources
            .iter()
            .map(|r| r.kind.len() + r.name.len() + 1)
            .max()
            .unwrap_or(0);
        for resource in &self.resources {
            let id = format!("{}/{}", resource.kind, resource.name);
            writeln!(f, "  {:<width$}  {}", id, resource.status, width = width)?;
        }
        Ok(())
    }
}
