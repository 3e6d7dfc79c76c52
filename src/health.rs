// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Single-request health check against the exposed gateway

use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Checks a URL once
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// HTTP status of a successful (2xx) response; anything else is an error
    async fn check(&self, url: &Url) -> Result<u16>;
}

/// HTTP(S) check with a bounded request time
#[derive(Debug, Clone)]
pub struct HttpHealthProbe {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpHealthProbe {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, timeout }
    }

    fn request_error(&self, url: &Url, e: reqwest::Error) -> GatewayError {
        if e.is_timeout() {
            GatewayError::HealthCheckError(format!(
                "no response from {} within {}s",
                url,
                self.timeout.as_secs()
            ))
        } else {
            GatewayError::HealthCheckError(format!("request to {} failed: {}", url, e))
        }
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    #[instrument(skip(self), fields(url = %url))]
    async fn check(&self, url: &Url) -> Result<u16> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.request_error(url, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.request_error(url, e))?;

        debug!("Health check returned {} ({} bytes)", status, body.len());
        if status.is_success() {
            Ok(status.as_u16())
        } else {
            Err(GatewayError::HealthCheckError(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body.trim()
            )))
        }
    }
}
