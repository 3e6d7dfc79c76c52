// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// The field manager name used for server-side apply
pub const FIELD_MANAGER: &str = "gatewayctl";

/// Namespace used when neither the values file nor the CLI names one
pub const DEFAULT_NAMESPACE: &str = "llm-gateway";

/// Default Helm release name of the gateway workload
pub const DEFAULT_RELEASE: &str = "llm-gateway";

/// Default chart reference for the gateway workload
pub const DEFAULT_CHART: &str = "oci://ghcr.io/berriai/litellm-helm";

/// Input files read from the working directory
pub mod files {
    pub const CREDENTIALS: &str = "credentials.json";
    pub const VALUES: &str = "values.yaml";
    pub const VALUES_TEMPLATE: &str = "values.example.yaml";
    pub const MANIFESTS_DIR: &str = "k8s";
}

/// Manifest file names inside the manifests directory
pub mod manifests {
    pub const DATABASE: &str = "postgres.yaml";
    pub const CONFIGURATION: &str = "configmap.yaml";
    pub const LOAD_BALANCER: &str = "service.yaml";
    pub const GATEWAY_ROUTE: &str = "gateway-route.yaml";
}

/// The cloud provider credential secret
pub mod secret {
    /// Well-known name of the secret holding the credential file
    pub const NAME: &str = "gateway-cloud-credentials";
    /// Key under which the credential file is stored
    pub const KEY: &str = "credentials.json";
}

/// Credentials secret declared in the database manifest
pub mod database {
    pub const SECRET_NAME: &str = "postgres-credentials";
    pub const PASSWORD_KEY: &str = "password";
}

/// Label selectors
pub mod selectors {
    /// Pods of the database dependency
    pub const DATABASE: &str = "app=postgres";
    /// Label key Helm charts put on the pods of a release
    pub const RELEASE_INSTANCE: &str = "app.kubernetes.io/instance";
}

/// Timing defaults
pub mod timing {
    /// Bounded wait for the database pods to become ready
    pub const DATABASE_TIMEOUT_SECS: u64 = 300;
    /// Bounded wait for the gateway deployment to become available
    pub const WORKLOAD_TIMEOUT_SECS: u64 = 600;
    /// Attempts made to read the load-balancer address
    pub const ADDRESS_POLL_ATTEMPTS: u32 = 30;
    /// Fixed interval between address reads
    pub const ADDRESS_POLL_INTERVAL_SECS: u64 = 10;
    /// Interval between readiness checks while waiting
    pub const READINESS_POLL_INTERVAL_SECS: u64 = 2;
    /// Upper bound for the single health-check request
    pub const HEALTH_CHECK_TIMEOUT_SECS: u64 = 10;
}

/// Liveness endpoint served by the gateway
pub const HEALTH_PATH: &str = "/health/liveliness";
