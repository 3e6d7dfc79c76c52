// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cluster access: the operations the orchestrator needs and the two clients
//! implementing them (kubectl subprocess and direct API access).

pub mod api;
pub mod client;
pub mod kubectl;
pub mod namespaces;
pub mod ops;
pub mod resources;

pub use api::KubeApi;
pub use client::create_client;
pub use kubectl::KubectlCli;
pub use ops::{ClusterOps, Deletion, Manifest, ResourceState, SecretSource, WaitTarget};
