// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

pub mod credentials;
pub mod manifests;
pub mod orchestrator;
pub mod report;

pub use credentials::{credential_secret, encode_key};
pub use orchestrator::{DeployOptions, DeployOutcome, HealthOutcome, Orchestrator};
pub use report::{Endpoint, StatusReport};
