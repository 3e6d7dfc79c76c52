// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Renders the deployment values into the manifest files before they are
//! applied. The files hold defaults; the values document decides the database
//! password, the public service name and port, the routed host and which
//! release the services select.

use crate::constants::{database, selectors};
use crate::error::{GatewayError, Result};
use crate::kubernetes::Manifest;
use crate::values::DeploymentValues;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Read a manifest file and patch every document with `values`
pub fn render(path: &Path, values: &DeploymentValues) -> Result<Manifest> {
    let contents = fs::read_to_string(path).map_err(|e| GatewayError::ManifestError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut rendered = Vec::new();
    for document in serde_yaml::Deserializer::from_str(&contents) {
        let mut value = Value::deserialize(document).map_err(|e| GatewayError::ManifestError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if value.is_null() {
            continue;
        }
        patch(&mut value, values);
        rendered.push(serde_yaml::to_string(&value)?);
    }

    debug!("Rendered {} documents from {}", rendered.len(), path.display());
    Ok(Manifest::new(path, rendered.join("---\n")))
}

fn patch(document: &mut Value, values: &DeploymentValues) {
    let kind = document
        .get("kind")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let name = document
        .get("metadata")
        .and_then(|m| m.get("name"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    match kind.as_str() {
        "Secret" if name == database::SECRET_NAME => {
            set_path(
                document,
                &["stringData", database::PASSWORD_KEY],
                Value::from(values.database.password.as_str()),
            );
        }
        "Service" => patch_service(document, values),
        "HTTPRoute" if !values.exposure.host.is_empty() => {
            set_path(
                document,
                &["spec", "hostnames"],
                Value::Sequence(vec![Value::from(values.exposure.host.as_str())]),
            );
        }
        _ => {}
    }
}

fn patch_service(service: &mut Value, values: &DeploymentValues) {
    let selects_release = service
        .get("spec")
        .and_then(|s| s.get("selector"))
        .and_then(|s| s.get(selectors::RELEASE_INSTANCE))
        .is_some();
    if selects_release {
        set_path(
            service,
            &["spec", "selector", selectors::RELEASE_INSTANCE],
            Value::from(values.release_or_default()),
        );
    }

    let load_balancer = service
        .get("spec")
        .and_then(|s| s.get("type"))
        .and_then(Value::as_str)
        == Some("LoadBalancer");
    if !load_balancer {
        return;
    }

    set_path(
        service,
        &["metadata", "name"],
        Value::from(values.exposure.service_name.as_str()),
    );
    if let Some(port) = service
        .get_mut("spec")
        .and_then(|s| s.get_mut("ports"))
        .and_then(|p| p.get_mut(0))
        .and_then(Value::as_mapping_mut)
    {
        port.insert(
            Value::from("port"),
            Value::Number(u64::from(values.exposure.port).into()),
        );
    }
}

/// Set a nested mapping key, creating intermediate mappings. Non-mapping
/// values on the way are left untouched.
fn set_path(document: &mut Value, path: &[&str], new: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };

    let mut current = document;
    for key in parents {
        current = match current.as_mapping_mut() {
            Some(mapping) => mapping
                .entry(Value::from(*key))
                .or_insert_with(|| Value::Mapping(Mapping::new())),
            None => return,
        };
    }
    if let Some(mapping) = current.as_mapping_mut() {
        mapping.insert(Value::from(*last), new);
    }
}
