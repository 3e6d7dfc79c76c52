// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The local cloud provider credential file

use crate::constants::secret;
use crate::error::{GatewayError, Result};
use crate::kubernetes::SecretSource;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fs;
use std::path::Path;

/// The cluster secret built from the credential file
pub fn credential_secret(path: &Path) -> SecretSource {
    SecretSource::new(secret::NAME, secret::KEY, path)
}

/// Base64 of the credential file, for pasting into the values document
pub fn encode_key(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(GatewayError::CredentialsMissing(path.to_path_buf()));
    }
    Ok(STANDARD.encode(fs::read(path)?))
}
