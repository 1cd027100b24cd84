// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Settings file loading.

use ixado_core::Settings;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from settings loading.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings file is not valid JSON: {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("settings document violates the schema: {path}: {message}")]
    SchemaViolation { path: PathBuf, message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Load settings from `path`, clamping out-of-range values.
///
/// An absent file yields defaults; anything else must parse strictly.
pub fn load_settings(path: &Path) -> Result<Settings, SettingsError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Settings::default());
        }
        Err(e) => return Err(SettingsError::Io(e)),
    };
    let value: serde_json::Value =
        serde_json::from_str(&raw).map_err(|source| SettingsError::InvalidJson {
            path: path.to_path_buf(),
            source,
        })?;
    let settings: Settings =
        serde_json::from_value(value).map_err(|e| SettingsError::SchemaViolation {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    Ok(settings.clamped())
}

#[cfg(test)]
#[path = "settings_io_tests.rs"]
mod tests;
