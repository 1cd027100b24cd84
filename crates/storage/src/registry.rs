// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared on-disk agent registry.
//!
//! A JSON array of `AgentRecord` rows, shared across controller processes.
//! Loading is deliberately tolerant: unknown `adapterId` values are dropped
//! with the record kept, records violating the schema are skipped, and a
//! corrupt file yields an empty list with a logged warning. Every mutation
//! is read-modify-write with an atomic rename, so two controllers racing on
//! the same file produce a last-writer-wins view.

use ixado_core::{AgentId, AgentRecord};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Errors from registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("agent not found: {0}")]
    AgentNotFound(String),
    #[error("registry serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Handle to the registry file.
#[derive(Debug, Clone)]
pub struct RegistryFile {
    path: PathBuf,
}

impl RegistryFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all records, tolerating partial corruption.
    pub fn load(&self) -> Vec<AgentRecord> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot open agent registry");
                return Vec::new();
            }
        };
        let value: serde_json::Value = match serde_json::from_reader(BufReader::new(file)) {
            Ok(v) => v,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "corrupt agent registry, treating as empty"
                );
                return Vec::new();
            }
        };
        let Some(rows) = value.as_array() else {
            warn!(path = %self.path.display(), "agent registry is not an array, treating as empty");
            return Vec::new();
        };

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_value::<AgentRecord>(row.clone()) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(error = %e, "skipping malformed agent record");
                }
            }
        }
        records
    }

    /// Persist the full record list atomically.
    pub fn save(&self, records: &[AgentRecord]) -> Result<(), RegistryError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, records)?;
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Read-modify-write the whole table.
    ///
    /// Foreign rows (spawned by another controller) pass through untouched.
    pub fn mutate<R>(
        &self,
        f: impl FnOnce(&mut Vec<AgentRecord>) -> R,
    ) -> Result<R, RegistryError> {
        let mut records = self.load();
        let result = f(&mut records);
        self.save(&records)?;
        Ok(result)
    }

    /// Update one record in place.
    pub fn update(
        &self,
        id: &AgentId,
        f: impl FnOnce(&mut AgentRecord),
    ) -> Result<AgentRecord, RegistryError> {
        self.mutate(|records| {
            let record = records
                .iter_mut()
                .find(|r| &r.id == id)
                .ok_or_else(|| RegistryError::AgentNotFound(id.to_string()))?;
            f(record);
            Ok(record.clone())
        })?
    }

    /// Fetch one record.
    pub fn get(&self, id: &AgentId) -> Result<AgentRecord, RegistryError> {
        self.load()
            .into_iter()
            .find(|r| &r.id == id)
            .ok_or_else(|| RegistryError::AgentNotFound(id.to_string()))
    }

    /// Remove one record.
    pub fn remove(&self, id: &AgentId) -> Result<(), RegistryError> {
        self.mutate(|records| records.retain(|r| &r.id != id))
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
