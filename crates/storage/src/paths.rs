// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File locations for a project and the controller home.
//!
//! Every path has a documented default under `<home>/.ixado/` or the
//! project root and an `IXADO_*` environment override. Overrides are read
//! at construction time so a long-lived process sees a stable layout.

use std::path::{Path, PathBuf};

/// Environment override for the project state file.
pub const ENV_STATE_FILE: &str = "IXADO_STATE_FILE";
/// Environment override for the controller-wide config file.
pub const ENV_GLOBAL_CONFIG_FILE: &str = "IXADO_GLOBAL_CONFIG_FILE";
/// Environment override for the project settings file.
pub const ENV_SETTINGS_FILE: &str = "IXADO_SETTINGS_FILE";
/// Environment override for the CLI log file.
pub const ENV_CLI_LOG_FILE: &str = "IXADO_CLI_LOG_FILE";
/// Environment override for the web runtime descriptor.
pub const ENV_WEB_RUNTIME_FILE: &str = "IXADO_WEB_RUNTIME_FILE";
/// Environment override for the web log file.
pub const ENV_WEB_LOG_FILE: &str = "IXADO_WEB_LOG_FILE";

/// Name of the dot-directory holding orchestrator files.
pub const DOT_DIR: &str = ".ixado";

/// Resolved file locations for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    root_dir: PathBuf,
    home_dir: PathBuf,
    state_file: PathBuf,
    settings_file: PathBuf,
    global_config_file: PathBuf,
    registry_file: PathBuf,
    cli_log_file: PathBuf,
    web_runtime_file: PathBuf,
    web_log_file: PathBuf,
}

impl ProjectPaths {
    /// Resolve paths for `root_dir`, honoring `IXADO_*` overrides.
    pub fn resolve(root_dir: impl Into<PathBuf>) -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::resolve_with_home(root_dir, home)
    }

    /// Resolve with an explicit home directory (tests).
    pub fn resolve_with_home(root_dir: impl Into<PathBuf>, home: impl Into<PathBuf>) -> Self {
        let root_dir = root_dir.into();
        let home_dir = home.into().join(DOT_DIR);
        let project_dot = root_dir.join(DOT_DIR);

        let from_env = |var: &str, default: PathBuf| -> PathBuf {
            std::env::var_os(var)
                .map(PathBuf::from)
                .unwrap_or(default)
        };

        Self {
            state_file: from_env(ENV_STATE_FILE, project_dot.join("state.json")),
            settings_file: from_env(ENV_SETTINGS_FILE, project_dot.join("settings.json")),
            global_config_file: from_env(
                ENV_GLOBAL_CONFIG_FILE,
                home_dir.join("config.json"),
            ),
            registry_file: home_dir.join("agents.json"),
            cli_log_file: from_env(ENV_CLI_LOG_FILE, home_dir.join("cli.log")),
            web_runtime_file: from_env(
                ENV_WEB_RUNTIME_FILE,
                home_dir.join("web-runtime.json"),
            ),
            web_log_file: from_env(ENV_WEB_LOG_FILE, home_dir.join("web.log")),
            root_dir,
            home_dir,
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// `<home>/.ixado`
    pub fn home_dir(&self) -> &Path {
        &self.home_dir
    }

    pub fn state_file(&self) -> &Path {
        &self.state_file
    }

    pub fn settings_file(&self) -> &Path {
        &self.settings_file
    }

    pub fn global_config_file(&self) -> &Path {
        &self.global_config_file
    }

    /// Shared agent registry, one per controller home.
    pub fn registry_file(&self) -> &Path {
        &self.registry_file
    }

    pub fn cli_log_file(&self) -> &Path {
        &self.cli_log_file
    }

    pub fn web_runtime_file(&self) -> &Path {
        &self.web_runtime_file
    }

    pub fn web_log_file(&self) -> &Path {
        &self.web_log_file
    }

    /// Advisory lock file serializing writes within one project.
    pub fn lock_file(&self) -> PathBuf {
        self.root_dir.join(DOT_DIR).join("state.lock")
    }
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
