// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator settings schema.
//!
//! Loaded from `<rootDir>/.ixado/settings.json` (override:
//! `IXADO_SETTINGS_FILE`); an absent file yields [`Settings::default`].
//! Unknown top-level keys are rejected; out-of-range numeric values are
//! clamped to their documented bounds with a warning.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Guardrail bounds for CI_FIX fanout.
pub const CI_FIX_MAX_FAN_OUT_LIMIT: u32 = 50;
/// Guardrail bounds for CI_FIX depth.
pub const CI_FIX_MAX_DEPTH_LIMIT: u32 = 10;
/// Upper bound on recovery attempts.
pub const RECOVERY_MAX_ATTEMPTS_LIMIT: u32 = 10;

/// CI integration settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CiSettings {
    #[serde(default)]
    pub enabled: bool,
    /// Maximum CI_FIX tasks created per CI failure (1..=50)
    #[serde(default = "default_ci_fix_max_fan_out")]
    pub ci_fix_max_fan_out: u32,
    /// Maximum CI_FIX → CI_FAILED cycles before aborting (1..=10)
    #[serde(default = "default_ci_fix_max_depth")]
    pub ci_fix_max_depth: u32,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Consecutive identical readings required for a terminal CI
    /// observation (minimum 2)
    #[serde(default = "default_terminal_observation_count")]
    pub terminal_observation_count: u32,
}

fn default_ci_fix_max_fan_out() -> u32 {
    10
}

fn default_ci_fix_max_depth() -> u32 {
    3
}

fn default_poll_interval_ms() -> u64 {
    15_000
}

fn default_terminal_observation_count() -> u32 {
    2
}

impl Default for CiSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            ci_fix_max_fan_out: default_ci_fix_max_fan_out(),
            ci_fix_max_depth: default_ci_fix_max_depth(),
            poll_interval_ms: default_poll_interval_ms(),
            terminal_observation_count: default_terminal_observation_count(),
        }
    }
}

/// Exception-recovery policy settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RecoverySettings {
    /// Remediation attempts before a failure is surfaced (0..=10)
    #[serde(default = "default_recovery_max_attempts")]
    pub max_attempts: u32,
}

fn default_recovery_max_attempts() -> u32 {
    1
}

impl Default for RecoverySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_recovery_max_attempts(),
        }
    }
}

/// Per-adapter overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AdapterSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(default = "default_adapter_timeout_ms")]
    pub timeout_ms: u64,
    /// Kill the adapter if it emits no output within this window
    #[serde(default = "default_startup_silence_timeout_ms")]
    pub startup_silence_timeout_ms: u64,
}

fn default_adapter_timeout_ms() -> u64 {
    3_600_000
}

fn default_startup_silence_timeout_ms() -> u64 {
    60_000
}

/// Telegram consumer noise level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseLevel {
    All,
    Important,
    Critical,
}

impl Default for NoiseLevel {
    fn default() -> Self {
        NoiseLevel::Important
    }
}

/// Telegram consumer settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TelegramSettings {
    #[serde(default)]
    pub noise_level: NoiseLevel,
    #[serde(default = "default_suppress_duplicates")]
    pub suppress_duplicates: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
}

fn default_suppress_duplicates() -> bool {
    true
}

/// Root settings document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub ci: CiSettings,
    #[serde(default)]
    pub exception_recovery: RecoverySettings,
    /// Keyed by adapter wire name (`CODEX_CLI`, ...)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub adapters: HashMap<String, AdapterSettings>,
    #[serde(default)]
    pub telegram: TelegramSettings,
}

impl Settings {
    /// Clamp out-of-range numeric values to their bounds.
    ///
    /// Returns the clamped settings; each adjustment logs a warning.
    pub fn clamped(mut self) -> Self {
        let fan_out = self.ci.ci_fix_max_fan_out.clamp(1, CI_FIX_MAX_FAN_OUT_LIMIT);
        if fan_out != self.ci.ci_fix_max_fan_out {
            tracing::warn!(
                configured = self.ci.ci_fix_max_fan_out,
                clamped = fan_out,
                "ciFixMaxFanOut out of range"
            );
            self.ci.ci_fix_max_fan_out = fan_out;
        }
        let depth = self.ci.ci_fix_max_depth.clamp(1, CI_FIX_MAX_DEPTH_LIMIT);
        if depth != self.ci.ci_fix_max_depth {
            tracing::warn!(
                configured = self.ci.ci_fix_max_depth,
                clamped = depth,
                "ciFixMaxDepth out of range"
            );
            self.ci.ci_fix_max_depth = depth;
        }
        let observations = self.ci.terminal_observation_count.max(2);
        if observations != self.ci.terminal_observation_count {
            tracing::warn!(
                configured = self.ci.terminal_observation_count,
                clamped = observations,
                "terminalObservationCount below minimum"
            );
            self.ci.terminal_observation_count = observations;
        }
        let attempts = self
            .exception_recovery
            .max_attempts
            .min(RECOVERY_MAX_ATTEMPTS_LIMIT);
        if attempts != self.exception_recovery.max_attempts {
            tracing::warn!(
                configured = self.exception_recovery.max_attempts,
                clamped = attempts,
                "exceptionRecovery.maxAttempts out of range"
            );
            self.exception_recovery.max_attempts = attempts;
        }
        self
    }

    /// Overrides for one adapter, if configured.
    pub fn adapter(&self, id: crate::adapter::AdapterId) -> Option<&AdapterSettings> {
        self.adapters.get(id.as_str())
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
