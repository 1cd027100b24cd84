// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::adapter::AdapterId;

#[test]
fn defaults_match_documented_values() {
    let s = Settings::default();
    assert!(!s.ci.enabled);
    assert_eq!(s.ci.ci_fix_max_fan_out, 10);
    assert_eq!(s.ci.ci_fix_max_depth, 3);
    assert_eq!(s.ci.poll_interval_ms, 15_000);
    assert_eq!(s.ci.terminal_observation_count, 2);
    assert_eq!(s.exception_recovery.max_attempts, 1);
    assert_eq!(s.telegram.noise_level, NoiseLevel::Important);
    assert!(s.telegram.suppress_duplicates);
}

#[test]
fn empty_document_parses_to_defaults() {
    let s: Settings = serde_json::from_str("{}").unwrap();
    assert_eq!(s, Settings::default());
}

#[test]
fn unknown_top_level_key_is_rejected() {
    let result: Result<Settings, _> = serde_json::from_str(r#"{"webhooks": {}}"#);
    assert!(result.is_err());
}

#[yare::parameterized(
    fan_out_high = { r#"{"ci":{"ciFixMaxFanOut":500}}"#, |s: &Settings| s.ci.ci_fix_max_fan_out == 50 },
    fan_out_zero = { r#"{"ci":{"ciFixMaxFanOut":0}}"#,   |s: &Settings| s.ci.ci_fix_max_fan_out == 1 },
    depth_high   = { r#"{"ci":{"ciFixMaxDepth":99}}"#,   |s: &Settings| s.ci.ci_fix_max_depth == 10 },
    observations = { r#"{"ci":{"terminalObservationCount":1}}"#, |s: &Settings| s.ci.terminal_observation_count == 2 },
    attempts     = { r#"{"exceptionRecovery":{"maxAttempts":50}}"#, |s: &Settings| s.exception_recovery.max_attempts == 10 },
)]
fn out_of_range_values_are_clamped(json: &str, check: fn(&Settings) -> bool) {
    let s: Settings = serde_json::from_str(json).unwrap();
    let s = s.clamped();
    assert!(check(&s));
}

#[test]
fn zero_recovery_attempts_is_allowed() {
    let s: Settings = serde_json::from_str(r#"{"exceptionRecovery":{"maxAttempts":0}}"#).unwrap();
    let s = s.clamped();
    assert_eq!(s.exception_recovery.max_attempts, 0);
}

#[test]
fn adapter_overrides_are_keyed_by_wire_name() {
    let json = r#"{
        "adapters": {
            "CLAUDE_CLI": { "timeoutMs": 120000 },
            "MOCK_CLI": { "command": "/bin/echo", "args": ["ok"] }
        }
    }"#;
    let s: Settings = serde_json::from_str(json).unwrap();
    assert_eq!(
        s.adapter(AdapterId::ClaudeCli).map(|a| a.timeout_ms),
        Some(120_000)
    );
    let mock = s.adapter(AdapterId::MockCli).unwrap();
    assert_eq!(mock.command.as_deref(), Some("/bin/echo"));
    assert_eq!(mock.startup_silence_timeout_ms, 60_000);
    assert!(s.adapter(AdapterId::CodexCli).is_none());
}

#[test]
fn noise_levels_parse_lowercase() {
    let s: Settings =
        serde_json::from_str(r#"{"telegram":{"noiseLevel":"critical"}}"#).unwrap();
    assert_eq!(s.telegram.noise_level, NoiseLevel::Critical);
}
