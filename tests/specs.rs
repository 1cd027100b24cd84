//! Behavioral specifications for the IxADO orchestration kernel.
//!
//! These tests exercise the public crate APIs end-to-end against real
//! temp directories and the deterministic mock adapter; no vendor CLI is
//! required. See tests/specs/prelude.rs for the shared harness.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// state/
#[path = "specs/state/atomicity.rs"]
mod state_atomicity;
#[path = "specs/state/strict_active_phase.rs"]
mod state_strict_active_phase;

// orchestration/
#[path = "specs/orchestration/happy_path.rs"]
mod orchestration_happy_path;
#[path = "specs/orchestration/reconciliation.rs"]
mod orchestration_reconciliation;
#[path = "specs/orchestration/truncation.rs"]
mod orchestration_truncation;

// ci/
#[path = "specs/ci/fanout_cap.rs"]
mod ci_fanout_cap;

// consumers/
#[path = "specs/consumers/telegram_dedup.rs"]
mod consumers_telegram_dedup;

// cli/
#[path = "specs/cli/errors.rs"]
mod cli_errors;
