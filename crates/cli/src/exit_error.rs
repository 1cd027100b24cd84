// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI error rendering and exit codes.
//!
//! Validation errors print the `Error:/Usage:/Hint:` block; everything
//! else prints a single `Error:` line. Either way the process exits 1.

use ixado_engine::{RunnerError, ServiceError};
use std::fmt;

/// A user-actionable validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub message: String,
    pub usage: String,
    pub hint: String,
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Error: {}", self.message)?;
        writeln!(f, "  Usage: {}", self.usage)?;
        write!(f, "  Hint:  {}", self.hint)
    }
}

/// Extract a validation report when the error chain is a validation
/// failure; such errors are never wrapped as "Startup failed".
pub fn validation_report(error: &anyhow::Error) -> Option<ValidationReport> {
    if let Some(ServiceError::Validation {
        message,
        usage,
        hint,
    }) = error.downcast_ref::<ServiceError>()
    {
        return Some(ValidationReport {
            message: message.clone(),
            usage: usage.clone(),
            hint: hint.clone(),
        });
    }
    if let Some(RunnerError::Service(ServiceError::Validation {
        message,
        usage,
        hint,
    })) = error.downcast_ref::<RunnerError>()
    {
        return Some(ValidationReport {
            message: message.clone(),
            usage: usage.clone(),
            hint: hint.clone(),
        });
    }
    None
}

/// Render any error for stderr.
pub fn render(error: &anyhow::Error) -> String {
    match validation_report(error) {
        Some(report) => report.to_string(),
        None => format!("Error: {error:#}"),
    }
}

#[cfg(test)]
#[path = "exit_error_tests.rs"]
mod tests;
