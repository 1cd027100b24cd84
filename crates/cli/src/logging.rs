// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing setup for the CLI binary.
//!
//! Logs go to a file under `<home>/.ixado/` (stdout belongs to the event
//! printer). The file is rotated once on startup when it exceeds the size
//! cap.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Rotate the log once it exceeds 10 MiB.
const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;

/// Rename an oversized log to `.old`, replacing any previous rotation.
pub fn rotate_log_if_needed(path: &Path) {
    let Ok(metadata) = std::fs::metadata(path) else {
        return;
    };
    if metadata.len() <= MAX_LOG_BYTES {
        return;
    }
    let rotated = path.with_extension("log.old");
    let _ = std::fs::remove_file(&rotated);
    let _ = std::fs::rename(path, &rotated);
}

/// Install the file-backed subscriber; the returned guard must be held
/// for the lifetime of the process.
pub fn init(log_path: &Path) -> Option<WorkerGuard> {
    rotate_log_if_needed(log_path);
    let parent = log_path.parent()?;
    std::fs::create_dir_all(parent).ok()?;
    let file_name = log_path.file_name()?;
    let appender = tracing_appender::rolling::never(parent, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Some(guard)
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
