// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification sinks
//!
//! The Telegram consumer subscribes to the runtime event bus, formats each
//! event into a single line, applies the noise-level filter and duplicate
//! suppression, and forwards what survives through a [`NotifySink`]. The
//! transport (Bot API long-polling, commands) is outside the kernel; only
//! the outbound send lives here.

mod noop;
mod telegram;

pub use noop::NoOpNotifySink;
pub use telegram::{
    format_telegram, passes_noise_level, DuplicateSuppressor, TelegramConsumer, TelegramSink,
};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeNotifySink, NotifyCall};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from notify operations
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Outbound message sink for a notification channel
#[async_trait]
pub trait NotifySink: Clone + Send + Sync + 'static {
    /// Send one formatted line
    async fn send(&self, text: &str) -> Result<(), NotifyError>;
}
