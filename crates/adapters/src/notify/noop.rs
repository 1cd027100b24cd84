// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op notification sink, used when Telegram is not configured.

use super::{NotifyError, NotifySink};
use async_trait::async_trait;

#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpNotifySink;

#[async_trait]
impl NotifySink for NoOpNotifySink {
    async fn send(&self, _text: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}
