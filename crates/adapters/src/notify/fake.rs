// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recording sink for tests.

use super::{NotifyError, NotifySink};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

/// One recorded send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyCall {
    pub text: String,
}

/// Sink that records every send; can be told to fail.
#[derive(Clone, Default)]
pub struct FakeNotifySink {
    calls: Arc<Mutex<Vec<NotifyCall>>>,
    fail: Arc<Mutex<bool>>,
}

impl FakeNotifySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<NotifyCall> {
        self.calls.lock().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.text.clone()).collect()
    }

    pub fn fail_next_sends(&self) {
        *self.fail.lock() = true;
    }
}

#[async_trait]
impl NotifySink for FakeNotifySink {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        if *self.fail.lock() {
            return Err(NotifyError::SendFailed("scripted failure".to_string()));
        }
        self.calls.lock().push(NotifyCall {
            text: text.to_string(),
        });
        Ok(())
    }
}
