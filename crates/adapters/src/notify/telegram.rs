// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Telegram consumer: formatting, noise filter, duplicate suppression,
//! and the Bot-API send.

use super::{NotifyError, NotifySink};
use async_trait::async_trait;
use ixado_core::{EventPayload, NoiseLevel, PhaseStatus, RuntimeEvent, TaskStatus};
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// Default bound on remembered notification keys per session.
pub const DELIVERED_KEY_CAP: usize = 512;

/// Format an event as the single line sent to Telegram.
pub fn format_telegram(event: &RuntimeEvent) -> String {
    let label = event.context.label();
    let prefix = if label.is_empty() {
        String::new()
    } else {
        format!("{label}: ")
    };
    match &event.payload {
        EventPayload::TaskStart {
            assignee,
            resume,
            message,
        } => {
            let verb = if *resume { "resumed" } else { "started" };
            format!("{prefix}task {verb} on {assignee} — {message}")
        }
        EventPayload::TaskProgress { message } => format!("{prefix}{message}"),
        EventPayload::PhaseUpdate { status, message } => match message {
            Some(m) => format!("{prefix}phase → {status} — {m}"),
            None => format!("{prefix}phase → {status}"),
        },
        EventPayload::TaskFinish { status, message } => {
            format!("{prefix}task finished: {status} — {message}")
        }
        EventPayload::AdapterOutput { stream, line, .. } => {
            format!("{prefix}[{stream}] {line}")
        }
        EventPayload::TesterActivity { stage, summary, .. } => {
            format!("{prefix}tester {stage}: {summary}")
        }
        EventPayload::RecoveryActivity {
            stage,
            summary,
            attempt_number,
            category,
        } => {
            let mut line = format!("{prefix}recovery {stage}");
            if let Some(n) = attempt_number {
                line.push_str(&format!(" (attempt {n})"));
            }
            if let Some(c) = category {
                line.push_str(&format!(" [{c}]"));
            }
            line.push_str(&format!(": {summary}"));
            line
        }
        EventPayload::PrActivity {
            stage,
            summary,
            pr_url,
            ..
        } => match pr_url {
            Some(url) => format!("{prefix}PR {stage}: {summary} {url}"),
            None => format!("{prefix}PR {stage}: {summary}"),
        },
        EventPayload::CiActivity { stage, summary, .. } => {
            format!("{prefix}CI {stage}: {summary}")
        }
        EventPayload::TerminalOutcome {
            outcome,
            summary,
            exit_code,
            ..
        } => match exit_code {
            Some(code) => format!("{prefix}agent {outcome} (exit {code}): {summary}"),
            None => format!("{prefix}agent {outcome}: {summary}"),
        },
    }
}

/// Whether an event survives the configured noise level.
///
/// `all` passes everything. `important` drops routine chatter. `critical`
/// narrows to terminal outcomes, failure-ish transitions, and PR activity.
pub fn passes_noise_level(event: &RuntimeEvent, level: NoiseLevel) -> bool {
    match level {
        NoiseLevel::All => true,
        NoiseLevel::Important => match &event.payload {
            EventPayload::TaskStart { .. }
            | EventPayload::TaskProgress { .. }
            | EventPayload::AdapterOutput { .. } => false,
            EventPayload::TesterActivity { stage, .. } => stage != "started",
            EventPayload::CiActivity { stage, .. } => stage != "poll-transition",
            _ => true,
        },
        NoiseLevel::Critical => match &event.payload {
            EventPayload::TerminalOutcome { .. } => true,
            EventPayload::PrActivity { .. } => true,
            EventPayload::PhaseUpdate { status, .. } => matches!(
                status,
                PhaseStatus::CiFailed | PhaseStatus::ReadyForReview
            ),
            EventPayload::TaskFinish { status, .. } => *status == TaskStatus::Failed,
            EventPayload::TesterActivity { stage, .. }
            | EventPayload::RecoveryActivity { stage, .. } => {
                stage == "attempt-failed" || stage == "failed"
            }
            EventPayload::CiActivity { stage, .. } => {
                matches!(stage.as_str(), "failed" | "succeeded" | "validation-max-retries")
            }
            _ => false,
        },
    }
}

/// Bounded set of delivered notification keys.
///
/// `evaluate` returns true exactly once per key; the oldest keys are
/// evicted past the cap so a long session cannot grow without bound.
#[derive(Debug)]
pub struct DuplicateSuppressor {
    cap: usize,
    seen: HashSet<String>,
    order: VecDeque<String>,
}

impl DuplicateSuppressor {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            seen: HashSet::new(),
            order: VecDeque::new(),
        }
    }

    /// True when the event's key has not been delivered yet.
    pub fn evaluate(&mut self, event: &RuntimeEvent) -> bool {
        let key = event.notification_key();
        if self.seen.contains(&key) {
            return false;
        }
        if self.order.len() == self.cap {
            if let Some(evicted) = self.order.pop_front() {
                self.seen.remove(&evicted);
            }
        }
        self.seen.insert(key.clone());
        self.order.push_back(key);
        true
    }
}

impl Default for DuplicateSuppressor {
    fn default() -> Self {
        Self::new(DELIVERED_KEY_CAP)
    }
}

/// The Telegram consumer: filter → dedup → format → send.
#[derive(Clone)]
pub struct TelegramConsumer<S: NotifySink> {
    sink: S,
    noise_level: NoiseLevel,
    suppress_duplicates: bool,
    suppressor: Arc<Mutex<DuplicateSuppressor>>,
}

impl<S: NotifySink> TelegramConsumer<S> {
    pub fn new(sink: S, noise_level: NoiseLevel, suppress_duplicates: bool) -> Self {
        Self {
            sink,
            noise_level,
            suppress_duplicates,
            suppressor: Arc::new(Mutex::new(DuplicateSuppressor::default())),
        }
    }

    /// Handle one bus event; returns whether a message was sent.
    ///
    /// Send failures are logged and swallowed — a flaky Telegram API must
    /// not stop the execution loop.
    pub async fn handle(&self, event: &RuntimeEvent) -> bool {
        if !passes_noise_level(event, self.noise_level) {
            return false;
        }
        if self.suppress_duplicates && !self.suppressor.lock().evaluate(event) {
            return false;
        }
        let text = format_telegram(event);
        match self.sink.send(&text).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "telegram send failed");
                false
            }
        }
    }
}

/// Bot-API sink: POST `sendMessage` to api.telegram.org.
#[derive(Clone)]
pub struct TelegramSink {
    client: reqwest::Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramSink {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
        }
    }
}

#[async_trait]
impl NotifySink for TelegramSink {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
            "disable_web_page_preview": true,
        });
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::SendFailed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(NotifyError::SendFailed(format!(
                "telegram API returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "telegram_tests.rs"]
mod tests;
