// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime event bus.
//!
//! A bounded broadcast channel fanning RuntimeEvents out to the CLI
//! printer, the web SSE surface, and the Telegram consumer. Slow
//! subscribers lag (dropping the oldest events for that subscriber only);
//! emission never blocks the execution loop. Per-agent ordering follows
//! emission order.

use ixado_core::RuntimeEvent;
use tokio::sync::broadcast;

/// Default per-subscriber buffer.
pub const BUS_CAPACITY: usize = 1024;

/// Shared handle to the event bus.
#[derive(Clone, Debug)]
pub struct RuntimeBus {
    tx: broadcast::Sender<RuntimeEvent>,
}

impl RuntimeBus {
    pub fn new() -> Self {
        Self::with_capacity(BUS_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all current subscribers.
    ///
    /// Events emitted with no subscriber are dropped silently — the bus
    /// carries live traffic, persistence lives in the state file.
    pub fn emit(&self, event: RuntimeEvent) {
        let _ = self.tx.send(event);
    }

    /// Subscribe to all events from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<RuntimeEvent> {
        self.tx.subscribe()
    }

    /// Current subscriber count (diagnostics only).
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for RuntimeBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
