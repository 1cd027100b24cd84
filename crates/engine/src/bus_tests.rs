// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ixado_core::{EventContext, EventPayload, EventSource};

fn progress(message: &str) -> RuntimeEvent {
    RuntimeEvent::now(
        EventSource::PhaseRunner,
        EventContext::default(),
        EventPayload::TaskProgress {
            message: message.to_string(),
        },
    )
}

#[tokio::test]
async fn subscribers_receive_events_in_order() {
    let bus = RuntimeBus::new();
    let mut rx = bus.subscribe();

    bus.emit(progress("one"));
    bus.emit(progress("two"));

    let first = rx.recv().await.unwrap();
    let second = rx.recv().await.unwrap();
    assert!(matches!(
        first.payload,
        EventPayload::TaskProgress { ref message } if message == "one"
    ));
    assert!(matches!(
        second.payload,
        EventPayload::TaskProgress { ref message } if message == "two"
    ));
}

#[tokio::test]
async fn emit_without_subscribers_does_not_block() {
    let bus = RuntimeBus::new();
    for i in 0..100 {
        bus.emit(progress(&format!("m{i}")));
    }
    assert_eq!(bus.subscriber_count(), 0);
}

#[tokio::test]
async fn each_subscriber_gets_its_own_copy() {
    let bus = RuntimeBus::new();
    let mut a = bus.subscribe();
    let mut b = bus.subscribe();

    bus.emit(progress("shared"));

    assert!(a.recv().await.is_ok());
    assert!(b.recv().await.is_ok());
}

#[tokio::test]
async fn late_subscriber_misses_earlier_events() {
    let bus = RuntimeBus::new();
    bus.emit(progress("before"));
    let mut rx = bus.subscribe();
    bus.emit(progress("after"));

    let got = rx.recv().await.unwrap();
    assert!(matches!(
        got.payload,
        EventPayload::TaskProgress { ref message } if message == "after"
    ));
}
