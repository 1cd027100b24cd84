//! Telegram duplicate suppression: identical events deliver once.

use ixado_adapters::notify::{DuplicateSuppressor, TelegramConsumer};
use ixado_adapters::FakeNotifySink;
use ixado_core::test_support;
use ixado_core::{
    EventContext, EventId, EventPayload, EventSource, ExceptionCategory, NoiseLevel, PhaseId,
    RuntimeEvent, TaskId,
};

fn recovery_event(event_id: &str) -> RuntimeEvent {
    RuntimeEvent::at(
        EventId::new(event_id),
        test_support::fixed_time(),
        EventSource::PhaseRunner,
        EventContext {
            phase_id: Some(PhaseId::new("p1")),
            task_id: Some(TaskId::new("t1")),
            ..Default::default()
        },
        EventPayload::RecoveryActivity {
            stage: "attempt-failed".to_string(),
            summary: "X".to_string(),
            attempt_number: Some(1),
            category: Some(ExceptionCategory::DirtyWorktree),
        },
    )
}

#[test]
fn evaluator_returns_true_then_false_for_identical_events() {
    let mut suppressor = DuplicateSuppressor::default();
    // Distinct event IDs, identical facts.
    assert!(suppressor.evaluate(&recovery_event("e1")));
    assert!(!suppressor.evaluate(&recovery_event("e2")));
}

#[tokio::test]
async fn consumer_sends_exactly_one_message_for_duplicates() {
    let sink = FakeNotifySink::new();
    let consumer = TelegramConsumer::new(sink.clone(), NoiseLevel::Important, true);

    assert!(consumer.handle(&recovery_event("e1")).await);
    assert!(!consumer.handle(&recovery_event("e2")).await);
    assert_eq!(sink.calls().len(), 1);
}

#[tokio::test]
async fn suppression_can_be_disabled() {
    let sink = FakeNotifySink::new();
    let consumer = TelegramConsumer::new(sink.clone(), NoiseLevel::Important, false);

    assert!(consumer.handle(&recovery_event("e1")).await);
    assert!(consumer.handle(&recovery_event("e2")).await);
    assert_eq!(sink.calls().len(), 2);
}
