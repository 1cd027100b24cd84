//! CI-fix fanout honors `ciFixMaxFanOut` and reports the created count.

use crate::prelude::*;
use ixado_core::{CiOverall, EventPayload, Settings, TaskStatus};
use ixado_adapters::{CiCheck, CiStatusReading};
use ixado_engine::PhaseRunOutcome;

fn ci_settings(fan_out: u32) -> Settings {
    let mut settings = Settings::default();
    settings.ci.enabled = true;
    settings.ci.ci_fix_max_fan_out = fan_out;
    settings.ci.ci_fix_max_depth = 3;
    settings.ci.poll_interval_ms = 10;
    settings
}

fn seven_failures() -> CiStatusReading {
    CiStatusReading {
        overall: CiOverall::Failure,
        checks: (0..7)
            .map(|i| CiCheck {
                name: format!("check-{i}"),
                conclusion: "FAILURE".to_string(),
                summary: String::new(),
            })
            .collect(),
    }
}

#[tokio::test]
async fn seven_failures_yield_exactly_three_fix_tasks() {
    let k = kernel(ci_settings(3));
    let phase = k.service().create_phase("P1", "p1").unwrap();
    k.service()
        .create_task(&phase.id, "T1", "Do X", mock_assignee(), vec![])
        .unwrap();

    // Two identical failure readings make the observation terminal; two
    // green readings let the fix round finish.
    k.gh.push_reading(seven_failures());
    k.gh.push_reading(seven_failures());
    k.gh.push_overall(CiOverall::Success);
    k.gh.push_overall(CiOverall::Success);

    let mut events = k.runner.bus().subscribe();
    let outcome = k.runner.run_active_phase().await.unwrap();
    assert!(matches!(outcome, PhaseRunOutcome::Completed(_)));

    let state = k.service().get_state().unwrap();
    let fix_titles: Vec<&str> = state.phases[0]
        .tasks
        .iter()
        .filter(|t| t.title.starts_with("Fix CI check:"))
        .map(|t| t.title.as_str())
        .collect();
    assert_eq!(fix_titles.len(), 3);
    assert_eq!(
        fix_titles,
        vec![
            "Fix CI check: check-0",
            "Fix CI check: check-1",
            "Fix CI check: check-2"
        ]
    );
    assert!(state.phases[0]
        .tasks
        .iter()
        .all(|t| t.status == TaskStatus::Done));

    // The ci.activity[stage=failed] event carried createdFixTaskCount=3.
    let mut reported = None;
    while let Ok(event) = events.try_recv() {
        if let EventPayload::CiActivity {
            stage,
            created_fix_task_count,
            ..
        } = event.payload
        {
            if stage == "failed" {
                reported = created_fix_task_count;
            }
        }
    }
    assert_eq!(reported, Some(3));
}
