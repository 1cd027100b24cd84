// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch prompt composition.
//!
//! Each archetype gets a fixed system prefix followed by the task body.
//! The reviewer archetype reviews a concrete diff and therefore refuses
//! to compose without one.

use ixado_core::{Phase, Task, WorkerArchetype};
use thiserror::Error;

/// Errors from prompt composition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptError {
    #[error("reviewer dispatch requires a non-empty git-diff context")]
    MissingDiffContext,
}

fn archetype_prefix(archetype: WorkerArchetype) -> &'static str {
    match archetype {
        WorkerArchetype::Coder => {
            "You are the implementation worker for this project. Implement the \
             task below completely. Stage your changes with `git add --all` and \
             commit them with a descriptive message when you are done."
        }
        WorkerArchetype::Tester => {
            "You are the test worker for this project. Run the relevant test \
             suites for the task below, fix trivially broken tests, and report \
             every remaining failure verbatim."
        }
        WorkerArchetype::Reviewer => {
            "You are the review worker for this project. Review the diff below \
             against the task description. Report concrete defects with file \
             and line references; do not restate the diff."
        }
        WorkerArchetype::Fixer => {
            "You are the CI-fix worker for this project. The task below \
             describes a failing CI check on the current branch. Reproduce the \
             failure locally if possible, fix it, and commit the fix."
        }
    }
}

/// Compose the full prompt for dispatching `task` within `phase`.
///
/// `diff_context` is mandatory for the reviewer archetype and ignored when
/// empty for the others.
pub fn compose_prompt(
    archetype: WorkerArchetype,
    phase: &Phase,
    task: &Task,
    diff_context: Option<&str>,
) -> Result<String, PromptError> {
    let diff = diff_context.map(str::trim).filter(|d| !d.is_empty());
    if archetype == WorkerArchetype::Reviewer && diff.is_none() {
        return Err(PromptError::MissingDiffContext);
    }

    let mut prompt = String::new();
    prompt.push_str(archetype_prefix(archetype));
    prompt.push_str("\n\n");
    prompt.push_str(&format!(
        "Project phase: {} (branch {})\n",
        phase.name, phase.branch_name
    ));
    prompt.push_str(&format!("Task: {}\n\n{}\n", task.title, task.description));
    if let Some(diff) = diff {
        prompt.push_str("\nDiff under review:\n");
        prompt.push_str(diff);
        prompt.push('\n');
    }
    Ok(prompt)
}

#[cfg(test)]
#[path = "prompts_tests.rs"]
mod tests;
