// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    read_path       = { "Read src/lib.rs" },
    write_path      = { "Write /tmp/out.json" },
    edit_call       = { "Edit(crates/core/src/task.rs)" },
    bash_call       = { "Bash(cargo fmt)" },
    grep_call       = { "Grep(pattern)" },
    bare_unix_path  = { "crates/engine/src/runner.rs" },
    bare_path_line  = { "src/main.rs:42:7" },
    dotted_file     = { "Cargo.toml" },
)]
fn chatter_lines_are_detected(line: &str) {
    assert!(is_file_interaction_chatter(line), "{line}");
}

#[yare::parameterized(
    prose        = { "Now updating the parser to handle comments" },
    compile_line = { "Compiling ixado-core v0.1.0" },
    empty        = { "" },
    sentence     = { "All tests passing." },
)]
fn ordinary_lines_are_not_chatter(line: &str) {
    assert!(!is_file_interaction_chatter(line), "{line}");
}

#[yare::parameterized(
    error     = { "error[E0308]: mismatched types" },
    failed    = { "test result: FAILED. 1 passed; 1 failed" },
    timeout   = { "operation timeout after 30s" },
    exit_code = { "process finished with exit code 1" },
    denied    = { "Permission denied (publickey)" },
)]
fn terminal_keywords_are_detected(line: &str) {
    assert!(contains_terminal_keywords(line), "{line}");
}

#[test]
fn suppression_combines_the_three_rules() {
    // Plain chatter: suppressed.
    assert!(should_suppress("Read src/lib.rs"));
    // Chatter with a terminal keyword: kept.
    assert!(!should_suppress("Read src/lib.rs failed: permission denied"));
    // System marker lines: kept even when path-shaped.
    assert!(!should_suppress("[ixado][agent-runtime] {\"marker\":\"ixado.agent.runtime\"}"));
    // Ordinary prose: kept.
    assert!(!should_suppress("Implementing the retry loop"));
}
