//! End-to-end tests for the pulse binary
//!
//! Gated behind the `integration` feature flag. Run with:
//!
//! ```sh
//! cargo test -p pulse-cli --features integration
//! ```

#![cfg(feature = "integration")]

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn pulse(data_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pulse"))
        .args(args)
        .env("PULSE_DATA_DIR", data_dir)
        .env("PULSE_PROJECT_CONFIG_DIR", data_dir.join("project"))
        .env("XDG_CONFIG_HOME", data_dir.join("xdg"))
        .env("RUST_LOG", "warn")
        .output()
        .expect("Failed to run pulse")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Test that pulse --help lists every verb
#[test]
fn pulse_help_lists_verbs() {
    let tmp = TempDir::new().unwrap();
    let output = pulse(tmp.path(), &["--help"]);
    assert!(output.status.success());
    let text = stdout(&output);
    for verb in ["analyze", "verify", "recommend", "report", "all"] {
        assert!(text.contains(verb), "missing {verb}");
    }
}

/// Unmet preconditions are diagnostics, not failures
#[test]
fn pulse_recommend_before_analyze_exits_cleanly() {
    let tmp = TempDir::new().unwrap();
    let output = pulse(tmp.path(), &["recommend"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("recommend: skipped"));
    assert!(!tmp.path().join("recommendation.json").exists());
}

/// The run-all verb takes a fresh history to a published recommendation
#[test]
fn pulse_all_runs_full_loop() {
    let tmp = TempDir::new().unwrap();
    let history = r#"[
        {"id": "1", "posted_at": "2026-03-02T08:00:00Z", "theme": "career", "type": "story",
         "content": "Why I stopped chasing titles",
         "metrics": {"impressions": 1500, "likes": 40, "replies": 6, "bookmarks": 9}},
        {"id": "2", "posted_at": "2026-03-03T19:00:00Z", "theme": "money", "type": "listicle",
         "content": "3 budgeting rules that stuck",
         "metrics": {"impressions": 900, "likes": 12}}
    ]"#;
    fs::write(tmp.path().join("post_history.json"), history).unwrap();

    let output = pulse(tmp.path(), &["all"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let text = stdout(&output);
    assert!(text.contains("analyze: scored 2 posts"));
    assert!(text.contains("verify: skipped"));
    assert!(text.contains("Posts analyzed: 2"));
    assert!(tmp.path().join("learning_state.json").exists());
    assert!(tmp.path().join("recommendation.json").exists());
    assert!(!tmp.path().join("learning_state.lock").exists());
}

/// A malformed config file fails loudly
#[test]
fn pulse_rejects_malformed_config() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("project")).unwrap();
    fs::write(tmp.path().join("project/config.toml"), "[reward\n").unwrap();
    let output = pulse(tmp.path(), &["report"]);
    assert!(!output.status.success());
}
