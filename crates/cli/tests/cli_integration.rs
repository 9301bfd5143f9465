//! CLI integration tests for all subcommands.
//!
//! Uses `assert_cmd` to spawn the `waypoint` binary and verify exit
//! codes, stdout content, and stderr content.
//!
//! All tests set `current_dir` to the workspace root so that relative
//! paths to the fixtures under `crates/cli/tests/fixtures` resolve.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const CHECKOUT: &str = "crates/cli/tests/fixtures/checkout";

/// Locate the workspace root by walking up from CARGO_MANIFEST_DIR.
fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    // crates/cli -> workspace root is two levels up
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf()
}

/// Helper: create a Command for the `waypoint` binary, rooted at workspace.
fn waypoint() -> Command {
    let mut cmd = cargo_bin_cmd!("waypoint");
    cmd.current_dir(workspace_root());
    cmd.env_remove("WAYPOINT_LOG");
    cmd
}

fn fixture(name: &str) -> String {
    format!("{}/{}", CHECKOUT, name)
}

/// Arguments for a `step` run against the checkout fixtures.
fn step_args(event: &str) -> Vec<String> {
    vec![
        "step".into(),
        "--flow".into(),
        fixture("flow.json"),
        "--rules".into(),
        fixture("rules.json"),
        "--apis".into(),
        fixture("apis.json"),
        "--context".into(),
        fixture("context.json"),
        "--data".into(),
        fixture("data.json"),
        "--config".into(),
        fixture("waypoint.toml"),
        "--event".into(),
        event.into(),
    ]
}

fn step_json(event: &str) -> serde_json::Value {
    let out = waypoint().args(step_args(event)).output().unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    serde_json::from_slice(&out.stdout).unwrap()
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    waypoint()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Deterministic flow, rules and API orchestration runtime",
        ));
}

#[test]
fn version_exits_0() {
    waypoint()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("waypoint"));
}

#[test]
fn step_help_lists_flags() {
    waypoint()
        .args(["step", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--event"));
}

// ──────────────────────────────────────────────
// 2. Step subcommand
// ──────────────────────────────────────────────

#[test]
fn step_full_transition() {
    let v = step_json("submit");

    assert_eq!(v["nextStateId"], "confirmation");
    assert_eq!(v["uiPageId"], "confirmation-page");
    assert_eq!(v["updatedData"]["discount"], 0.1);
    assert_eq!(v["updatedData"]["status"], "submitted");
    assert_eq!(v["updatedData"]["orderId"], "o-1");
    assert_eq!(v["updatedContext"]["tenantId"], "acme");
    assert_eq!(v["trace"]["flow"]["reason"], "ok");
    assert_eq!(v["trace"]["rules"]["rulesMatched"][0], "bigOrderDiscount");
    assert_eq!(v["trace"]["rules"]["events"][0]["event"], "order.submitted");
    assert_eq!(v["trace"]["api"]["response"]["status"], 201);
    assert_eq!(v["trace"]["api"]["request"]["headers"]["X-Tenant"], "acme");
    assert!(v.get("error").is_none());
}

#[test]
fn step_simple_transition() {
    let v = step_json("next");
    assert_eq!(v["nextStateId"], "address");
    assert_eq!(v["uiPageId"], "address-page");
    assert!(v["trace"].get("rules").is_none());
    assert!(v["trace"].get("api").is_none());
}

#[test]
fn step_unknown_event_is_no_transition() {
    let v = step_json("teleport");
    assert_eq!(v["nextStateId"], "cart");
    assert_eq!(v["uiPageId"], "cart-page");
    assert_eq!(v["trace"]["flow"]["reason"], "no_transition");
    assert_eq!(v["updatedData"]["orderTotal"], 1200);
}

#[test]
fn step_is_deterministic_apart_from_timing() {
    let mut a = step_json("submit");
    let mut b = step_json("submit");
    for v in [&mut a, &mut b] {
        v["trace"]["startedAt"] = serde_json::json!("");
        v["trace"]["durationMs"] = serde_json::json!(0);
        v["trace"]["rules"]["durationMs"] = serde_json::json!(0);
        v["trace"]["api"]["durationMs"] = serde_json::json!(0);
    }
    assert_eq!(a, b);
}

#[test]
fn step_without_stub_route_records_transport_error() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("empty.toml");
    fs::write(&config, "[transport]\nmode = \"stub\"\n").unwrap();

    let mut args = step_args("submit");
    let pos = args.iter().position(|a| a == "--config").unwrap();
    args[pos + 1] = config.to_string_lossy().into_owned();

    let out = waypoint().args(&args).output().unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["nextStateId"], "confirmation");
    assert_eq!(v["trace"]["api"]["error"]["kind"], "transport");
    assert!(v["updatedData"].get("orderId").is_none());
}

#[test]
fn step_unknown_state_exits_1() {
    let mut args = step_args("submit");
    args.extend(["--state".to_string(), "limbo".to_string()]);
    waypoint()
        .args(&args)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("configuration error"));
}

#[test]
fn step_missing_file_exits_1() {
    waypoint()
        .args([
            "step",
            "--flow",
            "nonexistent_flow_xyz.json",
            "--context",
            fixture("context.json").as_str(),
            "--event",
            "next",
        ])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error reading"));
}

#[test]
fn step_bad_config_exits_1() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("bad.toml");
    fs::write(&config, "[transport]\nmode = \"carrier-pigeon\"\n").unwrap();

    let mut args = step_args("next");
    let pos = args.iter().position(|a| a == "--config").unwrap();
    args[pos + 1] = config.to_string_lossy().into_owned();

    waypoint()
        .args(&args)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid config"));
}

#[test]
fn step_json_output_errors_are_json() {
    let mut args = step_args("submit");
    args.extend(["--state".to_string(), "limbo".to_string()]);
    args.extend(["--output".to_string(), "json".to_string()]);
    waypoint()
        .args(&args)
        .assert()
        .failure()
        .stderr(predicate::str::contains("{\"error\":"));
}

#[test]
fn step_debug_logging_goes_to_stderr() {
    let out = waypoint()
        .args(step_args("next"))
        .env("WAYPOINT_LOG", "debug")
        .output()
        .unwrap();
    assert!(out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("transport configured"), "stderr: {}", stderr);
    assert!(stderr.contains("step inputs loaded"), "stderr: {}", stderr);
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["nextStateId"], "address");
}

#[test]
fn step_default_logging_is_quiet() {
    let out = waypoint().args(step_args("next")).output().unwrap();
    assert!(out.status.success());
    assert!(!String::from_utf8_lossy(&out.stderr).contains("transport configured"));
}

// ──────────────────────────────────────────────
// 3. Validate subcommand
// ──────────────────────────────────────────────

#[test]
fn validate_fixture_bundle() {
    waypoint()
        .args([
            "validate",
            "--flow",
            fixture("flow.json").as_str(),
            "--rules",
            fixture("rules.json").as_str(),
            "--apis",
            fixture("apis.json").as_str(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("valid"));
}

#[test]
fn validate_bad_target_exits_1() {
    let tmp = TempDir::new().unwrap();
    let flow = tmp.path().join("flow.json");
    fs::write(
        &flow,
        r#"{
            "version": "1",
            "flowId": "broken",
            "initialState": "a",
            "states": { "a": { "uiPageId": "p", "on": { "go": { "target": "nowhere" } } } }
        }"#,
    )
    .unwrap();

    waypoint()
        .args(["validate", "--flow"])
        .arg(&flow)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("nowhere"));
}

#[test]
fn validate_duplicate_rule_ids_json_output() {
    let tmp = TempDir::new().unwrap();
    let rules = tmp.path().join("rules.json");
    fs::write(
        &rules,
        r#"{
            "version": "7",
            "rules": [
                { "ruleId": "twice", "when": { "op": "all" } },
                { "ruleId": "twice", "when": { "op": "any" } }
            ]
        }"#,
    )
    .unwrap();

    let out = waypoint()
        .args(["--output", "json", "validate", "--flow", fixture("flow.json").as_str(), "--rules"])
        .arg(&rules)
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    let v: serde_json::Value = serde_json::from_slice(&out.stderr).unwrap();
    assert_eq!(v["valid"], false);
    assert!(v["errors"][0].as_str().unwrap().contains("twice"));
}

#[test]
fn validate_unknown_action_when_cross_checked() {
    let tmp = TempDir::new().unwrap();
    let rules = tmp.path().join("rules.json");
    fs::write(&rules, r#"{ "version": "1", "rules": [] }"#).unwrap();

    waypoint()
        .args(["validate", "--flow", fixture("flow.json").as_str(), "--apis", fixture("apis.json").as_str(), "--rules"])
        .arg(&rules)
        .assert()
        .failure()
        .stderr(predicate::str::contains("bigOrderDiscount"));
}

// ──────────────────────────────────────────────
// 4. Explain subcommand
// ──────────────────────────────────────────────

#[test]
fn explain_step_output_markdown() {
    let tmp = TempDir::new().unwrap();
    let saved = tmp.path().join("step.json");
    let out = waypoint().args(step_args("submit")).output().unwrap();
    assert!(out.status.success());
    fs::write(&saved, &out.stdout).unwrap();

    waypoint()
        .args(["explain", "--format", "markdown"])
        .arg(&saved)
        .assert()
        .success()
        .stdout(predicate::str::contains("## TRANSITION"))
        .stdout(predicate::str::contains("moved to `confirmation`"))
        .stdout(predicate::str::contains("data.discount: undefined -> 0.1"))
        .stdout(predicate::str::contains("## API CALL"));
}

#[test]
fn explain_bare_trace_terminal() {
    let tmp = TempDir::new().unwrap();
    let v = step_json("next");
    let saved = tmp.path().join("trace.json");
    fs::write(&saved, serde_json::to_string(&v["trace"]).unwrap()).unwrap();

    waypoint()
        .arg("explain")
        .arg(&saved)
        .assert()
        .success()
        .stdout(predicate::str::contains("TRANSITION"))
        .stdout(predicate::str::contains("completed without errors"));
}

#[test]
fn explain_rejects_non_trace() {
    let tmp = TempDir::new().unwrap();
    let saved = tmp.path().join("other.json");
    fs::write(&saved, r#"{ "hello": "world" }"#).unwrap();

    waypoint()
        .arg("explain")
        .arg(&saved)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("not a runtime trace"));
}
