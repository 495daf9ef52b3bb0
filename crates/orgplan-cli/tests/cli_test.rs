//! End-to-end tests for the `orgplan` binary.
//!
//! Every command runs with a private `XDG_CONFIG_HOME` and without API keys
//! so no test touches the network or the user's config.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

use orgplan_core::Oag;
use orgplan_core::graph::BudgetPolicy;
use orgplan_test_utils::sample_prd_json;

fn orgplan(config_home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_orgplan"));
    cmd.env("XDG_CONFIG_HOME", config_home)
        .env_remove("ORGPLAN_API_KEY")
        .env_remove("OPENAI_API_KEY")
        .env_remove("ORGPLAN_MODE")
        .env("RUST_LOG", "warn");
    cmd
}

fn run(cmd: &mut Command) -> Output {
    cmd.output()
        .unwrap_or_else(|e| panic!("failed to run orgplan: {e}"))
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn write_prd(dir: &Path, objectives: usize) -> std::path::PathBuf {
    let path = dir.join("prd.json");
    std::fs::write(&path, sample_prd_json(objectives).to_string()).unwrap();
    path
}

#[test]
fn plan_offline_writes_oag_and_summary() {
    let tmp = TempDir::new().unwrap();
    let prd = write_prd(tmp.path(), 2);
    let out = tmp.path().join("oag.json");

    let output = run(orgplan(tmp.path())
        .args(["plan", "--offline", "--budget", "150", "--prd"])
        .arg(&prd)
        .arg("--out")
        .arg(&out));
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let text = stdout(&output);
    assert!(text.contains("Plan written to"), "stdout: {text}");
    assert!(text.contains("policy:   AGGRESSIVE"), "stdout: {text}");

    let oag = Oag::from_json(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(oag.budget.policy, BudgetPolicy::Aggressive);
    assert_eq!(oag.get_tasks().len(), 2);
    assert_eq!(oag.meta.title, "Atlas");
}

#[test]
fn plan_without_api_key_falls_back_online() {
    let tmp = TempDir::new().unwrap();
    let prd = write_prd(tmp.path(), 4);
    let out = tmp.path().join("plan.json");

    let output = run(orgplan(tmp.path())
        .args(["plan", "--budget", "50", "--prd"])
        .arg(&prd)
        .arg("--out")
        .arg(&out));
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let oag = Oag::from_json(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(oag.budget.policy, BudgetPolicy::Balanced);
    assert_eq!(oag.dependency_edges().len(), 3);
}

#[test]
fn plan_honours_offline_env() {
    let tmp = TempDir::new().unwrap();
    let prd = write_prd(tmp.path(), 0);
    let out = tmp.path().join("oag.json");

    let output = run(orgplan(tmp.path())
        .env("ORGPLAN_MODE", "offline")
        .args(["plan", "--budget", "10", "--prd"])
        .arg(&prd)
        .arg("--out")
        .arg(&out));
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let oag = Oag::from_json(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(oag.budget.policy, BudgetPolicy::Conservative);
    assert_eq!(oag.get_tasks().len(), 1);
}

#[test]
fn plan_fails_on_missing_prd() {
    let tmp = TempDir::new().unwrap();
    let output = run(orgplan(tmp.path())
        .args(["plan", "--offline", "--budget", "10", "--prd"])
        .arg(tmp.path().join("nope.json")));
    assert!(!output.status.success());
    assert!(stderr(&output).contains("failed to read PRD file"), "stderr: {}", stderr(&output));
}

#[test]
fn plan_rejects_negative_budget() {
    let tmp = TempDir::new().unwrap();
    let prd = write_prd(tmp.path(), 1);
    let output = run(orgplan(tmp.path())
        .args(["plan", "--offline", "--budget=-5", "--prd"])
        .arg(&prd));
    assert!(!output.status.success());
    assert!(stderr(&output).contains("budget must be"), "stderr: {}", stderr(&output));
}

#[test]
fn show_prints_forest_and_tasks() {
    let tmp = TempDir::new().unwrap();
    let prd = write_prd(tmp.path(), 3);
    let out = tmp.path().join("oag.json");
    let planned = run(orgplan(tmp.path())
        .args(["plan", "--offline", "--budget", "80", "--prd"])
        .arg(&prd)
        .arg("--out")
        .arg(&out));
    assert!(planned.status.success(), "stderr: {}", stderr(&planned));

    let output = run(orgplan(tmp.path()).arg("show").arg(&out));
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.starts_with("Atlas (saas)"), "stdout: {text}");
    assert!(text.contains("  CEO [C_SUITE]"), "stdout: {text}");
    assert!(text.contains("1. Deliver capability 1"), "stdout: {text}");
    assert!(text.contains("after #2"), "stdout: {text}");
}

#[test]
fn show_rejects_broken_documents() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("broken.json");
    std::fs::write(&path, "{\"meta\": 1}").unwrap();
    let output = run(orgplan(tmp.path()).arg("show").arg(&path));
    assert!(!output.status.success());
    assert!(stderr(&output).contains("invalid plan file"), "stderr: {}", stderr(&output));
}

#[test]
fn schema_prints_design_schema() {
    let tmp = TempDir::new().unwrap();
    let output = run(orgplan(tmp.path()).arg("schema"));
    assert!(output.status.success());
    let schema: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(schema["type"], "object");
    assert!(schema["properties"]["agents"].is_object());
    assert!(schema["properties"]["budget_policy"]["enum"].is_array());
}

#[test]
fn init_writes_config_and_refuses_overwrite() {
    let tmp = TempDir::new().unwrap();
    let output = run(orgplan(tmp.path()).args(["init", "--model", "gpt-4o"]));
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let path = tmp.path().join("orgplan").join("config.toml");
    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("[reasoning]"));
    assert!(contents.contains("model = \"gpt-4o\""));

    let again = run(orgplan(tmp.path()).arg("init"));
    assert!(!again.status.success());
    assert!(stderr(&again).contains("already exists"), "stderr: {}", stderr(&again));

    let forced = run(orgplan(tmp.path()).args(["init", "--force"]));
    assert!(forced.status.success(), "stderr: {}", stderr(&forced));
}

#[test]
fn completions_are_generated() {
    let tmp = TempDir::new().unwrap();
    let output = run(orgplan(tmp.path()).args(["completions", "bash"]));
    assert!(output.status.success());
    assert!(stdout(&output).contains("orgplan"));
}
