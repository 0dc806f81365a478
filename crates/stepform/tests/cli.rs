use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn stepform() -> Command {
    Command::cargo_bin("stepform").expect("binary built")
}

fn stdout_json(args: &[&str]) -> Value {
    let output = stepform().args(args).output().expect("command runs");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn inspect_lists_declared_and_visible_steps() {
    stepform()
        .arg("inspect")
        .arg(fixture("signup.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Form signup: 3 declared, 2 visible"))
        .stdout(predicate::str::contains("[ ] 1 State  when country == 'US'"))
        .stdout(predicate::str::contains("Step 1/2: Contact [0%]"));
}

#[test]
fn inspect_json_reports_visibility() {
    let document = fixture("signup.json");
    let value = stdout_json(&["inspect", document.to_str().unwrap(), "--json"]);
    let steps = &value[0]["steps"];
    assert_eq!(steps[0]["name"], "Contact");
    assert_eq!(steps[1]["visible"], false);
    assert_eq!(steps[1]["condition"], "country == 'US'");
    assert_eq!(value[0]["payload"]["status"], "active");
}

#[test]
fn run_replays_script_to_submission() {
    let document = fixture("signup.json");
    let script = fixture("signup_script.json");
    let value = stdout_json(&[
        "run",
        document.to_str().unwrap(),
        "--script",
        script.to_str().unwrap(),
        "--json",
    ]);

    assert_eq!(value["initial"]["progress"]["total"], 2);
    let steps = value["steps"].as_array().expect("steps array");
    assert_eq!(steps.len(), 11);
    assert!(steps[0]["outcome"].get("blocked").is_some());
    assert_eq!(steps[3]["outcome"]["recomputed"], 1);
    assert_eq!(steps[3]["payload"]["progress"]["total"], 3);
    assert_eq!(steps[4]["outcome"]["moved"]["to"], 1);
    assert_eq!(steps[8]["outcome"]["moved"]["to"], 1);
    assert_eq!(steps[10]["outcome"]["accepted"]["suspended"], 1);
    assert_eq!(steps[10]["payload"]["status"], "submitted");
}

#[test]
fn run_text_output_narrates_actions() {
    stepform()
        .arg("run")
        .arg(fixture("signup.json"))
        .arg("--script")
        .arg(fixture("signup_script.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("> next"))
        .stdout(predicate::str::contains("Step 2/3: State [50%]"))
        .stdout(predicate::str::contains("Form: signup (submitted)"));
}

#[test]
fn unknown_form_id_fails() {
    stepform()
        .arg("run")
        .arg(fixture("signup.json"))
        .arg("--script")
        .arg(fixture("signup_script.json"))
        .arg("--form")
        .arg("missing")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no step form with id 'missing'"));
}

#[test]
fn missing_document_is_reported() {
    stepform()
        .arg("inspect")
        .arg("does-not-exist.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read document"));
}

#[test]
fn config_file_renames_markers() {
    let temp = tempfile::TempDir::new().unwrap();
    let config = temp.path().join("wizard.toml");
    fs::write(
        &config,
        "[markers]\nstep = \"data-step\"\nstep_name = \"data-step-title\"\n",
    )
    .unwrap();
    let document = temp.path().join("form.json");
    fs::write(
        &document,
        r#"{
          "tag": "body",
          "children": [
            {
              "tag": "div",
              "attrs": { "ms": "wrapper", "id": "custom" },
              "children": [
                { "tag": "form", "children": [
                  { "tag": "div", "attrs": { "data-step": "", "data-step-title": "First" } },
                  { "tag": "div", "attrs": { "data-step": "", "data-step-title": "Second" } },
                  { "tag": "div", "attrs": { "ms-step": "ignored" } }
                ] }
              ]
            }
          ]
        }"#,
    )
    .unwrap();

    stepform()
        .arg("--config")
        .arg(&config)
        .arg("inspect")
        .arg(&document)
        .assert()
        .success()
        .stdout(predicate::str::contains("Form custom: 2 declared, 2 visible"))
        .stdout(predicate::str::contains("[x] 1 Second"));
}
