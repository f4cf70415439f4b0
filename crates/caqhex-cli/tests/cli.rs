//! End-to-end tests for the caqhex CLI.

use assert_cmd::Command;
use predicates::prelude::*;

fn valid_caqh_text() -> String {
    let mut text = String::from(
        "--- Page 1 ---\n\
         CAQH ProView Data Summary\n\
         Provider Name: Jane Doe\n\
         Social Security Number: 123-45-6789\n\
         Individual NPI: 1234567890\n\
         Birth Date: 01/01/1980\n\
         Home address line with additional content here\n\
         Medicaid ID: 555666777\n\n\
         PRACTICE LOCATIONS\n\
         Practice Name: Positive Behavior Supports Corporation - Central Florida\n\
         Street 1: 907 Outer Rd\n\n\
         PROFESSIONAL LICENSE\n\
         License Number: ME-12345\n\
         Expiration Date: 06/30/2026\n",
    );
    for _ in 0..80 {
        text.push_str("Additional provider data summary education content.\n");
    }
    text
}

#[test]
fn test_process_emits_one_result_per_field() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("summary.txt");
    std::fs::write(&input, valid_caqh_text()).unwrap();

    let output = Command::cargo_bin("caqhex")
        .unwrap()
        .args(["process", input.to_str().unwrap()])
        .args(["--reference-date", "2025-01-01"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let result: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let field_results = result["field_results"].as_array().unwrap();
    assert_eq!(field_results.len(), 5);
    assert_eq!(result["passed_gate"], true);

    let ssn = field_results
        .iter()
        .find(|f| f["field_name"] == "ssn")
        .unwrap();
    assert_eq!(ssn["extracted_value"], "123-45-6789");
}

#[test]
fn test_process_wrong_document() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("resume.txt");
    std::fs::write(&input, "Curriculum Vitae\nJane Doe\nWork experience ...").unwrap();

    let output = Command::cargo_bin("caqhex")
        .unwrap()
        .args(["process", input.to_str().unwrap()])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let result: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(result["passed_gate"], false);
    for field in result["field_results"].as_array().unwrap() {
        assert_eq!(field["extraction_method"], "wrong_document");
        assert_eq!(field["confidence"], 0.0);
    }
}

#[test]
fn test_process_token_stream_json() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("tokens.json");
    let pages = serde_json::json!([
        {
            "number": 1,
            "tokens": [
                {"text": "Medicaid", "left": 10.0, "top": 100.0, "right": 48.0},
                {"text": "ID:", "left": 53.0, "top": 100.0, "right": 65.0},
                {"text": "555666777", "left": 71.0, "top": 100.0, "right": 115.0}
            ]
        }
    ]);
    std::fs::write(&input, serde_json::to_string(&pages).unwrap()).unwrap();

    let output = Command::cargo_bin("caqhex")
        .unwrap()
        .args(["process", input.to_str().unwrap()])
        .args(["--skip-gate", "--fields", "medicaid_id"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let result: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let field = &result["field_results"][0];
    assert_eq!(field["extracted_value"], "555666777");
}

#[test]
fn test_process_text_format() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("summary.txt");
    std::fs::write(&input, valid_caqh_text()).unwrap();

    Command::cargo_bin("caqhex")
        .unwrap()
        .args(["process", input.to_str().unwrap()])
        .args(["--format", "text", "--reference-date", "2025-01-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fields extracted:"))
        .stdout(predicate::str::contains("ssn"));
}

#[test]
fn test_missing_input_fails() {
    Command::cargo_bin("caqhex")
        .unwrap()
        .args(["process", "/nonexistent/input.txt"])
        .assert()
        .failure();
}

#[test]
fn test_config_init_writes_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");

    Command::cargo_bin("caqhex")
        .unwrap()
        .args(["config", "init", "--output", path.to_str().unwrap()])
        .assert()
        .success();

    let content = std::fs::read_to_string(&path).unwrap();
    let config: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert!(config["fields"]["medicaid_id"].is_object());
}

#[test]
fn test_batch_summary() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), valid_caqh_text()).unwrap();
    std::fs::write(dir.path().join("b.txt"), valid_caqh_text()).unwrap();
    let out_dir = dir.path().join("out");

    Command::cargo_bin("caqhex")
        .unwrap()
        .args(["batch", &format!("{}/*.txt", dir.path().display())])
        .args(["--output-dir", out_dir.to_str().unwrap()])
        .args(["--summary", "--reference-date", "2025-01-01"])
        .assert()
        .success();

    assert!(out_dir.join("a.json").exists());
    assert!(out_dir.join("b.json").exists());
    assert!(out_dir.join("summary.csv").exists());
}
