use assert_cmd::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::Command;

const PAGE: &str = "tests/fixtures/page.json";
const ANCHOR: &str = "tests/fixtures/anchor.json";

fn pointa() -> Command {
    let bin = assert_cmd::cargo::cargo_bin!("pointa-anchor");
    let mut cmd = Command::new(bin);
    cmd.env_remove("RUST_LOG");
    cmd
}

fn json_stdout(cmd: &mut Command) -> Value {
    let assert = cmd.assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 output");
    serde_json::from_str(&stdout).expect("valid json")
}

#[test]
fn synthesize_prefers_unique_id() {
    assert!(Path::new(PAGE).exists(), "fixture missing");

    let value = json_stdout(pointa().args([
        "--output",
        "json",
        "synthesize",
        "--snapshot",
        PAGE,
        "--target",
        "a",
    ]));
    assert_eq!(value["strategy"].as_str(), Some("id"));
    assert_eq!(value["markerInjected"].as_bool(), Some(false));
    assert_eq!(value["anchor"]["selector"].as_str(), Some("#logo"));
    assert_eq!(value["anchor"]["tagName"].as_str(), Some("a"));
    assert_eq!(value["anchor"]["schemaVersion"].as_u64(), Some(1));
}

#[test]
fn synthesized_report_resolves_back() {
    let dir = tempfile::tempdir().unwrap();
    let anchor_path = dir.path().join("anchor.json");

    let assert = pointa()
        .args(["--output", "json", "synthesize", "--snapshot", PAGE])
        .args(["--target", "li[data-testid=\"plan-pro\"]"])
        .assert()
        .success();
    fs::write(&anchor_path, &assert.get_output().stdout).unwrap();

    let value = json_stdout(pointa().args([
        "--output",
        "json",
        "resolve",
        "--snapshot",
        PAGE,
        "--anchor",
        anchor_path.to_str().unwrap(),
    ]));
    assert_eq!(value["found"].as_bool(), Some(true));
    assert_eq!(value["stage"].as_str(), Some("direct-selector"));
    assert_eq!(value["text"].as_str(), Some("Pro"));
}

#[test]
fn broken_selector_is_promoted() {
    let dir = tempfile::tempdir().unwrap();
    let promoted = dir.path().join("promoted.json");

    let value = json_stdout(pointa().args([
        "--output",
        "json",
        "resolve",
        "--snapshot",
        PAGE,
        "--anchor",
        ANCHOR,
        "--promote",
        promoted.to_str().unwrap(),
    ]));
    assert_eq!(value["found"].as_bool(), Some(true));
    assert_eq!(value["stage"].as_str(), Some("text-content"));
    assert_eq!(
        value["promotedSelector"].as_str(),
        Some("li[data-testid=\"plan-pro\"]")
    );

    let stored: Value = serde_json::from_str(&fs::read_to_string(&promoted).unwrap()).unwrap();
    assert_eq!(
        stored["selector"].as_str(),
        Some("li[data-testid=\"plan-pro\"]")
    );
    assert_eq!(stored["textSnippet"].as_str(), Some("Pro"));
}

#[test]
fn missing_element_is_reported_not_failed() {
    let dir = tempfile::tempdir().unwrap();
    let anchor_path = dir.path().join("gone.json");
    fs::write(
        &anchor_path,
        r#"{ "selector": "button.checkout", "tagName": "button", "textSnippet": "Checkout" }"#,
    )
    .unwrap();

    let value = json_stdout(pointa().args([
        "--output",
        "json",
        "resolve",
        "--snapshot",
        PAGE,
        "--anchor",
        anchor_path.to_str().unwrap(),
    ]));
    assert_eq!(value["found"].as_bool(), Some(false));
    assert_eq!(value["candidatesConsidered"].as_u64(), Some(0));
}

#[test]
fn malformed_anchor_fails() {
    let dir = tempfile::tempdir().unwrap();
    let anchor_path = dir.path().join("bad.json");
    fs::write(&anchor_path, r#"{ "selector": "li.plan", "textSnippet": "Pro" }"#).unwrap();

    let assert = pointa()
        .args(["resolve", "--snapshot", PAGE, "--anchor"])
        .arg(&anchor_path)
        .assert()
        .failure();
    let stderr = String::from_utf8(assert.get_output().stderr.clone()).unwrap();
    assert!(stderr.contains("Malformed anchor"), "{stderr}");
}

#[test]
fn write_back_keeps_snapshot_loadable() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("page.json");

    pointa()
        .args(["synthesize", "--snapshot", PAGE, "--index", "4", "--write-back"])
        .arg(&out)
        .assert()
        .success();

    let written: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(written["root"]["tag"].as_str(), Some("html"));
    assert_eq!(written["viewport"]["width"].as_f64(), Some(1280.0));
}

#[test]
fn target_is_required() {
    pointa()
        .args(["synthesize", "--snapshot", PAGE])
        .assert()
        .failure();
    pointa()
        .args(["synthesize", "--snapshot", PAGE, "--index", "99"])
        .assert()
        .failure();
}

#[test]
fn policy_layers_file_and_environment() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("locator.yaml");
    fs::write(&config, "position_threshold_px: 90.5\nmax_classes: 3\n").unwrap();

    let value = json_stdout(
        pointa()
            .env("POINTA_LOCATOR__MAX_CLASSES", "2")
            .arg("--config")
            .arg(&config)
            .args(["--output", "json", "policy"]),
    );
    assert_eq!(value["position_threshold_px"].as_f64(), Some(90.5));
    assert_eq!(value["max_classes"].as_u64(), Some(2));
    assert_eq!(value["marker_attribute"].as_str(), Some("data-pointa-id"));
}

#[test]
fn missing_config_file_fails() {
    pointa()
        .args(["--config", "does/not/exist.yaml", "policy"])
        .assert()
        .failure();
}
