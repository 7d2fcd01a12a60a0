use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../tests/fixtures").join(name)
}

fn stdout_json(args: &[&str]) -> Value {
    let output = cargo_bin_cmd!("marginalia")
        .args(args)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    serde_json::from_slice(&output).expect("stdout should contain valid json")
}

#[test]
fn info_reports_counts_and_recent_entries() {
    let path = fixture("sample.json");
    let value = stdout_json(&["info", path.to_str().expect("utf-8 path"), "--recent", "2"]);

    assert_eq!(value["counts"]["highlights"], 2);
    assert_eq!(value["counts"]["notes"], 1);
    assert_eq!(value["counts"]["drawings"], 2);
    assert_eq!(value["counts"]["floatingTexts"], 1);
    assert_eq!(value["counts"]["total"], 6);

    let recent = value["recent"].as_array().expect("recent should be an array");
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0]["id"], "t1");
    assert_eq!(recent[1]["id"], "n1");
}

#[test]
fn search_matches_case_insensitively() {
    let path = fixture("sample.json");
    let value = stdout_json(&["search", path.to_str().expect("utf-8 path"), "importante"]);

    let results = value.as_array().expect("results should be an array");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["type"], "note");
    assert_eq!(results[0]["id"], "n1");
    assert_eq!(results[0]["text"], "⭐ IMPORTANTE: revisar");
}

#[test]
fn blank_search_returns_nothing() {
    let path = fixture("sample.json");
    let value = stdout_json(&["search", path.to_str().expect("utf-8 path"), "   "]);

    assert_eq!(value, Value::Array(Vec::new()));
}

#[test]
fn filter_by_type_and_color() {
    let path = fixture("sample.json");
    let value = stdout_json(&[
        "filter",
        path.to_str().expect("utf-8 path"),
        "--type",
        "highlight",
        "--type",
        "drawing",
        "--color",
        "blue",
    ]);

    assert_eq!(value["highlights"].as_array().map(Vec::len), Some(1));
    assert_eq!(value["highlights"][0]["id"], "h2");
    // strokes carry no color filter
    assert_eq!(value["drawings"].as_array().map(Vec::len), Some(2));
    assert_eq!(value["notes"].as_array().map(Vec::len), Some(0));
    assert_eq!(value["floatingTexts"].as_array().map(Vec::len), Some(0));
}

#[test]
fn filter_date_range_is_inclusive_by_day() {
    let path = fixture("sample.json");
    let value = stdout_json(&[
        "filter",
        path.to_str().expect("utf-8 path"),
        "--from",
        "2024-01-02",
        "--to",
        "2024-01-03",
    ]);

    let highlight_ids: Vec<&str> = value["highlights"]
        .as_array()
        .expect("highlights")
        .iter()
        .filter_map(|h| h["id"].as_str())
        .collect();
    assert_eq!(highlight_ids, vec!["h1", "h2"]);
    assert_eq!(value["drawings"].as_array().map(Vec::len), Some(0));
    assert_eq!(value["floatingTexts"].as_array().map(Vec::len), Some(0));
}

#[test]
fn filter_writes_output_file() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let output_path = temp.path().join("out/notes.json");

    cargo_bin_cmd!("marginalia")
        .arg("filter")
        .arg(fixture("sample.json"))
        .arg("--type")
        .arg("notes")
        .arg("--output")
        .arg(&output_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("notes.json"));

    let written = std::fs::read_to_string(&output_path).expect("filtered file should exist");
    let value: Value = serde_json::from_str(&written).expect("filtered file should be json");
    assert_eq!(value["notes"][0]["id"], "n1");
}

#[test]
fn filter_into_directory_uses_export_name() {
    let temp = tempfile::tempdir().expect("temp dir should be created");

    cargo_bin_cmd!("marginalia")
        .arg("filter")
        .arg(fixture("sample.json"))
        .arg("--type")
        .arg("floating-text")
        .arg("--output")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("annotations-sample.json"));

    let written = std::fs::read_to_string(temp.path().join("annotations-sample.json"))
        .expect("export file should exist");
    let value: Value = serde_json::from_str(&written).expect("export file should be json");
    assert_eq!(value["floatingTexts"][0]["id"], "t1");
    assert_eq!(value["highlights"].as_array().map(Vec::len), Some(0));
}

#[test]
fn filter_rejects_unknown_type() {
    cargo_bin_cmd!("marginalia")
        .arg("filter")
        .arg(fixture("sample.json"))
        .arg("--type")
        .arg("stamps")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown annotation type"));
}

#[test]
fn render_writes_png_file() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let output_path = temp.path().join("ink.png");

    cargo_bin_cmd!("marginalia")
        .arg("render")
        .arg(fixture("sample.json"))
        .arg("--width")
        .arg("240")
        .arg("--height")
        .arg("160")
        .arg("--output")
        .arg(&output_path)
        .assert()
        .success();

    let image = image::open(&output_path).expect("render should be readable image");
    assert_eq!(image.width(), 240);
    assert_eq!(image.height(), 160);
}

#[test]
fn render_rejects_oversized_canvas() {
    let temp = tempfile::tempdir().expect("temp dir should be created");

    cargo_bin_cmd!("marginalia")
        .arg("render")
        .arg(fixture("sample.json"))
        .arg("--width")
        .arg("9000")
        .arg("--output")
        .arg(temp.path().join("big.png"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("exceeds"));
}

#[test]
fn info_fails_for_missing_file() {
    cargo_bin_cmd!("marginalia")
        .arg("info")
        .arg(fixture("missing.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("file does not exist"));
}

#[test]
fn info_fails_for_invalid_json() {
    cargo_bin_cmd!("marginalia")
        .arg("info")
        .arg(fixture("invalid.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse annotation set"));
}

#[test]
fn config_file_errors_are_reported() {
    cargo_bin_cmd!("marginalia")
        .arg("--config")
        .arg(fixture("missing-config.json"))
        .arg("version")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}

#[test]
fn version_prints_package_version() {
    cargo_bin_cmd!("marginalia")
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
