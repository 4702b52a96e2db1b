//! End-to-end classification tests.
//!
//! Runs the binary against a real safetensors model whose output does not
//! depend on the input, so the expected label and confidence are known.

#![allow(clippy::unwrap_used)]

mod common;

use common::Fixture;
use predicates::prelude::*;
use serde_json::Value;
use wes_classifier_test_support::{CONFIDENT_FIRST, CONFIDENT_THIRD, UNSURE_FIRST};

fn json_lines(stdout: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

// === Classify ===

#[test]
fn test_confident_model_matches() {
    let fixture = Fixture::new(&CONFIDENT_FIRST);
    fixture.add_image("still.png");

    let output = fixture
        .classify()
        .arg(fixture.images_dir())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    let lines = json_lines(&output.stdout);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["label"], "WES_ANDERSON");
    assert_eq!(lines[0]["accepted"], true);
    assert!(lines[0]["confidence"].as_f64().unwrap() > 99.0);
}

#[test]
fn test_unsure_model_has_no_matches() {
    let fixture = Fixture::new(&UNSURE_FIRST);
    fixture.add_image("still.png");

    fixture
        .classify()
        .arg(fixture.images_dir())
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_lower_threshold_accepts_unsure_prediction() {
    let fixture = Fixture::new(&UNSURE_FIRST);
    fixture.add_image("still.png");

    fixture
        .classify()
        .arg("--min-confidence")
        .arg("70")
        .arg(fixture.images_dir())
        .assert()
        .code(0)
        .stdout(predicate::str::contains("WES_ANDERSON"));
}

#[test]
fn test_zero_threshold_accepts_any_confidence() {
    let fixture = Fixture::new(&[1.0, 0.9, 0.8]);
    fixture.add_image("still.png");

    fixture
        .classify()
        .arg("--min-confidence")
        .arg("0")
        .arg(fixture.images_dir())
        .assert()
        .code(0);
}

#[test]
fn test_custom_target_label() {
    let fixture = Fixture::new(&CONFIDENT_THIRD);
    fixture.add_image("still.png");

    fixture
        .classify()
        .arg(fixture.images_dir())
        .assert()
        .code(1);

    fixture
        .classify()
        .arg("--label")
        .arg("OTHER")
        .arg(fixture.images_dir())
        .assert()
        .code(0)
        .stdout(predicate::str::contains("\"label\":\"OTHER\""));
}

#[test]
fn test_unknown_target_label_warns() {
    let fixture = Fixture::new(&CONFIDENT_FIRST);
    fixture.add_image("still.png");

    fixture
        .classify()
        .arg("--label")
        .arg("KUBRICK")
        .arg(fixture.images_dir())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not one of the model's labels"));
}

#[test]
fn test_corrupt_image_does_not_stop_batch() {
    let fixture = Fixture::new(&CONFIDENT_FIRST);
    fixture.add_image("a.png");
    fixture.add_corrupt("b.jpg");
    fixture.add_image("c.png");

    let output = fixture
        .classify()
        .arg("--all")
        .arg(fixture.images_dir())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    let lines = json_lines(&output.stdout);
    assert_eq!(lines.len(), 3);

    assert_eq!(lines[1]["status"], "failed");
    assert_eq!(lines[1]["stage"], "decode");
    assert!(lines[1]["path"].as_str().unwrap().ends_with("b.jpg"));
    assert!(lines[1].get("dimensions").is_none());

    assert_eq!(lines[0]["status"], "classified");
    assert_eq!(lines[2]["status"], "classified");
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_is_reported_with_all() {
    use std::os::unix::fs::PermissionsExt;

    let fixture = Fixture::new(&CONFIDENT_FIRST);
    fixture.add_image("a.png");
    let locked = fixture.add_image("b.png");
    fixture.add_image("c.png");
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
    if std::fs::read(&locked).is_ok() {
        // permissions are not enforced for this user
        return;
    }

    let output = fixture
        .classify()
        .arg("--all")
        .arg(fixture.images_dir())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    let lines = json_lines(&output.stdout);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1]["id"], 1);
    assert_eq!(lines[1]["status"], "failed");
    assert_eq!(lines[1]["stage"], "acquire");
    assert!(lines[1]["path"].as_str().unwrap().ends_with("b.png"));
    assert_eq!(lines[2]["status"], "classified");
}

#[test]
fn test_only_corrupt_images_exit_no_matches() {
    let fixture = Fixture::new(&CONFIDENT_FIRST);
    fixture.add_corrupt("broken.png");

    fixture
        .classify()
        .arg(fixture.images_dir())
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_results_in_sorted_submission_order() {
    let fixture = Fixture::new(&CONFIDENT_FIRST);
    // more images than one preprocessing chunk
    for i in [7, 3, 9, 1, 5, 0, 8, 2, 6, 4] {
        fixture.add_image(&format!("frame_{i:02}.png"));
    }

    let output = fixture
        .classify()
        .arg("--threads")
        .arg("2")
        .arg(fixture.images_dir())
        .output()
        .unwrap();

    let lines = json_lines(&output.stdout);
    assert_eq!(lines.len(), 10);
    for (i, line) in lines.iter().enumerate() {
        assert_eq!(line["id"], i);
        assert!(line["path"]
            .as_str()
            .unwrap()
            .ends_with(&format!("frame_{i:02}.png")));
    }
}

#[test]
fn test_recursive_flag_descends() {
    let fixture = Fixture::new(&CONFIDENT_FIRST);
    fixture.add_image("top.png");
    fixture.add_image("nested/deeper/inner.png");

    let flat = fixture
        .classify()
        .arg(fixture.images_dir())
        .output()
        .unwrap();
    assert_eq!(json_lines(&flat.stdout).len(), 1);

    let recursive = fixture
        .classify()
        .arg("--recursive")
        .arg(fixture.images_dir())
        .output()
        .unwrap();
    assert_eq!(json_lines(&recursive.stdout).len(), 2);
}

#[test]
fn test_single_file_argument() {
    let fixture = Fixture::new(&CONFIDENT_FIRST);
    let path = fixture.add_image("only.png");
    fixture.add_image("ignored.png");

    let output = fixture.classify().arg(&path).output().unwrap();
    let lines = json_lines(&output.stdout);
    assert_eq!(lines.len(), 1);
    assert!(lines[0]["path"].as_str().unwrap().ends_with("only.png"));
}

// === Evaluate ===

fn labeled_tree(fixture: &Fixture) {
    fixture.add_image("WES_ANDERSON/a.png");
    fixture.add_image("WES_ANDERSON/b.png");
    fixture.add_image("NOT_WES_ANDERSON/c.png");
    fixture.add_image("OTHER/d.png");
}

#[test]
fn test_evaluate_reports_accuracy() {
    let fixture = Fixture::new(&CONFIDENT_FIRST);
    labeled_tree(&fixture);

    let output = fixture
        .bin()
        .arg("evaluate")
        .arg("--format")
        .arg("json")
        .arg("--models-dir")
        .arg(fixture.models_dir())
        .arg(fixture.images_dir())
        .output()
        .unwrap();

    assert!(output.status.success());
    let summary: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["total"], 4);
    assert_eq!(summary["failed"], 0);
    assert!((summary["accuracy"].as_f64().unwrap() - 0.5).abs() < 1e-9);
    assert_eq!(summary["confusion_matrix"][0][0], 2);
    assert_eq!(summary["confusion_matrix"][1][0], 1);
    assert_eq!(summary["confusion_matrix"][2][0], 1);
    assert_eq!(summary["classes"][0]["label"], "WES_ANDERSON");
    assert!((summary["classes"][0]["recall"].as_f64().unwrap() - 1.0).abs() < 1e-9);
}

#[test]
fn test_evaluate_text_report() {
    let fixture = Fixture::new(&CONFIDENT_FIRST);
    labeled_tree(&fixture);

    fixture
        .bin()
        .arg("evaluate")
        .arg("--models-dir")
        .arg(fixture.models_dir())
        .arg(fixture.images_dir())
        .assert()
        .success()
        .stdout(predicate::str::contains("WES_ANDERSON"))
        .stdout(predicate::str::contains("50.00%"));
}

#[test]
fn test_evaluate_counts_corrupt_images_as_failed() {
    let fixture = Fixture::new(&CONFIDENT_FIRST);
    labeled_tree(&fixture);
    fixture.add_corrupt("OTHER/broken.png");

    let output = fixture
        .bin()
        .args(["evaluate", "--format", "json", "--models-dir"])
        .arg(fixture.models_dir())
        .arg(fixture.images_dir())
        .output()
        .unwrap();

    let summary: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["total"], 4);
    assert_eq!(summary["failed"], 1);
}

#[cfg(unix)]
#[test]
fn test_evaluate_counts_unreadable_images_as_failed() {
    use std::os::unix::fs::PermissionsExt;

    let fixture = Fixture::new(&CONFIDENT_FIRST);
    labeled_tree(&fixture);
    let locked = fixture.add_image("OTHER/locked.png");
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
    if std::fs::read(&locked).is_ok() {
        // permissions are not enforced for this user
        return;
    }

    let output = fixture
        .bin()
        .args(["evaluate", "--format", "json", "--models-dir"])
        .arg(fixture.models_dir())
        .arg(fixture.images_dir())
        .output()
        .unwrap();

    let summary: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["total"], 4);
    assert_eq!(summary["failed"], 1);
}

#[test]
fn test_evaluate_missing_class_directory() {
    let fixture = Fixture::new(&CONFIDENT_FIRST);
    fixture.add_image("WES_ANDERSON/a.png");

    fixture
        .bin()
        .arg("evaluate")
        .arg("--models-dir")
        .arg(fixture.models_dir())
        .arg(fixture.images_dir())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Missing class directories"))
        .stderr(predicate::str::contains("NOT_WES_ANDERSON"));
}
