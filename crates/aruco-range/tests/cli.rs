use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn cli() -> Command {
    Command::cargo_bin("aruco-range").expect("binary")
}

#[test]
fn generate_writes_requested_markers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("markers");

    cli()
        .args(["generate", "--count", "3", "--size", "60", "--out-dir"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("marker_2.png"));

    for id in 0..3 {
        assert!(out.join(format!("marker_{id}.png")).is_file());
    }
    assert!(!out.join("marker_3.png").exists());
}

#[test]
fn log_level_controls_stderr_logging() {
    let dir = tempfile::tempdir().expect("tempdir");
    cli()
        .args(["--log-level", "info", "generate", "--count", "1", "--size", "60", "--out-dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("INFO"))
        .stderr(predicate::str::contains("generated 1 DICT_4X4_50 markers"));

    cli()
        .args(["--log-level", "error", "generate", "--count", "1", "--size", "60", "--out-dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("generated").not());
}

#[test]
fn generate_svg_format() {
    let dir = tempfile::tempdir().expect("tempdir");
    cli()
        .args(["generate", "--count", "1", "--format", "svg", "--out-dir"])
        .arg(dir.path())
        .assert()
        .success();
    let svg = fs::read_to_string(dir.path().join("marker_0.svg")).expect("svg");
    assert!(svg.contains("<svg"));
}

#[test]
fn generate_rejects_ids_outside_the_dictionary() {
    let dir = tempfile::tempdir().expect("tempdir");
    cli()
        .args(["generate", "--first-id", "45", "--count", "10", "--out-dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("marker id 50"));
}

#[test]
fn detect_reports_generated_marker() {
    let dir = tempfile::tempdir().expect("tempdir");
    cli()
        .args([
            "generate",
            "--first-id",
            "3",
            "--count",
            "1",
            "--size",
            "120",
            "--quiet-zone",
            "40",
            "--out-dir",
        ])
        .arg(dir.path())
        .assert()
        .success();

    let image = dir.path().join("marker_3.png");
    let annotated = dir.path().join("annotated.png");
    let report = dir.path().join("report.json");
    cli()
        .arg("detect")
        .arg("--image")
        .arg(&image)
        .arg("--out")
        .arg(&annotated)
        .arg("--report")
        .arg(&report)
        .assert()
        .success()
        .stdout(predicate::str::contains("marker 3: distance"))
        .stdout(predicate::str::contains("centered"));

    assert!(annotated.is_file());
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report).expect("report")).expect("json");
    assert_eq!(json["markers"][0]["id"], 3);
    assert_eq!(json["markers"][0]["alignment"], "centered");
}

#[test]
fn detect_on_missing_image_fails() {
    cli()
        .args(["detect", "--image", "/nonexistent/frame.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn invalid_focal_length_override_fails() {
    cli()
        .args(["--focal-length=-3", "dict-info"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("focal length"));
}

#[test]
fn config_with_unknown_dictionary_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = dir.path().join("config.json");
    fs::write(&cfg, r#"{ "dictionary": "DICT_9X9_1" }"#).expect("write");
    cli()
        .arg("--config")
        .arg(&cfg)
        .arg("dict-info")
        .assert()
        .failure()
        .stderr(predicate::str::contains("DICT_9X9_1"));
}

#[test]
fn dict_info_prints_metadata() {
    cli()
        .args(["dict-info", "--dictionary", "DICT_4X4_100"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DICT_4X4_100"))
        .stdout(predicate::str::contains("markers:         100"));
}

#[test]
fn track_processes_every_frame() {
    let dir = tempfile::tempdir().expect("tempdir");
    let frames = dir.path().join("frames");
    let out = dir.path().join("annotated");
    let report = dir.path().join("run.json");

    cli()
        .args([
            "generate",
            "--count",
            "3",
            "--size",
            "90",
            "--quiet-zone",
            "30",
            "--out-dir",
        ])
        .arg(&frames)
        .assert()
        .success();

    cli()
        .arg("track")
        .arg("--input")
        .arg(&frames)
        .arg("--out-dir")
        .arg(&out)
        .arg("--report")
        .arg(&report)
        .assert()
        .success()
        .stdout(predicate::str::contains("frames: 3, with markers: 3"));

    for id in 0..3 {
        assert!(out.join(format!("marker_{id}.png")).is_file());
    }
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report).expect("report")).expect("json");
    assert_eq!(json["frames"], 3);
    assert_eq!(json["reports"][2]["markers"][0]["id"], 2);
}

#[test]
fn track_honours_max_frames() {
    let dir = tempfile::tempdir().expect("tempdir");
    cli()
        .args(["generate", "--count", "4", "--size", "60", "--quiet-zone", "20", "--out-dir"])
        .arg(dir.path())
        .assert()
        .success();

    cli()
        .arg("track")
        .arg("--input")
        .arg(dir.path())
        .args(["--max-frames", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("frames: 2"));
}

#[test]
fn track_on_empty_directory_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    cli()
        .arg("track")
        .arg("--input")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no image frames"));
}
