//! End-to-end runs of the approx-pi binary

use std::fs;
use std::process::{Command, Output};

use tempfile::tempdir;

fn approx_pi(dir: &std::path::Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_approx-pi"))
        .args(args)
        .current_dir(dir)
        .env_remove("APPROX_PI_LOG_THRESHOLD")
        .env_remove("APPROX_PI_LOG_EVERY")
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run approx-pi")
}

#[test]
fn test_writes_worker_logs_and_results() {
    let dir = tempdir().unwrap();
    let out = approx_pi(dir.path(), &["1000", "2", "--threads", "2"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("approx. pi = 3.14"), "{stdout}");
    assert!(stdout.contains("actual  pi = 3.14159265358979323846"));
    assert!(stdout.contains("milliseconds"));

    let output = dir.path().join("output");
    for name in [
        "worker-output-p0-t0.txt",
        "worker-output-p0-t1.txt",
        "worker-output-p1-t0.txt",
        "worker-output-p1-t1.txt",
    ] {
        let text = fs::read_to_string(output.join(name)).unwrap();
        assert_eq!(text.lines().count(), 250, "{name}");
        assert!(text.lines().all(|l| l.starts_with("loop ")));
    }

    let results = fs::read_to_string(output.join("results.txt")).unwrap();
    assert!(results.starts_with("approx. pi = 3.14"));
    assert!(results.contains("elapsed time: "));
}

#[test]
fn test_no_output_leaves_directory_alone() {
    let dir = tempdir().unwrap();
    let out = approx_pi(dir.path(), &["1000", "2", "-o"]);
    assert!(out.status.success());
    assert!(!dir.path().join("output").exists());
}

#[test]
fn test_stale_logs_are_cleared() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("logs");
    fs::create_dir_all(&output).unwrap();
    fs::write(output.join("worker-output-p7.txt"), "old").unwrap();
    fs::write(output.join("keep.txt"), "mine").unwrap();

    let out = approx_pi(dir.path(), &["100", "1", "--output-dir", "logs"]);
    assert!(out.status.success());

    assert!(!output.join("worker-output-p7.txt").exists());
    assert!(output.join("keep.txt").exists());
    assert!(output.join("worker-output-p0.txt").exists());
}

#[test]
fn test_zero_processes_rejected() {
    let dir = tempdir().unwrap();
    let out = approx_pi(dir.path(), &["1000", "0"]);
    assert!(!out.status.success());
}

#[test]
fn test_more_workers_than_iterations() {
    let dir = tempdir().unwrap();
    let out = approx_pi(dir.path(), &["3", "2", "-t", "4", "-o"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stdout).contains("approx. pi = 2.895238"));
}

#[test]
fn test_json_report() {
    let dir = tempdir().unwrap();
    let out = approx_pi(dir.path(), &["100000", "3", "-o", "--json", "--serial"]);
    assert!(out.status.success());

    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let pi = report["approx_pi"].as_f64().unwrap();
    let serial = report["serial_pi"].as_f64().unwrap();
    assert!((pi - std::f64::consts::PI).abs() < 1e-4);
    assert!(((pi - serial) / serial).abs() < 1e-9);
    assert_eq!(report["processes"], 3);
}

#[test]
fn test_settings_file() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("run.toml"),
        "threads = 2\n[output]\ndirectory = \"from-file\"\n[output.sampling]\nthreshold = 10\nevery = 10\n",
    )
    .unwrap();

    let out = approx_pi(dir.path(), &["100", "1", "--config", "run.toml"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let log = dir.path().join("from-file").join("worker-output-p0-t1.txt");
    let text = fs::read_to_string(log).unwrap();
    assert_eq!(text.lines().count(), 5);
}

#[test]
fn test_bad_settings_file() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("bad.toml"), "threads = \"many\"").unwrap();
    let out = approx_pi(dir.path(), &["100", "1", "--config", "bad.toml"]);
    assert_eq!(out.status.code(), Some(1));
}
