//! コマンドライン引数の検証

use std::process::{Command, Output};

fn traffic(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_traffic"))
        .args(args)
        .output()
        .expect("failed to run traffic binary")
}

#[test]
fn no_arguments_prints_usage() {
    let output = traffic(&[]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage"), "stderr: {}", stderr);
}

#[test]
fn three_positional_arguments_prints_usage() {
    let output = traffic(&["gtsrb", "model.h5", "extra"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage"), "stderr: {}", stderr);
    assert!(output.stdout.is_empty());
}

#[test]
fn missing_data_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("gtsrb");

    let output = traffic(&[missing.to_str().unwrap(), "--quiet"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not exist"), "stderr: {}", stderr);
}

#[test]
fn invalid_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.json");
    std::fs::write(&config, r#"{ "training": { "test_fraction": 1.5 } }"#).unwrap();

    let output = traffic(&[
        dir.path().to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
        "--quiet",
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("test_fraction"), "stderr: {}", stderr);
}
