// CLI integration tests: file queries, config files, and error exit codes.
use std::io::Write;
use std::path::Path;
use std::process::Command;

use serde_json::Value;

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_cdx-source");
    Command::new(exe)
}

fn parse_error_json(output: &[u8]) -> Value {
    let text = String::from_utf8_lossy(output);
    let line = text
        .lines()
        .find(|line| line.starts_with('{'))
        .expect("json line");
    serde_json::from_str(line).expect("valid json")
}

fn write_fixture(path: &Path) {
    let mut file = std::fs::File::create(path).expect("create");
    for key in ["a)/", "b)/", "b)/x", "c)/", "d)/"] {
        writeln!(file, "{key} 20240101000000 http://{key} text/html 200").expect("write");
    }
}

#[test]
fn prints_range_from_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("index.cdx");
    write_fixture(&path);

    let output = cmd()
        .args([path.to_str().unwrap(), "--key", "b)/", "--end-key", "c)/"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert_eq!(
        stdout,
        "b)/ 20240101000000 http://b)/ text/html 200\nb)/x 20240101000000 http://b)/x text/html 200\n"
    );
}

#[test]
fn omitted_end_key_prints_to_end() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("index.cdx");
    write_fixture(&path);

    let output = cmd()
        .args([path.to_str().unwrap(), "--key", "c)/"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert_eq!(stdout.lines().count(), 2);
    assert!(stdout.starts_with("c)/ "));
}

#[test]
fn missing_file_exits_not_found() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("absent.cdx");

    let output = cmd()
        .args([path.to_str().unwrap(), "--key", "a"])
        .output()
        .expect("run");
    assert_eq!(output.status.code().unwrap(), 3);
    let err = parse_error_json(&output.stderr);
    assert_eq!(err["error"]["kind"], "NotFound");
    assert!(err["error"]["path"].as_str().unwrap().ends_with("absent.cdx"));
}

#[test]
fn invalid_config_exits_usage() {
    let temp = tempfile::tempdir().expect("tempdir");
    let index = temp.path().join("index.cdx");
    write_fixture(&index);
    let config = temp.path().join("config.json");
    std::fs::write(&config, r#"{"unknown_option": true}"#).expect("write config");

    let output = cmd()
        .args([
            index.to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
        ])
        .output()
        .expect("run");
    assert_eq!(output.status.code().unwrap(), 2);
    let err = parse_error_json(&output.stderr);
    assert_eq!(err["error"]["kind"], "Usage");
}

#[cfg(not(feature = "redis"))]
#[test]
fn redis_location_without_feature_exits_unsupported() {
    let output = cmd()
        .args(["redis://127.0.0.1:6379/0", "--key", "example.com/"])
        .output()
        .expect("run");
    assert_eq!(output.status.code().unwrap(), 6);
    let err = parse_error_json(&output.stderr);
    assert_eq!(err["error"]["kind"], "Unsupported");
}
