//! CLI end-to-end tests
//!
//! Tests for the hdrscope command-line interface.

use assert_cmd::prelude::*;
use hdrscope_probe::fixture::Mp4Builder;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the hdrscope binary
#[allow(deprecated)]
fn hdrscope_cmd() -> Command {
    let mut cmd = Command::cargo_bin("hdrscope").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

fn write_hdr_movie(dir: &Path) -> PathBuf {
    let path = dir.join("hdr.mp4");
    let movie = Mp4Builder::new(3840, 2160)
        .duration_ms(5_000)
        .frames(150, 30, 1)
        .sample_size(20_000)
        .nclx(9, 16, 9, false);
    fs::write(&path, movie.build()).unwrap();
    path
}

/// Config with a static display so results do not depend on the host
fn write_static_display_config(dir: &Path) -> PathBuf {
    let path = dir.join("hdrscope.toml");
    fs::write(
        &path,
        format!(
            r#"
[assets]
root = "{root}"

[display]
drm_root = "{root}/no-drm"

[display.fallback]
kind = "static"
hdr = true
wide_color_gamut = false
hdr_types = ["dolby_vision", "hdr10"]
"#,
            root = dir.display()
        ),
    )
    .unwrap();
    path
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = hdrscope_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = hdrscope_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("hdrscope"));
}

#[test]
fn test_cli_metadata_help() {
    let mut cmd = hdrscope_cmd();
    cmd.args(["metadata", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Extract metadata"));
}

#[test]
fn test_cli_metadata_json() {
    let dir = tempdir().unwrap();
    let movie = write_hdr_movie(dir.path());

    let mut cmd = hdrscope_cmd();
    cmd.args(["metadata", "--json"])
        .arg(&movie)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"width\": 3840"))
        .stdout(predicate::str::contains("\"colorTransfer\": \"ST2084\""))
        .stdout(predicate::str::contains("\"rotation\": 0"));
}

#[test]
fn test_cli_metadata_text() {
    let dir = tempdir().unwrap();
    let movie = write_hdr_movie(dir.path());

    let mut cmd = hdrscope_cmd();
    cmd.arg("metadata")
        .arg(&movie)
        .assert()
        .success()
        .stdout(predicate::str::contains("Video: 3840x2160"))
        .stdout(predicate::str::contains("Frame rate: 30.000 fps"))
        .stdout(predicate::str::contains("HDR: yes"));
}

#[test]
fn test_cli_metadata_rejects_hls() {
    let mut cmd = hdrscope_cmd();
    cmd.args(["metadata", "https://example.com/master.m3u8"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("STREAMING_METADATA_UNSUPPORTED"));
}

#[test]
fn test_cli_metadata_bad_header() {
    let mut cmd = hdrscope_cmd();
    cmd.args(["metadata", "https://example.com/a.mp4", "-H", "no-colon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid header"));
}

#[test]
fn test_cli_capabilities_static_display() {
    let dir = tempdir().unwrap();
    let config = write_static_display_config(dir.path());

    let mut cmd = hdrscope_cmd();
    cmd.args(["capabilities", "--json", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"provider\": \"static\""))
        .stdout(predicate::str::contains("\"dolby_vision\""))
        .stdout(predicate::str::contains("\"wideColorGamut\": false"));
}

#[test]
fn test_cli_call_method() {
    let dir = tempdir().unwrap();
    let config = write_static_display_config(dir.path());

    let mut cmd = hdrscope_cmd();
    cmd.args(["call", "isHdrSupported", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"success\""))
        .stdout(predicate::str::contains("\"result\": true"));
}

#[test]
fn test_cli_call_invalid_argument() {
    let mut cmd = hdrscope_cmd();
    cmd.args(["call", "getVideoMetadata", "--args", r#"{"filePath": 7}"#])
        .assert()
        .failure()
        .stdout(predicate::str::contains("INVALID_ARGUMENT"));
}

#[test]
fn test_cli_serve_round_trip() {
    let dir = tempdir().unwrap();
    let config = write_static_display_config(dir.path());
    let movie = write_hdr_movie(dir.path());

    let input = format!(
        "{}\n\nnot json\n{}\n{}\n",
        r#"{"method":"getSupportedHdrFormats"}"#,
        serde_json::json!({
            "method": "getVideoMetadata",
            "arguments": { "filePath": movie.to_string_lossy() }
        }),
        r#"{"method":"startPlayback"}"#,
    );

    let mut std_cmd = hdrscope_cmd();
    std_cmd.args(["serve", "--config"]).arg(&config);
    let output = assert_cmd::Command::from_std(std_cmd)
        .write_stdin(input)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0]["result"], serde_json::json!(["dolby_vision", "hdr10"]));
    assert_eq!(lines[1]["code"], "INVALID_ARGUMENT");
    assert_eq!(lines[2]["result"]["colorStandard"], "BT2020");
    assert_eq!(lines[3]["status"], "not_implemented");
}

#[test]
fn test_cli_validate_config() {
    let dir = tempdir().unwrap();
    let config = write_static_display_config(dir.path());

    let mut cmd = hdrscope_cmd();
    cmd.arg("validate")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_cli_validate_rejects_zero_timeout() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("bad.toml");
    fs::write(&config, "[remote]\ntimeout_secs = 0\n").unwrap();

    let mut cmd = hdrscope_cmd();
    cmd.arg("validate")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("timeout_secs"));
}
