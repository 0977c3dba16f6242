//! End-to-end checks of the `scenereel` binary that need neither Chrome nor ffmpeg.

use std::process::Command;

fn scenereel() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_scenereel"));
    cmd.env("RUST_LOG", "error");
    cmd
}

#[test]
fn unknown_content_filter_lists_valid_values() {
    let out = scenereel().arg("klingon").output().expect("run scenereel");

    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Unknown content source: klingon"), "stderr: {}", stderr);
    assert!(stderr.contains("CZ, EN, RESTAURANTS, FUNNEL, WORDPRESS, WORDPRESS-CZ"));
}

#[test]
fn unknown_format_filter_lists_valid_values() {
    let out = scenereel().args(["en", "21x9"]).output().expect("run scenereel");

    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Unknown format: 21x9. Available: 9x16, 4x5, 1x1, 16x9"), "stderr: {}", stderr);
}

#[test]
fn list_prints_tables() {
    let out = scenereel().arg("--list").output().expect("run scenereel");

    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("WORDPRESS-CZ"));
    assert!(stdout.contains("1080x1350"));
}

#[test]
fn config_file_tables_are_used() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scenes.json");
    std::fs::write(
        &path,
        r#"{ "sources": [ { "label": "promo", "document": "promo.html", "output_prefix": "promo" } ],
             "formats": [ { "label": "square", "width": 512, "height": 512 } ] }"#,
    )
    .unwrap();

    let out = scenereel()
        .args(["--config", path.to_str().unwrap(), "nope"])
        .output()
        .expect("run scenereel");

    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Available: promo"), "stderr: {}", stderr);
}

#[test]
fn invalid_frame_rate_is_rejected() {
    let out = scenereel().args(["--fps", "0", "--list"]).output().expect("run scenereel");

    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("frame_rate must be positive"));
}
