use assert_cmd::prelude::*;
use predicates::str::contains;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

#[test]
fn headless_run_prints_platform_summary() {
    let mut cmd = Command::cargo_bin("lodestar").expect("binary exists");
    cmd.arg("--headless")
        .arg("--frames")
        .arg("3")
        .arg("--title")
        .arg("Probe");
    cmd.assert()
        .success()
        .stdout(contains("Platform: Headless"))
        .stdout(contains("Window: 1080x600 (framebuffer 1080x600, density 1.00)"))
        .stdout(contains("Title: Probe"))
        .stdout(contains("Frames: 3"))
        .stdout(contains("Cores: "));
}

#[test]
fn audio_probe_reports_unloadable_library() {
    let mut library = NamedTempFile::new().expect("temp library");
    library
        .write_all(b"definitely not a shared object")
        .expect("write library");

    let mut cmd = Command::cargo_bin("lodestar").expect("binary exists");
    cmd.env("LODESTAR_PHONON_LIBRARY", library.path())
        .arg("--headless")
        .arg("--probe-audio");
    cmd.assert()
        .success()
        .stdout(contains("Frames: 1"))
        .stdout(contains("Spatializer: unavailable (failed to load acoustics library"));
}

#[test]
fn unknown_arguments_are_rejected() {
    let mut cmd = Command::cargo_bin("lodestar").expect("binary exists");
    cmd.arg("--fullscreen");
    cmd.assert()
        .failure()
        .stderr(contains("Unknown argument: --fullscreen"));
}

#[test]
fn frame_count_must_be_numeric() {
    let mut cmd = Command::cargo_bin("lodestar").expect("binary exists");
    cmd.args(["--headless", "--frames", "many"]);
    cmd.assert()
        .failure()
        .stderr(contains("invalid frame count many"));
}
