#![warn(clippy::pedantic)]

//! Integration tests for the kanuni-install binary.
//!
//! These tests spawn the compiled installer against a local mock registry and
//! validate its behavior through stdout, stderr, exit codes and the files it
//! leaves behind.
//!
//! ## Test Strategy
//!
//! 1. **Help and version**: CLI metadata, documented environment variables
//! 2. **Full install**: registry override, verification, atomic placement
//! 3. **Existing install**: declining the prompt leaves the binary untouched
//! 4. **Failures**: stage-tagged error messages and exit code 1
//!
//! ## Test Infrastructure
//!
//! - Uses `assert_cmd` for spawning and asserting on command execution
//! - Uses `assert_fs` for temporary install and temp directories
//! - Uses `predicates` for flexible output matching
//! - Uses `wiremock` as the release registry
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p kanuni-install
//! ```

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use std::process::Command;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TAG: &str = "v1.2.3";
const BINARY: &str = "#!/bin/sh\necho \"kanuni 1.2.3\"\n";

/// Builds an installer command isolated from the caller's environment.
///
/// `TMPDIR` points at `tmp` so the workspace lands somewhere the test can inspect.
fn installer(tmp: &assert_fs::TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("kanuni-install"));
    cmd.env_remove("KANUNI_INSTALL_DIR")
        .env_remove("KANUNI_VERSION")
        .env_remove("KANUNI_ALLOW_UNVERIFIED")
        .env_remove("RUST_LOG")
        .env("TMPDIR", tmp.path());
    cmd
}

/// Archive name the installer will request on this host.
fn host_archive_name() -> String {
    let platform = kanuni_install::installer::Platform::current().expect("Supported host");
    kanuni_install::installer::artifact::archive_name(platform)
}

fn tar_gz(files: &[(&str, &str)]) -> Vec<u8> {
    use flate2::Compression;
    use flate2::write::GzEncoder;

    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, name, content.as_bytes())
            .expect("Should append file");
    }
    builder
        .into_inner()
        .expect("Should finish tar")
        .finish()
        .expect("Should finish gzip")
}

fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(bytes))
}

/// Mounts `latest`, the host archive and a sidecar carrying `digest`.
async fn mount_release(server: &MockServer, archive: Vec<u8>, digest: &str) {
    let archive_name = host_archive_name();
    Mock::given(method("GET"))
        .and(path("/releases/latest"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(format!(r#"{{"tag_name":"{TAG}"}}"#)),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/releases/download/{TAG}/{archive_name}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/releases/download/{TAG}/{archive_name}.sha256")))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(format!("{digest}  {archive_name}\n")),
        )
        .mount(server)
        .await;
}

fn workspace_dirs(tmp: &assert_fs::TempDir) -> usize {
    std::fs::read_dir(tmp.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with("kanuni-install-"))
        .count()
}

// -----------------------------------------------------------------------------
// Help and version
// -----------------------------------------------------------------------------

/// Verifies that `--help` documents flags and environment variables.
///
/// **Expected behavior**: Exit 0 with every supported variable listed.
#[test]
fn help_lists_flags_and_environment_variables() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("kanuni-install"));
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--install-dir"))
        .stdout(predicate::str::contains("--allow-unverified"))
        .stdout(predicate::str::contains("KANUNI_INSTALL_DIR"))
        .stdout(predicate::str::contains("KANUNI_REGISTRY"))
        .stdout(predicate::str::contains("KANUNI_VERSION"))
        .stdout(predicate::str::contains("KANUNI_ALLOW_UNVERIFIED"));
}

/// Verifies that `--version` prints the package version.
#[test]
fn version_flag_shows_version() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("kanuni-install"));
    cmd.arg("--version");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

/// Verifies that `--version --verbose` adds build details.
#[test]
fn verbose_version_shows_commit() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("kanuni-install"));
    cmd.args(["--version", "--verbose"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Commit:"))
        .stdout(predicate::str::contains("Platform:"));
}

// -----------------------------------------------------------------------------
// Full install
// -----------------------------------------------------------------------------

/// Installs from a mock registry selected through `KANUNI_REGISTRY`.
///
/// **Expected behavior**: Exit 0, the binary is at the install dir with its
/// archive content, and no workspace is left in the temp dir.
#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn installs_from_registry_override() {
    let archive = tar_gz(&[("kanuni", BINARY)]);
    let server = MockServer::start().await;
    mount_release(&server, archive.clone(), &sha256_hex(&archive)).await;

    let tmp = assert_fs::TempDir::new().unwrap();
    let install_dir = tmp.child("bin");

    let mut cmd = installer(&tmp);
    cmd.env("KANUNI_REGISTRY", server.uri())
        .arg("--install-dir")
        .arg(install_dir.path())
        .args(["--yes", "--no-completions", "--no-progress"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(format!("Installed kanuni {TAG}")))
        .stdout(predicate::str::contains("Verifying checksum"));

    install_dir.child("kanuni").assert(BINARY);
    assert_eq!(workspace_dirs(&tmp), 0);
}

/// A sidecar that disagrees with the archive aborts in the verify stage.
///
/// **Expected behavior**: Exit 1, `Error (integrity verification)` on stderr,
/// nothing installed.
#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn checksum_mismatch_reports_verify_stage() {
    let archive = tar_gz(&[("kanuni", BINARY)]);
    let server = MockServer::start().await;
    mount_release(&server, archive, &"deadbeef".repeat(8)).await;

    let tmp = assert_fs::TempDir::new().unwrap();
    let install_dir = tmp.child("bin");

    let mut cmd = installer(&tmp);
    cmd.env("KANUNI_REGISTRY", server.uri())
        .arg("--install-dir")
        .arg(install_dir.path())
        .args(["--yes", "--no-completions", "--no-progress"]);

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("Error (integrity verification)"))
        .stderr(predicate::str::contains("checksum mismatch"));

    install_dir.child("kanuni").assert(predicate::path::missing());
    assert_eq!(workspace_dirs(&tmp), 0);
}

// -----------------------------------------------------------------------------
// Existing install
// -----------------------------------------------------------------------------

/// Answering "n" to the overwrite prompt cancels cleanly.
///
/// **Expected behavior**: Exit 0, existing binary untouched, no archive requested.
#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn declining_overwrite_leaves_binary_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/releases/latest"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(format!(r#"{{"tag_name":"{TAG}"}}"#)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/releases/download/{TAG}/{}", host_archive_name())))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let tmp = assert_fs::TempDir::new().unwrap();
    let existing = tmp.child("bin/kanuni");
    existing.write_str("old binary").unwrap();

    let mut cmd = installer(&tmp);
    cmd.env("KANUNI_REGISTRY", server.uri())
        .env("KANUNI_INSTALL_DIR", tmp.child("bin").path())
        .args(["--no-completions", "--no-progress"]);

    assert_cmd::Command::from_std(cmd)
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("[y/N]"))
        .stdout(predicate::str::contains("Installation cancelled"));

    existing.assert("old binary");
    assert_eq!(workspace_dirs(&tmp), 0);
}

// -----------------------------------------------------------------------------
// Failures
// -----------------------------------------------------------------------------

/// An unreachable registry fails release resolution without retrying.
///
/// **Expected behavior**: Exit 1 with `Error (release resolution)` on stderr.
#[test]
fn unreachable_registry_reports_release_stage() {
    let tmp = assert_fs::TempDir::new().unwrap();

    let mut cmd = installer(&tmp);
    cmd.env("KANUNI_REGISTRY", "http://127.0.0.1:9")
        .arg("--install-dir")
        .arg(tmp.child("bin").path())
        .args(["--yes", "--no-completions", "--no-progress"]);

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("Error (release resolution)"));

    tmp.child("bin/kanuni").assert(predicate::path::missing());
}

/// Unknown flags are rejected by clap before anything runs.
#[test]
fn unknown_flag_is_rejected() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("kanuni-install"));
    cmd.arg("--frobnicate");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--frobnicate"));
}
