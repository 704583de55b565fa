#![warn(clippy::pedantic)]

//! Integration tests for the kanuni shim.
//!
//! The shim is pointed at stand-in binaries through `KANUNI_BINARY` and
//! `KANUNI_INSTALL_DIR`, and its exit code and output are checked against what
//! the stand-in did.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p kanuni-shim
//! ```

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use std::process::Command;

fn shim() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("kanuni-shim"));
    cmd.env_remove("KANUNI_BINARY")
        .env_remove("KANUNI_INSTALL_DIR")
        .env_remove("RUST_LOG");
    cmd
}

/// Writes an executable shell script standing in for kanuni.
#[cfg(unix)]
fn fake_kanuni(dir: &assert_fs::TempDir, body: &str) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let file = dir.child("bin/kanuni");
    file.write_str(&format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o755)).unwrap();
    file.path().to_path_buf()
}

// -----------------------------------------------------------------------------
// Forwarding
// -----------------------------------------------------------------------------

/// The child's exit code comes back unchanged.
///
/// **Expected behavior**: `sh -c 'exit 7'` through the shim exits with 7.
#[cfg(unix)]
#[test]
fn exit_code_is_propagated_verbatim() {
    let mut cmd = shim();
    cmd.env("KANUNI_BINARY", "/bin/sh").args(["-c", "exit 7"]);

    cmd.assert().code(7);
}

/// Arguments reach the binary in order, spaces and all.
#[cfg(unix)]
#[test]
fn arguments_are_forwarded_unchanged() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let binary = fake_kanuni(&tmp, r#"for a in "$@"; do echo "[$a]"; done"#);

    let mut cmd = shim();
    cmd.env("KANUNI_BINARY", &binary)
        .args(["review", "--file", "my contract.pdf"]);

    cmd.assert()
        .success()
        .stdout("[review]\n[--file]\n[my contract.pdf]\n");
}

/// Environment and working directory are inherited.
#[cfg(unix)]
#[test]
fn environment_and_cwd_are_inherited() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let binary = fake_kanuni(&tmp, r#"echo "$KANUNI_TEST_MARKER"; pwd"#);
    let work = tmp.child("work");
    work.create_dir_all().unwrap();

    let mut cmd = shim();
    cmd.env("KANUNI_BINARY", &binary)
        .env("KANUNI_TEST_MARKER", "marker-42")
        .current_dir(work.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("marker-42"))
        .stdout(predicate::str::contains("work"));
}

/// Without an override the binary in the install directory is used.
#[cfg(unix)]
#[test]
fn install_dir_binary_is_found() {
    let tmp = assert_fs::TempDir::new().unwrap();
    fake_kanuni(&tmp, "echo from-install-dir");

    let mut cmd = shim();
    cmd.env("KANUNI_INSTALL_DIR", tmp.child("bin").path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("from-install-dir"));
}

// -----------------------------------------------------------------------------
// Failures
// -----------------------------------------------------------------------------

/// A missing override is reported instead of falling through.
///
/// **Expected behavior**: Exit 1 with guidance naming `KANUNI_BINARY`.
#[test]
fn missing_explicit_binary_is_reported() {
    let tmp = assert_fs::TempDir::new().unwrap();

    let mut cmd = shim();
    cmd.env("KANUNI_BINARY", tmp.child("missing-kanuni").path());

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("KANUNI_BINARY"))
        .stderr(predicate::str::contains("does not exist"))
        .stderr(predicate::str::contains("kanuni-install"));
}

/// A file that is not executable fails to start with a spawn error.
#[cfg(unix)]
#[test]
fn non_executable_binary_is_a_spawn_error() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let file = tmp.child("kanuni");
    file.write_str("not a program").unwrap();

    let mut cmd = shim();
    cmd.env("KANUNI_BINARY", file.path());

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("failed to run"));
}
