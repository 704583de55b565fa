//! Build script for kanuni-install.
//!
//! Embeds the short git commit so `kanuni-install --version --verbose` can report it.

use std::process::Command;

fn main() {
    let commit =
        git_output(&["rev-parse", "--short", "HEAD"]).unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=KANUNI_INSTALL_GIT_COMMIT={commit}");

    if let Some(root) = git_output(&["rev-parse", "--show-toplevel"]) {
        println!("cargo:rerun-if-changed={root}/.git/HEAD");
    }
}

/// Runs `git` with `args` and returns its trimmed stdout when it succeeds with output.
fn git_output(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}
