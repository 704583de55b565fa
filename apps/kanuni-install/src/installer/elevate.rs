//! Privilege elevation for installs into protected directories.
//!
//! The installer never decides *how* to elevate. It hands an
//! [`ElevatedInstall`] request to whatever [`Elevation`] the platform layer
//! supplied, and calls it at most once per run. On unix that is `sudo` when it
//! is on `PATH`; elsewhere elevation is unavailable and the run fails with
//! `InsufficientPermission`.

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::debug;

/// Everything a privileged helper needs to finish an install.
///
/// The helper must create `install_dir`, copy `source` to `staging`, make it
/// executable and rename it onto `destination`, removing `staging` on failure.
#[derive(Debug, Clone, Copy)]
pub struct ElevatedInstall<'a> {
    pub source: &'a Path,
    pub install_dir: &'a Path,
    pub staging: &'a Path,
    pub destination: &'a Path,
}

/// Why elevation did not complete the install.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ElevationError {
    #[error("elevation is unavailable: {0}")]
    Unavailable(String),
    #[error("elevated install failed: {0}")]
    Failed(String),
}

/// Capability to run the final install step with elevated privileges.
pub trait Elevation {
    /// Short name for messages, e.g. `sudo`.
    fn name(&self) -> &str;

    /// Performs the whole install step as a privileged operation.
    ///
    /// # Errors
    ///
    /// [`ElevationError::Unavailable`] when there is no way to elevate,
    /// [`ElevationError::Failed`] when the operator refused or the helper failed.
    fn install(&self, request: &ElevatedInstall<'_>) -> Result<(), ElevationError>;
}

/// Shell script run under `sudo`. Positional args: dir, source, staging, destination.
const SUDO_SCRIPT: &str = r#"mkdir -p "$1" && cp "$2" "$3" && chmod 755 "$3" && mv -f "$3" "$4" || { rm -f "$3"; exit 1; }"#;

/// Elevates through `sudo`, which prompts on the controlling terminal.
#[derive(Debug, Clone)]
pub struct SudoElevation {
    program: PathBuf,
}

impl SudoElevation {
    #[must_use]
    pub fn new(program: PathBuf) -> Self {
        Self { program }
    }

    /// Locates `sudo` on `PATH`.
    #[must_use]
    pub fn find() -> Option<Self> {
        which::which("sudo").ok().map(Self::new)
    }
}

impl Elevation for SudoElevation {
    fn name(&self) -> &str {
        "sudo"
    }

    fn install(&self, request: &ElevatedInstall<'_>) -> Result<(), ElevationError> {
        debug!(program = %self.program.display(), "running elevated install");
        let status = Command::new(&self.program)
            .args(["sh", "-c", SUDO_SCRIPT, "sh"])
            .arg(request.install_dir)
            .arg(request.source)
            .arg(request.staging)
            .arg(request.destination)
            .status()
            .map_err(|e| ElevationError::Unavailable(format!("cannot run sudo: {e}")))?;

        if status.success() {
            Ok(())
        } else {
            Err(ElevationError::Failed(match status.code() {
                Some(code) => format!("sudo exited with code {code}"),
                None => "sudo was terminated by a signal".to_string(),
            }))
        }
    }
}

/// Placeholder used where no elevation mechanism exists.
#[derive(Debug, Clone)]
pub struct NoElevation {
    reason: String,
}

impl NoElevation {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Elevation for NoElevation {
    fn name(&self) -> &str {
        "none"
    }

    fn install(&self, _request: &ElevatedInstall<'_>) -> Result<(), ElevationError> {
        Err(ElevationError::Unavailable(self.reason.clone()))
    }
}

/// Returns the elevation mechanism for the host platform.
#[must_use]
pub fn platform_elevation() -> Box<dyn Elevation> {
    #[cfg(unix)]
    {
        match SudoElevation::find() {
            Some(sudo) => Box::new(sudo),
            None => Box::new(NoElevation::new(
                "sudo was not found; re-run as root or choose a writable --install-dir",
            )),
        }
    }

    #[cfg(not(unix))]
    {
        Box::new(NoElevation::new(
            "re-run from an elevated prompt or choose a writable --install-dir",
        ))
    }
}
