//! Placing the verified binary at its final location.
//!
//! The binary is copied into a hidden staging file next to the destination,
//! made executable, synced, and renamed over `{install_dir}/kanuni`. The
//! rename is the only step that touches the destination path, so an
//! interrupted install never leaves a half-written binary there.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use super::elevate::{ElevatedInstall, Elevation, ElevationError};
use super::release::ReleaseVersion;
use crate::errors::InstallerError;

/// Installs `source` as `{install_dir}/{file_name}`.
///
/// Creates `install_dir` and its ancestors when missing. If the direct attempt
/// is denied by the filesystem, `elevation` is asked exactly once to perform
/// the same steps with elevated privileges.
///
/// # Errors
///
/// - [`InstallerError::InsufficientPermission`] when writing is denied and
///   elevation is unavailable, refused, or fails.
/// - [`InstallerError::InstallFailed`] for any other I/O failure.
pub fn place_binary(
    source: &Path,
    install_dir: &Path,
    file_name: &str,
    elevation: &dyn Elevation,
) -> Result<PathBuf, InstallerError> {
    let destination = install_dir.join(file_name);
    let staging = install_dir.join(staging_name(file_name));

    match place_directly(source, install_dir, &staging, &destination) {
        Ok(()) => {
            debug!(path = %destination.display(), "installed binary");
            Ok(destination)
        }
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            let _ = fs::remove_file(&staging);
            info!(dir = %install_dir.display(), via = elevation.name(), "escalating privileges");
            println!(
                "{} is not writable; requesting elevated privileges...",
                install_dir.display()
            );

            let request = ElevatedInstall {
                source,
                install_dir,
                staging: &staging,
                destination: &destination,
            };
            elevation.install(&request).map_err(|err| match err {
                ElevationError::Unavailable(reason) | ElevationError::Failed(reason) => {
                    InstallerError::insufficient_permission(install_dir, reason)
                }
            })?;
            Ok(destination)
        }
        Err(e) => {
            let _ = fs::remove_file(&staging);
            Err(InstallerError::install_failed(&destination, e.to_string()))
        }
    }
}

fn staging_name(file_name: &str) -> String {
    format!(".{file_name}.partial-{}", uuid::Uuid::new_v4().simple())
}

fn place_directly(
    source: &Path,
    install_dir: &Path,
    staging: &Path,
    destination: &Path,
) -> io::Result<()> {
    fs::create_dir_all(install_dir)?;
    fs::copy(source, staging)?;
    set_executable(staging)?;
    fs::File::open(staging)?.sync_all()?;
    fs::rename(staging, destination)
}

#[cfg(unix)]
fn set_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn set_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// A kanuni binary already present at the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingInstall {
    pub path: PathBuf,
    /// Version reported by `kanuni --version`, if it answered.
    pub version: Option<String>,
}

/// How the release about to be installed relates to the existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionRelation {
    Same,
    Upgrade,
    Downgrade,
    Unknown,
}

impl ExistingInstall {
    /// Looks for an existing binary at `destination` and asks it for its version.
    ///
    /// The version query is best effort; a binary that does not answer is
    /// still reported, with `version: None`.
    #[must_use]
    pub fn detect(destination: &Path) -> Option<Self> {
        if !destination.is_file() {
            return None;
        }
        let version = Command::new(destination)
            .arg("--version")
            .output()
            .ok()
            .filter(|out| out.status.success())
            .and_then(|out| parse_version_output(&String::from_utf8_lossy(&out.stdout)));

        debug!(path = %destination.display(), ?version, "found existing install");
        Some(Self {
            path: destination.to_path_buf(),
            version,
        })
    }

    /// Compares the installed version with `target`. Advisory only.
    #[must_use]
    pub fn relation_to(&self, target: &ReleaseVersion) -> VersionRelation {
        let installed = self
            .version
            .as_deref()
            .and_then(|v| semver::Version::parse(v.trim_start_matches('v')).ok());

        match (installed, target.semver()) {
            (Some(installed), Some(target)) => match installed.cmp(&target) {
                std::cmp::Ordering::Equal => VersionRelation::Same,
                std::cmp::Ordering::Less => VersionRelation::Upgrade,
                std::cmp::Ordering::Greater => VersionRelation::Downgrade,
            },
            _ => VersionRelation::Unknown,
        }
    }
}

/// Pulls the version out of `kanuni --version` output such as `kanuni 0.4.1`.
fn parse_version_output(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .next()?
        .split_whitespace()
        .last()
        .map(str::to_string)
}
