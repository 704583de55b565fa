//! Handing the invocation over to the resolved binary.
//!
//! Arguments are forwarded verbatim; environment and working directory are
//! inherited unchanged.
//!
//! On unix the shim replaces its own process image with the binary, so the
//! exit status and signal behavior are the binary's own. On Windows there is no
//! exec: the shim spawns the binary, ignores console Ctrl+C (the console
//! delivers it to the child as well) and returns the child's exit code.

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::errors::ShimError;

/// Runs `binary` with `args` and returns the exit code to leave with.
///
/// On unix this only returns on failure.
///
/// # Errors
///
/// Returns [`ShimError::BinaryNotFound`] if the binary vanished, or
/// [`ShimError::Spawn`] for any other start failure.
#[cfg(unix)]
pub fn forward_invocation(binary: &Path, args: &[OsString]) -> Result<i32, ShimError> {
    use std::os::unix::process::CommandExt;

    debug!(binary = %binary.display(), args = args.len(), "exec");
    let err = Command::new(binary).args(args).exec();
    Err(ShimError::from_start_failure(binary, err))
}

/// Runs `binary` with `args` and returns the exit code to leave with.
///
/// # Errors
///
/// Returns [`ShimError::BinaryNotFound`] if the binary vanished, or
/// [`ShimError::Spawn`] for any other start failure.
#[cfg(not(unix))]
pub fn forward_invocation(binary: &Path, args: &[OsString]) -> Result<i32, ShimError> {
    // the child receives the console Ctrl+C itself; the shim just keeps waiting
    if let Err(e) = ctrlc::set_handler(|| {}) {
        tracing::warn!("could not install Ctrl+C handler: {e}");
    }

    debug!(binary = %binary.display(), args = args.len(), "spawn");
    let status = Command::new(binary)
        .args(args)
        .status()
        .map_err(|e| ShimError::from_start_failure(binary, e))?;

    Ok(status.code().unwrap_or(1))
}
