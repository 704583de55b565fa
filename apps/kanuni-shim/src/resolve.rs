//! Locating the installed kanuni binary.
//!
//! The search order is:
//!
//! 1. `KANUNI_BINARY`, which must point at an existing file when set
//! 2. `{install dir}/kanuni`, using the installer's own install-dir resolution
//! 3. `kanuni` on `PATH`, skipping the shim itself
//!
//! All inputs are captured up front in a [`Lookup`] so resolution is a pure
//! function of it.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use kanuni_install::config::{BINARY_ENV, BINARY_NAME, Environment};
use tracing::debug;

use crate::errors::ShimError;

/// Everything binary resolution reads from the process.
#[derive(Debug, Clone, Default)]
pub struct Lookup {
    /// Value of `KANUNI_BINARY`.
    pub explicit: Option<PathBuf>,
    pub install: Environment,
    /// Raw `PATH`.
    pub path_var: Option<OsString>,
    /// The running shim, excluded from the `PATH` search.
    pub current_exe: Option<PathBuf>,
}

impl Lookup {
    #[must_use]
    pub fn capture() -> Self {
        Self {
            explicit: std::env::var_os(BINARY_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            install: Environment::capture(),
            path_var: std::env::var_os("PATH"),
            current_exe: std::env::current_exe().ok(),
        }
    }
}

/// Finds the kanuni binary to forward to.
///
/// # Errors
///
/// Returns [`ShimError::BinaryNotFound`] when `KANUNI_BINARY` names a missing
/// file, or when no candidate exists at all.
pub fn resolve_installed_binary(lookup: &Lookup) -> Result<PathBuf, ShimError> {
    if let Some(explicit) = &lookup.explicit {
        if explicit.is_file() {
            debug!(path = %explicit.display(), "using {BINARY_ENV}");
            return Ok(explicit.clone());
        }
        return Err(ShimError::binary_not_found(format!(
            "{BINARY_ENV} is set to '{}', but that file does not exist",
            explicit.display()
        )));
    }

    let installed = lookup
        .install
        .resolve_install_dir(None)
        .join(lookup.install.binary_file_name());
    if installed.is_file() && !is_self(&installed, lookup.current_exe.as_deref()) {
        debug!(path = %installed.display(), "using install directory");
        return Ok(installed);
    }

    if let Some(found) = search_path(lookup) {
        debug!(path = %found.display(), "using PATH");
        return Ok(found);
    }

    Err(ShimError::binary_not_found(format!(
        "{BINARY_NAME} was not found in {} or on PATH",
        installed.display()
    )))
}

fn search_path(lookup: &Lookup) -> Option<PathBuf> {
    let path_var = lookup.path_var.as_ref()?;
    which::which_in_all(BINARY_NAME, Some(path_var), &lookup.install.working_dir)
        .ok()?
        .find(|candidate| !is_self(candidate, lookup.current_exe.as_deref()))
}

fn is_self(candidate: &Path, current_exe: Option<&Path>) -> bool {
    let Some(current) = current_exe else {
        return false;
    };
    match (candidate.canonicalize(), current.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => candidate == current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(root: &Path) -> Lookup {
        Lookup {
            explicit: None,
            install: Environment {
                os: "linux".to_string(),
                arch: "x86_64".to_string(),
                install_dir: Some(root.join("install")),
                working_dir: root.to_path_buf(),
                ..Environment::default()
            },
            path_var: None,
            current_exe: None,
        }
    }

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"kanuni").unwrap();
    }

    #[test]
    fn explicit_binary_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let explicit = tmp.path().join("custom/kanuni");
        touch(&explicit);
        touch(&tmp.path().join("install/kanuni"));

        let lookup = Lookup {
            explicit: Some(explicit.clone()),
            ..lookup(tmp.path())
        };
        assert_eq!(resolve_installed_binary(&lookup).unwrap(), explicit);
    }

    #[test]
    fn missing_explicit_binary_is_an_error_even_if_installed() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("install/kanuni"));

        let lookup = Lookup {
            explicit: Some(tmp.path().join("nope")),
            ..lookup(tmp.path())
        };
        let err = resolve_installed_binary(&lookup).unwrap_err();
        assert!(matches!(err, ShimError::BinaryNotFound { .. }));
        assert!(err.to_string().contains("KANUNI_BINARY"));
    }

    #[test]
    fn install_dir_is_used_before_path() {
        let tmp = tempfile::tempdir().unwrap();
        let installed = tmp.path().join("install/kanuni");
        touch(&installed);

        assert_eq!(resolve_installed_binary(&lookup(tmp.path())).unwrap(), installed);
    }

    #[cfg(unix)]
    #[test]
    fn path_search_skips_the_shim_itself() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let shim_dir = tmp.path().join("shim-bin");
        let real_dir = tmp.path().join("real-bin");
        for dir in [&shim_dir, &real_dir] {
            let file = dir.join("kanuni");
            touch(&file);
            std::fs::set_permissions(&file, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let lookup = Lookup {
            path_var: Some(std::env::join_paths([&shim_dir, &real_dir]).unwrap()),
            current_exe: Some(shim_dir.join("kanuni")),
            ..lookup(tmp.path())
        };
        assert_eq!(
            resolve_installed_binary(&lookup).unwrap(),
            real_dir.join("kanuni")
        );
    }

    #[test]
    fn nothing_found_gives_install_guidance() {
        let tmp = tempfile::tempdir().unwrap();
        let err = resolve_installed_binary(&lookup(tmp.path())).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("was not found"));
        assert!(msg.contains("kanuni-install"));
    }

    #[test]
    #[serial_test::serial]
    fn capture_reads_explicit_binary_variable() {
        // SAFETY: serialized with other env-mutating tests and restored below.
        unsafe {
            std::env::set_var(BINARY_ENV, "/opt/kanuni/bin/kanuni");
        }

        let lookup = Lookup::capture();

        // SAFETY: Cleanup - restoring previous state
        unsafe {
            std::env::remove_var(BINARY_ENV);
        }
        assert_eq!(
            lookup.explicit,
            Some(PathBuf::from("/opt/kanuni/bin/kanuni"))
        );
    }
}
