//! Environment snapshot and resolved install configuration.
//!
//! All process-global reads the installer depends on happen once, in
//! [`Environment::capture`]. Stages receive the snapshot (or the
//! [`InstallConfig`] derived from it) as explicit parameters, which keeps them
//! testable without touching the real environment.

use std::path::{Path, PathBuf};

use crate::installer::platform::{executable_extension_for, is_windows_os};
use crate::installer::shell::ShellSignals;

/// Name of the installed binary, without platform extension.
pub const BINARY_NAME: &str = "kanuni";

/// Overrides the install directory.
pub const INSTALL_DIR_ENV: &str = "KANUNI_INSTALL_DIR";

/// Overrides both the release API and the download base URL.
pub const REGISTRY_ENV: &str = "KANUNI_REGISTRY";

/// Pins the release tag instead of querying the registry.
pub const VERSION_ENV: &str = "KANUNI_VERSION";

/// Permits installs without a reachable checksum sidecar when truthy.
pub const ALLOW_UNVERIFIED_ENV: &str = "KANUNI_ALLOW_UNVERIFIED";

/// Explicit path to the kanuni binary, used by the shim.
pub const BINARY_ENV: &str = "KANUNI_BINARY";

/// Snapshot of everything the installer reads from its surroundings.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// Raw OS string (`std::env::consts::OS` in production).
    pub os: String,
    /// Raw architecture string (`std::env::consts::ARCH` in production).
    pub arch: String,
    pub install_dir: Option<PathBuf>,
    pub registry: Option<String>,
    pub pinned_version: Option<String>,
    pub allow_unverified: bool,
    pub shell: ShellSignals,
    pub home_dir: Option<PathBuf>,
    /// Windows `%LOCALAPPDATA%`; unused elsewhere.
    pub local_data_dir: Option<PathBuf>,
    pub working_dir: PathBuf,
    pub temp_dir: PathBuf,
}

impl Environment {
    /// Reads the current process environment.
    #[must_use]
    pub fn capture() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            install_dir: non_blank_var(INSTALL_DIR_ENV).map(PathBuf::from),
            registry: non_blank_var(REGISTRY_ENV),
            pinned_version: non_blank_var(VERSION_ENV),
            allow_unverified: non_blank_var(ALLOW_UNVERIFIED_ENV).is_some_and(|v| is_truthy(&v)),
            shell: ShellSignals::capture(),
            home_dir: dirs::home_dir(),
            local_data_dir: dirs::data_local_dir(),
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            temp_dir: std::env::temp_dir(),
        }
    }

    /// Returns the install directory: explicit override, then the platform default.
    ///
    /// Relative overrides are resolved against the captured working directory.
    #[must_use]
    pub fn resolve_install_dir(&self, flag: Option<&Path>) -> PathBuf {
        let chosen = flag
            .map(Path::to_path_buf)
            .or_else(|| self.install_dir.clone())
            .unwrap_or_else(|| self.default_install_dir());

        if chosen.is_absolute() {
            chosen
        } else {
            self.working_dir.join(chosen)
        }
    }

    /// Platform default install directory.
    ///
    /// `/usr/local/bin` on unix; `%LOCALAPPDATA%\kanuni\bin` on Windows, falling
    /// back to the home directory when the local data dir is unknown.
    #[must_use]
    pub fn default_install_dir(&self) -> PathBuf {
        if is_windows_os(&self.os) {
            self.local_data_dir
                .clone()
                .or_else(|| self.home_dir.clone())
                .unwrap_or_else(|| self.working_dir.clone())
                .join(BINARY_NAME)
                .join("bin")
        } else {
            PathBuf::from("/usr/local/bin")
        }
    }

    /// File name of the installed binary on this OS.
    #[must_use]
    pub fn binary_file_name(&self) -> String {
        format!("{BINARY_NAME}{}", executable_extension_for(&self.os))
    }
}

/// Fully resolved settings for one installer run.
#[derive(Debug, Clone)]
pub struct InstallConfig {
    pub install_dir: PathBuf,
    pub registry: crate::installer::release::Registry,
    /// Release tag to install instead of querying the registry.
    pub pinned_version: Option<String>,
    /// Skip the overwrite confirmation.
    pub assume_yes: bool,
    pub allow_unverified: bool,
    pub completions: bool,
    pub progress: bool,
}

fn non_blank_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Interprets `1`, `true`, `yes` and `on` (any case) as enabled.
#[must_use]
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
