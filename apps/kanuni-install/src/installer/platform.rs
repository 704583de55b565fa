//! Platform resolution for kanuni release artifacts.
//!
//! Maps raw OS and architecture strings to the identifier used in release
//! archive names. Resolution is a pure function of its inputs so it can run,
//! and fail, before anything touches the network.
//!
//! ## Supported Platforms
//!
//! - Linux `x86_64` / ARM64 (`linux-x64`, `linux-arm64`)
//! - macOS `x86_64` / ARM64 (`darwin-x64`, `darwin-arm64`)
//! - Windows `x86_64` (`windows-x64`)

use std::fmt;

use crate::errors::InstallerError;

/// A platform with a published kanuni build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    LinuxX64,
    LinuxArm64,
    DarwinX64,
    DarwinArm64,
    WindowsX64,
}

impl Platform {
    /// Every supported platform, in archive-name order.
    pub const ALL: [Platform; 5] = [
        Self::LinuxX64,
        Self::LinuxArm64,
        Self::DarwinX64,
        Self::DarwinArm64,
        Self::WindowsX64,
    ];

    /// Resolves raw OS/architecture strings to a supported platform.
    ///
    /// Matching is case-insensitive and accepts the usual aliases
    /// (`amd64`, `x86_64`, `aarch64`, `macos`, `osx`).
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::UnsupportedPlatform`] carrying the original
    /// strings when the pair is unknown or has no published build. There is no
    /// fallback to a nearby platform.
    ///
    /// # Examples
    ///
    /// ```
    /// use kanuni_install::installer::Platform;
    ///
    /// let platform = Platform::resolve("Darwin", "arm64").unwrap();
    /// assert_eq!(platform.as_str(), "darwin-arm64");
    /// ```
    pub fn resolve(os: &str, arch: &str) -> Result<Self, InstallerError> {
        let unsupported = || InstallerError::unsupported_platform(os, arch);

        let os_key = normalize_os(os).ok_or_else(unsupported)?;
        let arch_key = normalize_arch(arch).ok_or_else(unsupported)?;

        match (os_key, arch_key) {
            ("linux", "x64") => Ok(Self::LinuxX64),
            ("linux", "arm64") => Ok(Self::LinuxArm64),
            ("darwin", "x64") => Ok(Self::DarwinX64),
            ("darwin", "arm64") => Ok(Self::DarwinArm64),
            ("windows", "x64") => Ok(Self::WindowsX64),
            _ => Err(unsupported()),
        }
    }

    /// Resolves the platform this installer was compiled for.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::UnsupportedPlatform`] on targets without a build.
    pub fn current() -> Result<Self, InstallerError> {
        Self::resolve(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Returns the identifier used in archive names, e.g. `darwin-arm64`.
    #[must_use = "returns the platform string without side effects"]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LinuxX64 => "linux-x64",
            Self::LinuxArm64 => "linux-arm64",
            Self::DarwinX64 => "darwin-x64",
            Self::DarwinArm64 => "darwin-arm64",
            Self::WindowsX64 => "windows-x64",
        }
    }

    /// Returns the archive extension: `zip` on Windows, `tar.gz` elsewhere.
    #[must_use]
    pub fn archive_extension(self) -> &'static str {
        if self.is_windows() { "zip" } else { "tar.gz" }
    }

    /// Returns `.exe` on Windows and an empty string elsewhere.
    #[must_use]
    pub fn executable_extension(self) -> &'static str {
        executable_extension_for(self.os())
    }

    #[must_use]
    pub fn is_windows(self) -> bool {
        self.os() == "windows"
    }

    fn os(self) -> &'static str {
        match self {
            Self::LinuxX64 | Self::LinuxArm64 => "linux",
            Self::DarwinX64 | Self::DarwinArm64 => "darwin",
            Self::WindowsX64 => "windows",
        }
    }
}

/// Returns the executable extension for a raw OS string.
///
/// Works for operating systems without a published build too, which the shim
/// needs to name the binary it looks for.
#[must_use]
pub fn executable_extension_for(os: &str) -> &'static str {
    if is_windows_os(os) { ".exe" } else { "" }
}

/// Returns whether a raw OS string names Windows, accepting the same aliases
/// as [`Platform::resolve`].
#[must_use]
pub fn is_windows_os(os: &str) -> bool {
    normalize_os(os) == Some("windows")
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn normalize_os(os: &str) -> Option<&'static str> {
    match os.trim().to_ascii_lowercase().as_str() {
        "linux" => Some("linux"),
        "darwin" | "macos" | "osx" => Some("darwin"),
        "windows" | "win32" => Some("windows"),
        _ => None,
    }
}

fn normalize_arch(arch: &str) -> Option<&'static str> {
    match arch.trim().to_ascii_lowercase().as_str() {
        "x64" | "x86_64" | "amd64" => Some("x64"),
        "arm64" | "aarch64" => Some("arm64"),
        _ => None,
    }
}
