//! Error types for the kanuni installer.
//!
//! Every failure the pipeline can produce is a variant of [`InstallerError`].
//! Each variant belongs to exactly one [`Stage`], which is what the CLI prints
//! alongside the proximate cause when a run aborts.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Platform,
    Release,
    Fetch,
    Verify,
    Install,
    Completions,
}

impl Stage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Platform => "platform resolution",
            Self::Release => "release resolution",
            Self::Fetch => "artifact download",
            Self::Verify => "integrity verification",
            Self::Install => "installation",
            Self::Completions => "shell completions",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Consolidated error type for installer operations.
#[derive(Debug, Error)]
pub enum InstallerError {
    /// The OS/architecture pair has no published build.
    #[error(
        "unsupported platform: {os} on {arch} \
         (supported: linux-x64, linux-arm64, darwin-x64, darwin-arm64, windows-x64)"
    )]
    UnsupportedPlatform {
        /// OS string as detected.
        os: String,
        /// Architecture string as detected.
        arch: String,
    },

    /// The registry could not tell us which release is the latest.
    #[error("could not resolve the latest release from {registry}: {reason}")]
    VersionResolutionFailed {
        /// URL that was queried.
        registry: String,
        /// What went wrong.
        reason: String,
    },

    /// An archive or sidecar download failed.
    #[error("download of {url} failed: {reason}")]
    DownloadFailed {
        /// URL being fetched.
        url: String,
        /// What went wrong.
        reason: String,
        /// The endpoint could not be reached at all, or answered 404/410.
        unavailable: bool,
    },

    /// The checksum sidecar was fetched but does not carry a usable digest.
    #[error("checksum file {url} is malformed: {reason}")]
    MalformedChecksum {
        /// Sidecar URL.
        url: String,
        /// What went wrong.
        reason: String,
    },

    /// The archive digest does not match the published one.
    #[error(
        "checksum mismatch: expected {expected}, got {actual}. \
         The download may be corrupted or tampered with"
    )]
    ChecksumMismatch {
        /// Digest published in the sidecar.
        expected: String,
        /// Digest computed over the downloaded archive.
        actual: String,
    },

    /// The verified archive could not be unpacked.
    #[error("failed to extract {}: {reason}", .archive.display())]
    ExtractionFailed {
        /// Archive being extracted.
        archive: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// The archive unpacked fine but does not contain the binary.
    #[error("{binary} not found in the downloaded archive (searched {})", .searched.display())]
    BinaryNotFoundInArchive {
        /// File name that was looked for.
        binary: String,
        /// Extraction root that was searched.
        searched: PathBuf,
    },

    /// The install location is not writable and elevation was unavailable or refused.
    #[error("insufficient permission to write {}: {reason}", .path.display())]
    InsufficientPermission {
        /// Path that could not be written.
        path: PathBuf,
        /// Why elevation did not help.
        reason: String,
    },

    /// Placing the binary failed for a reason other than permissions.
    #[error("failed to install {}: {reason}", .path.display())]
    InstallFailed {
        /// Destination path.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// The temporary workspace could not be created.
    #[error("failed to prepare a temporary workspace: {reason}")]
    WorkspaceFailed {
        /// What went wrong.
        reason: String,
    },

    /// Completion setup failed for one shell. Never aborts a run.
    #[error("could not install {shell} completions: {reason}")]
    CompletionSetupFailed {
        /// Shell name.
        shell: String,
        /// What went wrong.
        reason: String,
    },
}

impl InstallerError {
    /// Returns the stage this error belongs to.
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::UnsupportedPlatform { .. } => Stage::Platform,
            Self::VersionResolutionFailed { .. } => Stage::Release,
            Self::DownloadFailed { .. } | Self::WorkspaceFailed { .. } => Stage::Fetch,
            Self::MalformedChecksum { .. } | Self::ChecksumMismatch { .. } => Stage::Verify,
            Self::ExtractionFailed { .. }
            | Self::BinaryNotFoundInArchive { .. }
            | Self::InsufficientPermission { .. }
            | Self::InstallFailed { .. } => Stage::Install,
            Self::CompletionSetupFailed { .. } => Stage::Completions,
        }
    }

    /// Returns whether the error aborts the run.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::CompletionSetupFailed { .. })
    }

    #[must_use]
    pub fn unsupported_platform(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self::UnsupportedPlatform {
            os: os.into(),
            arch: arch.into(),
        }
    }

    #[must_use]
    pub fn version_resolution_failed(
        registry: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::VersionResolutionFailed {
            registry: registry.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn download_failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DownloadFailed {
            url: url.into(),
            reason: reason.into(),
            unavailable: false,
        }
    }

    /// A download failure where the server was never reached or reports the
    /// resource as absent.
    #[must_use]
    pub fn download_unavailable(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DownloadFailed {
            url: url.into(),
            reason: reason.into(),
            unavailable: true,
        }
    }

    /// Returns whether this is a download whose endpoint was entirely unavailable.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::DownloadFailed {
                unavailable: true,
                ..
            }
        )
    }

    #[must_use]
    pub fn malformed_checksum(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedChecksum {
            url: url.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn checksum_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::ChecksumMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    #[must_use]
    pub fn extraction_failed(archive: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ExtractionFailed {
            archive: archive.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn binary_not_found(binary: impl Into<String>, searched: impl Into<PathBuf>) -> Self {
        Self::BinaryNotFoundInArchive {
            binary: binary.into(),
            searched: searched.into(),
        }
    }

    #[must_use]
    pub fn insufficient_permission(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InsufficientPermission {
            path: path.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn install_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InstallFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn workspace_failed(reason: impl Into<String>) -> Self {
        Self::WorkspaceFailed {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn completion_setup_failed(shell: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CompletionSetupFailed {
            shell: shell.into(),
            reason: reason.into(),
        }
    }
}
