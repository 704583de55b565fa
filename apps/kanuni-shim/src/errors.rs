//! Error types for the kanuni shim.

use std::path::PathBuf;
use thiserror::Error;

/// Why the shim could not hand over to the kanuni binary.
#[derive(Debug, Error)]
pub enum ShimError {
    /// No installed binary could be located.
    #[error(
        "{reason}\n\n\
        To install kanuni:\n  \
        - Run: kanuni-install\n  \
        - Or set KANUNI_BINARY to the path of an existing kanuni binary"
    )]
    BinaryNotFound {
        /// What was looked for and where.
        reason: String,
    },

    /// The binary exists but could not be started.
    #[error("failed to run {}: {source}", .binary.display())]
    Spawn {
        /// Binary that was being started.
        binary: PathBuf,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

impl ShimError {
    #[must_use]
    pub fn binary_not_found(reason: impl Into<String>) -> Self {
        Self::BinaryNotFound {
            reason: reason.into(),
        }
    }

    /// Classifies a failed start: a vanished binary is `BinaryNotFound`,
    /// anything else is `Spawn`.
    #[must_use]
    pub fn from_start_failure(binary: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let binary = binary.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::binary_not_found(format!("{} does not exist", binary.display()))
        } else {
            Self::Spawn { binary, source }
        }
    }
}
