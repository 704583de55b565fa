//! The kanuni install pipeline and its stages.
//!
//! ## Module Structure
//!
//! - [`platform`] - OS and architecture resolution
//! - [`release`] - Registry identity and latest-release lookup
//! - [`workspace`] - Private temporary directory for one run
//! - [`artifact`] - Archive and sidecar URLs for a release
//! - [`download`] - Streaming HTTP download with progress reporting
//! - [`verify`] - SHA-256 sidecar parsing and verification
//! - [`archive`] - tar.gz and zip extraction, binary lookup
//! - [`elevate`] - Privilege elevation capability
//! - [`install`] - Atomic placement of the binary, existing install detection
//! - [`prompt`] - `[y/N]` confirmation
//! - [`shell`] - Shell detection and completion scripts
//! - [`pipeline`] - The stages wired together

pub mod archive;
pub mod artifact;
pub mod download;
pub mod elevate;
pub mod install;
pub mod pipeline;
pub mod platform;
pub mod prompt;
pub mod release;
pub mod shell;
pub mod verify;
pub mod workspace;

pub use download::{ProgressCallback, ProgressEvent};
pub use elevate::{Elevation, platform_elevation};
pub use pipeline::{InstallReport, Outcome, run};
pub use platform::Platform;
pub use release::{Registry, ReleaseVersion};
pub use shell::{CompletionOutcome, ShellKind, ShellSignals};
