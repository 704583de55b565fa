//! Artifact descriptors: which URLs to fetch and where they land.

use std::path::PathBuf;

use super::platform::Platform;
use super::release::{Registry, ReleaseVersion};
use super::workspace::Workspace;
use crate::config::BINARY_NAME;

/// Suffix appended to an archive URL to get its checksum sidecar.
pub const CHECKSUM_SUFFIX: &str = ".sha256";

/// Everything needed to fetch and verify one release archive.
///
/// Built once per run from the resolved version and platform, then consumed by
/// the fetch, verify and install stages.
#[derive(Debug, Clone)]
pub struct ArtifactDescriptor {
    pub version: ReleaseVersion,
    pub platform: Platform,
    pub archive_name: String,
    pub archive_url: String,
    pub checksum_url: String,
    pub archive_path: PathBuf,
    pub checksum_path: PathBuf,
}

impl ArtifactDescriptor {
    #[must_use]
    pub fn new(
        registry: &Registry,
        version: &ReleaseVersion,
        platform: Platform,
        workspace: &Workspace,
    ) -> Self {
        let archive_name = archive_name(platform);
        let archive_url = archive_url(registry, version, platform);
        let checksum_url = format!("{archive_url}{CHECKSUM_SUFFIX}");

        Self {
            version: version.clone(),
            platform,
            archive_path: workspace.file(&archive_name),
            checksum_path: workspace.file(&format!("{archive_name}{CHECKSUM_SUFFIX}")),
            archive_name,
            archive_url,
            checksum_url,
        }
    }
}

/// `kanuni-{platform}.{ext}`
#[must_use]
pub fn archive_name(platform: Platform) -> String {
    format!("{BINARY_NAME}-{platform}.{}", platform.archive_extension())
}

/// `{download}/releases/download/{version}/kanuni-{platform}.{ext}`
#[must_use]
pub fn archive_url(registry: &Registry, version: &ReleaseVersion, platform: Platform) -> String {
    format!(
        "{}/releases/download/{version}/{}",
        registry.download_base(),
        archive_name(platform)
    )
}
