//! Latest-release lookup against the release registry.
//!
//! The registry exposes a GitHub-style API: `GET {api}/releases/latest`
//! returns a JSON document whose `tag_name` is the version to install.
//! Archives are served from `{download}/releases/download/{tag}/...`.
//!
//! ## Registry override
//!
//! `KANUNI_REGISTRY` replaces both base URLs with a single one, which is how
//! mirrors and tests point the installer elsewhere. Blank values are ignored.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::errors::InstallerError;

/// Default API base for release metadata.
pub const DEFAULT_API_BASE: &str = "https://api.github.com/repos/v-lawyer/kanuni-cli";

/// Default base for release downloads.
pub const DEFAULT_DOWNLOAD_BASE: &str = "https://github.com/v-lawyer/kanuni-cli";

/// Request timeout for metadata lookups.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Where releases are looked up and downloaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    api_base: String,
    download_base: String,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            download_base: DEFAULT_DOWNLOAD_BASE.to_string(),
        }
    }
}

impl Registry {
    /// Registry serving both metadata and downloads from one base URL.
    #[must_use]
    pub fn single(base: &str) -> Self {
        let base = base.trim().trim_end_matches('/').to_string();
        Self {
            api_base: base.clone(),
            download_base: base,
        }
    }

    /// Uses the override when present, the public registry otherwise.
    #[must_use]
    pub fn from_override(base: Option<&str>) -> Self {
        base.filter(|b| !b.trim().is_empty())
            .map_or_else(Self::default, Self::single)
    }

    #[must_use]
    pub fn latest_release_url(&self) -> String {
        format!("{}/releases/latest", self.api_base)
    }

    /// Base for `releases/download/{tag}/{file}` URLs.
    #[must_use]
    pub fn download_base(&self) -> &str {
        &self.download_base
    }
}

/// An immutable release tag such as `v0.4.1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseVersion(String);

impl ReleaseVersion {
    /// Wraps a tag, rejecting blank ones.
    #[must_use]
    pub fn new(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        (!tag.is_empty()).then(|| Self(tag.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses the tag as semver, ignoring a leading `v`.
    #[must_use]
    pub fn semver(&self) -> Option<semver::Version> {
        semver::Version::parse(self.0.trim_start_matches('v')).ok()
    }
}

impl std::fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Deserialize)]
struct LatestRelease {
    #[serde(default)]
    tag_name: Option<String>,
}

/// Queries the registry for the latest release tag.
///
/// Performs exactly one request. There is no retry: any failure is returned
/// immediately and re-running the installer is the retry mechanism.
///
/// # Errors
///
/// Returns [`InstallerError::VersionResolutionFailed`] when the request fails,
/// the status is not 2xx (rate limiting included), or the body is empty,
/// malformed, or lacks a non-blank `tag_name`.
pub async fn resolve_latest(
    client: &reqwest::Client,
    registry: &Registry,
) -> Result<ReleaseVersion, InstallerError> {
    let url = registry.latest_release_url();
    let fail = |reason: String| InstallerError::version_resolution_failed(&url, reason);

    debug!(%url, "querying latest release");
    let response = client
        .get(&url)
        .header("Accept", "application/json")
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .send()
        .await
        .map_err(|e| fail(format!("request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(fail(describe_status(status)));
    }

    let body = response
        .text()
        .await
        .map_err(|e| fail(format!("failed to read response: {e}")))?;

    parse_latest(&body).map_err(fail)
}

fn describe_status(status: reqwest::StatusCode) -> String {
    match status.as_u16() {
        403 | 429 => format!("rate limited by the registry (HTTP {})", status.as_u16()),
        404 => "no published release found (HTTP 404)".to_string(),
        code if code >= 500 => format!("registry server error (HTTP {code})"),
        code => format!("HTTP error {code}"),
    }
}

fn parse_latest(body: &str) -> Result<ReleaseVersion, String> {
    if body.trim().is_empty() {
        return Err("empty response".to_string());
    }
    let release: LatestRelease =
        serde_json::from_str(body).map_err(|e| format!("malformed response: {e}"))?;

    release
        .tag_name
        .as_deref()
        .and_then(ReleaseVersion::new)
        .ok_or_else(|| "response has no tag_name".to_string())
}
