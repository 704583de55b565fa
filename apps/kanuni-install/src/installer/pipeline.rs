//! The install pipeline.
//!
//! Stages run strictly in order and each one must succeed before the next
//! starts:
//!
//! 1. Resolve the platform (no network before this succeeds)
//! 2. Resolve the release, or take the pinned tag
//! 3. Confirm before replacing an existing install
//! 4. Download the archive and its checksum sidecar into a private workspace
//! 5. Verify the archive digest
//! 6. Extract, locate the binary and place it at the install path
//! 7. Remove the workspace
//! 8. Install shell completions (never fails the run)
//!
//! The workspace is owned by this function, so every early return drops it and
//! removes the temporary directory.

use std::io::BufRead;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use super::archive::{extract_archive, locate_binary};
use super::artifact::ArtifactDescriptor;
use super::download::{download_file, http_client, text_progress};
use super::elevate::Elevation;
use super::install::{ExistingInstall, VersionRelation, place_binary};
use super::platform::Platform;
use super::prompt::confirm;
use super::release::{ReleaseVersion, resolve_latest};
use super::shell::{CompletionOutcome, configure_completions, detect_shell};
use super::verify::{parse_sidecar, verify_checksum};
use super::workspace::Workspace;
use crate::config::{Environment, InstallConfig};
use crate::errors::InstallerError;

/// How a run ended without error.
#[derive(Debug)]
pub enum Outcome {
    Installed(InstallReport),
    /// The operator declined to replace an existing install.
    Cancelled,
}

/// Summary of a successful install.
#[derive(Debug)]
pub struct InstallReport {
    pub version: ReleaseVersion,
    pub platform: Platform,
    pub binary_path: PathBuf,
    /// False only when the checksum endpoint was unavailable and the operator
    /// opted out of verification.
    pub verified: bool,
    pub completions: Vec<CompletionOutcome>,
}

/// Runs the full install pipeline.
///
/// `input` answers the overwrite prompt; `elevation` is consulted at most once,
/// when the install directory is not writable.
///
/// # Errors
///
/// Returns the first fatal [`InstallerError`]. Completion problems are never
/// returned; they are recorded in [`InstallReport::completions`].
pub async fn run(
    config: &InstallConfig,
    env: &Environment,
    elevation: &dyn Elevation,
    input: &mut dyn BufRead,
) -> Result<Outcome, InstallerError> {
    let platform = Platform::resolve(&env.os, &env.arch)?;
    debug!(%platform, "resolved platform");

    let client = http_client()?;
    let version = match config.pinned_version.as_deref().and_then(ReleaseVersion::new) {
        Some(pinned) => {
            println!("Using pinned release {pinned}");
            pinned
        }
        None => {
            println!("Resolving latest release...");
            resolve_latest(&client, &config.registry).await?
        }
    };

    let file_name = env.binary_file_name();
    let destination = config.install_dir.join(&file_name);

    if let Some(existing) = ExistingInstall::detect(&destination) {
        describe_existing(&existing, &version);
        if !config.assume_yes && !confirm(input, "Replace the existing installation?") {
            println!("Installation cancelled.");
            return Ok(Outcome::Cancelled);
        }
    }

    println!("Installing kanuni {version} for {platform}...");
    let workspace = Workspace::create_in(&env.temp_dir)?;
    let artifact = ArtifactDescriptor::new(&config.registry, &version, platform, &workspace);

    println!("Downloading {}...", artifact.archive_url);
    let progress = config.progress.then(text_progress);
    download_file(
        &client,
        &artifact.archive_url,
        &artifact.archive_path,
        progress.as_ref(),
    )
    .await?;

    let verified = match download_file(
        &client,
        &artifact.checksum_url,
        &artifact.checksum_path,
        None,
    )
    .await
    {
        Ok(_) => {
            let text = std::fs::read_to_string(&artifact.checksum_path).map_err(|e| {
                InstallerError::malformed_checksum(&artifact.checksum_url, e.to_string())
            })?;
            let expected = parse_sidecar(&text, &artifact.checksum_url)?;
            println!("Verifying checksum...");
            verify_checksum(&artifact.archive_path, &expected)?;
            true
        }
        Err(e) if config.allow_unverified && e.is_unavailable() => {
            warn!(url = %artifact.checksum_url, "checksum unavailable: {e}");
            eprintln!(
                "Warning: checksum file is unavailable; installing UNVERIFIED because \
                 verification was explicitly disabled"
            );
            false
        }
        Err(e) => return Err(e),
    };

    println!("Extracting...");
    let extract_dir = workspace.extract_dir();
    extract_archive(&artifact.archive_path, &extract_dir)?;
    let binary = locate_binary(&extract_dir, &file_name)?;

    let binary_path = place_binary(&binary, &config.install_dir, &file_name, elevation)?;
    workspace.close();
    println!("Installed kanuni {version} to {}", binary_path.display());

    let completions = if config.completions {
        let shell = detect_shell(&env.shell);
        debug!(%shell, "configuring completions");
        let outcomes = configure_completions(&binary_path, shell, env.home_dir.as_deref());
        for outcome in &outcomes {
            if let CompletionOutcome::Installed { shell, path } = outcome {
                println!("Installed {shell} completions to {}", path.display());
            }
        }
        outcomes
    } else {
        Vec::new()
    };

    info!(%version, path = %binary_path.display(), verified, "install complete");
    Ok(Outcome::Installed(InstallReport {
        version,
        platform,
        binary_path,
        verified,
        completions,
    }))
}

fn describe_existing(existing: &ExistingInstall, target: &ReleaseVersion) {
    let installed = existing.version.as_deref().unwrap_or("an unknown version");
    let note = match existing.relation_to(target) {
        VersionRelation::Same => " (reinstall)",
        VersionRelation::Upgrade => " (upgrade)",
        VersionRelation::Downgrade => " (downgrade)",
        VersionRelation::Unknown => "",
    };
    println!(
        "kanuni {installed} is already installed at {}; target is {target}{note}",
        existing.path.display()
    );
}
