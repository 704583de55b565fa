//! Archive extraction and binary lookup.
//!
//! Release archives are `tar.gz` everywhere except Windows, which ships `zip`.
//! Extraction only ever runs on an archive that already passed verification.
//! Entries with absolute paths or `..` components are refused so an archive
//! cannot write outside the extraction directory. Symlink and hard link entries
//! are skipped; a release archive only needs regular files.

use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;
use tracing::debug;
use walkdir::WalkDir;

use crate::errors::InstallerError;

/// Extracts a `.zip` or `.tar.gz`/`.tgz` archive into `dest_dir`.
///
/// The format is chosen from the file name.
///
/// # Errors
///
/// Returns [`InstallerError::ExtractionFailed`] if the archive is unreadable,
/// corrupt, contains unsafe paths, or files cannot be written.
pub fn extract_archive(archive_path: &Path, dest_dir: &Path) -> Result<(), InstallerError> {
    let fail = |reason: String| InstallerError::extraction_failed(archive_path, reason);

    std::fs::create_dir_all(dest_dir)
        .map_err(|e| fail(format!("cannot create {}: {e}", dest_dir.display())))?;

    let name = archive_path.to_string_lossy();
    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        extract_tar_gz(archive_path, dest_dir).map_err(fail)
    } else if name.ends_with(".zip") {
        extract_zip(archive_path, dest_dir).map_err(fail)
    } else {
        Err(fail("unrecognised archive format".to_string()))
    }
}

fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> Result<(), String> {
    let file = std::fs::File::open(archive_path).map_err(|e| format!("cannot open: {e}"))?;
    let mut archive = Archive::new(GzDecoder::new(file));

    let entries = archive
        .entries()
        .map_err(|e| format!("cannot read tar entries: {e}"))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| format!("corrupt tar entry: {e}"))?;
        let entry_path = entry
            .path()
            .map_err(|e| format!("invalid entry path: {e}"))?
            .into_owned();
        ensure_enclosed(&entry_path)?;

        let kind = entry.header().entry_type();
        if kind.is_symlink() || kind.is_hard_link() {
            debug!(path = %entry_path.display(), "skipping link entry");
            continue;
        }

        let unpacked = entry
            .unpack_in(dest_dir)
            .map_err(|e| format!("cannot extract {}: {e}", entry_path.display()))?;
        if !unpacked {
            return Err(format!(
                "refusing to extract outside the destination: {}",
                entry_path.display()
            ));
        }
    }

    Ok(())
}

fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<(), String> {
    let file = std::fs::File::open(archive_path).map_err(|e| format!("cannot open: {e}"))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| format!("not a valid zip archive: {e}"))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| format!("corrupt zip entry {i}: {e}"))?;

        // enclosed_name already filters these; checked again like tar entries
        let entry_path = entry
            .enclosed_name()
            .ok_or_else(|| format!("refusing unsafe entry path: {}", entry.name()))?;
        ensure_enclosed(&entry_path)?;
        if entry.is_symlink() {
            debug!(path = %entry_path.display(), "skipping link entry");
            continue;
        }

        let output_path = dest_dir.join(&entry_path);
        if entry.is_dir() {
            create_dir(&output_path)?;
            continue;
        }
        if let Some(parent) = output_path.parent() {
            create_dir(parent)?;
        }

        let mut outfile = std::fs::File::create(&output_path)
            .map_err(|e| format!("cannot create {}: {e}", output_path.display()))?;
        std::io::copy(&mut entry, &mut outfile)
            .map_err(|e| format!("cannot extract {}: {e}", entry_path.display()))?;
    }

    Ok(())
}

fn ensure_enclosed(path: &Path) -> Result<(), String> {
    if path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
    {
        return Err(format!(
            "refusing to extract path with parent directory or absolute reference: {}",
            path.display()
        ));
    }
    Ok(())
}

fn create_dir(path: &Path) -> Result<(), String> {
    std::fs::create_dir_all(path).map_err(|e| format!("cannot create {}: {e}", path.display()))
}

/// Finds `binary_name` inside an extracted tree.
///
/// An exact match at the root wins. Otherwise the tree is searched
/// recursively and the shallowest regular file with that name is returned,
/// which covers layouts like `kanuni-v1.2.0/bin/kanuni`. Symlinks are never
/// followed.
///
/// # Errors
///
/// Returns [`InstallerError::BinaryNotFoundInArchive`] when nothing matches.
pub fn locate_binary(extract_dir: &Path, binary_name: &str) -> Result<PathBuf, InstallerError> {
    let direct = extract_dir.join(binary_name);
    if std::fs::symlink_metadata(&direct).is_ok_and(|m| m.is_file()) {
        return Ok(direct);
    }

    let found = WalkDir::new(extract_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && e.file_name() == binary_name)
        .min_by_key(walkdir::DirEntry::depth)
        .map(walkdir::DirEntry::into_path);

    match found {
        Some(path) => {
            debug!(path = %path.display(), "located binary in nested layout");
            Ok(path)
        }
        None => Err(InstallerError::binary_not_found(binary_name, extract_dir)),
    }
}
