//! Checksum verification for downloaded archives.
//!
//! The sidecar published next to each archive holds `<hex-digest>  <filename>`.
//! Only the first whitespace-delimited token is significant.

use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::errors::InstallerError;

/// Length of a hex-encoded SHA-256 digest.
const SHA256_HEX_LEN: usize = 64;

/// Extracts the expected digest from sidecar text, lowercased.
///
/// # Errors
///
/// Returns [`InstallerError::MalformedChecksum`] if the sidecar is empty or its
/// first token is not a 64-character hex string.
pub fn parse_sidecar(text: &str, url: &str) -> Result<String, InstallerError> {
    let token = text
        .split_whitespace()
        .next()
        .ok_or_else(|| InstallerError::malformed_checksum(url, "file is empty"))?;

    if token.len() != SHA256_HEX_LEN || !token.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(InstallerError::malformed_checksum(
            url,
            format!("'{token}' is not a SHA-256 hex digest"),
        ));
    }

    Ok(token.to_ascii_lowercase())
}

/// Verifies that a file matches the expected SHA-256 digest.
///
/// `expected` may be in either case.
///
/// # Errors
///
/// Returns [`InstallerError::ChecksumMismatch`] carrying both digests when they
/// differ, or when the file cannot be read at all.
pub fn verify_checksum(file_path: &Path, expected: &str) -> Result<(), InstallerError> {
    let expected = expected.to_ascii_lowercase();
    let computed = compute_sha256(file_path).map_err(|e| {
        InstallerError::checksum_mismatch(
            &expected,
            format!("<unreadable {}: {e}>", file_path.display()),
        )
    })?;

    if computed != expected {
        return Err(InstallerError::checksum_mismatch(expected, computed));
    }

    debug!(path = %file_path.display(), digest = %computed, "checksum verified");
    Ok(())
}

/// Computes the SHA-256 hash of a file as lowercase hex.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn compute_sha256(file_path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(file_path)?;

    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_SHA256: &str = "a948904f2f0f479b8f8197694b30184b0d2ed1c1cd2a1ec0fb85d299a192a447";
    const URL: &str = "https://example.com/kanuni-linux-x64.tar.gz.sha256";

    fn hello_file() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let path = dir.path().join("kanuni-linux-x64.tar.gz");
        std::fs::write(&path, b"hello world\n").expect("Should write test content");
        (dir, path)
    }

    #[test]
    fn compute_sha256_produces_correct_hash() {
        let (_dir, path) = hello_file();
        assert_eq!(compute_sha256(&path).unwrap(), HELLO_SHA256);
    }

    #[test]
    fn sidecar_trailing_filename_is_ignored() {
        let text = format!("{HELLO_SHA256}  kanuni-linux-x64.tar.gz\n");
        assert_eq!(parse_sidecar(&text, URL).unwrap(), HELLO_SHA256);

        let text = format!("{}\tsomething else entirely", HELLO_SHA256.to_uppercase());
        assert_eq!(parse_sidecar(&text, URL).unwrap(), HELLO_SHA256);
    }

    #[test]
    fn sidecar_without_a_digest_is_malformed() {
        for text in ["", "   \n", "deadbeef  kanuni-linux-x64.tar.gz", "<!DOCTYPE html>"] {
            let err = parse_sidecar(text, URL).unwrap_err();
            assert!(
                matches!(err, InstallerError::MalformedChecksum { .. }),
                "{text:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn verify_checksum_passes_for_matching_hash_in_any_case() {
        let (_dir, path) = hello_file();
        assert!(verify_checksum(&path, HELLO_SHA256).is_ok());
        assert!(verify_checksum(&path, &HELLO_SHA256.to_uppercase()).is_ok());
    }

    #[test]
    fn verify_checksum_reports_both_digests_on_mismatch() {
        let (_dir, path) = hello_file();
        let expected = "deadbeef".repeat(8);

        let err = verify_checksum(&path, &expected).unwrap_err();

        match err {
            InstallerError::ChecksumMismatch {
                expected: e,
                actual: a,
            } => {
                assert_eq!(e, expected);
                assert_eq!(a, HELLO_SHA256);
            }
            other => panic!("expected ChecksumMismatch, got {other:?}"),
        }
    }

    #[test]
    fn single_flipped_byte_is_rejected() {
        let (_dir, path) = hello_file();
        std::fs::write(&path, b"hello world!").unwrap();
        assert!(verify_checksum(&path, HELLO_SHA256).is_err());
    }

    #[test]
    fn unreadable_archive_fails_verification() {
        let result = verify_checksum(Path::new("/nonexistent/file/path"), HELLO_SHA256);
        assert!(matches!(
            result,
            Err(InstallerError::ChecksumMismatch { .. })
        ));
    }
}
