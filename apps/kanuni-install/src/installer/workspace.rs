//! Process-private scratch space for one installer run.
//!
//! The workspace is a uniquely named directory (`kanuni-install-XXXXXX`) under
//! the captured temp dir. It is removed when the [`Workspace`] is dropped, so
//! every exit path out of the pipeline, `?` included, cleans up after itself.
//! An interrupted process leaves at most this directory behind.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::errors::InstallerError;

const PREFIX: &str = "kanuni-install-";

/// Scratch directory holding the archive, its sidecar and the extracted tree.
pub struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    /// Creates a fresh workspace under `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::WorkspaceFailed`] if the directory cannot be created.
    pub fn create_in(parent: &Path) -> Result<Self, InstallerError> {
        let dir = tempfile::Builder::new()
            .prefix(PREFIX)
            .tempdir_in(parent)
            .map_err(|e| {
                InstallerError::workspace_failed(format!("{}: {e}", parent.display()))
            })?;
        debug!(path = %dir.path().display(), "created workspace");
        Ok(Self { dir })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Location for a downloaded file.
    #[must_use]
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Directory the archive is extracted into.
    #[must_use]
    pub fn extract_dir(&self) -> PathBuf {
        self.dir.path().join("extract")
    }

    /// Removes the workspace now, logging rather than failing on errors.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!(path = %path.display(), "removed workspace"),
            Err(e) => warn!(path = %path.display(), "failed to remove workspace: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_is_removed_on_drop() {
        let parent = tempfile::tempdir().unwrap();
        let path = {
            let ws = Workspace::create_in(parent.path()).unwrap();
            std::fs::write(ws.file("kanuni-linux-x64.tar.gz"), b"data").unwrap();
            std::fs::create_dir_all(ws.extract_dir().join("nested")).unwrap();
            ws.path().to_path_buf()
        };
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(parent.path()).unwrap().count(), 0);
    }

    #[test]
    fn concurrent_workspaces_get_distinct_names() {
        let parent = tempfile::tempdir().unwrap();
        let a = Workspace::create_in(parent.path()).unwrap();
        let b = Workspace::create_in(parent.path()).unwrap();
        assert_ne!(a.path(), b.path());
        let name = a.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("kanuni-install-"));
        a.close();
        b.close();
        assert_eq!(std::fs::read_dir(parent.path()).unwrap().count(), 0);
    }

    #[test]
    fn missing_parent_is_a_workspace_error() {
        let parent = tempfile::tempdir().unwrap();
        let missing = parent.path().join("does-not-exist");
        let err = Workspace::create_in(&missing).err().unwrap();
        assert!(matches!(err, InstallerError::WorkspaceFailed { .. }));
    }
}
