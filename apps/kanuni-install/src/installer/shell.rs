//! Shell detection and completion script installation.
//!
//! After the binary is in place the installer asks it for completion scripts
//! (`kanuni completions <shell>`) and drops each one into the first well-known
//! completion directory that already exists for that shell:
//!
//! | Shell | File          | Directories, in order                                                                                                       |
//! |-------|---------------|-----------------------------------------------------------------------------------------------------------------------------|
//! | bash  | `kanuni`      | `~/.local/share/bash-completion/completions`, `/usr/local/etc/bash_completion.d`, `/opt/homebrew/etc/bash_completion.d`, `/etc/bash_completion.d` |
//! | zsh   | `_kanuni`     | `~/.zfunc`, `~/.zsh/completions`, `/usr/local/share/zsh/site-functions`, `/opt/homebrew/share/zsh/site-functions`           |
//! | fish  | `kanuni.fish` | `~/.config/fish/completions`                                                                                                |
//!
//! Directories are never created. Nothing in this module can fail a run:
//! problems come back as [`CompletionOutcome::Failed`] and are logged as
//! warnings.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

use crate::config::BINARY_NAME;
use crate::errors::InstallerError;

/// Shell markers read from the environment.
#[derive(Debug, Clone, Default)]
pub struct ShellSignals {
    /// `SHELL`, usually a path such as `/bin/zsh`.
    pub shell: Option<String>,
    pub zsh_version: Option<String>,
    pub bash_version: Option<String>,
    pub fish_version: Option<String>,
}

impl ShellSignals {
    #[must_use]
    pub fn capture() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            shell: var("SHELL"),
            zsh_version: var("ZSH_VERSION"),
            bash_version: var("BASH_VERSION"),
            fish_version: var("FISH_VERSION"),
        }
    }
}

/// The operator's shell as far as completion setup is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellKind {
    Bash,
    Zsh,
    Fish,
    Unknown,
}

impl ShellKind {
    /// Shells completions can be installed for.
    pub const SUPPORTED: [ShellKind; 3] = [Self::Bash, Self::Zsh, Self::Fish];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bash => "bash",
            Self::Zsh => "zsh",
            Self::Fish => "fish",
            Self::Unknown => "unknown",
        }
    }

    /// File name the completion script is written under.
    #[must_use]
    pub fn completion_file_name(self) -> Option<String> {
        match self {
            Self::Bash => Some(BINARY_NAME.to_string()),
            Self::Zsh => Some(format!("_{BINARY_NAME}")),
            Self::Fish => Some(format!("{BINARY_NAME}.fish")),
            Self::Unknown => None,
        }
    }

    /// Shells to configure when this one is detected: itself, or all of them
    /// when detection failed.
    #[must_use]
    pub fn targets(self) -> Vec<ShellKind> {
        match self {
            Self::Unknown => Self::SUPPORTED.to_vec(),
            known => vec![known],
        }
    }

    fn from_name(name: &str) -> Self {
        match name {
            "bash" => Self::Bash,
            "zsh" => Self::Zsh,
            "fish" => Self::Fish,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ShellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detects the shell from the basename of `SHELL`, then the version markers.
#[must_use]
pub fn detect_shell(signals: &ShellSignals) -> ShellKind {
    let from_path = signals
        .shell
        .as_deref()
        .and_then(|s| Path::new(s.trim()).file_stem()?.to_str().map(str::to_string))
        .map_or(ShellKind::Unknown, |name| {
            ShellKind::from_name(&name.to_ascii_lowercase())
        });
    if from_path != ShellKind::Unknown {
        return from_path;
    }

    if signals.zsh_version.is_some() {
        ShellKind::Zsh
    } else if signals.bash_version.is_some() {
        ShellKind::Bash
    } else if signals.fish_version.is_some() {
        ShellKind::Fish
    } else {
        ShellKind::Unknown
    }
}

/// Well-known completion directories for `kind`, in preference order.
///
/// Home-relative entries are omitted when the home directory is unknown.
#[must_use]
pub fn completion_dirs(kind: ShellKind, home: Option<&Path>) -> Vec<PathBuf> {
    let (user, system): (&[&str], &[&str]) = match kind {
        ShellKind::Bash => (
            &[".local/share/bash-completion/completions"],
            &[
                "/usr/local/etc/bash_completion.d",
                "/opt/homebrew/etc/bash_completion.d",
                "/etc/bash_completion.d",
            ],
        ),
        ShellKind::Zsh => (
            &[".zfunc", ".zsh/completions"],
            &[
                "/usr/local/share/zsh/site-functions",
                "/opt/homebrew/share/zsh/site-functions",
            ],
        ),
        ShellKind::Fish => (&[".config/fish/completions"], &[]),
        ShellKind::Unknown => (&[], &[]),
    };

    let mut dirs: Vec<PathBuf> = home
        .map(|h| user.iter().map(|rel| h.join(rel)).collect())
        .unwrap_or_default();
    dirs.extend(system.iter().map(PathBuf::from));
    dirs
}

/// Result of setting up completions for one shell.
#[derive(Debug)]
pub enum CompletionOutcome {
    Installed { shell: ShellKind, path: PathBuf },
    /// No candidate directory exists.
    Skipped { shell: ShellKind },
    Failed(InstallerError),
}

/// Installs the completion script for `shell` into the first existing directory
/// among `candidates`.
#[must_use]
pub fn install_completion(
    binary: &Path,
    shell: ShellKind,
    candidates: &[PathBuf],
) -> CompletionOutcome {
    let Some(file_name) = shell.completion_file_name() else {
        return CompletionOutcome::Skipped { shell };
    };
    let Some(dir) = candidates.iter().find(|d| d.is_dir()) else {
        debug!(%shell, "no completion directory exists; skipping");
        return CompletionOutcome::Skipped { shell };
    };

    match write_completion(binary, shell, &dir.join(file_name)) {
        Ok(path) => {
            debug!(%shell, path = %path.display(), "installed completions");
            CompletionOutcome::Installed { shell, path }
        }
        Err(reason) => {
            let err = InstallerError::completion_setup_failed(shell.as_str(), reason);
            warn!("{err}");
            CompletionOutcome::Failed(err)
        }
    }
}

fn write_completion(binary: &Path, shell: ShellKind, path: &Path) -> Result<PathBuf, String> {
    let output = Command::new(binary)
        .args(["completions", shell.as_str()])
        .output()
        .map_err(|e| format!("cannot run {}: {e}", binary.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "`{} completions {shell}` failed: {}",
            binary.display(),
            stderr.trim()
        ));
    }
    if output.stdout.is_empty() {
        return Err(format!("`{} completions {shell}` printed nothing", binary.display()));
    }

    std::fs::write(path, &output.stdout)
        .map_err(|e| format!("cannot write {}: {e}", path.display()))?;
    Ok(path.to_path_buf())
}

/// Sets up completions for the detected shell, or every supported shell when
/// detection failed.
#[must_use]
pub fn configure_completions(
    binary: &Path,
    detected: ShellKind,
    home: Option<&Path>,
) -> Vec<CompletionOutcome> {
    detected
        .targets()
        .into_iter()
        .map(|shell| install_completion(binary, shell, &completion_dirs(shell, home)))
        .collect()
}
