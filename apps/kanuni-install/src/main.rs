#![warn(clippy::pedantic)]

//! # kanuni installer (kanuni-install)
//!
//! Installs or updates the `kanuni` CLI on the current machine.
//!
//! ## Process
//!
//! 1. Resolve the platform identifier (`linux-x64`, `darwin-arm64`, ...)
//! 2. Ask the release registry for the latest tag, unless one is pinned
//! 3. Confirm before replacing an existing install (skipped with `--yes`)
//! 4. Download the archive and its `.sha256` sidecar
//! 5. Verify the digest, extract and place the binary atomically
//! 6. Install shell completions for the detected shell
//!
//! ## Examples
//!
//! Install the latest release into the default location:
//! ```bash
//! kanuni-install
//! ```
//!
//! Install a pinned release into a user-writable directory:
//! ```bash
//! kanuni-install --tag v0.4.1 --install-dir ~/.local/bin --yes
//! ```

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use kanuni_install::InstallerError;
use kanuni_install::config::{Environment, InstallConfig};
use kanuni_install::installer::{self, Outcome, Registry, platform_elevation};

/// Installer and updater for the kanuni CLI.
#[derive(Parser)]
#[command(
    name = "kanuni-install",
    author,
    about = "Install or update the kanuni CLI",
    long_about = "Downloads the kanuni release for this platform, verifies its SHA-256 \
    checksum, installs the binary and sets up shell completions.",
    disable_version_flag = true,
    after_help = "\
INSTALL DIRECTORY:
    The install directory is chosen using the following priority order:
    1. --install-dir <DIR>
    2. KANUNI_INSTALL_DIR environment variable
    3. Platform default (/usr/local/bin, or %LOCALAPPDATA%\\kanuni\\bin on Windows)

ENVIRONMENT VARIABLES:
    KANUNI_INSTALL_DIR          Install directory override
    KANUNI_REGISTRY             Release registry base URL (mirrors, testing)
    KANUNI_VERSION              Release tag to install instead of the latest
    KANUNI_ALLOW_UNVERIFIED     Install even when no checksum file is published
    RUST_LOG                    Log filter (default: warn)"
)]
pub struct Cli {
    /// Directory to install the kanuni binary into.
    #[clap(long = "install-dir", value_name = "DIR")]
    pub install_dir: Option<PathBuf>,

    /// Replace an existing installation without asking.
    #[clap(short = 'y', long = "yes", action = clap::ArgAction::SetTrue)]
    pub yes: bool,

    /// Install this release tag instead of the latest (e.g. v0.4.1).
    #[clap(long = "tag", value_name = "TAG")]
    pub tag: Option<String>,

    /// Continue without verification when the checksum file is unavailable.
    ///
    /// A checksum file that is present is always enforced.
    #[clap(long = "allow-unverified", action = clap::ArgAction::SetTrue)]
    pub allow_unverified: bool,

    /// Do not install shell completions.
    #[clap(long = "no-completions", action = clap::ArgAction::SetTrue)]
    pub no_completions: bool,

    /// Do not draw the download progress meter.
    #[clap(long = "no-progress", action = clap::ArgAction::SetTrue)]
    pub no_progress: bool,

    /// Show debug logs; with --version, show build details.
    #[clap(short = 'v', long = "verbose", action = clap::ArgAction::SetTrue)]
    pub verbose: bool,

    /// Print version information and exit.
    #[clap(short = 'V', long = "version", action = clap::ArgAction::SetTrue)]
    pub version: bool,
}

impl Cli {
    /// Merges flags with the environment snapshot. Flags win.
    fn install_config(&self, env: &Environment) -> InstallConfig {
        InstallConfig {
            install_dir: env.resolve_install_dir(self.install_dir.as_deref()),
            registry: Registry::from_override(env.registry.as_deref()),
            pinned_version: self.tag.clone().or_else(|| env.pinned_version.clone()),
            assume_yes: self.yes,
            allow_unverified: self.allow_unverified || env.allow_unverified,
            completions: !self.no_completions,
            progress: !self.no_progress && std::io::stdout().is_terminal(),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        let exit_code = handle_error(&e);
        std::process::exit(exit_code);
    }
}

/// Prints an error and returns the exit code.
///
/// Installer errors are reported with the stage they came from.
fn handle_error(e: &anyhow::Error) -> i32 {
    if let Some(err) = e.downcast_ref::<InstallerError>() {
        eprintln!("Error ({}): {err}", err.stage());
    } else {
        eprintln!("Error: {e:?}");
    }
    1
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        print_version(cli.verbose);
        return Ok(());
    }

    init_tracing(cli.verbose);

    let env = Environment::capture();
    let config = cli.install_config(&env);
    tracing::debug!(?config, "resolved configuration");

    let elevation = platform_elevation();
    let mut stdin = std::io::stdin().lock();

    match installer::run(&config, &env, elevation.as_ref(), &mut stdin).await? {
        Outcome::Installed(report) => {
            if !report.verified {
                println!("kanuni {} was installed WITHOUT checksum verification.", report.version);
            }
            println!();
            println!("Run 'kanuni --help' to get started.");
        }
        Outcome::Cancelled => {}
    }
    Ok(())
}

/// Installs the stderr log subscriber. `RUST_LOG` overrides the level.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("Warning: failed to install log subscriber: {e}");
    }
}

fn print_version(verbose: bool) {
    println!("kanuni-install {}", env!("CARGO_PKG_VERSION"));
    if verbose {
        println!();
        println!("Build Information:");
        println!("  Version:  {}", env!("CARGO_PKG_VERSION"));
        println!("  Commit:   {}", git_commit());
        println!("  Platform: {}-{}", std::env::consts::OS, std::env::consts::ARCH);
    }
}

/// Returns the git commit embedded by the build script.
fn git_commit() -> &'static str {
    option_env!("KANUNI_INSTALL_GIT_COMMIT").unwrap_or("unknown")
}
