#![warn(clippy::pedantic)]

//! # kanuni shim
//!
//! Thin launcher placed where a `kanuni` command is expected (package manager
//! wrappers, container entry points). It locates the installed kanuni binary
//! and forwards the invocation to it unchanged: same arguments, environment,
//! working directory and exit code.
//!
//! ## Binary resolution
//!
//! 1. `KANUNI_BINARY` environment variable (explicit override)
//! 2. The installer's install directory (`KANUNI_INSTALL_DIR` or the default)
//! 3. `kanuni` on `PATH`, excluding the shim itself

mod errors;
mod forward;
mod resolve;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use errors::ShimError;
use forward::forward_invocation;
use resolve::{Lookup, resolve_installed_binary};

fn main() {
    init_tracing();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => std::process::exit(handle_error(&e)),
    }
}

/// Prints an error and returns the exit code.
fn handle_error(e: &anyhow::Error) -> i32 {
    if let Some(err) = e.downcast_ref::<ShimError>() {
        eprintln!("kanuni-shim: {err}");
    } else {
        eprintln!("kanuni-shim: {e:#}");
    }
    1
}

fn run() -> Result<i32> {
    let args: Vec<_> = std::env::args_os().skip(1).collect();
    let lookup = Lookup::capture();
    let binary = resolve_installed_binary(&lookup)?;
    let code = forward_invocation(&binary, &args)
        .with_context(|| format!("forwarding to {}", binary.display()))?;
    Ok(code)
}

/// Logs go to stderr at `warn` unless `RUST_LOG` says otherwise.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
