#![warn(clippy::pedantic)]

//! Installer library for the kanuni CLI.
//!
//! The `kanuni-install` binary is a thin clap front end over
//! [`installer::run`]; `kanuni-shim` reuses [`config`] to find the installed
//! binary the same way the installer places it.

pub mod config;
pub mod errors;
pub mod installer;

pub use errors::{InstallerError, Stage};
