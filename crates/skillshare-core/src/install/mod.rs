//! Installs a skill (or tracked repo) from a parsed [`crate::source::Source`]
//! into the source tree.

pub mod git_exclude;
pub mod installer;
pub mod uninstall;

pub use installer::{InstallAction, InstallOptions, InstallResult, install};
pub use uninstall::{UninstallOptions, UninstallResult, uninstall};
