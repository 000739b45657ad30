//! Plugin package trees.
//!
//! Every instance owns one package tree (`<root>/<id>/`) managed by an
//! external package manager. The manager is reached through the
//! [`PackageTool`] trait; `npm` and `yarn` are the supported tools. The
//! provisioner drives a tool and reconciles the config document with what
//! actually landed in the tree.

pub mod link;
pub mod manifest;
pub mod npm;
pub mod provisioner;
pub mod yarn;

pub use manifest::{PackageManifest, PluginRecord};
pub use npm::NpmTool;
pub use provisioner::PackageProvisioner;
pub use yarn::YarnTool;

use crate::config::settings::{PackageManagerKind, Settings};
use crate::constants::PACKAGE_COMMAND_TIMEOUT_SECS;
use crate::error::{HubError, Result};
use crate::traits::PackageTool;
use crate::utils::command_exec::run_interactive_command_with_timeout;
use crate::utils::platform;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

/// Package tool selected in settings
pub fn from_settings(settings: &Settings) -> Box<dyn PackageTool> {
    match settings.package_manager {
        PackageManagerKind::Npm => Box::new(NpmTool::new()),
        PackageManagerKind::Yarn => Box::new(YarnTool::new()),
    }
}

/// Run one package-manager command inside a tree, streaming its output.
/// Non-zero exit is a `PackageManagerError`.
pub(crate) fn run_in_tree(program: &str, dir: &Path, args: &[String]) -> Result<()> {
    if !dir.is_dir() {
        return Err(HubError::PathError(format!(
            "package tree {} does not exist",
            dir.display()
        )));
    }

    let line = platform::display_command(program, args);
    let mut cmd = Command::new(program);
    cmd.args(args).current_dir(dir);

    let status = run_interactive_command_with_timeout(
        &mut cmd,
        Duration::from_secs(PACKAGE_COMMAND_TIMEOUT_SECS),
    )?;

    if !status.success() {
        return Err(HubError::PackageManagerError(format!(
            "'{}' in {} exited with {}",
            line,
            dir.display(),
            status
        )));
    }

    tracing::debug!(command = %line, dir = %dir.display(), "package command finished");
    Ok(())
}

/// Validate a `name@tag` argument before it reaches a subprocess
pub(crate) fn validate_spec(spec: &str) -> Result<()> {
    crate::utils::sanitize::parse_plugin_identifier(spec).map(|_| ())
}

#[cfg(test)]
pub(crate) mod testing;
