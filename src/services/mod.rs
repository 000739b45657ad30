//! Host service-unit strategies.
//!
//! The active strategy is picked by probing the host for marker
//! directories; nothing else in the crate names an init system.

mod foreground;
mod launchd;
mod systemd;
pub mod templates;

pub use foreground::ForegroundManager;
pub use launchd::LaunchdManager;
pub use systemd::SystemdManager;

use crate::config::settings::Settings;
use crate::constants::SERVICE_COMMAND_TIMEOUT_SECS;
use crate::error::Result;
use crate::traits::{HostCommand, ServiceManager};
use crate::utils::command_exec::run_command_with_timeout;
use crate::utils::paths::StoragePaths;
use crate::utils::platform;
use std::path::Path;
use std::time::Duration;

pub const SYSTEMD_UNIT_DIR: &str = "/etc/systemd/system";
pub const LAUNCHD_DAEMON_DIR: &str = "/Library/LaunchDaemons";

/// Runs init-system control commands on this host
pub struct ShellHost {
    elevated: bool,
    timeout: Duration,
}

impl ShellHost {
    pub fn new(elevated: bool) -> Self {
        Self {
            elevated,
            timeout: Duration::from_secs(SERVICE_COMMAND_TIMEOUT_SECS),
        }
    }
}

impl HostCommand for ShellHost {
    fn run(&self, program: &str, args: &[String]) -> Result<bool> {
        let mut cmd = platform::build_program_command(program, args, self.elevated)?;
        let output = run_command_with_timeout(&mut cmd, self.timeout)?;

        if !output.status.success() {
            tracing::warn!(
                command = %platform::display_command(program, args),
                status = ?output.status.code(),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "host command failed"
            );
        }
        Ok(output.status.success())
    }
}

/// Run a host command, downgrading every failure to `false`
pub(crate) fn run_quietly(host: &dyn HostCommand, program: &str, args: &[&str]) -> bool {
    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    match host.run(program, &args) {
        Ok(ok) => ok,
        Err(e) => {
            tracing::warn!(error = %e, "host command could not run");
            false
        }
    }
}

/// Pick the strategy for this host
pub fn detect(paths: &StoragePaths, settings: &Settings) -> Box<dyn ServiceManager> {
    let host = || Box::new(ShellHost::new(settings.elevated));

    if Path::new(SYSTEMD_UNIT_DIR).is_dir() && which::which("systemctl").is_ok() {
        return Box::new(SystemdManager::new(
            SYSTEMD_UNIT_DIR,
            paths.root(),
            settings.clone(),
            host(),
        ));
    }

    if Path::new(LAUNCHD_DAEMON_DIR).is_dir() && which::which("launchctl").is_ok() {
        return Box::new(LaunchdManager::new(
            LAUNCHD_DAEMON_DIR,
            paths.root(),
            settings.clone(),
            host(),
        ));
    }

    tracing::debug!("no supported init system found, instances run in the foreground");
    Box::new(ForegroundManager)
}
