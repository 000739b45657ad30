//! Settings Module
//!
//! Engine settings read from `hubctl.kdl`:
//!
//! ```kdl
//! storage "/var/lib/hubctl"
//! package-manager "yarn"
//! runtime "/usr/bin/hubd"
//! service-user "hubctl"
//! shared-library "/usr/lib/hubd/node_modules/hap-nodejs"
//! elevated #true
//! probe-timeout 15
//! settle-delay 2
//! base-port 50826
//! ```
//!
//! Every node is optional. Unknown nodes are ignored.

use crate::constants::{DEFAULT_BASE_PORT, DEFAULT_PROBE_TIMEOUT_SECS, DEFAULT_SETTLE_DELAY_SECS};
use crate::error::{HubError, Result};
use crate::project_identity;
use crate::utils::paths;
use kdl::{KdlDocument, KdlNode};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackageManagerKind {
    #[default]
    Npm,
    Yarn,
}

impl FromStr for PackageManagerKind {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "npm" => Ok(Self::Npm),
            "yarn" => Ok(Self::Yarn),
            other => Err(HubError::ConfigError(format!(
                "Unknown package manager '{}'. Valid: npm, yarn",
                other
            ))),
        }
    }
}

impl fmt::Display for PackageManagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Npm => write!(f, "npm"),
            Self::Yarn => write!(f, "yarn"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub storage: Option<PathBuf>,
    pub package_manager: PackageManagerKind,
    /// Bridge runtime executable launched by service units
    pub runtime: String,
    pub service_user: Option<String>,
    /// Shared dependency symlinked into every package tree
    pub shared_library: Option<PathBuf>,
    /// Run init-system control commands through sudo
    pub elevated: bool,
    pub probe_timeout: Duration,
    pub settle_delay: Duration,
    pub base_port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage: None,
            package_manager: PackageManagerKind::default(),
            runtime: "hubd".to_string(),
            service_user: None,
            shared_library: None,
            elevated: false,
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
            settle_delay: Duration::from_secs(DEFAULT_SETTLE_DELAY_SECS),
            base_port: DEFAULT_BASE_PORT,
        }
    }
}

impl Settings {
    /// Load settings from the default location, or defaults when absent
    /// `HUBCTL_CONFIG` names an alternative settings file
    pub fn load() -> Result<Self> {
        let file = match std::env::var_os(project_identity::env_key("CONFIG")) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => paths::settings_file()?,
        };
        Self::load_from(&file)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| HubError::io(path, e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let doc: KdlDocument = content.parse()?;
        let mut settings = Self::default();

        for node in doc.nodes() {
            match node.name().value() {
                "storage" => {
                    let raw = required_string(node)?;
                    settings.storage = Some(paths::expand_home(Path::new(&raw))?);
                }
                "package-manager" => {
                    settings.package_manager = required_string(node)?.parse()?;
                }
                "runtime" => settings.runtime = required_string(node)?,
                "service-user" => settings.service_user = Some(required_string(node)?),
                "shared-library" => {
                    let raw = required_string(node)?;
                    settings.shared_library = Some(paths::expand_home(Path::new(&raw))?);
                }
                "elevated" => settings.elevated = required_bool(node)?,
                "probe-timeout" => {
                    settings.probe_timeout = Duration::from_secs(required_u64(node)?);
                }
                "settle-delay" => {
                    settings.settle_delay = Duration::from_secs(required_u64(node)?);
                }
                "base-port" => {
                    let port = required_u64(node)?;
                    settings.base_port = u16::try_from(port)
                        .ok()
                        .filter(|p| *p > 0)
                        .ok_or_else(|| {
                            HubError::ConfigError(format!("base-port out of range: {}", port))
                        })?;
                }
                other => tracing::debug!(node = other, "ignoring unknown settings node"),
            }
        }

        Ok(settings)
    }

    /// Storage root after applying flag > environment > settings > default
    pub fn resolve_storage(&self, flag: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = flag {
            return paths::expand_home(path);
        }
        if let Ok(env) = std::env::var(project_identity::env_key("STORAGE"))
            && !env.trim().is_empty()
        {
            return paths::expand_home(Path::new(env.trim()));
        }
        if let Some(path) = &self.storage {
            return Ok(path.clone());
        }
        paths::default_storage_root()
    }
}

fn first_value(node: &KdlNode) -> Option<&kdl::KdlValue> {
    node.entries().first().map(|e| e.value())
}

fn required_string(node: &KdlNode) -> Result<String> {
    first_value(node)
        .and_then(|v| v.as_string())
        .map(str::to_string)
        .ok_or_else(|| {
            HubError::ConfigError(format!("'{}' expects a string value", node.name().value()))
        })
}

fn required_bool(node: &KdlNode) -> Result<bool> {
    first_value(node).and_then(|v| v.as_bool()).ok_or_else(|| {
        HubError::ConfigError(format!("'{}' expects a boolean value", node.name().value()))
    })
}

fn required_u64(node: &KdlNode) -> Result<u64> {
    first_value(node)
        .and_then(|v| v.as_integer())
        .and_then(|i| u64::try_from(i).ok())
        .ok_or_else(|| {
            HubError::ConfigError(format!(
                "'{}' expects a non-negative integer",
                node.name().value()
            ))
        })
}

#[cfg(test)]
mod tests;
