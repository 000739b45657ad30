//! Central project identity contract.
//!
//! This module is the single source of truth for runtime identity values.

pub const DISPLAY_NAME: &str = "Hubctl";
pub const BINARY_NAME: &str = "hubctl";
pub const STABLE_PROJECT_ID: &str = "hubctl";
pub const CONFIG_DIR_NAME: &str = "hubctl";
pub const ENV_PREFIX: &str = "HUBCTL";
pub const CONFIG_FILE_BASENAME: &str = "hubctl.kdl";

/// Prefix for init-system unit names and launchd labels.
pub const SERVICE_PREFIX: &str = "hubctl";
pub const LAUNCHD_LABEL_PREFIX: &str = "org.hubctl";

pub fn env_key(suffix: &str) -> String {
    format!("{}_{}", ENV_PREFIX, suffix)
}

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
