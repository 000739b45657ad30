//! Package manifests (`package.json`) of package trees and installed plugins.

use crate::error::{HubError, Result};
use crate::utils::fsio;
use crate::utils::sanitize;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PackageManifest {
    /// Missing file is `Ok(None)`; unreadable or malformed is an error
    pub fn read(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path).map_err(|e| HubError::io(path, e))?;
        let manifest = serde_json::from_str(&content).map_err(|e| {
            HubError::ConfigError(format!("Invalid manifest {}: {}", path.display(), e))
        })?;
        Ok(Some(manifest))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        fsio::write_atomically(path, serde_json::to_string_pretty(self)?.as_bytes())
    }

    /// Dependency names, i.e. the plugins a package tree should contain
    pub fn dependency_names(&self) -> Vec<String> {
        self.dependencies.keys().cloned().collect()
    }
}

/// An installed plugin, derived from the tree manifest and the plugin's own manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginRecord {
    pub scope: Option<String>,
    pub name: String,
    pub version: String,
    pub install_directory: PathBuf,
    pub main_entry_relative_path: String,
}

impl PluginRecord {
    /// Build from an install directory; `None` when its manifest is missing or unparseable
    pub fn from_install_dir(name: &str, install_directory: &Path) -> Option<Self> {
        let manifest = match PackageManifest::read(&install_directory.join("package.json")) {
            Ok(Some(manifest)) => manifest,
            Ok(None) => return None,
            Err(e) => {
                tracing::debug!(plugin = name, error = %e, "skipping plugin with bad manifest");
                return None;
            }
        };

        let (scope, _) = sanitize::split_scope(name);
        Some(Self {
            scope: scope.map(str::to_string),
            name: manifest.name.unwrap_or_else(|| name.to_string()),
            version: manifest.version.unwrap_or_else(|| "0.0.0".to_string()),
            install_directory: install_directory.to_path_buf(),
            main_entry_relative_path: manifest.main.unwrap_or_else(|| "index.js".to_string()),
        })
    }
}
