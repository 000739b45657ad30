//! Declarative capability discovery from a shipped `config.schema.json`.

use super::{CapabilityKind, CapabilityRecord};
use crate::constants::PLUGIN_SCHEMA_NAME;
use crate::error::{HubError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PluginSchema {
    #[serde(default)]
    plugin_alias: Option<String>,
    #[serde(default)]
    plugin_type: Option<String>,
}

/// `Ok(None)` when the plugin ships no usable schema
pub fn read_schema(plugin_name: &str, install_dir: &Path) -> Result<Option<CapabilityRecord>> {
    let path = install_dir.join(PLUGIN_SCHEMA_NAME);
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&path).map_err(|e| HubError::io(&path, e))?;
    let schema: PluginSchema = serde_json::from_str(&content)?;

    let Some(alias) = schema.plugin_alias.filter(|a| !a.trim().is_empty()) else {
        return Ok(None);
    };

    let kind = match schema.plugin_type.as_deref() {
        Some("accessory") => CapabilityKind::Accessory,
        _ => CapabilityKind::Platform,
    };

    Ok(Some(CapabilityRecord {
        plugin_name: plugin_name.to_string(),
        alias,
        kind,
    }))
}
