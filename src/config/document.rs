//! Per-instance configuration document.
//!
//! Typed where the engine reads or writes a field, open (`extra`,
//! `serde_json::Value` entries) everywhere the runtime or its plugins own
//! the shape.

use crate::constants::DEFAULT_PIN;
use crate::instances::types::{InstanceKind, InstanceRecord};
use rand::RngCore;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::LazyLock;

static USERNAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9A-F]{2}:){5}[0-9A-F]{2}$").expect("Invalid regex pattern"));

/// Key of the back-reference an entry carries to the plugin that registered it
pub const PLUGIN_MAP_KEY: &str = "pluginMap";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge: Option<BridgeSection>,
    /// Port range reserved for child bridges / external accessories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<PortRange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accessories: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSection {
    pub origin: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeSection {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
    #[serde(default)]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advertiser: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

/// Kind-specific defaults for a fresh document
pub fn defaults_for(record: &InstanceRecord) -> ConfigDocument {
    match record.kind {
        InstanceKind::Hub => ConfigDocument {
            api: Some(ApiSection {
                origin: "*".to_string(),
                extra: Map::new(),
            }),
            description: Some(record.display_name.clone()),
            ..ConfigDocument::default()
        },
        InstanceKind::Bridge | InstanceKind::Dev => ConfigDocument {
            bridge: Some(BridgeSection {
                name: record.display_name.clone(),
                pin: Some(record.pin.clone().unwrap_or_else(|| DEFAULT_PIN.to_string())),
                port: record.port,
                username: Some(
                    record
                        .username
                        .clone()
                        .filter(|u| is_valid_username(u))
                        .unwrap_or_else(generate_username),
                ),
                advertiser: record.advertiser.clone(),
                extra: Map::new(),
            }),
            ..ConfigDocument::default()
        },
    }
}

/// Normalization applied on every load
pub fn normalize(doc: &mut ConfigDocument, record: &InstanceRecord) {
    if let Some(range) = doc.ports
        && range.start > range.end
    {
        tracing::debug!(id = %record.id, "dropping inverted port range");
        doc.ports = None;
    }

    if let Some(bridge) = doc.bridge.as_mut() {
        if !bridge.username.as_deref().is_some_and(is_valid_username) {
            bridge.username = Some(generate_username());
        }
        bridge.name = record.display_name.clone();
    } else if doc.description.as_deref().is_none_or(str::is_empty) {
        doc.description = Some(record.display_name.clone());
    }

    let mut seen = std::collections::HashSet::new();
    doc.plugins.retain(|p| seen.insert(p.clone()));
}

/// Bridge username: six random bytes as uppercase hex pairs joined by colons.
///
/// Only the format matters; this is not a secret.
pub fn generate_username() -> String {
    let mut bytes = [0u8; 6];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

pub fn is_valid_username(username: &str) -> bool {
    USERNAME_PATTERN.is_match(username)
}

/// Recursively drop empty strings, nulls, empty objects and empty arrays.
///
/// Returns `true` when the value itself ended up empty.
fn prune(value: &mut Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => {
            items.retain_mut(|item| !prune(item));
            items.is_empty()
        }
        Value::Object(map) => {
            map.retain(|_, v| !prune(v));
            map.is_empty()
        }
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Prune a free-form value; an entirely empty value becomes `Value::Null`
pub fn filter_config(mut value: Value) -> Value {
    if prune(&mut value) { Value::Null } else { value }
}

/// Prune every platform and accessory entry, dropping entries left empty
pub fn filter_entries(doc: &mut ConfigDocument) {
    doc.platforms.retain_mut(|entry| !prune(entry));
    doc.accessories.retain_mut(|entry| !prune(entry));
}

/// Plugin name an entry's back-reference points at
pub fn entry_plugin(entry: &Value) -> Option<&str> {
    entry.get(PLUGIN_MAP_KEY)?.get("pluginName")?.as_str()
}

/// Deep merge: objects merge key by key, `overlay` wins everywhere else
pub fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
