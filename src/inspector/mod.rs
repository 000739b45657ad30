//! Capability discovery for installed plugins.
//!
//! A plugin either declares its alias in a shipped schema document or is
//! probed by running its entry module against a fake runtime. Results are
//! cached per plugin name for the lifetime of the inspector.

pub mod probe;
pub mod schema;

use crate::packages::manifest::PluginRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityKind {
    Platform,
    Accessory,
}

impl CapabilityKind {
    /// Config document section holding entries of this kind
    pub fn section(self) -> &'static str {
        match self {
            Self::Platform => "platforms",
            Self::Accessory => "accessories",
        }
    }

    /// Key naming the alias inside a section entry
    pub fn alias_key(self) -> &'static str {
        match self {
            Self::Platform => "platform",
            Self::Accessory => "accessory",
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.alias_key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityRecord {
    pub plugin_name: String,
    pub alias: String,
    #[serde(rename = "type")]
    pub kind: CapabilityKind,
}

pub struct PluginInspector {
    cache: HashMap<String, Vec<CapabilityRecord>>,
    probe_timeout: Duration,
}

impl PluginInspector {
    pub fn new(probe_timeout: Duration) -> Self {
        Self {
            cache: HashMap::new(),
            probe_timeout,
        }
    }

    /// Capabilities of an installed plugin. Never fails: a broken plugin
    /// yields an empty list.
    pub fn discover(&mut self, plugin: &PluginRecord) -> Vec<CapabilityRecord> {
        if let Some(cached) = self.cache.get(&plugin.name) {
            tracing::debug!(plugin = %plugin.name, "capabilities served from cache");
            return cached.clone();
        }

        let found = self.inspect(plugin);
        self.cache.insert(plugin.name.clone(), found.clone());
        found
    }

    /// Drop the cached result for one plugin (after upgrade or removal)
    pub fn forget(&mut self, plugin_name: &str) {
        self.cache.remove(plugin_name);
    }

    fn inspect(&self, plugin: &PluginRecord) -> Vec<CapabilityRecord> {
        match schema::read_schema(&plugin.name, &plugin.install_directory) {
            Ok(Some(record)) => return vec![record],
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(plugin = %plugin.name, error = %e, "unreadable plugin schema, probing instead");
            }
        }

        match probe::run(plugin, self.probe_timeout) {
            Ok(records) => dedup(records),
            Err(e) => {
                tracing::warn!(plugin = %plugin.name, error = %e, "capability probe failed");
                Vec::new()
            }
        }
    }
}

fn dedup(records: Vec<CapabilityRecord>) -> Vec<CapabilityRecord> {
    let mut unique: Vec<CapabilityRecord> = Vec::with_capacity(records.len());
    for record in records {
        if !unique
            .iter()
            .any(|r| r.alias == record.alias && r.kind == record.kind)
        {
            unique.push(record);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::PLUGIN_SCHEMA_NAME;
    use std::fs;
    use tempfile::tempdir;

    fn record_in(dir: &std::path::Path, name: &str) -> PluginRecord {
        fs::write(
            dir.join("package.json"),
            format!(r#"{{"name":"{}","version":"1.0.0"}}"#, name),
        )
        .expect("manifest");
        PluginRecord::from_install_dir(name, dir).expect("record")
    }

    #[test]
    fn schema_result_is_cached_per_name() {
        let dir = tempdir().expect("tempdir");
        let plugin = record_in(dir.path(), "@acme/lamp");
        fs::write(dir.path().join(PLUGIN_SCHEMA_NAME), r#"{"pluginAlias":"AcmeLamp"}"#)
            .expect("schema");

        let mut inspector = PluginInspector::new(Duration::from_secs(1));
        let first = inspector.discover(&plugin);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].alias, "AcmeLamp");

        fs::remove_file(dir.path().join(PLUGIN_SCHEMA_NAME)).expect("remove");
        assert_eq!(inspector.discover(&plugin), first);

        inspector.forget("@acme/lamp");
        fs::write(dir.path().join(PLUGIN_SCHEMA_NAME), r#"{"pluginAlias":"Renamed"}"#)
            .expect("schema");
        assert_eq!(inspector.discover(&plugin)[0].alias, "Renamed");
    }

    #[test]
    fn broken_plugin_yields_nothing() {
        let dir = tempdir().expect("tempdir");
        let plugin = record_in(dir.path(), "broken");
        fs::write(dir.path().join("index.js"), "throw new Error('boom');").expect("entry");

        let mut inspector = PluginInspector::new(Duration::from_secs(10));
        assert!(inspector.discover(&plugin).is_empty());
    }

    #[test]
    fn dedup_keeps_first_of_each_alias_and_kind() {
        let make = |alias: &str, kind| CapabilityRecord {
            plugin_name: "p".to_string(),
            alias: alias.to_string(),
            kind,
        };
        let records = vec![
            make("A", CapabilityKind::Platform),
            make("A", CapabilityKind::Platform),
            make("A", CapabilityKind::Accessory),
        ];
        assert_eq!(dedup(records).len(), 2);
    }
}
