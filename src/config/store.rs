//! ConfigStore: load, default, normalize, prune and persist config documents.

use super::crypto;
use super::document::{self, ConfigDocument};
use crate::error::{HubError, Result};
use crate::instances::registry::InstanceRegistry;
use crate::instances::types::{InstanceKind, InstanceRecord};
use crate::packages::manifest::PackageManifest;
use crate::utils::fsio;
use crate::utils::paths::StoragePaths;
use serde_json::Value;
use std::fs;

#[derive(Debug, Clone)]
pub struct ConfigStore {
    paths: StoragePaths,
}

impl ConfigStore {
    pub fn new(paths: StoragePaths) -> Self {
        Self { paths }
    }

    /// Document of a registered instance, materialized from defaults if needed
    pub fn configuration(&self, id: &str) -> Result<ConfigDocument> {
        let registry = InstanceRegistry::load(&self.paths)?;
        let record = registry
            .get(id)
            .ok_or_else(|| HubError::InstanceNotFound(id.to_string()))?;
        self.load(record)
    }

    /// Merge kind defaults, the on-disk document and the package manifest, then normalize
    pub fn load(&self, record: &InstanceRecord) -> Result<ConfigDocument> {
        let mut merged = serde_json::to_value(document::defaults_for(record))?;
        if let Some(existing) = self.read_raw(&record.id)? {
            document::merge(&mut merged, existing);
        }

        let mut doc: ConfigDocument = serde_json::from_value(merged).map_err(|e| {
            HubError::ConfigError(format!("Invalid config for '{}': {}", record.id, e))
        })?;

        if record.kind != InstanceKind::Hub
            && let Some(manifest) = PackageManifest::read(&self.paths.package_manifest(&record.id))?
        {
            for name in manifest.dependency_names() {
                if !doc.plugins.contains(&name) {
                    doc.plugins.push(name);
                }
            }
        }

        document::normalize(&mut doc, record);
        Ok(doc)
    }

    /// Persist after pruning. Returns `false` when the document was
    /// semantically unchanged and nothing was written.
    pub fn save(&self, id: &str, doc: &ConfigDocument) -> Result<bool> {
        let mut doc = doc.clone();
        document::filter_entries(&mut doc);
        let value = serde_json::to_value(&doc)?;

        match self.read_raw(id) {
            Ok(Some(current)) if current == value => {
                tracing::debug!(id, "config unchanged, skipping write");
                return Ok(false);
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(id, error = %e, "current config unreadable, overwriting"),
        }

        self.write(id, &value)?;
        Ok(true)
    }

    /// Rewrite the on-disk document as-is: normalizes formatting and
    /// re-applies encoding after an external edit
    pub fn touch(&self, id: &str) -> Result<()> {
        match self.read_raw(id)? {
            Some(value) => self.write(id, &value),
            None => Ok(()),
        }
    }

    /// Decoded document as stored, without defaults. Plain JSON is accepted.
    pub fn read_raw(&self, id: &str) -> Result<Option<Value>> {
        let path = self.paths.config_file(id);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|e| HubError::io(&path, e))?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        let plain = match crypto::decode(&content) {
            Ok(bytes) => bytes,
            Err(_) => content.into_bytes(),
        };

        let value = serde_json::from_slice(&plain).map_err(|e| {
            HubError::ConfigError(format!("Unreadable config {}: {}", path.display(), e))
        })?;
        Ok(Some(value))
    }

    fn write(&self, id: &str, value: &Value) -> Result<()> {
        let path = self.paths.config_file(id);
        let encoded = crypto::encode(serde_json::to_string_pretty(value)?.as_bytes())?;
        fsio::write_atomically(&path, encoded.as_bytes())?;
        tracing::debug!(id, path = %path.display(), "config written");
        Ok(())
    }
}
