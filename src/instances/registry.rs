//! File-backed instance registry (`instances.conf`).
//!
//! Owns identity and uniqueness: no two records share an id or a port,
//! and the hub is always first.

use super::types::{InstanceKind, InstanceRecord};
use crate::constants::HUB_ID;
use crate::error::{HubError, Result};
use crate::utils::fsio;
use crate::utils::paths::StoragePaths;
use crate::utils::sanitize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct InstanceRegistry {
    path: PathBuf,
    records: Vec<InstanceRecord>,
}

impl InstanceRegistry {
    pub fn load(paths: &StoragePaths) -> Result<Self> {
        Self::load_from(paths.instances_file())
    }

    pub fn load_from(path: PathBuf) -> Result<Self> {
        let records = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| HubError::io(&path, e))?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str::<Vec<InstanceRecord>>(&content).map_err(|e| {
                    HubError::ConfigError(format!("Failed to parse {}: {}", path.display(), e))
                })?
            }
        } else {
            Vec::new()
        };

        let mut registry = Self { path, records };
        registry.order();
        Ok(registry)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[InstanceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&InstanceRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut InstanceRecord> {
        self.records.iter_mut().find(|r| r.id == id)
    }

    /// Resolve a free-form name to the id of an existing record
    pub fn resolve(&self, name: &str) -> Result<&InstanceRecord> {
        let id = sanitize::sanitize_name(name)
            .ok_or_else(|| HubError::Validation(format!("Invalid instance name '{}'", name)))?;
        self.get(&id).ok_or(HubError::InstanceNotFound(id))
    }

    pub fn port_in_use(&self, port: u16) -> bool {
        self.records.iter().any(|r| r.port == port)
    }

    pub fn taken_ports(&self) -> std::collections::HashSet<u16> {
        self.records.iter().map(|r| r.port).collect()
    }

    /// Name predicate shared by direct and interactive creation. Returns the canonical id.
    pub fn validate_name(&self, name: &str, kind: InstanceKind) -> Result<String> {
        if kind == InstanceKind::Hub {
            return if self.get(HUB_ID).is_some() {
                Err(HubError::Validation("hub instance already exists".to_string()))
            } else {
                Ok(HUB_ID.to_string())
            };
        }

        let id = sanitize::sanitize_name(name)
            .ok_or_else(|| HubError::Validation("instance name is required".to_string()))?;

        if sanitize::is_reserved(&id) {
            return Err(HubError::Validation(format!(
                "instance name '{}' is reserved",
                id
            )));
        }
        if self.get(&id).is_some() {
            return Err(HubError::Validation(format!(
                "instance '{}' already exists",
                id
            )));
        }

        Ok(id)
    }

    /// Port predicate shared by direct and interactive creation
    pub fn validate_port(&self, port: u16) -> Result<u16> {
        if port == 0 {
            return Err(HubError::Validation("invalid port number".to_string()));
        }
        if self.port_in_use(port) {
            return Err(HubError::Validation("port is already in use".to_string()));
        }
        Ok(port)
    }

    /// Append a record, re-checking both uniqueness constraints
    pub fn insert(&mut self, record: InstanceRecord) -> Result<()> {
        if self.get(&record.id).is_some() {
            return Err(HubError::Validation(format!(
                "instance '{}' already exists",
                record.id
            )));
        }
        self.validate_port(record.port)?;
        self.records.push(record);
        self.order();
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<InstanceRecord> {
        let index = self.records.iter().position(|r| r.id == id)?;
        Some(self.records.remove(index))
    }

    pub fn save(&self) -> Result<()> {
        fsio::write_atomically(&self.path, serde_json::to_string_pretty(&self.records)?.as_bytes())
    }

    fn order(&mut self) {
        // stable: keeps creation order behind the hub
        self.records.sort_by_key(|r| r.kind != InstanceKind::Hub);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn registry_in(dir: &Path) -> InstanceRegistry {
        InstanceRegistry::load_from(dir.join("instances.conf")).expect("load")
    }

    #[test]
    fn missing_file_is_empty_registry() {
        let dir = tempdir().expect("tempdir");
        assert!(registry_in(dir.path()).is_empty());
    }

    #[test]
    fn hub_sorts_first_after_reload() {
        let dir = tempdir().expect("tempdir");
        let mut registry = registry_in(dir.path());
        registry
            .insert(InstanceRecord::new("kitchen", InstanceKind::Bridge, "Kitchen", 51826))
            .expect("insert bridge");
        registry
            .insert(InstanceRecord::new("hub", InstanceKind::Hub, "Hub", 80))
            .expect("insert hub");
        registry.save().expect("save");

        let reloaded = registry_in(dir.path());
        let ids: Vec<_> = reloaded.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["hub", "kitchen"]);
    }

    #[test]
    fn duplicate_port_rejected() {
        let dir = tempdir().expect("tempdir");
        let mut registry = registry_in(dir.path());
        registry
            .insert(InstanceRecord::new("kitchen", InstanceKind::Bridge, "Kitchen", 50826))
            .expect("insert");
        let err = registry
            .insert(InstanceRecord::new("garage", InstanceKind::Bridge, "Garage", 50826))
            .unwrap_err();
        assert!(err.to_string().contains("port is already in use"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn validate_name_rejects_reserved_and_duplicates() {
        let dir = tempdir().expect("tempdir");
        let mut registry = registry_in(dir.path());
        assert!(registry.validate_name("Backups", InstanceKind::Bridge).is_err());
        assert!(registry.validate_name("", InstanceKind::Bridge).is_err());
        registry
            .insert(InstanceRecord::new("kitchen", InstanceKind::Bridge, "Kitchen", 50826))
            .expect("insert");
        assert!(registry.validate_name("KITCHEN", InstanceKind::Bridge).is_err());
        assert_eq!(
            registry.validate_name("Living Room", InstanceKind::Bridge).expect("valid"),
            "living-room"
        );
    }

    #[test]
    fn hub_kind_always_maps_to_hub_id() {
        let dir = tempdir().expect("tempdir");
        let registry = registry_in(dir.path());
        assert_eq!(
            registry.validate_name("anything", InstanceKind::Hub).expect("valid"),
            "hub"
        );
    }

    #[test]
    fn record_serializes_with_type_key() {
        let record = InstanceRecord::new("kitchen", InstanceKind::Bridge, "Kitchen", 50826);
        let value = serde_json::to_value(&record).expect("serialize");
        assert_eq!(value["type"], "bridge");
        assert_eq!(value["displayName"], "Kitchen");
        assert!(value.get("serviceUnitRef").is_none());
    }
}
