//! Instance lifecycle: create, remove, rename, purge, reset.
//!
//! Every operation follows the same order: validate against the registry
//! (no mutation on failure), mutate the host (service unit) before local
//! state, commit the registry, then notify the hub over its control socket.
//! Notification is best effort and never reverses a committed mutation.

use super::registry::InstanceRegistry;
use super::types::{InstanceKind, InstanceRecord, InstanceSummary};
use crate::archive;
use crate::config::store::ConfigStore;
use crate::constants::BACKUPS_DIR_NAME;
use crate::error::{HubError, Result};
use crate::traits::AppContext;
use crate::utils::{fsio, net};
use serde_json::json;
use std::fs;
use std::path::PathBuf;

/// Everything `create` needs; `port: None` probes for a free one
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub name: String,
    pub kind: InstanceKind,
    pub port: Option<u16>,
    pub display_name: Option<String>,
    pub pin: Option<String>,
    pub autostart_delay_seconds: u32,
    pub advertiser: Option<String>,
    pub dev_project_path: Option<PathBuf>,
}

impl CreateRequest {
    pub fn new(name: impl Into<String>, kind: InstanceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            port: None,
            display_name: None,
            pin: None,
            autostart_delay_seconds: 0,
            advertiser: None,
            dev_project_path: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }
}

/// Registered instances, hub first, annotated with host facts
pub fn list(ctx: &AppContext) -> Result<Vec<InstanceSummary>> {
    let registry = InstanceRegistry::load(&ctx.paths)?;
    let address = net::primary_ipv4().map(|ip| ip.to_string());

    Ok(registry
        .records()
        .iter()
        .map(|record| InstanceSummary {
            record: record.clone(),
            address: address.clone(),
            service_unit: if ctx.services.unit_exists(&record.id) {
                ctx.services.unit_name(&record.id)
            } else {
                None
            },
        })
        .collect())
}

/// First free port from the configured base, stepping by 1000
pub fn default_port(ctx: &AppContext, registry: &InstanceRegistry) -> Result<u16> {
    net::next_free_port(ctx.settings.base_port, &registry.taken_ports(), net::port_is_free)
        .ok_or_else(|| HubError::Validation("no free port available".to_string()))
}

pub fn create(ctx: &AppContext, request: CreateRequest) -> Result<InstanceRecord> {
    let mut registry = InstanceRegistry::load(&ctx.paths)?;
    let id = registry.validate_name(&request.name, request.kind)?;
    let port = match request.port {
        Some(port) => registry.validate_port(port)?,
        None => default_port(ctx, &registry)?,
    };

    let display_name = request
        .display_name
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| {
            let trimmed = request.name.trim();
            if trimmed.is_empty() { id.clone() } else { trimmed.to_string() }
        });

    let mut record = InstanceRecord::new(&id, request.kind, display_name, port);
    record.pin = request.pin;
    record.autostart_delay_seconds = request.autostart_delay_seconds;
    record.advertiser = request.advertiser;
    record.dev_project_path = request.dev_project_path;

    ctx.paths.ensure_root()?;
    let fresh = !ctx.paths.package_dir(&id).exists();
    ctx.paths.ensure_instance_dirs(&id)?;

    if record.kind.is_serviced() {
        if !ctx.services.create_unit(&record) {
            if fresh {
                discard_entries(ctx, &id);
            }
            return Err(HubError::SystemCommandFailed {
                command: format!("{} create unit", ctx.services.backend_name()),
                reason: format!("service unit for '{}' could not be created", id),
            });
        }
        if ctx.services.unit_exists(&id) {
            record.service_unit_ref = ctx.services.unit_name(&id);
        }
    }

    registry.insert(record.clone())?;
    registry.save()?;

    let store = ConfigStore::new(ctx.paths.clone());
    let doc = store.load(&record)?;
    store.save(&id, &doc)?;

    tracing::info!(id = %id, port, kind = %record.kind, "instance created");
    ctx.hub_socket()
        .notify("instance_created", json!({ "id": id, "port": port }));
    Ok(record)
}

/// Tear down the unit, delete storage, drop the record. The hub hears about
/// the outcome either way.
pub fn remove(ctx: &AppContext, name: &str) -> Result<InstanceRecord> {
    let mut registry = InstanceRegistry::load(&ctx.paths)?;
    let record = registry.resolve(name)?.clone();

    let outcome = remove_committed(ctx, &mut registry, &record);
    ctx.hub_socket().notify(
        "instance_removed",
        json!({ "id": record.id, "success": outcome.is_ok() }),
    );
    outcome.map(|_| record)
}

fn remove_committed(
    ctx: &AppContext,
    registry: &mut InstanceRegistry,
    record: &InstanceRecord,
) -> Result<()> {
    // storage stays until the unit is confirmed gone
    if !ctx.services.remove_unit(&record.id) {
        return Err(HubError::SystemCommandFailed {
            command: format!("{} remove unit", ctx.services.backend_name()),
            reason: format!("service unit for '{}' could not be removed", record.id),
        });
    }

    let mut failures = Vec::new();
    for entry in ctx.paths.instance_entries(&record.id) {
        if let Err(e) = fsio::remove_path(&entry) {
            failures.push(e.to_string());
        }
    }

    registry.remove(&record.id);
    registry.save()?;
    tracing::info!(id = %record.id, "instance removed");

    if failures.is_empty() {
        Ok(())
    } else {
        Err(HubError::Other(format!(
            "instance '{}' removed but storage cleanup failed: {}",
            record.id,
            failures.join("; ")
        )))
    }
}

/// Change the display name, refreshing the config and an existing unit
pub fn rename(ctx: &AppContext, name: &str, display_name: &str) -> Result<InstanceRecord> {
    let display_name = display_name.trim();
    if display_name.is_empty() {
        return Err(HubError::Validation("display name is required".to_string()));
    }

    let mut registry = InstanceRegistry::load(&ctx.paths)?;
    let id = registry.resolve(name)?.id.clone();
    let record = match registry.get_mut(&id) {
        Some(record) => {
            record.display_name = display_name.to_string();
            record.clone()
        }
        None => return Err(HubError::InstanceNotFound(id)),
    };
    registry.save()?;

    let store = ConfigStore::new(ctx.paths.clone());
    let doc = store.load(&record)?;
    store.save(&id, &doc)?;

    ctx.hub_socket().notify(
        "instance_renamed",
        json!({ "id": id, "displayName": record.display_name }),
    );

    if ctx.services.unit_exists(&id) && !ctx.services.create_unit(&record) {
        return Err(HubError::SystemCommandFailed {
            command: format!("{} refresh unit", ctx.services.backend_name()),
            reason: format!("service unit for '{}' could not be refreshed", id),
        });
    }
    Ok(record)
}

/// Wipe the runtime's accessory and connection caches; config and plugins stay
pub fn purge(ctx: &AppContext, name: &str) -> Result<InstanceRecord> {
    let registry = InstanceRegistry::load(&ctx.paths)?;
    let record = registry.resolve(name)?.clone();

    let mut failures = Vec::new();
    for dir in [
        ctx.paths.accessories_dir(&record.id),
        ctx.paths.persist_dir(&record.id),
    ] {
        let result = fsio::remove_path(&dir)
            .and_then(|_| fs::create_dir_all(&dir).map_err(|e| HubError::io(&dir, e)));
        if let Err(e) = result {
            failures.push(e.to_string());
        }
    }

    ctx.hub_socket().notify(
        "instance_purged",
        json!({ "id": record.id, "success": failures.is_empty() }),
    );

    if failures.is_empty() {
        tracing::info!(id = %record.id, "instance caches purged");
        Ok(record)
    } else {
        Err(HubError::Other(failures.join("; ")))
    }
}

/// Back everything up, then remove every unit and every stored entry except
/// the backups directory. Returns the backup's file name.
pub fn reset(ctx: &AppContext) -> Result<String> {
    let backup = archive::backup_full(ctx)?;
    let registry = InstanceRegistry::load(&ctx.paths)?;

    let mut failures = Vec::new();
    for record in registry.records() {
        if !ctx.services.remove_unit(&record.id) {
            failures.push(format!("service unit for '{}' could not be removed", record.id));
        }
    }

    for entry in root_entries(ctx)? {
        if let Err(e) = fsio::remove_path(&entry) {
            failures.push(e.to_string());
        }
    }

    ctx.hub_socket()
        .notify("reset", json!({ "backup": backup, "success": failures.is_empty() }));

    if failures.is_empty() {
        tracing::info!(backup = %backup, "storage reset");
        Ok(backup)
    } else {
        Err(HubError::Other(format!(
            "reset incomplete (backup {}): {}",
            backup,
            failures.join("; ")
        )))
    }
}

/// Create the unit of an existing serviced instance when it is missing.
/// Returns whether a unit now exists.
pub fn link_service(ctx: &AppContext, name: &str) -> Result<bool> {
    let mut registry = InstanceRegistry::load(&ctx.paths)?;
    let record = registry.resolve(name)?.clone();

    if !record.kind.is_serviced() {
        return Err(HubError::Validation(format!(
            "{} instances run in the foreground",
            record.kind
        )));
    }

    if !ctx.services.unit_exists(&record.id) && !ctx.services.create_unit(&record) {
        return Ok(false);
    }

    let unit = ctx.services.unit_name(&record.id);
    if let Some(stored) = registry.get_mut(&record.id)
        && stored.service_unit_ref != unit
    {
        stored.service_unit_ref = unit;
        registry.save()?;
    }
    Ok(ctx.services.unit_exists(&record.id))
}

/// Top-level storage entries, excluding the backups directory
pub(crate) fn root_entries(ctx: &AppContext) -> Result<Vec<PathBuf>> {
    let root = ctx.paths.root();
    if !root.exists() {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(root).map_err(|e| HubError::io(root, e))? {
        let entry = entry.map_err(|e| HubError::io(root, e))?;
        if entry.file_name() != BACKUPS_DIR_NAME {
            entries.push(entry.path());
        }
    }
    entries.sort();
    Ok(entries)
}

fn discard_entries(ctx: &AppContext, id: &str) {
    for entry in ctx.paths.instance_entries(id) {
        if let Err(e) = fsio::remove_path(&entry) {
            tracing::warn!(id, error = %e, "failed to discard instance storage");
        }
    }
}

#[cfg(test)]
mod tests;
