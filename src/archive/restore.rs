//! Archive restore.
//!
//! A full archive replaces the storage root: everything but the backups
//! directory is deleted, the archive is extracted in place, dependency
//! trees are reinstalled and missing service units recreated. A
//! single-instance archive is imported next to the existing instances and
//! never deletes anything outside that instance.

use super::metadata::{ArchiveMetadata, ArchiveScope};
use crate::config::store::ConfigStore;
use crate::constants::{ARCHIVE_META_NAME, HUB_ID};
use crate::error::{HubError, Result};
use crate::instances::lifecycle;
use crate::instances::registry::InstanceRegistry;
use crate::instances::types::{InstanceKind, InstanceRecord};
use crate::packages::link;
use crate::traits::AppContext;
use crate::utils::{fsio, sanitize};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path};
use std::thread;
use tar::Archive;

/// What a restore did. `failures` lists recoverable sub-steps that did not
/// succeed; re-running the restore converges them.
#[derive(Debug, Clone)]
pub struct RestoreReport {
    pub metadata: ArchiveMetadata,
    pub instances: Vec<String>,
    pub reinstalled: Vec<String>,
    pub units_created: Vec<String>,
    pub failures: Vec<String>,
}

impl RestoreReport {
    fn new(metadata: ArchiveMetadata) -> Self {
        Self {
            metadata,
            instances: Vec::new(),
            reinstalled: Vec::new(),
            units_created: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Read the metadata entry, which must come first
pub fn read_metadata(path: &Path) -> Result<ArchiveMetadata> {
    let mut archive = open(path)?;
    let mut entries = archive.entries().map_err(|e| archive_error(path, e))?;
    let mut first = entries
        .next()
        .ok_or_else(|| HubError::Archive(format!("{} is empty", path.display())))?
        .map_err(|e| archive_error(path, e))?;

    let name = first.path().map_err(|e| archive_error(path, e))?.into_owned();
    if name != Path::new(ARCHIVE_META_NAME) {
        return Err(HubError::Archive(format!(
            "{} does not start with {}",
            path.display(),
            ARCHIVE_META_NAME
        )));
    }

    let mut content = Vec::new();
    first
        .read_to_end(&mut content)
        .map_err(|e| archive_error(path, e))?;
    serde_json::from_slice(&content)
        .map_err(|e| HubError::Archive(format!("invalid archive metadata: {}", e)))
}

pub fn restore(ctx: &AppContext, path: &Path, remove_source: bool) -> Result<RestoreReport> {
    let metadata = read_metadata(path)?;
    tracing::info!(
        archive = %path.display(),
        scope = ?metadata.scope,
        host = %metadata.host,
        "restoring archive"
    );

    let report = match metadata.scope {
        ArchiveScope::Full => restore_full(ctx, path, metadata)?,
        ArchiveScope::SingleInstance => import_instance(ctx, path, metadata)?,
    };

    if remove_source {
        fsio::remove_path(path)?;
        tracing::debug!(archive = %path.display(), "source archive removed");
    }
    Ok(report)
}

fn restore_full(ctx: &AppContext, path: &Path, metadata: ArchiveMetadata) -> Result<RestoreReport> {
    let root = ctx.paths.ensure_root()?.to_path_buf();
    let doomed = lifecycle::root_entries(ctx)?;

    let source = path
        .canonicalize()
        .map_err(|e| HubError::io(path, e))?;
    for entry in &doomed {
        if let Ok(entry) = entry.canonicalize()
            && source.starts_with(&entry)
        {
            return Err(HubError::Validation(format!(
                "archive {} lives inside storage that a restore deletes; move it to {} first",
                path.display(),
                ctx.paths.backups_dir().display()
            )));
        }
    }

    for entry in &doomed {
        fsio::remove_path(entry)?;
    }
    extract(path, &root, |_| true)?;

    thread::sleep(ctx.settings.settle_delay);

    let mut report = RestoreReport::new(metadata);
    let mut registry = InstanceRegistry::load(&ctx.paths)?;
    let records: Vec<InstanceRecord> = registry.records().to_vec();
    for record in &records {
        if let Err(e) = check_record_id(record) {
            report.failures.push(e.to_string());
            continue;
        }
        report.instances.push(record.id.clone());
        reinstall(ctx, &record.id, &mut report);
        relink_unit(ctx, &mut registry, record, &mut report);
    }
    registry.save()?;

    ctx.hub_socket().notify(
        "restored",
        serde_json::json!({ "scope": "full", "instances": report.instances }),
    );
    Ok(report)
}

fn import_instance(ctx: &AppContext, path: &Path, metadata: ArchiveMetadata) -> Result<RestoreReport> {
    let mut record = metadata.instance.clone().ok_or_else(|| {
        HubError::Archive("single-instance archive carries no instance record".to_string())
    })?;
    check_record_id(&record)?;
    let root = ctx.paths.ensure_root()?.to_path_buf();
    let mut registry = InstanceRegistry::load(&ctx.paths)?;

    let existing = registry.get(&record.id).cloned();
    let port_changed = match &existing {
        Some(current) => {
            record = current.clone();
            false
        }
        None if registry.port_in_use(record.port) => {
            let port = lifecycle::default_port(ctx, &registry)?;
            tracing::info!(id = %record.id, from = record.port, to = port, "port taken, reallocating");
            record.port = port;
            true
        }
        None => false,
    };

    let config_name = format!("{}.conf", record.id);
    extract(path, &root, |top| top == record.id || top == config_name)?;
    ctx.paths.ensure_instance_dirs(&record.id)?;

    if existing.is_none() {
        record.service_unit_ref = None;
        registry.insert(record.clone())?;
        registry.save()?;
    }

    let store = ConfigStore::new(ctx.paths.clone());
    let mut doc = store.load(&record)?;
    if port_changed && let Some(bridge) = doc.bridge.as_mut() {
        bridge.port = record.port;
    }
    store.save(&record.id, &doc)?;

    let mut report = RestoreReport::new(metadata);
    report.instances.push(record.id.clone());
    reinstall(ctx, &record.id, &mut report);
    relink_unit(ctx, &mut registry, &record, &mut report);
    registry.save()?;

    ctx.hub_socket().notify(
        "restored",
        serde_json::json!({ "scope": "instance", "instances": report.instances }),
    );
    Ok(report)
}

/// Ids come from archive contents and become path components
fn check_record_id(record: &InstanceRecord) -> Result<()> {
    let valid = match record.kind {
        InstanceKind::Hub => record.id == HUB_ID,
        InstanceKind::Bridge | InstanceKind::Dev => {
            sanitize::sanitize_name(&record.id).as_deref() == Some(record.id.as_str())
                && !sanitize::is_reserved(&record.id)
        }
    };
    if valid {
        Ok(())
    } else {
        Err(HubError::Archive(format!(
            "archive names an invalid instance id '{}'",
            sanitize::sanitize_for_display(&record.id)
        )))
    }
}

/// Reinstall the dependency tree of one instance from its manifest
fn reinstall(ctx: &AppContext, id: &str, report: &mut RestoreReport) {
    if !ctx.paths.package_manifest(id).exists() {
        return;
    }

    let dir = ctx.paths.package_dir(id);
    let library = ctx.settings.shared_library.as_deref();
    if let Err(e) = link::unlink_shared_library(&ctx.paths, id, library) {
        tracing::warn!(id, error = %e, "failed to unlink shared library");
    }

    match ctx.packages.install_all(&dir) {
        Ok(()) => report.reinstalled.push(id.to_string()),
        Err(e) => report
            .failures
            .push(format!("dependencies of '{}': {}", id, e)),
    }

    if let Err(e) = link::link_shared_library(&ctx.paths, id, library) {
        tracing::warn!(id, error = %e, "failed to relink shared library");
    }
}

/// Recreate a serviced instance's unit when the host lacks it
fn relink_unit(
    ctx: &AppContext,
    registry: &mut InstanceRegistry,
    record: &InstanceRecord,
    report: &mut RestoreReport,
) {
    if !record.kind.is_serviced() || ctx.services.unit_exists(&record.id) {
        return;
    }

    if ctx.services.create_unit(record) {
        report.units_created.push(record.id.clone());
        if let Some(stored) = registry.get_mut(&record.id) {
            stored.service_unit_ref = ctx.services.unit_name(&record.id);
        }
    } else {
        report
            .failures
            .push(format!("service unit for '{}' could not be created", record.id));
    }
}

/// Unpack every entry after the metadata whose top-level component passes
/// `include_top`. Absolute paths and `..` components are rejected.
fn extract(path: &Path, root: &Path, include_top: impl Fn(&str) -> bool) -> Result<()> {
    let mut archive = open(path)?;
    archive.set_preserve_permissions(true);

    for entry in archive.entries().map_err(|e| archive_error(path, e))? {
        let mut entry = entry.map_err(|e| archive_error(path, e))?;
        let name = entry.path().map_err(|e| archive_error(path, e))?.into_owned();

        if name == Path::new(ARCHIVE_META_NAME) {
            continue;
        }
        if name
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(HubError::Archive(format!(
                "refusing unsafe entry '{}'",
                name.display()
            )));
        }

        let top = name
            .components()
            .find_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .unwrap_or_default();
        if !include_top(&top) {
            continue;
        }

        entry.unpack_in(root).map_err(|e| archive_error(path, e))?;
    }
    Ok(())
}

fn open(path: &Path) -> Result<Archive<GzDecoder<BufReader<File>>>> {
    let file = File::open(path).map_err(|e| HubError::io(path, e))?;
    Ok(Archive::new(GzDecoder::new(BufReader::new(file))))
}

fn archive_error(path: &Path, e: std::io::Error) -> HubError {
    HubError::Archive(format!("{}: {}", path.display(), e))
}
