//! Archive creation: full backups, single-instance backups and exports.

use super::metadata::{ArchiveMetadata, ArchiveScope};
use crate::constants::{ARCHIVE_META_NAME, BACKUPS_DIR_NAME, CACHE_DIR_NAMES, MODULES_DIR_NAME};
use crate::error::{HubError, Result};
use crate::instances::registry::InstanceRegistry;
use crate::traits::AppContext;
use crate::utils::fsio;
use crate::utils::paths::StoragePaths;
use chrono::{DateTime, TimeZone, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// An archive found in the backups directory
#[derive(Debug, Clone, PartialEq)]
pub struct BackupEntry {
    pub file_name: String,
    pub path: PathBuf,
    pub size: u64,
    pub scope: ArchiveScope,
    pub created_at: Option<DateTime<Utc>>,
}

/// Archive the whole storage root into the backups directory.
/// Returns the archive's file name.
pub fn backup_full(ctx: &AppContext) -> Result<String> {
    let meta = ArchiveMetadata::full();
    let dest = ctx.paths.ensure_backups_dir()?.join(meta.file_name());
    write_archive(ctx.paths.root(), &dest, &meta, |_| true)?;
    tracing::info!(archive = %dest.display(), "full backup written");
    Ok(meta.file_name())
}

/// Archive one instance into the backups directory
pub fn backup_instance(ctx: &AppContext, name: &str) -> Result<String> {
    let dir = ctx.paths.ensure_backups_dir()?;
    let path = write_instance_archive(&ctx.paths, name, &dir)?;
    Ok(file_name_of(&path))
}

/// Archive one instance to `dest`: a directory (archive named after its
/// timestamp) or a file path
pub fn export(ctx: &AppContext, name: &str, dest: &Path) -> Result<PathBuf> {
    write_instance_archive(&ctx.paths, name, dest)
}

fn write_instance_archive(paths: &StoragePaths, name: &str, dest: &Path) -> Result<PathBuf> {
    let registry = InstanceRegistry::load(paths)?;
    let record = registry.resolve(name)?.clone();
    let meta = ArchiveMetadata::single(&record);

    let dest = if dest.is_dir() {
        dest.join(meta.file_name())
    } else {
        dest.to_path_buf()
    };

    let config = format!("{}.conf", record.id);
    write_archive(paths.root(), &dest, &meta, |top| {
        top == record.id || top == config
    })?;
    tracing::info!(id = %record.id, archive = %dest.display(), "instance archive written");
    Ok(dest)
}

/// Archives in the backups directory, newest first
pub fn list_backups(paths: &StoragePaths) -> Result<Vec<BackupEntry>> {
    let dir = paths.backups_dir();
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(&dir).map_err(|e| HubError::io(&dir, e))? {
        let entry = entry.map_err(|e| HubError::io(&dir, e))?;
        let path = entry.path();
        let Some(scope) = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ArchiveScope::from_extension)
        else {
            continue;
        };

        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        let created_at = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<i64>().ok())
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single());

        entries.push(BackupEntry {
            file_name: file_name_of(&path),
            path,
            size,
            scope,
            created_at,
        });
    }

    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.file_name.cmp(&a.file_name)));
    Ok(entries)
}

/// True for paths never archived: the backups directory, dependency trees,
/// package caches, and anything that is not a file, directory or link
fn excluded(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    let file_type = entry.file_type();

    if entry.depth() == 1 && (name == BACKUPS_DIR_NAME || name == ARCHIVE_META_NAME) {
        return true;
    }
    if file_type.is_dir() {
        return name == MODULES_DIR_NAME
            || (entry.depth() >= 2 && CACHE_DIR_NAMES.iter().any(|c| *c == name));
    }
    !(file_type.is_file() || file_type.is_symlink())
}

/// Write `meta` followed by every non-excluded entry under `root` whose
/// top-level component passes `include_top`
fn write_archive(
    root: &Path,
    dest: &Path,
    meta: &ArchiveMetadata,
    include_top: impl Fn(&str) -> bool,
) -> Result<()> {
    let result = build(root, dest, meta, include_top);
    if result.is_err() {
        let _ = fsio::remove_path(dest);
    }
    result
}

fn build(
    root: &Path,
    dest: &Path,
    meta: &ArchiveMetadata,
    include_top: impl Fn(&str) -> bool,
) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| HubError::io(parent, e))?;
    }
    let file = File::create(dest).map_err(|e| HubError::io(dest, e))?;
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);

    let meta_bytes = serde_json::to_vec_pretty(meta)?;
    let mut header = tar::Header::new_gnu();
    header.set_size(meta_bytes.len() as u64);
    header.set_mode(0o644);
    header.set_mtime((meta.timestamp / 1000).max(0) as u64);
    header.set_cksum();
    builder
        .append_data(&mut header, ARCHIVE_META_NAME, meta_bytes.as_slice())
        .map_err(|e| archive_error(dest, e))?;

    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if excluded(entry) {
                return false;
            }
            entry.depth() != 1 || include_top(&entry.file_name().to_string_lossy())
        });

    for entry in walker {
        let entry = entry.map_err(|e| HubError::Archive(e.to_string()))?;
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| HubError::Archive(e.to_string()))?;

        if entry.file_type().is_dir() {
            builder
                .append_dir(relative, entry.path())
                .map_err(|e| archive_error(dest, e))?;
        } else {
            builder
                .append_path_with_name(entry.path(), relative)
                .map_err(|e| archive_error(dest, e))?;
        }
    }

    let encoder = builder.into_inner().map_err(|e| archive_error(dest, e))?;
    let writer = encoder.finish().map_err(|e| archive_error(dest, e))?;
    let file = writer
        .into_inner()
        .map_err(|e| archive_error(dest, e.into_error()))?;
    file.sync_all().map_err(|e| HubError::io(dest, e))?;
    Ok(())
}

fn archive_error(dest: &Path, e: std::io::Error) -> HubError {
    HubError::Archive(format!("{}: {}", dest.display(), e))
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
