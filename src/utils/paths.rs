//! Storage layout for every instance under one storage root.
//!
//! ```text
//! <root>/instances.conf          instance registry
//! <root>/<id>.conf               config document (obfuscated JSON)
//! <root>/<id>/package.json       plugin dependency manifest
//! <root>/<id>/node_modules/...   plugin package trees
//! <root>/<id>.accessories/       runtime accessory cache
//! <root>/<id>.persist/           runtime connection cache
//! <root>/<id>.sock               control socket of a running instance
//! <root>/backups/                archives
//! ```

use crate::constants::{
    BACKUPS_DIR_NAME, INSTANCES_FILE_NAME, MODULES_DIR_NAME, PACKAGE_MANIFEST_NAME,
};
use crate::error::{HubError, Result};
use crate::project_identity;
use directories::{ProjectDirs, UserDirs};
use std::fs;
use std::path::{Path, PathBuf};

/// Well-known system-wide storage root, used when it exists.
pub const SYSTEM_STORAGE_ROOT: &str = "/var/lib/hubctl";

#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl StoragePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn instances_file(&self) -> PathBuf {
        self.root.join(INSTANCES_FILE_NAME)
    }

    pub fn config_file(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.conf", id))
    }

    pub fn package_dir(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    pub fn package_manifest(&self, id: &str) -> PathBuf {
        self.package_dir(id).join(PACKAGE_MANIFEST_NAME)
    }

    pub fn modules_dir(&self, id: &str) -> PathBuf {
        self.package_dir(id).join(MODULES_DIR_NAME)
    }

    /// Install directory of a (possibly scoped) plugin package
    pub fn plugin_dir(&self, id: &str, plugin: &str) -> PathBuf {
        let mut dir = self.modules_dir(id);
        for segment in plugin.split('/') {
            dir.push(segment);
        }
        dir
    }

    pub fn accessories_dir(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.accessories", id))
    }

    pub fn persist_dir(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.persist", id))
    }

    pub fn socket_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.sock", id))
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.root.join(BACKUPS_DIR_NAME)
    }

    /// Every top-level path owned by one instance
    pub fn instance_entries(&self, id: &str) -> Vec<PathBuf> {
        vec![
            self.config_file(id),
            self.package_dir(id),
            self.accessories_dir(id),
            self.persist_dir(id),
        ]
    }

    pub fn ensure_root(&self) -> Result<&Path> {
        create_dir(&self.root)?;
        Ok(&self.root)
    }

    pub fn ensure_backups_dir(&self) -> Result<PathBuf> {
        let dir = self.backups_dir();
        create_dir(&dir)?;
        Ok(dir)
    }

    /// Create the package tree and an empty manifest if there is none yet
    pub fn ensure_package_dir(&self, id: &str) -> Result<PathBuf> {
        let dir = self.package_dir(id);
        create_dir(&dir)?;

        let manifest = self.package_manifest(id);
        if !manifest.exists() {
            let content = serde_json::to_string_pretty(&serde_json::json!({
                "name": format!("{}-plugins", id),
                "private": true,
                "description": format!("{} plugin tree", id),
                "dependencies": {},
            }))?;
            fs::write(&manifest, content).map_err(|e| HubError::io(&manifest, e))?;
        }

        Ok(dir)
    }

    pub fn ensure_instance_dirs(&self, id: &str) -> Result<()> {
        self.ensure_package_dir(id)?;
        create_dir(&self.accessories_dir(id))?;
        create_dir(&self.persist_dir(id))?;
        Ok(())
    }
}

fn create_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| HubError::io(dir, e))?;
    }
    Ok(())
}

pub fn expand_home(path: &Path) -> Result<PathBuf> {
    let path_str = path.to_string_lossy();

    if !path_str.starts_with('~') {
        return Ok(path.to_path_buf());
    }

    let user_dirs = UserDirs::new()
        .ok_or_else(|| HubError::PathError("Could not determine user home directory".to_string()))?;

    let home = user_dirs.home_dir();

    if path_str == "~" {
        return Ok(home.to_path_buf());
    }

    let stripped = path_str
        .strip_prefix("~/")
        .ok_or_else(|| HubError::PathError(format!("Invalid path format: {}", path_str)))?;

    Ok(home.join(stripped))
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("org", project_identity::CONFIG_DIR_NAME, project_identity::CONFIG_DIR_NAME)
        .ok_or_else(|| HubError::PathError("Could not determine project directories".to_string()))
}

pub fn config_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().to_path_buf())
}

pub fn settings_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(project_identity::CONFIG_FILE_BASENAME))
}

/// Storage root used when neither flag, environment nor settings name one
pub fn default_storage_root() -> Result<PathBuf> {
    let system = PathBuf::from(SYSTEM_STORAGE_ROOT);
    if system.is_dir() {
        return Ok(system);
    }
    Ok(project_dirs()?.data_dir().to_path_buf())
}
