//! PackageProvisioner: install, uninstall and upgrade plugins in one
//! instance's package tree, keeping its config document in step.
//!
//! The package manager's exit status and the resulting tree are both part
//! of the contract. A non-zero exit fails the operation even if the plugin
//! directory exists afterwards; a zero exit without a readable plugin
//! manifest is a verification failure. Config is only touched after both
//! checks pass.

use super::link;
use super::manifest::{PackageManifest, PluginRecord};
use crate::config::document::{self, ConfigDocument, PLUGIN_MAP_KEY};
use crate::config::store::ConfigStore;
use crate::error::{HubError, Result};
use crate::inspector::{CapabilityKind, CapabilityRecord};
use crate::instances::registry::InstanceRegistry;
use crate::instances::types::{InstanceKind, InstanceRecord};
use crate::traits::AppContext;
use crate::utils::sanitize;
use serde_json::{Value, json};

/// What an install changed
#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub plugin: PluginRecord,
    pub capabilities: Vec<CapabilityRecord>,
    /// Entries newly linked to the plugin, as `(section, alias)`
    pub linked: Vec<(&'static str, String)>,
}

pub struct PackageProvisioner<'a> {
    ctx: &'a mut AppContext,
    store: ConfigStore,
}

impl<'a> PackageProvisioner<'a> {
    pub fn new(ctx: &'a mut AppContext) -> Self {
        let store = ConfigStore::new(ctx.paths.clone());
        Self { ctx, store }
    }

    /// Installed plugins of an instance, in manifest order.
    /// Dependencies whose directory or manifest is missing are skipped.
    pub fn plugins(&self, id: &str) -> Result<Vec<PluginRecord>> {
        let manifest = PackageManifest::read(&self.ctx.paths.package_manifest(id))?;
        let Some(manifest) = manifest else {
            return Ok(Vec::new());
        };

        Ok(manifest
            .dependency_names()
            .into_iter()
            .filter_map(|name| {
                let dir = self.ctx.paths.plugin_dir(id, &name);
                PluginRecord::from_install_dir(&name, &dir)
            })
            .collect())
    }

    /// Install `identifier` (`name[@tag]`). An explicit `tag` wins over one
    /// embedded in the identifier.
    pub fn install(&mut self, id: &str, identifier: &str, tag: Option<&str>) -> Result<InstallOutcome> {
        let record = self.plugin_host(id)?;
        let (name, embedded_tag) = sanitize::parse_plugin_identifier(identifier)?;
        let tag = match tag {
            Some(t) => sanitize::parse_plugin_identifier(&format!("{}@{}", name, t))?.1,
            None => embedded_tag,
        };
        let spec = format!("{}@{}", name, tag);

        let dir = self.ctx.paths.ensure_package_dir(id)?;
        tracing::info!(id, plugin = %spec, "installing plugin");
        self.with_unlinked(id, |ctx| ctx.packages.add(&dir, &spec))?;

        let install_dir = self.ctx.paths.plugin_dir(id, &name);
        let plugin = PluginRecord::from_install_dir(&name, &install_dir).ok_or_else(|| {
            HubError::Verification(format!(
                "{} finished but {} has no readable package.json",
                self.ctx.packages.name(),
                install_dir.display()
            ))
        })?;

        self.ctx.inspector.forget(&name);
        let mut doc = self.store.load(&record)?;
        if !doc.plugins.contains(&name) {
            doc.plugins.push(name.clone());
        }

        let mut capabilities = Vec::new();
        let mut linked = Vec::new();
        if !is_mapped(&doc, &name) {
            capabilities = self.ctx.inspector.discover(&plugin);
            // only platforms are linked
            for capability in capabilities
                .iter()
                .filter(|c| c.kind == CapabilityKind::Platform)
            {
                attach(&mut doc, capability);
                linked.push((capability.kind.section(), capability.alias.clone()));
            }
            if capabilities.is_empty() {
                tracing::debug!(plugin = %name, "no capabilities discovered");
            }
        }

        self.store.save(id, &doc)?;
        Ok(InstallOutcome {
            plugin,
            capabilities,
            linked,
        })
    }

    /// Remove a plugin and every config entry that references it
    pub fn uninstall(&mut self, id: &str, identifier: &str) -> Result<usize> {
        let record = self.plugin_host(id)?;
        let (name, _) = sanitize::parse_plugin_identifier(identifier)?;
        let dir = self.ctx.paths.package_dir(id);

        tracing::info!(id, plugin = %name, "removing plugin");
        self.with_unlinked(id, |ctx| ctx.packages.remove(&dir, &name))?;

        let install_dir = self.ctx.paths.plugin_dir(id, &name);
        if install_dir.join("package.json").exists() {
            return Err(HubError::Verification(format!(
                "{} finished but {} is still installed",
                self.ctx.packages.name(),
                name
            )));
        }

        self.ctx.inspector.forget(&name);
        let mut doc = self.store.load(&record)?;
        let removed = strip_plugin(&mut doc, &name);
        self.store.save(id, &doc)?;
        Ok(removed)
    }

    /// Upgrade one plugin, or every installed plugin when `identifier` is `None`.
    /// Plugin identity is unchanged, so the config is only re-serialized.
    pub fn upgrade(&mut self, id: &str, identifier: Option<&str>, tag: Option<&str>) -> Result<Vec<String>> {
        self.plugin_host(id)?;
        let dir = self.ctx.paths.ensure_package_dir(id)?;

        let specs = match identifier {
            Some(identifier) => {
                let (name, embedded_tag) = sanitize::parse_plugin_identifier(identifier)?;
                let installed = PackageManifest::read(&self.ctx.paths.package_manifest(id))?
                    .is_some_and(|m| m.dependencies.contains_key(&name));
                if !installed {
                    return Err(HubError::Validation(format!(
                        "plugin '{}' is not installed in '{}'",
                        name, id
                    )));
                }
                let tag = tag.map(str::to_string).unwrap_or(embedded_tag);
                vec![format!("{}@{}", name, tag)]
            }
            None => Vec::new(),
        };

        tracing::info!(id, targets = ?specs, "upgrading plugins");
        self.with_unlinked(id, |ctx| ctx.packages.upgrade(&dir, &specs))?;

        let names: Vec<String> = match identifier {
            Some(_) => specs
                .iter()
                .filter_map(|s| sanitize::parse_plugin_identifier(s).ok().map(|(n, _)| n))
                .collect(),
            None => self.plugins(id)?.into_iter().map(|p| p.name).collect(),
        };
        for name in &names {
            self.ctx.inspector.forget(name);
        }

        self.store.touch(id)?;
        Ok(names)
    }

    /// Record of an instance that can host plugins
    fn plugin_host(&self, id: &str) -> Result<InstanceRecord> {
        let registry = InstanceRegistry::load(&self.ctx.paths)?;
        let record = registry
            .get(id)
            .cloned()
            .ok_or_else(|| HubError::InstanceNotFound(id.to_string()))?;
        if record.kind == InstanceKind::Hub {
            return Err(HubError::Validation(
                "the hub instance does not host plugins".to_string(),
            ));
        }
        Ok(record)
    }

    /// Run a package command with the shared-library link taken down.
    /// The link is restored whatever the command's outcome.
    fn with_unlinked(
        &mut self,
        id: &str,
        op: impl FnOnce(&AppContext) -> Result<()>,
    ) -> Result<()> {
        let library = self.ctx.settings.shared_library.clone();
        link::unlink_shared_library(&self.ctx.paths, id, library.as_deref())?;

        let result = op(self.ctx);

        if let Err(e) = link::link_shared_library(&self.ctx.paths, id, library.as_deref()) {
            tracing::warn!(id, error = %e, "failed to restore shared library link");
        }
        result
    }
}

/// True when some platform or accessory entry already references `plugin`
fn is_mapped(doc: &ConfigDocument, plugin: &str) -> bool {
    doc.platforms
        .iter()
        .any(|entry| document::entry_plugin(entry) == Some(plugin))
}

/// Link a platform into the document: claim an unmapped entry that
/// already uses the alias, otherwise append a fresh entry
fn attach(doc: &mut ConfigDocument, capability: &CapabilityRecord) {
    let alias_key = capability.kind.alias_key();
    let entries = &mut doc.platforms;
    let back_ref = json!({ "pluginName": capability.plugin_name });

    let unclaimed = entries.iter_mut().find(|entry| {
        entry.get(alias_key).and_then(Value::as_str) == Some(capability.alias.as_str())
            && document::entry_plugin(entry).is_none()
    });
    if let Some(Value::Object(entry)) = unclaimed {
        entry.insert(PLUGIN_MAP_KEY.to_string(), back_ref);
        return;
    }

    entries.push(json!({
        alias_key: capability.alias,
        PLUGIN_MAP_KEY: back_ref,
    }));
}

/// Drop the plugin from the list and every entry that references it.
/// Returns how many entries were removed.
fn strip_plugin(doc: &mut ConfigDocument, plugin: &str) -> usize {
    doc.plugins.retain(|p| p != plugin);

    let before = doc.platforms.len() + doc.accessories.len();
    doc.platforms
        .retain(|entry| document::entry_plugin(entry) != Some(plugin));
    doc.accessories
        .retain(|entry| document::entry_plugin(entry) != Some(plugin));
    before - (doc.platforms.len() + doc.accessories.len())
}
