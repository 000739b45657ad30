//! Package tool double that materializes trees without a network.

use crate::error::{HubError, Result};
use crate::packages::manifest::PackageManifest;
use crate::traits::PackageTool;
use crate::utils::sanitize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct FakeTool {
    /// plugin name -> (alias, type) written to its schema document
    pub schemas: HashMap<String, (String, &'static str)>,
    /// exit non-zero on every call
    pub fail: bool,
    /// exit zero but leave the tree untouched
    pub hollow: bool,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl FakeTool {
    pub fn with_schema(mut self, plugin: &str, alias: &str) -> Self {
        self.schemas
            .insert(plugin.to_string(), (alias.to_string(), "platform"));
        self
    }

    pub fn with_accessory_schema(mut self, plugin: &str, alias: &str) -> Self {
        self.schemas
            .insert(plugin.to_string(), (alias.to_string(), "accessory"));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, call: String) -> Result<()> {
        self.calls.lock().expect("calls lock").push(call);
        if self.fail {
            return Err(HubError::PackageManagerError("fake failure".to_string()));
        }
        Ok(())
    }

    fn materialize(&self, dir: &Path, name: &str, version: &str) {
        let install = name
            .split('/')
            .fold(dir.join("node_modules"), |acc, part| acc.join(part));
        fs::create_dir_all(&install).expect("plugin dir");
        fs::write(
            install.join("package.json"),
            format!(r#"{{"name":"{}","version":"{}"}}"#, name, version),
        )
        .expect("plugin manifest");
        if let Some((alias, kind)) = self.schemas.get(name) {
            fs::write(
                install.join("config.schema.json"),
                format!(r#"{{"pluginAlias":"{}","pluginType":"{}"}}"#, alias, kind),
            )
            .expect("schema");
        }
    }

    fn edit_manifest(dir: &Path, edit: impl FnOnce(&mut PackageManifest)) {
        let path = dir.join("package.json");
        let mut manifest = PackageManifest::read(&path)
            .expect("read manifest")
            .unwrap_or_default();
        edit(&mut manifest);
        manifest.write(&path).expect("write manifest");
    }
}

impl PackageTool for FakeTool {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn add(&self, dir: &Path, spec: &str) -> Result<()> {
        self.record(format!("add {}", spec))?;
        if self.hollow {
            return Ok(());
        }
        let (name, tag) = sanitize::parse_plugin_identifier(spec)?;
        let version = if tag == sanitize::DEFAULT_TAG { "1.0.0".to_string() } else { tag };
        self.materialize(dir, &name, &version);
        Self::edit_manifest(dir, |m| {
            m.dependencies.insert(name.clone(), format!("^{}", version));
        });
        Ok(())
    }

    fn remove(&self, dir: &Path, name: &str) -> Result<()> {
        self.record(format!("remove {}", name))?;
        if self.hollow {
            return Ok(());
        }
        let install = name
            .split('/')
            .fold(dir.join("node_modules"), |acc, part| acc.join(part));
        let _ = fs::remove_dir_all(install);
        Self::edit_manifest(dir, |m| {
            m.dependencies.remove(name);
        });
        Ok(())
    }

    fn upgrade(&self, _dir: &Path, specs: &[String]) -> Result<()> {
        self.record(format!("upgrade {}", specs.join(" ")).trim_end().to_string())
    }

    fn install_all(&self, dir: &Path) -> Result<()> {
        self.record(format!("install-all {}", dir.display()))?;
        let manifest = PackageManifest::read(&dir.join("package.json"))?.unwrap_or_default();
        for (name, range) in &manifest.dependencies {
            self.materialize(dir, name, range.trim_start_matches('^'));
        }
        Ok(())
    }
}
