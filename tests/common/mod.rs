//! Shared doubles for integration tests: an in-memory init system and a
//! package tool that writes plugin trees without touching the network.

#![allow(dead_code)]

use hubctl::config::settings::Settings;
use hubctl::error::Result;
use hubctl::instances::types::InstanceRecord;
use hubctl::packages::PackageManifest;
use hubctl::traits::{AppContext, PackageTool, ServiceManager};
use hubctl::utils::paths::StoragePaths;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Default)]
pub struct MemoryUnits {
    pub units: Arc<Mutex<BTreeSet<String>>>,
}

impl ServiceManager for MemoryUnits {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn unit_name(&self, id: &str) -> Option<String> {
        Some(format!("memory-{}", id))
    }

    fn unit_exists(&self, id: &str) -> bool {
        self.units.lock().unwrap().contains(id)
    }

    fn create_unit(&self, record: &InstanceRecord) -> bool {
        self.units.lock().unwrap().insert(record.id.clone());
        true
    }

    fn remove_unit(&self, id: &str) -> bool {
        self.units.lock().unwrap().remove(id);
        true
    }
}

/// Writes `node_modules/<name>` with a manifest and a platform schema
#[derive(Clone, Default)]
pub struct OfflineTool {
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl OfflineTool {
    fn install_dir(dir: &Path, name: &str) -> PathBuf {
        name.split('/')
            .fold(dir.join("node_modules"), |acc, part| acc.join(part))
    }

    fn materialize(dir: &Path, name: &str) {
        let install = Self::install_dir(dir, name);
        fs::create_dir_all(&install).unwrap();
        fs::write(
            install.join("package.json"),
            format!(r#"{{"name":"{}","version":"2.0.0"}}"#, name),
        )
        .unwrap();
        let alias = name.rsplit('/').next().unwrap_or(name).to_uppercase();
        fs::write(
            install.join("config.schema.json"),
            format!(r#"{{"pluginAlias":"{}","pluginType":"platform"}}"#, alias),
        )
        .unwrap();
    }

    fn edit(dir: &Path, f: impl FnOnce(&mut PackageManifest)) {
        let path = dir.join("package.json");
        let mut manifest = PackageManifest::read(&path).unwrap().unwrap_or_default();
        f(&mut manifest);
        manifest.write(&path).unwrap();
    }
}

impl PackageTool for OfflineTool {
    fn name(&self) -> &'static str {
        "offline"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn add(&self, dir: &Path, spec: &str) -> Result<()> {
        self.calls.lock().unwrap().push(format!("add {}", spec));
        let name = match spec.rfind('@') {
            Some(at) if at > 0 => &spec[..at],
            _ => spec,
        };
        Self::materialize(dir, name);
        Self::edit(dir, |m| {
            m.dependencies.insert(name.to_string(), "^2.0.0".to_string());
        });
        Ok(())
    }

    fn remove(&self, dir: &Path, name: &str) -> Result<()> {
        self.calls.lock().unwrap().push(format!("remove {}", name));
        let _ = fs::remove_dir_all(Self::install_dir(dir, name));
        Self::edit(dir, |m| {
            m.dependencies.remove(name);
        });
        Ok(())
    }

    fn upgrade(&self, _dir: &Path, specs: &[String]) -> Result<()> {
        self.calls.lock().unwrap().push(format!("upgrade {}", specs.join(" ")));
        Ok(())
    }

    fn install_all(&self, dir: &Path) -> Result<()> {
        self.calls.lock().unwrap().push("install-all".to_string());
        let manifest = PackageManifest::read(&dir.join("package.json"))?.unwrap_or_default();
        for name in manifest.dependency_names() {
            Self::materialize(dir, &name);
        }
        Ok(())
    }
}

pub struct Harness {
    pub ctx: AppContext,
    pub units: MemoryUnits,
    pub tool: OfflineTool,
}

pub fn harness(root: &Path) -> Harness {
    let units = MemoryUnits::default();
    let tool = OfflineTool::default();
    let settings = Settings {
        settle_delay: Duration::ZERO,
        probe_timeout: Duration::from_secs(1),
        ..Settings::default()
    };
    let ctx = AppContext::new(
        StoragePaths::new(root),
        settings,
        Box::new(units.clone()),
        Box::new(tool.clone()),
    );
    Harness { ctx, units, tool }
}
