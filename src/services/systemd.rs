use super::run_quietly;
use super::templates::{UnitSpec, render_systemd};
use crate::config::settings::Settings;
use crate::instances::types::InstanceRecord;
use crate::project_identity;
use crate::traits::{HostCommand, ServiceManager};
use crate::utils::fsio;
use std::path::{Path, PathBuf};

pub struct SystemdManager {
    unit_dir: PathBuf,
    storage: PathBuf,
    settings: Settings,
    host: Box<dyn HostCommand>,
}

impl SystemdManager {
    pub fn new(
        unit_dir: impl Into<PathBuf>,
        storage: &Path,
        settings: Settings,
        host: Box<dyn HostCommand>,
    ) -> Self {
        Self {
            unit_dir: unit_dir.into(),
            storage: storage.to_path_buf(),
            settings,
            host,
        }
    }

    fn file_name(id: &str) -> String {
        format!("{}-{}.service", project_identity::SERVICE_PREFIX, id)
    }

    fn unit_path(&self, id: &str) -> PathBuf {
        self.unit_dir.join(Self::file_name(id))
    }

    fn systemctl(&self, args: &[&str]) -> bool {
        run_quietly(self.host.as_ref(), "systemctl", args)
    }
}

impl ServiceManager for SystemdManager {
    fn backend_name(&self) -> &'static str {
        "systemd"
    }

    fn unit_name(&self, id: &str) -> Option<String> {
        Some(Self::file_name(id))
    }

    fn unit_exists(&self, id: &str) -> bool {
        self.unit_path(id).exists()
    }

    fn create_unit(&self, record: &InstanceRecord) -> bool {
        let name = Self::file_name(&record.id);
        let path = self.unit_path(&record.id);
        let spec = UnitSpec::for_record(record, &self.settings, &self.storage);
        let existed = path.exists();

        if let Err(e) = fsio::write_atomically(&path, render_systemd(&spec).as_bytes()) {
            tracing::warn!(unit = %name, error = %e, "failed to write unit file");
            return false;
        }

        let activated = self.systemctl(&["daemon-reload"])
            && self.systemctl(&["enable", &name])
            && self.systemctl(&["start", &name]);
        if !activated && !existed {
            // a fresh unit that never started must not look installed
            if let Err(e) = fsio::remove_path(&path) {
                tracing::warn!(unit = %name, error = %e, "failed to discard unit file");
            }
        }
        activated
    }

    fn remove_unit(&self, id: &str) -> bool {
        let path = self.unit_path(id);
        if !path.exists() {
            return true;
        }

        let name = Self::file_name(id);
        if !(self.systemctl(&["stop", &name]) && self.systemctl(&["disable", &name])) {
            return false;
        }

        if let Err(e) = fsio::remove_path(&path) {
            tracing::warn!(unit = %name, error = %e, "failed to delete unit file");
            return false;
        }

        self.systemctl(&["daemon-reload"])
    }
}
