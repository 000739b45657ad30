use super::run_quietly;
use super::templates::{UnitSpec, render_launchd};
use crate::config::settings::Settings;
use crate::instances::types::InstanceRecord;
use crate::project_identity;
use crate::traits::{HostCommand, ServiceManager};
use crate::utils::fsio;
use std::path::{Path, PathBuf};

pub struct LaunchdManager {
    daemon_dir: PathBuf,
    storage: PathBuf,
    settings: Settings,
    host: Box<dyn HostCommand>,
}

impl LaunchdManager {
    pub fn new(
        daemon_dir: impl Into<PathBuf>,
        storage: &Path,
        settings: Settings,
        host: Box<dyn HostCommand>,
    ) -> Self {
        Self {
            daemon_dir: daemon_dir.into(),
            storage: storage.to_path_buf(),
            settings,
            host,
        }
    }

    fn label(id: &str) -> String {
        format!("{}.{}", project_identity::LAUNCHD_LABEL_PREFIX, id)
    }

    fn plist_path(&self, id: &str) -> PathBuf {
        self.daemon_dir.join(format!("{}.plist", Self::label(id)))
    }
}

impl ServiceManager for LaunchdManager {
    fn backend_name(&self) -> &'static str {
        "launchd"
    }

    fn unit_name(&self, id: &str) -> Option<String> {
        Some(Self::label(id))
    }

    fn unit_exists(&self, id: &str) -> bool {
        self.plist_path(id).exists()
    }

    fn create_unit(&self, record: &InstanceRecord) -> bool {
        let label = Self::label(&record.id);
        let path = self.plist_path(&record.id);
        let spec = UnitSpec::for_record(record, &self.settings, &self.storage);

        let existed = path.exists();

        if let Err(e) = fsio::write_atomically(&path, render_launchd(&label, &spec).as_bytes()) {
            tracing::warn!(label = %label, error = %e, "failed to write plist");
            return false;
        }

        let shown = path.display().to_string();
        let loaded = run_quietly(self.host.as_ref(), "launchctl", &["load", "-w", &shown]);
        if !loaded
            && !existed
            && let Err(e) = fsio::remove_path(&path)
        {
            tracing::warn!(path = %shown, error = %e, "failed to discard plist");
        }
        loaded
    }

    fn remove_unit(&self, id: &str) -> bool {
        let path = self.plist_path(id);
        if !path.exists() {
            return true;
        }

        let shown = path.display().to_string();
        if !run_quietly(self.host.as_ref(), "launchctl", &["unload", "-w", &shown]) {
            return false;
        }

        match fsio::remove_path(&path) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(path = %shown, error = %e, "failed to delete plist");
                false
            }
        }
    }
}
