//! Core traits for dependency injection and testability
//!
//! The provisioning engine talks to three things it does not own: the
//! host init system, the package manager, and the shell that runs their
//! control commands. Each sits behind a trait here so tests can swap in
//! fakes, and everything an operation needs travels in one `AppContext`
//! instead of process-global state.

use crate::config::settings::Settings;
use crate::error::Result;
use crate::inspector::PluginInspector;
use crate::instances::types::InstanceRecord;
use crate::packages;
use crate::services;
use crate::socket::ControlSocket;
use crate::utils::paths::StoragePaths;
use std::path::Path;

/// Runs a host control command; `Ok(true)` means exit status zero
pub trait HostCommand: Send + Sync {
    fn run(&self, program: &str, args: &[String]) -> Result<bool>;
}

/// Host init-system strategy.
///
/// Both mutating calls report failure as `false` and never return errors.
/// Removing a unit that does not exist succeeds.
pub trait ServiceManager: Send + Sync {
    /// Short backend name for display ("systemd", "launchd", "foreground")
    fn backend_name(&self) -> &'static str;

    /// Unit name this backend uses for an instance, if it manages units at all
    fn unit_name(&self, id: &str) -> Option<String>;

    fn unit_exists(&self, id: &str) -> bool;

    fn create_unit(&self, record: &InstanceRecord) -> bool;

    fn remove_unit(&self, id: &str) -> bool;
}

/// External package manager operating on one package tree directory.
///
/// Exit status is the contract; callers inspect the tree afterwards.
pub trait PackageTool: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_available(&self) -> bool;

    /// Add `spec` (`name@tag`) to the tree and its manifest
    fn add(&self, dir: &Path, spec: &str) -> Result<()>;

    fn remove(&self, dir: &Path, name: &str) -> Result<()>;

    /// Upgrade the named specs, or everything when `specs` is empty
    fn upgrade(&self, dir: &Path, specs: &[String]) -> Result<()>;

    /// Install every dependency the manifest lists
    fn install_all(&self, dir: &Path) -> Result<()>;
}

/// Application context holding all dependencies of one CLI invocation
pub struct AppContext {
    pub paths: StoragePaths,
    pub settings: Settings,
    pub services: Box<dyn ServiceManager>,
    pub packages: Box<dyn PackageTool>,
    /// Capability cache lives exactly as long as the context
    pub inspector: PluginInspector,
}

impl AppContext {
    /// Create a new context with the given dependencies
    pub fn new(
        paths: StoragePaths,
        settings: Settings,
        services: Box<dyn ServiceManager>,
        packages: Box<dyn PackageTool>,
    ) -> Self {
        let inspector = PluginInspector::new(settings.probe_timeout);
        Self {
            paths,
            settings,
            services,
            packages,
            inspector,
        }
    }

    /// Create a context for this host: detected init system, configured package manager
    pub fn for_host(paths: StoragePaths, settings: Settings) -> Self {
        let services = services::detect(&paths, &settings);
        let packages = packages::from_settings(&settings);
        tracing::debug!(
            storage = %paths.root().display(),
            services = services.backend_name(),
            packages = packages.name(),
            "context ready"
        );
        Self::new(paths, settings, services, packages)
    }

    /// Control socket of the hub, which relays instance events
    pub fn hub_socket(&self) -> ControlSocket {
        ControlSocket::new(self.paths.socket_path(crate::constants::HUB_ID))
    }
}
