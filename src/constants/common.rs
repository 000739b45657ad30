// Common constants used throughout the codebase

/// Instance registry file, relative to the storage root
pub const INSTANCES_FILE_NAME: &str = "instances.conf";

/// Archive directory, relative to the storage root
pub const BACKUPS_DIR_NAME: &str = "backups";

/// Per-package-tree manifest
pub const PACKAGE_MANIFEST_NAME: &str = "package.json";

/// Package manager dependency directory (never archived, regenerated on restore)
pub const MODULES_DIR_NAME: &str = "node_modules";

/// Directories skipped inside package trees when archiving
pub const CACHE_DIR_NAMES: &[&str] = &["cache", ".cache"];

/// Declarative plugin schema shipped by well-behaved plugins
pub const PLUGIN_SCHEMA_NAME: &str = "config.schema.json";

/// Metadata entry embedded first in every archive
pub const ARCHIVE_META_NAME: &str = "meta.json";

pub const FULL_BACKUP_EXTENSION: &str = "backup";
pub const INSTANCE_BACKUP_EXTENSION: &str = "bridge";

/// First port offered to a new instance; probing moves up by `PORT_PROBE_STEP`
pub const DEFAULT_BASE_PORT: u16 = 50826;
pub const PORT_PROBE_STEP: u16 = 1000;

/// Primary instance id
pub const HUB_ID: &str = "hub";

/// Default pairing pin written into new bridge configs
pub const DEFAULT_PIN: &str = "031-45-154";

pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_SETTLE_DELAY_SECS: u64 = 2;
pub const PACKAGE_COMMAND_TIMEOUT_SECS: u64 = 900;
pub const SERVICE_COMMAND_TIMEOUT_SECS: u64 = 60;
