pub mod common;
pub mod reserved;

pub use common::{
    ARCHIVE_META_NAME, BACKUPS_DIR_NAME, CACHE_DIR_NAMES, DEFAULT_BASE_PORT, DEFAULT_PIN,
    DEFAULT_PROBE_TIMEOUT_SECS, DEFAULT_SETTLE_DELAY_SECS, FULL_BACKUP_EXTENSION, HUB_ID,
    INSTANCE_BACKUP_EXTENSION, INSTANCES_FILE_NAME, MODULES_DIR_NAME, PACKAGE_COMMAND_TIMEOUT_SECS,
    PACKAGE_MANIFEST_NAME, PLUGIN_SCHEMA_NAME, PORT_PROBE_STEP, SERVICE_COMMAND_TIMEOUT_SECS,
};
pub use reserved::ALL as RESERVED_IDS;
