use crate::constants::{FULL_BACKUP_EXTENSION, INSTANCE_BACKUP_EXTENSION};
use crate::instances::types::InstanceRecord;
use crate::project_identity;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArchiveScope {
    Full,
    SingleInstance,
}

impl ArchiveScope {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Full => FULL_BACKUP_EXTENSION,
            Self::SingleInstance => INSTANCE_BACKUP_EXTENSION,
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            FULL_BACKUP_EXTENSION => Some(Self::Full),
            INSTANCE_BACKUP_EXTENSION => Some(Self::SingleInstance),
            _ => None,
        }
    }
}

/// First entry of every archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveMetadata {
    /// Creation time, epoch milliseconds; also the archive's file stem
    pub timestamp: i64,
    pub scope: ArchiveScope,
    pub producer_name: String,
    pub producer_version: String,
    pub host: String,
    /// The archived instance, for single-instance archives
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<InstanceRecord>,
}

impl ArchiveMetadata {
    pub fn full() -> Self {
        Self::new(ArchiveScope::Full, None)
    }

    pub fn single(record: &InstanceRecord) -> Self {
        Self::new(ArchiveScope::SingleInstance, Some(record.clone()))
    }

    fn new(scope: ArchiveScope, instance: Option<InstanceRecord>) -> Self {
        Self {
            timestamp: Utc::now().timestamp_millis(),
            scope,
            producer_name: project_identity::BINARY_NAME.to_string(),
            producer_version: project_identity::version().to_string(),
            host: hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_default(),
            instance,
        }
    }

    /// `<epoch-millis>.backup` or `<epoch-millis>.bridge`
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.timestamp, self.scope.extension())
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }
}
