//! ArchiveEngine: gzip-compressed tar snapshots of the storage root.
//!
//! Every archive starts with a `meta.json` entry describing its scope.
//! Dependency trees and package caches are never archived; restore
//! regenerates them through the package manager.

mod backup;
pub mod metadata;
mod restore;

pub use backup::{BackupEntry, backup_full, backup_instance, export, list_backups};
pub use metadata::{ArchiveMetadata, ArchiveScope};
pub use restore::{RestoreReport, read_metadata, restore};

#[cfg(test)]
mod tests;
