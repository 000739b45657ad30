use super::*;
use crate::config::settings::Settings;
use crate::config::store::ConfigStore;
use crate::error::HubError;
use crate::instances::lifecycle::{self, CreateRequest};
use crate::constants::ARCHIVE_META_NAME;
use crate::instances::registry::InstanceRegistry;
use crate::instances::types::{InstanceKind, InstanceRecord};
use crate::packages::PackageManifest;
use crate::packages::provisioner::PackageProvisioner;
use crate::packages::testing::FakeTool;
use crate::services::testing::FakeServices;
use crate::traits::AppContext;
use crate::utils::paths::StoragePaths;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::tempdir;

fn context(root: &Path, services: FakeServices, tool: FakeTool) -> AppContext {
    let settings = Settings {
        settle_delay: Duration::ZERO,
        ..Settings::default()
    };
    AppContext::new(StoragePaths::new(root), settings, Box::new(services), Box::new(tool))
}

/// hub + kitchen with one installed plugin and some runtime cache
fn populated(root: &Path) -> AppContext {
    let tool = FakeTool::default().with_schema("@acme/lamp", "AcmeLamp");
    let mut ctx = context(root, FakeServices::default(), tool);
    lifecycle::create(&ctx, CreateRequest::new("hub", InstanceKind::Hub).with_port(8581))
        .expect("hub");
    lifecycle::create(&ctx, CreateRequest::new("kitchen", InstanceKind::Bridge).with_port(50826))
        .expect("kitchen");
    PackageProvisioner::new(&mut ctx)
        .install("kitchen", "@acme/lamp@1.2.0", None)
        .expect("install");

    fs::create_dir_all(ctx.paths.package_dir("kitchen").join(".cache/tmp")).expect("cache");
    fs::write(ctx.paths.package_dir("kitchen").join(".cache/tmp/blob"), "x").expect("blob");
    fs::write(ctx.paths.accessories_dir("kitchen").join("cachedAccessories"), "[]")
        .expect("accessories");
    ctx
}

fn entry_names(archive: &Path) -> Vec<PathBuf> {
    let file = File::open(archive).expect("open");
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    archive
        .entries()
        .expect("entries")
        .map(|e| e.expect("entry").path().expect("path").into_owned())
        .collect()
}

#[test]
fn full_backup_skips_regenerable_content() {
    let dir = tempdir().expect("tempdir");
    let ctx = populated(dir.path());

    let name = backup_full(&ctx).expect("backup");
    assert!(name.ends_with(".backup"));
    let names = entry_names(&ctx.paths.backups_dir().join(&name));

    assert_eq!(names[0], PathBuf::from("meta.json"));
    assert!(names.contains(&PathBuf::from("instances.conf")));
    assert!(names.contains(&PathBuf::from("kitchen.conf")));
    assert!(names.contains(&PathBuf::from("kitchen/package.json")));
    assert!(names.contains(&PathBuf::from("kitchen.accessories/cachedAccessories")));
    assert!(
        names.iter().all(|n| {
            let s = n.to_string_lossy();
            !s.contains("node_modules") && !s.contains(".cache") && !s.starts_with("backups")
        }),
        "unexpected entries: {:?}",
        names
    );
    assert!(!dir.path().join("meta.json").exists());
}

#[test]
fn full_round_trip_into_empty_root_regenerates_dependencies() {
    let source = tempdir().expect("source");
    let ctx = populated(source.path());
    let before = PackageManifest::read(&ctx.paths.package_manifest("kitchen"))
        .unwrap()
        .unwrap();
    let archive = ctx.paths.backups_dir().join(backup_full(&ctx).expect("backup"));

    let target = tempdir().expect("target");
    let services = FakeServices::default();
    let tool = FakeTool::default();
    let restored_ctx = context(target.path(), services.clone(), tool.clone());

    let report = restore(&restored_ctx, &archive, false).expect("restore");
    assert!(report.is_clean(), "{:?}", report.failures);
    assert_eq!(report.instances, vec!["hub".to_string(), "kitchen".to_string()]);
    assert!(report.reinstalled.contains(&"kitchen".to_string()));
    assert!(services.has("hub") && services.has("kitchen"));

    let after = PackageManifest::read(&restored_ctx.paths.package_manifest("kitchen"))
        .unwrap()
        .unwrap();
    assert_eq!(after.dependency_names(), before.dependency_names());
    assert!(
        restored_ctx
            .paths
            .plugin_dir("kitchen", "@acme/lamp")
            .join("package.json")
            .exists()
    );

    let doc = ConfigStore::new(restored_ctx.paths.clone())
        .configuration("kitchen")
        .expect("config");
    assert_eq!(doc.platforms.len(), 1);
    assert!(archive.exists());
}

#[test]
fn full_restore_replaces_existing_state_but_keeps_backups() {
    let dir = tempdir().expect("tempdir");
    let ctx = populated(dir.path());
    let name = backup_full(&ctx).expect("backup");

    lifecycle::create(&ctx, CreateRequest::new("garage", InstanceKind::Bridge).with_port(40000))
        .expect("garage");
    fs::write(dir.path().join("stray.txt"), "x").expect("stray");

    restore(&ctx, &ctx.paths.backups_dir().join(&name), false).expect("restore");
    assert!(!dir.path().join("stray.txt").exists());
    assert!(!ctx.paths.config_file("garage").exists());
    assert!(ctx.paths.backups_dir().join(&name).exists());
    let ids: Vec<_> = lifecycle::list(&ctx)
        .expect("list")
        .into_iter()
        .map(|s| s.record.id)
        .collect();
    assert_eq!(ids, vec!["hub", "kitchen"]);
}

#[test]
fn instance_export_imports_without_touching_others() {
    let source = tempdir().expect("source");
    let ctx = populated(source.path());
    let out = tempdir().expect("out");
    let archive = export(&ctx, "kitchen", out.path()).expect("export");
    assert!(archive.to_string_lossy().ends_with(".bridge"));

    let names = entry_names(&archive);
    assert!(names.contains(&PathBuf::from("kitchen.conf")));
    assert!(!names.contains(&PathBuf::from("instances.conf")));
    assert!(!names.iter().any(|n| n.starts_with("hub")));

    let target = tempdir().expect("target");
    let services = FakeServices::default();
    let other = context(target.path(), services.clone(), FakeTool::default());
    lifecycle::create(&other, CreateRequest::new("garage", InstanceKind::Bridge).with_port(50826))
        .expect("garage");

    let report = restore(&other, &archive, true).expect("import");
    assert_eq!(report.instances, vec!["kitchen".to_string()]);
    assert!(!archive.exists());
    assert!(services.has("kitchen"));

    let listed = lifecycle::list(&other).expect("list");
    assert_eq!(listed.len(), 2);
    let kitchen = listed.iter().find(|s| s.record.id == "kitchen").expect("kitchen");
    assert_ne!(kitchen.record.port, 50826);
    let doc = ConfigStore::new(other.paths.clone())
        .configuration("kitchen")
        .expect("config");
    assert_eq!(doc.bridge.expect("bridge").port, kitchen.record.port);
    assert!(other.paths.config_file("garage").exists());
}

#[test]
fn backups_are_listed_newest_first() {
    let dir = tempdir().expect("tempdir");
    let paths = StoragePaths::new(dir.path());
    let backups = paths.ensure_backups_dir().expect("backups");
    fs::write(backups.join("1000.backup"), "a").expect("write");
    fs::write(backups.join("3000.bridge"), "b").expect("write");
    fs::write(backups.join("notes.txt"), "c").expect("write");

    let listed = list_backups(&paths).expect("list");
    let names: Vec<_> = listed.iter().map(|b| b.file_name.as_str()).collect();
    assert_eq!(names, vec!["3000.bridge", "1000.backup"]);
    assert_eq!(listed[0].scope, ArchiveScope::SingleInstance);
}

#[test]
fn archive_without_metadata_is_rejected() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("bogus.backup");
    let file = File::create(&path).expect("create");
    let mut builder = tar::Builder::new(flate2::write::GzEncoder::new(
        file,
        flate2::Compression::default(),
    ));
    let data = b"[]";
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_cksum();
    builder
        .append_data(&mut header, "instances.conf", &data[..])
        .expect("append");
    builder.into_inner().expect("tar").finish().expect("gzip");

    assert!(matches!(read_metadata(&path), Err(HubError::Archive(_))));
}

fn metadata_only_archive(path: &Path, record: &InstanceRecord) {
    let file = File::create(path).expect("create");
    let mut builder = tar::Builder::new(flate2::write::GzEncoder::new(
        file,
        flate2::Compression::default(),
    ));
    let data = serde_json::to_vec(&ArchiveMetadata::single(record)).expect("metadata");
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, ARCHIVE_META_NAME, &data[..])
        .expect("append");
    builder.into_inner().expect("tar").finish().expect("gzip");
}

#[test]
fn import_rejects_ids_that_escape_storage() {
    let dir = tempdir().expect("tempdir");
    let root = dir.path().join("storage");
    let ctx = context(&root, FakeServices::default(), FakeTool::default());

    let archive = dir.path().join("crafted.bridge");
    let record = InstanceRecord::new("../escaped", InstanceKind::Bridge, "Escaped", 51200);
    metadata_only_archive(&archive, &record);

    assert!(matches!(restore(&ctx, &archive, false), Err(HubError::Archive(_))));
    assert!(!dir.path().join("escaped").exists());
    assert!(!dir.path().join("escaped.conf").exists());
    assert!(InstanceRegistry::load(&ctx.paths).expect("registry").is_empty());
}

#[test]
fn import_rejects_reserved_ids() {
    let dir = tempdir().expect("tempdir");
    let ctx = context(dir.path(), FakeServices::default(), FakeTool::default());

    let archive = dir.path().join("reserved.bridge");
    let record = InstanceRecord::new("backups", InstanceKind::Bridge, "Backups", 51201);
    metadata_only_archive(&archive, &record);

    assert!(matches!(restore(&ctx, &archive, false), Err(HubError::Archive(_))));
    assert!(!dir.path().join("backups.conf").exists());
}
