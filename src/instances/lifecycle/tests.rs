use super::*;
use crate::config::settings::Settings;
use crate::packages::testing::FakeTool;
use crate::services::testing::FakeServices;
use crate::utils::paths::StoragePaths;
use std::path::Path;
use tempfile::tempdir;

fn context(root: &Path, services: FakeServices) -> AppContext {
    AppContext::new(
        StoragePaths::new(root),
        Settings::default(),
        Box::new(services),
        Box::new(FakeTool::default()),
    )
}

#[test]
fn created_instance_is_listed_once() {
    let dir = tempdir().expect("tempdir");
    let services = FakeServices::default();
    let ctx = context(dir.path(), services.clone());

    let record = create(&ctx, CreateRequest::new("Kitchen", InstanceKind::Bridge).with_port(50826))
        .expect("create");
    assert_eq!(record.id, "kitchen");
    assert_eq!(record.service_unit_ref.as_deref(), Some("fake-kitchen"));
    assert!(services.has("kitchen"));

    let listed = list(&ctx).expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].record.id, "kitchen");
    assert_eq!(listed[0].record.port, 50826);
    assert_eq!(listed[0].service_unit.as_deref(), Some("fake-kitchen"));
}

#[test]
fn duplicate_port_is_rejected_without_mutation() {
    let dir = tempdir().expect("tempdir");
    let ctx = context(dir.path(), FakeServices::default());
    create(&ctx, CreateRequest::new("kitchen", InstanceKind::Bridge).with_port(50826))
        .expect("create");

    let err = create(&ctx, CreateRequest::new("garage", InstanceKind::Bridge).with_port(50826))
        .unwrap_err();
    assert_eq!(err.to_string(), "port is already in use");
    assert_eq!(list(&ctx).expect("list").len(), 1);
    assert!(!ctx.paths.package_dir("garage").exists());
}

#[test]
fn reserved_and_duplicate_names_are_rejected() {
    let dir = tempdir().expect("tempdir");
    let ctx = context(dir.path(), FakeServices::default());
    create(&ctx, CreateRequest::new("kitchen", InstanceKind::Bridge).with_port(50826))
        .expect("create");

    let reserved = create(&ctx, CreateRequest::new("Backups", InstanceKind::Bridge).with_port(1));
    assert!(matches!(reserved, Err(HubError::Validation(_))));

    let duplicate = create(&ctx, CreateRequest::new("KITCHEN!", InstanceKind::Bridge).with_port(2));
    assert!(matches!(duplicate, Err(HubError::Validation(_))));
}

#[test]
fn port_defaults_to_next_free_step() {
    let dir = tempdir().expect("tempdir");
    let ctx = context(dir.path(), FakeServices::default());
    create(&ctx, CreateRequest::new("kitchen", InstanceKind::Bridge).with_port(50826))
        .expect("create");

    let record = create(&ctx, CreateRequest::new("garage", InstanceKind::Bridge)).expect("create");
    assert_ne!(record.port, 50826);
    assert_eq!(record.port % 1000, 826);
}

#[test]
fn failed_unit_creation_persists_nothing() {
    let dir = tempdir().expect("tempdir");
    let ctx = context(dir.path(), FakeServices::failing());

    let err = create(&ctx, CreateRequest::new("kitchen", InstanceKind::Bridge).with_port(50826))
        .unwrap_err();
    assert!(matches!(err, HubError::SystemCommandFailed { .. }));
    assert!(list(&ctx).expect("list").is_empty());
    assert!(!ctx.paths.package_dir("kitchen").exists());
}

#[test]
fn dev_instances_get_no_unit() {
    let dir = tempdir().expect("tempdir");
    let services = FakeServices::default();
    let ctx = context(dir.path(), services.clone());

    let record = create(&ctx, CreateRequest::new("sandbox", InstanceKind::Dev).with_port(40000))
        .expect("create");
    assert!(record.service_unit_ref.is_none());
    assert!(!services.has("sandbox"));
}

#[test]
fn remove_tears_down_unit_and_storage() {
    let dir = tempdir().expect("tempdir");
    let services = FakeServices::default();
    let ctx = context(dir.path(), services.clone());
    create(&ctx, CreateRequest::new("kitchen", InstanceKind::Bridge).with_port(50826))
        .expect("create");
    assert!(ctx.paths.config_file("kitchen").exists());

    let removed = remove(&ctx, "Kitchen").expect("remove");
    assert_eq!(removed.id, "kitchen");
    assert!(!services.has("kitchen"));
    for entry in ctx.paths.instance_entries("kitchen") {
        assert!(!entry.exists(), "{} left behind", entry.display());
    }
    assert!(list(&ctx).expect("list").is_empty());
}

#[test]
fn remove_unknown_instance_fails() {
    let dir = tempdir().expect("tempdir");
    let ctx = context(dir.path(), FakeServices::default());
    assert!(matches!(remove(&ctx, "ghost"), Err(HubError::InstanceNotFound(_))));
}

#[test]
fn failed_unit_removal_keeps_storage() {
    let dir = tempdir().expect("tempdir");
    let ctx = context(dir.path(), FakeServices::default());
    create(&ctx, CreateRequest::new("kitchen", InstanceKind::Bridge).with_port(50826))
        .expect("create");

    let broken = context(dir.path(), FakeServices::failing());
    assert!(remove(&broken, "kitchen").is_err());
    assert!(ctx.paths.config_file("kitchen").exists());
    assert_eq!(list(&ctx).expect("list").len(), 1);
}

#[test]
fn rename_updates_registry_and_config() {
    let dir = tempdir().expect("tempdir");
    let ctx = context(dir.path(), FakeServices::default());
    create(&ctx, CreateRequest::new("kitchen", InstanceKind::Bridge).with_port(50826))
        .expect("create");

    rename(&ctx, "kitchen", "Cuisine").expect("rename");
    let doc = ConfigStore::new(ctx.paths.clone())
        .configuration("kitchen")
        .expect("config");
    assert_eq!(doc.bridge.expect("bridge").name, "Cuisine");
    assert_eq!(list(&ctx).expect("list")[0].record.display_name, "Cuisine");

    assert!(matches!(rename(&ctx, "kitchen", "  "), Err(HubError::Validation(_))));
}

#[test]
fn purge_empties_caches_but_keeps_config() {
    let dir = tempdir().expect("tempdir");
    let ctx = context(dir.path(), FakeServices::default());
    create(&ctx, CreateRequest::new("kitchen", InstanceKind::Bridge).with_port(50826))
        .expect("create");
    let cached = ctx.paths.accessories_dir("kitchen").join("cachedAccessories");
    fs::write(&cached, "[]").expect("cache");
    fs::write(ctx.paths.persist_dir("kitchen").join("AccessoryInfo.json"), "{}").expect("persist");

    purge(&ctx, "kitchen").expect("purge");
    assert!(!cached.exists());
    assert!(ctx.paths.accessories_dir("kitchen").is_dir());
    assert_eq!(
        fs::read_dir(ctx.paths.persist_dir("kitchen")).expect("read").count(),
        0
    );
    assert!(ctx.paths.config_file("kitchen").exists());
}

#[test]
fn reset_backs_up_then_clears_everything_else() {
    let dir = tempdir().expect("tempdir");
    let services = FakeServices::default();
    let ctx = context(dir.path(), services.clone());
    create(&ctx, CreateRequest::new("hub", InstanceKind::Hub).with_port(8581)).expect("hub");
    create(&ctx, CreateRequest::new("kitchen", InstanceKind::Bridge).with_port(50826))
        .expect("create");

    let backup = reset(&ctx).expect("reset");
    assert!(backup.ends_with(".backup"));
    assert!(ctx.paths.backups_dir().join(&backup).is_file());
    assert!(!services.has("hub"));
    assert!(!services.has("kitchen"));

    let left: Vec<_> = fs::read_dir(dir.path())
        .expect("read")
        .map(|e| e.expect("entry").file_name())
        .collect();
    assert_eq!(left, vec![std::ffi::OsString::from(BACKUPS_DIR_NAME)]);
}

#[test]
fn link_service_recreates_missing_unit() {
    let dir = tempdir().expect("tempdir");
    let services = FakeServices::default();
    let ctx = context(dir.path(), services.clone());
    create(&ctx, CreateRequest::new("kitchen", InstanceKind::Bridge).with_port(50826))
        .expect("create");
    services.units.lock().expect("units").clear();

    assert!(link_service(&ctx, "kitchen").expect("link"));
    assert!(services.has("kitchen"));
}
