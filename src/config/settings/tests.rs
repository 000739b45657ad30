use super::*;

#[test]
fn test_defaults() {
    let settings = Settings::default();
    assert_eq!(settings.package_manager, PackageManagerKind::Npm);
    assert_eq!(settings.base_port, 50826);
    assert!(!settings.elevated);
    assert!(settings.shared_library.is_none());
}

#[test]
fn test_parse_full_file() {
    let settings = Settings::parse(
        r#"
storage "/srv/bridges"
package-manager "yarn"
runtime "/usr/bin/hubd"
service-user "bridges"
shared-library "/usr/lib/hubd/node_modules/hap-nodejs"
elevated #true
probe-timeout 5
settle-delay 0
base-port 51000
"#,
    )
    .expect("parse");

    assert_eq!(settings.storage, Some(PathBuf::from("/srv/bridges")));
    assert_eq!(settings.package_manager, PackageManagerKind::Yarn);
    assert_eq!(settings.runtime, "/usr/bin/hubd");
    assert_eq!(settings.service_user.as_deref(), Some("bridges"));
    assert!(settings.elevated);
    assert_eq!(settings.probe_timeout, Duration::from_secs(5));
    assert_eq!(settings.settle_delay, Duration::ZERO);
    assert_eq!(settings.base_port, 51000);
}

#[test]
fn test_unknown_nodes_are_ignored() {
    let settings = Settings::parse("color \"never\"\n").expect("parse");
    assert_eq!(settings.runtime, "hubd");
}

#[test]
fn test_invalid_package_manager() {
    assert!(Settings::parse("package-manager \"pip\"\n").is_err());
}

#[test]
fn test_invalid_port() {
    assert!(Settings::parse("base-port 70000\n").is_err());
}

#[test]
fn test_flag_wins_storage_resolution() {
    let settings = Settings::parse("storage \"/srv/bridges\"\n").expect("parse");
    let resolved = settings
        .resolve_storage(Some(Path::new("/tmp/override")))
        .expect("resolve");
    assert_eq!(resolved, PathBuf::from("/tmp/override"));
}

#[test]
fn test_missing_file_gives_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = Settings::load_from(&dir.path().join("hubctl.kdl")).expect("load");
    assert_eq!(settings.runtime, "hubd");
}
