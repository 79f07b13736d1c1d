use healapp_store::model::account::Role;
use healapp_store::repo::{RoleRepository, SqliteRoleRepository};
use healapp_store::{open_db_with_config, Accessor, ConfigError, Filter, RepoError, StoreConfig};
use std::fs;

#[test]
fn config_file_drives_connection_and_limits() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("store.json");
    fs::write(
        &config_path,
        r#"{
            "database": { "busy_timeout_ms": 250 },
            "limits": { "max_page_size": 5, "max_unpaged_rows": 2 }
        }"#,
    )
    .unwrap();

    let config = StoreConfig::from_json_file(&config_path).unwrap();
    assert_eq!(config.database.busy_timeout_ms, 250);
    assert_eq!(config.limits.default_page_size, 5);
    assert!(config.logging.is_none());

    let conn = open_db_with_config(dir.path().join("store.db"), &config.database).unwrap();
    let roles = SqliteRoleRepository::with_limits(&conn, config.limits).unwrap();
    for name in ["CUSTOMER", "STAFF", "ADMIN"] {
        roles.create(&Role::new(name)).unwrap();
    }
    assert!(matches!(
        roles.find_all(&Filter::All, &[]),
        Err(RepoError::ResultTooLarge { limit: 2, .. })
    ));
}

#[test]
fn missing_config_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");

    match StoreConfig::from_json_file(&path).unwrap_err() {
        ConfigError::Io { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unknown_fields_are_rejected() {
    let err = StoreConfig::from_json_str(r#"{ "limits": { "page": 3 } }"#).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}
