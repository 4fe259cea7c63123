//! Configuration loading from files and environment lookups

use broker_authz::{AuthConfig, AuthManager, ConfigError, Principal, ResourceAuthScope};
use std::collections::HashMap;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_full_config_file() {
    let file = write_config(
        r#"{
            "authorization_enabled": true,
            "admin_group": "operators",
            "admin_principal": "root",
            "users": [
                { "name": "alice", "groups": ["operators"] },
                { "name": "bob" }
            ],
            "bind_addr": "127.0.0.1:9090"
        }"#,
    );

    let config = AuthConfig::from_file(file.path()).unwrap();
    assert_eq!(config.admin_group, "operators");
    assert_eq!(config.admin_principal, "root");
    assert_eq!(config.users.len(), 2);
    assert!(config.users[1].groups.is_empty());
    assert_eq!(config.bind_addr.port(), 9090);
    assert!(config.database_url.is_none());
}

#[test]
fn test_partial_file_keeps_defaults() {
    let file = write_config(r#"{ "authorization_enabled": false }"#);

    let config = AuthConfig::from_file(file.path()).unwrap();
    assert!(!config.authorization_enabled);
    assert_eq!(config.admin_group, AuthConfig::default().admin_group);
    assert_eq!(config.bind_addr, AuthConfig::default().bind_addr);
}

#[test]
fn test_malformed_file_is_rejected() {
    let file = write_config("{ not json");
    let err = AuthConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn test_missing_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let err = AuthConfig::from_file(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn test_environment_overrides_file() {
    let file = write_config(r#"{ "admin_group": "operators" }"#);
    let vars: HashMap<&str, String> = [
        ("BROKER_AUTHZ_CONFIG", file.path().display().to_string()),
        ("BROKER_AUTHZ_ADMIN_GROUP", "wheel".to_string()),
        ("BROKER_AUTHZ_ENABLED", "no".to_string()),
    ]
    .into_iter()
    .collect();

    let config = AuthConfig::from_lookup(|key| vars.get(key).cloned()).unwrap();
    assert_eq!(config.admin_group, "wheel");
    assert!(!config.authorization_enabled);
}

#[test]
fn test_invalid_environment_value_is_rejected() {
    let err = AuthConfig::from_lookup(|key| match key {
        "BROKER_AUTHZ_BIND_ADDR" => Some("not-an-address".to_string()),
        _ => None,
    })
    .unwrap_err();
    assert!(matches!(
        err,
        ConfigError::InvalidValue {
            key: "BROKER_AUTHZ_BIND_ADDR",
            ..
        }
    ));
}

#[tokio::test]
async fn test_manager_from_file_config() {
    let file = write_config(
        r#"{
            "admin_group": "operators",
            "users": [{ "name": "alice", "groups": ["operators"] }]
        }"#,
    );
    let config = AuthConfig::from_file(file.path()).unwrap();
    let manager = AuthManager::from_config(&config).await.unwrap();

    let alice = manager.authorization_handler(Principal::new("alice"));
    alice.handle_scope(ResourceAuthScope::ScopesUpdate).await.unwrap();

    // The default admin user is replaced by the file's user list
    let admin = manager.authorization_handler(Principal::new("admin"));
    assert!(admin
        .handle_scope(ResourceAuthScope::ScopesUpdate)
        .await
        .unwrap_err()
        .is_denial());
}
