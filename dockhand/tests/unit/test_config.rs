//! Configuration store tests

use std::os::unix::fs::PermissionsExt;

use dockhand::config::keys::{ConfigKey, DeploymentConfig};
use dockhand::config::store::ConfigStore;
use dockhand::errors::DeployError;
use dockhand::filesys::file::File;
use tempfile::TempDir;

fn store_in(dir: &TempDir) -> ConfigStore {
    ConfigStore::new(File::new(dir.path().join(".dockhand.env")))
}

fn full_config() -> DeploymentConfig {
    DeploymentConfig::new()
        .with(ConfigKey::DatabaseUrl, "postgres://app:p@ss w0rd@db.internal:5432/app?sslmode=require")
        .with(ConfigKey::SessionSecret, "Zq8xYb3KpR0tLmN5vWc7HsJd2FgA9eUi")
        .with(ConfigKey::Port, "8080")
        .with(ConfigKey::DataDir, "/srv/app/data")
        .with(ConfigKey::PublicUrl, "https://app.example.com/")
        .with(ConfigKey::SmtpPassword, "pa\"ss word#1")
        .with(ConfigKey::AdminEmail, "ops@example.com")
}

#[tokio::test]
async fn test_round_trip_preserves_values() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let config = full_config();

    store.save(&config).await.unwrap();
    let loaded = store.load().await.unwrap();

    assert_eq!(loaded, config);
    assert_eq!(
        loaded.get(ConfigKey::DatabaseUrl),
        "postgres://app:p@ss w0rd@db.internal:5432/app?sslmode=require"
    );
    assert_eq!(loaded.get(ConfigKey::SmtpPassword), "pa\"ss word#1");
}

#[tokio::test]
async fn test_file_lists_every_key_in_order() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    store.save(&full_config()).await.unwrap();

    let contents = std::fs::read_to_string(store.file().path()).unwrap();
    let keys: Vec<&str> = contents
        .lines()
        .filter(|l| !l.starts_with('#') && !l.is_empty())
        .filter_map(|l| l.split_once('=').map(|(k, _)| k))
        .collect();
    let expected: Vec<&str> = ConfigKey::ALL.iter().map(|k| k.as_str()).collect();
    assert_eq!(keys, expected);
    assert!(contents.contains("SMTP_HOST=''\n"));
}

#[tokio::test]
async fn test_saved_file_is_owner_only() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    store.save(&full_config()).await.unwrap();

    let mode = std::fs::metadata(store.file().path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[tokio::test]
async fn test_save_replaces_previous_file() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    store.save(&full_config()).await.unwrap();

    let smaller = DeploymentConfig::new().with(ConfigKey::DatabaseUrl, "postgres://other");
    store.save(&smaller).await.unwrap();

    let loaded = store.load().await.unwrap();
    assert_eq!(loaded.get(ConfigKey::DatabaseUrl), "postgres://other");
    assert_eq!(loaded.get(ConfigKey::AdminEmail), "");
    assert_eq!(loaded.get(ConfigKey::Port), "");
}

#[tokio::test]
async fn test_save_without_database_url_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let config = DeploymentConfig::new().with(ConfigKey::Port, "3000");

    let result = store.save(&config).await;
    assert!(matches!(result, Err(DeployError::MissingRequiredField(ref k)) if k == "DATABASE_URL"));
    assert!(!store.is_configured().await);
}

#[tokio::test]
async fn test_load_missing_file() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    assert!(matches!(store.load().await, Err(DeployError::NotConfigured(_))));
    assert_eq!(store.load_or_empty().await.unwrap(), DeploymentConfig::new());
}

#[tokio::test]
async fn test_get_or_default() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    // Absent file
    assert_eq!(store.get_or_default(ConfigKey::Port, "3000").await.unwrap(), "3000");

    store.save(&full_config()).await.unwrap();
    assert_eq!(store.get_or_default(ConfigKey::Port, "3000").await.unwrap(), "8080");
    // Stored but empty
    assert_eq!(
        store.get_or_default(ConfigKey::SmtpHost, "localhost").await.unwrap(),
        "localhost"
    );
}

#[tokio::test]
async fn test_load_hand_edited_file() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    std::fs::write(
        store.file().path(),
        "# edited by hand\n\
         export DATABASE_URL=\"postgres://db/app\"\n\
         PORT = 4000\n\
         UNKNOWN_KEY='ignored'\n\
         not a key value line\n\
         \n\
         PUBLIC_URL='https://a.example.com/?x=1'\n",
    )
    .unwrap();

    let loaded = store.load().await.unwrap();
    assert_eq!(loaded.get(ConfigKey::DatabaseUrl), "postgres://db/app");
    assert_eq!(loaded.get(ConfigKey::Port), "4000");
    assert_eq!(loaded.get(ConfigKey::PublicUrl), "https://a.example.com/?x=1");
    assert_eq!(loaded.non_empty().count(), 3);
}
