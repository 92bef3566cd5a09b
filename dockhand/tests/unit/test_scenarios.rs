//! End-to-end operator scenarios with recorded commands and scripted answers

mod common;

use std::os::unix::fs::PermissionsExt;
use std::sync::Arc;

use common::{as_runner, test_options, RecordingRunner, ScriptedPrompter};
use dockhand::app::lock::OperationLock;
use dockhand::app::run::{App, Command};
use dockhand::config::keys::ConfigKey;
use dockhand::config::store::ConfigStore;
use dockhand::deploy::compose::ComposeCommand;
use dockhand::errors::DeployError;
use dockhand::filesys::file::File;
use serde_yaml_ng::Value;
use tempfile::TempDir;

fn app(dir: &TempDir, runner: &Arc<RecordingRunner>, prompter: ScriptedPrompter, elevated: bool) -> App {
    App::new(
        test_options(dir.path()),
        as_runner(runner),
        Arc::new(prompter),
        ComposeCommand::Plugin,
        elevated,
    )
}

fn manifest_env(dir: &TempDir) -> Vec<String> {
    let text = std::fs::read_to_string(dir.path().join("docker-compose.yml")).unwrap();
    let doc: Value = serde_yaml_ng::from_str(&text).unwrap();
    doc["services"]["app"]["environment"]
        .as_sequence()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_first_deploy_rejects_blank_database_url() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(RecordingRunner::healthy());
    let app = app(&dir, &runner, ScriptedPrompter::new(&["   "]), false);

    let result = app.execute(Command::Deploy).await;

    assert!(matches!(result, Err(DeployError::MissingRequiredField(ref k)) if k == "DATABASE_URL"));
    assert!(!dir.path().join(".dockhand.env").exists());
    assert!(!dir.path().join("docker-compose.yml").exists());
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_first_deploy_configures_then_deploys() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(RecordingRunner::healthy());
    let prompter = ScriptedPrompter::new(&["postgres://app:pw@db:5432/app"]);
    let app = app(&dir, &runner, prompter, false);

    let report = app.deploy().await.unwrap();
    assert_eq!(report.new_revision, "def5678");

    let config_path = dir.path().join(".dockhand.env");
    let mode = std::fs::metadata(&config_path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);

    let config = ConfigStore::new(app.options().layout.config_file()).load().await.unwrap();
    let secret = config.get(ConfigKey::SessionSecret);
    assert_eq!(secret.len(), 32);
    assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));

    let keys: Vec<String> = manifest_env(&dir)
        .iter()
        .map(|e| e.split_once('=').unwrap().0.to_string())
        .collect();
    assert_eq!(keys, ["DATABASE_URL", "SESSION_SECRET", "PORT", "DATA_DIR", "LOG_LEVEL"]);
    assert!(runner.ran("docker build"));
}

#[tokio::test]
async fn test_reconfigure_keeps_session_secret() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(RecordingRunner::new());

    app(&dir, &runner, ScriptedPrompter::new(&["postgres://db/app"]), false)
        .execute(Command::Config)
        .await
        .unwrap();
    let store = ConfigStore::new(File::new(dir.path().join(".dockhand.env")));
    let first = store.load().await.unwrap();

    // Accept every default, but change the port
    let answers = ["", "", "9000"];
    app(&dir, &runner, ScriptedPrompter::new(&answers), false)
        .execute(Command::Config)
        .await
        .unwrap();
    let second = store.load().await.unwrap();

    assert_eq!(second.get(ConfigKey::SessionSecret), first.get(ConfigKey::SessionSecret));
    assert_eq!(second.get(ConfigKey::DatabaseUrl), "postgres://db/app");
    assert_eq!(second.get(ConfigKey::Port), "9000");
    assert!(manifest_env(&dir).contains(&"PORT=9000".to_string()));
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_dash_clears_optional_value() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(RecordingRunner::new());

    let mut answers = vec!["postgres://db/app", "", "", "", "https://old.example.com"];
    app(&dir, &runner, ScriptedPrompter::new(&answers), false)
        .execute(Command::Config)
        .await
        .unwrap();

    answers[4] = "-";
    app(&dir, &runner, ScriptedPrompter::new(&answers), false)
        .execute(Command::Config)
        .await
        .unwrap();

    let store = ConfigStore::new(File::new(dir.path().join(".dockhand.env")));
    assert_eq!(store.load().await.unwrap().get(ConfigKey::PublicUrl), "");
    assert!(!manifest_env(&dir).iter().any(|e| e.starts_with("PUBLIC_URL=")));
}

#[tokio::test]
async fn test_update_without_configuration() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(RecordingRunner::healthy());
    let prompter = ScriptedPrompter::new(&[]);
    let app = app(&dir, &runner, prompter, false);

    let result = app.execute(Command::Update).await;

    assert!(matches!(result, Err(DeployError::NotConfigured(_))));
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_update_rerenders_manifest_from_config() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(RecordingRunner::healthy());
    app(&dir, &runner, ScriptedPrompter::new(&["postgres://db/app"]), false)
        .execute(Command::Config)
        .await
        .unwrap();
    std::fs::write(dir.path().join("docker-compose.yml"), "services: {}\n").unwrap();

    app(&dir, &runner, ScriptedPrompter::new(&[]), false)
        .execute(Command::Update)
        .await
        .unwrap();

    assert!(manifest_env(&dir).contains(&"DATABASE_URL=postgres://db/app".to_string()));
    assert!(runner.ran(" up -d"));
}

#[tokio::test]
async fn test_lifecycle_commands_need_a_manifest() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(RecordingRunner::new());
    let app = app(&dir, &runner, ScriptedPrompter::new(&[]), false);

    for command in [Command::Status, Command::Logs(None), Command::Restart, Command::Stop] {
        let result = app.execute(command).await;
        assert!(matches!(result, Err(DeployError::NotConfigured(_))), "{:?}", command);
    }
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_lifecycle_commands_drive_compose() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(RecordingRunner::new());
    std::fs::write(dir.path().join("docker-compose.yml"), "services: {}\n").unwrap();
    let app = app(&dir, &runner, ScriptedPrompter::new(&[]), false);

    app.execute(Command::Status).await.unwrap();
    app.execute(Command::Logs(None)).await.unwrap();
    app.execute(Command::Logs(Some(20))).await.unwrap();
    app.execute(Command::Restart).await.unwrap();
    app.execute(Command::Stop).await.unwrap();

    let tails: Vec<String> = runner
        .calls()
        .into_iter()
        .map(|c| c.split_once(" -f ").unwrap().1.to_string())
        .collect();
    let manifest = dir.path().join("docker-compose.yml");
    let expected: Vec<String> = [
        "ps",
        "logs -f --tail 100",
        "logs -f --tail 20",
        "restart",
        "down",
    ]
    .iter()
    .map(|args| format!("{} {}", manifest.display(), args))
    .collect();
    assert_eq!(tails, expected);
}

#[tokio::test]
async fn test_install_service_without_root() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(RecordingRunner::new());
    let app = app(&dir, &runner, ScriptedPrompter::new(&["postgres://db/app"]), false);
    app.execute(Command::Config).await.unwrap();

    let result = app.execute(Command::InstallService).await;

    assert!(matches!(result, Err(DeployError::PermissionDenied(_))));
    assert!(!dir.path().join("systemd").join("dockhand-app.service").exists());
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_install_and_remove_service_as_root() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(RecordingRunner::new());
    let app = app(&dir, &runner, ScriptedPrompter::new(&["postgres://db/app"]), true);
    app.execute(Command::Config).await.unwrap();

    app.execute(Command::InstallService).await.unwrap();
    let unit = dir.path().join("systemd").join("dockhand-app.service");
    assert!(unit.exists());

    app.execute(Command::RemoveService).await.unwrap();
    assert!(!unit.exists());
    // Removing again is a no-op
    app.execute(Command::RemoveService).await.unwrap();
}

#[tokio::test]
async fn test_concurrent_mutation_is_refused() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(RecordingRunner::healthy());
    let app = app(&dir, &runner, ScriptedPrompter::new(&[]), false);

    let _held = OperationLock::acquire(&app.options().layout.lock_path()).unwrap();
    let result = app.execute(Command::Update).await;

    assert!(matches!(result, Err(DeployError::Busy(_))));
    assert!(runner.calls().is_empty());
}

#[test]
fn test_read_only_commands_skip_the_lock() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(RecordingRunner::new());
    std::fs::write(dir.path().join("docker-compose.yml"), "services: {}\n").unwrap();
    let app = app(&dir, &runner, ScriptedPrompter::new(&[]), false);

    let _held = OperationLock::acquire(&app.options().layout.lock_path()).unwrap();
    tokio_test::block_on(app.execute(Command::Status)).unwrap();
    assert_eq!(runner.calls().len(), 1);
}
