//! systemd registration tests

mod common;

use std::path::PathBuf;
use std::sync::Arc;

use common::{as_runner, RecordingRunner};
use dockhand::config::keys::{ConfigKey, DeploymentConfig};
use dockhand::config::store::ConfigStore;
use dockhand::deploy::compose::ComposeCommand;
use dockhand::deploy::runner::CmdOutput;
use dockhand::errors::DeployError;
use dockhand::installer::service::{is_elevated, ServiceRegistrar};
use dockhand::storage::layout::ProjectLayout;
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
    runner: Arc<RecordingRunner>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            runner: Arc::new(RecordingRunner::new()),
        }
    }

    fn layout(&self) -> ProjectLayout {
        ProjectLayout::new(self.dir.path())
    }

    fn unit_dir(&self) -> PathBuf {
        self.dir.path().join("systemd")
    }

    fn registrar(&self, elevated: bool) -> ServiceRegistrar {
        ServiceRegistrar::new(as_runner(&self.runner), self.unit_dir(), "dockhand-app", elevated)
    }

    fn store(&self) -> ConfigStore {
        ConfigStore::new(self.layout().config_file())
    }

    async fn configure(&self) {
        let config = DeploymentConfig::new().with(ConfigKey::DatabaseUrl, "postgres://db/app");
        self.store().save(&config).await.unwrap();
        std::fs::write(self.layout().manifest_file().path(), "services: {}\n").unwrap();
    }

    fn manifest(&self) -> PathBuf {
        self.layout().manifest_file().path().to_path_buf()
    }
}

#[tokio::test]
async fn test_install_writes_enables_and_reloads() {
    let fx = Fixture::new();
    fx.configure().await;

    let unit = fx
        .registrar(true)
        .install(&fx.store(), &fx.manifest(), ComposeCommand::Plugin)
        .await
        .unwrap();

    assert_eq!(unit, fx.unit_dir().join("dockhand-app.service"));
    let contents = std::fs::read_to_string(&unit).unwrap();
    assert!(contents.contains("Requires=docker.service"));
    assert!(contents.contains("WantedBy=multi-user.target"));
    assert!(contents.contains(&format!("WorkingDirectory={}", fx.dir.path().display())));
    let start = contents.lines().find(|l| l.starts_with("ExecStart=")).unwrap();
    assert!(start.ends_with(&format!("compose -f {} up -d", fx.manifest().display())));

    assert_eq!(
        fx.runner.calls(),
        vec![
            "systemctl daemon-reload".to_string(),
            "systemctl enable dockhand-app.service".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_install_standalone_compose() {
    let fx = Fixture::new();
    fx.configure().await;

    let unit = fx
        .registrar(true)
        .install(&fx.store(), &fx.manifest(), ComposeCommand::Standalone)
        .await
        .unwrap();

    let contents = std::fs::read_to_string(unit).unwrap();
    let stop = contents.lines().find(|l| l.starts_with("ExecStop=")).unwrap();
    assert!(stop.contains("docker-compose -f"));
    assert!(stop.ends_with(" down"));
}

#[tokio::test]
async fn test_install_requires_root() {
    let fx = Fixture::new();
    fx.configure().await;

    let result = fx
        .registrar(false)
        .install(&fx.store(), &fx.manifest(), ComposeCommand::Plugin)
        .await;

    assert!(matches!(result, Err(DeployError::PermissionDenied(_))));
    assert!(!fx.unit_dir().join("dockhand-app.service").exists());
    assert!(fx.runner.calls().is_empty());
}

#[tokio::test]
async fn test_install_requires_configuration() {
    let fx = Fixture::new();

    let result = fx
        .registrar(true)
        .install(&fx.store(), &fx.manifest(), ComposeCommand::Plugin)
        .await;

    assert!(matches!(result, Err(DeployError::NotConfigured(_))));
    assert!(!fx.unit_dir().exists());
    assert!(fx.runner.calls().is_empty());
}

#[tokio::test]
async fn test_install_requires_manifest() {
    let fx = Fixture::new();
    let config = DeploymentConfig::new().with(ConfigKey::DatabaseUrl, "postgres://db/app");
    fx.store().save(&config).await.unwrap();

    let result = fx
        .registrar(true)
        .install(&fx.store(), &fx.manifest(), ComposeCommand::Plugin)
        .await;
    assert!(matches!(result, Err(DeployError::NotConfigured(_))));
}

#[tokio::test]
async fn test_install_reports_systemctl_failure() {
    let fx = Fixture::new();
    fx.configure().await;
    fx.runner.respond(
        "systemctl enable",
        CmdOutput::failed(1, "Failed to enable unit: Access denied"),
    );

    let result = fx
        .registrar(true)
        .install(&fx.store(), &fx.manifest(), ComposeCommand::Plugin)
        .await;
    assert!(matches!(result, Err(DeployError::CommandFailed { .. })));
}

#[tokio::test]
async fn test_uninstall_missing_unit_is_noop() {
    let fx = Fixture::new();

    let removed = fx.registrar(true).uninstall().await.unwrap();
    assert!(!removed);
    assert!(fx.runner.calls().is_empty());
}

#[tokio::test]
async fn test_uninstall_stops_disables_and_deletes() {
    let fx = Fixture::new();
    fx.configure().await;
    let registrar = fx.registrar(true);
    let unit = registrar
        .install(&fx.store(), &fx.manifest(), ComposeCommand::Plugin)
        .await
        .unwrap();
    // The unit was never started, so stop fails; removal goes ahead anyway
    fx.runner.respond("systemctl stop", CmdOutput::failed(5, "Unit not loaded"));

    assert!(registrar.uninstall().await.unwrap());
    assert!(!unit.exists());

    let calls = fx.runner.calls();
    assert_eq!(
        calls[2..],
        [
            "systemctl stop dockhand-app.service",
            "systemctl disable dockhand-app.service",
            "systemctl daemon-reload",
        ]
    );
}

#[tokio::test]
async fn test_uninstall_requires_root() {
    let fx = Fixture::new();
    let result = fx.registrar(false).uninstall().await;
    assert!(matches!(result, Err(DeployError::PermissionDenied(_))));
}

#[tokio::test]
async fn test_elevation_follows_effective_uid() {
    let runner = RecordingRunner::new();
    runner.respond("id -u", CmdOutput::ok("0\n"));
    assert!(is_elevated(&runner).await);

    runner.respond("id -u", CmdOutput::ok("1000\n"));
    assert!(!is_elevated(&runner).await);

    runner.respond("id -u", CmdOutput::failed(1, "id: not found"));
    assert!(!is_elevated(&runner).await);
    assert_eq!(runner.calls(), vec!["id -u"; 3]);
}
