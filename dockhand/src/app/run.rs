//! Command dispatch

use std::sync::Arc;

use tracing::{info, warn};

use crate::app::configure::configure;
use crate::app::lock::OperationLock;
use crate::app::options::AppOptions;
use crate::app::output;
use crate::app::preflight::check_dependencies;
use crate::app::prompt::Prompter;
use crate::config::keys::DeploymentConfig;
use crate::config::store::ConfigStore;
use crate::deploy::compose::{Compose, ComposeCommand};
use crate::deploy::executor::{ContainerDeployer, DeployMode, DeployReport};
use crate::deploy::runner::CommandRunner;
use crate::errors::DeployError;
use crate::installer::service::ServiceRegistrar;

/// An operator command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Config,
    Deploy,
    Update,
    Status,
    /// Follow logs, optionally overriding the number of history lines
    Logs(Option<u32>),
    Restart,
    Stop,
    InstallService,
    RemoveService,
}

impl Command {
    /// Commands that change files or containers and therefore take the lock
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Command::Status | Command::Logs(_))
    }
}

/// Application: options plus the collaborators every command needs
pub struct App {
    options: AppOptions,
    runner: Arc<dyn CommandRunner>,
    prompter: Arc<dyn Prompter>,
    compose: ComposeCommand,
    elevated: bool,
}

impl App {
    /// Verify external dependencies, then build the app
    pub async fn start(
        options: AppOptions,
        runner: Arc<dyn CommandRunner>,
        prompter: Arc<dyn Prompter>,
        elevated: bool,
    ) -> Result<Self, DeployError> {
        let compose = check_dependencies(runner.as_ref()).await?;
        Ok(Self::new(options, runner, prompter, compose, elevated))
    }

    /// Build the app with an already known compose flavor
    pub fn new(
        options: AppOptions,
        runner: Arc<dyn CommandRunner>,
        prompter: Arc<dyn Prompter>,
        compose: ComposeCommand,
        elevated: bool,
    ) -> Self {
        Self {
            options,
            runner,
            prompter,
            compose,
            elevated,
        }
    }

    pub fn options(&self) -> &AppOptions {
        &self.options
    }

    pub fn prompter(&self) -> &dyn Prompter {
        self.prompter.as_ref()
    }

    pub fn store(&self) -> ConfigStore {
        ConfigStore::new(self.options.layout.config_file())
    }

    /// Run one command to completion
    pub async fn execute(&self, command: Command) -> Result<(), DeployError> {
        let _lock = if command.is_mutating() {
            Some(OperationLock::acquire(&self.options.layout.lock_path())?)
        } else {
            None
        };

        match command {
            Command::Config => self.configure().await.map(|_| ()),
            Command::Deploy => self.deploy().await.map(|_| ()),
            Command::Update => self.update().await.map(|_| ()),
            Command::Status => self.status().await,
            Command::Logs(lines) => self.logs(lines).await,
            Command::Restart => self.restart().await,
            Command::Stop => self.stop().await,
            Command::InstallService => self.install_service().await,
            Command::RemoveService => self.remove_service().await,
        }
    }

    async fn configure(&self) -> Result<DeploymentConfig, DeployError> {
        output::heading("Deployment configuration");
        let (config, change) = configure(
            &self.store(),
            self.prompter.as_ref(),
            &self.options.layout,
            &self.options.service,
        )
        .await?;
        output::success(&format!(
            "Saved {} and {} ({:?})",
            self.options.layout.config_file().path().display(),
            self.options.layout.manifest_file().path().display(),
            change
        ));
        Ok(config)
    }

    /// Full deploy; runs the configuration pass first if nothing is configured
    pub async fn deploy(&self) -> Result<DeployReport, DeployError> {
        let store = self.store();
        let config = match store.load().await {
            Ok(config) => config,
            Err(DeployError::NotConfigured(reason)) => {
                output::notice(&format!("No configuration yet ({}); configuring first", reason));
                self.configure().await?
            }
            Err(e) => return Err(e),
        };
        self.run_deploy(&config, DeployMode::Deploy).await
    }

    /// Update in place; requires an existing configuration
    pub async fn update(&self) -> Result<DeployReport, DeployError> {
        let config = self.store().load().await?;
        self.run_deploy(&config, DeployMode::QuickUpdate).await
    }

    async fn run_deploy(
        &self,
        config: &DeploymentConfig,
        mode: DeployMode,
    ) -> Result<DeployReport, DeployError> {
        config.validate()?;
        output::heading(match mode {
            DeployMode::Deploy => "Deploying",
            DeployMode::QuickUpdate => "Updating",
        });

        let deployer = ContainerDeployer::new(
            self.runner.clone(),
            self.compose,
            self.options.layout.clone(),
            self.options.service.clone(),
            self.options.fsm_settings.clone(),
        );
        let report = deployer.run(config, mode).await?;
        output::report(&report);
        output::success("Deployment finished");
        Ok(report)
    }

    /// Compose handle for the rendered manifest; requires one to exist
    async fn compose(&self) -> Result<Compose, DeployError> {
        let manifest = self.options.layout.manifest_file();
        if !manifest.exists().await {
            return Err(DeployError::NotConfigured(format!(
                "{} does not exist",
                manifest.path().display()
            )));
        }
        Ok(Compose::new(
            self.runner.clone(),
            self.compose,
            manifest.path(),
            self.options.layout.root.clone(),
        ))
    }

    async fn status(&self) -> Result<(), DeployError> {
        self.compose().await?.ps().await?;
        Ok(())
    }

    async fn logs(&self, lines: Option<u32>) -> Result<(), DeployError> {
        let tail = lines.unwrap_or(self.options.default_log_tail);
        self.compose().await?.logs(tail).await?;
        Ok(())
    }

    async fn restart(&self) -> Result<(), DeployError> {
        self.compose().await?.restart().await?;
        output::success("Service restarted");
        Ok(())
    }

    async fn stop(&self) -> Result<(), DeployError> {
        self.compose().await?.stop().await?;
        output::success("Service stopped");
        Ok(())
    }

    fn registrar(&self) -> ServiceRegistrar {
        ServiceRegistrar::new(
            self.runner.clone(),
            self.options.unit.dir.clone(),
            self.options.unit.name.clone(),
            self.elevated,
        )
    }

    async fn install_service(&self) -> Result<(), DeployError> {
        let registrar = self.registrar();
        let manifest = self.options.layout.manifest_file();
        let unit = registrar
            .install(&self.store(), manifest.path(), self.compose)
            .await?;
        info!("Service unit installed at {}", unit.display());
        output::success(&format!(
            "Installed {}; the service now starts at boot",
            registrar.unit_file_name()
        ));
        Ok(())
    }

    async fn remove_service(&self) -> Result<(), DeployError> {
        let registrar = self.registrar();
        if registrar.uninstall().await? {
            output::success(&format!("Removed {}", registrar.unit_file_name()));
        } else {
            warn!("Nothing to remove");
            output::notice(&format!("{} was not installed", registrar.unit_file_name()));
        }
        Ok(())
    }
}
