//! Docker Compose invocation

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::deploy::runner::{Cmd, CommandRunner, CmdOutput};
use crate::errors::DeployError;

const PLUGIN_ARGS: &[&str] = &["compose"];
const NO_ARGS: &[&str] = &[];

/// Which compose implementation is installed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeCommand {
    /// `docker compose` (CLI plugin)
    Plugin,
    /// `docker-compose` (standalone binary)
    Standalone,
}

impl ComposeCommand {
    /// Program and leading arguments
    pub fn prefix(&self) -> (&'static str, &'static [&'static str]) {
        match self {
            ComposeCommand::Plugin => ("docker", PLUGIN_ARGS),
            ComposeCommand::Standalone => ("docker-compose", NO_ARGS),
        }
    }

    /// Build a compose command line against `manifest`
    pub fn command(&self, manifest: &Path, args: &[&str]) -> Cmd {
        let (program, lead) = self.prefix();
        let manifest = manifest.to_string_lossy().into_owned();
        let argv = lead
            .iter()
            .map(|s| s.to_string())
            .chain(["-f".to_string(), manifest])
            .chain(args.iter().map(|s| s.to_string()));
        Cmd::new(program, argv)
    }

    /// Prefer the plugin, fall back to the standalone binary
    pub async fn detect(runner: &dyn CommandRunner) -> Result<Self, DeployError> {
        for flavor in [ComposeCommand::Plugin, ComposeCommand::Standalone] {
            let (program, lead) = flavor.prefix();
            let cmd = Cmd::new(program, lead.iter().copied().chain(["version"]));
            if let Ok(output) = runner.run(&cmd).await {
                if output.success() {
                    debug!("Using compose via `{}`", cmd);
                    return Ok(flavor);
                }
            }
        }
        Err(DeployError::DependencyMissing(
            "docker compose (neither `docker compose` nor `docker-compose` works)".to_string(),
        ))
    }
}

/// Compose operations on the rendered manifest
#[derive(Clone)]
pub struct Compose {
    runner: Arc<dyn CommandRunner>,
    flavor: ComposeCommand,
    manifest: PathBuf,
    project_dir: PathBuf,
}

impl Compose {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        flavor: ComposeCommand,
        manifest: impl Into<PathBuf>,
        project_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            flavor,
            manifest: manifest.into(),
            project_dir: project_dir.into(),
        }
    }

    fn cmd(&self, args: &[&str]) -> Cmd {
        self.flavor
            .command(&self.manifest, args)
            .current_dir(&self.project_dir)
    }

    /// Start the service detached
    pub async fn up(&self) -> Result<(), DeployError> {
        info!("Starting service");
        self.runner.run_checked(&self.cmd(&["up", "-d"]).inherit()).await?;
        Ok(())
    }

    /// Stop and remove the service.
    ///
    /// Nothing running is not an error: a failing `down` is logged and
    /// reported as `false`.
    pub async fn down(&self) -> bool {
        info!("Stopping previous deployment");
        let cmd = self.cmd(&["down"]);
        match self.runner.run(&cmd).await {
            Ok(output) if output.success() => true,
            Ok(output) => {
                warn!("`{}` returned {}; assuming nothing was running", cmd, output.failure_reason());
                false
            }
            Err(e) => {
                warn!("`{}` could not run ({}); assuming nothing was running", cmd, e);
                false
            }
        }
    }

    /// Print service status to the terminal
    pub async fn ps(&self) -> Result<CmdOutput, DeployError> {
        self.runner.run_checked(&self.cmd(&["ps"]).inherit()).await
    }

    /// Follow service logs starting from the last `tail` lines
    pub async fn logs(&self, tail: u32) -> Result<CmdOutput, DeployError> {
        let tail = tail.to_string();
        self.runner
            .run_checked(&self.cmd(&["logs", "-f", "--tail", tail.as_str()]).inherit())
            .await
    }

    pub async fn restart(&self) -> Result<(), DeployError> {
        info!("Restarting service");
        self.runner.run_checked(&self.cmd(&["restart"]).inherit()).await?;
        Ok(())
    }

    /// Stop the service, failing if compose itself fails
    pub async fn stop(&self) -> Result<(), DeployError> {
        info!("Stopping service");
        self.runner.run_checked(&self.cmd(&["down"]).inherit()).await?;
        Ok(())
    }
}
