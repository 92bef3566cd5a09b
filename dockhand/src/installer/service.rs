//! systemd unit installation and removal

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::store::ConfigStore;
use crate::deploy::compose::ComposeCommand;
use crate::deploy::runner::{Cmd, CommandRunner};
use crate::errors::DeployError;
use crate::filesys::file::File;
use crate::utils::find_in_path;

/// Default location for locally installed unit files
pub const DEFAULT_UNIT_DIR: &str = "/etc/systemd/system";

/// Whether the current process runs as root, per `id -u`.
///
/// Any failure to ask counts as unprivileged.
pub async fn is_elevated(runner: &dyn CommandRunner) -> bool {
    match runner.run(&Cmd::new("id", ["-u"])).await {
        Ok(output) if output.success() => output.first_line() == "0",
        Ok(output) => {
            warn!("`id -u` returned {}", output.failure_reason());
            false
        }
        Err(e) => {
            warn!("Could not determine effective user: {}", e);
            false
        }
    }
}

/// Installs and removes the systemd unit that brings the service up at boot
pub struct ServiceRegistrar {
    runner: Arc<dyn CommandRunner>,
    unit_dir: PathBuf,
    unit_name: String,
    elevated: bool,
}

impl ServiceRegistrar {
    /// `unit_name` is the unit's base name without the `.service` suffix
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        unit_dir: impl Into<PathBuf>,
        unit_name: impl Into<String>,
        elevated: bool,
    ) -> Self {
        Self {
            runner,
            unit_dir: unit_dir.into(),
            unit_name: unit_name.into(),
            elevated,
        }
    }

    /// `<name>.service`
    pub fn unit_file_name(&self) -> String {
        format!("{}.service", self.unit_name)
    }

    pub fn unit_file(&self) -> File {
        File::new(self.unit_dir.join(self.unit_file_name()))
    }

    fn require_elevated(&self, action: &str) -> Result<(), DeployError> {
        if self.elevated {
            Ok(())
        } else {
            Err(DeployError::PermissionDenied(format!(
                "{} requires root; re-run with sudo",
                action
            )))
        }
    }

    /// Write the unit, reload systemd and enable the unit at boot
    pub async fn install(
        &self,
        store: &ConfigStore,
        manifest: &Path,
        compose: ComposeCommand,
    ) -> Result<PathBuf, DeployError> {
        self.require_elevated("install-service")?;
        store.load().await?.validate()?;
        if !File::new(manifest).exists().await {
            return Err(DeployError::NotConfigured(format!(
                "{} does not exist",
                manifest.display()
            )));
        }

        let working_dir = manifest.parent().unwrap_or_else(|| Path::new("/"));
        let contents = render_unit(&self.unit_name, working_dir, manifest, compose);

        let unit = self.unit_file();
        unit.write_atomic(contents.as_bytes()).await?;
        info!("Wrote unit file {}", unit.path().display());

        self.systemctl(&["daemon-reload"]).await?;
        let unit_name = self.unit_file_name();
        self.systemctl(&["enable", unit_name.as_str()]).await?;
        info!("Enabled {} at boot", unit_name);

        Ok(unit.path().to_path_buf())
    }

    /// Stop, disable and delete the unit. A missing unit is not an error.
    pub async fn uninstall(&self) -> Result<bool, DeployError> {
        self.require_elevated("remove-service")?;

        let unit = self.unit_file();
        if !unit.exists().await {
            info!("{} is not installed", self.unit_file_name());
            return Ok(false);
        }

        let unit_name = self.unit_file_name();
        for action in ["stop", "disable"] {
            if let Err(e) = self.systemctl(&[action, unit_name.as_str()]).await {
                warn!("systemctl {} {} failed: {}", action, unit_name, e);
            }
        }

        unit.delete().await?;
        self.systemctl(&["daemon-reload"]).await?;
        info!("Removed {}", unit.path().display());
        Ok(true)
    }

    async fn systemctl(&self, args: &[&str]) -> Result<(), DeployError> {
        let cmd = Cmd::new("systemctl", args.iter().copied());
        self.runner.run_checked(&cmd).await?;
        Ok(())
    }
}

/// Render the unit text
pub fn render_unit(name: &str, working_dir: &Path, manifest: &Path, compose: ComposeCommand) -> String {
    let exec = |args: &[&str]| {
        let cmd = compose.command(manifest, args);
        let program = find_in_path(&cmd.program)
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("/usr/bin/env {}", cmd.program));
        std::iter::once(program)
            .chain(cmd.args.iter().map(|arg| quote_arg(arg)))
            .collect::<Vec<_>>()
            .join(" ")
    };

    format!(
        "[Unit]
Description={name} (managed by dockhand)
Requires=docker.service
After=docker.service network-online.target
Wants=network-online.target

[Service]
Type=oneshot
RemainAfterExit=yes
WorkingDirectory={working_dir}
ExecStart={start}
ExecStop={stop}
ExecReload={pull}
ExecReload={start}
TimeoutStartSec=300

[Install]
WantedBy=multi-user.target
",
        name = name,
        working_dir = quote_arg(&working_dir.to_string_lossy()),
        start = exec(&["up", "-d"]),
        stop = exec(&["down"]),
        pull = exec(&["pull"]),
    )
}

fn quote_arg(arg: &str) -> String {
    if arg.chars().any(char::is_whitespace) {
        format!("\"{}\"", arg.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        arg.to_string()
    }
}
