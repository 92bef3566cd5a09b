//! Deploy executor: sync, build, replace the container, clean up

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::keys::{ConfigKey, DeploymentConfig};
use crate::deploy::compose::{Compose, ComposeCommand};
use crate::deploy::docker::{short_id, Docker, ImageInspector};
use crate::deploy::fsm::{DeployEvent, DeployFsm, DeployPhase, FsmSettings};
use crate::deploy::git::{SourceSyncer, SyncOutcome};
use crate::deploy::manifest::{render, write_manifest, ManifestChange, ServiceSpec};
use crate::deploy::runner::CommandRunner;
use crate::errors::DeployError;
use crate::storage::layout::ProjectLayout;

/// Which flavor of deploy to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployMode {
    /// Full deploy; renders the manifest only if it is missing
    Deploy,
    /// Update; always re-renders the manifest after syncing
    QuickUpdate,
}

/// What a finished run did
#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    pub mode: DeployMode,
    pub old_revision: String,
    pub new_revision: String,
    /// Image id tagged before the build, if any
    pub old_image: Option<String>,
    /// Image id tagged after the build
    pub new_image: Option<String>,
    pub old_image_removed: bool,
    pub manifest_change: Option<ManifestChange>,
    pub logs_purged: bool,
    pub phases: Vec<DeployPhase>,
}

/// Runs one deploy or update, phase by phase.
///
/// No phase is retried. A failing fatal phase ends the run, so a broken build
/// never touches the running service.
pub struct ContainerDeployer {
    layout: ProjectLayout,
    spec: ServiceSpec,
    settings: FsmSettings,
    syncer: SourceSyncer,
    docker: Docker,
    images: Arc<dyn ImageInspector>,
    compose: Compose,
}

impl ContainerDeployer {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        compose: ComposeCommand,
        layout: ProjectLayout,
        spec: ServiceSpec,
        settings: FsmSettings,
    ) -> Self {
        let docker = Docker::new(runner.clone());
        let compose = Compose::new(
            runner.clone(),
            compose,
            layout.manifest_file().path(),
            layout.root.clone(),
        );
        Self {
            syncer: SourceSyncer::new(runner),
            images: Arc::new(docker.clone()),
            docker,
            compose,
            layout,
            spec,
            settings,
        }
    }

    /// Run every phase against `config`
    pub async fn run(
        &self,
        config: &DeploymentConfig,
        mode: DeployMode,
    ) -> Result<DeployReport, DeployError> {
        info!("Starting {:?} of {}", mode, self.spec.image);
        let mut fsm = DeployFsm::new();
        fsm.process(DeployEvent::Start)?;

        let sync = phase(&mut fsm, self.syncer.sync(&self.layout.root)).await?;
        let manifest_change = self.refresh_manifest(config, mode).await?;

        let old_image = phase(&mut fsm, self.images.image_id(&self.spec.image)).await?;
        match &old_image {
            Some(id) => info!("Current image: {}", short_id(id)),
            None => info!("No previous image for {}", self.spec.image),
        }

        phase(&mut fsm, self.docker.build(&self.spec.image, &self.layout.root)).await?;

        phase(&mut fsm, async { Ok(self.compose.down().await) }).await?;

        let logs_purged = phase(&mut fsm, async { Ok(self.purge_logs(config).await) }).await?;

        phase(&mut fsm, self.compose.up()).await?;

        let (new_image, old_image_removed) =
            phase(&mut fsm, self.prune_images(old_image.as_deref())).await?;

        phase(&mut fsm, async {
            self.verify().await;
            Ok(())
        })
        .await?;

        info!("{:?} finished at revision {}", mode, sync.new_revision);
        let SyncOutcome {
            old_revision,
            new_revision,
            ..
        } = sync;
        Ok(DeployReport {
            mode,
            old_revision,
            new_revision,
            old_image,
            new_image,
            old_image_removed,
            manifest_change,
            logs_purged,
            phases: fsm.completed().to_vec(),
        })
    }

    async fn refresh_manifest(
        &self,
        config: &DeploymentConfig,
        mode: DeployMode,
    ) -> Result<Option<ManifestChange>, DeployError> {
        let file = self.layout.manifest_file();
        if mode == DeployMode::Deploy && file.exists().await {
            debug!("Using existing manifest {}", file.path().display());
            return Ok(None);
        }
        let manifest = render(config, &self.layout, &self.spec, Utc::now());
        Ok(Some(write_manifest(&file, &manifest).await?))
    }

    async fn purge_logs(&self, config: &DeploymentConfig) -> bool {
        let data_dir = config.get_or_key_default(ConfigKey::DataDir);
        let Some(logs) = self.layout.purgeable_logs_dir(data_dir) else {
            warn!(
                "Not clearing {}: it sits directly under the filesystem root",
                self.layout.logs_dir(data_dir).path().display()
            );
            return false;
        };
        match logs.clear_contents().await {
            Ok(removed) => {
                debug!("Removed {} entries from {}", removed, logs.path().display());
                true
            }
            Err(e) => {
                warn!("Could not clear logs in {}: {}", logs.path().display(), e);
                false
            }
        }
    }

    /// Remove the superseded image unless the build produced the same one, then
    /// prune dangling layers.
    async fn prune_images(
        &self,
        old_image: Option<&str>,
    ) -> Result<(Option<String>, bool), DeployError> {
        let new_image = match self.images.image_id(&self.spec.image).await {
            Ok(id) => id,
            Err(e) => {
                warn!("Could not inspect new image: {}", e);
                None
            }
        };

        let removed = match (old_image, new_image.as_deref()) {
            (Some(old), Some(new)) if old == new => {
                info!("Image unchanged ({}); keeping it", short_id(old));
                false
            }
            (Some(old), Some(_)) if !old.is_empty() => self.docker.remove_image(old).await,
            (Some(old), None) => {
                warn!("New image id unknown; keeping {}", short_id(old));
                false
            }
            _ => false,
        };

        self.docker.prune_dangling().await;
        Ok((new_image, removed))
    }

    async fn verify(&self) {
        if !self.settings.settle_delay.is_zero() {
            info!(
                "Waiting {}s for the service to settle",
                self.settings.settle_delay.as_secs()
            );
            tokio::time::sleep(self.settings.settle_delay).await;
        }
        if let Err(e) = self.compose.ps().await {
            warn!("Could not read service status: {}", e);
        }
    }
}

/// Drive one phase and record its outcome on the FSM
async fn phase<T, F>(fsm: &mut DeployFsm, work: F) -> Result<T, DeployError>
where
    F: Future<Output = Result<T, DeployError>>,
{
    let current = fsm.phase();
    debug!("Phase: {}", current);
    match work.await {
        Ok(value) => {
            fsm.process(DeployEvent::PhaseDone)?;
            Ok(value)
        }
        Err(e) => {
            error!("Phase '{}' failed: {}", current, e);
            fsm.process(DeployEvent::PhaseFailed(e.to_string()))?;
            Err(e)
        }
    }
}
