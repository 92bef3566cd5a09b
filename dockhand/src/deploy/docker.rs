//! Docker image operations

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::deploy::runner::{Cmd, CommandRunner};
use crate::errors::DeployError;

/// Typed lookup of local image identifiers
#[async_trait]
pub trait ImageInspector: Send + Sync {
    /// Image id for `tag`, or `None` if no such local image exists
    async fn image_id(&self, tag: &str) -> Result<Option<String>, DeployError>;
}

/// Docker CLI wrapper for building and cleaning up the service image
#[derive(Clone)]
pub struct Docker {
    runner: Arc<dyn CommandRunner>,
}

impl Docker {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Build `context_dir` into `tag`, streaming build output to the terminal
    pub async fn build(&self, tag: &str, context_dir: &Path) -> Result<(), DeployError> {
        info!("Building image {}", tag);
        let context = context_dir.to_string_lossy();
        let cmd = Cmd::new("docker", ["build", "-t", tag, context.as_ref()])
            .current_dir(context_dir)
            .inherit();

        let output = self
            .runner
            .run(&cmd)
            .await
            .map_err(|e| DeployError::BuildFailure(e.to_string()))?;
        if !output.success() {
            return Err(DeployError::BuildFailure(format!(
                "`{}` returned {}",
                cmd,
                output.failure_reason()
            )));
        }
        Ok(())
    }

    /// Remove an image by id. Best effort: failure is logged and reported as `false`.
    pub async fn remove_image(&self, image_id: &str) -> bool {
        let cmd = Cmd::new("docker", ["rmi", image_id]);
        match self.runner.run(&cmd).await {
            Ok(output) if output.success() => {
                info!("Removed previous image {}", short_id(image_id));
                true
            }
            Ok(output) => {
                warn!(
                    "Could not remove previous image {} ({}); it may still be in use",
                    short_id(image_id),
                    output.failure_reason()
                );
                false
            }
            Err(e) => {
                warn!("Could not remove previous image {}: {}", short_id(image_id), e);
                false
            }
        }
    }

    /// Prune dangling images. Best effort.
    pub async fn prune_dangling(&self) -> bool {
        let cmd = Cmd::new("docker", ["image", "prune", "-f"]);
        match self.runner.run(&cmd).await {
            Ok(output) if output.success() => {
                debug!("Pruned dangling images");
                true
            }
            Ok(output) => {
                warn!("Dangling image prune failed: {}", output.failure_reason());
                false
            }
            Err(e) => {
                warn!("Dangling image prune failed: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl ImageInspector for Docker {
    async fn image_id(&self, tag: &str) -> Result<Option<String>, DeployError> {
        let cmd = Cmd::new("docker", ["image", "inspect", "--format", "{{.Id}}", tag]);
        let output = self.runner.run(&cmd).await?;
        if !output.success() {
            // `docker image inspect` exits non-zero when the image does not exist
            debug!("No local image for {}", tag);
            return Ok(None);
        }
        Ok(Some(output.first_line().to_string()).filter(|id| !id.is_empty()))
    }
}

/// `sha256:0123456789ab...` -> `0123456789ab`
pub fn short_id(image_id: &str) -> &str {
    let id = image_id.strip_prefix("sha256:").unwrap_or(image_id);
    &id[..id.len().min(12)]
}
