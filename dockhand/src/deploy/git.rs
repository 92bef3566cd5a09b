//! Source synchronization with git

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::deploy::runner::{Cmd, CommandRunner};
use crate::errors::DeployError;

/// Typed access to revision information of a work tree
#[async_trait]
pub trait RevisionReader: Send + Sync {
    /// Fail unless `dir` is inside a git work tree
    async fn ensure_work_tree(&self, dir: &Path) -> Result<(), DeployError>;

    /// Short identifier of the checked-out commit
    async fn current_revision(&self, dir: &Path) -> Result<String, DeployError>;

    /// Remote-tracking ref the current branch follows, e.g. `origin/main`
    async fn tracking_branch(&self, dir: &Path) -> Result<String, DeployError>;
}

/// [`RevisionReader`] backed by the git CLI
#[derive(Clone)]
pub struct GitRevisions {
    runner: Arc<dyn CommandRunner>,
}

impl GitRevisions {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    async fn rev_parse(&self, dir: &Path, args: &[&str]) -> Result<Option<String>, DeployError> {
        let cmd = Cmd::new("git", std::iter::once("rev-parse").chain(args.iter().copied()))
            .current_dir(dir);
        let output = self.runner.run(&cmd).await.map_err(sync_failure)?;
        if !output.success() {
            return Ok(None);
        }
        Ok(Some(output.first_line().to_string()).filter(|s| !s.is_empty()))
    }
}

#[async_trait]
impl RevisionReader for GitRevisions {
    async fn ensure_work_tree(&self, dir: &Path) -> Result<(), DeployError> {
        match self.rev_parse(dir, &["--is-inside-work-tree"]).await? {
            Some(answer) if answer == "true" => Ok(()),
            _ => Err(DeployError::SyncFailure(format!(
                "{} is not a git repository",
                dir.display()
            ))),
        }
    }

    async fn current_revision(&self, dir: &Path) -> Result<String, DeployError> {
        self.rev_parse(dir, &["--short", "HEAD"])
            .await?
            .ok_or_else(|| DeployError::SyncFailure("unable to resolve HEAD".to_string()))
    }

    async fn tracking_branch(&self, dir: &Path) -> Result<String, DeployError> {
        if let Some(upstream) = self
            .rev_parse(dir, &["--abbrev-ref", "--symbolic-full-name", "@{u}"])
            .await?
        {
            return Ok(upstream);
        }

        let branch = self
            .rev_parse(dir, &["--abbrev-ref", "HEAD"])
            .await?
            .filter(|b| b != "HEAD")
            .ok_or_else(|| {
                DeployError::SyncFailure("HEAD is detached; check out a branch first".to_string())
            })?;
        debug!("Branch {} has no upstream, assuming origin/{}", branch, branch);
        Ok(format!("origin/{}", branch))
    }
}

/// Revisions before and after a sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub upstream: String,
    pub old_revision: String,
    pub new_revision: String,
}

impl SyncOutcome {
    pub fn changed(&self) -> bool {
        self.old_revision != self.new_revision
    }
}

/// Brings the work tree to the exact tip of its remote tracking branch.
///
/// Local modifications and local commits are discarded.
#[derive(Clone)]
pub struct SourceSyncer {
    runner: Arc<dyn CommandRunner>,
    revisions: Arc<dyn RevisionReader>,
}

impl SourceSyncer {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        let revisions = Arc::new(GitRevisions::new(runner.clone()));
        Self { runner, revisions }
    }

    /// Fetch everything and hard-reset to the tracking branch
    pub async fn sync(&self, working_dir: &Path) -> Result<SyncOutcome, DeployError> {
        self.revisions.ensure_work_tree(working_dir).await?;

        let upstream = self.revisions.tracking_branch(working_dir).await?;
        let old_revision = self.revisions.current_revision(working_dir).await?;
        info!("Syncing source to {} (currently at {})", upstream, old_revision);

        let fetch = Cmd::new("git", ["fetch", "--all", "--prune"]).current_dir(working_dir);
        self.runner.run_checked(&fetch).await.map_err(sync_failure)?;

        let reset = Cmd::new("git", ["reset", "--hard", upstream.as_str()]).current_dir(working_dir);
        self.runner.run_checked(&reset).await.map_err(sync_failure)?;

        let new_revision = self.revisions.current_revision(working_dir).await?;
        let outcome = SyncOutcome {
            upstream,
            old_revision,
            new_revision,
        };

        if outcome.changed() {
            info!(
                "Source updated: {} -> {}",
                outcome.old_revision, outcome.new_revision
            );
        } else {
            info!("Source already at {}", outcome.new_revision);
        }
        Ok(outcome)
    }
}

fn sync_failure(err: DeployError) -> DeployError {
    match err {
        DeployError::SyncFailure(_) => err,
        other => DeployError::SyncFailure(other.to_string()),
    }
}
