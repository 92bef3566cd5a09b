//! Startup dependency checks

use tracing::debug;

use crate::deploy::compose::ComposeCommand;
use crate::deploy::runner::{Cmd, CommandRunner};
use crate::errors::DeployError;

/// Require git, docker and a compose implementation.
///
/// Returns the compose flavor to use.
pub async fn check_dependencies(runner: &dyn CommandRunner) -> Result<ComposeCommand, DeployError> {
    for program in ["git", "docker"] {
        let cmd = Cmd::new(program, ["--version"]);
        match runner.run(&cmd).await {
            Ok(output) if output.success() => {
                debug!("{}: {}", program, output.first_line());
            }
            Ok(output) => {
                return Err(DeployError::DependencyMissing(format!(
                    "`{}` is installed but not working ({})",
                    cmd,
                    output.failure_reason()
                )));
            }
            Err(_) => {
                return Err(DeployError::DependencyMissing(format!(
                    "`{}` was not found on PATH",
                    program
                )));
            }
        }
    }

    ComposeCommand::detect(runner).await
}
