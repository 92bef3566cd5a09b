//! External command execution
//!
//! Every call into git, docker, compose and systemctl goes through
//! [`CommandRunner`], so the deploy sequence can be driven against a recording
//! double in tests.

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::errors::DeployError;

/// How a command's output is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Collect stdout/stderr for parsing
    Capture,
    /// Stream straight to the operator's terminal
    Inherit,
}

/// A command to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmd {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub mode: OutputMode,
}

impl Cmd {
    /// A captured command
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
            mode: OutputMode::Capture,
        }
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Stream output to the terminal instead of capturing it
    pub fn inherit(mut self) -> Self {
        self.mode = OutputMode::Inherit;
        self
    }

    /// The command line as a list of words, program first
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv().join(" "))
    }
}

/// Result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CmdOutput {
    /// Exit code, `None` if terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CmdOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// First line of stdout, trimmed
    pub fn first_line(&self) -> &str {
        self.stdout.lines().next().unwrap_or("").trim()
    }

    /// Short description of a failure for error messages
    pub fn failure_reason(&self) -> String {
        let status = match self.code {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        };
        match self.stderr.trim() {
            "" => status,
            stderr => format!("{}: {}", status, stderr.lines().last().unwrap_or(stderr)),
        }
    }
}

/// Runs external commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion.
    ///
    /// `Err` means the command could not be started at all; a non-zero exit is
    /// reported through [`CmdOutput::code`].
    async fn run(&self, cmd: &Cmd) -> Result<CmdOutput, DeployError>;

    /// Run and require a zero exit status
    async fn run_checked(&self, cmd: &Cmd) -> Result<CmdOutput, DeployError> {
        let output = self.run(cmd).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(DeployError::CommandFailed {
                command: cmd.to_string(),
                reason: output.failure_reason(),
            })
        }
    }
}

/// Runs commands as child processes on the tokio runtime
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, cmd: &Cmd) -> Result<CmdOutput, DeployError> {
        debug!("Running: {}", cmd);

        let mut command = Command::new(&cmd.program);
        command.args(&cmd.args);
        if let Some(dir) = &cmd.cwd {
            command.current_dir(dir);
        }

        let spawn_error = |e: std::io::Error| DeployError::CommandFailed {
            command: cmd.to_string(),
            reason: format!("failed to start `{}`: {}", cmd.program, e),
        };

        match cmd.mode {
            OutputMode::Capture => {
                let output = command
                    .stdin(Stdio::null())
                    .output()
                    .await
                    .map_err(spawn_error)?;
                Ok(CmdOutput {
                    code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                })
            }
            OutputMode::Inherit => {
                let status = command
                    .stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit())
                    .status()
                    .await
                    .map_err(spawn_error)?;
                Ok(CmdOutput {
                    code: status.code(),
                    ..Default::default()
                })
            }
        }
    }
}
