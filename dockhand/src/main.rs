//! dockhand - Entry Point
//!
//! Interactive deployment orchestrator for a single containerized service.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use tracing::error;

use dockhand::app::menu::run_menu;
use dockhand::app::options::AppOptions;
use dockhand::app::output;
use dockhand::app::prompt::TerminalPrompter;
use dockhand::app::run::{App, Command};
use dockhand::deploy::runner::ProcessRunner;
use dockhand::installer::service::is_elevated;
use dockhand::logs::{init_logging, LogLevel, LogOptions};
use dockhand::storage::layout::ProjectLayout;
use dockhand::utils::version_info;

/// Deploy and manage a containerized service on this host
#[derive(Parser, Debug)]
#[command(name = "dockhand", about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Project root holding the source tree, configuration and manifest
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace); RUST_LOG overrides it
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create or update the deployment configuration
    Config,
    /// Sync source, rebuild the image and replace the running container
    Deploy,
    /// Like deploy, but always re-renders the manifest and never prompts
    Update,
    /// Show service status
    Status,
    /// Follow service logs
    Logs {
        /// Number of history lines to show first
        lines: Option<u32>,
    },
    /// Restart the service
    Restart,
    /// Stop and remove the service container
    Stop,
    /// Register a systemd unit so the service starts at boot (root)
    InstallService,
    /// Remove the systemd unit (root)
    RemoveService,
    /// Print version information as JSON
    Version,
}

impl Commands {
    fn into_command(self) -> Option<Command> {
        Some(match self {
            Commands::Config => Command::Config,
            Commands::Deploy => Command::Deploy,
            Commands::Update => Command::Update,
            Commands::Status => Command::Status,
            Commands::Logs { lines } => Command::Logs(lines),
            Commands::Restart => Command::Restart,
            Commands::Stop => Command::Stop,
            Commands::InstallService => Command::InstallService,
            Commands::RemoveService => Command::RemoveService,
            Commands::Version => return None,
        })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    let command = match cli.command {
        Some(Commands::Version) => {
            match serde_json::to_string_pretty(&version_info()) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("Failed to encode version info: {}", e),
            }
            return ExitCode::SUCCESS;
        }
        Some(other) => other.into_command(),
        None => None,
    };

    let root = match cli.root.map(std::path::absolute).unwrap_or_else(std::env::current_dir) {
        Ok(root) => root,
        Err(e) => {
            output::failure(&format!("Cannot determine project root: {}", e));
            return ExitCode::FAILURE;
        }
    };
    let layout = ProjectLayout::new(root);

    // Keep the guard alive so buffered file logs are flushed on exit
    let log_options = LogOptions {
        log_level: cli.log_level,
        log_file: Some(layout.state_dir().file("dockhand.log").path().to_path_buf()),
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options.clone()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("File logging unavailable ({}); logging to stderr only", e);
            init_logging(LogOptions {
                log_file: None,
                ..log_options
            })
            .ok()
            .flatten()
        }
    };

    let options = AppOptions {
        layout,
        ..Default::default()
    };

    let runner = Arc::new(ProcessRunner);
    let elevated = is_elevated(runner.as_ref()).await;
    let app = match App::start(
        options,
        runner,
        Arc::new(TerminalPrompter::new()),
        elevated,
    )
    .await
    {
        Ok(app) => app,
        Err(e) => {
            error!("Startup check failed: {}", e);
            output::failure(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    let result = match command {
        Some(command) => app.execute(command).await,
        None => run_menu(&app).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            output::failure(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
