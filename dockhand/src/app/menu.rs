//! Interactive numbered menu

use colored::Colorize;
use tracing::error;

use crate::app::output;
use crate::app::run::{App, Command};
use crate::errors::DeployError;

const ITEMS: [(&str, Option<Command>); 10] = [
    ("Configure deployment", Some(Command::Config)),
    ("Deploy (sync, build, restart)", Some(Command::Deploy)),
    ("Quick update", Some(Command::Update)),
    ("Show status", Some(Command::Status)),
    ("Follow logs", Some(Command::Logs(None))),
    ("Restart service", Some(Command::Restart)),
    ("Stop service", Some(Command::Stop)),
    ("Install boot service", Some(Command::InstallService)),
    ("Remove boot service", Some(Command::RemoveService)),
    ("Quit", None),
];

/// Loop over the menu until the operator quits.
///
/// A failing command is reported and the menu shown again.
pub async fn run_menu(app: &App) -> Result<(), DeployError> {
    let labels: Vec<String> = ITEMS
        .iter()
        .enumerate()
        .map(|(i, (label, _))| format!("[{}] {}", (i + 1) % ITEMS.len(), label))
        .collect();

    println!("{}", "dockhand".bold());
    println!("Project: {}", app.options().layout.root.display());

    loop {
        let choice = app
            .prompter()
            .select("What would you like to do?", &labels, 0)?;

        let Some(command) = ITEMS.get(choice).and_then(|(_, command)| *command) else {
            return Ok(());
        };

        if let Err(e) = app.execute(command).await {
            error!("{:?} failed: {}", command, e);
            output::failure(&e.to_string());
        }
    }
}
