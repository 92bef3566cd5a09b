//! Operator-facing status lines

use colored::Colorize;

use crate::deploy::docker::short_id;
use crate::deploy::executor::DeployReport;

pub fn heading(text: &str) {
    println!("\n{}", text.bold());
}

pub fn success(text: &str) {
    println!("{} {}", "[OK]".green().bold(), text);
}

pub fn notice(text: &str) {
    println!("{} {}", "[..]".cyan().bold(), text);
}

pub fn failure(text: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), text);
}

/// Summarize a finished deploy or update
pub fn report(report: &DeployReport) {
    heading("Deployment summary");
    if report.old_revision == report.new_revision {
        println!("  Revision:  {} (unchanged)", report.new_revision);
    } else {
        println!("  Revision:  {} -> {}", report.old_revision, report.new_revision.green());
    }

    let old = report.old_image.as_deref().map(short_id).unwrap_or("none");
    let new = report.new_image.as_deref().map(short_id).unwrap_or("unknown");
    println!("  Image:     {} -> {}", old, new);
    if report.old_image_removed {
        println!("  Cleanup:   previous image removed");
    }
    if let Some(change) = report.manifest_change {
        println!("  Manifest:  {:?}", change);
    }
    if !report.logs_purged {
        println!("  {}", "Logs directory could not be cleared".yellow());
    }
}
