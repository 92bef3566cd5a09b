//! dockhand
//!
//! Deploys a single containerized service on one host: keeps its configuration,
//! renders the compose manifest, syncs the source tree, rebuilds and replaces
//! the container, and registers a systemd unit for boot-time startup.

pub mod app;
pub mod config;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod installer;
pub mod logs;
pub mod storage;
pub mod utils;
