//! Deployment configuration

pub mod keys;
pub mod secret;
pub mod store;

pub use keys::{ConfigKey, DeploymentConfig};
pub use store::ConfigStore;
