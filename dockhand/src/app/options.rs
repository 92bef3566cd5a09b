//! Application configuration options

use std::path::PathBuf;

use crate::deploy::fsm::FsmSettings;
use crate::deploy::manifest::ServiceSpec;
use crate::installer::service::DEFAULT_UNIT_DIR;
use crate::storage::layout::ProjectLayout;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Project paths
    pub layout: ProjectLayout,

    /// Image, container and probe naming
    pub service: ServiceSpec,

    /// Deploy run settings
    pub fsm_settings: FsmSettings,

    /// Lines of history shown by `logs` when no count is given
    pub default_log_tail: u32,

    /// Service registration options
    pub unit: UnitOptions,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            layout: ProjectLayout::default(),
            service: ServiceSpec::default(),
            fsm_settings: FsmSettings::default(),
            default_log_tail: 100,
            unit: UnitOptions::default(),
        }
    }
}

/// systemd unit options
#[derive(Debug, Clone)]
pub struct UnitOptions {
    /// Directory the unit file is written to
    pub dir: PathBuf,

    /// Unit base name
    pub name: String,
}

impl Default for UnitOptions {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_UNIT_DIR),
            name: ServiceSpec::default().container_name,
        }
    }
}
