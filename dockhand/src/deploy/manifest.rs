//! Compose manifest rendering
//!
//! The manifest is built as a typed model and serialized once, so no
//! configuration value is ever spliced into YAML text by hand.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::info;

use crate::config::keys::{ConfigKey, DeploymentConfig};
use crate::errors::DeployError;
use crate::filesys::file::File;
use crate::storage::layout::{logs_dir_for, ProjectLayout};

/// Fixed properties of the managed service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    /// Compose service key
    pub name: String,
    /// Image tag built and run
    pub image: String,
    pub container_name: String,
    /// Path polled by the health probe
    pub status_path: String,
}

impl Default for ServiceSpec {
    fn default() -> Self {
        Self {
            name: "app".to_string(),
            image: "dockhand-app:latest".to_string(),
            container_name: "dockhand-app".to_string(),
            status_path: "/api/status".to_string(),
        }
    }
}

/// Top-level compose document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposeFile {
    pub services: BTreeMap<String, ServiceDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceDefinition {
    pub image: String,
    pub container_name: String,
    pub restart: String,
    pub network_mode: String,
    pub volumes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub environment: Vec<String>,
    pub healthcheck: HealthCheck,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub test: Vec<String>,
    pub interval: String,
    pub timeout: String,
    pub retries: u32,
}

/// Rendered service descriptor plus its generation time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestrationManifest {
    pub generated_at: DateTime<Utc>,
    pub compose: ComposeFile,
}

impl OrchestrationManifest {
    /// The YAML document without the timestamp header
    pub fn body(&self) -> Result<String, DeployError> {
        Ok(serde_yaml_ng::to_string(&self.compose)?)
    }

    /// Full file contents: timestamp header followed by the body
    pub fn to_yaml(&self) -> Result<String, DeployError> {
        Ok(format!(
            "# Generated by dockhand at {}. Do not edit; run `dockhand config` instead.\n{}",
            self.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.body()?
        ))
    }

    /// The single service entry
    pub fn service(&self) -> Option<&ServiceDefinition> {
        self.compose.services.values().next()
    }
}

/// Render the manifest for `config`.
///
/// Pure: the only inputs are the arguments. Keys with an empty value are left
/// out of the environment entirely. Every `$` in a value or path is doubled so
/// compose passes it through instead of interpolating host variables.
pub fn render(
    config: &DeploymentConfig,
    layout: &ProjectLayout,
    spec: &ServiceSpec,
    generated_at: DateTime<Utc>,
) -> OrchestrationManifest {
    let data_dir = layout.data_dir(config.get_or_key_default(ConfigKey::DataDir));
    let logs_dir = logs_dir_for(&data_dir);

    let environment = config
        .non_empty()
        .map(|(key, value)| format!("{}={}", key, escape_interpolation(value)))
        .collect();

    let port = config.get_or_key_default(ConfigKey::Port);
    let probe_url = escape_interpolation(&format!("http://localhost:{}{}", port, spec.status_path));

    let service = ServiceDefinition {
        image: spec.image.clone(),
        container_name: spec.container_name.clone(),
        restart: "always".to_string(),
        network_mode: "host".to_string(),
        volumes: vec![
            format!("{}:/data", escape_interpolation(&data_dir.to_string_lossy())),
            format!("{}:/app/logs", escape_interpolation(&logs_dir.to_string_lossy())),
        ],
        environment,
        healthcheck: HealthCheck {
            test: vec![
                "CMD".to_string(),
                "curl".to_string(),
                "-f".to_string(),
                probe_url,
            ],
            interval: "30s".to_string(),
            timeout: "10s".to_string(),
            retries: 3,
        },
    };

    let mut services = BTreeMap::new();
    services.insert(spec.name.clone(), service);

    OrchestrationManifest {
        generated_at,
        compose: ComposeFile { services },
    }
}

/// Double every `$`, compose's escape for a literal dollar sign
pub fn escape_interpolation(value: &str) -> String {
    value.replace('$', "$$")
}

/// What writing the manifest did to the file on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestChange {
    Created,
    Updated,
    /// Only the timestamp header differs
    Unchanged,
}

/// Write the manifest wholesale, reporting whether its content changed
pub async fn write_manifest(
    file: &File,
    manifest: &OrchestrationManifest,
) -> Result<ManifestChange, DeployError> {
    let previous = file.read_string_opt().await?;
    let contents = manifest.to_yaml()?;
    file.write_atomic(contents.as_bytes()).await?;

    let change = match previous {
        None => ManifestChange::Created,
        Some(previous) if strip_comments(&previous) == strip_comments(&contents) => {
            ManifestChange::Unchanged
        }
        Some(_) => ManifestChange::Updated,
    };
    info!("Manifest {} ({:?})", file.path().display(), change);
    Ok(change)
}

fn strip_comments(text: &str) -> String {
    text.lines()
        .filter(|line| !line.starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n")
}
