//! Interactive configuration pass

use chrono::Utc;
use tracing::info;

use crate::app::prompt::Prompter;
use crate::config::keys::{ConfigKey, DeploymentConfig};
use crate::config::secret::generate_session_secret;
use crate::config::store::ConfigStore;
use crate::deploy::manifest::{render, write_manifest, ManifestChange, ServiceSpec};
use crate::errors::DeployError;
use crate::storage::layout::ProjectLayout;

/// Answer that clears an optional value which otherwise has a default
pub const CLEAR_ANSWER: &str = "-";

/// Prompt for every key, save the configuration, then regenerate the manifest.
///
/// Existing values are offered as defaults, so accepting every prompt leaves
/// the configuration (session secret included) untouched. Nothing is written
/// if the database connection string ends up empty.
pub async fn configure(
    store: &ConfigStore,
    prompter: &dyn Prompter,
    layout: &ProjectLayout,
    spec: &ServiceSpec,
) -> Result<(DeploymentConfig, ManifestChange), DeployError> {
    let existing = store.load_or_empty().await?;
    let mut config = DeploymentConfig::new();

    for key in ConfigKey::ALL {
        let default = match (key, existing.get(key)) {
            (ConfigKey::SessionSecret, "") => generate_session_secret(),
            _ => existing.get_or_key_default(key).to_string(),
        };

        let answer = prompter.input(key.prompt(), &default, key.is_sensitive())?;
        let value = match answer.trim() {
            CLEAR_ANSWER if !key.is_required() => "",
            trimmed => trimmed,
        };

        if key.is_required() && value.is_empty() {
            return Err(DeployError::MissingRequiredField(key.to_string()));
        }
        config.set(key, value);
    }

    store.save(&config).await?;
    info!("Configuration written to {}", store.file().path().display());

    let manifest = render(&config, layout, spec, Utc::now());
    let change = write_manifest(&layout.manifest_file(), &manifest).await?;

    Ok((config, change))
}
