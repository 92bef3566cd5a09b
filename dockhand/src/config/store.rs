//! Configuration file persistence
//!
//! The file is line oriented: `KEY='value'` records plus `#` comments. Values
//! are opaque literals. They are never evaluated by a shell, so reading is a
//! plain split on the first `=` followed by removal of one layer of quotes.

use tracing::{debug, warn};

use crate::config::keys::{ConfigKey, DeploymentConfig};
use crate::errors::DeployError;
use crate::filesys::file::File;

const HEADER: &str = "\
# dockhand deployment configuration
# Managed by `dockhand config`; edits are replaced on the next configuration pass.
# Values are single-quoted literals and are never shell-expanded.
";

/// Reads and writes the deployment configuration file
#[derive(Debug, Clone)]
pub struct ConfigStore {
    file: File,
}

impl ConfigStore {
    pub fn new(file: File) -> Self {
        Self { file }
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    /// Whether a configuration has been saved
    pub async fn is_configured(&self) -> bool {
        self.file.exists().await
    }

    /// Load the configuration, failing with `NotConfigured` if the file is absent
    pub async fn load(&self) -> Result<DeploymentConfig, DeployError> {
        match self.file.read_string_opt().await? {
            Some(contents) => Ok(parse(&contents)),
            None => Err(DeployError::NotConfigured(format!(
                "{} does not exist",
                self.file.path().display()
            ))),
        }
    }

    /// Load the configuration if present, or an empty one otherwise
    pub async fn load_or_empty(&self) -> Result<DeploymentConfig, DeployError> {
        match self.load().await {
            Ok(config) => Ok(config),
            Err(DeployError::NotConfigured(_)) => Ok(DeploymentConfig::new()),
            Err(e) => Err(e),
        }
    }

    /// Stored value for `key`, or `default` when unset, empty or the file is absent
    pub async fn get_or_default(&self, key: ConfigKey, default: &str) -> Result<String, DeployError> {
        let config = self.load_or_empty().await?;
        Ok(match config.get(key) {
            "" => default.to_string(),
            value => value.to_string(),
        })
    }

    /// Validate and write the whole configuration, replacing the previous file.
    ///
    /// Nothing is written when validation fails.
    pub async fn save(&self, config: &DeploymentConfig) -> Result<(), DeployError> {
        config.validate()?;
        let contents = serialize(config);
        self.file.write_private(contents.as_bytes()).await?;
        debug!("Configuration saved to {}", self.file.path().display());
        Ok(())
    }
}

/// Render every recognized key, in fixed order, as `KEY='value'`
pub fn serialize(config: &DeploymentConfig) -> String {
    let mut out = String::from(HEADER);
    for (key, value) in config.entries() {
        out.push_str(key.as_str());
        out.push_str("='");
        out.push_str(value);
        out.push_str("'\n");
    }
    out
}

/// Parse the config file contents. Unknown keys and malformed lines are skipped.
pub fn parse(contents: &str) -> DeploymentConfig {
    let mut config = DeploymentConfig::new();

    for (index, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        let Some((name, value)) = line.split_once('=') else {
            warn!("Ignoring malformed config line {}: no '=' found", index + 1);
            continue;
        };

        match name.trim().parse::<ConfigKey>() {
            Ok(key) => config.set(key, strip_quotes(value.trim())),
            Err(e) => warn!("Ignoring config line {}: {}", index + 1, e),
        }
    }

    config
}

/// Remove exactly one layer of matching surrounding single or double quotes
pub fn strip_quotes(value: &str) -> &str {
    for quote in ['\'', '"'] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
