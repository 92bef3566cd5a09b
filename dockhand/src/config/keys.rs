//! Recognized configuration keys and the deployment config record

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::errors::DeployError;

/// Configuration key.
///
/// Declaration order is the file order and the manifest environment order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigKey {
    DatabaseUrl,
    SessionSecret,
    Port,
    DataDir,
    PublicUrl,
    LogLevel,
    SmtpHost,
    SmtpPort,
    SmtpUser,
    SmtpPassword,
    SmtpFrom,
    AdminEmail,
}

impl ConfigKey {
    /// Every key, in file order
    pub const ALL: [ConfigKey; 12] = [
        ConfigKey::DatabaseUrl,
        ConfigKey::SessionSecret,
        ConfigKey::Port,
        ConfigKey::DataDir,
        ConfigKey::PublicUrl,
        ConfigKey::LogLevel,
        ConfigKey::SmtpHost,
        ConfigKey::SmtpPort,
        ConfigKey::SmtpUser,
        ConfigKey::SmtpPassword,
        ConfigKey::SmtpFrom,
        ConfigKey::AdminEmail,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::DatabaseUrl => "DATABASE_URL",
            ConfigKey::SessionSecret => "SESSION_SECRET",
            ConfigKey::Port => "PORT",
            ConfigKey::DataDir => "DATA_DIR",
            ConfigKey::PublicUrl => "PUBLIC_URL",
            ConfigKey::LogLevel => "LOG_LEVEL",
            ConfigKey::SmtpHost => "SMTP_HOST",
            ConfigKey::SmtpPort => "SMTP_PORT",
            ConfigKey::SmtpUser => "SMTP_USER",
            ConfigKey::SmtpPassword => "SMTP_PASSWORD",
            ConfigKey::SmtpFrom => "SMTP_FROM",
            ConfigKey::AdminEmail => "ADMIN_EMAIL",
        }
    }

    /// Human-readable prompt shown during configuration
    pub fn prompt(&self) -> &'static str {
        match self {
            ConfigKey::DatabaseUrl => "Database connection string",
            ConfigKey::SessionSecret => "Session secret",
            ConfigKey::Port => "HTTP port",
            ConfigKey::DataDir => "Data directory",
            ConfigKey::PublicUrl => "Public URL",
            ConfigKey::LogLevel => "Application log level",
            ConfigKey::SmtpHost => "SMTP host",
            ConfigKey::SmtpPort => "SMTP port",
            ConfigKey::SmtpUser => "SMTP user",
            ConfigKey::SmtpPassword => "SMTP password",
            ConfigKey::SmtpFrom => "SMTP sender address",
            ConfigKey::AdminEmail => "Administrator email",
        }
    }

    /// Default used when nothing is stored yet.
    ///
    /// The session secret has no static default; it is generated on demand.
    pub fn default_value(&self) -> &'static str {
        match self {
            ConfigKey::Port => "3000",
            ConfigKey::DataDir => "./data",
            ConfigKey::LogLevel => "info",
            _ => "",
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, ConfigKey::DatabaseUrl)
    }

    /// Credentials are prompted without echo
    pub fn is_sensitive(&self) -> bool {
        matches!(
            self,
            ConfigKey::DatabaseUrl | ConfigKey::SessionSecret | ConfigKey::SmtpPassword
        )
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| format!("Unknown configuration key: {}", s))
    }
}

/// The persisted set of deployment parameters
#[derive(Clone, Default, PartialEq, Eq)]
pub struct DeploymentConfig {
    values: BTreeMap<ConfigKey, String>,
}

impl DeploymentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored value, or the empty string when unset
    pub fn get(&self, key: ConfigKey) -> &str {
        self.values.get(&key).map(String::as_str).unwrap_or("")
    }

    /// Stored value, or the key's static default when unset or empty
    pub fn get_or_key_default(&self, key: ConfigKey) -> &str {
        match self.get(key) {
            "" => key.default_value(),
            value => value,
        }
    }

    /// Store `value` for `key`; an empty value unsets it
    pub fn set(&mut self, key: ConfigKey, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            self.values.remove(&key);
        } else {
            self.values.insert(key, value);
        }
    }

    /// Builder-style [`DeploymentConfig::set`]
    pub fn with(mut self, key: ConfigKey, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Every key in file order with its value (empty when unset)
    pub fn entries(&self) -> impl Iterator<Item = (ConfigKey, &str)> + '_ {
        ConfigKey::ALL.iter().map(move |key| (*key, self.get(*key)))
    }

    /// Only the keys carrying a non-empty value, in file order
    pub fn non_empty(&self) -> impl Iterator<Item = (ConfigKey, &str)> + '_ {
        self.entries().filter(|(_, value)| !value.is_empty())
    }

    /// Check mandatory fields and line-safety of every value
    pub fn validate(&self) -> Result<(), DeployError> {
        for (key, value) in self.entries() {
            if key.is_required() && value.trim().is_empty() {
                return Err(DeployError::MissingRequiredField(key.to_string()));
            }
            if value.contains('\n') || value.contains('\r') {
                return Err(DeployError::InvalidValue {
                    key: key.to_string(),
                    reason: "values must fit on a single line".to_string(),
                });
            }
        }
        Ok(())
    }
}

// Values may hold credentials, so Debug only reveals which keys are set.
impl fmt::Debug for DeploymentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in self.entries() {
            if key.is_sensitive() && !value.is_empty() {
                map.entry(&key.as_str(), &"<redacted>");
            } else {
                map.entry(&key.as_str(), &value);
            }
        }
        map.finish()
    }
}
