//! Configuration providers
//!
//! Settings are read through a `ConfigProvider` so the service can load them from
//! the process environment in production and from an in-memory map in tests.

use std::collections::HashMap;
use std::env;
use std::str::FromStr;

use thiserror::Error;

/// Configuration lookup errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Key is not present in the provider
    #[error("Configuration key not found: {0}")]
    Missing(String),

    /// Key is present but its value could not be parsed
    #[error("Invalid value for key {key}: {reason}")]
    Invalid { key: String, reason: String },
}

/// Base trait for configuration providers
pub trait ConfigProvider: Send + Sync {
    /// Get a string configuration value
    fn get_string(&self, key: &str) -> Result<String, ConfigError>;
}

/// Extension methods for configuration providers
pub trait ConfigProviderExt: ConfigProvider {
    /// Get a typed configuration value by parsing from string
    fn get<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        <T as FromStr>::Err: std::fmt::Display,
    {
        let value = self.get_string(key)?;
        value.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    /// Get a typed configuration value, falling back to `default` when the key is
    /// missing or unparseable. Unparseable values are logged.
    fn get_or<T>(&self, key: &str, default: T) -> T
    where
        T: FromStr,
        <T as FromStr>::Err: std::fmt::Display,
    {
        match self.get::<T>(key) {
            Ok(value) => value,
            Err(ConfigError::Missing(_)) => default,
            Err(err) => {
                log::warn!("{}; using default", err);
                default
            }
        }
    }

    /// Get a boolean configuration value
    fn get_bool(&self, key: &str) -> Result<bool, ConfigError> {
        let value = self.get_string(key)?;
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Ok(true),
            "false" | "no" | "0" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key: key.to_string(),
                reason: format!("'{}' is not a boolean", value),
            }),
        }
    }

    /// Get a string configuration value with a default
    fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| default.to_string())
    }

    /// Get a boolean configuration value with a default
    fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }

    /// Get an optional, non-blank string value
    fn get_optional(&self, key: &str) -> Option<String> {
        self.get_string(key)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }
}

impl<T: ConfigProvider + ?Sized> ConfigProviderExt for T {}

/// Environment variable based configuration provider
#[derive(Debug, Clone, Default)]
pub struct EnvConfigProvider {
    /// Optional prefix for environment variables
    prefix: Option<String>,
}

impl EnvConfigProvider {
    /// Create a new environment variable config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a prefix for environment variables
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Format a configuration key as an environment variable
    pub fn format_key(&self, key: &str) -> String {
        let mut env_key = String::new();

        if let Some(ref prefix) = self.prefix {
            env_key.push_str(prefix);
            env_key.push('_');
        }

        // Uppercase and replace non-alphanumeric with underscores
        env_key.push_str(&key.to_uppercase().replace(|c: char| !c.is_ascii_alphanumeric(), "_"));

        env_key
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn get_string(&self, key: &str) -> Result<String, ConfigError> {
        let env_key = self.format_key(key);

        env::var(&env_key).map_err(|e| match e {
            env::VarError::NotPresent => ConfigError::Missing(env_key),
            env::VarError::NotUnicode(_) => ConfigError::Invalid {
                key: env_key,
                reason: "not valid unicode".to_string(),
            },
        })
    }
}

/// In-memory config provider for testing or static configuration
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigProvider {
    values: HashMap<String, String>,
}

impl MemoryConfigProvider {
    /// Create a new empty memory config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a configuration value
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: ToString,
    {
        self.values.insert(key.into(), value.to_string());
    }
}

impl ConfigProvider for MemoryConfigProvider {
    fn get_string(&self, key: &str) -> Result<String, ConfigError> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| ConfigError::Missing(key.to_string()))
    }
}
