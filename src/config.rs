//! Configuration for the docbridge binary.
//!
//! Loaded from a TOML file. Every section is optional:
//!
//! ```toml
//! [conversion]
//! max_depth = 200
//! big_integers = false
//!
//! [logging]
//! filter = "info"
//!
//! [[connections]]
//! name = "local"
//! uri = "mongodb://localhost:27017"
//! database = "test"
//! ```

use clap::Args;
use document_types::{ConversionOptions, DEFAULT_MAX_DEPTH};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors from loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Error reading the config file
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Error parsing TOML
    #[error("Failed to parse TOML: {0}")]
    TomlError(#[from] toml::de::Error),

    /// A value parsed but is not usable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DocbridgeConfig {
    pub conversion: ConversionSection,
    pub logging: LoggingSection,
    pub connections: Vec<ConnectionConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConversionSection {
    /// Nesting limit applied in both directions
    pub max_depth: usize,
    /// Keep integers beyond 64 bits as arbitrary-precision values
    pub big_integers: bool,
}

impl Default for ConversionSection {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            big_integers: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// `tracing_subscriber::EnvFilter` directive, used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// A named MongoDB connection
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConnectionConfig {
    pub name: String,
    pub uri: String,
    pub database: String,
}

impl DocbridgeConfig {
    /// Load and validate configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: DocbridgeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, otherwise fall back to defaults.
    ///
    /// An explicitly named file that does not exist is an error; only the
    /// absence of a path yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.conversion.max_depth == 0 {
            return Err(ConfigError::Invalid(
                "conversion.max_depth must be at least 1".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for connection in &self.connections {
            if !seen.insert(connection.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate connection name '{}'",
                    connection.name
                )));
            }
        }
        Ok(())
    }

    /// Look up a connection by name.
    pub fn connection(&self, name: &str) -> Option<&ConnectionConfig> {
        self.connections.iter().find(|c| c.name == name)
    }

    /// Apply command-line overrides on top of the file values.
    pub fn apply_overrides(&mut self, opts: &ConversionOpts) -> Result<(), ConfigError> {
        if let Some(max_depth) = opts.max_depth {
            self.conversion.max_depth = max_depth;
        }
        if opts.big_integers {
            self.conversion.big_integers = true;
        }
        self.validate()
    }

    pub fn conversion_options(&self) -> ConversionOptions {
        ConversionOptions::new()
            .with_max_depth(self.conversion.max_depth)
            .with_big_integers(self.conversion.big_integers)
    }
}

/// Conversion flags shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct ConversionOpts {
    /// Maximum nesting depth accepted in either direction
    #[arg(long, env = "DOCBRIDGE_MAX_DEPTH")]
    pub max_depth: Option<usize>,

    /// Keep integers beyond 64 bits as arbitrary-precision values
    #[arg(long)]
    pub big_integers: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_is_default() {
        let config = DocbridgeConfig::from_toml("").unwrap();
        assert_eq!(config, DocbridgeConfig::default());
        assert_eq!(config.conversion.max_depth, 200);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_full_config() {
        let config = DocbridgeConfig::from_toml(
            r#"
            [conversion]
            max_depth = 50
            big_integers = true

            [logging]
            filter = "docbridge=debug"

            [[connections]]
            name = "local"
            uri = "mongodb://localhost:27017"
            database = "shop"
            "#,
        )
        .unwrap();

        assert_eq!(config.conversion.max_depth, 50);
        assert!(config.conversion.big_integers);
        assert_eq!(config.logging.filter, "docbridge=debug");
        let local = config.connection("local").unwrap();
        assert_eq!(local.database, "shop");
        assert!(config.connection("remote").is_none());

        let options = config.conversion_options();
        assert_eq!(options.max_depth, 50);
        assert!(options.big_integers);
    }

    #[test]
    fn test_zero_depth_rejected() {
        let err = DocbridgeConfig::from_toml("[conversion]\nmax_depth = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_duplicate_connection_rejected() {
        let err = DocbridgeConfig::from_toml(
            r#"
            [[connections]]
            name = "a"
            uri = "mongodb://one"
            database = "x"

            [[connections]]
            name = "a"
            uri = "mongodb://two"
            database = "y"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate connection name 'a'"));
    }

    #[test]
    fn test_overrides() {
        let mut config = DocbridgeConfig::default();
        let opts = ConversionOpts {
            max_depth: Some(10),
            big_integers: true,
        };
        config.apply_overrides(&opts).unwrap();
        assert_eq!(config.conversion.max_depth, 10);
        assert!(config.conversion.big_integers);

        let zero = ConversionOpts {
            max_depth: Some(0),
            big_integers: false,
        };
        assert!(config.apply_overrides(&zero).is_err());
    }

    #[test]
    fn test_no_path_gives_defaults() {
        assert_eq!(DocbridgeConfig::load(None).unwrap(), DocbridgeConfig::default());
    }
}
