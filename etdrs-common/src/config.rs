//! Configuration loading and config file resolution
//!
//! Bootstrap configuration lives in a TOML file. Every key is optional and
//! falls back to a compiled default, so a missing file is never fatal.
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`ETDRS_CONFIG`)
//! 3. Platform config directory (`<config_dir>/etdrs/config.toml`)
//! 4. Compiled defaults (fallback)

use crate::identifier::IdentifierPolicy;
use crate::sector::ColumnStyle;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "ETDRS_CONFIG";

/// How cells from several files of the same subject are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// A later file's non-missing cell replaces an earlier value
    #[default]
    PreferLatest,
    /// A later file may only fill cells that are still missing
    KeepFirst,
}

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Two-letter prefix of canonical subject identifiers
    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,

    /// Bare four-digit identifiers above this value are rejected
    #[serde(default = "default_id_threshold")]
    pub id_threshold: u32,

    /// Name of the identifier column in every table
    #[serde(default = "default_id_column")]
    pub id_column: String,

    /// Text encodings tried in order when reading any input file
    #[serde(default = "default_encodings")]
    pub encodings: Vec<String>,

    /// Separator between side prefix and sector name in column headers
    #[serde(default = "default_column_separator")]
    pub column_separator: String,

    /// Combination rule for repeated exports of one subject
    #[serde(default)]
    pub fill_policy: FillPolicy,

    /// Noise annotation values that mark a quadrant as unreliable
    #[serde(default = "default_noise_flags")]
    pub noise_flags: Vec<String>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            id_prefix: default_id_prefix(),
            id_threshold: default_id_threshold(),
            id_column: default_id_column(),
            encodings: default_encodings(),
            column_separator: default_column_separator(),
            fill_policy: FillPolicy::default(),
            noise_flags: default_noise_flags(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_id_prefix() -> String {
    "EG".to_string()
}

fn default_id_threshold() -> u32 {
    3171
}

fn default_id_column() -> String {
    "ID".to_string()
}

fn default_encodings() -> Vec<String> {
    vec![
        "utf-8-sig".to_string(),
        "cp932".to_string(),
        "utf-8".to_string(),
    ]
}

fn default_column_separator() -> String {
    "_".to_string()
}

fn default_noise_flags() -> Vec<String> {
    vec!["1".to_string(), "１".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse a config file, rejecting values that cannot drive the pipeline
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Parse config text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.id_prefix.chars().count() != 2 || !self.id_prefix.chars().all(char::is_alphabetic) {
            return Err(Error::config(format!(
                "id_prefix must be two letters, got {:?}",
                self.id_prefix
            )));
        }
        if self.id_threshold > 9999 {
            return Err(Error::config(format!(
                "id_threshold must fit in four digits, got {}",
                self.id_threshold
            )));
        }
        if self.id_column.trim().is_empty() {
            return Err(Error::config("id_column must not be blank"));
        }
        if self.encodings.is_empty() {
            return Err(Error::config("encodings must list at least one encoding"));
        }
        self.column_style()?;
        Ok(())
    }

    /// Column naming style derived from `column_separator`
    pub fn column_style(&self) -> Result<ColumnStyle> {
        match self.column_separator.as_str() {
            "_" => Ok(ColumnStyle::Underscore),
            "-" => Ok(ColumnStyle::Hyphen),
            other => Err(Error::config(format!(
                "column_separator must be \"_\" or \"-\", got {:?}",
                other
            ))),
        }
    }

    /// Identifier rules derived from `id_prefix` and `id_threshold`
    pub fn identifier_policy(&self) -> IdentifierPolicy {
        IdentifierPolicy::new(self.id_prefix.clone(), self.id_threshold)
    }
}

/// Config file resolver following the documented priority order
pub struct ConfigResolver {
    env_var_name: String,
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self {
            env_var_name: CONFIG_ENV_VAR.to_string(),
        }
    }

    /// Use a different environment variable (tests)
    pub fn with_env_var(env_var_name: &str) -> Self {
        Self {
            env_var_name: env_var_name.to_string(),
        }
    }

    /// Locate the config file to load, if any
    ///
    /// An explicit path (CLI or environment) is returned even if it does not
    /// exist so that `load` can report it; the platform default is only
    /// returned when present.
    pub fn resolve_path(&self, cli_arg: Option<&Path>) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = cli_arg {
            return Some(path.to_path_buf());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(&self.env_var_name) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: Platform config directory
        default_config_path().filter(|p| p.exists())
    }

    /// Load configuration; missing files degrade to compiled defaults
    pub fn load(&self, cli_arg: Option<&Path>) -> Result<TomlConfig> {
        let (config, source) = self.load_with_source(cli_arg)?;
        source.log();
        Ok(config)
    }

    /// Load configuration without logging, returning where it came from
    ///
    /// Binaries call this before the subscriber exists and log the source
    /// once logging is up.
    pub fn load_with_source(&self, cli_arg: Option<&Path>) -> Result<(TomlConfig, ConfigSource)> {
        match self.resolve_path(cli_arg) {
            Some(path) if path.exists() => {
                let config = TomlConfig::from_file(&path)?;
                Ok((config, ConfigSource::File(path)))
            }
            Some(path) => Ok((TomlConfig::default(), ConfigSource::Missing(path))),
            // Priority 4: compiled defaults
            None => Ok((TomlConfig::default(), ConfigSource::Defaults)),
        }
    }
}

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Loaded from this file
    File(PathBuf),
    /// This file was requested but does not exist; defaults in use
    Missing(PathBuf),
    /// No file configured
    Defaults,
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("Loaded configuration from {}", path.display()),
            ConfigSource::Missing(path) => warn!(
                "Config file {} not found, using compiled defaults",
                path.display()
            ),
            ConfigSource::Defaults => info!("No config file, using compiled defaults"),
        }
    }
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Platform config file location (`~/.config/etdrs/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("etdrs").join("config.toml"))
}
