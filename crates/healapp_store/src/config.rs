//! Store configuration.
//!
//! # Responsibility
//! - Describe connection, query-bound and logging settings in one serde model.
//! - Load settings from JSON text or a JSON file, with defaults for every field.
//!
//! # Invariants
//! - `max_page_size >= default_page_size >= 1` after [`QueryLimits::normalized`].
//! - `max_unpaged_rows >= 1`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;
const MAX_UNPAGED_ROWS: u32 = 1_000;

/// Top-level store configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub database: DatabaseConfig,
    pub limits: QueryLimits,
    /// Logging stays off when absent.
    pub logging: Option<LoggingConfig>,
}

/// Connection settings applied when a database is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// How long a statement waits on a locked database before failing as unavailable.
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

/// Bounds applied by every accessor query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryLimits {
    /// Page size used when a request asks for size 0.
    pub default_page_size: u32,
    /// Larger page requests are clamped to this.
    pub max_page_size: u32,
    /// Unpaged lookups matching more rows than this fail instead of loading them.
    pub max_unpaged_rows: u32,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            max_unpaged_rows: MAX_UNPAGED_ROWS,
        }
    }
}

impl QueryLimits {
    /// Repairs zero or inverted values so the invariants above hold.
    pub fn normalized(self) -> Self {
        let max_page_size = self.max_page_size.max(1);
        Self {
            default_page_size: self.default_page_size.clamp(1, max_page_size),
            max_page_size,
            max_unpaged_rows: self.max_unpaged_rows.max(1),
        }
    }

    /// Resolves a requested page size against these limits.
    pub fn page_size(&self, requested: u32) -> u32 {
        match requested {
            0 => self.default_page_size,
            size => size.min(self.max_page_size),
        }
    }
}

/// File logging settings, see [`crate::logging::init_logging`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    /// Absolute directory for rolling log files.
    pub log_dir: PathBuf,
}

fn default_level() -> String {
    crate::logging::default_log_level().to_string()
}

/// Failure to read or parse a configuration source.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid store config: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
        }
    }
}

impl StoreConfig {
    /// Parses JSON text. Missing sections and fields take their defaults.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_json::from_str(text).map_err(ConfigError::Parse)?;
        config.limits = config.limits.normalized();
        Ok(config)
    }

    /// Reads and parses a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }
}
