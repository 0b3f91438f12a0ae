//! Configuration loading and resolution.
//!
//! Supports a TOML config file, environment variables, and CLI overrides
//! with a defined priority order (CLI > env > TOML > defaults).

use std::fmt;

use serde::Deserialize;

use crate::dsn::ConnectionParams;
use crate::error::{PgDiffError, Result};

/// Helper macro to apply an optional owned value directly to a target field.
macro_rules! apply_option {
    ($opt:expr => $target:expr) => {
        if let Some(v) = $opt {
            $target = v;
        }
    };
}

/// Helper macro to apply an optional owned value, wrapping it in `Some()`.
macro_rules! apply_option_some {
    ($opt:expr => $target:expr) => {
        if let Some(v) = $opt {
            $target = Some(v);
        }
    };
}

const DEFAULT_CONFIG_FILE: &str = "pgdiff.toml";
const MAX_CONNECT_RETRIES: u32 = 20;

/// Top-level configuration for pg-diff.
#[derive(Clone, Default)]
pub struct PgDiffConfig {
    /// Source database connection string (URL or key=value).
    pub source: Option<String>,
    /// Target database connection string. Absent means info-only mode.
    pub target: Option<String>,
    /// Connection behavior shared by both sides.
    pub connection: ConnectionSettings,
    /// Schema and keyword filters applied during extraction.
    pub filters: FilterConfig,
    /// External describe-table command settings.
    pub describe: DescribeConfig,
}

impl fmt::Debug for PgDiffConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgDiffConfig")
            .field("source", &self.source.as_ref().map(|_| "[REDACTED]"))
            .field("target", &self.target.as_ref().map(|_| "[REDACTED]"))
            .field("connection", &self.connection)
            .field("filters", &self.filters)
            .field("describe", &self.describe)
            .finish()
    }
}

/// Connection behavior applied to every database connection.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Number of times to retry a failed connection (max 20).
    pub connect_retries: u32,
    /// Connection timeout in seconds (0 means no timeout).
    pub connect_timeout_secs: u32,
    /// Statement timeout in seconds (0 means no timeout).
    pub statement_timeout_secs: u32,
    /// TCP keepalive idle time in seconds (0 disables).
    pub keepalive_secs: u32,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            connect_retries: 0,
            connect_timeout_secs: 30,
            statement_timeout_secs: 0,
            keepalive_secs: 120,
        }
    }
}

/// Filters that keep replication and catalog noise out of documents.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterConfig {
    /// Schemas excluded from every table and sequence enumeration.
    pub ignored_schemas: Vec<String>,
    /// Substrings that drop a line from a schema section (indexes, triggers, ...).
    pub excluded_keywords: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            ignored_schemas: vec![
                "pg_catalog".to_string(),
                "information_schema".to_string(),
                "bucardo".to_string(),
                "pglogical".to_string(),
            ],
            excluded_keywords: vec!["bucardo".to_string(), "pglogical".to_string()],
        }
    }
}

/// Settings for the external `\d` describe command.
#[derive(Debug, Clone, PartialEq)]
pub struct DescribeConfig {
    /// Path or name of the `psql` executable.
    pub psql_path: String,
    /// Lines that open a new section in `\d` output.
    pub section_titles: Vec<String>,
}

impl Default for DescribeConfig {
    fn default() -> Self {
        Self {
            psql_path: "psql".to_string(),
            section_titles: vec![
                "Indexes:".to_string(),
                "Foreign-key constraints:".to_string(),
                "Referenced by:".to_string(),
                "Triggers:".to_string(),
            ],
        }
    }
}

// ── TOML deserialization structs ──

#[derive(Debug, Deserialize, Default)]
struct TomlConfig {
    source: Option<String>,
    target: Option<String>,
    connection: Option<TomlConnectionSettings>,
    filters: Option<TomlFilterConfig>,
    describe: Option<TomlDescribeConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlConnectionSettings {
    connect_retries: Option<u32>,
    connect_timeout: Option<u32>,
    statement_timeout: Option<u32>,
    keepalive: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlFilterConfig {
    ignored_schemas: Option<Vec<String>>,
    excluded_keywords: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlDescribeConfig {
    psql_path: Option<String>,
    section_titles: Option<Vec<String>>,
}

/// CLI overrides that take highest priority.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override the source connection string.
    pub source: Option<String>,
    /// Override the target connection string.
    pub target: Option<String>,
    /// Override the `psql` executable.
    pub psql_path: Option<String>,
    /// Override the number of connection retries.
    pub connect_retries: Option<u32>,
    /// Override the connection timeout in seconds.
    pub connect_timeout: Option<u32>,
    /// Override the statement timeout in seconds.
    pub statement_timeout: Option<u32>,
}

impl PgDiffConfig {
    /// Load configuration with the following priority (highest wins):
    /// 1. CLI arguments
    /// 2. Environment variables
    /// 3. TOML config file
    /// 4. Built-in defaults
    pub fn load(config_path: Option<&str>, overrides: &CliOverrides) -> Result<Self> {
        let mut config = PgDiffConfig::default();

        let toml_path = config_path.unwrap_or(DEFAULT_CONFIG_FILE);
        match std::fs::read_to_string(toml_path) {
            Ok(content) => {
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    if let Ok(meta) = std::fs::metadata(toml_path) {
                        let mode = meta.permissions().mode();
                        if mode & 0o077 != 0 && content.contains("password") {
                            log::warn!("Config file with credentials is readable by others. Consider chmod 600.; path={}, mode={:o}", toml_path, mode);
                        }
                    }
                }
                config.apply_toml(parse_toml(&content, toml_path)?);
            }
            Err(e) if config_path.is_some() => {
                return Err(PgDiffError::ConfigError(format!(
                    "Config file '{}' could not be read: {}",
                    toml_path, e
                )));
            }
            Err(_) => {}
        }

        config.apply_env();
        config.apply_cli(overrides);

        if config.connection.connect_retries > MAX_CONNECT_RETRIES {
            config.connection.connect_retries = MAX_CONNECT_RETRIES;
            log::warn!("connect_retries capped at {}", MAX_CONNECT_RETRIES);
        }

        Ok(config)
    }

    fn apply_toml(&mut self, toml: TomlConfig) {
        apply_option_some!(toml.source => self.source);
        apply_option_some!(toml.target => self.target);

        if let Some(c) = toml.connection {
            apply_option!(c.connect_retries => self.connection.connect_retries);
            apply_option!(c.connect_timeout => self.connection.connect_timeout_secs);
            apply_option!(c.statement_timeout => self.connection.statement_timeout_secs);
            apply_option!(c.keepalive => self.connection.keepalive_secs);
        }

        if let Some(f) = toml.filters {
            apply_option!(f.ignored_schemas => self.filters.ignored_schemas);
            apply_option!(f.excluded_keywords => self.filters.excluded_keywords);
        }

        if let Some(d) = toml.describe {
            apply_option!(d.psql_path => self.describe.psql_path);
            apply_option!(d.section_titles => self.describe.section_titles);
        }
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("PGDIFF_SOURCE") {
            self.source = Some(v);
        }
        if let Ok(v) = std::env::var("PGDIFF_TARGET") {
            self.target = Some(v);
        }
        if let Ok(v) = std::env::var("PGDIFF_PSQL") {
            self.describe.psql_path = v;
        }
        if let Ok(v) = std::env::var("PGDIFF_CONNECT_RETRIES") {
            if let Ok(n) = v.parse::<u32>() {
                self.connection.connect_retries = n;
            }
        }
        if let Ok(v) = std::env::var("PGDIFF_CONNECT_TIMEOUT") {
            if let Ok(n) = v.parse::<u32>() {
                self.connection.connect_timeout_secs = n;
            }
        }
        if let Ok(v) = std::env::var("PGDIFF_STATEMENT_TIMEOUT") {
            if let Ok(n) = v.parse::<u32>() {
                self.connection.statement_timeout_secs = n;
            }
        }
        if let Ok(v) = std::env::var("PGDIFF_IGNORED_SCHEMAS") {
            self.filters.ignored_schemas = split_list(&v);
        }
        if let Ok(v) = std::env::var("PGDIFF_EXCLUDED_KEYWORDS") {
            self.filters.excluded_keywords = split_list(&v);
        }
    }

    fn apply_cli(&mut self, overrides: &CliOverrides) {
        apply_option_some!(overrides.source.clone() => self.source);
        apply_option_some!(overrides.target.clone() => self.target);
        apply_option!(overrides.psql_path.clone() => self.describe.psql_path);
        apply_option!(overrides.connect_retries => self.connection.connect_retries);
        apply_option!(overrides.connect_timeout => self.connection.connect_timeout_secs);
        apply_option!(overrides.statement_timeout => self.connection.statement_timeout_secs);
    }

    /// Parsed source connection parameters. A missing source is a config error.
    pub fn source_params(&self) -> Result<ConnectionParams> {
        let source = self.source.as_deref().ok_or_else(|| {
            PgDiffError::ConfigError(
                "A source database is required (--source or PGDIFF_SOURCE)".to_string(),
            )
        })?;
        ConnectionParams::parse(source)
            .map_err(|e| PgDiffError::ValidationFailed(format!("Invalid source: {}", strip_prefix(e))))
    }

    /// Parsed target connection parameters, if a target was given.
    pub fn target_params(&self) -> Result<Option<ConnectionParams>> {
        match self.target.as_deref() {
            Some(target) => ConnectionParams::parse(target).map(Some).map_err(|e| {
                PgDiffError::ValidationFailed(format!("Invalid target: {}", strip_prefix(e)))
            }),
            None => Ok(None),
        }
    }
}

fn parse_toml(content: &str, path: &str) -> Result<TomlConfig> {
    toml::from_str(content).map_err(|e| {
        PgDiffError::ConfigError(format!("Failed to parse config file '{}': {}", path, e))
    })
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn strip_prefix(e: PgDiffError) -> String {
    match e {
        PgDiffError::ValidationFailed(msg) => msg,
        other => other.to_string(),
    }
}
