//! TOML-based configuration with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! dialect = "postgres"
//!
//! [database]
//! connection_string = "${ANALYTICS_DB_URL}"
//!
//! [resolver]
//! schema_threshold = 0.3
//! business_threshold = 0.4
//! ambiguity_ceiling = 20
//!
//! [planner]
//! max_hops = 3
//! max_tables = 5
//!
//! [generator]
//! default_limit = 100
//! default_top_n = 10
//!
//! [cache]
//! enabled = true
//! extraction_ttl_seconds = 3600
//! dimension_ttl_seconds = 5400
//! sql_ttl_seconds = 600
//!
//! [compile]
//! deadline_ms = 10000
//! collaborator_timeout_ms = 3000
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::planner::PlannerCaps;
use crate::sql::Dialect;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Unknown dialect: {0}")]
    UnknownDialect(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Target SQL dialect name (ansi, postgres, duckdb).
    pub dialect: Option<String>,

    pub database: DatabaseSettings,
    pub resolver: ResolverSettings,
    pub planner: PlannerSettings,
    pub generator: GeneratorSettings,
    pub cache: CacheSettings,
    pub compile: CompileSettings,
}

/// Connection to the dimension-value source.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Connection string (supports ${ENV_VAR} expansion).
    pub connection_string: Option<String>,
}

impl DatabaseSettings {
    /// The connection string with environment variables expanded.
    pub fn resolved_connection_string(&self) -> Result<Option<String>, SettingsError> {
        self.connection_string
            .as_deref()
            .map(expand_env_vars)
            .transpose()
    }
}

/// Entity resolution thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// Acceptance threshold for schema/dimension matches (0.0 to 1.0).
    pub schema_threshold: f64,

    /// Acceptance threshold for business-context matches (0.0 to 1.0).
    pub business_threshold: f64,

    /// Surviving-candidate count that triggers a "too broad" warning.
    pub ambiguity_ceiling: usize,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            schema_threshold: 0.3,
            business_threshold: 0.4,
            ambiguity_ceiling: 20,
        }
    }
}

/// Join-path search budgets.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PlannerSettings {
    pub max_hops: usize,
    pub max_tables: usize,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            max_hops: 3,
            max_tables: 5,
        }
    }
}

impl PlannerSettings {
    pub fn caps(&self) -> PlannerCaps {
        PlannerCaps {
            max_hops: self.max_hops,
            max_tables: self.max_tables,
        }
    }
}

/// SQL generation limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// Safety LIMIT for plain retrieval queries.
    pub default_limit: u64,

    /// LIMIT for ranking queries when no N is requested.
    pub default_top_n: u64,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            default_limit: 100,
            default_top_n: 10,
        }
    }
}

/// Cache enablement and per-category TTLs.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    pub extraction_ttl_seconds: u64,
    pub dimension_ttl_seconds: u64,
    pub sql_ttl_seconds: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            extraction_ttl_seconds: 3600,
            dimension_ttl_seconds: 5400,
            sql_ttl_seconds: 600,
        }
    }
}

impl CacheSettings {
    pub fn extraction_ttl(&self) -> Duration {
        Duration::from_secs(self.extraction_ttl_seconds)
    }

    pub fn dimension_ttl(&self) -> Duration {
        Duration::from_secs(self.dimension_ttl_seconds)
    }

    pub fn sql_ttl(&self) -> Duration {
        Duration::from_secs(self.sql_ttl_seconds)
    }
}

/// Deadlines for the compilation pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompileSettings {
    /// Overall per-query compilation deadline.
    pub deadline_ms: u64,

    /// Timeout for each individual collaborator call.
    pub collaborator_timeout_ms: u64,
}

impl Default for CompileSettings {
    fn default() -> Self {
        Self {
            deadline_ms: 10_000,
            collaborator_timeout_ms: 3_000,
        }
    }
}

impl CompileSettings {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_millis(self.collaborator_timeout_ms)
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `SQLLOOM_CONFIG`
    /// 2. `./sqlloom.toml`
    /// 3. `~/.config/sqlloom/config.toml`
    ///
    /// Falls back to defaults when no file exists.
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("SQLLOOM_CONFIG") {
            return Self::from_file(&path);
        }

        let local = PathBuf::from("sqlloom.toml");
        if local.exists() {
            return Self::from_file(local);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user = config_dir.join("sqlloom").join("config.toml");
            if user.exists() {
                return Self::from_file(user);
            }
        }

        Ok(Self::default())
    }

    /// The configured SQL dialect, defaulting to Postgres.
    pub fn sql_dialect(&self) -> Result<Dialect, SettingsError> {
        match &self.dialect {
            None => Ok(Dialect::default()),
            Some(name) => {
                Dialect::parse(name).ok_or_else(|| SettingsError::UnknownDialect(name.clone()))
            }
        }
    }

    fn validate(&self) -> Result<(), SettingsError> {
        for (name, value) in [
            ("resolver.schema_threshold", self.resolver.schema_threshold),
            (
                "resolver.business_threshold",
                self.resolver.business_threshold,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SettingsError::InvalidConfig(format!(
                    "{} must be between 0.0 and 1.0, got {}",
                    name, value
                )));
            }
        }
        if self.planner.max_tables == 0 {
            return Err(SettingsError::InvalidConfig(
                "planner.max_tables must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Expand `${VAR}` and `$VAR` references from the environment.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }

        let mut var_name = String::new();
        while let Some(&ch) = chars.peek() {
            let take = if braced {
                ch != '}'
            } else {
                ch.is_alphanumeric() || ch == '_'
            };
            if !take {
                break;
            }
            var_name.push(ch);
            chars.next();
        }
        if braced {
            chars.next(); // consume '}'
        }

        if var_name.is_empty() {
            // A lone $, keep it
            result.push('$');
        } else {
            let value =
                env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
            result.push_str(&value);
        }
    }

    Ok(result)
}
