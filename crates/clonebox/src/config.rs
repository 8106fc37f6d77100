//! Configuration loading.
//!
//! Configuration is merged from, lowest precedence first:
//! - Bundled defaults (include_str! from clonebox.toml)
//! - ~/.config/clonebox/clonebox.toml
//! - ./clonebox.toml
//! - `CLONEBOX_<SECTION>__<KEY>` environment variables

use clonebox_core::{DEFAULT_IDENTIFIER_BYTES, Sha256Resolver};
use clonebox_error::{CloneboxError, CloneboxResult, ConfigError};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_CONFIG: &str = include_str!("../../../clonebox.toml");

/// Identifier derivation and link listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
    /// SHA-256 bytes kept per identifier (1..=32)
    pub identifier_bytes: usize,
    /// Candidates tried per link before giving up
    pub max_attempts: u32,
    /// Default size of the recent-links listing
    pub latest_limit: usize,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            identifier_bytes: DEFAULT_IDENTIFIER_BYTES,
            max_attempts: crate::DEFAULT_MAX_ATTEMPTS,
            latest_limit: 5,
        }
    }
}

/// Upload storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Directory holding staged and canonical blobs
    pub storage_root: PathBuf,
    /// Largest accepted upload; `None` disables the check
    pub max_upload_bytes: Option<u64>,
    /// Age after which a staged blob is swept
    pub staging_ttl_secs: u64,
}

impl FilesConfig {
    /// Staging age threshold as a duration.
    pub fn staging_ttl(&self) -> Duration {
        Duration::from_secs(self.staging_ttl_secs)
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("/clonebox/uploads"),
            max_upload_bytes: Some(crate::DEFAULT_MAX_UPLOAD_BYTES),
            staging_ttl_secs: 3600,
        }
    }
}

/// Registry database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL URL; `DATABASE_URL` is used when unset
    pub url: Option<String>,
    /// Pool size
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Configured URL, falling back to the `DATABASE_URL` environment variable.
    pub fn resolved_url(&self) -> CloneboxResult<String> {
        match &self.url {
            Some(url) => Ok(url.clone()),
            None => std::env::var("DATABASE_URL").map_err(|_| {
                ConfigError::for_key("database.url", "not set and DATABASE_URL is missing").into()
            }),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 8,
        }
    }
}

/// Log output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete Clonebox configuration.
///
/// # Example
///
/// ```no_run
/// use clonebox::CloneboxConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = CloneboxConfig::load()?;
/// assert!(config.links.max_attempts >= 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloneboxConfig {
    /// Link settings
    pub links: LinksConfig,
    /// Upload settings
    pub files: FilesConfig,
    /// Registry settings
    pub database: DatabaseConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl CloneboxConfig {
    /// Load with the full precedence chain and validate.
    ///
    /// # Errors
    ///
    /// Returns an error if a source fails to parse or a value is out of range.
    #[instrument]
    pub fn load() -> CloneboxResult<Self> {
        debug!("Loading configuration with precedence: env > current dir > home dir > bundled defaults");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/clonebox/clonebox.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder
            .add_source(File::with_name("clonebox").required(false))
            .add_source(
                Environment::with_prefix("CLONEBOX")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        Self::finish(builder)
    }

    /// Load bundled defaults overlaid with a single file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, fails to parse, or holds an
    /// out-of-range value.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> CloneboxResult<Self> {
        let builder = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from(path.as_ref()));
        Self::finish(builder)
    }

    /// Bundled defaults only.
    pub fn bundled() -> CloneboxResult<Self> {
        let builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));
        Self::finish(builder)
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> CloneboxResult<Self> {
        let config: Self = builder
            .build()
            .map_err(|e| {
                CloneboxError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                CloneboxError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` naming the first offending key.
    pub fn validate(&self) -> CloneboxResult<()> {
        Sha256Resolver::new(self.links.identifier_bytes)?;
        if self.links.max_attempts == 0 {
            return Err(ConfigError::for_key("links.max_attempts", "must be at least 1").into());
        }
        if self.files.max_upload_bytes == Some(0) {
            return Err(
                ConfigError::for_key("files.max_upload_bytes", "must be positive").into(),
            );
        }
        if self.database.max_connections == 0 {
            return Err(
                ConfigError::for_key("database.max_connections", "must be at least 1").into(),
            );
        }
        Ok(())
    }
}
