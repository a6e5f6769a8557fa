//! Server configuration
//!
//! Loaded from a YAML or TOML file (by extension), then overridden by
//! `STOREGATE_*` environment variables, then by CLI flags.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use storegate_routing::TenantRoutingConfig;

/// Where store records come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DirectorySource {
    /// YAML/TOML registry on disk
    #[default]
    File,
    /// `stores` collection of the document store
    Documents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub tenancy: TenantRoutingConfig,

    #[serde(default)]
    pub directory: DirectoryConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default)]
    pub source: DirectorySource,

    /// Store registry file; with `documents` it seeds the collection
    #[serde(default = "default_stores_file")]
    pub stores_file: Option<String>,

    /// Reload the registry file when it changes
    #[serde(default = "default_true")]
    pub watch: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for file buckets; files are kept in memory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            tenancy: TenantRoutingConfig::default(),
            directory: DirectoryConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            source: DirectorySource::default(),
            stores_file: default_stores_file(),
            watch: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Validation(String),
}

impl ServerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = expand(path.as_ref());
        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::FileRead {
            path: path.clone(),
            source,
        })?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents)
                .map_err(|e| ConfigError::Parse(format!("TOML parse error: {}", e)))?
        } else {
            // Default to YAML
            serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::Parse(format!("YAML parse error: {}", e)))?
        };

        Ok(config)
    }

    /// Merge environment variables into config (env vars take precedence)
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("STOREGATE_HOST") {
            self.host = val;
        }

        if let Ok(val) = std::env::var("STOREGATE_PORT") {
            match val.parse::<u16>() {
                Ok(port) => self.port = port,
                Err(_) => tracing::warn!("Ignoring invalid STOREGATE_PORT '{}'", val),
            }
        }

        // Tenancy
        if let Ok(val) = std::env::var("STOREGATE_MAIN_DOMAIN") {
            self.tenancy.main_domain = Some(val).filter(|v| !v.is_empty());
        }

        if let Ok(val) = std::env::var("STOREGATE_RESERVED_SUBDOMAINS") {
            self.tenancy.reserved_subdomains = val
                .split(',')
                .map(|label| label.trim().to_lowercase())
                .filter(|label| !label.is_empty())
                .collect();
        }

        if let Ok(val) = std::env::var("STOREGATE_PREVIEW_HOST_SUFFIX") {
            self.tenancy.preview_host_suffix = Some(val).filter(|v| !v.is_empty());
        }

        // Directory and storage
        if let Ok(val) = std::env::var("STOREGATE_STORES_FILE") {
            self.directory.stores_file = Some(val);
        }

        if let Ok(val) = std::env::var("STOREGATE_BUCKET_DIR") {
            self.storage.bucket_dir = Some(val);
        }

        if let Ok(val) = std::env::var("STOREGATE_LOG_LEVEL") {
            self.logging.level = val;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tenancy
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        if self.directory.source == DirectorySource::File && self.directory.stores_file.is_none() {
            return Err(ConfigError::Validation(
                "directory.stores_file is required when directory.source is 'file'".to_string(),
            ));
        }

        if self.host.trim().is_empty() {
            return Err(ConfigError::Validation("host cannot be empty".to_string()));
        }

        Ok(())
    }

    pub fn stores_file_path(&self) -> Option<PathBuf> {
        self.directory
            .stores_file
            .as_deref()
            .map(|p| expand(Path::new(p)))
    }

    pub fn bucket_dir_path(&self) -> Option<PathBuf> {
        self.storage
            .bucket_dir
            .as_deref()
            .map(|p| expand(Path::new(p)))
    }
}

/// Expand `~` in a configured path
fn expand(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&path_str).as_ref())
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_stores_file() -> Option<String> {
    Some("~/.storegate/stores.yaml".to_string())
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
