#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Runtime configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! environment variables.
//!
//! The file is read from `$RAM_CONFIG` when set, otherwise from `ram.toml`
//! in the working directory if it exists.
//!
//! # Environment Variables
//!
//! | Variable | Field |
//! |---|---|
//! | `RAM_ENV` | `env` (`production`, `staging`, `test`) |
//! | `RAM_DATABASE_PATH` | `database_path` |
//! | `RAM_ROAD_NET_EDIT_MAX` | `road_net_edit_max` (bytes) |
//! | `RAM_SETUP_TIMEOUT_SECS` | `setup_timeout_secs` |
//! | `RAM_VECTOR_TILES` | `vector_tiles` |
//! | `RAM_OVERPASS_URL` | `overpass_url` |
//! | `RAM_CATALOG_URL` | `catalog_url` |
//! | `RAM_STORAGE_ENGINE` | `storage.engine` (`s3`, `local`) |
//! | `RAM_STORAGE_BUCKET` | `storage.bucket` |
//! | `RAM_STORAGE_ENDPOINT` | `storage.endpoint` |
//! | `RAM_STORAGE_REGION` | `storage.region` |
//! | `RAM_STORAGE_ACCESS_KEY` | `storage.access_key` |
//! | `RAM_STORAGE_SECRET_KEY` | `storage.secret_key` |
//! | `RAM_STORAGE_LOCAL_DIR` | `storage.local_dir` |

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Default maximum road network size (bytes) that is imported for editing.
pub const DEFAULT_ROAD_NET_EDIT_MAX: u64 = 20 * 1024 * 1024;

/// Default overall deadline for one scenario setup run.
pub const DEFAULT_SETUP_TIMEOUT_SECS: u64 = 3600;

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        /// File that was read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`Config`].
    #[error("Invalid config file {path}: {source}")]
    Parse {
        /// File that was parsed.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },

    /// An environment override could not be parsed.
    #[error("Invalid value for {name}: {value:?}")]
    Env {
        /// Variable name.
        name: String,
        /// Rejected value.
        value: String,
    },
}

/// Deployment environment.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Environment {
    /// Production.
    #[default]
    Production,
    /// Staging.
    Staging,
    /// Automated tests. Disables side effects such as vector tiles.
    Test,
}

/// Blob storage backend.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StorageEngine {
    /// S3-compatible bucket.
    S3,
    /// Local directory.
    #[default]
    Local,
}

/// Blob storage settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Which backend to use.
    pub engine: StorageEngine,
    /// S3 bucket.
    pub bucket: String,
    /// Custom S3 endpoint (`MinIO`, R2).
    pub endpoint: Option<String>,
    /// S3 region.
    pub region: String,
    /// S3 access key id.
    pub access_key: String,
    /// S3 secret access key.
    pub secret_key: String,
    /// Root directory for the local backend.
    pub local_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            engine: StorageEngine::default(),
            bucket: "ram".to_string(),
            endpoint: None,
            region: "auto".to_string(),
            access_key: String::new(),
            secret_key: String::new(),
            local_dir: PathBuf::from("data/storage"),
        }
    }
}

/// External programs that do the work the core delegates.
///
/// Each command is an argv list. `{project}`, `{scenario}` and `{path}`
/// placeholders are substituted before running. Unset commands disable the
/// corresponding step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    /// Imports a road network into the editable scenario database. The raw
    /// OSM XML is written to its stdin.
    pub import_road_network: Option<Vec<String>>,
    /// Deletes the editable scenario database.
    pub remove_database: Option<Vec<String>>,
    /// Renders vector tiles for a road network blob at `{path}`.
    pub vector_tiles: Option<Vec<String>>,
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Deployment environment.
    pub env: Environment,
    /// `DuckDB` scenario store file.
    pub database_path: PathBuf,
    /// Road networks at least this large (bytes) are not imported for
    /// editing.
    pub road_net_edit_max: u64,
    /// Overall deadline for one scenario setup run, in seconds.
    pub setup_timeout_secs: u64,
    /// Whether to render road network vector tiles after import.
    pub vector_tiles: bool,
    /// Overpass interpreter endpoint.
    pub overpass_url: String,
    /// CKAN catalog base URL.
    pub catalog_url: String,
    /// Blob storage.
    pub storage: StorageConfig,
    /// External collaborator commands.
    pub commands: CommandsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            env: Environment::default(),
            database_path: PathBuf::from("data/ram.duckdb"),
            road_net_edit_max: DEFAULT_ROAD_NET_EDIT_MAX,
            setup_timeout_secs: DEFAULT_SETUP_TIMEOUT_SECS,
            vector_tiles: true,
            overpass_url: "https://overpass-api.de/api/interpreter".to_string(),
            catalog_url: "https://energydata.info".to_string(),
            storage: StorageConfig::default(),
            commands: CommandsConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the default file location and the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or an
    /// environment override is malformed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os("RAM_CONFIG").map_or_else(
            || {
                let default = PathBuf::from("ram.toml");
                default.exists().then_some(default)
            },
            |p| Some(PathBuf::from(p)),
        );

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        config.apply_env(|name| std::env::var(name).ok())?;

        Ok(config)
    }

    /// Reads a TOML config file. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        log::debug!("Loaded config from {}", path.display());

        Self::from_toml(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns the TOML error if the document is invalid.
    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Applies `RAM_*` overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] for values that do not parse.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("RAM_ENV") {
            self.env = parse_env("RAM_ENV", &v)?;
        }
        if let Some(v) = lookup("RAM_DATABASE_PATH") {
            self.database_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("RAM_ROAD_NET_EDIT_MAX") {
            self.road_net_edit_max = parse_env("RAM_ROAD_NET_EDIT_MAX", &v)?;
        }
        if let Some(v) = lookup("RAM_SETUP_TIMEOUT_SECS") {
            self.setup_timeout_secs = parse_env("RAM_SETUP_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("RAM_VECTOR_TILES") {
            self.vector_tiles = parse_env("RAM_VECTOR_TILES", &v.to_lowercase())?;
        }
        if let Some(v) = lookup("RAM_OVERPASS_URL") {
            self.overpass_url = v;
        }
        if let Some(v) = lookup("RAM_CATALOG_URL") {
            self.catalog_url = v;
        }
        if let Some(v) = lookup("RAM_STORAGE_ENGINE") {
            self.storage.engine = parse_env("RAM_STORAGE_ENGINE", &v)?;
        }
        if let Some(v) = lookup("RAM_STORAGE_BUCKET") {
            self.storage.bucket = v;
        }
        if let Some(v) = lookup("RAM_STORAGE_ENDPOINT") {
            self.storage.endpoint = Some(v).filter(|s| !s.is_empty());
        }
        if let Some(v) = lookup("RAM_STORAGE_REGION") {
            self.storage.region = v;
        }
        if let Some(v) = lookup("RAM_STORAGE_ACCESS_KEY") {
            self.storage.access_key = v;
        }
        if let Some(v) = lookup("RAM_STORAGE_SECRET_KEY") {
            self.storage.secret_key = v;
        }
        if let Some(v) = lookup("RAM_STORAGE_LOCAL_DIR") {
            self.storage.local_dir = PathBuf::from(v);
        }

        Ok(())
    }

    /// Whether vector tiles should be rendered. Always off under test.
    #[must_use]
    pub fn vector_tiles_enabled(&self) -> bool {
        self.vector_tiles && self.env != Environment::Test
    }

    /// Overall setup deadline.
    #[must_use]
    pub const fn setup_timeout(&self) -> Duration {
        Duration::from_secs(self.setup_timeout_secs)
    }
}

fn parse_env<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        name: name.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.road_net_edit_max, 20 * 1024 * 1024);
        assert_eq!(config.setup_timeout(), Duration::from_secs(3600));
        assert_eq!(config.storage.engine, StorageEngine::Local);
        assert!(config.vector_tiles_enabled());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            road_net_edit_max = 1024

            [storage]
            engine = "s3"
            bucket = "ram-data"
            endpoint = "http://localhost:9000"

            [commands]
            import_road_network = ["ram-osm-import", "--project", "{project}", "--scenario", "{scenario}"]
            "#,
        )
        .unwrap();

        assert_eq!(config.road_net_edit_max, 1024);
        assert_eq!(config.setup_timeout_secs, DEFAULT_SETUP_TIMEOUT_SECS);
        assert_eq!(config.storage.engine, StorageEngine::S3);
        assert_eq!(config.storage.region, "auto");
        assert_eq!(
            config.commands.import_road_network.as_deref().map(<[String]>::len),
            Some(5)
        );
        assert!(config.commands.vector_tiles.is_none());
    }

    #[test]
    fn env_overrides_file() {
        let mut config = Config::from_toml("road_net_edit_max = 1024").unwrap();
        config
            .apply_env(env(&[
                ("RAM_ROAD_NET_EDIT_MAX", "2048"),
                ("RAM_ENV", "TEST"),
                ("RAM_STORAGE_ENGINE", "s3"),
                ("RAM_STORAGE_ENDPOINT", ""),
            ]))
            .unwrap();

        assert_eq!(config.road_net_edit_max, 2048);
        assert_eq!(config.env, Environment::Test);
        assert_eq!(config.storage.engine, StorageEngine::S3);
        assert_eq!(config.storage.endpoint, None);
        assert!(!config.vector_tiles_enabled());
    }

    #[test]
    fn bad_env_value_is_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_env(env(&[("RAM_SETUP_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { name, .. } if name == "RAM_SETUP_TIMEOUT_SECS"));
    }

    #[test]
    fn vector_tiles_flag_parses_case_insensitively() {
        let mut config = Config::default();
        config
            .apply_env(env(&[("RAM_VECTOR_TILES", "FALSE")]))
            .unwrap();
        assert!(!config.vector_tiles_enabled());
    }

    #[test]
    fn reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ram.toml");
        std::fs::write(&path, "setup_timeout_secs = 60\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.setup_timeout(), Duration::from_secs(60));

        let missing = Config::from_file(&dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
