//! Settings - layered daemon configuration
//!
//! Sources, lowest precedence first: built-in defaults, an optional TOML file
//! (`GATHER_CONFIG`, default `gather.toml`), then `GATHER__SECTION__KEY`
//! environment variables.

use config::{Config, ConfigError, Environment, File, FileFormat};
use gather_core::application::{ConflictConfig, HoldConfig, JobsConfig};
use gather_core::domain::{Venue, VenueDirectory};
use gather_core::port::RetentionConfig;
use serde::Deserialize;

pub const CONFIG_PATH_ENV: &str = "GATHER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "gather.toml";
const ENV_PREFIX: &str = "GATHER";
const ENV_SEPARATOR: &str = "__";

const DEFAULT_DATABASE_URL: &str = "sqlite://gather.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub log: LogSettings,
    pub conflict: ConflictConfig,
    pub holds: HoldConfig,
    pub jobs: JobsConfig,
    pub retention: RetentionConfig,
    pub venues: Vec<VenueSettings>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub format: LogFormat,
    /// Daily-rotated log files go here when set
    pub directory: Option<String>,
}

/// One known venue, flat so it reads naturally in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct VenueSettings {
    pub name: String,
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl VenueSettings {
    fn to_venue(&self) -> Venue {
        let venue = Venue::new(self.name.clone(), self.city.clone());
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => venue.with_coordinates(latitude, longitude),
            _ => venue,
        }
    }
}

impl Settings {
    /// Load from `$GATHER_CONFIG` (or `gather.toml`) and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    /// Load from an explicit file path; a missing file leaves the defaults
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(File::new(path, FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Message("database.url must not be empty".into()));
        }
        if self.conflict.max_suggestions == 0 {
            return Err(ConfigError::Message(
                "conflict.max_suggestions must be at least 1".into(),
            ));
        }
        if self.holds.call_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "holds.call_timeout_ms must be positive".into(),
            ));
        }
        self.jobs
            .validate()
            .and_then(|_| self.retention.validate(self.jobs.dedupe_horizon_days()))
            .map_err(|e| ConfigError::Message(e.to_string()))
    }

    pub fn venue_directory(&self) -> VenueDirectory {
        VenueDirectory::new(self.venues.iter().map(VenueSettings::to_venue).collect())
    }
}
