use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calendar::{DEFAULT_CALENDAR_COLOR, DEFAULT_HOLIDAY_YEARS};
use crate::storage::file_store::DATA_FILE_NAME;

pub const APP_DIR: &str = "tinymonth";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("Invalid holiday range: {first}..={last}")]
    InvalidHolidayRange { first: i32, last: i32 },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    File,
    Sqlite,
    Remote,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub holidays: HolidayConfig,
    pub calendars: CalendarsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_file: PathBuf,
    pub sqlite_file: PathBuf,
    pub remote_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HolidayConfig {
    pub first_year: i32,
    pub last_year: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarsConfig {
    pub default_color: String,
}

impl HolidayConfig {
    pub fn years(&self) -> RangeInclusive<i32> {
        self.first_year..=self.last_year
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_or_create() -> Result<Self, ConfigError> {
        Self::load_or_create_at(&Self::config_path())
    }

    pub fn load_or_create_at(config_path: &Path) -> Result<Self, ConfigError> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            Self::from_toml(&content)
        } else {
            let config = Self::default();
            config.save_to(config_path)?;
            tracing::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn save_to(&self, config_path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;

        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.holidays.first_year > self.holidays.last_year {
            return Err(ConfigError::InvalidHolidayRange {
                first: self.holidays.first_year,
                last: self.holidays.last_year,
            });
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);

        Self {
            storage: StorageConfig {
                backend: StorageBackend::File,
                data_file: data_dir.join(DATA_FILE_NAME),
                sqlite_file: data_dir.join("tinymonth.db"),
                remote_url: "http://127.0.0.1:3000".to_string(),
            },
            server: ServerConfig {
                bind: "127.0.0.1:3000".to_string(),
            },
            holidays: HolidayConfig {
                first_year: *DEFAULT_HOLIDAY_YEARS.start(),
                last_year: *DEFAULT_HOLIDAY_YEARS.end(),
            },
            calendars: CalendarsConfig {
                default_color: DEFAULT_CALENDAR_COLOR.to_string(),
            },
        }
    }
}
