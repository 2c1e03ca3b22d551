//! Configuration file support for Kennel.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/kennel/config.toml`.

use crate::{Error, Result};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Upper bound for `reminders.lookahead_days`
pub const MAX_LOOKAHEAD_DAYS: i64 = 366;

/// Upper bound for `heat.default_interval_days`
pub const MAX_HEAT_INTERVAL_DAYS: i64 = 730;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub heat: HeatConfig,

    #[serde(default)]
    pub reminders: ReminderConfig,

    #[serde(default)]
    pub calendar: CalendarConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Heat cycle prediction parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HeatConfig {
    /// Interval used when a dog has fewer than two recorded heats
    #[serde(default = "default_heat_interval_days")]
    pub default_interval_days: i64,
}

impl Default for HeatConfig {
    fn default() -> Self {
        Self {
            default_interval_days: default_heat_interval_days(),
        }
    }
}

/// Reminder generation parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReminderConfig {
    #[serde(default = "default_lookahead_days")]
    pub lookahead_days: i64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            lookahead_days: default_lookahead_days(),
        }
    }
}

/// First day of a calendar week
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    Monday,
    Sunday,
}

impl WeekStart {
    pub fn weekday(self) -> Weekday {
        match self {
            WeekStart::Monday => Weekday::Mon,
            WeekStart::Sunday => Weekday::Sun,
        }
    }
}

/// Calendar grid rendering configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default = "default_max_visible_events")]
    pub max_visible_events: usize,

    #[serde(default = "default_max_pregnancy_lanes")]
    pub max_pregnancy_lanes: usize,

    #[serde(default = "default_week_start")]
    pub week_starts_on: WeekStart,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            max_visible_events: default_max_visible_events(),
            max_pregnancy_lanes: default_max_pregnancy_lanes(),
            week_starts_on: default_week_start(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|_| PathBuf::from("."))
    });
    base.join("kennel")
}

fn default_heat_interval_days() -> i64 {
    180
}

fn default_lookahead_days() -> i64 {
    30
}

fn default_max_visible_events() -> usize {
    3
}

fn default_max_pregnancy_lanes() -> usize {
    3
}

fn default_week_start() -> WeekStart {
    WeekStart::Monday
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|_| PathBuf::from("."))
        });
        base.join("kennel").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !(1..=MAX_HEAT_INTERVAL_DAYS).contains(&self.heat.default_interval_days) {
            return Err(Error::Config(format!(
                "heat.default_interval_days must be between 1 and {}",
                MAX_HEAT_INTERVAL_DAYS
            )));
        }
        if !(0..=MAX_LOOKAHEAD_DAYS).contains(&self.reminders.lookahead_days) {
            return Err(Error::Config(format!(
                "reminders.lookahead_days must be between 0 and {}",
                MAX_LOOKAHEAD_DAYS
            )));
        }
        if self.calendar.max_visible_events == 0 {
            return Err(Error::Config(
                "calendar.max_visible_events must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
