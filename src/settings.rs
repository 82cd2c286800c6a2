use crate::store::JsonStore;
use log::{debug, warn};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

pub const SETTINGS_STORE_PATH: &str = "settings_store.json";
pub const HISTORY_STORE_PATH: &str = "history_store.json";
pub const API_BASE_ENV: &str = "FOODNINJA_API_BASE";

const SETTINGS_KEY: &str = "settings";

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

// Accepts both the numeric form (1-5) and the string form ("trace", "debug", etc.)
impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct LogLevelVisitor;

        impl<'de> Visitor<'de> for LogLevelVisitor {
            type Value = LogLevel;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a string or integer representing log level")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<LogLevel, E> {
                match value.to_lowercase().as_str() {
                    "trace" => Ok(LogLevel::Trace),
                    "debug" => Ok(LogLevel::Debug),
                    "info" => Ok(LogLevel::Info),
                    "warn" => Ok(LogLevel::Warn),
                    "error" => Ok(LogLevel::Error),
                    _ => Err(E::unknown_variant(
                        value,
                        &["trace", "debug", "info", "warn", "error"],
                    )),
                }
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<LogLevel, E> {
                match value {
                    1 => Ok(LogLevel::Trace),
                    2 => Ok(LogLevel::Debug),
                    3 => Ok(LogLevel::Info),
                    4 => Ok(LogLevel::Warn),
                    5 => Ok(LogLevel::Error),
                    _ => Err(E::invalid_value(de::Unexpected::Unsigned(value), &"1-5")),
                }
            }
        }

        deserializer.deserialize_any(LogLevelVisitor)
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AppSettings {
    /// Explicit backend origin. Takes precedence over host-based resolution.
    #[serde(default)]
    pub api_base: Option<String>,
    /// The page origin the client is served from.
    #[serde(default = "default_page_url")]
    pub page_url: String,
    /// Entries kept per history list. Values above 100 are clamped.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

fn default_page_url() -> String {
    "http://localhost".to_string()
}

fn default_history_limit() -> usize {
    crate::history::DEFAULT_HISTORY_LIMIT
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

pub fn get_default_settings() -> AppSettings {
    AppSettings {
        api_base: None,
        page_url: default_page_url(),
        history_limit: default_history_limit(),
        request_timeout_secs: default_request_timeout_secs(),
        log_level: default_log_level(),
        cache_dir: None,
    }
}

impl AppSettings {
    /// Applies `FOODNINJA_API_BASE` when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(base) = std::env::var(API_BASE_ENV) {
            debug!("{} overrides api_base", API_BASE_ENV);
            self.api_base = Some(base);
        }
    }

    pub fn resolved_cache_dir(&self, data_dir: &std::path::Path) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| data_dir.join("offline"))
    }
}

/// Directory holding the settings and history stores.
pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("foodninja")
}

pub fn load_or_create_app_settings(store: &JsonStore) -> AppSettings {
    if let Some(settings_value) = store.get(SETTINGS_KEY) {
        match serde_json::from_value::<AppSettings>(settings_value) {
            Ok(settings) => {
                debug!("Found existing settings: {:?}", settings);
                settings
            }
            Err(e) => {
                warn!("Failed to parse settings: {}", e);
                // Fall back to default settings if parsing fails
                let default_settings = get_default_settings();
                write_settings(store, &default_settings);
                default_settings
            }
        }
    } else {
        let default_settings = get_default_settings();
        write_settings(store, &default_settings);
        default_settings
    }
}

pub fn write_settings(store: &JsonStore, settings: &AppSettings) {
    let value = match serde_json::to_value(settings) {
        Ok(value) => value,
        Err(e) => {
            warn!("Failed to serialize settings: {}", e);
            return;
        }
    };
    if let Err(e) = store.set(SETTINGS_KEY, value) {
        warn!("Failed to write settings: {}", e);
    }
}
