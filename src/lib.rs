pub mod api;
pub mod app;
pub mod chat;
pub mod commands;
pub mod history;
pub mod markup;
pub mod offline;
pub mod recognition;
pub mod settings;
pub mod store;

use api::HttpFoodApi;
use app::AppState;
use history::HistoryStore;
use log::{debug, info};
use settings::{
    data_dir, load_or_create_app_settings, AppSettings, LogLevel, HISTORY_STORE_PATH,
    SETTINGS_STORE_PATH,
};
use std::path::PathBuf;
use std::sync::Arc;
use store::{JsonStore, MemoryStorage, StorageArea};

/// Overrides collected from the command line.
#[derive(Debug, Clone, Default)]
pub struct BootstrapOptions {
    pub data_dir: Option<PathBuf>,
    pub api_base: Option<String>,
    pub page_url: Option<String>,
    pub log_level: Option<LogLevel>,
    /// Keep history in memory only.
    pub ephemeral: bool,
}

pub struct AppContext {
    pub settings: AppSettings,
    pub data_dir: PathBuf,
    pub state: AppState,
}

/// Initializes `env_logger`. `RUST_LOG`, when set, still takes precedence.
pub fn init_logging(level: LogLevel) {
    let _ = env_logger::Builder::new()
        .filter_level(level.into())
        .parse_default_env()
        .try_init();
}

/// Loads settings, applies overrides, and wires the API client and history
/// store into a fresh [`AppState`].
pub fn bootstrap(options: BootstrapOptions) -> Result<AppContext, String> {
    let data_dir = options.data_dir.clone().unwrap_or_else(data_dir);
    let settings_store = JsonStore::open(data_dir.join(SETTINGS_STORE_PATH));

    let mut settings = load_or_create_app_settings(&settings_store);
    debug!("Settings loaded from {}", settings_store.path().display());
    settings.apply_env_overrides();
    if let Some(api_base) = options.api_base {
        settings.api_base = Some(api_base);
    }
    if let Some(page_url) = options.page_url {
        settings.page_url = page_url;
    }
    if let Some(level) = options.log_level {
        settings.log_level = level;
    }

    init_logging(settings.log_level);
    info!("FoodNinja data directory: {}", data_dir.display());

    let storage: Arc<dyn StorageArea> = if options.ephemeral {
        Arc::new(MemoryStorage::new())
    } else {
        Arc::new(JsonStore::open(data_dir.join(HISTORY_STORE_PATH)))
    };
    let history = HistoryStore::with_limit(storage, settings.history_limit);

    let api = HttpFoodApi::from_settings(&settings)?;
    let state = AppState::new(Arc::new(api), history);

    Ok(AppContext {
        settings,
        data_dir,
        state,
    })
}
