use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use foodninja_lib::commands::history::HistoryKind;
use foodninja_lib::commands::{self, OutputFormat};
use foodninja_lib::offline::AssetCache;
use foodninja_lib::settings::LogLevel;
use foodninja_lib::{bootstrap, BootstrapOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "foodninja")]
#[command(about = "FoodNinja - food recognition, nutrition and AI advice", long_about = None)]
struct Cli {
    /// Backend origin, e.g. https://api.example.com (overrides FOODNINJA_API_BASE)
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Origin the client is served from; decides same-origin vs. local backend
    #[arg(long, global = true)]
    page_url: Option<String>,

    /// Directory holding settings and history
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Keep history in memory only
    #[arg(long, global = true)]
    ephemeral: bool,

    /// Print HTML markup instead of plain text
    #[arg(long, global = true)]
    html: bool,

    #[arg(long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<CliLogLevel> for LogLevel {
    fn from(level: CliLogLevel) -> Self {
        match level {
            CliLogLevel::Trace => LogLevel::Trace,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Error => LogLevel::Error,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Recognize the food in an image
    Predict {
        image: PathBuf,
        /// Send the image as a camera capture (JPEG frame)
        #[arg(long)]
        capture: bool,
        /// On a low-confidence result, ask AI about the top suggestion
        #[arg(long)]
        ask_ai: bool,
    },
    /// Ask AI about a food
    Ask { food_name: String },
    /// Chat with the nutrition assistant (interactive without a message)
    Chat { message: Vec<String> },
    /// Show or clear local history
    History {
        #[arg(value_enum)]
        kind: CliHistoryKind,
        #[arg(long)]
        clear: bool,
    },
    /// Manage the offline shell cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CliHistoryKind {
    Chat,
    Recognition,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Download the shell assets and purge old cache generations
    Install,
    /// Serve a path cache-first
    Get {
        path: String,
        /// Treat the request as a page navigation
        #[arg(long)]
        navigate: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let format = if cli.html {
        OutputFormat::Html
    } else {
        OutputFormat::Text
    };

    let context = bootstrap(BootstrapOptions {
        data_dir: cli.data_dir,
        api_base: cli.api_base,
        page_url: cli.page_url,
        log_level: cli.log_level.map(LogLevel::from),
        ephemeral: cli.ephemeral,
    })
    .map_err(|e| anyhow!(e))?;

    let settings = context.settings;
    let mut state = context.state;

    let outcome = match cli.command {
        Commands::Predict {
            image,
            capture,
            ask_ai,
        } => commands::recognition::predict(&mut state, &image, capture, ask_ai, format).await,
        Commands::Ask { food_name } => {
            commands::recognition::ask(&mut state, &food_name, format).await
        }
        Commands::Chat { message } => {
            let message = if message.is_empty() {
                None
            } else {
                Some(message.join(" "))
            };
            commands::chat::chat(&mut state, message, format).await
        }
        Commands::History { kind, clear } => {
            let kind = match kind {
                CliHistoryKind::Chat => HistoryKind::Chat,
                CliHistoryKind::Recognition => HistoryKind::Recognition,
            };
            if clear {
                commands::history::clear(&mut state, kind).await
            } else {
                commands::history::show(&state, kind, format)
            }
        }
        Commands::Cache { action } => {
            let cache = AssetCache::current(settings.resolved_cache_dir(&context.data_dir));
            match action {
                CacheAction::Install => commands::offline::install(&cache, &settings.page_url).await,
                CacheAction::Get { path, navigate } => {
                    commands::offline::get(&cache, &settings.page_url, &path, navigate).await
                }
            }
        }
    };

    outcome.map_err(|e| anyhow!(e))
}
