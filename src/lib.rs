//! Barkeep: Telegram cocktail finder.
//! Main library: configuration, component wiring and the polling loop.

pub mod bot;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod lookup;
pub mod metrics;
pub mod model;
pub mod scheduler;
pub mod session;
pub mod telegram;
pub mod translate;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use bot::{Dispatcher, Handlers};
use cache::memory::MemoryCacheStore;
use cache::sqlite::SqliteCacheStore;
use cache::{CacheError, CacheStore};
use catalog::cocktaildb::CocktailDbClient;
use catalog::CatalogError;
use config::{BotConfig, ConfigError};
use lookup::LookupService;
use metrics::MetricsRegistry;
use scheduler::{ChatScheduler, UpdateHandler, UpdateSource};
use session::{InMemorySessionStore, SessionStore};
use telegram::client::TelegramClient;
use telegram::{Messenger, TelegramError};
use translate::libre::LibreTranslateClient;
use translate::script::ScriptDetector;
use translate::{TranslateError, TranslationBackend, TranslationService};

/// Failure to bring the bot up. Nothing after startup is fatal.
#[derive(Debug)]
pub enum BootError {
    Config(ConfigError),
    Cache(CacheError),
    Http(String),
    Script(regex::Error),
}

impl std::fmt::Display for BootError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BootError::Config(e) => write!(f, "configuration error: {e}"),
            BootError::Cache(e) => write!(f, "cache unavailable: {e}"),
            BootError::Http(msg) => write!(f, "http client setup failed: {msg}"),
            BootError::Script(e) => write!(f, "script detector setup failed: {e}"),
        }
    }
}

impl std::error::Error for BootError {}

impl From<ConfigError> for BootError {
    fn from(e: ConfigError) -> Self {
        BootError::Config(e)
    }
}

impl From<CacheError> for BootError {
    fn from(e: CacheError) -> Self {
        BootError::Cache(e)
    }
}

impl From<CatalogError> for BootError {
    fn from(e: CatalogError) -> Self {
        BootError::Http(e.to_string())
    }
}

impl From<TranslateError> for BootError {
    fn from(e: TranslateError) -> Self {
        BootError::Http(e.to_string())
    }
}

impl From<TelegramError> for BootError {
    fn from(e: TelegramError) -> Self {
        BootError::Http(e.to_string())
    }
}

/// Fully wired bot, ready to poll.
pub struct App {
    pub telegram: Arc<TelegramClient>,
    pub scheduler: Arc<ChatScheduler>,
    pub metrics: Arc<MetricsRegistry>,
}

/// Build every component from configuration.
pub fn build(config: &BotConfig) -> Result<App, BootError> {
    let metrics = Arc::new(MetricsRegistry::new());

    let cache: Arc<dyn CacheStore> = match &config.cache_db_path {
        Some(path) => Arc::new(SqliteCacheStore::open(path)?),
        None => {
            warn!("CACHE_DB_PATH is empty, cache lives in memory only");
            Arc::new(MemoryCacheStore::new())
        }
    };

    let backend: Arc<dyn TranslationBackend> =
        Arc::new(LibreTranslateClient::new(&config.translation)?);
    let translator = Arc::new(TranslationService::new(
        backend,
        config.translation.enabled,
        Arc::clone(&metrics),
    ));
    if !translator.is_enabled() {
        warn!("translation disabled, results stay in English");
    }

    let script =
        ScriptDetector::for_language(&config.translation.target_lang).map_err(BootError::Script)?;
    let catalog = Arc::new(CocktailDbClient::new(&config.cocktaildb_base_url)?);
    let lookup = Arc::new(LookupService::new(
        translator,
        catalog,
        cache,
        script,
        Arc::clone(&metrics),
    ));

    let telegram = Arc::new(TelegramClient::new(
        &config.telegram_api_url,
        &config.bot_token,
    )?);
    let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
    let messenger: Arc<dyn Messenger> = Arc::clone(&telegram) as Arc<dyn Messenger>;
    let handlers = Handlers::new(lookup, Arc::clone(&sessions), messenger);
    let dispatcher: Arc<dyn UpdateHandler> = Arc::new(Dispatcher::new(
        sessions,
        handlers,
        config.bot_name.clone(),
        Arc::clone(&metrics),
    ));
    let scheduler = Arc::new(ChatScheduler::new(dispatcher, Arc::clone(&metrics)));

    Ok(App {
        telegram,
        scheduler,
        metrics,
    })
}

/// `LOG_FORMAT=json` switches to one JSON object per line.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("barkeep=debug,info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Load configuration from the environment and serve until Ctrl-C.
pub async fn run() -> Result<(), BootError> {
    init_tracing();

    info!("barkeep starting");
    let config = BotConfig::from_env()?;
    info!(
        bot = %config.bot_name,
        catalog = %config.cocktaildb_base_url,
        translator = %config.translation.url,
        target_lang = %config.translation.target_lang,
        translation_enabled = config.translation.enabled,
        cache = ?config.cache_db_path,
        "configuration loaded"
    );

    let app = build(&config)?;

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown requested"),
            Err(e) => warn!(error = %e, "cannot listen for Ctrl-C, stopping"),
        }
        on_signal.cancel();
    });

    let source: Arc<dyn UpdateSource> = app.telegram;
    scheduler::run_polling(source, app.scheduler, config.poll_timeout, shutdown).await;

    app.metrics.log_summary();
    info!("barkeep stopped");
    Ok(())
}
