use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use rssbot::bot::command_catalog;
use rssbot::{
    ChatTransport, Config, ConsoleTransport, Database, Dispatcher, RefreshEngine, RssFetcher,
    RssService, SqliteStore,
};

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    // Load configuration
    let config = match Config::load_with_env(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        std::process::exit(1);
    }

    // Initialize logging
    if let Err(e) = rssbot::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        rssbot::logging::init_console_only(&config.logging.level);
    }

    info!("Starting rss bot");

    let code = match run(config).await {
        Ok(()) => 0,
        Err(e) => {
            error!("rss bot stopped: {}", e);
            1
        }
    };

    // A pending stdin read holds a blocking thread that runtime shutdown would wait on.
    std::process::exit(code);
}

async fn run(config: Config) -> rssbot::Result<()> {
    let db = Database::open(&config.database.path, config.database.max_connections).await?;

    let store = Arc::new(SqliteStore::new(db.pool().clone()));
    let fetcher = Arc::new(RssFetcher::from_config(&config.rss)?);
    let transport = Arc::new(ConsoleTransport::stdio());

    let engine = RefreshEngine::new(store.clone(), fetcher, transport.clone(), &config.rss);
    let service = Arc::new(RssService::new(store, engine));
    let mut dispatcher = Dispatcher::new(service, transport.clone(), &config.bot);

    info!("Clearing commands to start bot");
    if let Err(e) = transport.clear_commands().await {
        warn!("Failed to clear commands: {}", e);
    }
    transport
        .advertise_commands(&command_catalog(&config.bot.command_prefix))
        .await?;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            message = transport.next_message() => match message {
                Ok(Some(message)) => {
                    // A full pool must not hold up a shutdown signal
                    if dispatcher.dispatch_until(message, &mut shutdown).await.is_none() {
                        info!("Shutdown signal received while waiting for a command slot");
                        break;
                    }
                }
                Ok(None) => {
                    info!("Chat input closed");
                    break;
                }
                Err(e) => {
                    error!("Failed to read from chat: {}", e);
                    break;
                }
            },
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    if let Err(e) = transport.clear_commands().await {
        error!("Failed to clear commands during cleanup: {}", e);
    }

    dispatcher
        .shutdown(Duration::from_secs(config.bot.shutdown_grace_secs))
        .await;
    db.close().await;

    info!("Shutting down rss bot");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
