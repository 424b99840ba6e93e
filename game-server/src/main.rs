use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use game_core::{
    DEFAULT_WORD_LENGTH, Environment, RoomEventBus, RoomRegistry, SystemEnvironment, WordList,
    WordSource, spawn_timeout_sweeper,
};
use game_server::{config::Config, create_routes, websocket::ConnectionManager};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting class server...");

    let config = Config::from_env().context("Invalid configuration")?;
    let env: Arc<dyn Environment> = Arc::new(SystemEnvironment);

    let word_source: Arc<dyn WordSource> = match &config.words_file {
        Some(words_file) => {
            info!("Loading words from {}", words_file.display());
            let list = WordList::from_files(
                words_file,
                config.answers_file.as_ref(),
                config.word_length,
                env.clone(),
            )?;
            Arc::new(list)
        }
        None => {
            if config.word_length != DEFAULT_WORD_LENGTH {
                warn!(
                    "WORD_LENGTH={} ignored: the built-in list only has {}-letter words",
                    config.word_length, DEFAULT_WORD_LENGTH
                );
            }
            info!("No WORDS_FILE configured, using the built-in word list");
            Arc::new(WordList::with_default_words(env.clone()))
        }
    };

    // Room events go out over WebSocket subscriptions
    let connection_manager = Arc::new(ConnectionManager::new());
    let event_bus = Arc::new(RoomEventBus::new());
    event_bus.add_handler(connection_manager.clone());

    let registry = Arc::new(RoomRegistry::new(word_source, event_bus, env));

    let sweeper = spawn_timeout_sweeper(registry.clone(), config.sweep_interval());

    // Start cleanup task
    let cleanup_task = {
        let registry = registry.clone();
        let connection_manager = connection_manager.clone();
        let room_cleanup = config.room_cleanup();
        let cleanup_interval = config.cleanup_interval();
        let connection_timeout = config.connection_timeout();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(cleanup_interval);
            loop {
                interval.tick().await;
                connection_manager.cleanup_inactive_connections(connection_timeout);
                room_cleanup.cleanup_idle_rooms(&registry);
            }
        })
    };

    let routes = create_routes(registry.clone(), connection_manager.clone());
    let addr = config.socket_addr()?;

    info!("Server starting on {}", addr);
    let (addr, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(addr, shutdown_signal())
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Server started successfully on {}. Press Ctrl+C to stop.", addr);
    server.await;

    sweeper.abort();
    cleanup_task.abort();
    info!(
        "Server shutdown complete ({} rooms dropped).",
        registry.room_count()
    );
    Ok(())
}

/// Resolves on SIGINT or SIGTERM (Ctrl+C elsewhere).
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match (
            signal(SignalKind::interrupt()),
            signal(SignalKind::terminate()),
        ) {
            (Ok(mut sigint), Ok(mut sigterm)) => {
                tokio::select! {
                    _ = sigint.recv() => {
                        info!("Received SIGINT, shutting down gracefully...");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down gracefully...");
                    }
                }
            }
            _ => {
                error!("Failed to install signal handlers, falling back to Ctrl+C");
                wait_for_ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down gracefully..."),
        Err(e) => {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
