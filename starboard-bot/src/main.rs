use dotenv::dotenv;
use serenity::all::Http;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

mod channels;
mod config;
mod db;
mod error;
mod guild_store;
mod models;
mod pins;
mod starboard;
mod watchlist;

use channels::{start_discord_listener, SerenityTransport};
use config::Config;
use db::Database;
use guild_store::SqliteGuildStore;
use starboard::Starboard;

/// Cancel `shutdown` on Ctrl+C or SIGTERM
async fn wait_for_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => log::info!("Received Ctrl+C"),
        _ = terminate => log::info!("Received SIGTERM"),
    }
    shutdown.cancel();
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    log::info!("Initializing database at {}", config.database_url);
    let db = match Database::new(&config.database_url) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            log::error!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let store = Arc::new(SqliteGuildStore::new(db, config.store_timeout));
    let http = Arc::new(Http::new(&config.discord_token));
    let transport = Arc::new(SerenityTransport::new(http, config.transport_timeout));

    let options = config.sync_options();
    log::info!(
        "Starboard: prefix '{}', destructive={}, persist={:?}",
        config.command_prefix,
        options.destructive,
        options.persist
    );

    let shutdown = CancellationToken::new();
    let starboard = Arc::new(Starboard::new(
        store,
        transport,
        options,
        &config.command_prefix,
        shutdown.clone(),
    ));

    tokio::spawn(wait_for_signal(shutdown.clone()));

    log::info!("Starting Discord listener");
    if let Err(e) = start_discord_listener(&config, starboard, shutdown).await {
        log::error!("{}", e);
        std::process::exit(1);
    }
    log::info!("Starboard stopped");
}
