use eyre::Result;
use serenity::{Client, http::Http, prelude::GatewayIntents};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info};

pub mod commands;
pub mod config;
pub mod countdown;
pub mod handlers;
pub mod platform;
pub mod routing;
pub mod state;
pub mod voice;

/// Start the Discord bot with the provided configuration.
///
/// This function wires up the shared state, voice support and event handler,
/// then runs the bot until it disconnects, fails, or receives Ctrl-C.
///
/// # Arguments
///
/// * `config` - The bot configuration containing token, voice settings, etc.
///
/// # Returns
///
/// * `Ok(())` if the bot shut down gracefully
/// * `Err` if an error occurred during initialization or operation
pub async fn start_bot(config: config::BotConfig) -> Result<()> {
    info!("Starting Discord bot");

    let token = if config.token.starts_with("Bot ") {
        config.token.clone()
    } else {
        format!("Bot {}", config.token)
    };
    let http = Arc::new(Http::new(&token));
    let songbird = Songbird::serenity();

    let (state, voice_events) = state::BotState::new(config.clone(), http, songbird.clone());
    tokio::spawn(handlers::voice::run_voice_events(state.clone(), voice_events));

    let handler = handlers::Handler::new(state.clone());

    // Voice states come with the non-privileged intents
    let mut client = Client::builder(&config.token, GatewayIntents::non_privileged())
        .event_handler(handler)
        .register_songbird_with(songbird)
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {:?}", e);
            return;
        }

        info!("Shutdown signal received");
        state.shutdown().await;
        shard_manager.lock().await.shutdown_all().await;
    });

    // Start the client
    info!("Connecting to Discord...");
    client.start().await?;

    Ok(())
}
