use color_eyre::eyre::Result;
use dotenv::dotenv;
use rallybot_api::config::HealthConfig;
use rallybot_discord_bot::config::BotConfig;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Load environment variables
    dotenv().ok();

    // Load configuration
    let config = BotConfig::from_env()?;
    let health = HealthConfig::from_env()?;

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!(
        "Starting rallybot (voice {})",
        if config.enable_voice { "enabled" } else { "disabled" }
    );

    // Liveness server runs alongside the bot when HEALTH_PORT is set
    tokio::spawn(async move {
        if let Err(e) = rallybot_api::start_server(health).await {
            error!("Liveness server error: {}", e);
        }
    });

    // Start the Discord bot
    match rallybot_discord_bot::start_bot(config).await {
        Ok(_) => info!("Discord bot shut down gracefully"),
        Err(e) => {
            error!("Discord bot error: {}", e);
            return Err(e);
        }
    }

    Ok(())
}
