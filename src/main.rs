use anyhow::Context as AnyhowContext;
use serenity::{Client, model::prelude::GatewayIntents};
use tracing_subscriber::EnvFilter;

use plugcord::{config::Configuration, framework::Framework, handler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Configuration::load()?;
    let discord_token = config
        .authentication
        .discord_token
        .as_deref()
        .context("Expected authentication.discord_token to be filled in config")?;

    let framework = Framework::new(&config);
    framework.load().context("Failed to load plugins")?;

    let mut client = Client::builder(
        discord_token,
        GatewayIntents::default()
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::GUILD_MEMBERS
            | GatewayIntents::MESSAGE_CONTENT,
    )
    .event_handler(handler::Handler::new(framework))
    .await
    .context("Error creating client")?;

    if let Err(why) = client.start().await {
        tracing::error!("Client error: {why:?}");
    }

    Ok(())
}
