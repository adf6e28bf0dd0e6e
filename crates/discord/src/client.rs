//! Serenity client construction.

use std::sync::Arc;

use {
    secrecy::ExposeSecret,
    serenity::all::{Client, GatewayIntents},
};

use {tally_config::DiscordConfig, tally_counting::CountingEngine};

use crate::{Error, Result, handler::CountingHandler};

/// Required gateway intents: guild messages with content for the counting
/// itself, reactions for feedback.
pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_MESSAGE_REACTIONS
        | GatewayIntents::MESSAGE_CONTENT
}

/// Build a gateway client wired to the counting engine.
pub async fn build_client(config: &DiscordConfig, engine: Arc<CountingEngine>) -> Result<Client> {
    let token = config.token.expose_secret();
    if token.is_empty() {
        return Err(Error::message(
            "no Discord token configured (set [discord].token in tally.toml)",
        ));
    }
    let client = Client::builder(token, intents())
        .event_handler(CountingHandler::new(engine))
        .await?;
    Ok(client)
}
