//! Discord event handler for serenity.
//!
//! Receives gateway events, feeds them to the counting engine, and renders
//! the outcomes. Sends are fire-and-forget: a failed reaction or reply is
//! logged and never fed back into the state machine.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use {
    serenity::{
        all::{
            ChannelId, CommandInteraction, Context, CreateInteractionResponse,
            CreateInteractionResponseMessage, EventHandler, Guild, GuildId, Interaction, Message,
            MessageId, ReactionType, Ready, UserId,
        },
        async_trait,
    },
    tracing::{debug, error, info, warn},
};

use tally_counting::{ChannelKey, CommandReply, CountingEngine, MessageOutcome};

use crate::{
    commands::{self, SlashCommand},
    render,
};

/// Last message seen per channel. The gateway's delete event carries only
/// IDs, so the handler keeps enough of the previous message to feed the
/// deletion-compensation path. One entry per channel bounds memory.
#[derive(Debug, Clone)]
struct LastSeen {
    message_id: u64,
    user_id: String,
    text: String,
}

/// Handler for Discord gateway events.
pub struct CountingHandler {
    engine: Arc<CountingEngine>,
    last_seen: RwLock<HashMap<u64, LastSeen>>,
}

impl CountingHandler {
    pub fn new(engine: Arc<CountingEngine>) -> Self {
        Self {
            engine,
            last_seen: RwLock::new(HashMap::new()),
        }
    }

    fn remember(&self, channel_id: u64, seen: LastSeen) {
        let mut map = self.last_seen.write().unwrap_or_else(|e| e.into_inner());
        map.insert(channel_id, seen);
    }

    fn recall(&self, channel_id: u64, message_id: u64) -> Option<LastSeen> {
        let map = self.last_seen.read().unwrap_or_else(|e| e.into_inner());
        map.get(&channel_id)
            .filter(|seen| seen.message_id == message_id)
            .cloned()
    }

    /// Resolve a participant's guild display name for the `count` reply.
    async fn display_name(&self, ctx: &Context, guild_id: GuildId, user_id: &str) -> Option<String> {
        let id: u64 = user_id.parse().ok()?;
        match guild_id.member(&ctx.http, UserId::new(id)).await {
            Ok(member) => Some(member.display_name().to_string()),
            Err(e) => {
                debug!(user_id, error = %e, "member lookup failed");
                None
            },
        }
    }
}

/// A store error means a counter mutation could not be made durable. Exiting
/// here keeps "state reflects last fully processed message" true on restart.
fn fatal_store_error(err: &tally_counting::Error) -> ! {
    error!(error = %err, "counter store failure, shutting down");
    std::process::exit(1);
}

async fn react(ctx: &Context, msg: &Message, emoji: &str) {
    let reaction = ReactionType::Unicode(emoji.to_string());
    if let Err(e) = msg.react(&ctx.http, reaction).await {
        warn!(error = %e, "failed to react");
    }
}

async fn reply(ctx: &Context, msg: &Message, text: String) {
    if let Err(e) = msg.reply(&ctx.http, text).await {
        warn!(error = %e, "failed to reply");
    }
}

async fn respond(ctx: &Context, interaction: &CommandInteraction, text: String) {
    let response = CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new().content(text),
    );
    if let Err(e) = interaction.create_response(&ctx.http, response).await {
        warn!(error = %e, "failed to respond to interaction");
    }
}

#[async_trait]
impl EventHandler for CountingHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            bot_name = %ready.user.name,
            guilds = ready.guilds.len(),
            "discord bot ready"
        );
    }

    async fn guild_create(&self, ctx: Context, guild: Guild, _is_new: Option<bool>) {
        debug!(guild_id = %guild.id, guild_name = %guild.name, "joined guild");
        match guild.id.set_commands(&ctx.http, commands::definitions()).await {
            Ok(registered) => {
                info!(guild_id = %guild.id, commands = registered.len(), "registered slash commands");
            },
            Err(e) => warn!(guild_id = %guild.id, error = %e, "failed to register slash commands"),
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        // DMs have no counter; bot messages never count.
        let Some(guild_id) = msg.guild_id else {
            return;
        };
        if msg.author.bot {
            return;
        }

        let key = ChannelKey::new(guild_id.to_string(), msg.channel_id.to_string());
        let outcome = match self
            .engine
            .process_message(&key, &msg.author.id.to_string(), &msg.content, false)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => fatal_store_error(&e),
        };

        // The deletion path only cares about the most recent accepted
        // submission, so failures and noise never overwrite the memo.
        if matches!(outcome, MessageOutcome::Counted { .. }) {
            self.remember(
                msg.channel_id.get(),
                LastSeen {
                    message_id: msg.id.get(),
                    user_id: msg.author.id.to_string(),
                    text: msg.content.clone(),
                },
            );
        }

        if let Some(emoji) = render::reaction(&outcome) {
            react(&ctx, &msg, emoji).await;
        }
        if let MessageOutcome::Failed { reason, .. } = &outcome {
            reply(&ctx, &msg, render::failure_reply(reason)).await;
        }
    }

    async fn message_delete(
        &self,
        ctx: Context,
        channel_id: ChannelId,
        deleted_message_id: MessageId,
        guild_id: Option<GuildId>,
    ) {
        let Some(guild_id) = guild_id else {
            return;
        };
        let Some(seen) = self.recall(channel_id.get(), deleted_message_id.get()) else {
            return;
        };

        let key = ChannelKey::new(guild_id.to_string(), channel_id.to_string());
        let notice = match self
            .engine
            .process_deletion(&key, &seen.user_id, &seen.text)
            .await
        {
            Ok(notice) => notice,
            Err(e) => fatal_store_error(&e),
        };

        if let Some(notice) = notice {
            if let Err(e) = channel_id.say(&ctx.http, render::deletion_reply(&notice)).await {
                warn!(error = %e, "failed to announce deletion");
            }
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };
        let Some(parsed) = SlashCommand::parse(&command.data.name) else {
            debug!(name = %command.data.name, "unknown slash command");
            return;
        };
        // No counters outside guilds.
        let Some(guild_id) = command.guild_id else {
            return;
        };

        let engine_command = match parsed {
            SlashCommand::Ping => {
                respond(&ctx, &command, "Pong!".to_string()).await;
                return;
            },
            SlashCommand::Engine(cmd) => cmd,
        };

        let key = ChannelKey::new(guild_id.to_string(), command.channel_id.to_string());
        let cmd_reply = match self.engine.handle_command(&key, engine_command).await {
            Ok(reply) => reply,
            Err(e) => fatal_store_error(&e),
        };

        // Name resolution is best-effort flavor for the `count` reply.
        let name = match &cmd_reply {
            CommandReply::Count {
                last_user: Some(user),
                ..
            } => self.display_name(&ctx, guild_id, user).await,
            _ => None,
        };

        respond(&ctx, &command, render::command_reply(&cmd_reply, name.as_deref())).await;
    }
}
