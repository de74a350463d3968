use eyre::Result;
use rallybot_core::errors::RallyError;
use rallybot_core::models::rally::{Rally, RallyId};
use serenity::model::application::interaction::{
    InteractionResponseType, application_command::ApplicationCommandInteraction,
};
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::HandlerContext;
use super::rally::render_rally_post;
use crate::platform;
use crate::state::BotState;
use crate::voice::{TeardownReason, VoiceEvent};

/// The voice channel a user is sitting in, from the gateway cache.
fn user_voice_channel(ctx: &HandlerContext, guild_id: GuildId, user_id: UserId) -> Option<u64> {
    let guild = ctx.ctx.cache.guild(guild_id)?;
    let state = guild.voice_states.get(&user_id)?;
    state.channel_id.map(|id| id.0)
}

/// The channel a voice command acts on: the invoker's own, else the guild's
/// only temporary channel.
///
/// # Errors
///
/// `Validation` when the invoker is outside voice and the guild has several
/// temporary channels.
pub async fn resolve_channel(ctx: &HandlerContext, guild_id: GuildId, user_id: UserId) -> Result<Option<u64>, RallyError> {
    match user_voice_channel(ctx, guild_id, user_id) {
        Some(channel_id) => Ok(Some(channel_id)),
        None => ctx.state.voice.sole_for_guild(guild_id.0).await,
    }
}

/// Handle `/stay`
pub async fn handle_stay(ctx: &HandlerContext, command: &ApplicationCommandInteraction) -> Result<()> {
    let guild_id = command
        .guild_id
        .ok_or_else(|| RallyError::Validation("This command only works in a server.".to_string()))?;

    let channel_id = resolve_channel(ctx, guild_id, command.user.id)
        .await?
        .ok_or_else(|| RallyError::Validation("Join the rally voice channel first.".to_string()))?;

    let reply = if ctx.state.voice.stay(channel_id).await {
        info!("{} pinned channel {}", command.user.id, channel_id);
        format!("📌 <#{}> will stay until someone uses `/leave`.", channel_id)
    } else {
        format!("<#{}> isn't a temporary rally channel, so there's nothing to keep.", channel_id)
    };

    command
        .create_interaction_response(&ctx.ctx.http, |r| {
            r.kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|m| m.content(reply).ephemeral(true))
        })
        .await?;

    Ok(())
}

/// Handle `/leave`
///
/// Stops the countdown in the channel, disconnects the bot and deletes the
/// channel if the bot created it.
pub async fn handle_leave(ctx: &HandlerContext, command: &ApplicationCommandInteraction) -> Result<()> {
    let guild_id = command
        .guild_id
        .ok_or_else(|| RallyError::Validation("This command only works in a server.".to_string()))?;
    let state = &ctx.state;

    let channel_id = resolve_channel(ctx, guild_id, command.user.id)
        .await?
        .or(state.countdowns.channel_for_guild(guild_id.0).await)
        .ok_or_else(|| RallyError::Validation("Join the voice channel the bot should leave first.".to_string()))?;

    let stopped = state.countdowns.cancel_channel(channel_id).await;
    platform::disconnect_from(&state.songbird, guild_id.0, channel_id).await;
    let deleted = state.voice.teardown(channel_id).await;

    let reply = match (deleted, stopped) {
        (true, _) => "👋 Left voice and deleted the temporary channel.",
        (false, true) => "👋 Countdown stopped and left voice.",
        (false, false) => "👋 Left voice.",
    };

    command
        .create_interaction_response(&ctx.ctx.http, |r| {
            r.kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|m| m.content(reply).ephemeral(true))
        })
        .await?;

    Ok(())
}

/// Unlink a deleted voice channel from its rally and stop the rally's countdown.
///
/// The rally stays on the roster, so joining, leaving and exporting keep
/// working without voice. Returns the rally as it now stands.
pub async fn detach_rally_voice(state: &BotState, channel_id: u64, rally_id: Option<RallyId>) -> Option<Rally> {
    let rally_id = state.roster.write().await.detach_voice(channel_id).or(rally_id)?;
    state.countdowns.cancel_rally(rally_id).await;

    state.roster.read().await.get(rally_id).ok().cloned()
}

/// Clean up after deleted voice channels until the manager goes away.
///
/// A rally whose channel is gone loses its voice link and Join VC button, and
/// its thread is archived.
pub async fn run_voice_events(state: Arc<BotState>, mut events: mpsc::UnboundedReceiver<VoiceEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            VoiceEvent::ChannelDeleted {
                guild_id,
                channel_id,
                rally_id,
                reason,
            } => {
                platform::disconnect_from(&state.songbird, guild_id, channel_id).await;

                let Some(rally) = detach_rally_voice(&state, channel_id, rally_id).await else {
                    continue;
                };

                if let Err(e) = render_rally_post(&state.http, &rally).await {
                    warn!("Couldn't update post of rally {}: {:?}", rally.id, e);
                }

                if let Some(thread_id) = rally.thread_id {
                    let note = match reason {
                        TeardownReason::IdleTimeout => "The voice channel sat empty and was removed.",
                        TeardownReason::Forced => "The voice channel was closed with `/leave`.",
                    };

                    let thread = ChannelId(thread_id);
                    if let Err(e) = thread.say(&state.http, note).await {
                        warn!("Couldn't post in thread {}: {:?}", thread_id, e);
                    }
                    if let Err(e) = thread.edit_thread(&state.http, |t| t.archived(true)).await {
                        warn!("Couldn't archive thread {}: {:?}", thread_id, e);
                    }
                }

                info!("Rally {} lost its voice channel {} ({:?})", rally.id, channel_id, reason);
            }
        }
    }

    info!("Voice event stream closed");
}
