use eyre::{Result, eyre};
use rallybot_core::errors::RallyError;
use rallybot_core::models::countdown::{BombDuration, CountdownKind, CountdownPlan, CueId, RollingGap};
use serenity::model::application::interaction::{
    InteractionResponseType,
    application_command::{ApplicationCommandInteraction, CommandDataOption},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::{HandlerContext, get_option_string, voice};
use crate::countdown::{CountdownKey, CuePlayer};
use crate::platform::{self, SongbirdPlayer};
use crate::voice::ChannelRequest;

/// How long the bot stays in voice after a countdown's last cue, so the clip can finish.
const LINGER_AFTER_FINISH: Duration = Duration::from_secs(60);

/// Handle `/type_of_rally bomb`
pub async fn handle_bomb(
    ctx: &HandlerContext,
    command: &ApplicationCommandInteraction,
    subcommand: Option<&CommandDataOption>,
) -> Result<()> {
    let subcommand = subcommand.ok_or_else(|| eyre!("Missing subcommand"))?;
    let duration: BombDuration = get_option_string(subcommand, "duration")?.parse()?;

    start_countdown(ctx, command, CountdownPlan::bomb(duration)).await
}

/// Handle `/type_of_rally rolling`
pub async fn handle_rolling(
    ctx: &HandlerContext,
    command: &ApplicationCommandInteraction,
    subcommand: Option<&CommandDataOption>,
) -> Result<()> {
    let subcommand = subcommand.ok_or_else(|| eyre!("Missing subcommand"))?;
    let gap: RollingGap = get_option_string(subcommand, "gap")?.parse()?;

    start_countdown(ctx, command, CountdownPlan::rolling(gap)).await
}

/// Join voice and start `plan` in the invoker's channel.
///
/// The channel is the one the invoker sits in, else the guild's only
/// temporary channel, else a fresh temporary channel. A countdown already
/// running elsewhere in the guild is replaced.
async fn start_countdown(ctx: &HandlerContext, command: &ApplicationCommandInteraction, plan: CountdownPlan) -> Result<()> {
    let guild_id = command
        .guild_id
        .ok_or_else(|| RallyError::Validation("Countdowns only work in a server.".to_string()))?;
    let http = &ctx.ctx.http;
    let state = &ctx.state;

    // Joining voice regularly takes longer than the interaction window
    command
        .create_interaction_response(http, |r| {
            r.kind(InteractionResponseType::DeferredChannelMessageWithSource)
                .interaction_response_data(|d| d.ephemeral(true))
        })
        .await?;

    let channel_id = match voice::resolve_channel(ctx, guild_id, command.user.id).await? {
        Some(channel_id) => channel_id,
        None => {
            let name = match &command.member {
                Some(member) => format!("{}'s Countdown", member.display_name()),
                None => format!("{}'s Countdown", command.user.name),
            };

            state
                .voice
                .acquire(
                    ChannelRequest {
                        guild_id: guild_id.0,
                        name,
                        category_id: None,
                        owner_id: Some(command.user.id.0),
                        user_limit: None,
                    },
                    None,
                )
                .await?
        }
    };

    platform::connect(&state.songbird, guild_id.0, channel_id).await?;

    let rally_id = state.roster.read().await.rally_for_channel(channel_id).map(|r| r.id);
    let missing = state.config.audio.missing(&plan.cue_ids());
    let kind = plan.kind();

    let player: Arc<dyn CuePlayer> = Arc::new(SongbirdPlayer::new(
        state.songbird.clone(),
        state.http.clone(),
        state.config.audio.clone(),
        guild_id.0,
        channel_id,
        command.channel_id.0,
    ));

    let on_finish = {
        let voice = state.voice.clone();
        let songbird = state.songbird.clone();
        let countdowns = state.countdowns.clone();
        let guild = guild_id.0;

        async move {
            tokio::time::sleep(LINGER_AFTER_FINISH).await;

            if !countdowns.is_running(channel_id).await {
                platform::disconnect_from(&songbird, guild, channel_id).await;
            }
            voice.countdown_finished(channel_id).await;
        }
    };

    let key = CountdownKey {
        guild_id: guild_id.0,
        channel_id,
        rally_id,
    };
    let replaced = state.countdowns.start(key, plan, player, on_finish).await;

    info!("Started {} in channel {} (guild {})", kind.label(), channel_id, guild_id);

    let mut reply = countdown_started_message(kind, channel_id, &missing);
    if let Some(previous) = replaced.filter(|previous| previous.channel_id != channel_id) {
        state.voice.countdown_finished(previous.channel_id).await;
        reply.push_str(&format!("\nThe countdown in <#{}> was stopped.", previous.channel_id));
    }

    command
        .edit_original_interaction_response(http, |r| r.content(reply))
        .await?;

    Ok(())
}

/// Confirmation shown to whoever started a countdown.
pub fn countdown_started_message(kind: CountdownKind, channel_id: u64, missing: &[CueId]) -> String {
    let mut message = format!("▶️ **{}** started in <#{}>.", kind.label(), channel_id);

    if let CountdownKind::Rolling(_) = kind {
        message.push_str("\nRuns until `/type_of_rally stop` or `/leave`.");
    }

    if !missing.is_empty() {
        let labels: Vec<&str> = missing.iter().map(CueId::label).collect();
        message.push_str(&format!(
            "\nNo audio clip for: {}. Those cues are posted as text in this channel.",
            labels.join(", ")
        ));
    }

    message
}

/// Handle `/type_of_rally stop`
pub async fn handle_stop(ctx: &HandlerContext, command: &ApplicationCommandInteraction) -> Result<()> {
    let guild_id = command
        .guild_id
        .ok_or_else(|| RallyError::Validation("Countdowns only work in a server.".to_string()))?;
    let state = &ctx.state;

    let channel_id = voice::resolve_channel(ctx, guild_id, command.user.id)
        .await?
        .or(state.countdowns.channel_for_guild(guild_id.0).await)
        .ok_or_else(|| RallyError::Validation("Join the voice channel the countdown is running in first.".to_string()))?;

    let reply = if state.countdowns.cancel_channel(channel_id).await {
        platform::stop_playback(&state.songbird, guild_id.0, channel_id).await;
        state.voice.countdown_finished(channel_id).await;
        format!("⏹️ Countdown in <#{}> stopped.", channel_id)
    } else {
        format!("No countdown is running in <#{}>.", channel_id)
    };

    command
        .create_interaction_response(&ctx.ctx.http, |r| {
            r.kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|m| m.content(reply).ephemeral(true))
        })
        .await?;

    Ok(())
}

/// Handle `/type_of_rally explain`
pub async fn handle_explain(
    ctx: &HandlerContext,
    command: &ApplicationCommandInteraction,
    subcommand: Option<&CommandDataOption>,
) -> Result<()> {
    let subcommand = subcommand.ok_or_else(|| eyre!("Missing subcommand"))?;
    let kind = get_option_string(subcommand, "kind")?;
    let text = explanation(&kind)
        .ok_or_else(|| RallyError::Validation(format!("Unknown rally type: {}", kind)))?;

    command
        .create_interaction_response(&ctx.ctx.http, |r| {
            r.kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|m| m.content(text))
        })
        .await?;

    Ok(())
}

/// How each countdown type is run, for `/type_of_rally explain`.
pub fn explanation(kind: &str) -> Option<String> {
    match kind {
        "bomb" => {
            let durations: Vec<&str> = BombDuration::ALL.iter().map(|d| d.as_str()).collect();
            Some(format!(
                "**💣 Bomb Rally**\n\
                 Everyone launches so all rallies hit the target together.\n\
                 • Join the rally voice channel.\n\
                 • Start the timer with `/type_of_rally bomb` ({}).\n\
                 • The bot explains the plan at the start and calls time when it runs out.\n\
                 • `/type_of_rally stop` cancels it.",
                durations.join(", ")
            ))
        }
        "rolling" => {
            let gaps: Vec<&str> = RollingGap::ALL.iter().map(|g| g.as_str()).collect();
            Some(format!(
                "**🔁 Rolling Rally**\n\
                 Rallies launch one after another at a fixed gap.\n\
                 • Join the rally voice channel.\n\
                 • Start with `/type_of_rally rolling` and pick the gap ({}).\n\
                 • The bot calls every gap until `/type_of_rally stop` or `/leave`.",
                gaps.join(", ")
            ))
        }
        _ => None,
    }
}
