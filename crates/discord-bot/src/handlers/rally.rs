use eyre::Result;
use rallybot_core::errors::RallyError;
use rallybot_core::export::{CSV_FILENAME, REPORT_FILENAME, roster_csv, roster_report};
use rallybot_core::models::participant::TroopProfile;
use rallybot_core::models::rally::{
    KeepDetails, Rally, RallyDetails, RallyDraft, RallyId, RallyKind, SopDetails, VoiceLink,
};
use serenity::{
    builder::{CreateComponents, CreateEmbed, CreateInputText},
    http::Http,
    model::{
        application::{
            component::{ActionRow, ActionRowComponent, ButtonStyle, InputTextStyle},
            interaction::{
                InteractionResponseType,
                application_command::ApplicationCommandInteraction,
                message_component::MessageComponentInteraction,
                modal::ModalSubmitInteraction,
            },
        },
        channel::{AttachmentType, ChannelType},
        guild::Member,
        id::{ChannelId, GuildId, MessageId, UserId},
        user::User,
    },
    prelude::*,
    utils::Color,
};
use std::borrow::Cow;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::HandlerContext;
use crate::routing::{ComponentAction, ModalAction};
use crate::voice::ChannelRequest;

const RALLY_VC_USER_LIMIT: u32 = 10;
/// Invite in the post never expires; the one sent by DM lasts an hour.
const POST_INVITE_MAX_AGE: u64 = 0;
const DM_INVITE_MAX_AGE: u64 = 3600;
const THREAD_ARCHIVE_MINUTES: u16 = 1440;

/// One text input of a modal form.
#[derive(Debug, Clone, Copy)]
pub struct FormField {
    pub id: &'static str,
    pub label: &'static str,
    pub placeholder: &'static str,
    pub max_length: u64,
    pub required: bool,
    pub paragraph: bool,
}

pub const KEEP_FORM: [FormField; 5] = [
    FormField {
        id: "keep_power",
        label: "Power Level of Keep",
        placeholder: "e.g. 200m, 350m",
        max_length: 16,
        required: true,
        paragraph: false,
    },
    FormField {
        id: "primary_troop",
        label: "Primary Troop Type",
        placeholder: "Cavalry / Infantry / Range",
        max_length: 16,
        required: true,
        paragraph: false,
    },
    FormField {
        id: "keep_level",
        label: "Keep Level",
        placeholder: "e.g. K30, K34",
        max_length: 8,
        required: true,
        paragraph: false,
    },
    FormField {
        id: "gear_worn",
        label: "Gear Worn",
        placeholder: "Farming / Crafting / Attack / Defense",
        max_length: 32,
        required: true,
        paragraph: false,
    },
    FormField {
        id: "intel",
        label: "Idle Time / Scouted",
        placeholder: "e.g. idle 30 minutes, scouted 20 minutes ago",
        max_length: 64,
        required: false,
        paragraph: false,
    },
];

pub const SOP_FORM: [FormField; 3] = [
    FormField {
        id: "objective",
        label: "Objective",
        placeholder: "Which seat of power, and what to hit",
        max_length: 100,
        required: true,
        paragraph: false,
    },
    FormField {
        id: "time",
        label: "Time",
        placeholder: "e.g. 20:00 UTC",
        max_length: 64,
        required: true,
        paragraph: false,
    },
    FormField {
        id: "notes",
        label: "Notes",
        placeholder: "Anything hitters should know",
        max_length: 500,
        required: false,
        paragraph: true,
    },
];

pub const JOIN_FORM: [FormField; 4] = [
    FormField {
        id: "troop_type",
        label: "Troop Type",
        placeholder: "Cavalry / Infantry / Range",
        max_length: 16,
        required: true,
        paragraph: false,
    },
    FormField {
        id: "troop_tier",
        label: "Troop Tier",
        placeholder: "T8 / T9 / T10 / T11 / T12",
        max_length: 4,
        required: true,
        paragraph: false,
    },
    FormField {
        id: "rally_dragon",
        label: "Rally Dragon",
        placeholder: "Yes / No",
        max_length: 3,
        required: true,
        paragraph: false,
    },
    FormField {
        id: "capacity",
        label: "Rally Capacity",
        placeholder: "e.g. 550000",
        max_length: 12,
        required: true,
        paragraph: false,
    },
];

fn form_fields(kind: RallyKind) -> &'static [FormField] {
    match kind {
        RallyKind::Keep => &KEEP_FORM,
        RallyKind::Sop => &SOP_FORM,
    }
}

/// Collect the submitted text inputs of a modal by their custom id.
pub fn modal_values(rows: &[ActionRow]) -> HashMap<String, String> {
    rows.iter()
        .flat_map(|row| row.components.iter())
        .filter_map(|component| match component {
            ActionRowComponent::InputText(input) => Some((input.custom_id.clone(), input.value.trim().to_string())),
            _ => None,
        })
        .collect()
}

fn required_value(values: &HashMap<String, String>, field: &FormField) -> Result<String, RallyError> {
    values
        .get(field.id)
        .filter(|value| !value.is_empty())
        .cloned()
        .ok_or_else(|| RallyError::Validation(format!("{} is required.", field.label)))
}

fn optional_value(values: &HashMap<String, String>, id: &str) -> Option<String> {
    values.get(id).filter(|value| !value.is_empty()).cloned()
}

/// Turn the answers of a rally form into rally details.
///
/// # Errors
///
/// `Validation` when a required answer is blank or the keep's troop type is
/// not one of Cavalry, Infantry or Range.
pub fn details_from_form(kind: RallyKind, values: &HashMap<String, String>) -> Result<RallyDetails, RallyError> {
    match kind {
        RallyKind::Keep => {
            let [power, troop, level, gear, intel] = &KEEP_FORM;

            Ok(RallyDetails::Keep(KeepDetails {
                keep_power: required_value(values, power)?,
                primary_troop: required_value(values, troop)?.parse()?,
                keep_level: required_value(values, level)?,
                gear_worn: required_value(values, gear)?,
                intel: optional_value(values, intel.id).unwrap_or_default(),
            }))
        }
        RallyKind::Sop => {
            let [objective, time, notes] = &SOP_FORM;

            Ok(RallyDetails::Sop(SopDetails {
                objective: required_value(values, objective)?,
                time: required_value(values, time)?,
                notes: optional_value(values, notes.id),
            }))
        }
    }
}

/// Turn the answers of the join form into a troop profile.
pub fn profile_from_form(values: &HashMap<String, String>) -> Result<TroopProfile, RallyError> {
    let [troop_type, troop_tier, rally_dragon, capacity] = &JOIN_FORM;

    TroopProfile::from_form(
        &required_value(values, troop_type)?,
        &required_value(values, troop_tier)?,
        &required_value(values, rally_dragon)?,
        &required_value(values, capacity)?,
    )
}

fn display_value(value: &str) -> String {
    if value.trim().is_empty() {
        "—".to_string()
    } else {
        value.to_string()
    }
}

fn display_name(member: Option<&Member>, user: &User) -> String {
    member
        .map(|m| m.display_name().to_string())
        .unwrap_or_else(|| user.name.clone())
}

/// Build the embed of an open rally post.
pub fn rally_embed<'a>(embed: &'a mut CreateEmbed, rally: &Rally) -> &'a mut CreateEmbed {
    let kind = rally.kind();

    embed
        .title(kind.title())
        .description(format!(
            "A new {} rally started by <@{}> is forming. Press **Join** to sign up with your troops.",
            kind.short_name(),
            rally.creator_id
        ))
        .color(Color::BLURPLE)
        .timestamp(rally.created_at);

    for (label, value) in rally.details.fields() {
        embed.field(label, display_value(&value), true);
    }

    let voice = match &rally.voice {
        Some(link) => format!("<#{}>", link.channel_id),
        None => "No voice channel".to_string(),
    };
    embed.field("Voice", voice, true);

    if let Some(thread_id) = rally.thread_id {
        embed.field("Thread", format!("<#{}>", thread_id), true);
    }

    embed
        .field(
            format!("Roster ({})", rally.participants.len()),
            rally.roster_mentions(),
            false,
        )
        .footer(|f| f.text(format!("Rally ID {}", rally.id)))
}

/// Buttons under an open rally post.
pub fn rally_components<'a>(components: &'a mut CreateComponents, rally: &Rally) -> &'a mut CreateComponents {
    components.create_action_row(|row| {
        row.create_button(|b| {
            b.custom_id(ComponentAction::Join(rally.id).custom_id())
                .label("Join")
                .style(ButtonStyle::Success)
        })
        .create_button(|b| {
            b.custom_id(ComponentAction::Leave(rally.id).custom_id())
                .label("Leave")
                .style(ButtonStyle::Danger)
        })
        .create_button(|b| {
            b.custom_id(ComponentAction::Export(rally.id).custom_id())
                .label("Export")
                .style(ButtonStyle::Secondary)
        });

        if let Some(url) = rally.voice.as_ref().and_then(|v| v.invite_url.as_ref()) {
            row.create_button(|b| b.label("Join VC").style(ButtonStyle::Link).url(url));
        }

        row
    })
}

/// Redraw a rally post from the roster.
pub async fn render_rally_post(http: &Http, rally: &Rally) -> Result<()> {
    ChannelId(rally.channel_id)
        .edit_message(http, MessageId(rally.id.0), |m| {
            m.content("")
                .embed(|e| rally_embed(e, rally))
                .components(|c| rally_components(c, rally))
        })
        .await?;

    debug!("Rendered rally {} with {} participants", rally.id, rally.participants.len());
    Ok(())
}

async fn role_mention(http: &Http, guild_id: GuildId, role_name: &str) -> String {
    match guild_id.roles(http).await {
        Ok(roles) => roles
            .values()
            .find(|role| role.name.eq_ignore_ascii_case(role_name))
            .map(|role| format!("<@&{}>", role.id.0))
            .unwrap_or_else(|| format!("@{}", role_name)),
        Err(e) => {
            warn!("Couldn't fetch roles for guild {}: {:?}", guild_id, e);
            format!("@{}", role_name)
        }
    }
}

async fn create_invite_url(http: &Http, channel_id: u64, max_age: u64, max_uses: u64) -> Option<String> {
    match ChannelId(channel_id)
        .create_invite(http, |i| i.max_age(max_age).max_uses(max_uses).unique(true))
        .await
    {
        Ok(invite) => Some(invite.url()),
        Err(e) => {
            warn!("Couldn't create invite for voice channel {}: {:?}", channel_id, e);
            None
        }
    }
}

async fn create_rally_thread(http: &Http, channel_id: ChannelId, kind: RallyKind, creator: UserId) -> Option<u64> {
    let thread = match channel_id
        .create_private_thread(http, |t| {
            t.name(format!("🧵 {} Rally Thread", kind.short_name()))
                .kind(ChannelType::PrivateThread)
                .auto_archive_duration(THREAD_ARCHIVE_MINUTES)
        })
        .await
    {
        Ok(thread) => thread,
        Err(e) => {
            warn!("Couldn't create rally thread in {}: {:?}", channel_id, e);
            return None;
        }
    };

    if let Err(e) = thread.id.add_thread_member(http, creator).await {
        warn!("Couldn't add {} to thread {}: {:?}", creator, thread.id, e);
    }

    Some(thread.id.0)
}

/// DM someone who joined how to reach the voice channel and the thread.
///
/// Each DM gets its own one-hour, single-use invite when possible. DMs that
/// can't be delivered are only logged.
async fn send_join_info(ctx: &Context, user: &User, rally: &Rally) {
    let mut lines = vec![format!("You're on the roster for the **{}**.", rally.kind().title())];

    if let Some(link) = &rally.voice {
        let invite = match create_invite_url(&ctx.http, link.channel_id, DM_INVITE_MAX_AGE, 1).await {
            Some(url) => Some(url),
            None => link.invite_url.clone(),
        };

        match invite {
            Some(url) => lines.push(format!("🎙️ Voice channel: {}", url)),
            None => lines.push(format!("🎙️ Voice channel: <#{}>", link.channel_id)),
        }
    }

    if let Some(thread_id) = rally.thread_id {
        lines.push(format!(
            "🧵 Rally thread: https://discord.com/channels/{}/{}",
            rally.guild_id, thread_id
        ));
    }

    if let Err(e) = user.direct_message(ctx, |m| m.content(lines.join("\n"))).await {
        debug!("Couldn't DM {}: {:?}", user.id, e);
    }
}

/// Open the keep or seat of power form.
pub async fn open_rally_form(
    ctx: &HandlerContext,
    command: &ApplicationCommandInteraction,
    kind: RallyKind,
) -> Result<()> {
    if command.guild_id.is_none() {
        return Err(RallyError::Validation("Rallies can only be created in a server.".to_string()).into());
    }

    command
        .create_interaction_response(&ctx.ctx.http, |r| {
            r.kind(InteractionResponseType::Modal).interaction_response_data(|d| {
                d.custom_id(ModalAction::CreateRally(kind).custom_id())
                    .title(kind.title())
                    .components(|c| {
                        for field in form_fields(kind) {
                            c.create_action_row(|row| {
                                row.create_input_text(|t| input_text(t, field, None))
                            });
                        }
                        c
                    })
            })
        })
        .await?;

    Ok(())
}

fn input_text<'a>(t: &'a mut CreateInputText, field: &FormField, value: Option<String>) -> &'a mut CreateInputText {
    let style = if field.paragraph {
        InputTextStyle::Paragraph
    } else {
        InputTextStyle::Short
    };

    t.custom_id(field.id)
        .label(field.label)
        .placeholder(field.placeholder)
        .style(style)
        .max_length(field.max_length)
        .required(field.required);

    if let Some(value) = value {
        t.value(value);
    }

    t
}

/// Create a rally from a submitted form.
///
/// Sets up the voice channel, invite and private thread, posts the
/// announcement and enrolls the creator. The rally is keyed by the id of the
/// announcement message.
pub async fn handle_rally_form(ctx: &HandlerContext, modal: &ModalSubmitInteraction, kind: RallyKind) -> Result<()> {
    let guild_id = modal
        .guild_id
        .ok_or_else(|| RallyError::Validation("Rallies can only be created in a server.".to_string()))?;
    let details = details_from_form(kind, &modal_values(&modal.data.components))?;
    let creator = &modal.user;
    let http = &ctx.ctx.http;
    let state = &ctx.state;

    // Channel and thread creation can take longer than the interaction window
    modal
        .create_interaction_response(http, |r| {
            r.kind(InteractionResponseType::DeferredChannelMessageWithSource)
                .interaction_response_data(|d| d.ephemeral(true))
        })
        .await?;

    let voice = if state.config.enable_voice {
        let request = ChannelRequest {
            guild_id: guild_id.0,
            name: format!("{}'s {} Rally", display_name(modal.member.as_ref(), creator), kind.short_name()),
            category_id: None,
            owner_id: Some(creator.id.0),
            user_limit: Some(RALLY_VC_USER_LIMIT),
        };
        let channel_id = state.voice.acquire(request, None).await?;
        let invite_url = create_invite_url(http, channel_id, POST_INVITE_MAX_AGE, 0).await;

        Some(VoiceLink { channel_id, invite_url })
    } else {
        None
    };

    let thread_id = create_rally_thread(http, modal.channel_id, kind, creator.id).await;
    let mention = role_mention(http, guild_id, &state.config.hitters_role_name).await;

    let post = match modal
        .channel_id
        .send_message(http, |m| {
            m.content(format!("{} {} is forming!", mention, kind.title()))
                .embed(|e| e.title(kind.title()).description("Setting up the rally...").color(Color::BLURPLE))
        })
        .await
    {
        Ok(post) => post,
        Err(e) => {
            if let Some(link) = &voice {
                state.voice.teardown(link.channel_id).await;
            }
            return Err(e.into());
        }
    };

    let rally_id = RallyId(post.id.0);
    let rally = {
        let mut roster = state.roster.write().await;
        roster.create(
            rally_id,
            RallyDraft {
                guild_id: guild_id.0,
                channel_id: modal.channel_id.0,
                creator_id: creator.id.0,
                details,
            },
        )?;
        if let Some(link) = voice.clone() {
            roster.attach_voice(rally_id, link)?;
        }
        if let Some(thread_id) = thread_id {
            roster.attach_thread(rally_id, thread_id)?;
        }
        roster.get(rally_id)?.clone()
    };

    if let Some(link) = &voice {
        state.voice.assign_rally(link.channel_id, rally_id).await;
    }

    info!("Created {} rally {} in guild {}", kind.as_str(), rally_id, guild_id);
    render_rally_post(http, &rally).await?;

    if let Some(thread_id) = thread_id {
        if let Err(e) = ChannelId(thread_id)
            .say(http, format!("Planning thread for the {}. Everyone who joins is added here.", kind.title()))
            .await
        {
            warn!("Couldn't post in thread {}: {:?}", thread_id, e);
        }
    }

    send_join_info(&ctx.ctx, creator, &rally).await;

    modal
        .edit_original_interaction_response(http, |r| {
            r.content(format!("{} posted in <#{}>.", kind.title(), modal.channel_id))
        })
        .await?;

    Ok(())
}

/// Open the join form for a rally, prefilled with any earlier answers.
pub async fn open_join_form(
    ctx: &HandlerContext,
    component: &MessageComponentInteraction,
    rally_id: RallyId,
) -> Result<()> {
    let previous = {
        let roster = ctx.state.roster.read().await;
        let rally = roster.get(rally_id)?;
        rally.participant(component.user.id.0).and_then(|p| p.profile.clone())
    };

    let prefill = |id: &str| -> Option<String> {
        let profile = previous.as_ref()?;
        match id {
            "troop_type" => Some(profile.troop_type.to_string()),
            "troop_tier" => Some(profile.troop_tier.to_string()),
            "rally_dragon" => Some(if profile.rally_dragon { "Yes" } else { "No" }.to_string()),
            "capacity" => Some(profile.capacity.to_string()),
            _ => None,
        }
    };

    component
        .create_interaction_response(&ctx.ctx.http, |r| {
            r.kind(InteractionResponseType::Modal).interaction_response_data(|d| {
                d.custom_id(ModalAction::JoinRally(rally_id).custom_id())
                    .title("Join Rally")
                    .components(|c| {
                        for field in &JOIN_FORM {
                            c.create_action_row(|row| {
                                row.create_input_text(|t| input_text(t, field, prefill(field.id)))
                            });
                        }
                        c
                    })
            })
        })
        .await?;

    Ok(())
}

/// Enroll the submitter with their troop profile.
pub async fn handle_join_form(ctx: &HandlerContext, modal: &ModalSubmitInteraction, rally_id: RallyId) -> Result<()> {
    let profile = profile_from_form(&modal_values(&modal.data.components))?;
    let user = &modal.user;
    let http = &ctx.ctx.http;

    let (newly_joined, rally) = {
        let mut roster = ctx.state.roster.write().await;
        let joined = roster.join(rally_id, user.id.0)?;
        roster.set_profile(rally_id, user.id.0, profile)?;
        (joined, roster.get(rally_id)?.clone())
    };

    let reply = if newly_joined {
        format!(
            "You're on the {} roster! Check your DMs for the voice channel and thread.",
            rally.kind().short_name()
        )
    } else {
        "Your troop details were updated.".to_string()
    };

    modal
        .create_interaction_response(http, |r| {
            r.kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|d| d.content(reply).ephemeral(true))
        })
        .await?;

    render_rally_post(http, &rally).await?;

    if newly_joined {
        info!("{} joined rally {}", user.id, rally_id);

        if let Some(thread_id) = rally.thread_id {
            let thread = ChannelId(thread_id);
            match thread.add_thread_member(http, user.id).await {
                Ok(()) => {
                    if let Err(e) = thread.say(http, format!("<@{}> joined the rally.", user.id)).await {
                        warn!("Couldn't post in thread {}: {:?}", thread_id, e);
                    }
                }
                Err(e) => warn!("Couldn't add {} to thread {}: {:?}", user.id, thread_id, e),
            }
        }

        send_join_info(&ctx.ctx, user, &rally).await;
    }

    Ok(())
}

/// Take the presser off the roster.
pub async fn handle_leave_button(
    ctx: &HandlerContext,
    component: &MessageComponentInteraction,
    rally_id: RallyId,
) -> Result<()> {
    let user_id = component.user.id;
    let http = &ctx.ctx.http;

    let (removed, rally) = {
        let mut roster = ctx.state.roster.write().await;
        let removed = roster.leave(rally_id, user_id.0)?;
        (removed, roster.get(rally_id)?.clone())
    };

    let reply = if removed {
        "You left the rally."
    } else {
        "You weren't on this rally's roster."
    };

    component
        .create_interaction_response(http, |r| {
            r.kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|d| d.content(reply).ephemeral(true))
        })
        .await?;

    if removed {
        info!("{} left rally {}", user_id, rally_id);
        render_rally_post(http, &rally).await?;

        if let Some(thread_id) = rally.thread_id {
            if let Err(e) = ChannelId(thread_id).remove_thread_member(http, user_id).await {
                debug!("Couldn't remove {} from thread {}: {:?}", user_id, thread_id, e);
            }
        }
    }

    Ok(())
}

/// Send the roster as CSV plus a grouped text report.
pub async fn handle_export(
    ctx: &HandlerContext,
    component: &MessageComponentInteraction,
    rally_id: RallyId,
) -> Result<()> {
    let rally = ctx.state.roster.read().await.get(rally_id)?.clone();
    let csv = roster_csv(&rally);
    let report = roster_report(&rally);

    component
        .create_interaction_response(&ctx.ctx.http, |r| {
            r.kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|d| {
                    d.content(format!(
                        "Roster export for the {} ({} participants).",
                        rally.kind().title(),
                        rally.participants.len()
                    ))
                    .ephemeral(true)
                    .add_file(AttachmentType::Bytes {
                        data: Cow::Owned(csv.into_bytes()),
                        filename: CSV_FILENAME.to_string(),
                    })
                    .add_file(AttachmentType::Bytes {
                        data: Cow::Owned(report.into_bytes()),
                        filename: REPORT_FILENAME.to_string(),
                    })
                })
        })
        .await?;

    Ok(())
}
