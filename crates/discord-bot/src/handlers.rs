use eyre::{Result, eyre};
use rallybot_core::errors::RallyError;
use rallybot_core::models::rally::RallyKind;
use serenity::{
    async_trait,
    model::{
        application::{
            command::{Command, CommandOptionType},
            interaction::{
                Interaction, InteractionResponseType,
                application_command::{ApplicationCommandInteraction, CommandDataOption},
                message_component::MessageComponentInteraction,
                modal::ModalSubmitInteraction,
            },
        },
        gateway::Ready,
        guild::Member,
        id::GuildId,
        voice::VoiceState,
    },
    prelude::*,
};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub mod countdown;
pub mod rally;
pub mod voice;

use crate::routing::{self, Access, ComponentAction, ModalAction, Route};
use crate::state::BotState;

const GENERIC_ERROR: &str = "Something went wrong while handling that. Please try again.";

/// Main Discord handler that processes all events.
///
/// Owns the shared [`BotState`] and turns every gateway event into a call on
/// one of the rally, countdown or voice handlers.
pub struct Handler {
    state: Arc<BotState>,
}

impl Handler {
    /// Create a new handler
    pub fn new(state: Arc<BotState>) -> Self {
        Self { state }
    }

    fn handler_ctx(&self, ctx: &Context) -> HandlerContext {
        HandlerContext {
            ctx: ctx.clone(),
            state: self.state.clone(),
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    /// Handle ready events (when bot connects to Discord)
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("Logged in as {} ({})", ready.user.name, ready.user.id);

        // Guild registration is immediate; global registration can take a while to show up
        if !self.state.config.guild_ids.is_empty() {
            for guild_id in &self.state.config.guild_ids {
                match GuildId(*guild_id)
                    .set_application_commands(&ctx.http, |commands| crate::commands::register_commands(commands))
                    .await
                {
                    Ok(cmds) => info!("Registered {} commands for guild {}", cmds.len(), guild_id),
                    Err(why) => error!("Error registering guild commands for {}: {:?}", guild_id, why),
                }
            }
            return;
        }

        match Command::set_global_application_commands(&ctx.http, |commands| {
            crate::commands::register_commands(commands)
        })
        .await
        {
            Ok(cmds) => {
                info!("Global commands registered successfully! Total commands: {}", cmds.len());
                for cmd in cmds {
                    debug!("Command registered: /{} - {}", cmd.name, cmd.description);
                }
            }
            Err(why) => error!("Error registering global commands: {:?}", why),
        }
    }

    /// Handle interactions (slash commands, buttons, modal forms)
    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::ApplicationCommand(command) => {
                info!("Received command: {} from {}", command.data.name, command.user.id);
                let handler_ctx = self.handler_ctx(&ctx);

                if let Err(e) = dispatch_command(&handler_ctx, &command).await {
                    log_failure(&e, &command.data.name);
                    let message = user_facing_message(&e);

                    if command
                        .create_interaction_response(&ctx.http, |r| {
                            r.kind(InteractionResponseType::ChannelMessageWithSource)
                                .interaction_response_data(|m| m.content(&message).ephemeral(true))
                        })
                        .await
                        .is_err()
                    {
                        // Already acknowledged, fall back to a follow-up
                        if let Err(why) = command
                            .create_followup_message(&ctx.http, |m| m.content(&message).ephemeral(true))
                            .await
                        {
                            error!("Failed to send error response: {:?}", why);
                        }
                    }
                }
            }
            Interaction::MessageComponent(component) => {
                let handler_ctx = self.handler_ctx(&ctx);

                if let Err(e) = dispatch_component(&handler_ctx, &component).await {
                    log_failure(&e, &component.data.custom_id);
                    let message = user_facing_message(&e);

                    if component
                        .create_interaction_response(&ctx.http, |r| {
                            r.kind(InteractionResponseType::ChannelMessageWithSource)
                                .interaction_response_data(|m| m.content(&message).ephemeral(true))
                        })
                        .await
                        .is_err()
                    {
                        if let Err(why) = component
                            .create_followup_message(&ctx.http, |m| m.content(&message).ephemeral(true))
                            .await
                        {
                            error!("Failed to send error response: {:?}", why);
                        }
                    }
                }
            }
            Interaction::ModalSubmit(modal) => {
                let handler_ctx = self.handler_ctx(&ctx);

                if let Err(e) = dispatch_modal(&handler_ctx, &modal).await {
                    log_failure(&e, &modal.data.custom_id);
                    let message = user_facing_message(&e);

                    if modal
                        .create_interaction_response(&ctx.http, |r| {
                            r.kind(InteractionResponseType::ChannelMessageWithSource)
                                .interaction_response_data(|m| m.content(&message).ephemeral(true))
                        })
                        .await
                        .is_err()
                    {
                        if let Err(why) = modal
                            .create_followup_message(&ctx.http, |m| m.content(&message).ephemeral(true))
                            .await
                        {
                            error!("Failed to send error response: {:?}", why);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    /// Track who sits in which voice channel so empty temporary channels get cleaned up
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let is_bot = new.user_id == ctx.cache.current_user_id()
            || new.member.as_ref().is_some_and(|m| m.user.bot);
        if is_bot {
            return;
        }

        let old_channel = old.and_then(|state| state.channel_id).map(|id| id.0);
        let new_channel = new.channel_id.map(|id| id.0);

        self.state
            .voice
            .occupancy_changed(new.user_id.0, old_channel, new_channel)
            .await;
    }
}

/// Shared context for command handlers.
///
/// Bundles the serenity context of the current event with the bot's state.
pub struct HandlerContext {
    pub ctx: Context,
    pub state: Arc<BotState>,
}

/// Route a slash command to its handler after checking access.
pub async fn dispatch_command(ctx: &HandlerContext, command: &ApplicationCommandInteraction) -> Result<()> {
    let subcommand = command
        .data
        .options
        .first()
        .filter(|option| option.kind == CommandOptionType::SubCommand);

    let route = routing::route(&command.data.name, subcommand.map(|o| o.name.as_str()))
        .ok_or_else(|| eyre!("Unknown command: {}", command.data.name))?;

    let access = route.access();
    let role_names = role_names_for(ctx, access, command.guild_id, command.member.as_ref()).await?;

    run_authorized(&ctx.state, access, &role_names, move || async move {
        match route {
            Route::RallyKeep => rally::open_rally_form(ctx, command, RallyKind::Keep).await,
            Route::RallySop => rally::open_rally_form(ctx, command, RallyKind::Sop).await,
            Route::CountdownBomb => countdown::handle_bomb(ctx, command, subcommand).await,
            Route::CountdownRolling => countdown::handle_rolling(ctx, command, subcommand).await,
            Route::CountdownStop => countdown::handle_stop(ctx, command).await,
            Route::CountdownExplain => countdown::handle_explain(ctx, command, subcommand).await,
            Route::Stay => voice::handle_stay(ctx, command).await,
            Route::Leave => voice::handle_leave(ctx, command).await,
        }
    })
    .await
}

/// Route a button press on a rally post.
pub async fn dispatch_component(ctx: &HandlerContext, component: &MessageComponentInteraction) -> Result<()> {
    let Some(action) = ComponentAction::parse(&component.data.custom_id) else {
        warn!("Ignoring unknown component {}", component.data.custom_id);
        return Ok(());
    };

    let access = action.access();
    let role_names = role_names_for(ctx, access, component.guild_id, component.member.as_ref()).await?;

    run_authorized(&ctx.state, access, &role_names, move || async move {
        match action {
            ComponentAction::Join(rally_id) => rally::open_join_form(ctx, component, rally_id).await,
            ComponentAction::Leave(rally_id) => rally::handle_leave_button(ctx, component, rally_id).await,
            ComponentAction::Export(rally_id) => rally::handle_export(ctx, component, rally_id).await,
        }
    })
    .await
}

/// Route a submitted modal form.
pub async fn dispatch_modal(ctx: &HandlerContext, modal: &ModalSubmitInteraction) -> Result<()> {
    let action = ModalAction::parse(&modal.data.custom_id)
        .ok_or_else(|| eyre!("Unknown modal: {}", modal.data.custom_id))?;

    let role_names = role_names_for(ctx, Access::Hitters, modal.guild_id, modal.member.as_ref()).await?;

    run_authorized(&ctx.state, Access::Hitters, &role_names, move || async move {
        match action {
            ModalAction::CreateRally(kind) => rally::handle_rally_form(ctx, modal, kind).await,
            ModalAction::JoinRally(rally_id) => rally::handle_join_form(ctx, modal, rally_id).await,
        }
    })
    .await
}

/// Run `handler` only if the invoker's roles pass `access`.
///
/// A rejected invocation returns the access error without running the
/// handler, so it never reaches the roster or the voice manager.
pub async fn run_authorized<F, Fut>(state: &BotState, access: Access, role_names: &[String], handler: F) -> Result<()>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let config = &state.config;
    routing::authorize(access, role_names, &config.hitters_role_name, config.enable_voice)?;

    handler().await
}

/// Role names needed to check `access`. Open routes skip the lookup.
async fn role_names_for(
    ctx: &HandlerContext,
    access: Access,
    guild_id: Option<GuildId>,
    member: Option<&Member>,
) -> Result<Vec<String>> {
    if access == Access::Open {
        return Ok(Vec::new());
    }

    member_role_names(&ctx.ctx, guild_id, member).await
}

/// Names of the roles a guild member holds. Empty outside of guilds.
async fn member_role_names(ctx: &Context, guild_id: Option<GuildId>, member: Option<&Member>) -> Result<Vec<String>> {
    let (Some(guild_id), Some(member)) = (guild_id, member) else {
        return Ok(Vec::new());
    };

    let roles = match ctx.cache.guild_roles(guild_id) {
        Some(roles) => roles,
        None => {
            debug!("Roles of guild {} not cached, fetching", guild_id);
            guild_id.roles(&ctx.http).await?
        }
    };

    Ok(member
        .roles
        .iter()
        .filter_map(|id| roles.get(id))
        .map(|role| role.name.clone())
        .collect())
}

/// What the user sees when a handler fails.
///
/// Rally errors are shown as they are; anything else gets a generic message
/// so internals don't leak into the channel.
pub fn user_facing_message(error: &eyre::Report) -> String {
    match error.downcast_ref::<RallyError>() {
        Some(rally_error) => rally_error.to_string(),
        None => GENERIC_ERROR.to_string(),
    }
}

fn log_failure(error: &eyre::Report, what: &str) {
    match error.downcast_ref::<RallyError>() {
        Some(rally_error) => info!("Rejected {}: {}", what, rally_error),
        None => error!("Error handling {}: {:?}", what, error),
    }
}

/// Extract a string option from a subcommand
pub fn get_option_string(options: &CommandDataOption, name: &str) -> Result<String> {
    options
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_ref())
        .and_then(|val| val.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| eyre!("Missing {} parameter", name))
}
