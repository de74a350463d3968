//! Command routing and access control.
//!
//! Every slash command the bot answers is listed in [`ROUTES`]. Dispatch looks
//! the invocation up there, checks the route's [`Access`] policy and only then
//! hands off to the handler, so a rejected command never touches rally state.

use rallybot_core::errors::RallyError;
use rallybot_core::models::rally::{RallyId, RallyKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    RallyKeep,
    RallySop,
    CountdownBomb,
    CountdownRolling,
    CountdownStop,
    CountdownExplain,
    Stay,
    Leave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Anyone in the guild.
    Open,
    /// Members with the hitters role.
    Hitters,
    /// Members with the hitters role, and voice must be enabled.
    HittersVoice,
}

/// (command, subcommand, route)
pub const ROUTES: &[(&str, Option<&str>, Route)] = &[
    ("rally", Some("keep"), Route::RallyKeep),
    ("rally", Some("sop"), Route::RallySop),
    ("type_of_rally", Some("bomb"), Route::CountdownBomb),
    ("type_of_rally", Some("rolling"), Route::CountdownRolling),
    ("type_of_rally", Some("stop"), Route::CountdownStop),
    ("type_of_rally", Some("explain"), Route::CountdownExplain),
    ("stay", None, Route::Stay),
    ("leave", None, Route::Leave),
];

/// Look up the route for a command invocation.
pub fn route(command: &str, subcommand: Option<&str>) -> Option<Route> {
    ROUTES
        .iter()
        .find(|(name, sub, _)| *name == command && *sub == subcommand)
        .map(|(_, _, route)| *route)
}

impl Route {
    pub fn access(&self) -> Access {
        match self {
            Route::CountdownExplain => Access::Open,
            Route::RallyKeep | Route::RallySop => Access::Hitters,
            Route::CountdownBomb
            | Route::CountdownRolling
            | Route::CountdownStop
            | Route::Stay
            | Route::Leave => Access::HittersVoice,
        }
    }
}

/// Case-insensitive role name match.
pub fn has_role(role_names: &[String], required: &str) -> bool {
    role_names.iter().any(|name| name.eq_ignore_ascii_case(required))
}

/// Check an access policy against the invoker's role names.
///
/// # Errors
///
/// * `Unauthorized` if the policy needs the hitters role and it is missing
/// * `VoiceDisabled` if the policy needs voice and it is switched off
pub fn authorize(
    access: Access,
    role_names: &[String],
    required_role: &str,
    voice_enabled: bool,
) -> Result<(), RallyError> {
    if access == Access::Open {
        return Ok(());
    }

    if !has_role(role_names, required_role) {
        return Err(RallyError::Unauthorized(required_role.to_string()));
    }

    if access == Access::HittersVoice && !voice_enabled {
        return Err(RallyError::VoiceDisabled);
    }

    Ok(())
}

/// Buttons on a rally post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentAction {
    Join(RallyId),
    Leave(RallyId),
    Export(RallyId),
}

impl ComponentAction {
    pub fn custom_id(&self) -> String {
        match self {
            ComponentAction::Join(id) => format!("rally:join:{}", id),
            ComponentAction::Leave(id) => format!("rally:leave:{}", id),
            ComponentAction::Export(id) => format!("rally:export:{}", id),
        }
    }

    pub fn parse(custom_id: &str) -> Option<Self> {
        let mut parts = custom_id.split(':');
        if parts.next()? != "rally" {
            return None;
        }

        let action = parts.next()?;
        let id = parts.next()?.parse::<RallyId>().ok()?;
        if parts.next().is_some() {
            return None;
        }

        match action {
            "join" => Some(ComponentAction::Join(id)),
            "leave" => Some(ComponentAction::Leave(id)),
            "export" => Some(ComponentAction::Export(id)),
            _ => None,
        }
    }

    /// Every button changes or reveals a roster, so all of them need the role.
    pub fn access(&self) -> Access {
        Access::Hitters
    }
}

/// Modal forms the bot opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalAction {
    CreateRally(RallyKind),
    JoinRally(RallyId),
}

impl ModalAction {
    pub fn custom_id(&self) -> String {
        match self {
            ModalAction::CreateRally(kind) => format!("rally_form:{}", kind.as_str()),
            ModalAction::JoinRally(id) => format!("rally_join:{}", id),
        }
    }

    pub fn parse(custom_id: &str) -> Option<Self> {
        let (prefix, rest) = custom_id.split_once(':')?;

        match prefix {
            "rally_form" => rest.parse::<RallyKind>().ok().map(ModalAction::CreateRally),
            "rally_join" => rest.parse::<RallyId>().ok().map(ModalAction::JoinRally),
            _ => None,
        }
    }
}
