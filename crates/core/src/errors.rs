use thiserror::Error;

use crate::models::rally::RallyId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RallyError {
    #[error("You need the `{0}` role to use this command")]
    Unauthorized(String),

    #[error("Voice features are disabled on this bot")]
    VoiceDisabled,

    #[error("Rally {0} not found")]
    NotFound(RallyId),

    #[error("Rally {0} already exists")]
    DuplicateRally(RallyId),

    #[error("Couldn't create voice channel: {0}")]
    ChannelCreationFailed(String),

    #[error("Playback failed: {0}")]
    PlaybackFailed(String),

    #[error("{0}")]
    Validation(String),
}

pub type RallyResult<T> = Result<T, RallyError>;
