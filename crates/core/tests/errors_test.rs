use pretty_assertions::assert_eq;
use rallybot_core::errors::{RallyError, RallyResult};
use rallybot_core::models::rally::RallyId;

#[test]
fn test_rally_error_display() {
    let unauthorized = RallyError::Unauthorized("hitters".to_string());
    let not_found = RallyError::NotFound(RallyId(42));
    let duplicate = RallyError::DuplicateRally(RallyId(7));
    let channel = RallyError::ChannelCreationFailed("Missing Permissions".to_string());
    let playback = RallyError::PlaybackFailed("driver disconnected".to_string());
    let validation = RallyError::Validation("Troop Tier must be one of T8/T9/T10/T11/T12.".to_string());

    assert_eq!(
        unauthorized.to_string(),
        "You need the `hitters` role to use this command"
    );
    assert_eq!(RallyError::VoiceDisabled.to_string(), "Voice features are disabled on this bot");
    assert_eq!(not_found.to_string(), "Rally 42 not found");
    assert_eq!(duplicate.to_string(), "Rally 7 already exists");
    assert_eq!(
        channel.to_string(),
        "Couldn't create voice channel: Missing Permissions"
    );
    assert!(playback.to_string().starts_with("Playback failed:"));
    assert_eq!(
        validation.to_string(),
        "Troop Tier must be one of T8/T9/T10/T11/T12."
    );
}

#[test]
fn test_rally_result() {
    let result: RallyResult<i32> = Ok(42);
    assert_eq!(result, Ok(42));

    let result: RallyResult<i32> = Err(RallyError::NotFound(RallyId(1)));
    assert!(matches!(result, Err(RallyError::NotFound(RallyId(1)))));
}

#[test]
fn test_error_is_std_error() {
    let error: Box<dyn std::error::Error + Send + Sync> =
        Box::new(RallyError::DuplicateRally(RallyId(3)));

    assert!(error.to_string().contains("already exists"));
}
