use pretty_assertions::assert_eq;
use rallybot_core::models::countdown::CueId;
use rallybot_discord_bot::config::BotConfig;
use rstest::rstest;
use std::collections::HashMap;
use std::time::Duration;
use tracing::Level;

fn load(vars: &[(&str, &str)]) -> eyre::Result<BotConfig> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    BotConfig::from_lookup(|key| vars.get(key).cloned())
}

#[test]
fn test_defaults() {
    let config = load(&[("DISCORD_BOT_TOKEN", "test_token")]).unwrap();

    assert_eq!(config.token, "test_token");
    assert!(config.enable_voice);
    assert_eq!(config.temp_vc_category_id, None);
    assert_eq!(config.hitters_role_name, "hitters");
    assert_eq!(config.idle_timeout(), Duration::from_secs(300));
    assert!(config.guild_ids.is_empty());
    assert_eq!(config.log_level(), Level::INFO);
}

#[test]
fn test_missing_token() {
    assert!(load(&[]).is_err());
    assert!(load(&[("DISCORD_BOT_TOKEN", "  ")]).is_err());
}

#[test]
fn test_legacy_token_name() {
    let config = load(&[("DISCORD_TOKEN", "legacy")]).unwrap();
    assert_eq!(config.token, "legacy");
}

#[test]
fn test_overrides() {
    let config = load(&[
        ("DISCORD_BOT_TOKEN", "t"),
        ("ENABLE_VOICE", "false"),
        ("TEMP_VC_CATEGORY_ID", "123456789"),
        ("HITTERS_ROLE_NAME", "Strikers"),
        ("DELETE_VC_IF_EMPTY_AFTER_SECS", "60"),
        ("GUILD_IDS", "1, 2,nope,3"),
        ("LOG_LEVEL", "DEBUG"),
    ])
    .unwrap();

    assert!(!config.enable_voice);
    assert_eq!(config.temp_vc_category_id, Some(123456789));
    assert_eq!(config.hitters_role_name, "Strikers");
    assert_eq!(config.idle_timeout(), Duration::from_secs(60));
    assert_eq!(config.guild_ids, vec![1, 2, 3]);
    assert_eq!(config.log_level(), Level::DEBUG);
}

#[test]
fn test_zero_category_means_none() {
    let config = load(&[("DISCORD_BOT_TOKEN", "t"), ("TEMP_VC_CATEGORY_ID", "0")]).unwrap();
    assert_eq!(config.temp_vc_category_id, None);
}

#[rstest]
#[case("TEMP_VC_CATEGORY_ID", "general")]
#[case("DELETE_VC_IF_EMPTY_AFTER_SECS", "five minutes")]
#[case("ENABLE_VOICE", "maybe")]
fn test_invalid_values(#[case] key: &str, #[case] value: &str) {
    assert!(load(&[("DISCORD_BOT_TOKEN", "t"), (key, value)]).is_err());
}

#[rstest]
#[case("1", true)]
#[case("yes", true)]
#[case("ON", true)]
#[case("0", false)]
#[case("no", false)]
fn test_enable_voice_spellings(#[case] value: &str, #[case] expected: bool) {
    let config = load(&[("DISCORD_BOT_TOKEN", "t"), ("ENABLE_VOICE", value)]).unwrap();
    assert_eq!(config.enable_voice, expected);
}

#[test]
fn test_default_audio_catalog() {
    let config = load(&[("DISCORD_BOT_TOKEN", "t")]).unwrap();

    assert!(config.audio.url(CueId::Bomb5m).is_some());
    assert!(config.audio.url(CueId::ExplainRoll).is_some());
    assert_eq!(
        config.audio.missing(&CueId::ALL),
        vec![CueId::Bomb30m, CueId::Bomb1h]
    );
}

#[test]
fn test_audio_overrides() {
    let config = load(&[
        ("DISCORD_BOT_TOKEN", "t"),
        ("AUDIO_30M_BOMB", "https://example.com/30m.mp3"),
        ("AUDIO_5S_ROLL", ""),
    ])
    .unwrap();

    assert_eq!(config.audio.url(CueId::Bomb30m), Some("https://example.com/30m.mp3"));
    // An empty value switches the clip off
    assert_eq!(config.audio.url(CueId::Roll5s), None);
}

#[test]
fn test_unknown_log_level_falls_back_to_info() {
    let config = load(&[("DISCORD_BOT_TOKEN", "t"), ("LOG_LEVEL", "chatty")]).unwrap();
    assert_eq!(config.log_level(), Level::INFO);
}
