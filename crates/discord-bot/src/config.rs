use eyre::{Result, WrapErr, eyre};
use rallybot_core::models::countdown::CueId;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use tracing::Level;

const AUDIO_BASE_URL: &str = "https://storage.googleapis.com/rallybot";

/// Clip URLs used when the matching `AUDIO_*` variable is not set.
/// The 30 minute and 1 hour bombs have no hosted clip yet.
fn default_audio_url(cue: CueId) -> Option<String> {
    let file = match cue {
        CueId::Bomb5m => "5minbombcomplete.mp3",
        CueId::Bomb10m => "10minbomb.mp3",
        CueId::Bomb30m | CueId::Bomb1h => return None,
        CueId::ExplainBomb => "explainbombrally.mp3",
        CueId::Roll5s => "5secondgaps.mp3",
        CueId::Roll10s => "10secondgaps.mp3",
        CueId::Roll15s => "15secondgaps.mp3",
        CueId::Roll30s => "30secondgaps.mp3",
        CueId::ExplainRoll => "explainrollingrallies.mp3",
    };

    Some(format!("{}/{}", AUDIO_BASE_URL, file))
}

/// Audio clip URLs keyed by cue.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AudioCatalog {
    urls: HashMap<CueId, String>,
}

impl AudioCatalog {
    pub fn new(urls: HashMap<CueId, String>) -> Self {
        Self { urls }
    }

    /// URL for a cue, if one is configured.
    pub fn url(&self, cue: CueId) -> Option<&str> {
        self.urls.get(&cue).map(String::as_str)
    }

    /// Cues among `cues` that have no clip configured.
    pub fn missing(&self, cues: &[CueId]) -> Vec<CueId> {
        cues.iter().copied().filter(|cue| self.url(*cue).is_none()).collect()
    }
}

/// Configuration for the Discord bot.
///
/// Loaded from the environment (and `.env`) at startup. Only the token is
/// required; everything else has a default.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Discord bot token (required)
    pub token: String,
    /// Whether voice channels and countdown audio are enabled
    pub enable_voice: bool,
    /// Category new temporary voice channels are created under
    pub temp_vc_category_id: Option<u64>,
    /// Role required to run rally commands, also mentioned on rally posts
    pub hitters_role_name: String,
    /// How long an empty temporary voice channel survives
    pub delete_vc_if_empty_after_secs: u64,
    /// Guilds that get commands registered directly (no global cache delay)
    pub guild_ids: Vec<u64>,
    /// Log level name (trace, debug, info, warn, error)
    pub log_level: String,
    /// Countdown clip URLs
    pub audio: AudioCatalog,
}

impl BotConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("DISCORD_BOT_TOKEN")
            .or_else(|| lookup("DISCORD_TOKEN"))
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| eyre!("Set DISCORD_BOT_TOKEN (or DISCORD_TOKEN) in your environment / .env file"))?;

        let enable_voice = match lookup("ENABLE_VOICE") {
            Some(value) => parse_bool(&value)
                .ok_or_else(|| eyre!("ENABLE_VOICE must be true or false, got {}", value))?,
            None => true,
        };

        // 0 means "no category", same as leaving it unset
        let temp_vc_category_id = lookup("TEMP_VC_CATEGORY_ID")
            .map(|id| id.trim().parse::<u64>())
            .transpose()
            .wrap_err("TEMP_VC_CATEGORY_ID must be a valid u64")?
            .filter(|id| *id != 0);

        let hitters_role_name = lookup("HITTERS_ROLE_NAME")
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "hitters".to_string());

        let delete_vc_if_empty_after_secs = lookup("DELETE_VC_IF_EMPTY_AFTER_SECS")
            .unwrap_or_else(|| "300".to_string())
            .trim()
            .parse::<u64>()
            .wrap_err("DELETE_VC_IF_EMPTY_AFTER_SECS must be a number of seconds")?;

        let guild_ids = lookup("GUILD_IDS")
            .map(|ids| {
                ids.split(',')
                    .filter_map(|id| id.trim().parse::<u64>().ok())
                    .collect()
            })
            .unwrap_or_default();

        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let urls = CueId::ALL
            .into_iter()
            .filter_map(|cue| {
                let url = match lookup(cue.env_key()) {
                    Some(url) => Some(url),
                    None => default_audio_url(cue),
                };
                url.filter(|u| !u.trim().is_empty()).map(|u| (cue, u))
            })
            .collect();

        Ok(Self {
            token,
            enable_voice,
            temp_vc_category_id,
            hitters_role_name,
            delete_vc_if_empty_after_secs,
            guild_ids,
            log_level,
            audio: AudioCatalog::new(urls),
        })
    }

    /// Idle timeout for empty temporary voice channels
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.delete_vc_if_empty_after_secs)
    }

    /// Parsed log level, defaulting to INFO for unknown names
    pub fn log_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
