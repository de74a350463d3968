//! Serenity and songbird implementations of the bot's platform seams.

use async_trait::async_trait;
use rallybot_core::errors::RallyError;
use rallybot_core::models::countdown::CueId;
use serenity::http::Http;
use serenity::model::channel::{ChannelType, PermissionOverwrite, PermissionOverwriteType};
use serenity::model::id::{ChannelId, GuildId, UserId};
use serenity::model::permissions::Permissions;
use songbird::Songbird;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::AudioCatalog;
use crate::countdown::CuePlayer;
use crate::voice::{ChannelOps, ChannelRequest};

/// Voice channel operations backed by Discord's REST API.
pub struct SerenityChannels {
    http: Arc<Http>,
}

impl SerenityChannels {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ChannelOps for SerenityChannels {
    async fn create_voice_channel(&self, request: ChannelRequest) -> Result<u64, String> {
        let channel = GuildId(request.guild_id)
            .create_channel(&self.http, |c| {
                c.name(&request.name).kind(ChannelType::Voice);

                if let Some(category_id) = request.category_id {
                    c.category(ChannelId(category_id));
                }

                if let Some(limit) = request.user_limit {
                    c.user_limit(limit);
                }

                if let Some(owner_id) = request.owner_id {
                    c.permissions(vec![PermissionOverwrite {
                        allow: Permissions::VIEW_CHANNEL | Permissions::CONNECT | Permissions::MANAGE_CHANNELS,
                        deny: Permissions::empty(),
                        kind: PermissionOverwriteType::Member(UserId(owner_id)),
                    }]);
                }

                c
            })
            .await
            .map_err(|e| e.to_string())?;

        Ok(channel.id.0)
    }

    async fn delete_voice_channel(&self, channel_id: u64) -> Result<(), String> {
        ChannelId(channel_id)
            .delete(&self.http)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Join a voice channel, moving the bot if it is elsewhere in the guild.
pub async fn connect(songbird: &Songbird, guild_id: u64, channel_id: u64) -> Result<(), RallyError> {
    let (_call, result) = songbird.join(GuildId(guild_id), ChannelId(channel_id)).await;

    result.map_err(|e| RallyError::PlaybackFailed(format!("couldn't join voice channel: {}", e)))
}

/// Leave voice in a guild. Not being connected is fine.
pub async fn disconnect(songbird: &Songbird, guild_id: u64) {
    if songbird.get(GuildId(guild_id)).is_none() {
        return;
    }

    if let Err(e) = songbird.remove(GuildId(guild_id)).await {
        warn!("Failed to leave voice in guild {}: {:?}", guild_id, e);
    }
}

/// Leave voice in a guild, but only if the bot is still sitting in `channel_id`.
pub async fn disconnect_from(songbird: &Songbird, guild_id: u64, channel_id: u64) {
    let Some(call) = songbird.get(GuildId(guild_id)) else {
        return;
    };

    let current = call.lock().await.current_channel();
    if current == Some(ChannelId(channel_id).into()) {
        disconnect(songbird, guild_id).await;
    }
}

/// Stop whatever is playing without leaving, if the bot is sitting in `channel_id`.
pub async fn stop_playback(songbird: &Songbird, guild_id: u64, channel_id: u64) {
    let Some(call) = songbird.get(GuildId(guild_id)) else {
        return;
    };

    let mut handler = call.lock().await;
    if handler.current_channel() == Some(ChannelId(channel_id).into()) {
        handler.stop();
    }
}

/// Plays cues into a guild's voice call with songbird.
///
/// Cues without a configured clip are announced as text in the channel the
/// countdown was started from.
pub struct SongbirdPlayer {
    songbird: Arc<Songbird>,
    http: Arc<Http>,
    audio: AudioCatalog,
    guild_id: u64,
    voice_channel_id: u64,
    notice_channel_id: u64,
}

impl SongbirdPlayer {
    pub fn new(
        songbird: Arc<Songbird>,
        http: Arc<Http>,
        audio: AudioCatalog,
        guild_id: u64,
        voice_channel_id: u64,
        notice_channel_id: u64,
    ) -> Self {
        Self {
            songbird,
            http,
            audio,
            guild_id,
            voice_channel_id,
            notice_channel_id,
        }
    }

    async fn post_notice(&self, cue: CueId) -> Result<(), RallyError> {
        info!("No clip configured for {:?}, posting text instead", cue);

        ChannelId(self.notice_channel_id)
            .say(&self.http, format!("⏰ **{}** (no audio clip configured)", cue.label()))
            .await
            .map(|_| ())
            .map_err(|e| RallyError::PlaybackFailed(e.to_string()))
    }
}

#[async_trait]
impl CuePlayer for SongbirdPlayer {
    async fn play(&self, cue: CueId) -> Result<(), RallyError> {
        let Some(url) = self.audio.url(cue) else {
            return self.post_notice(cue).await;
        };

        let call = match self.songbird.get(GuildId(self.guild_id)) {
            Some(call) => call,
            None => {
                // Dropped out of voice mid-countdown; try to get back in
                connect(&self.songbird, self.guild_id, self.voice_channel_id).await?;
                self.songbird
                    .get(GuildId(self.guild_id))
                    .ok_or_else(|| RallyError::PlaybackFailed("not connected to voice".to_string()))?
            }
        };

        let source = songbird::ffmpeg(url)
            .await
            .map_err(|e| RallyError::PlaybackFailed(format!("{}: {}", cue.label(), e)))?;

        let mut handler = call.lock().await;
        if handler.current_channel() != Some(ChannelId(self.voice_channel_id).into()) {
            return Err(RallyError::PlaybackFailed(format!(
                "bot is no longer in voice channel {}",
                self.voice_channel_id
            )));
        }

        // A new cue cuts off whatever is still playing
        handler.stop();
        handler.play_source(source);

        Ok(())
    }
}
