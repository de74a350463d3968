use rallybot_core::roster::RosterStore;
use serenity::http::Http;
use songbird::Songbird;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tracing::info;

use crate::config::BotConfig;
use crate::countdown::CountdownRegistry;
use crate::platform::SerenityChannels;
use crate::voice::{ChannelOps, VoiceChannelManager, VoiceEvent};

/// Process-wide state shared by every handler.
///
/// Built once at startup and dropped on shutdown. Everything in here is cheap
/// to clone behind an `Arc`.
pub struct BotState {
    pub config: BotConfig,
    pub http: Arc<Http>,
    pub songbird: Arc<Songbird>,
    pub roster: Arc<RwLock<RosterStore>>,
    pub voice: VoiceChannelManager,
    pub countdowns: CountdownRegistry,
}

impl BotState {
    /// Build the state for a live bot.
    pub fn new(
        config: BotConfig,
        http: Arc<Http>,
        songbird: Arc<Songbird>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<VoiceEvent>) {
        let ops: Arc<dyn ChannelOps> = Arc::new(SerenityChannels::new(http.clone()));
        Self::with_channel_ops(config, http, songbird, ops)
    }

    /// Build the state with a custom channel backend.
    pub fn with_channel_ops(
        config: BotConfig,
        http: Arc<Http>,
        songbird: Arc<Songbird>,
        ops: Arc<dyn ChannelOps>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<VoiceEvent>) {
        let countdowns = CountdownRegistry::new();
        let (voice, events) = VoiceChannelManager::new(
            ops,
            config.idle_timeout(),
            config.temp_vc_category_id,
            countdowns.clone(),
        );

        let state = Arc::new(Self {
            config,
            http,
            songbird,
            roster: Arc::new(RwLock::new(RosterStore::new())),
            voice,
            countdowns,
        });

        (state, events)
    }

    /// Stop all timers and countdowns.
    pub async fn shutdown(&self) {
        info!("Shutting down rally state");
        self.countdowns.cancel_all().await;
        self.voice.shutdown().await;
    }
}
