//! Temporary voice channel management.
//!
//! The manager creates voice channels on request, follows who is sitting in
//! them from voice state updates, and deletes a channel once it has been empty
//! for the configured idle timeout. Deleting a channel cancels any countdown
//! running in it and emits a [`VoiceEvent`] for the rest of the bot to clean up
//! after it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use rallybot_core::errors::RallyError;
use rallybot_core::models::rally::RallyId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::countdown::CountdownRegistry;

/// Parameters for a new temporary voice channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRequest {
    pub guild_id: u64,
    pub name: String,
    pub category_id: Option<u64>,
    pub owner_id: Option<u64>,
    pub user_limit: Option<u32>,
}

/// The platform operations the manager depends on.
#[automock]
#[async_trait]
pub trait ChannelOps: Send + Sync {
    /// Create a voice channel, returning its id. Errors carry the platform's reason.
    async fn create_voice_channel(&self, request: ChannelRequest) -> Result<u64, String>;

    async fn delete_voice_channel(&self, channel_id: u64) -> Result<(), String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownReason {
    /// Nobody came back before the idle timeout.
    IdleTimeout,
    /// Someone used `/leave`.
    Forced,
}

/// Emitted after a managed channel is deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEvent {
    ChannelDeleted {
        guild_id: u64,
        channel_id: u64,
        rally_id: Option<RallyId>,
        reason: TeardownReason,
    },
}

#[derive(Debug, Clone)]
pub struct VoiceSession {
    pub guild_id: u64,
    pub channel_id: u64,
    pub rally_id: Option<RallyId>,
    pub occupants: HashSet<u64>,
    pub pinned: bool,
    pub last_empty: Option<DateTime<Utc>>,
}

impl VoiceSession {
    pub fn is_empty(&self) -> bool {
        self.occupants.is_empty()
    }
}

struct Inner {
    ops: Arc<dyn ChannelOps>,
    idle_timeout: Duration,
    default_category: Option<u64>,
    countdowns: CountdownRegistry,
    sessions: RwLock<HashMap<u64, VoiceSession>>,
    timers: RwLock<HashMap<u64, JoinHandle<()>>>,
    events: mpsc::UnboundedSender<VoiceEvent>,
}

#[derive(Clone)]
pub struct VoiceChannelManager {
    inner: Arc<Inner>,
}

impl VoiceChannelManager {
    /// Create a manager and the receiving end of its deletion events.
    pub fn new(
        ops: Arc<dyn ChannelOps>,
        idle_timeout: Duration,
        default_category: Option<u64>,
        countdowns: CountdownRegistry,
    ) -> (Self, mpsc::UnboundedReceiver<VoiceEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();

        let manager = Self {
            inner: Arc::new(Inner {
                ops,
                idle_timeout,
                default_category,
                countdowns,
                sessions: RwLock::new(HashMap::new()),
                timers: RwLock::new(HashMap::new()),
                events,
            }),
        };

        (manager, receiver)
    }

    pub fn idle_timeout(&self) -> Duration {
        self.inner.idle_timeout
    }

    /// Create a temporary voice channel and start tracking it.
    ///
    /// The request's category wins over the configured default. A fresh
    /// channel is empty, so its idle timer starts right away.
    ///
    /// # Errors
    ///
    /// `ChannelCreationFailed` when the platform refuses, e.g. missing permissions.
    pub async fn acquire(&self, mut request: ChannelRequest, rally_id: Option<RallyId>) -> Result<u64, RallyError> {
        if request.category_id.is_none() {
            request.category_id = self.inner.default_category;
        }

        let guild_id = request.guild_id;
        let channel_id = self
            .inner
            .ops
            .create_voice_channel(request)
            .await
            .map_err(RallyError::ChannelCreationFailed)?;

        info!("Created temporary voice channel {} in guild {}", channel_id, guild_id);

        self.inner.sessions.write().await.insert(
            channel_id,
            VoiceSession {
                guild_id,
                channel_id,
                rally_id,
                occupants: HashSet::new(),
                pinned: false,
                last_empty: Some(Utc::now()),
            },
        );

        self.release(channel_id).await;
        Ok(channel_id)
    }

    /// Start, or restart, the idle timer of a managed channel.
    ///
    /// Does nothing for unmanaged or pinned channels. When the timer fires and
    /// the channel is still empty, it is deleted.
    pub async fn release(&self, channel_id: u64) {
        {
            let mut sessions = self.inner.sessions.write().await;
            let Some(session) = sessions.get_mut(&channel_id) else {
                return;
            };
            if session.pinned {
                debug!("Channel {} is pinned, not starting idle timer", channel_id);
                return;
            }
            session.last_empty.get_or_insert_with(Utc::now);
        }

        let manager = self.clone();
        let timeout = self.inner.idle_timeout;

        let mut timers = self.inner.timers.write().await;
        if let Some(previous) = timers.remove(&channel_id) {
            previous.abort();
        }

        debug!("Channel {} will be deleted in {:?} if it stays empty", channel_id, timeout);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            manager.idle_timer_fired(channel_id).await;
        });
        timers.insert(channel_id, handle);
    }

    async fn idle_timer_fired(&self, channel_id: u64) {
        self.inner.timers.write().await.remove(&channel_id);

        let still_empty = self
            .inner
            .sessions
            .read()
            .await
            .get(&channel_id)
            .is_some_and(|s| s.is_empty() && !s.pinned);

        if still_empty {
            self.delete(channel_id, TeardownReason::IdleTimeout).await;
        }
    }

    async fn cancel_timer(&self, channel_id: u64) -> bool {
        match self.inner.timers.write().await.remove(&channel_id) {
            Some(handle) => {
                handle.abort();
                debug!("Canceled idle timer for channel {}", channel_id);
                true
            }
            None => false,
        }
    }

    /// Record a user moving between voice channels.
    ///
    /// A managed channel that gains its first occupant has its idle timer
    /// canceled; one that loses its last occupant is released.
    pub async fn occupancy_changed(&self, user_id: u64, old: Option<u64>, new: Option<u64>) {
        if old == new {
            return;
        }

        let mut emptied = None;
        let mut filled = None;

        {
            let mut sessions = self.inner.sessions.write().await;

            if let Some(session) = old.and_then(|id| sessions.get_mut(&id)) {
                if session.occupants.remove(&user_id) && session.is_empty() {
                    session.last_empty = Some(Utc::now());
                    emptied = Some(session.channel_id);
                }
            }

            if let Some(session) = new.and_then(|id| sessions.get_mut(&id)) {
                let was_empty = session.is_empty();
                if session.occupants.insert(user_id) && was_empty {
                    session.last_empty = None;
                    filled = Some(session.channel_id);
                }
            }
        }

        if let Some(channel_id) = filled {
            self.cancel_timer(channel_id).await;
        }

        if let Some(channel_id) = emptied {
            self.release(channel_id).await;
        }
    }

    /// Bind a managed channel to the rally that was posted for it.
    pub async fn assign_rally(&self, channel_id: u64, rally_id: RallyId) -> bool {
        match self.inner.sessions.write().await.get_mut(&channel_id) {
            Some(session) => {
                session.rally_id = Some(rally_id);
                true
            }
            None => false,
        }
    }

    /// Keep a managed channel around until someone uses `/leave`.
    ///
    /// Returns `false` when the channel is not managed by the bot.
    pub async fn stay(&self, channel_id: u64) -> bool {
        {
            let mut sessions = self.inner.sessions.write().await;
            let Some(session) = sessions.get_mut(&channel_id) else {
                return false;
            };
            session.pinned = true;
        }

        self.cancel_timer(channel_id).await;
        info!("Channel {} pinned", channel_id);
        true
    }

    /// Delete a managed channel now, regardless of occupants or pinning.
    ///
    /// Returns `false` when the channel is not managed by the bot.
    pub async fn teardown(&self, channel_id: u64) -> bool {
        self.cancel_timer(channel_id).await;
        self.delete(channel_id, TeardownReason::Forced).await
    }

    /// Called when a countdown in a channel ends on its own.
    pub async fn countdown_finished(&self, channel_id: u64) {
        let empty = self
            .inner
            .sessions
            .read()
            .await
            .get(&channel_id)
            .is_some_and(VoiceSession::is_empty);

        if empty {
            self.release(channel_id).await;
        }
    }

    async fn delete(&self, channel_id: u64, reason: TeardownReason) -> bool {
        let Some(session) = self.inner.sessions.write().await.remove(&channel_id) else {
            return false;
        };

        self.inner.countdowns.cancel_channel(channel_id).await;

        match self.inner.ops.delete_voice_channel(channel_id).await {
            Ok(()) => info!("Deleted voice channel {} ({:?})", channel_id, reason),
            Err(e) => warn!("Couldn't delete voice channel {}: {}", channel_id, e),
        }

        let event = VoiceEvent::ChannelDeleted {
            guild_id: session.guild_id,
            channel_id,
            rally_id: session.rally_id,
            reason,
        };

        if self.inner.events.send(event).is_err() {
            error!("Voice event receiver dropped, channel {} cleanup skipped", channel_id);
        }

        true
    }

    pub async fn session(&self, channel_id: u64) -> Option<VoiceSession> {
        self.inner.sessions.read().await.get(&channel_id).cloned()
    }

    pub async fn is_managed(&self, channel_id: u64) -> bool {
        self.inner.sessions.read().await.contains_key(&channel_id)
    }

    /// The guild's managed channel, when it has exactly one.
    ///
    /// # Errors
    ///
    /// `Validation` when several managed channels are open, since there is no
    /// telling which one a command from outside voice means.
    pub async fn sole_for_guild(&self, guild_id: u64) -> Result<Option<u64>, RallyError> {
        let sessions = self.inner.sessions.read().await;
        let mut channels = sessions.values().filter(|s| s.guild_id == guild_id).map(|s| s.channel_id);

        match (channels.next(), channels.next()) {
            (None, _) => Ok(None),
            (Some(channel_id), None) => Ok(Some(channel_id)),
            (Some(_), Some(_)) => Err(RallyError::Validation(
                "Several rally voice channels are open. Join the one you mean first.".to_string(),
            )),
        }
    }

    pub async fn session_for_rally(&self, rally_id: RallyId) -> Option<VoiceSession> {
        self.inner
            .sessions
            .read()
            .await
            .values()
            .find(|s| s.rally_id == Some(rally_id))
            .cloned()
    }

    /// Stop every idle timer, used on shutdown.
    pub async fn shutdown(&self) {
        for (_, handle) in self.inner.timers.write().await.drain() {
            handle.abort();
        }
    }
}
