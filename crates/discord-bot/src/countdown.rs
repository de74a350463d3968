//! Countdown scheduling.
//!
//! A countdown walks the steps of a [`CountdownPlan`], sleeping until each
//! step's offset from the start and then asking a [`CuePlayer`] to play the
//! cue. Playback is best effort: a failed cue is logged and the next step
//! still runs.
//!
//! Running countdowns are owned by a [`CountdownRegistry`], which keeps one
//! abortable task per guild.

use async_trait::async_trait;
use mockall::automock;
use rallybot_core::errors::RallyError;
use rallybot_core::models::countdown::{CountdownPlan, CueId};
use rallybot_core::models::rally::RallyId;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

/// Something that can play a cue into a voice channel.
#[automock]
#[async_trait]
pub trait CuePlayer: Send + Sync {
    async fn play(&self, cue: CueId) -> Result<(), RallyError>;
}

/// Play every step of `plan` through `player`, in offset order.
///
/// Returns the number of cues that played successfully. For a repeating plan
/// this only returns when the task is aborted.
pub async fn run_plan(plan: &CountdownPlan, player: &dyn CuePlayer) -> usize {
    let start = Instant::now();
    let mut played = 0;

    for step in plan.steps() {
        sleep_until(start + step.offset).await;

        match player.play(step.cue).await {
            Ok(()) => {
                played += 1;
                debug!("Played cue {:?} at {:?}", step.cue, step.offset);
            }
            Err(e) => warn!("Cue {:?} at {:?} failed, continuing: {}", step.cue, step.offset, e),
        }
    }

    played
}

/// Identifies a running countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CountdownKey {
    pub guild_id: u64,
    pub channel_id: u64,
    pub rally_id: Option<RallyId>,
}

struct RunningCountdown {
    key: CountdownKey,
    generation: u64,
    handle: JoinHandle<()>,
}

/// Cancellable countdown tasks, at most one per guild.
///
/// The bot holds a single voice connection per guild, so a countdown started
/// in one channel replaces any countdown running elsewhere in the same guild.
#[derive(Clone, Default)]
pub struct CountdownRegistry {
    running: Arc<RwLock<HashMap<u64, RunningCountdown>>>,
    generation: Arc<AtomicU64>,
}

impl CountdownRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `plan` for the guild in `key`, replacing whatever ran there.
    ///
    /// Returns the key of the countdown that was replaced, if any.
    ///
    /// `on_finish` runs after a finite plan plays its last cue. It does not run
    /// when the countdown is canceled.
    pub async fn start<F>(
        &self,
        key: CountdownKey,
        plan: CountdownPlan,
        player: Arc<dyn CuePlayer>,
        on_finish: F,
    ) -> Option<CountdownKey>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let running = self.running.clone();
        let CountdownKey { guild_id, channel_id, .. } = key;

        // Hold the lock across spawn so a fast finish can't race the insert
        let mut tasks = self.running.write().await;

        let replaced = tasks.remove(&guild_id).map(|previous| {
            info!(
                "Replacing countdown in channel {} with one in channel {} (guild {})",
                previous.key.channel_id, channel_id, guild_id
            );
            previous.handle.abort();
            previous.key
        });

        let handle = tokio::spawn(async move {
            let played = run_plan(&plan, player.as_ref()).await;
            info!(
                "{} countdown in channel {} finished, {} cues played",
                plan.kind().label(),
                channel_id,
                played
            );

            {
                let mut tasks = running.write().await;
                if tasks.get(&guild_id).is_some_and(|t| t.generation == generation) {
                    tasks.remove(&guild_id);
                }
            }

            on_finish.await;
        });

        tasks.insert(
            guild_id,
            RunningCountdown {
                key,
                generation,
                handle,
            },
        );

        replaced
    }

    /// Abort the countdown running in a channel. Returns whether one was running.
    pub async fn cancel_channel(&self, channel_id: u64) -> bool {
        let mut tasks = self.running.write().await;
        let Some(guild_id) = tasks
            .iter()
            .find(|(_, t)| t.key.channel_id == channel_id)
            .map(|(guild_id, _)| *guild_id)
        else {
            return false;
        };

        if let Some(countdown) = tasks.remove(&guild_id) {
            countdown.handle.abort();
            info!("Canceled countdown in channel {}", channel_id);
        }
        true
    }

    /// Abort every countdown bound to a rally.
    pub async fn cancel_rally(&self, rally_id: RallyId) -> usize {
        let mut tasks = self.running.write().await;
        let guilds: Vec<u64> = tasks
            .iter()
            .filter(|(_, t)| t.key.rally_id == Some(rally_id))
            .map(|(guild_id, _)| *guild_id)
            .collect();

        for guild_id in &guilds {
            if let Some(countdown) = tasks.remove(guild_id) {
                countdown.handle.abort();
            }
        }

        guilds.len()
    }

    pub async fn is_running(&self, channel_id: u64) -> bool {
        self.running
            .read()
            .await
            .values()
            .any(|t| t.key.channel_id == channel_id)
    }

    /// The channel a guild's countdown is playing in.
    pub async fn channel_for_guild(&self, guild_id: u64) -> Option<u64> {
        self.running.read().await.get(&guild_id).map(|t| t.key.channel_id)
    }

    pub async fn active_keys(&self) -> Vec<CountdownKey> {
        self.running.read().await.values().map(|t| t.key).collect()
    }

    /// Abort everything, used on shutdown.
    pub async fn cancel_all(&self) {
        for (_, countdown) in self.running.write().await.drain() {
            countdown.handle.abort();
        }
    }
}
