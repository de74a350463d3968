use mockall::predicate::eq;
use pretty_assertions::assert_eq;
use rallybot_core::errors::RallyError;
use rallybot_core::models::countdown::{CountdownPlan, RollingGap};
use rallybot_core::models::rally::RallyId;
use rallybot_discord_bot::countdown::{CountdownKey, CountdownRegistry, MockCuePlayer};
use rallybot_discord_bot::voice::{
    ChannelRequest, MockChannelOps, TeardownReason, VoiceChannelManager, VoiceEvent,
};
use rstest::rstest;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::sleep;

const GUILD: u64 = 1;
const CHANNEL: u64 = 42;
const IDLE: Duration = Duration::from_secs(300);

fn request() -> ChannelRequest {
    ChannelRequest {
        guild_id: GUILD,
        name: "Rally VC".to_string(),
        category_id: None,
        owner_id: Some(100),
        user_limit: Some(10),
    }
}

/// Ops that hand out `CHANNEL` and expect it to be deleted `deletes` times.
fn ops(deletes: usize) -> MockChannelOps {
    let mut ops = MockChannelOps::new();
    ops.expect_create_voice_channel().returning(|_| Ok(CHANNEL));
    ops.expect_delete_voice_channel()
        .with(eq(CHANNEL))
        .times(deletes)
        .returning(|_| Ok(()));
    ops
}

fn manager(ops: MockChannelOps) -> (VoiceChannelManager, UnboundedReceiver<VoiceEvent>, CountdownRegistry) {
    let countdowns = CountdownRegistry::new();
    let (manager, events) = VoiceChannelManager::new(Arc::new(ops), IDLE, Some(99), countdowns.clone());
    (manager, events, countdowns)
}

fn deleted(reason: TeardownReason, rally_id: Option<RallyId>) -> VoiceEvent {
    VoiceEvent::ChannelDeleted {
        guild_id: GUILD,
        channel_id: CHANNEL,
        rally_id,
        reason,
    }
}

#[tokio::test(start_paused = true)]
async fn test_empty_channel_deleted_after_idle_timeout() {
    let (manager, mut events, _) = manager(ops(1));

    let channel = manager.acquire(request(), None).await.unwrap();
    assert_eq!(channel, CHANNEL);

    sleep(IDLE - Duration::from_secs(1)).await;
    assert!(manager.is_managed(CHANNEL).await);

    sleep(Duration::from_secs(2)).await;
    assert!(!manager.is_managed(CHANNEL).await);
    assert_eq!(events.try_recv().unwrap(), deleted(TeardownReason::IdleTimeout, None));
}

#[tokio::test(start_paused = true)]
async fn test_occupant_cancels_timer_and_leaving_restarts_it() {
    let (manager, mut events, _) = manager(ops(1));
    manager.acquire(request(), None).await.unwrap();

    sleep(Duration::from_secs(200)).await;
    manager.occupancy_changed(7, None, Some(CHANNEL)).await;

    sleep(IDLE * 3).await;
    let session = manager.session(CHANNEL).await.unwrap();
    assert_eq!(session.occupants.len(), 1);
    assert!(session.last_empty.is_none());

    manager.occupancy_changed(7, Some(CHANNEL), None).await;
    assert!(manager.session(CHANNEL).await.unwrap().last_empty.is_some());

    // The full timeout starts over once the channel empties again
    sleep(IDLE - Duration::from_secs(1)).await;
    assert!(manager.is_managed(CHANNEL).await);

    sleep(Duration::from_secs(2)).await;
    assert!(!manager.is_managed(CHANNEL).await);
    assert!(events.try_recv().is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_channel_with_remaining_occupant_is_kept() {
    let (manager, _events, _) = manager(ops(0));
    manager.acquire(request(), None).await.unwrap();

    manager.occupancy_changed(7, None, Some(CHANNEL)).await;
    manager.occupancy_changed(8, None, Some(CHANNEL)).await;
    manager.occupancy_changed(7, Some(CHANNEL), Some(555)).await;

    sleep(IDLE * 2).await;
    assert!(manager.is_managed(CHANNEL).await);
}

#[tokio::test(start_paused = true)]
async fn test_stay_pins_channel() {
    let (manager, mut events, _) = manager(ops(1));
    manager.acquire(request(), Some(RallyId(5))).await.unwrap();

    assert!(manager.stay(CHANNEL).await);

    sleep(IDLE * 10).await;
    assert!(manager.is_managed(CHANNEL).await);
    assert!(events.try_recv().is_err());

    // Pinned channels don't restart their timer when emptied
    manager.occupancy_changed(7, None, Some(CHANNEL)).await;
    manager.occupancy_changed(7, Some(CHANNEL), None).await;
    sleep(IDLE * 2).await;
    assert!(manager.is_managed(CHANNEL).await);

    assert!(manager.teardown(CHANNEL).await);
    assert_eq!(events.try_recv().unwrap(), deleted(TeardownReason::Forced, Some(RallyId(5))));
}

#[tokio::test(start_paused = true)]
async fn test_teardown_deletes_occupied_channel_and_stops_countdown() {
    let (manager, mut events, countdowns) = manager(ops(1));
    manager.acquire(request(), None).await.unwrap();
    manager.assign_rally(CHANNEL, RallyId(77)).await;
    manager.occupancy_changed(7, None, Some(CHANNEL)).await;

    let mut player = MockCuePlayer::new();
    player.expect_play().returning(|_| Ok(()));
    countdowns
        .start(
            CountdownKey {
                guild_id: GUILD,
                channel_id: CHANNEL,
                rally_id: Some(RallyId(77)),
            },
            CountdownPlan::rolling(RollingGap::FiveSeconds),
            Arc::new(player),
            async {},
        )
        .await;

    assert!(manager.teardown(CHANNEL).await);
    assert!(!countdowns.is_running(CHANNEL).await);
    assert_eq!(events.try_recv().unwrap(), deleted(TeardownReason::Forced, Some(RallyId(77))));

    // Gone now
    assert!(!manager.teardown(CHANNEL).await);
    assert!(!manager.stay(CHANNEL).await);
}

#[tokio::test]
async fn test_acquire_failure() {
    let mut ops = MockChannelOps::new();
    ops.expect_create_voice_channel()
        .returning(|_| Err("Missing Permissions".to_string()));
    let (manager, _events, _) = manager(ops);

    let result = manager.acquire(request(), None).await;

    assert_eq!(
        result,
        Err(RallyError::ChannelCreationFailed("Missing Permissions".to_string()))
    );
    assert_eq!(manager.sole_for_guild(GUILD).await, Ok(None));
}

#[rstest]
#[case(None, Some(99))]
#[case(Some(5), Some(5))]
#[tokio::test]
async fn test_category_resolution(#[case] requested: Option<u64>, #[case] expected: Option<u64>) {
    let mut ops = MockChannelOps::new();
    ops.expect_create_voice_channel()
        .withf(move |req| req.category_id == expected)
        .times(1)
        .returning(|_| Ok(CHANNEL));
    let (manager, _events, _) = manager(ops);

    let mut req = request();
    req.category_id = requested;
    manager.acquire(req, None).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_failed_delete_still_forgets_channel() {
    let mut ops = MockChannelOps::new();
    ops.expect_create_voice_channel().returning(|_| Ok(CHANNEL));
    ops.expect_delete_voice_channel()
        .returning(|_| Err("Unknown Channel".to_string()));
    let (manager, mut events, _) = manager(ops);

    manager.acquire(request(), None).await.unwrap();
    sleep(IDLE + Duration::from_secs(1)).await;

    assert!(!manager.is_managed(CHANNEL).await);
    assert!(events.try_recv().is_ok());
}

#[tokio::test]
async fn test_lookups() {
    let next = AtomicU64::new(10);
    let mut ops = MockChannelOps::new();
    ops.expect_create_voice_channel()
        .returning(move |_| Ok(next.fetch_add(10, Ordering::SeqCst)));
    let (manager, _events, _) = manager(ops);

    manager.acquire(request(), None).await.unwrap();
    manager.acquire(request(), Some(RallyId(3))).await.unwrap();

    assert_eq!(manager.sole_for_guild(2).await, Ok(None));
    assert_eq!(manager.session_for_rally(RallyId(3)).await.map(|s| s.channel_id), Some(20));
    assert!(!manager.assign_rally(999, RallyId(1)).await);

    // Unmanaged channels are ignored
    manager.occupancy_changed(7, None, Some(999)).await;
    assert!(manager.session(999).await.is_none());

    manager.shutdown().await;
}

#[tokio::test]
async fn test_sole_channel_for_guild() {
    let next = AtomicU64::new(100);
    let mut ops = MockChannelOps::new();
    ops.expect_create_voice_channel()
        .returning(move |_| Ok(next.fetch_add(100, Ordering::SeqCst)));
    let (manager, _events, _) = manager(ops);

    manager.acquire(request(), Some(RallyId(1))).await.unwrap();
    assert_eq!(manager.sole_for_guild(GUILD).await, Ok(Some(100)));

    // With two rally channels open there is no safe guess
    manager.acquire(request(), Some(RallyId(2))).await.unwrap();
    manager.occupancy_changed(555, None, Some(200)).await;
    assert!(matches!(
        manager.sole_for_guild(GUILD).await,
        Err(RallyError::Validation(_))
    ));
    assert!(manager.is_managed(200).await);

    manager.shutdown().await;
}
