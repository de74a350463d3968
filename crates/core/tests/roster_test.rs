use pretty_assertions::assert_eq;
use rallybot_core::errors::RallyError;
use rallybot_core::models::{
    participant::{TroopProfile, TroopTier, TroopType},
    rally::{RallyDetails, RallyDraft, RallyId, SopDetails, VoiceLink},
};
use rallybot_core::roster::RosterStore;
use rstest::{fixture, rstest};

const R1: RallyId = RallyId(1);
const U1: u64 = 100;
const U2: u64 = 200;
const U3: u64 = 300;

fn draft(creator_id: u64) -> RallyDraft {
    RallyDraft {
        guild_id: 10,
        channel_id: 20,
        creator_id,
        details: RallyDetails::Sop(SopDetails {
            objective: "Seat".to_string(),
            time: "now".to_string(),
            notes: None,
        }),
    }
}

#[fixture]
fn store() -> RosterStore {
    let mut store = RosterStore::new();
    store.create(R1, draft(U1)).unwrap();
    store
}

#[rstest]
fn test_create_enrolls_creator(store: RosterStore) {
    let rally = store.get(R1).unwrap();
    assert_eq!(rally.creator_id, U1);
    assert_eq!(rally.participant_ids(), vec![U1]);
    assert_eq!(store.len(), 1);
}

#[rstest]
fn test_create_duplicate_fails(mut store: RosterStore) {
    let result = store.create(R1, draft(U2)).map(|_| ());
    assert_eq!(result, Err(RallyError::DuplicateRally(R1)));
    // Original entry untouched
    assert_eq!(store.get(R1).unwrap().creator_id, U1);
}

#[rstest]
fn test_get_missing_rally() {
    let store = RosterStore::new();
    assert_eq!(store.get(R1).map(|_| ()), Err(RallyError::NotFound(R1)));
}

#[rstest]
fn test_join_is_idempotent_and_leave_removes(mut store: RosterStore) {
    assert_eq!(store.join(R1, U2), Ok(true));
    assert_eq!(store.join(R1, U2), Ok(false));
    assert_eq!(store.get(R1).unwrap().participant_ids(), vec![U1, U2]);

    assert_eq!(store.leave(R1, U1), Ok(true));
    assert_eq!(store.get(R1).unwrap().participant_ids(), vec![U2]);
}

#[rstest]
fn test_leave_absent_is_noop(mut store: RosterStore) {
    assert_eq!(store.leave(R1, U3), Ok(false));
    assert_eq!(store.get(R1).unwrap().participant_ids(), vec![U1]);
}

#[rstest]
fn test_join_unknown_rally() {
    let mut store = RosterStore::new();
    assert_eq!(store.join(R1, U1), Err(RallyError::NotFound(R1)));
    assert_eq!(store.leave(R1, U1), Err(RallyError::NotFound(R1)));
}

#[rstest]
fn test_join_leave_sequence_keeps_last_action(mut store: RosterStore) {
    let actions = [
        (U2, true),
        (U3, true),
        (U2, false),
        (U1, false),
        (U3, true),
        (U2, true),
        (U3, false),
        (U1, true),
    ];

    for (user, join) in actions {
        if join {
            store.join(R1, user).unwrap();
        } else {
            store.leave(R1, user).unwrap();
        }
    }

    let mut ids = store.get(R1).unwrap().participant_ids();
    ids.sort();
    assert_eq!(ids, vec![U1, U2]);
}

#[rstest]
fn test_roster_keeps_join_order(mut store: RosterStore) {
    store.join(R1, U3).unwrap();
    store.join(R1, U2).unwrap();

    let rally = store.get(R1).unwrap();
    assert_eq!(rally.participant_ids(), vec![U1, U3, U2]);
    assert_eq!(rally.roster_mentions(), "<@100>, <@300>, <@200>");
}

#[rstest]
fn test_empty_roster_mentions(mut store: RosterStore) {
    store.leave(R1, U1).unwrap();
    assert_eq!(store.get(R1).unwrap().roster_mentions(), "—");
}

#[rstest]
fn test_set_profile_keeps_position(mut store: RosterStore) {
    store.join(R1, U2).unwrap();
    let profile = TroopProfile {
        troop_type: TroopType::Range,
        troop_tier: TroopTier::T12,
        rally_dragon: true,
        capacity: 900_000,
    };

    store.set_profile(R1, U1, profile.clone()).unwrap();

    let rally = store.get(R1).unwrap();
    assert_eq!(rally.participant_ids(), vec![U1, U2]);
    assert_eq!(rally.participant(U1).unwrap().profile, Some(profile));
}

#[rstest]
fn test_set_profile_requires_membership(mut store: RosterStore) {
    let profile = TroopProfile {
        troop_type: TroopType::Range,
        troop_tier: TroopTier::T8,
        rally_dragon: false,
        capacity: 1,
    };

    assert!(matches!(
        store.set_profile(R1, U3, profile),
        Err(RallyError::Validation(_))
    ));
}

#[rstest]
fn test_voice_link_lookup_and_detach(mut store: RosterStore) {
    store
        .attach_voice(
            R1,
            VoiceLink {
                channel_id: 555,
                invite_url: Some("https://discord.gg/abc".to_string()),
            },
        )
        .unwrap();

    assert_eq!(store.rally_for_channel(555).map(|r| r.id), Some(R1));
    assert_eq!(store.detach_voice(555), Some(R1));
    assert!(store.rally_for_channel(555).is_none());
    assert_eq!(store.detach_voice(555), None);
}

#[rstest]
fn test_remove_discards_rally(mut store: RosterStore) {
    store.attach_thread(R1, 77).unwrap();
    let removed = store.remove(R1).unwrap();

    assert_eq!(removed.thread_id, Some(77));
    assert!(store.is_empty());
    assert_eq!(store.remove(R1).map(|_| ()), Err(RallyError::NotFound(R1)));
}
