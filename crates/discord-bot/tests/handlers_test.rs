use pretty_assertions::assert_eq;
use rallybot_core::errors::RallyError;
use rallybot_core::models::countdown::{BombDuration, CountdownKind, CueId, RollingGap};
use rallybot_core::models::participant::{TroopProfile, TroopTier, TroopType};
use rallybot_core::models::rally::{RallyDetails, RallyKind};
use rallybot_discord_bot::handlers::countdown::{countdown_started_message, explanation};
use rallybot_discord_bot::handlers::rally::{
    JOIN_FORM, KEEP_FORM, SOP_FORM, details_from_form, profile_from_form,
};
use rallybot_discord_bot::handlers::user_facing_message;
use rstest::rstest;
use std::collections::HashMap;

fn answers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn keep_answers() -> HashMap<String, String> {
    answers(&[
        ("keep_power", "350m"),
        ("primary_troop", "infantry"),
        ("keep_level", "K34"),
        ("gear_worn", "Farming"),
        ("intel", ""),
    ])
}

#[test]
fn test_forms_fit_in_a_modal() {
    // Discord modals take at most five inputs
    assert!(KEEP_FORM.len() <= 5);
    assert!(SOP_FORM.len() <= 5);
    assert!(JOIN_FORM.len() <= 5);
}

#[test]
fn test_keep_form() {
    let details = details_from_form(RallyKind::Keep, &keep_answers()).unwrap();

    let RallyDetails::Keep(keep) = details else {
        panic!("expected keep details");
    };
    assert_eq!(keep.keep_power, "350m");
    assert_eq!(keep.primary_troop, TroopType::Infantry);
    assert_eq!(keep.intel, "");
}

#[test]
fn test_keep_form_bad_troop_type() {
    let mut values = keep_answers();
    values.insert("primary_troop".to_string(), "dragons".to_string());

    assert!(matches!(
        details_from_form(RallyKind::Keep, &values),
        Err(RallyError::Validation(_))
    ));
}

#[test]
fn test_keep_form_missing_required() {
    let mut values = keep_answers();
    values.insert("keep_level".to_string(), String::new());

    assert_eq!(
        details_from_form(RallyKind::Keep, &values),
        Err(RallyError::Validation("Keep Level is required.".to_string()))
    );
}

#[test]
fn test_sop_form_optional_notes() {
    let values = answers(&[("objective", "Seat 3"), ("time", "20:00 UTC")]);

    let details = details_from_form(RallyKind::Sop, &values).unwrap();

    let RallyDetails::Sop(sop) = details else {
        panic!("expected sop details");
    };
    assert_eq!(sop.objective, "Seat 3");
    assert_eq!(sop.notes, None);
}

#[test]
fn test_join_form() {
    let values = answers(&[
        ("troop_type", "Cavalry"),
        ("troop_tier", "t11"),
        ("rally_dragon", "yes"),
        ("capacity", "1,200,000"),
    ]);

    assert_eq!(
        profile_from_form(&values),
        Ok(TroopProfile {
            troop_type: TroopType::Cavalry,
            troop_tier: TroopTier::T11,
            rally_dragon: true,
            capacity: 1_200_000,
        })
    );
}

#[test]
fn test_join_form_bad_tier() {
    let values = answers(&[
        ("troop_type", "Cavalry"),
        ("troop_tier", "T7"),
        ("rally_dragon", "no"),
        ("capacity", "10"),
    ]);

    assert!(profile_from_form(&values).is_err());
}

#[test]
fn test_user_facing_message() {
    let rally_error = eyre::Report::new(RallyError::Unauthorized("hitters".to_string()));
    assert_eq!(
        user_facing_message(&rally_error),
        "You need the `hitters` role to use this command"
    );

    let internal = eyre::eyre!("connection reset by peer");
    assert!(!user_facing_message(&internal).contains("connection reset"));
}

#[test]
fn test_countdown_started_message() {
    let bomb = countdown_started_message(CountdownKind::Bomb(BombDuration::ThirtyMinutes), 42, &[CueId::Bomb30m]);
    assert!(bomb.contains("30 Minute Bomb"));
    assert!(bomb.contains("<#42>"));
    assert!(bomb.contains("30 minute bomb complete"));

    let rolling = countdown_started_message(CountdownKind::Rolling(RollingGap::FiveSeconds), 42, &[]);
    assert!(rolling.contains("/type_of_rally stop"));
    assert!(!rolling.contains("No audio clip"));
}

#[rstest]
#[case("bomb", "Bomb Rally")]
#[case("rolling", "Rolling Rally")]
fn test_explanation(#[case] kind: &str, #[case] heading: &str) {
    assert!(explanation(kind).unwrap().contains(heading));
}

#[test]
fn test_explanation_unknown() {
    assert_eq!(explanation("siege"), None);
}
