//! Roster exports attached to the "Export Roster" reply.
//!
//! Both formats list participants by capacity, highest first. Participants who
//! never filled in the join form have no profile and are listed last in the CSV
//! with empty columns; they are left out of the sectioned report.

use std::fmt::Write;

use crate::models::participant::{Participant, TroopProfile, TroopTier, TroopType};
use crate::models::rally::Rally;

pub const CSV_FILENAME: &str = "rally_roster.csv";
pub const REPORT_FILENAME: &str = "rally_roster.txt";

fn by_capacity(rally: &Rally) -> Vec<&Participant> {
    let mut participants: Vec<&Participant> = rally.participants.iter().collect();
    // Stable sort keeps join order between equal capacities.
    participants.sort_by_key(|p| std::cmp::Reverse(p.profile.as_ref().map(|pr| pr.capacity)));
    participants
}

fn yes_no(value: bool) -> &'static str {
    if value { "Yes" } else { "No" }
}

/// One row per participant: `User,Troop Type,Troop Tier,Rally Dragon,Capacity`.
pub fn roster_csv(rally: &Rally) -> String {
    let mut out = String::from("User,Troop Type,Troop Tier,Rally Dragon,Capacity\n");

    for participant in by_capacity(rally) {
        match &participant.profile {
            Some(profile) => {
                let _ = writeln!(
                    out,
                    "@{},{},{},{},{}",
                    participant.user_id,
                    profile.troop_type,
                    profile.troop_tier,
                    yes_no(profile.rally_dragon),
                    profile.capacity
                );
            }
            None => {
                let _ = writeln!(out, "@{},,,,", participant.user_id);
            }
        }
    }

    out
}

fn section(out: &mut String, title: &str) {
    let _ = write!(out, "\n=== {} ===\n", title);
}

/// Human-readable report grouped by troop type, by tier, dragons, then capacity.
pub fn roster_report(rally: &Rally) -> String {
    let profiled: Vec<(&Participant, &TroopProfile)> = by_capacity(rally)
        .into_iter()
        .filter_map(|p| p.profile.as_ref().map(|profile| (p, profile)))
        .collect();

    let mut out = String::new();

    for troop_type in TroopType::ALL {
        section(&mut out, &format!("Troop Type: {}", troop_type));
        for (p, profile) in profiled.iter().filter(|(_, pr)| pr.troop_type == troop_type) {
            let _ = writeln!(
                out,
                "{}  | Tier {} | Dragon: {} | Cap: {}",
                p.mention(),
                profile.troop_tier,
                yes_no(profile.rally_dragon),
                profile.capacity
            );
        }
    }

    for tier in TroopTier::DESCENDING {
        section(&mut out, &format!("Troop Tier: {}", tier));
        for (p, profile) in profiled.iter().filter(|(_, pr)| pr.troop_tier == tier) {
            let _ = writeln!(
                out,
                "{}  | {} | Dragon: {} | Cap: {}",
                p.mention(),
                profile.troop_type,
                yes_no(profile.rally_dragon),
                profile.capacity
            );
        }
    }

    section(&mut out, "Rally Dragon: Yes");
    for (p, profile) in profiled.iter().filter(|(_, pr)| pr.rally_dragon) {
        let _ = writeln!(
            out,
            "{}  | {} {} | Cap: {}",
            p.mention(),
            profile.troop_type,
            profile.troop_tier,
            profile.capacity
        );
    }

    section(&mut out, "Capacity (High → Low)");
    for (p, profile) in &profiled {
        let _ = writeln!(
            out,
            "{}  | {} {} | Dragon: {} | Cap: {}",
            p.mention(),
            profile.troop_type,
            profile.troop_tier,
            yes_no(profile.rally_dragon),
            profile.capacity
        );
    }

    out
}
