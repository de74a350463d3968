use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::RallyError;
use crate::models::participant::{Participant, TroopType};

/// A rally is identified by the announcement message it was posted as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RallyId(pub u64);

impl fmt::Display for RallyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RallyId {
    type Err = RallyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(RallyId)
            .map_err(|_| RallyError::Validation(format!("Invalid rally id: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RallyKind {
    Keep,
    Sop,
}

impl RallyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RallyKind::Keep => "keep",
            RallyKind::Sop => "sop",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            RallyKind::Keep => "🏰 Keep Rally",
            RallyKind::Sop => "🛡️ Seat of Power Rally",
        }
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            RallyKind::Keep => "Keep",
            RallyKind::Sop => "SOP",
        }
    }
}

impl FromStr for RallyKind {
    type Err = RallyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keep" => Ok(RallyKind::Keep),
            "sop" => Ok(RallyKind::Sop),
            other => Err(RallyError::Validation(format!("Unknown rally type: {}", other))),
        }
    }
}

/// Details entered in the keep rally form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeepDetails {
    pub keep_power: String,
    pub primary_troop: TroopType,
    pub keep_level: String,
    pub gear_worn: String,
    pub intel: String,
}

/// Details entered in the seat of power form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SopDetails {
    pub objective: String,
    pub time: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RallyDetails {
    Keep(KeepDetails),
    Sop(SopDetails),
}

impl RallyDetails {
    pub fn kind(&self) -> RallyKind {
        match self {
            RallyDetails::Keep(_) => RallyKind::Keep,
            RallyDetails::Sop(_) => RallyKind::Sop,
        }
    }

    /// Label/value pairs in display order. Empty values render as a dash.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            RallyDetails::Keep(keep) => vec![
                ("Power Level of Keep", keep.keep_power.clone()),
                ("Primary Troop Type", keep.primary_troop.to_string()),
                ("Keep Level", keep.keep_level.clone()),
                ("Gear Worn", keep.gear_worn.clone()),
                ("Idle Time / Scouted", keep.intel.clone()),
            ],
            RallyDetails::Sop(sop) => vec![
                ("Objective", sop.objective.clone()),
                ("Time", sop.time.clone()),
                ("Notes", sop.notes.clone().unwrap_or_default()),
            ],
        }
    }
}

/// Everything needed to register a rally before it has an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RallyDraft {
    pub guild_id: u64,
    pub channel_id: u64,
    pub creator_id: u64,
    pub details: RallyDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceLink {
    pub channel_id: u64,
    pub invite_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rally {
    pub id: RallyId,
    pub guild_id: u64,
    pub channel_id: u64,
    pub creator_id: u64,
    pub details: RallyDetails,
    pub participants: Vec<Participant>,
    pub voice: Option<VoiceLink>,
    pub thread_id: Option<u64>,
    pub created_at: DateTime<Utc>,
}

impl Rally {
    /// Create a rally from a draft. The creator is the first participant.
    pub fn from_draft(id: RallyId, draft: RallyDraft) -> Self {
        Self {
            id,
            guild_id: draft.guild_id,
            channel_id: draft.channel_id,
            creator_id: draft.creator_id,
            details: draft.details,
            participants: vec![Participant::new(draft.creator_id)],
            voice: None,
            thread_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> RallyKind {
        self.details.kind()
    }

    pub fn participant(&self, user_id: u64) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    pub fn has_participant(&self, user_id: u64) -> bool {
        self.participant(user_id).is_some()
    }

    pub fn participant_ids(&self) -> Vec<u64> {
        self.participants.iter().map(|p| p.user_id).collect()
    }

    /// Comma-separated mentions in join order, or a dash for an empty roster.
    pub fn roster_mentions(&self) -> String {
        if self.participants.is_empty() {
            return "—".to_string();
        }

        self.participants
            .iter()
            .map(Participant::mention)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
