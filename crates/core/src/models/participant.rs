use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::RallyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TroopType {
    Cavalry,
    Infantry,
    Range,
}

impl TroopType {
    pub const ALL: [TroopType; 3] = [TroopType::Cavalry, TroopType::Infantry, TroopType::Range];

    pub fn as_str(&self) -> &'static str {
        match self {
            TroopType::Cavalry => "Cavalry",
            TroopType::Infantry => "Infantry",
            TroopType::Range => "Range",
        }
    }
}

impl fmt::Display for TroopType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TroopType {
    type Err = RallyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cavalry" => Ok(TroopType::Cavalry),
            "infantry" => Ok(TroopType::Infantry),
            "range" => Ok(TroopType::Range),
            _ => Err(RallyError::Validation(
                "Troop Type must be Cavalry, Infantry, or Range.".to_string(),
            )),
        }
    }
}

/// Troop tiers ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TroopTier {
    T8,
    T9,
    T10,
    T11,
    T12,
}

impl TroopTier {
    /// Highest tier first, the order used in roster reports.
    pub const DESCENDING: [TroopTier; 5] = [
        TroopTier::T12,
        TroopTier::T11,
        TroopTier::T10,
        TroopTier::T9,
        TroopTier::T8,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TroopTier::T8 => "T8",
            TroopTier::T9 => "T9",
            TroopTier::T10 => "T10",
            TroopTier::T11 => "T11",
            TroopTier::T12 => "T12",
        }
    }
}

impl fmt::Display for TroopTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TroopTier {
    type Err = RallyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "T8" => Ok(TroopTier::T8),
            "T9" => Ok(TroopTier::T9),
            "T10" => Ok(TroopTier::T10),
            "T11" => Ok(TroopTier::T11),
            "T12" => Ok(TroopTier::T12),
            _ => Err(RallyError::Validation(
                "Troop Tier must be one of T8/T9/T10/T11/T12.".to_string(),
            )),
        }
    }
}

/// What a participant brings to the rally, as entered in the join form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TroopProfile {
    pub troop_type: TroopType,
    pub troop_tier: TroopTier,
    pub rally_dragon: bool,
    pub capacity: u64,
}

impl TroopProfile {
    /// Build a profile from the raw join-form answers.
    ///
    /// Troop type and tier are validated; the dragon answer counts as yes when it
    /// starts with `y`, and capacity keeps only its digits (`"550,000"` → 550000,
    /// nothing usable → 0).
    pub fn from_form(
        troop_type: &str,
        troop_tier: &str,
        rally_dragon: &str,
        capacity: &str,
    ) -> Result<Self, RallyError> {
        let troop_type = troop_type.parse()?;
        let troop_tier = troop_tier.parse()?;
        let rally_dragon = rally_dragon.trim().to_lowercase().starts_with('y');

        Ok(Self {
            troop_type,
            troop_tier,
            rally_dragon,
            capacity: parse_capacity(capacity),
        })
    }
}

fn parse_capacity(raw: &str) -> u64 {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: u64,
    pub profile: Option<TroopProfile>,
}

impl Participant {
    pub fn new(user_id: u64) -> Self {
        Self {
            user_id,
            profile: None,
        }
    }

    pub fn mention(&self) -> String {
        format!("<@{}>", self.user_id)
    }
}
