use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::RallyError;

/// Identifies one audio clip. Each cue maps to exactly one configured URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CueId {
    Bomb5m,
    Bomb10m,
    Bomb30m,
    Bomb1h,
    ExplainBomb,
    Roll5s,
    Roll10s,
    Roll15s,
    Roll30s,
    ExplainRoll,
}

impl CueId {
    pub const ALL: [CueId; 10] = [
        CueId::Bomb5m,
        CueId::Bomb10m,
        CueId::Bomb30m,
        CueId::Bomb1h,
        CueId::ExplainBomb,
        CueId::Roll5s,
        CueId::Roll10s,
        CueId::Roll15s,
        CueId::Roll30s,
        CueId::ExplainRoll,
    ];

    /// Environment variable holding the clip URL.
    pub fn env_key(&self) -> &'static str {
        match self {
            CueId::Bomb5m => "AUDIO_5M_BOMB",
            CueId::Bomb10m => "AUDIO_10M_BOMB",
            CueId::Bomb30m => "AUDIO_30M_BOMB",
            CueId::Bomb1h => "AUDIO_1H_BOMB",
            CueId::ExplainBomb => "AUDIO_EXPLAIN_BOMB",
            CueId::Roll5s => "AUDIO_5S_ROLL",
            CueId::Roll10s => "AUDIO_10S_ROLL",
            CueId::Roll15s => "AUDIO_15S_ROLL",
            CueId::Roll30s => "AUDIO_30S_ROLL",
            CueId::ExplainRoll => "AUDIO_EXPLAIN_ROLL",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CueId::Bomb5m => "5 minute bomb complete",
            CueId::Bomb10m => "10 minute bomb complete",
            CueId::Bomb30m => "30 minute bomb complete",
            CueId::Bomb1h => "1 hour bomb complete",
            CueId::ExplainBomb => "Bomb rally explanation",
            CueId::Roll5s => "5 second gap",
            CueId::Roll10s => "10 second gap",
            CueId::Roll15s => "15 second gap",
            CueId::Roll30s => "30 second gap",
            CueId::ExplainRoll => "Rolling rally explanation",
        }
    }
}

impl fmt::Display for CueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BombDuration {
    FiveMinutes,
    TenMinutes,
    ThirtyMinutes,
    OneHour,
}

impl BombDuration {
    pub const ALL: [BombDuration; 4] = [
        BombDuration::FiveMinutes,
        BombDuration::TenMinutes,
        BombDuration::ThirtyMinutes,
        BombDuration::OneHour,
    ];

    pub fn as_duration(&self) -> Duration {
        match self {
            BombDuration::FiveMinutes => Duration::from_secs(5 * 60),
            BombDuration::TenMinutes => Duration::from_secs(10 * 60),
            BombDuration::ThirtyMinutes => Duration::from_secs(30 * 60),
            BombDuration::OneHour => Duration::from_secs(60 * 60),
        }
    }

    /// The completion cue played when the bomb expires.
    pub fn completion_cue(&self) -> CueId {
        match self {
            BombDuration::FiveMinutes => CueId::Bomb5m,
            BombDuration::TenMinutes => CueId::Bomb10m,
            BombDuration::ThirtyMinutes => CueId::Bomb30m,
            BombDuration::OneHour => CueId::Bomb1h,
        }
    }

    /// Command choice value, e.g. `"5m"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            BombDuration::FiveMinutes => "5m",
            BombDuration::TenMinutes => "10m",
            BombDuration::ThirtyMinutes => "30m",
            BombDuration::OneHour => "1h",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BombDuration::FiveMinutes => "5 Minute Bomb",
            BombDuration::TenMinutes => "10 Minute Bomb",
            BombDuration::ThirtyMinutes => "30 Minute Bomb",
            BombDuration::OneHour => "1 Hour Bomb",
        }
    }
}

impl FromStr for BombDuration {
    type Err = RallyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BombDuration::ALL
            .into_iter()
            .find(|d| d.as_str() == s.trim())
            .ok_or_else(|| {
                RallyError::Validation(format!("Bomb duration must be one of 5m, 10m, 30m, 1h (got {})", s))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RollingGap {
    FiveSeconds,
    TenSeconds,
    FifteenSeconds,
    ThirtySeconds,
}

impl RollingGap {
    pub const ALL: [RollingGap; 4] = [
        RollingGap::FiveSeconds,
        RollingGap::TenSeconds,
        RollingGap::FifteenSeconds,
        RollingGap::ThirtySeconds,
    ];

    pub fn as_duration(&self) -> Duration {
        match self {
            RollingGap::FiveSeconds => Duration::from_secs(5),
            RollingGap::TenSeconds => Duration::from_secs(10),
            RollingGap::FifteenSeconds => Duration::from_secs(15),
            RollingGap::ThirtySeconds => Duration::from_secs(30),
        }
    }

    pub fn gap_cue(&self) -> CueId {
        match self {
            RollingGap::FiveSeconds => CueId::Roll5s,
            RollingGap::TenSeconds => CueId::Roll10s,
            RollingGap::FifteenSeconds => CueId::Roll15s,
            RollingGap::ThirtySeconds => CueId::Roll30s,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RollingGap::FiveSeconds => "5s",
            RollingGap::TenSeconds => "10s",
            RollingGap::FifteenSeconds => "15s",
            RollingGap::ThirtySeconds => "30s",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RollingGap::FiveSeconds => "5 Second Intervals",
            RollingGap::TenSeconds => "10 Second Intervals",
            RollingGap::FifteenSeconds => "15 Second Intervals",
            RollingGap::ThirtySeconds => "30 Second Intervals",
        }
    }
}

impl FromStr for RollingGap {
    type Err = RallyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RollingGap::ALL
            .into_iter()
            .find(|g| g.as_str() == s.trim())
            .ok_or_else(|| {
                RallyError::Validation(format!("Rolling gap must be one of 5s, 10s, 15s, 30s (got {})", s))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CountdownKind {
    Bomb(BombDuration),
    Rolling(RollingGap),
}

impl CountdownKind {
    pub fn label(&self) -> &'static str {
        match self {
            CountdownKind::Bomb(duration) => duration.label(),
            CountdownKind::Rolling(gap) => gap.label(),
        }
    }
}

/// A single cue and the offset from the countdown start at which it plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CueStep {
    pub offset: Duration,
    pub cue: CueId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Schedule {
    Fixed { total: Duration, steps: Vec<CueStep> },
    Repeating { gap: Duration, cue: CueId },
}

/// An immutable description of when each cue of a countdown plays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountdownPlan {
    kind: CountdownKind,
    schedule: Schedule,
}

impl CountdownPlan {
    /// Explain at the start, completion cue at expiry.
    pub fn bomb(duration: BombDuration) -> Self {
        let total = duration.as_duration();
        let steps = vec![
            CueStep {
                offset: Duration::ZERO,
                cue: CueId::ExplainBomb,
            },
            CueStep {
                offset: total,
                cue: duration.completion_cue(),
            },
        ];

        Self {
            kind: CountdownKind::Bomb(duration),
            schedule: Schedule::Fixed { total, steps },
        }
    }

    /// Gap cue once per elapsed interval, with no end.
    pub fn rolling(gap: RollingGap) -> Self {
        Self {
            kind: CountdownKind::Rolling(gap),
            schedule: Schedule::Repeating {
                gap: gap.as_duration(),
                cue: gap.gap_cue(),
            },
        }
    }

    pub fn from_kind(kind: CountdownKind) -> Self {
        match kind {
            CountdownKind::Bomb(duration) => Self::bomb(duration),
            CountdownKind::Rolling(gap) => Self::rolling(gap),
        }
    }

    /// Build a finite plan from explicit steps.
    ///
    /// Offsets must be strictly increasing and none may exceed `total`.
    pub fn fixed(kind: CountdownKind, total: Duration, steps: Vec<CueStep>) -> Result<Self, RallyError> {
        if steps.windows(2).any(|pair| pair[0].offset >= pair[1].offset) {
            return Err(RallyError::Validation(
                "Cue offsets must be strictly increasing".to_string(),
            ));
        }

        if steps.iter().any(|step| step.offset > total) {
            return Err(RallyError::Validation(
                "Cue offsets must not exceed the countdown duration".to_string(),
            ));
        }

        Ok(Self {
            kind,
            schedule: Schedule::Fixed { total, steps },
        })
    }

    pub fn kind(&self) -> CountdownKind {
        self.kind
    }

    /// Total duration of a finite plan; `None` for repeating plans.
    pub fn total(&self) -> Option<Duration> {
        match &self.schedule {
            Schedule::Fixed { total, .. } => Some(*total),
            Schedule::Repeating { .. } => None,
        }
    }

    pub fn is_repeating(&self) -> bool {
        matches!(self.schedule, Schedule::Repeating { .. })
    }

    /// Every cue the plan references, without repeats.
    pub fn cue_ids(&self) -> Vec<CueId> {
        match &self.schedule {
            Schedule::Fixed { steps, .. } => {
                let mut ids: Vec<CueId> = Vec::new();
                for step in steps {
                    if !ids.contains(&step.cue) {
                        ids.push(step.cue);
                    }
                }
                ids
            }
            Schedule::Repeating { cue, .. } => vec![*cue],
        }
    }

    /// Steps in offset order. Infinite for repeating plans.
    pub fn steps(&self) -> CueSteps<'_> {
        CueSteps {
            plan: self,
            index: 0,
        }
    }
}

pub struct CueSteps<'a> {
    plan: &'a CountdownPlan,
    index: usize,
}

impl Iterator for CueSteps<'_> {
    type Item = CueStep;

    fn next(&mut self) -> Option<Self::Item> {
        let step = match &self.plan.schedule {
            Schedule::Fixed { steps, .. } => steps.get(self.index).copied(),
            Schedule::Repeating { gap, cue } => {
                let elapsed = u32::try_from(self.index + 1).ok()?;
                Some(CueStep {
                    offset: gap.checked_mul(elapsed)?,
                    cue: *cue,
                })
            }
        };

        self.index += 1;
        step
    }
}
