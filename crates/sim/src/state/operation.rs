use serde::{Deserialize, Serialize};

use crate::world::Coordinate;

use super::{CrewId, EpochMs, OperationId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Mission,
    Heist,
    Raid,
    Tagging,
    Erasing,
    Recruitment,
    LabBatch,
}

impl OperationKind {
    pub fn crew_capacity(self) -> usize {
        match self {
            Self::Mission | Self::Heist => 4,
            Self::Raid | Self::LabBatch => 3,
            Self::Tagging | Self::Erasing => 2,
            Self::Recruitment => 1,
        }
    }

    pub fn completion_mode(self) -> CompletionMode {
        match self {
            Self::Heist | Self::LabBatch => CompletionMode::ManualCollect,
            _ => CompletionMode::Auto,
        }
    }

    pub fn as_token(self) -> &'static str {
        match self {
            Self::Mission => "mission",
            Self::Heist => "heist",
            Self::Raid => "raid",
            Self::Tagging => "tagging",
            Self::Erasing => "erasing",
            Self::Recruitment => "recruitment",
            Self::LabBatch => "lab_batch",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        let kind = match token {
            "mission" => Self::Mission,
            "heist" => Self::Heist,
            "raid" => Self::Raid,
            "tagging" => Self::Tagging,
            "erasing" => Self::Erasing,
            "recruitment" => Self::Recruitment,
            "lab_batch" => Self::LabBatch,
            _ => return None,
        };
        Some(kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionMode {
    /// Dropped (and its result applied) the first time the owning list is
    /// touched at or after `finishes_at`.
    Auto,
    /// Stays ready until an explicit collect consumes it exactly once.
    ManualCollect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationPayload {
    Reward {
        money: i64,
        respect: i64,
        heat: i64,
    },
    Territory,
    Recruit,
    Batch {
        recipe: String,
        units: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedOperation {
    pub id: OperationId,
    pub kind: OperationKind,
    pub target: Coordinate,
    pub crew: Vec<CrewId>,
    pub started_at: EpochMs,
    pub finishes_at: EpochMs,
    pub payload: OperationPayload,
    pub mode: CompletionMode,
}

impl TimedOperation {
    pub fn is_ready(&self, now: EpochMs) -> bool {
        now >= self.finishes_at
    }

    pub fn remaining_ms(&self, now: EpochMs) -> u64 {
        self.finishes_at.saturating_sub(now)
    }

    pub fn progress(&self, now: EpochMs) -> f64 {
        let span = self.finishes_at.saturating_sub(self.started_at);
        if span == 0 {
            return if now >= self.finishes_at { 1.0 } else { 0.0 };
        }
        let elapsed = now.saturating_sub(self.started_at);
        (elapsed as f64 / span as f64).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(started_at: EpochMs, finishes_at: EpochMs) -> TimedOperation {
        TimedOperation {
            id: OperationId(1),
            kind: OperationKind::Mission,
            target: Coordinate::new(0, 0),
            crew: vec![CrewId(1)],
            started_at,
            finishes_at,
            payload: OperationPayload::Territory,
            mode: CompletionMode::Auto,
        }
    }

    #[test]
    fn progress_is_clamped_fraction() {
        let op = op(1_000, 3_000);
        assert_eq!(op.progress(0), 0.0);
        assert_eq!(op.progress(2_000), 0.5);
        assert_eq!(op.progress(3_000), 1.0);
        assert_eq!(op.progress(99_000), 1.0);
    }

    #[test]
    fn readiness_is_monotonic_after_finish() {
        let op = op(0, 5_000);
        assert!(!op.is_ready(4_999));
        for now in [5_000, 5_001, 60_000, u64::MAX] {
            assert!(op.is_ready(now));
            assert_eq!(op.remaining_ms(now), 0);
        }
    }

    #[test]
    fn zero_length_operation_is_ready_immediately() {
        let op = op(10, 10);
        assert!(op.is_ready(10));
        assert_eq!(op.progress(10), 1.0);
    }

    #[test]
    fn kind_tokens_round_trip() {
        for kind in [
            OperationKind::Mission,
            OperationKind::Heist,
            OperationKind::Raid,
            OperationKind::Tagging,
            OperationKind::Erasing,
            OperationKind::Recruitment,
            OperationKind::LabBatch,
        ] {
            assert_eq!(OperationKind::from_token(kind.as_token()), Some(kind));
        }
    }
}
