use thiserror::Error;

use crate::state::{CrewId, HoldingId, OperationId};
use crate::world::Coordinate;

/// Rejection of a player action. The snapshot the action was applied to is
/// left untouched whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: i64, available: i64 },
    #[error("slot occupied: {0}")]
    SlotOccupied(String),
    #[error("crew member {0} is unavailable")]
    CrewUnavailable(CrewId),
    #[error("capacity exceeded: at most {limit} crew")]
    CapacityExceeded { limit: usize },
    #[error("operation {operation} is not ready ({remaining_ms}ms remaining)")]
    NotReady {
        operation: OperationId,
        remaining_ms: u64,
    },
    #[error("operation {0} was already collected")]
    AlreadyCollected(OperationId),
    #[error("invalid target: {0}")]
    InvalidTarget(String),
    #[error("internal invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),
}

impl ActionError {
    /// Invariant violations mean an earlier transaction was wrong; the session
    /// must not continue on that state.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Invariant(_))
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::SlotOccupied(_) => "slot_occupied",
            Self::CrewUnavailable(_) => "crew_unavailable",
            Self::CapacityExceeded { .. } => "capacity_exceeded",
            Self::NotReady { .. } => "not_ready",
            Self::AlreadyCollected(_) => "already_collected",
            Self::InvalidTarget(_) => "invalid_target",
            Self::Invariant(_) => "invariant_violation",
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidTarget(message.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("crew member {crew} is booked in both {first} and {second}")]
    DoubleBooked {
        crew: CrewId,
        first: String,
        second: String,
    },
    #[error("ledger money is negative ({money})")]
    NegativeFunds { money: i64 },
    #[error("holdings {first} and {second} both own {coordinate} slot {slot_index}")]
    DuplicateHolding {
        first: HoldingId,
        second: HoldingId,
        coordinate: Coordinate,
        slot_index: u8,
    },
}
