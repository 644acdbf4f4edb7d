//! Crew allocation.
//!
//! Nothing on a [`CrewMember`] records what it is doing. Every query walks the
//! holdings, active operations and officer slots of the snapshot and derives
//! the answer, so there is no cached assignment that could go stale.

use std::collections::BTreeMap;
use std::fmt;

use tracing::error;

use crate::error::{ActionError, InvariantViolation};
use crate::state::{
    CrewId, CrewMember, GameState, HoldingId, OperationId, OperationKind, OFFICER_SLOTS,
};

/// The assignment being edited. Its own members are not counted as busy, so
/// they stay toggleable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignmentContext {
    Holding(HoldingId),
    Operation(OperationId),
    Officer(usize),
    /// An operation that does not exist yet.
    Fresh,
}

impl fmt::Display for AssignmentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Holding(id) => write!(f, "{id}"),
            Self::Operation(id) => write!(f, "{id}"),
            Self::Officer(slot) => write!(f, "officer[{slot}]"),
            Self::Fresh => f.write_str("fresh"),
        }
    }
}

/// A concrete place a crew member can be booked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentSlot {
    Post {
        holding: HoldingId,
        label: &'static str,
    },
    LabBatch {
        holding: HoldingId,
        operation: OperationId,
    },
    Operation {
        operation: OperationId,
        kind: OperationKind,
    },
    Officer(usize),
}

impl AssignmentSlot {
    pub fn belongs_to(&self, context: &AssignmentContext) -> bool {
        match (self, context) {
            (Self::Post { holding, .. }, AssignmentContext::Holding(id)) => holding == id,
            (Self::LabBatch { holding, .. }, AssignmentContext::Holding(id)) => holding == id,
            (Self::LabBatch { operation, .. }, AssignmentContext::Operation(id)) => {
                operation == id
            }
            (Self::Operation { operation, .. }, AssignmentContext::Operation(id)) => {
                operation == id
            }
            (Self::Officer(slot), AssignmentContext::Officer(index)) => slot == index,
            _ => false,
        }
    }
}

impl fmt::Display for AssignmentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Post { holding, label } => write!(f, "{label} at {holding}"),
            Self::LabBatch { holding, operation } => {
                write!(f, "lab batch {operation} at {holding}")
            }
            Self::Operation { operation, kind } => write!(f, "{} {operation}", kind.as_token()),
            Self::Officer(slot) => write!(f, "officer slot {slot}"),
        }
    }
}

/// Crew id to the single slot it occupies, rebuilt from a snapshot.
#[derive(Debug, Clone, Default)]
pub struct AssignmentIndex {
    by_crew: BTreeMap<CrewId, AssignmentSlot>,
}

impl AssignmentIndex {
    /// Fails if any crew id is found in two slots. That can only happen if an
    /// earlier transaction skipped validation.
    pub fn build(state: &GameState) -> Result<Self, InvariantViolation> {
        let mut index = Self::default();
        for holding in &state.holdings {
            let Some(operation) = &holding.operation else {
                continue;
            };
            if let Some(post) = operation.post() {
                let slot = AssignmentSlot::Post {
                    holding: holding.id,
                    label: operation.label(),
                };
                for crew in &post.crew {
                    index.insert(*crew, slot)?;
                }
            }
            if let Some(batch) = holding.lab().and_then(|lab| lab.batch.as_ref()) {
                let slot = AssignmentSlot::LabBatch {
                    holding: holding.id,
                    operation: batch.id,
                };
                for crew in &batch.crew {
                    index.insert(*crew, slot)?;
                }
            }
        }
        for op in state.missions.iter().chain(state.tagging.iter()) {
            let slot = AssignmentSlot::Operation {
                operation: op.id,
                kind: op.kind,
            };
            for crew in &op.crew {
                index.insert(*crew, slot)?;
            }
        }
        for (slot, officer) in state.officers.iter().enumerate() {
            if let Some(crew) = officer {
                index.insert(*crew, AssignmentSlot::Officer(slot))?;
            }
        }
        Ok(index)
    }

    fn insert(&mut self, crew: CrewId, slot: AssignmentSlot) -> Result<(), InvariantViolation> {
        if let Some(existing) = self.by_crew.get(&crew) {
            let violation = InvariantViolation::DoubleBooked {
                crew,
                first: existing.to_string(),
                second: slot.to_string(),
            };
            error!(crew = %crew, error = %violation, "crew_exclusivity_violated");
            return Err(violation);
        }
        self.by_crew.insert(crew, slot);
        Ok(())
    }

    pub fn slot_of(&self, crew: CrewId) -> Option<&AssignmentSlot> {
        self.by_crew.get(&crew)
    }

    pub fn is_busy_outside(&self, crew: CrewId, context: &AssignmentContext) -> bool {
        self.by_crew
            .get(&crew)
            .is_some_and(|slot| !slot.belongs_to(context))
    }

    pub fn assigned_count(&self) -> usize {
        self.by_crew.len()
    }
}

/// Non-leader crew free to be added to `context`.
pub fn available_crew<'a>(
    state: &'a GameState,
    context: &AssignmentContext,
) -> Result<Vec<&'a CrewMember>, InvariantViolation> {
    let index = AssignmentIndex::build(state)?;
    Ok(state
        .crew
        .iter()
        .filter(|member| !member.is_leader)
        .filter(|member| !index.is_busy_outside(member.id, context))
        .collect())
}

/// Checks that `crew` may join `context` right now.
pub fn ensure_assignable(
    state: &GameState,
    index: &AssignmentIndex,
    context: &AssignmentContext,
    crew: CrewId,
) -> Result<(), ActionError> {
    let member = state
        .crew_member(crew)
        .ok_or_else(|| ActionError::invalid(format!("unknown crew member {crew}")))?;
    if member.is_leader || index.is_busy_outside(crew, context) {
        return Err(ActionError::CrewUnavailable(crew));
    }
    Ok(())
}

/// Validates a whole team for a new operation of `kind`: non-empty, within
/// capacity, no repeats, everyone free.
pub fn ensure_team_assignable(
    state: &GameState,
    kind: OperationKind,
    crew: &[CrewId],
) -> Result<(), ActionError> {
    if crew.is_empty() {
        return Err(ActionError::invalid(format!(
            "{} needs at least one crew member",
            kind.as_token()
        )));
    }
    let limit = kind.crew_capacity();
    if crew.len() > limit {
        return Err(ActionError::CapacityExceeded { limit });
    }
    for (position, id) in crew.iter().enumerate() {
        if crew[..position].contains(id) {
            return Err(ActionError::invalid(format!("{id} listed twice")));
        }
    }
    let index = AssignmentIndex::build(state)?;
    for id in crew {
        ensure_assignable(state, &index, &AssignmentContext::Fresh, *id)?;
    }
    Ok(())
}

/// Full exclusivity audit, used when loading persisted state.
pub fn audit_exclusivity(state: &GameState) -> Result<(), InvariantViolation> {
    AssignmentIndex::build(state).map(|_| ())
}

pub fn officer_slot_in_range(slot: usize) -> Result<(), ActionError> {
    if slot < OFFICER_SLOTS {
        Ok(())
    } else {
        Err(ActionError::invalid(format!(
            "officer slot {slot} out of range (0..{OFFICER_SLOTS})"
        )))
    }
}
