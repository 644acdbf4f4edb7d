use tracing::info;

use crate::alloc::{ensure_assignable, officer_slot_in_range, AssignmentContext, AssignmentIndex};
use crate::error::ActionError;
use crate::state::{CrewId, GameState, HoldingId};

pub(super) fn assign(
    state: &mut GameState,
    context: AssignmentContext,
    crew: CrewId,
) -> Result<(), ActionError> {
    match context {
        AssignmentContext::Holding(holding) => assign_to_post(state, holding, crew),
        AssignmentContext::Officer(slot) => assign_officer(state, slot, crew),
        AssignmentContext::Operation(operation) => Err(ActionError::invalid(format!(
            "{operation} is already under way; its crew is fixed"
        ))),
        AssignmentContext::Fresh => Err(ActionError::invalid(
            "crew for a new operation is chosen when it starts",
        )),
    }
}

pub(super) fn unassign(
    state: &mut GameState,
    context: AssignmentContext,
    crew: CrewId,
) -> Result<(), ActionError> {
    match context {
        AssignmentContext::Holding(holding) => {
            let post = state
                .holding_mut(holding)
                .and_then(|holding| holding.operation.as_mut())
                .and_then(|operation| operation.post_mut())
                .ok_or_else(|| ActionError::invalid(format!("{holding} has no crew post")))?;
            let position = post
                .crew
                .iter()
                .position(|id| *id == crew)
                .ok_or_else(|| ActionError::invalid(format!("{crew} is not posted at {holding}")))?;
            post.crew.remove(position);
            info!(crew = %crew, holding_id = %holding, "crew_unassigned");
            Ok(())
        }
        AssignmentContext::Officer(slot) => {
            officer_slot_in_range(slot)?;
            if state.officers[slot] != Some(crew) {
                return Err(ActionError::invalid(format!(
                    "{crew} does not hold officer slot {slot}"
                )));
            }
            state.officers[slot] = None;
            info!(crew = %crew, slot, "officer_released");
            Ok(())
        }
        AssignmentContext::Operation(operation) => Err(ActionError::invalid(format!(
            "{operation} keeps its crew until it ends"
        ))),
        AssignmentContext::Fresh => Err(ActionError::invalid("nothing to unassign from")),
    }
}

fn assign_to_post(state: &mut GameState, holding: HoldingId, crew: CrewId) -> Result<(), ActionError> {
    let target = state
        .holding(holding)
        .ok_or_else(|| ActionError::invalid(format!("{holding} is not owned")))?;
    let operation = target
        .operation
        .as_ref()
        .ok_or_else(|| ActionError::invalid(format!("{holding} has no crew post")))?;
    let post = operation.post().ok_or_else(|| {
        ActionError::invalid(format!("{holding} is staffed per batch, not by a standing post"))
    })?;
    if post.crew.contains(&crew) {
        return Err(ActionError::invalid(format!("{crew} is already posted at {holding}")));
    }
    let limit = operation.post_capacity();
    if post.crew.len() >= limit {
        return Err(ActionError::CapacityExceeded { limit });
    }

    let index = AssignmentIndex::build(state)?;
    ensure_assignable(state, &index, &AssignmentContext::Holding(holding), crew)?;

    let post = state
        .holding_mut(holding)
        .and_then(|target| target.operation.as_mut())
        .and_then(|operation| operation.post_mut())
        .ok_or_else(|| ActionError::invalid(format!("{holding} has no crew post")))?;
    post.crew.push(crew);
    info!(crew = %crew, holding_id = %holding, "crew_assigned");
    Ok(())
}

fn assign_officer(state: &mut GameState, slot: usize, crew: CrewId) -> Result<(), ActionError> {
    officer_slot_in_range(slot)?;
    match state.officers[slot] {
        Some(current) if current == crew => {
            return Err(ActionError::invalid(format!(
                "{crew} already holds officer slot {slot}"
            )))
        }
        Some(current) => {
            return Err(ActionError::SlotOccupied(format!(
                "officer slot {slot} is held by {current}"
            )))
        }
        None => {}
    }

    let index = AssignmentIndex::build(state)?;
    ensure_assignable(state, &index, &AssignmentContext::Officer(slot), crew)?;
    state.officers[slot] = Some(crew);
    info!(crew = %crew, slot, "officer_appointed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::corner_holding;

    #[test]
    fn corner_post_respects_capacity() {
        let mut state = GameState::new_character("Vic");
        let holding = corner_holding(&mut state, &[CrewId(1), CrewId(2)]);
        assign(&mut state, AssignmentContext::Holding(holding), CrewId(3)).expect("third");

        let id = state.alloc_crew_id();
        let mut extra = state.crew[1].clone();
        extra.id = id;
        state.crew.push(extra);
        assert_eq!(
            assign(&mut state, AssignmentContext::Holding(holding), id),
            Err(ActionError::CapacityExceeded { limit: 3 })
        );
    }

    #[test]
    fn officer_then_post_is_rejected_until_released() {
        let mut state = GameState::new_character("Vic");
        let holding = corner_holding(&mut state, &[]);
        assign(&mut state, AssignmentContext::Officer(0), CrewId(2)).expect("officer");
        assert_eq!(
            assign(&mut state, AssignmentContext::Holding(holding), CrewId(2)),
            Err(ActionError::CrewUnavailable(CrewId(2)))
        );
        unassign(&mut state, AssignmentContext::Officer(0), CrewId(2)).expect("release");
        assign(&mut state, AssignmentContext::Holding(holding), CrewId(2)).expect("post");
    }

    #[test]
    fn occupied_officer_slot_and_leader_are_rejected() {
        let mut state = GameState::new_character("Vic");
        assign(&mut state, AssignmentContext::Officer(1), CrewId(1)).expect("officer");
        assert!(matches!(
            assign(&mut state, AssignmentContext::Officer(1), CrewId(2)),
            Err(ActionError::SlotOccupied(_))
        ));
        assert_eq!(
            assign(&mut state, AssignmentContext::Officer(2), CrewId(0)),
            Err(ActionError::CrewUnavailable(CrewId(0)))
        );
        assert!(matches!(
            assign(&mut state, AssignmentContext::Officer(9), CrewId(2)),
            Err(ActionError::InvalidTarget(_))
        ));
    }

    #[test]
    fn running_operations_do_not_take_or_release_crew() {
        let mut state = GameState::new_character("Vic");
        let context = AssignmentContext::Operation(crate::state::OperationId(0));
        assert!(matches!(
            assign(&mut state, context, CrewId(1)),
            Err(ActionError::InvalidTarget(_))
        ));
        assert!(matches!(
            unassign(&mut state, context, CrewId(1)),
            Err(ActionError::InvalidTarget(_))
        ));
    }
}
