use tracing::info;

use crate::error::ActionError;
use crate::state::{EpochMs, GameState};
use crate::world::Coordinate;

pub(super) fn queue(
    state: &mut GameState,
    path: &[Coordinate],
    now: EpochMs,
) -> Result<EpochMs, ActionError> {
    if path.is_empty() {
        return Err(ActionError::invalid("travel path is empty"));
    }
    let arrives_at = state.travel.queue(path, now);
    info!(
        from = %state.travel.position,
        destination = %state.travel.destination(),
        legs = state.travel.legs.len(),
        arrives_at,
        "travel_queued"
    );
    Ok(arrives_at)
}

/// Truncates the travel queue. Nothing was granted for unfinished legs, so
/// there is nothing to roll back.
pub(super) fn cancel(state: &mut GameState) -> Result<usize, ActionError> {
    if !state.travel.is_moving() {
        return Err(ActionError::invalid("no travel queued"));
    }
    let dropped = state.travel.cancel();
    info!(position = %state.travel.position, dropped, "travel_cancelled");
    Ok(dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_requires_a_queue() {
        let mut state = GameState::new_character("Vic");
        assert!(cancel(&mut state).is_err());
        queue(&mut state, &[Coordinate::new(0, 2)], 0).expect("queue");
        assert_eq!(cancel(&mut state), Ok(1));
        assert_eq!(state.travel.position, Coordinate::new(0, 0));
    }

    #[test]
    fn empty_path_is_invalid() {
        let mut state = GameState::new_character("Vic");
        assert!(matches!(
            queue(&mut state, &[], 0),
            Err(ActionError::InvalidTarget(_))
        ));
    }
}
