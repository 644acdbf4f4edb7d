//! Advisory notifications.
//!
//! Events are emitted alongside a new snapshot for presentation and quest
//! hooks. Nothing in the simulation reads them back.

use tracing::info;

use crate::state::{CrewId, GameState, OperationId, OperationKind};
use crate::world::Coordinate;

pub const MONEY_MILESTONE: i64 = 1_000_000;
pub const WANTED_HEAT: i64 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A manual-collect operation crossed its finish time.
    OperationReady {
        operation: OperationId,
        kind: OperationKind,
    },
    /// An auto-completing operation was reaped and its result applied.
    OperationSettled {
        operation: OperationId,
        kind: OperationKind,
    },
    ArrivedAt {
        coordinate: Coordinate,
    },
    CrewRecruited {
        crew: CrewId,
        name: String,
    },
    QuestTrigger {
        event: &'static str,
    },
}

/// One-shot narrative thresholds, checked after every successful action.
/// Each fires at most once per save; the fired set lives in
/// `completed_events`.
const THRESHOLDS: [(&str, fn(&GameState) -> bool); 5] = [
    ("first_holding", |state| !state.holdings.is_empty()),
    ("first_batch_collected", |state| {
        state.inventory.values().any(|units| *units > 0)
    }),
    ("money_1m", |state| state.ledger.money >= MONEY_MILESTONE),
    ("full_officers", |state| state.officers.iter().all(Option::is_some)),
    ("heat_wanted", |state| state.ledger.heat >= WANTED_HEAT),
];

pub(crate) fn check_thresholds(state: &mut GameState, events: &mut Vec<Notification>) {
    for (event, reached) in THRESHOLDS {
        if state.completed_events.contains(event) || !reached(state) {
            continue;
        }
        state.completed_events.insert(event.to_string());
        info!(event, revision = state.revision, "quest_trigger");
        events.push(Notification::QuestTrigger { event });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_fire_once() {
        let mut state = GameState::new_character("Vic");
        state.ledger.money = MONEY_MILESTONE;
        let mut events = Vec::new();
        check_thresholds(&mut state, &mut events);
        assert_eq!(
            events,
            vec![Notification::QuestTrigger { event: "money_1m" }]
        );

        events.clear();
        check_thresholds(&mut state, &mut events);
        assert!(events.is_empty());
        assert!(state.completed_events.contains("money_1m"));
    }

    #[test]
    fn fresh_character_crosses_nothing() {
        let mut state = GameState::new_character("Vic");
        let mut events = Vec::new();
        check_thresholds(&mut state, &mut events);
        assert!(events.is_empty());
        assert!(state.completed_events.is_empty());
    }
}
