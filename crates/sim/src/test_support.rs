use crate::content::RecipeDef;
use crate::state::{
    CompletionMode, CrewId, CrewPost, EpochMs, GameState, Holding, HoldingId,
    HoldingOperation, LabState, OperationKind, OperationPayload, TimedOperation,
};
use crate::world::{BuildingSeed, Coordinate, PlotKind};

fn push_holding(state: &mut GameState, kind: PlotKind, operation: HoldingOperation) -> HoldingId {
    let id = state.alloc_holding_id();
    let coordinate = Coordinate::new(id.0 as i32 + 10, 0);
    state.holdings.push(Holding {
        id,
        coordinate,
        slot_index: 0,
        kind,
        name: format!("Test {kind:?}"),
        level: 1,
        daily_yield: 100,
        cost: 0,
        unit_id: None,
        landmark: None,
        seed: BuildingSeed::for_slot(coordinate, 0, "Test"),
        last_collected_at: 0,
        operation: Some(operation),
    });
    id
}

pub(crate) fn corner_holding(state: &mut GameState, crew: &[CrewId]) -> HoldingId {
    push_holding(
        state,
        PlotKind::Corner,
        HoldingOperation::Corner(CrewPost {
            crew: crew.to_vec(),
        }),
    )
}

pub(crate) fn lab_holding(state: &mut GameState) -> HoldingId {
    push_holding(
        state,
        PlotKind::Industrial,
        HoldingOperation::Lab(LabState::default()),
    )
}

pub(crate) fn mission(
    state: &mut GameState,
    crew: &[CrewId],
    started_at: EpochMs,
    finishes_at: EpochMs,
) -> TimedOperation {
    TimedOperation {
        id: state.alloc_operation_id(),
        kind: OperationKind::Mission,
        target: Coordinate::new(1, 1),
        crew: crew.to_vec(),
        started_at,
        finishes_at,
        payload: OperationPayload::Reward {
            money: 1_000,
            respect: 1,
            heat: 1,
        },
        mode: CompletionMode::Auto,
    }
}

pub(crate) fn recipe(base_time_ms: u64, batch_size: u32) -> RecipeDef {
    RecipeDef {
        def_name: "recipe.test".to_string(),
        label: "Test".to_string(),
        base_time_ms,
        batch_size,
        input_cost: 0,
        unit_value: 10,
    }
}
