use sim::alloc::AssignmentContext;
use sim::scheduler::StartRequest;
use sim::state::{EquipmentKind, OperationKind, OperationPayload};
use sim::{
    generate_plots, Action, ActionError, ActionResult, Catalog, Coordinate, CrewId, GameState,
    HoldingId, OperationId, RecipeDef, Session,
};

const TENEMENT_ROW: Coordinate = Coordinate::new(1, 3);
const HOME: Coordinate = Coordinate::new(0, 0);

fn test_catalog() -> Catalog {
    Catalog::from_recipes(vec![RecipeDef {
        def_name: "recipe.test".to_string(),
        label: "Test Batch".to_string(),
        base_time_ms: 10_000,
        batch_size: 10,
        input_cost: 0,
        unit_value: 100,
    }])
}

fn rich_session() -> Session {
    let mut state = GameState::new_character("Vic");
    state.ledger.money = 1_000_000;
    Session::new(state, test_catalog()).expect("session")
}

fn slot_named(coordinate: Coordinate, name: &str) -> u8 {
    generate_plots(coordinate)
        .into_iter()
        .find(|plot| plot.name == name)
        .map(|plot| plot.slot_index)
        .expect("named slot")
}

fn buy(session: &mut Session, coordinate: Coordinate, name: &str) -> HoldingId {
    let action = Action::PurchaseHolding {
        coordinate,
        slot_index: slot_named(coordinate, name),
        unit: None,
    };
    match session.dispatch(action, 0).expect("purchase") {
        ActionResult::Purchased(id) => id,
        other => panic!("unexpected result {other:?}"),
    }
}

fn started(result: ActionResult) -> OperationId {
    match result {
        ActionResult::OperationStarted(id) => id,
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn tenement_row_override_is_fixed() {
    let plots = generate_plots(TENEMENT_ROW);
    let tenement = plots
        .iter()
        .find(|plot| plot.name == "Tenement 13-2")
        .expect("tenement");
    assert_eq!(tenement.cost, 500_000);
    assert_eq!(plots, generate_plots(TENEMENT_ROW));
}

#[test]
fn upgraded_lab_batch_with_full_crew_matches_plan() {
    let mut session = rich_session();
    let lab = buy(&mut session, TENEMENT_ROW, "Old Cannery");
    for equipment in [
        EquipmentKind::Ventilation,
        EquipmentKind::Scale,
        EquipmentKind::Scale,
    ] {
        session
            .dispatch(
                Action::UpgradeLab {
                    holding: lab,
                    equipment,
                    cost: 0,
                },
                0,
            )
            .expect("upgrade");
    }

    let operation = started(
        session
            .dispatch(
                Action::StartLabBatch {
                    holding: lab,
                    recipe: "recipe.test".to_string(),
                    crew: vec![CrewId(1), CrewId(2), CrewId(3)],
                },
                1_000,
            )
            .expect("batch"),
    );
    let batch = session.state().operation(operation).expect("batch");
    assert_eq!(batch.finishes_at - batch.started_at, 6_060);

    match session
        .dispatch(Action::CollectOperation { operation }, 7_060)
        .expect("collect")
    {
        ActionResult::Collected(collected) => {
            assert_eq!(collected.product, Some(("recipe.test".to_string(), 12)));
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn corner_crew_cannot_join_a_batch_until_unassigned() {
    let mut session = rich_session();
    let corner = buy(&mut session, HOME, "Street Corner");
    let lab = buy(&mut session, TENEMENT_ROW, "Old Cannery");
    let dice = CrewId(1);

    session
        .dispatch(
            Action::AssignCrew {
                context: AssignmentContext::Holding(corner),
                crew: dice,
            },
            0,
        )
        .expect("assign");

    let batch = || Action::StartLabBatch {
        holding: lab,
        recipe: "recipe.test".to_string(),
        crew: vec![dice],
    };
    assert_eq!(
        session.dispatch(batch(), 0),
        Err(ActionError::CrewUnavailable(dice))
    );

    session
        .dispatch(
            Action::UnassignCrew {
                context: AssignmentContext::Holding(corner),
                crew: dice,
            },
            0,
        )
        .expect("unassign");
    started(session.dispatch(batch(), 0).expect("batch"));
}

#[test]
fn manual_collect_pays_exactly_once() {
    let mut session = rich_session();
    let operation = started(
        session
            .dispatch(
                Action::StartOperation(StartRequest {
                    kind: OperationKind::Heist,
                    target: Coordinate::new(5, -2),
                    crew: vec![CrewId(1), CrewId(2)],
                    duration_ms: 60_000,
                    payload: OperationPayload::Reward {
                        money: 40_000,
                        respect: 10,
                        heat: 25,
                    },
                    cost: 5_000,
                }),
                0,
            )
            .expect("heist"),
    );
    let committed = session.state().ledger.money;

    assert_eq!(
        session.dispatch(Action::CollectOperation { operation }, 59_999),
        Err(ActionError::NotReady {
            operation,
            remaining_ms: 1
        })
    );
    session
        .dispatch(Action::CollectOperation { operation }, 60_000)
        .expect("collect");
    assert_eq!(
        session.dispatch(Action::CollectOperation { operation }, 120_000),
        Err(ActionError::AlreadyCollected(operation))
    );
    assert_eq!(session.state().ledger.money, committed + 40_000);
    assert_eq!(session.state().ledger.heat, 25);
}
