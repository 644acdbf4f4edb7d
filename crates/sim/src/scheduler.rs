//! Timed operations.
//!
//! An operation is nothing but a pair of absolute timestamps plus the crew it
//! holds. Progress, readiness and remaining time are recomputed from `now` on
//! every call, so a gap of a second and a gap of a month are handled the same
//! way.

use tracing::{debug, info};

use crate::alloc::ensure_team_assignable;
use crate::content::RecipeDef;
use crate::error::ActionError;
use crate::events::Notification;
use crate::state::{
    CompletionMode, CrewId, CrewMember, CrewStats, EpochMs, GameState, HoldingId, LabEquipment,
    OperationId, OperationKind, OperationPayload, OperationSlot, TimedOperation,
};
use crate::world::rng::string_hash;
use crate::world::Coordinate;

/// Upper bound on any single reward component accepted at start.
pub const MAX_REWARD: i64 = 1_000_000_000_000;

const RECRUIT_NAMES: [&str; 10] = [
    "Ace", "Blade", "Cricket", "Duke", "Ghost", "Lucky", "Moose", "Rook", "Slim", "Tank",
];

/// Parameters of a new non-lab operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartRequest {
    pub kind: OperationKind,
    pub target: Coordinate,
    pub crew: Vec<CrewId>,
    pub duration_ms: u64,
    pub payload: OperationPayload,
    /// Money committed up front. Never refunded.
    pub cost: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperationStatus {
    Running { progress: f64, remaining_ms: u64 },
    Ready,
}

impl OperationStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedYield {
    pub operation: OperationId,
    pub kind: OperationKind,
    pub money: i64,
    pub respect: i64,
    pub heat: i64,
    pub product: Option<(String, u32)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabPlan {
    pub duration_ms: u64,
    pub units: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationView {
    pub id: OperationId,
    pub kind: OperationKind,
    pub target: Coordinate,
    pub mode: CompletionMode,
    pub status: OperationStatus,
}

/// Presentation values derived from one snapshot at one instant.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TickReport {
    pub now: EpochMs,
    pub operations: Vec<OperationView>,
    pub ready: Vec<OperationId>,
    pub next_arrival: Option<EpochMs>,
}

pub fn poll(operation: &TimedOperation, now: EpochMs) -> OperationStatus {
    if operation.is_ready(now) {
        OperationStatus::Ready
    } else {
        OperationStatus::Running {
            progress: operation.progress(now),
            remaining_ms: operation.remaining_ms(now),
        }
    }
}

/// Pure read over every active operation. Never settles anything.
pub fn tick(state: &GameState, now: EpochMs) -> TickReport {
    let mut operations = state
        .operations()
        .map(|operation| OperationView {
            id: operation.id,
            kind: operation.kind,
            target: operation.target,
            mode: operation.mode,
            status: poll(operation, now),
        })
        .collect::<Vec<_>>();
    operations.sort_by_key(|view| view.id);
    let ready = operations
        .iter()
        .filter(|view| view.status.is_ready())
        .map(|view| view.id)
        .collect();
    TickReport {
        now,
        operations,
        ready,
        next_arrival: state.travel.legs.front().map(|leg| leg.arrives_at),
    }
}

/// Batch duration shrinks with ventilation and crew; output grows 10% per
/// scale level. Integer arithmetic so the result floors identically
/// everywhere.
pub fn plan_lab_batch(recipe: &RecipeDef, equipment: LabEquipment, crew_count: usize) -> LabPlan {
    let divisor = 100 + 20 * u128::from(equipment.ventilation) + 15 * crew_count as u128;
    let duration_ms = (u128::from(recipe.base_time_ms) * 100 / divisor) as u64;
    let units = u64::from(recipe.batch_size) * (10 + u64::from(equipment.scale)) / 10;
    LabPlan {
        duration_ms,
        units: u32::try_from(units).unwrap_or(u32::MAX),
    }
}

pub(crate) fn start(
    state: &mut GameState,
    request: StartRequest,
    now: EpochMs,
) -> Result<OperationId, ActionError> {
    let StartRequest {
        kind,
        target,
        crew,
        duration_ms,
        payload,
        cost,
    } = request;

    if kind == OperationKind::LabBatch {
        return Err(ActionError::invalid(
            "lab batches are started from the lab holding",
        ));
    }
    validate_payload(kind, &payload)?;
    if cost < 0 {
        return Err(ActionError::invalid(format!("negative cost {cost}")));
    }
    if matches!(kind, OperationKind::Tagging | OperationKind::Erasing) {
        validate_territory(state, kind, target)?;
    }
    ensure_team_assignable(state, kind, &crew)?;
    charge(state, cost)?;

    let id = state.alloc_operation_id();
    let operation = TimedOperation {
        id,
        kind,
        target,
        crew,
        started_at: now,
        finishes_at: now.saturating_add(duration_ms),
        payload,
        mode: kind.completion_mode(),
    };
    info!(
        operation_id = %id,
        kind = kind.as_token(),
        target = %target,
        crew = operation.crew.len(),
        finishes_at = operation.finishes_at,
        "operation_started"
    );
    match kind {
        OperationKind::Tagging | OperationKind::Erasing => state.tagging.push(operation),
        _ => state.missions.push(operation),
    }
    Ok(id)
}

pub(crate) fn start_lab_batch(
    state: &mut GameState,
    holding_id: HoldingId,
    recipe: &RecipeDef,
    crew: Vec<CrewId>,
    now: EpochMs,
) -> Result<OperationId, ActionError> {
    let holding = state
        .holding(holding_id)
        .ok_or_else(|| ActionError::invalid(format!("unknown holding {holding_id}")))?;
    let lab = holding
        .lab()
        .ok_or_else(|| ActionError::invalid(format!("{holding_id} is not a lab")))?;
    if lab.batch.is_some() {
        return Err(ActionError::SlotOccupied(format!(
            "{holding_id} already has a batch running"
        )));
    }
    let target = holding.coordinate;
    let equipment = lab.equipment;

    ensure_team_assignable(state, OperationKind::LabBatch, &crew)?;
    charge(state, recipe.input_cost)?;

    let plan = plan_lab_batch(recipe, equipment, crew.len());
    let id = state.alloc_operation_id();
    let batch = TimedOperation {
        id,
        kind: OperationKind::LabBatch,
        target,
        crew,
        started_at: now,
        finishes_at: now.saturating_add(plan.duration_ms),
        payload: OperationPayload::Batch {
            recipe: recipe.def_name.clone(),
            units: plan.units,
        },
        mode: CompletionMode::ManualCollect,
    };
    info!(
        operation_id = %id,
        holding_id = %holding_id,
        recipe = %recipe.def_name,
        duration_ms = plan.duration_ms,
        units = plan.units,
        "lab_batch_started"
    );
    let lab = state
        .holding_mut(holding_id)
        .and_then(|holding| holding.lab_mut())
        .ok_or_else(|| ActionError::invalid(format!("{holding_id} is not a lab")))?;
    lab.batch = Some(batch);
    Ok(id)
}

/// Consumes a finished manual-collect operation exactly once.
pub(crate) fn collect(
    state: &mut GameState,
    operation_id: OperationId,
    now: EpochMs,
) -> Result<CollectedYield, ActionError> {
    let Some(slot) = state.locate_operation(operation_id) else {
        if state.was_collected(operation_id) {
            return Err(ActionError::AlreadyCollected(operation_id));
        }
        return Err(ActionError::invalid(format!(
            "unknown operation {operation_id}"
        )));
    };
    let operation = state
        .operation(operation_id)
        .ok_or_else(|| ActionError::invalid(format!("unknown operation {operation_id}")))?;
    if operation.mode != CompletionMode::ManualCollect {
        return Err(ActionError::invalid(format!(
            "{operation_id} completes on its own"
        )));
    }
    if !operation.is_ready(now) {
        return Err(ActionError::NotReady {
            operation: operation_id,
            remaining_ms: operation.remaining_ms(now),
        });
    }

    let operation = take_operation(state, slot)
        .ok_or_else(|| ActionError::invalid(format!("unknown operation {operation_id}")))?;
    let mut collected = CollectedYield {
        operation: operation.id,
        kind: operation.kind,
        money: 0,
        respect: 0,
        heat: 0,
        product: None,
    };
    match operation.payload {
        OperationPayload::Reward {
            money,
            respect,
            heat,
        } => {
            state.ledger.credit(money, respect, heat);
            collected.money = money;
            collected.respect = respect;
            collected.heat = heat;
        }
        OperationPayload::Batch { recipe, units } => {
            *state.inventory.entry(recipe.clone()).or_insert(0) += units;
            collected.product = Some((recipe, units));
        }
        OperationPayload::Territory | OperationPayload::Recruit => {}
    }
    state.record_collected(operation_id);
    info!(
        operation_id = %operation_id,
        kind = collected.kind.as_token(),
        money = collected.money,
        "operation_collected"
    );
    Ok(collected)
}

/// Lazy reaper. Drops every auto-completing operation whose finish time has
/// passed, applies its result in finish order, and consumes arrived travel
/// legs. Returns how many operations settled.
pub(crate) fn settle_expired(
    state: &mut GameState,
    now: EpochMs,
    events: &mut Vec<Notification>,
) -> usize {
    let expired_by = |operation: &TimedOperation| {
        operation.mode == CompletionMode::Auto && operation.is_ready(now)
    };
    let (mut expired, missions): (Vec<_>, Vec<_>) =
        std::mem::take(&mut state.missions).into_iter().partition(expired_by);
    let (expired_tags, tagging): (Vec<_>, Vec<_>) =
        std::mem::take(&mut state.tagging).into_iter().partition(expired_by);
    state.missions = missions;
    state.tagging = tagging;
    expired.extend(expired_tags);
    expired.sort_by_key(|operation| (operation.finishes_at, operation.id));

    let settled = expired.len();
    for operation in expired {
        apply_result(state, &operation, events);
        debug!(operation_id = %operation.id, kind = operation.kind.as_token(), "operation_settled");
        events.push(Notification::OperationSettled {
            operation: operation.id,
            kind: operation.kind,
        });
    }

    for coordinate in state.travel.settle(now) {
        info!(coordinate = %coordinate, "travel_arrived");
        events.push(Notification::ArrivedAt { coordinate });
    }
    settled
}

fn apply_result(state: &mut GameState, operation: &TimedOperation, events: &mut Vec<Notification>) {
    match &operation.payload {
        OperationPayload::Reward {
            money,
            respect,
            heat,
        } => {
            state.ledger.credit(*money, *respect, *heat);
        }
        OperationPayload::Territory => match operation.kind {
            OperationKind::Erasing => {
                state.rival_tags.remove(&operation.target);
            }
            _ => {
                state.tagged_blocks.insert(operation.target);
            }
        },
        OperationPayload::Recruit => {
            let recruit = recruit_for(state, operation.id);
            info!(crew = %recruit.id, name = %recruit.name, "crew_recruited");
            events.push(Notification::CrewRecruited {
                crew: recruit.id,
                name: recruit.name.clone(),
            });
            state.crew.push(recruit);
        }
        OperationPayload::Batch { .. } => {}
    }
}

/// Recruits are derived from the operation id, so replaying the same action
/// log recruits the same people.
fn recruit_for(state: &mut GameState, operation: OperationId) -> CrewMember {
    let hash = string_hash(&format!("recruit:{}", operation.0));
    let name = RECRUIT_NAMES[hash as usize % RECRUIT_NAMES.len()];
    let stat = |shift: u32| (((hash >> shift) % 6) + 2) as u8;
    let id = state.alloc_crew_id();
    CrewMember {
        id,
        name: format!("{name} {}", id.0),
        is_leader: false,
        level: 1,
        xp: 0,
        stats: CrewStats {
            muscle: stat(4),
            smarts: stat(10),
            stealth: stat(16),
        },
    }
}

fn take_operation(state: &mut GameState, slot: OperationSlot) -> Option<TimedOperation> {
    match slot {
        OperationSlot::Mission(index) => Some(state.missions.remove(index)),
        OperationSlot::Tagging(index) => Some(state.tagging.remove(index)),
        OperationSlot::LabBatch(holding) => state.holding_mut(holding)?.lab_mut()?.batch.take(),
    }
}

fn validate_payload(kind: OperationKind, payload: &OperationPayload) -> Result<(), ActionError> {
    let matches = match (kind, payload) {
        (
            OperationKind::Mission | OperationKind::Heist | OperationKind::Raid,
            OperationPayload::Reward {
                money,
                respect,
                heat,
            },
        ) => {
            (0..=MAX_REWARD).contains(money)
                && (-MAX_REWARD..=MAX_REWARD).contains(respect)
                && (-MAX_REWARD..=MAX_REWARD).contains(heat)
        }
        (OperationKind::Tagging | OperationKind::Erasing, OperationPayload::Territory) => true,
        (OperationKind::Recruitment, OperationPayload::Recruit) => true,
        _ => false,
    };
    if matches {
        Ok(())
    } else {
        Err(ActionError::invalid(format!(
            "payload {payload:?} does not fit a {} operation",
            kind.as_token()
        )))
    }
}

fn validate_territory(
    state: &GameState,
    kind: OperationKind,
    target: Coordinate,
) -> Result<(), ActionError> {
    if state.tagging.iter().any(|operation| operation.target == target) {
        return Err(ActionError::SlotOccupied(format!(
            "{target} already has crew working on it"
        )));
    }
    match kind {
        OperationKind::Erasing if !state.rival_tags.contains(&target) => Err(
            ActionError::invalid(format!("no rival tag at {target}")),
        ),
        OperationKind::Tagging if state.tagged_blocks.contains(&target) => Err(
            ActionError::SlotOccupied(format!("{target} is already tagged")),
        ),
        OperationKind::Tagging if state.rival_tags.contains(&target) => Err(ActionError::invalid(
            format!("{target} carries a rival tag; erase it first"),
        )),
        _ => Ok(()),
    }
}

pub(crate) fn charge(state: &mut GameState, cost: i64) -> Result<(), ActionError> {
    if state.ledger.money < cost {
        return Err(ActionError::InsufficientFunds {
            needed: cost,
            available: state.ledger.money,
        });
    }
    state.ledger.money -= cost;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Holding, HoldingOperation, LabState};
    use crate::test_support::{lab_holding, mission, recipe};

    fn reward_request(kind: OperationKind, crew: Vec<CrewId>, duration_ms: u64) -> StartRequest {
        StartRequest {
            kind,
            target: Coordinate::new(2, 2),
            crew,
            duration_ms,
            payload: OperationPayload::Reward {
                money: 5_000,
                respect: 2,
                heat: 3,
            },
            cost: 1_000,
        }
    }

    #[test]
    fn lab_plan_matches_worked_example() {
        let plan = plan_lab_batch(
            &recipe(10_000, 10),
            LabEquipment {
                ventilation: 1,
                scale: 2,
            },
            3,
        );
        assert_eq!(plan.duration_ms, 6_060);
        assert_eq!(plan.units, 12);
    }

    #[test]
    fn lab_plan_without_upgrades_keeps_base_values() {
        let plan = plan_lab_batch(&recipe(9_000, 7), LabEquipment::default(), 0);
        assert_eq!(plan, LabPlan { duration_ms: 9_000, units: 7 });
    }

    #[test]
    fn start_commits_cost_and_crew() {
        let mut state = GameState::new_character("Vic");
        let id = start(
            &mut state,
            reward_request(OperationKind::Mission, vec![CrewId(1)], 5_000),
            100,
        )
        .expect("start");
        assert_eq!(state.ledger.money, 99_000);
        let operation = state.operation(id).expect("operation");
        assert_eq!(operation.finishes_at, 5_100);
        assert_eq!(operation.mode, CompletionMode::Auto);
    }

    #[test]
    fn start_rejects_unaffordable_without_booking_crew() {
        let mut state = GameState::new_character("Vic");
        let mut request = reward_request(OperationKind::Raid, vec![CrewId(1)], 5_000);
        request.cost = 1_000_000;
        let before = state.clone();
        let error = start(&mut state, request, 0).expect_err("funds");
        assert!(matches!(error, ActionError::InsufficientFunds { .. }));
        assert_eq!(state, before);
    }

    #[test]
    fn auto_operations_settle_once_in_finish_order() {
        let mut state = GameState::new_character("Vic");
        start(
            &mut state,
            reward_request(OperationKind::Mission, vec![CrewId(1)], 5_000),
            0,
        )
        .expect("start");
        start(
            &mut state,
            StartRequest {
                kind: OperationKind::Recruitment,
                target: Coordinate::new(0, 0),
                crew: vec![CrewId(2)],
                duration_ms: 1_000,
                payload: OperationPayload::Recruit,
                cost: 0,
            },
            0,
        )
        .expect("start");
        let crew_before = state.crew.len();

        let mut events = Vec::new();
        assert_eq!(settle_expired(&mut state, 4_999, &mut events), 1);
        assert_eq!(state.crew.len(), crew_before + 1);
        assert!(matches!(events[0], Notification::CrewRecruited { .. }));

        assert_eq!(settle_expired(&mut state, 10_000, &mut events), 1);
        assert_eq!(state.ledger.money, 100_000 - 1_000 + 5_000);
        assert_eq!(settle_expired(&mut state, 20_000, &mut events), 0);
        assert!(state.missions.is_empty());
    }

    #[test]
    fn heist_waits_for_collect_and_collects_once() {
        let mut state = GameState::new_character("Vic");
        let id = start(
            &mut state,
            reward_request(OperationKind::Heist, vec![CrewId(1), CrewId(2)], 5_000),
            0,
        )
        .expect("start");

        let mut events = Vec::new();
        settle_expired(&mut state, 60_000, &mut events);
        assert!(state.operation(id).is_some());

        assert_eq!(
            collect(&mut state, id, 4_000),
            Err(ActionError::NotReady {
                operation: id,
                remaining_ms: 1_000
            })
        );
        let collected = collect(&mut state, id, 5_000).expect("collect");
        assert_eq!(collected.money, 5_000);
        assert_eq!(state.ledger.heat, 3);
        assert_eq!(
            collect(&mut state, id, 6_000),
            Err(ActionError::AlreadyCollected(id))
        );
    }

    #[test]
    fn ids_below_the_collected_floor_report_already_collected() {
        let mut state = GameState::new_character("Vic");
        let live = start(
            &mut state,
            reward_request(OperationKind::Heist, vec![CrewId(1)], 5_000),
            0,
        )
        .expect("start");
        state.next_operation_id = 20;
        state.collected_floor = 10;

        assert_eq!(
            collect(&mut state, OperationId(3), 5_000),
            Err(ActionError::AlreadyCollected(OperationId(3)))
        );
        assert!(matches!(
            collect(&mut state, OperationId(12), 5_000),
            Err(ActionError::InvalidTarget(_))
        ));
        collect(&mut state, live, 5_000).expect("live operation below the floor");
        assert_eq!(
            collect(&mut state, live, 6_000),
            Err(ActionError::AlreadyCollected(live))
        );
    }

    #[test]
    fn tagging_requires_rival_tag_erased_first() {
        let mut state = GameState::new_character("Vic");
        let rival = *state.rival_tags.iter().next().expect("rival tag");
        let tag = |target| StartRequest {
            kind: OperationKind::Tagging,
            target,
            crew: vec![CrewId(1)],
            duration_ms: 1_000,
            payload: OperationPayload::Territory,
            cost: 0,
        };
        assert!(matches!(
            start(&mut state, tag(rival), 0),
            Err(ActionError::InvalidTarget(_))
        ));

        let erase = StartRequest {
            kind: OperationKind::Erasing,
            ..tag(rival)
        };
        start(&mut state, erase, 0).expect("erase");
        let mut events = Vec::new();
        settle_expired(&mut state, 1_000, &mut events);
        assert!(!state.rival_tags.contains(&rival));

        start(&mut state, tag(rival), 1_000).expect("tag");
        settle_expired(&mut state, 2_000, &mut events);
        assert!(state.tagged_blocks.contains(&rival));
        assert!(matches!(
            start(&mut state, tag(rival), 2_000),
            Err(ActionError::SlotOccupied(_))
        ));
    }

    #[test]
    fn lab_batch_occupies_the_lab_until_collected() {
        let mut state = GameState::new_character("Vic");
        let holding = lab_holding(&mut state);
        let recipe = recipe(10_000, 10);
        let id = start_lab_batch(&mut state, holding, &recipe, vec![CrewId(1)], 0)
            .expect("batch");
        assert!(matches!(
            start_lab_batch(&mut state, holding, &recipe, vec![CrewId(2)], 0),
            Err(ActionError::SlotOccupied(_))
        ));

        let finishes_at = state.operation(id).expect("batch").finishes_at;
        let collected = collect(&mut state, id, finishes_at).expect("collect");
        assert_eq!(collected.product, Some((recipe.def_name.clone(), 10)));
        assert_eq!(state.inventory.get(&recipe.def_name), Some(&10));
        assert!(state
            .holding(holding)
            .and_then(Holding::lab)
            .is_some_and(|lab| lab.batch.is_none()));
    }

    #[test]
    fn lab_batch_rejects_non_lab_holdings() {
        let mut state = GameState::new_character("Vic");
        let holding = lab_holding(&mut state);
        if let Some(target) = state.holding_mut(holding) {
            target.operation = Some(HoldingOperation::Corner(Default::default()));
        }
        assert!(matches!(
            start_lab_batch(&mut state, holding, &recipe(1_000, 1), vec![CrewId(1)], 0),
            Err(ActionError::InvalidTarget(_))
        ));
        if let Some(target) = state.holding_mut(holding) {
            target.operation = Some(HoldingOperation::Lab(LabState::default()));
        }
        assert!(start_lab_batch(&mut state, holding, &recipe(1_000, 1), vec![CrewId(1)], 0).is_ok());
    }

    #[test]
    fn tick_reports_ready_without_mutating() {
        let mut state = GameState::new_character("Vic");
        let id = start(
            &mut state,
            reward_request(OperationKind::Mission, vec![CrewId(1)], 2_000),
            0,
        )
        .expect("start");
        let before = state.clone();

        let early = tick(&state, 1_000);
        assert!(early.ready.is_empty());
        assert_eq!(
            early.operations[0].status,
            OperationStatus::Running {
                progress: 0.5,
                remaining_ms: 1_000
            }
        );
        for now in [2_000, 2_001, 90_000] {
            assert_eq!(tick(&state, now).ready, vec![id]);
        }
        assert_eq!(state, before);
    }

    #[test]
    fn oversized_reward_is_rejected_at_start() {
        let mut state = GameState::new_character("Vic");
        let before = state.clone();
        let request = StartRequest {
            payload: OperationPayload::Reward {
                money: i64::MAX,
                respect: 0,
                heat: 0,
            },
            ..reward_request(OperationKind::Mission, vec![CrewId(1)], 1_000)
        };
        assert!(matches!(
            start(&mut state, request, 0),
            Err(ActionError::InvalidTarget(_))
        ));
        assert_eq!(state, before);
    }

    #[test]
    fn stored_oversized_reward_settles_without_overflow() {
        let mut state = GameState::new_character("Vic");
        let mut operation = mission(&mut state, &[CrewId(1)], 0, 1_000);
        operation.payload = OperationPayload::Reward {
            money: i64::MAX,
            respect: i64::MAX,
            heat: 1,
        };
        state.missions.push(operation);
        state.ledger.respect = 5;

        let mut events = Vec::new();
        assert_eq!(settle_expired(&mut state, 2_000, &mut events), 1);
        assert_eq!(state.ledger.money, i64::MAX);
        assert_eq!(state.ledger.respect, i64::MAX);
        assert!(state.missions.is_empty());
    }

    #[test]
    fn payload_must_fit_kind() {
        let mut state = GameState::new_character("Vic");
        let request = StartRequest {
            payload: OperationPayload::Recruit,
            ..reward_request(OperationKind::Raid, vec![CrewId(1)], 1_000)
        };
        assert!(matches!(
            start(&mut state, request, 0),
            Err(ActionError::InvalidTarget(_))
        ));
    }
}
