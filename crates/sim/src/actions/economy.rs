use tracing::info;

use crate::content::Catalog;
use crate::error::ActionError;
use crate::scheduler::charge;
use crate::state::{
    EpochMs, EquipmentKind, GameState, Holding, HoldingId, HoldingOperation, DAY_MS,
    MAX_EQUIPMENT_LEVEL, MAX_HOLDING_LEVEL,
};
use crate::world::{find_plot, generate_units, Coordinate, PlotKind, UnitId};

/// Income stops accruing after this many days without a collection.
pub const INCOME_CAP_DAYS: u64 = 7;

const CORNER_DAILY_PER_CREW: i64 = 500;
const RACKET_BONUS_PERCENT_PER_CREW: i64 = 25;

pub(super) fn purchase(
    state: &mut GameState,
    coordinate: Coordinate,
    slot_index: u8,
    unit_id: Option<UnitId>,
    now: EpochMs,
) -> Result<HoldingId, ActionError> {
    let plot = find_plot(coordinate, slot_index).ok_or_else(|| {
        ActionError::invalid(format!("no slot {slot_index} at {coordinate}"))
    })?;
    if !plot.purchasable {
        return Err(ActionError::invalid(format!(
            "{} at {coordinate} is not for sale",
            plot.name
        )));
    }
    let owner_coordinate = plot.owner_coordinate(coordinate);

    let (name, cost, daily_yield) = match unit_id {
        None => {
            if !state.owned_units(owner_coordinate, slot_index).is_empty() {
                return Err(ActionError::SlotOccupied(format!(
                    "units of {} are already owned",
                    plot.name
                )));
            }
            (plot.name.clone(), plot.cost, plot.daily_yield)
        }
        Some(unit_id) => {
            if plot.kind != PlotKind::Residential {
                return Err(ActionError::invalid(format!(
                    "{} has no units",
                    plot.name
                )));
            }
            if state.holding_at(owner_coordinate, slot_index, None).is_some() {
                return Err(ActionError::SlotOccupied(format!(
                    "{} is already owned whole",
                    plot.name
                )));
            }
            let interior = generate_units(&plot.seed);
            let unit = interior.unit(unit_id).ok_or_else(|| {
                ActionError::invalid(format!("{} has no unit {}", plot.name, unit_id.0))
            })?;
            (
                format!("{} #{}-{}", plot.name, unit.floor + 1, unit.column + 1),
                unit.price,
                unit.daily_yield,
            )
        }
    };

    if let Some(existing) = state.holding_at(owner_coordinate, slot_index, unit_id) {
        return Err(ActionError::SlotOccupied(format!(
            "{} already owns slot {slot_index} at {owner_coordinate}",
            existing.id
        )));
    }
    charge(state, cost)?;

    let id = state.alloc_holding_id();
    state.holdings.push(Holding {
        id,
        coordinate: owner_coordinate,
        slot_index,
        kind: plot.kind,
        name,
        level: 1,
        daily_yield,
        cost,
        unit_id,
        landmark: plot.landmark,
        seed: plot.seed.clone(),
        last_collected_at: now,
        operation: HoldingOperation::for_plot(plot.kind, plot.landmark, unit_id),
    });
    info!(
        holding_id = %id,
        coordinate = %owner_coordinate,
        slot_index,
        unit = ?unit_id,
        cost,
        "holding_purchased"
    );
    Ok(id)
}

pub(super) fn upgrade(
    state: &mut GameState,
    holding_id: HoldingId,
    cost: i64,
) -> Result<u8, ActionError> {
    let level = owned_holding(state, holding_id)?.level;
    if level >= MAX_HOLDING_LEVEL {
        return Err(ActionError::invalid(format!(
            "{holding_id} is already at level {MAX_HOLDING_LEVEL}"
        )));
    }
    if cost < 0 {
        return Err(ActionError::invalid(format!("negative cost {cost}")));
    }
    charge(state, cost)?;

    let holding = owned_holding_mut(state, holding_id)?;
    holding.level += 1;
    holding.daily_yield = holding.daily_yield * 6 / 5;
    info!(
        holding_id = %holding_id,
        level = holding.level,
        daily_yield = holding.daily_yield,
        cost,
        "holding_upgraded"
    );
    Ok(holding.level)
}

pub(super) fn upgrade_lab(
    state: &mut GameState,
    holding_id: HoldingId,
    equipment: EquipmentKind,
    cost: i64,
) -> Result<u8, ActionError> {
    let lab = owned_holding(state, holding_id)?
        .lab()
        .ok_or_else(|| ActionError::invalid(format!("{holding_id} is not a lab")))?;
    if lab.equipment.level(equipment) >= MAX_EQUIPMENT_LEVEL {
        return Err(ActionError::invalid(format!(
            "{equipment:?} at {holding_id} is already at level {MAX_EQUIPMENT_LEVEL}"
        )));
    }
    if cost < 0 {
        return Err(ActionError::invalid(format!("negative cost {cost}")));
    }
    charge(state, cost)?;

    let lab = owned_holding_mut(state, holding_id)?
        .lab_mut()
        .ok_or_else(|| ActionError::invalid(format!("{holding_id} is not a lab")))?;
    let level = lab.equipment.level_mut(equipment);
    *level += 1;
    let level = *level;
    info!(holding_id = %holding_id, equipment = ?equipment, level, "lab_upgraded");
    Ok(level)
}

pub(super) fn collect_income(
    state: &mut GameState,
    holding_id: HoldingId,
    now: EpochMs,
) -> Result<i64, ActionError> {
    let holding = owned_holding_mut(state, holding_id)?;
    let amount = accrued_income(holding, now);
    holding.last_collected_at = holding.last_collected_at.max(now);
    state.ledger.credit(amount, 0, 0);
    info!(holding_id = %holding_id, amount, "income_collected");
    Ok(amount)
}

/// Income earned since the last collection, capped at [`INCOME_CAP_DAYS`].
/// Staffed operations scale the base yield: each racket enforcer adds 25%,
/// each corner dealer adds a flat daily amount, and an unguarded brothel
/// earns half.
pub fn accrued_income(holding: &Holding, now: EpochMs) -> i64 {
    let elapsed = now
        .saturating_sub(holding.last_collected_at)
        .min(INCOME_CAP_DAYS * DAY_MS);
    let (percent, flat_daily) = match &holding.operation {
        Some(HoldingOperation::Racket(post)) => (
            100 + RACKET_BONUS_PERCENT_PER_CREW * post.crew.len() as i64,
            0,
        ),
        Some(HoldingOperation::Corner(post)) => {
            (100, CORNER_DAILY_PER_CREW * post.crew.len() as i64)
        }
        Some(HoldingOperation::Brothel(post)) if post.crew.is_empty() => (50, 0),
        _ => (100, 0),
    };
    let daily = i128::from(holding.daily_yield) * i128::from(percent) / 100 + i128::from(flat_daily);
    let earned = daily * i128::from(elapsed) / i128::from(DAY_MS);
    i64::try_from(earned.max(0)).unwrap_or(i64::MAX)
}

pub(super) fn sell_product(
    state: &mut GameState,
    catalog: &Catalog,
    recipe: &str,
    units: u32,
) -> Result<i64, ActionError> {
    let def = catalog
        .recipe(recipe)
        .ok_or_else(|| ActionError::invalid(format!("unknown recipe '{recipe}'")))?;
    if units == 0 {
        return Err(ActionError::invalid("nothing to sell"));
    }
    if def.unit_value < 0 {
        return Err(ActionError::invalid(format!(
            "{} has a negative unit value",
            def.label
        )));
    }
    let stock = state.inventory.get(recipe).copied().unwrap_or(0);
    if stock < units {
        return Err(ActionError::invalid(format!(
            "only {stock} units of {} in stock",
            def.label
        )));
    }
    let money = def.unit_value.saturating_mul(i64::from(units));
    if stock == units {
        state.inventory.remove(recipe);
    } else {
        state.inventory.insert(recipe.to_string(), stock - units);
    }
    state.ledger.credit(money, 0, 0);
    info!(recipe, units, money, "product_sold");
    Ok(money)
}

fn owned_holding(state: &GameState, id: HoldingId) -> Result<&Holding, ActionError> {
    state
        .holding(id)
        .ok_or_else(|| ActionError::invalid(format!("{id} is not owned")))
}

fn owned_holding_mut(state: &mut GameState, id: HoldingId) -> Result<&mut Holding, ActionError> {
    state
        .holding_mut(id)
        .ok_or_else(|| ActionError::invalid(format!("{id} is not owned")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::CrewId;
    use crate::world::generate_plots;

    fn affordable_slot(state: &GameState, kind: PlotKind) -> (Coordinate, u8) {
        for x in -12..12 {
            for y in -12..12 {
                let coordinate = Coordinate::new(x, y);
                if let Some(plot) = generate_plots(coordinate).into_iter().find(|plot| {
                    plot.kind == kind && plot.purchasable && plot.cost <= state.ledger.money
                }) {
                    return (coordinate, plot.slot_index);
                }
            }
        }
        panic!("no affordable {kind:?} plot nearby");
    }

    #[test]
    fn purchase_copies_plot_and_charges_cost() {
        let mut state = GameState::new_character("Vic");
        let (coordinate, slot) = affordable_slot(&state, PlotKind::Commercial);
        let plot = find_plot(coordinate, slot).expect("plot");
        let id = purchase(&mut state, coordinate, slot, None, 1_000).expect("purchase");

        let holding = state.holding(id).expect("holding");
        assert_eq!(holding.cost, plot.cost);
        assert_eq!(holding.seed, plot.seed);
        assert!(matches!(holding.operation, Some(HoldingOperation::Racket(_))));
        assert_eq!(state.ledger.money, 100_000 - plot.cost);

        assert!(matches!(
            purchase(&mut state, coordinate, slot, None, 1_000),
            Err(ActionError::SlotOccupied(_))
        ));
    }

    #[test]
    fn non_purchasable_and_unaffordable_are_rejected() {
        let mut state = GameState::new_character("Vic");
        let home = generate_plots(Coordinate::new(0, 0));
        let safehouse = home.iter().find(|plot| !plot.purchasable).expect("safehouse");
        assert!(matches!(
            purchase(&mut state, Coordinate::new(0, 0), safehouse.slot_index, None, 0),
            Err(ActionError::InvalidTarget(_))
        ));

        state.ledger.money = 10;
        let cheapest = home
            .iter()
            .filter(|plot| plot.purchasable)
            .min_by_key(|plot| plot.cost)
            .expect("plot");
        assert_eq!(
            purchase(&mut state, Coordinate::new(0, 0), cheapest.slot_index, None, 0),
            Err(ActionError::InsufficientFunds {
                needed: cheapest.cost,
                available: 10
            })
        );
    }

    #[test]
    fn units_and_whole_building_exclude_each_other() {
        let mut state = GameState::new_character("Vic");
        state.ledger.money = 10_000_000;
        let (coordinate, slot) = affordable_slot(&state, PlotKind::Residential);
        let unit = purchase(&mut state, coordinate, slot, Some(UnitId(0)), 0).expect("unit");
        assert!(state.holding(unit).expect("unit").operation.is_none());
        assert_eq!(state.owned_units(coordinate, slot).len(), 1);
        assert!(matches!(
            purchase(&mut state, coordinate, slot, None, 0),
            Err(ActionError::SlotOccupied(_))
        ));
        purchase(&mut state, coordinate, slot, Some(UnitId(1)), 0).expect("second unit");
    }

    #[test]
    fn income_scales_with_racket_crew_and_caps_at_a_week() {
        let mut state = GameState::new_character("Vic");
        let (coordinate, slot) = affordable_slot(&state, PlotKind::Commercial);
        let id = purchase(&mut state, coordinate, slot, None, 0).expect("purchase");
        let holding = state.holding_mut(id).expect("holding");
        holding.daily_yield = 1_000;

        assert_eq!(accrued_income(holding, DAY_MS), 1_000);
        assert_eq!(accrued_income(holding, 30 * DAY_MS), 7_000);
        if let Some(post) = holding.operation.as_mut().and_then(HoldingOperation::post_mut) {
            post.crew = vec![CrewId(1), CrewId(2)];
        }
        assert_eq!(accrued_income(holding, DAY_MS), 1_500);
    }

    #[test]
    fn collecting_income_resets_the_clock() {
        let mut state = GameState::new_character("Vic");
        let (coordinate, slot) = affordable_slot(&state, PlotKind::Commercial);
        let id = purchase(&mut state, coordinate, slot, None, 0).expect("purchase");
        let money = state.ledger.money;
        let daily_yield = state.holding(id).expect("holding").daily_yield;

        let first = collect_income(&mut state, id, DAY_MS).expect("collect");
        assert_eq!(first, daily_yield);
        assert_eq!(collect_income(&mut state, id, DAY_MS).expect("collect"), 0);
        assert_eq!(state.ledger.money, money + first);
    }

    #[test]
    fn upgrades_stop_at_max_level() {
        let mut state = GameState::new_character("Vic");
        let (coordinate, slot) = affordable_slot(&state, PlotKind::Commercial);
        let id = purchase(&mut state, coordinate, slot, None, 0).expect("purchase");
        for expected in 2..=MAX_HOLDING_LEVEL {
            assert_eq!(upgrade(&mut state, id, 0).expect("upgrade"), expected);
        }
        assert!(matches!(
            upgrade(&mut state, id, 0),
            Err(ActionError::InvalidTarget(_))
        ));
    }

    #[test]
    fn selling_more_than_stock_is_rejected() {
        let catalog = Catalog::builtin();
        let mut state = GameState::new_character("Vic");
        state.inventory.insert("recipe.street_weed".to_string(), 4);
        assert!(sell_product(&mut state, &catalog, "recipe.street_weed", 5).is_err());
        let money = sell_product(&mut state, &catalog, "recipe.street_weed", 4).expect("sell");
        assert_eq!(money, 4 * 150);
        assert!(state.inventory.is_empty());
    }

    #[test]
    fn negative_unit_value_is_an_ordinary_rejection() {
        let mut recipe = crate::test_support::recipe(1_000, 1);
        recipe.unit_value = -200_000;
        let catalog = Catalog::from_recipes(vec![recipe]);
        let mut state = GameState::new_character("Vic");
        state.inventory.insert("recipe.test".to_string(), 1);
        let before = state.clone();
        assert!(matches!(
            sell_product(&mut state, &catalog, "recipe.test", 1),
            Err(ActionError::InvalidTarget(_))
        ));
        assert_eq!(state, before);
    }
}
