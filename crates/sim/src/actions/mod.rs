//! Transaction application.
//!
//! [`apply`] is the only way a snapshot changes. It clones the input, settles
//! whatever expired, runs the action against the clone, audits the result and
//! returns the next snapshot. When it returns an error the input is exactly as
//! it was.

mod crew;
mod economy;
mod travel;

use tracing::error;

use crate::alloc::AssignmentContext;
use crate::content::Catalog;
use crate::error::{ActionError, InvariantViolation};
use crate::events::{check_thresholds, Notification};
use crate::scheduler::{self, CollectedYield, StartRequest};
use crate::state::{CrewId, EpochMs, EquipmentKind, GameState, HoldingId, OperationId};
use crate::world::{Coordinate, UnitId};

pub use economy::{accrued_income, INCOME_CAP_DAYS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Buys the plot at `slot_index` on `coordinate`, or one unit inside it.
    PurchaseHolding {
        coordinate: Coordinate,
        slot_index: u8,
        unit: Option<UnitId>,
    },
    UpgradeHolding {
        holding: HoldingId,
        cost: i64,
    },
    UpgradeLab {
        holding: HoldingId,
        equipment: EquipmentKind,
        cost: i64,
    },
    CollectIncome {
        holding: HoldingId,
    },
    AssignCrew {
        context: AssignmentContext,
        crew: CrewId,
    },
    UnassignCrew {
        context: AssignmentContext,
        crew: CrewId,
    },
    StartOperation(StartRequest),
    StartLabBatch {
        holding: HoldingId,
        recipe: String,
        crew: Vec<CrewId>,
    },
    CollectOperation {
        operation: OperationId,
    },
    SellProduct {
        recipe: String,
        units: u32,
    },
    QueueTravel {
        path: Vec<Coordinate>,
    },
    CancelTravel,
    /// Settles expired operations and nothing else.
    Settle,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PurchaseHolding { .. } => "purchase_holding",
            Self::UpgradeHolding { .. } => "upgrade_holding",
            Self::UpgradeLab { .. } => "upgrade_lab",
            Self::CollectIncome { .. } => "collect_income",
            Self::AssignCrew { .. } => "assign_crew",
            Self::UnassignCrew { .. } => "unassign_crew",
            Self::StartOperation(_) => "start_operation",
            Self::StartLabBatch { .. } => "start_lab_batch",
            Self::CollectOperation { .. } => "collect_operation",
            Self::SellProduct { .. } => "sell_product",
            Self::QueueTravel { .. } => "queue_travel",
            Self::CancelTravel => "cancel_travel",
            Self::Settle => "settle",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionResult {
    Purchased(HoldingId),
    Upgraded { holding: HoldingId, level: u8 },
    LabUpgraded {
        holding: HoldingId,
        equipment: EquipmentKind,
        level: u8,
    },
    IncomeCollected { holding: HoldingId, amount: i64 },
    Assigned,
    Unassigned,
    OperationStarted(OperationId),
    Collected(CollectedYield),
    Sold { money: i64 },
    TravelQueued { arrives_at: EpochMs },
    TravelCancelled { dropped: usize },
    Settled { count: usize },
}

#[derive(Debug, Clone)]
pub struct Outcome {
    pub state: GameState,
    pub result: ActionResult,
    pub events: Vec<Notification>,
}

pub fn apply(
    current: &GameState,
    action: Action,
    now: EpochMs,
    catalog: &Catalog,
) -> Result<Outcome, ActionError> {
    let mut next = current.clone();
    let mut events = Vec::new();
    let settled = scheduler::settle_expired(&mut next, now, &mut events);

    let result = match action {
        Action::PurchaseHolding {
            coordinate,
            slot_index,
            unit,
        } => economy::purchase(&mut next, coordinate, slot_index, unit, now)
            .map(ActionResult::Purchased)?,
        Action::UpgradeHolding { holding, cost } => {
            let level = economy::upgrade(&mut next, holding, cost)?;
            ActionResult::Upgraded { holding, level }
        }
        Action::UpgradeLab {
            holding,
            equipment,
            cost,
        } => {
            let level = economy::upgrade_lab(&mut next, holding, equipment, cost)?;
            ActionResult::LabUpgraded {
                holding,
                equipment,
                level,
            }
        }
        Action::CollectIncome { holding } => {
            let amount = economy::collect_income(&mut next, holding, now)?;
            ActionResult::IncomeCollected { holding, amount }
        }
        Action::AssignCrew { context, crew } => {
            crew::assign(&mut next, context, crew)?;
            ActionResult::Assigned
        }
        Action::UnassignCrew { context, crew } => {
            crew::unassign(&mut next, context, crew)?;
            ActionResult::Unassigned
        }
        Action::StartOperation(request) => {
            scheduler::start(&mut next, request, now).map(ActionResult::OperationStarted)?
        }
        Action::StartLabBatch {
            holding,
            recipe,
            crew,
        } => {
            let recipe = catalog
                .recipe(&recipe)
                .ok_or_else(|| ActionError::invalid(format!("unknown recipe '{recipe}'")))?;
            scheduler::start_lab_batch(&mut next, holding, recipe, crew, now)
                .map(ActionResult::OperationStarted)?
        }
        Action::CollectOperation { operation } => {
            scheduler::collect(&mut next, operation, now).map(ActionResult::Collected)?
        }
        Action::SellProduct { recipe, units } => {
            let money = economy::sell_product(&mut next, catalog, &recipe, units)?;
            ActionResult::Sold { money }
        }
        Action::QueueTravel { path } => {
            let arrives_at = travel::queue(&mut next, &path, now)?;
            ActionResult::TravelQueued { arrives_at }
        }
        Action::CancelTravel => {
            let dropped = travel::cancel(&mut next)?;
            ActionResult::TravelCancelled { dropped }
        }
        Action::Settle => ActionResult::Settled { count: settled },
    };

    audit_ledger(&next)?;
    next.revision = current.revision + 1;
    check_thresholds(&mut next, &mut events);
    Ok(Outcome {
        state: next,
        result,
        events,
    })
}

fn audit_ledger(state: &GameState) -> Result<(), InvariantViolation> {
    if state.ledger.money < 0 {
        let violation = InvariantViolation::NegativeFunds {
            money: state.ledger.money,
        };
        error!(error = %violation, "ledger_invariant_violated");
        return Err(violation);
    }
    Ok(())
}
