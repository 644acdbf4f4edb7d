//! The game-state aggregate.
//!
//! A [`GameState`] is a plain value. Actions never edit the published snapshot
//! in place; they clone it, build the next value and hand it back whole.

mod holding;
mod operation;
mod travel;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::content::fingerprint_bytes;
use crate::world::{Coordinate, UnitId};

pub use holding::{
    CrewPost, EquipmentKind, Holding, HoldingOperation, LabEquipment, LabState,
    MAX_EQUIPMENT_LEVEL, MAX_HOLDING_LEVEL,
};
pub use operation::{CompletionMode, OperationKind, OperationPayload, TimedOperation};
pub use travel::{TravelLeg, TravelState, TRAVEL_MS_PER_BLOCK};

/// Wall-clock milliseconds. The simulation never samples a clock itself.
pub type EpochMs = u64;

pub const DAY_MS: u64 = 86_400_000;
pub const OFFICER_SLOTS: usize = 4;
pub const STARTING_MONEY: i64 = 100_000;
pub const STARTING_ENERGY: i64 = 100;
/// Collected operation ids kept verbatim before older ones fold into
/// `GameState::collected_floor`.
pub const COLLECTED_HISTORY: usize = 256;

/// Blocks rival crews have already tagged when a new character starts.
const STARTING_RIVAL_TAGS: [Coordinate; 3] = [
    Coordinate::new(1, 1),
    Coordinate::new(-2, 3),
    Coordinate::new(3, -1),
];

const STARTING_CREW: [(&str, CrewStats); 3] = [
    (
        "Dice",
        CrewStats {
            muscle: 6,
            smarts: 3,
            stealth: 4,
        },
    ),
    (
        "Nails",
        CrewStats {
            muscle: 4,
            smarts: 5,
            stealth: 5,
        },
    ),
    (
        "Whisper",
        CrewStats {
            muscle: 2,
            smarts: 6,
            stealth: 7,
        },
    ),
];

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct CrewId(pub u32);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct HoldingId(pub u64);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct OperationId(pub u64);

impl fmt::Display for CrewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "crew#{}", self.0)
    }
}

impl fmt::Display for HoldingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "holding#{}", self.0)
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    pub money: i64,
    pub heat: i64,
    pub respect: i64,
    pub energy: i64,
}

impl Ledger {
    /// Adds a yield to the ledger. Saturates instead of wrapping so a stored
    /// payload can never poison later settlement.
    pub fn credit(&mut self, money: i64, respect: i64, heat: i64) {
        self.money = self.money.saturating_add(money);
        self.respect = self.respect.saturating_add(respect);
        self.heat = self.heat.saturating_add(heat);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewStats {
    pub muscle: u8,
    pub smarts: u8,
    pub stealth: u8,
}

/// A crew member. There is deliberately no "current job" field: what a crew
/// member is doing is always derived from the holdings, operations and
/// officer slots that list them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewMember {
    pub id: CrewId,
    pub name: String,
    pub is_leader: bool,
    pub level: u32,
    pub xp: u32,
    pub stats: CrewStats,
}

/// Where a timed operation is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationSlot {
    Mission(usize),
    Tagging(usize),
    LabBatch(HoldingId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub revision: u64,
    pub ledger: Ledger,
    pub crew: Vec<CrewMember>,
    pub holdings: Vec<Holding>,
    pub missions: Vec<TimedOperation>,
    pub tagging: Vec<TimedOperation>,
    pub officers: [Option<CrewId>; OFFICER_SLOTS],
    pub completed_events: BTreeSet<String>,
    pub collected_operations: BTreeSet<OperationId>,
    /// Every finished operation id below this was collected or settled. Ids
    /// folded out of `collected_operations` raise it.
    #[serde(default)]
    pub collected_floor: u64,
    pub inventory: BTreeMap<String, u32>,
    pub tagged_blocks: BTreeSet<Coordinate>,
    pub rival_tags: BTreeSet<Coordinate>,
    pub travel: TravelState,
    pub next_holding_id: u64,
    pub next_operation_id: u64,
    pub next_crew_id: u32,
}

impl GameState {
    /// Fresh state at character creation: a leader, a starter crew, and the
    /// starting block as home.
    pub fn new_character(leader_name: &str) -> Self {
        let mut crew = vec![CrewMember {
            id: CrewId(0),
            name: leader_name.to_string(),
            is_leader: true,
            level: 1,
            xp: 0,
            stats: CrewStats {
                muscle: 5,
                smarts: 5,
                stealth: 5,
            },
        }];
        for (index, (name, stats)) in STARTING_CREW.iter().enumerate() {
            crew.push(CrewMember {
                id: CrewId(index as u32 + 1),
                name: (*name).to_string(),
                is_leader: false,
                level: 1,
                xp: 0,
                stats: *stats,
            });
        }
        let next_crew_id = crew.len() as u32;

        Self {
            revision: 0,
            ledger: Ledger {
                money: STARTING_MONEY,
                heat: 0,
                respect: 0,
                energy: STARTING_ENERGY,
            },
            crew,
            holdings: Vec::new(),
            missions: Vec::new(),
            tagging: Vec::new(),
            officers: [None; OFFICER_SLOTS],
            completed_events: BTreeSet::new(),
            collected_operations: BTreeSet::new(),
            collected_floor: 0,
            inventory: BTreeMap::new(),
            tagged_blocks: BTreeSet::new(),
            rival_tags: STARTING_RIVAL_TAGS.into_iter().collect(),
            travel: TravelState::at(Coordinate::new(0, 0)),
            next_holding_id: 0,
            next_operation_id: 0,
            next_crew_id,
        }
    }

    /// SHA-256 of the serialized snapshot. Replaying one action log from one
    /// starting state must reproduce it exactly.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        Ok(fingerprint_bytes(&serde_json::to_vec(self)?))
    }

    pub fn crew_member(&self, id: CrewId) -> Option<&CrewMember> {
        self.crew.iter().find(|member| member.id == id)
    }

    pub fn holding(&self, id: HoldingId) -> Option<&Holding> {
        self.holdings.iter().find(|holding| holding.id == id)
    }

    pub fn holding_mut(&mut self, id: HoldingId) -> Option<&mut Holding> {
        self.holdings.iter_mut().find(|holding| holding.id == id)
    }

    pub fn holding_at(
        &self,
        coordinate: Coordinate,
        slot_index: u8,
        unit_id: Option<UnitId>,
    ) -> Option<&Holding> {
        self.holdings
            .iter()
            .find(|holding| holding.occupies(coordinate, slot_index, unit_id))
    }

    /// Units owned inside the building at `(coordinate, slot_index)`.
    pub fn owned_units(&self, coordinate: Coordinate, slot_index: u8) -> Vec<&Holding> {
        self.holdings
            .iter()
            .filter(|holding| {
                holding.coordinate == coordinate
                    && holding.slot_index == slot_index
                    && holding.unit_id.is_some()
            })
            .collect()
    }

    pub fn locate_operation(&self, id: OperationId) -> Option<OperationSlot> {
        if let Some(index) = self.missions.iter().position(|op| op.id == id) {
            return Some(OperationSlot::Mission(index));
        }
        if let Some(index) = self.tagging.iter().position(|op| op.id == id) {
            return Some(OperationSlot::Tagging(index));
        }
        self.holdings.iter().find_map(|holding| {
            holding
                .lab()
                .and_then(|lab| lab.batch.as_ref())
                .filter(|batch| batch.id == id)
                .map(|_| OperationSlot::LabBatch(holding.id))
        })
    }

    pub fn operation(&self, id: OperationId) -> Option<&TimedOperation> {
        match self.locate_operation(id)? {
            OperationSlot::Mission(index) => self.missions.get(index),
            OperationSlot::Tagging(index) => self.tagging.get(index),
            OperationSlot::LabBatch(holding) => {
                self.holding(holding)?.lab()?.batch.as_ref()
            }
        }
    }

    /// Every active timed operation, wherever it is stored.
    pub fn operations(&self) -> impl Iterator<Item = &TimedOperation> {
        self.missions
            .iter()
            .chain(self.tagging.iter())
            .chain(self.holdings.iter().filter_map(|holding| {
                holding.lab().and_then(|lab| lab.batch.as_ref())
            }))
    }

    /// Whether a no-longer-live operation was already consumed. Only
    /// meaningful for ids that [`GameState::locate_operation`] cannot find.
    pub fn was_collected(&self, id: OperationId) -> bool {
        id.0 < self.collected_floor || self.collected_operations.contains(&id)
    }

    /// Remembers a collected id, folding the oldest entries into
    /// `collected_floor` once more than [`COLLECTED_HISTORY`] are held.
    pub(crate) fn record_collected(&mut self, id: OperationId) {
        self.collected_operations.insert(id);
        while self.collected_operations.len() > COLLECTED_HISTORY {
            let Some(oldest) = self.collected_operations.pop_first() else {
                break;
            };
            self.collected_floor = self.collected_floor.max(oldest.0.saturating_add(1));
        }
    }

    pub(crate) fn alloc_holding_id(&mut self) -> HoldingId {
        let id = HoldingId(self.next_holding_id);
        self.next_holding_id = self.next_holding_id.saturating_add(1);
        id
    }

    pub(crate) fn alloc_operation_id(&mut self) -> OperationId {
        let id = OperationId(self.next_operation_id);
        self.next_operation_id = self.next_operation_id.saturating_add(1);
        id
    }

    pub(crate) fn alloc_crew_id(&mut self) -> CrewId {
        let id = CrewId(self.next_crew_id);
        self.next_crew_id = self.next_crew_id.saturating_add(1);
        id
    }
}
