use serde::{Deserialize, Serialize};

use crate::world::{BuildingSeed, Coordinate, LandmarkId, PlotKind, UnitId};

use super::{CrewId, EpochMs, HoldingId, TimedOperation};

pub const MAX_HOLDING_LEVEL: u8 = 5;
pub const MAX_EQUIPMENT_LEVEL: u8 = 5;

const CORNER_CAPACITY: usize = 3;
const RACKET_CAPACITY: usize = 3;
const BROTHEL_CAPACITY: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub id: HoldingId,
    pub coordinate: Coordinate,
    pub slot_index: u8,
    pub kind: PlotKind,
    pub name: String,
    pub level: u8,
    pub daily_yield: i64,
    pub cost: i64,
    pub unit_id: Option<UnitId>,
    pub landmark: Option<LandmarkId>,
    pub seed: BuildingSeed,
    pub last_collected_at: EpochMs,
    pub operation: Option<HoldingOperation>,
}

impl Holding {
    pub fn occupies(&self, coordinate: Coordinate, slot_index: u8, unit_id: Option<UnitId>) -> bool {
        self.coordinate == coordinate && self.slot_index == slot_index && self.unit_id == unit_id
    }

    pub fn lab(&self) -> Option<&LabState> {
        match &self.operation {
            Some(HoldingOperation::Lab(lab)) => Some(lab),
            _ => None,
        }
    }

    pub fn lab_mut(&mut self) -> Option<&mut LabState> {
        match &mut self.operation {
            Some(HoldingOperation::Lab(lab)) => Some(lab),
            _ => None,
        }
    }
}

/// Sub-operation embedded in a holding. Which variant a holding carries is
/// fixed at purchase by its kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HoldingOperation {
    Lab(LabState),
    Corner(CrewPost),
    Racket(CrewPost),
    Brothel(CrewPost),
}

impl HoldingOperation {
    pub fn for_plot(kind: PlotKind, landmark: Option<LandmarkId>, unit_id: Option<UnitId>) -> Option<Self> {
        if unit_id.is_some() {
            return None;
        }
        match (kind, landmark) {
            (PlotKind::Industrial, _) => Some(Self::Lab(LabState::default())),
            (PlotKind::Corner, _) => Some(Self::Corner(CrewPost::default())),
            (PlotKind::Commercial, _) => Some(Self::Racket(CrewPost::default())),
            (PlotKind::Landmark, Some(LandmarkId::HiddenMotel)) => {
                Some(Self::Brothel(CrewPost::default()))
            }
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Lab(_) => "lab",
            Self::Corner(_) => "corner",
            Self::Racket(_) => "protection_racket",
            Self::Brothel(_) => "brothel_security",
        }
    }

    /// Standing crew post, if this operation staffs one. Labs are staffed per
    /// batch instead.
    pub fn post(&self) -> Option<&CrewPost> {
        match self {
            Self::Corner(post) | Self::Racket(post) | Self::Brothel(post) => Some(post),
            Self::Lab(_) => None,
        }
    }

    pub fn post_mut(&mut self) -> Option<&mut CrewPost> {
        match self {
            Self::Corner(post) | Self::Racket(post) | Self::Brothel(post) => Some(post),
            Self::Lab(_) => None,
        }
    }

    pub fn post_capacity(&self) -> usize {
        match self {
            Self::Corner(_) => CORNER_CAPACITY,
            Self::Racket(_) => RACKET_CAPACITY,
            Self::Brothel(_) => BROTHEL_CAPACITY,
            Self::Lab(_) => 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewPost {
    pub crew: Vec<CrewId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabState {
    pub equipment: LabEquipment,
    pub batch: Option<TimedOperation>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabEquipment {
    pub ventilation: u8,
    pub scale: u8,
}

impl LabEquipment {
    pub fn level(&self, kind: EquipmentKind) -> u8 {
        match kind {
            EquipmentKind::Ventilation => self.ventilation,
            EquipmentKind::Scale => self.scale,
        }
    }

    pub fn level_mut(&mut self, kind: EquipmentKind) -> &mut u8 {
        match kind {
            EquipmentKind::Ventilation => &mut self.ventilation,
            EquipmentKind::Scale => &mut self.scale,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EquipmentKind {
    Ventilation,
    Scale,
}

impl EquipmentKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "ventilation" => Some(Self::Ventilation),
            "scale" => Some(Self::Scale),
            _ => None,
        }
    }

    pub fn as_token(self) -> &'static str {
        match self {
            Self::Ventilation => "ventilation",
            Self::Scale => "scale",
        }
    }
}
