//! Deterministic world generation.
//!
//! Plots and building interiors are never stored. They are regenerated from a
//! block coordinate (and, for interiors, a [`BuildingSeed`]) whenever they are
//! needed, so every function in this module is pure.

mod injections;
mod layout;
mod overrides;
pub mod rng;
mod tier;
mod units;

use std::fmt;

use serde::{Deserialize, Serialize};

use self::layout::BlockLayout;
use self::rng::{string_hash, Lcg};

pub use self::layout::{BLOCK_SIZE, LOT_DEPTH};
pub use self::rng::GENERATOR_VERSION;
pub use self::tier::{tier_for_seed, tier_roll, ResidentialTier};
pub use self::units::{generate_units, BuildingInterior, Unit, UnitId};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
}

impl Coordinate {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn manhattan_distance(self, other: Coordinate) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// Axis-aligned footprint in block-local units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn area(&self) -> i64 {
        i64::from(self.w) * i64::from(self.h)
    }

    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = (self.x + self.w).min(other.x + other.w);
        let bottom = (self.y + self.h).min(other.y + other.h);
        if right <= left || bottom <= top {
            return None;
        }
        Some(Rect::new(left, top, right - left, bottom - top))
    }

    pub fn translated(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.w, self.h)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlotKind {
    Residential,
    Commercial,
    Industrial,
    Office,
    Medical,
    Landmark,
    Payphone,
    Corner,
    Park,
    Transit,
    Flavor,
}

impl PlotKind {
    pub fn is_purchasable(self) -> bool {
        !matches!(self, Self::Payphone | Self::Park | Self::Transit | Self::Flavor)
    }

    pub fn default_icon(self) -> &'static str {
        match self {
            Self::Residential => "icon.residential",
            Self::Commercial => "icon.commercial",
            Self::Industrial => "icon.industrial",
            Self::Office => "icon.office",
            Self::Medical => "icon.medical",
            Self::Landmark => "icon.landmark",
            Self::Payphone => "icon.payphone",
            Self::Corner => "icon.corner",
            Self::Park => "icon.park",
            Self::Transit => "icon.transit",
            Self::Flavor => "icon.flavor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LandmarkId {
    Safehouse,
    Casino,
    HiddenMotel,
    Stadium,
    CentralStation,
    RiversidePark,
}

/// Stable key a building's procedural content derives from.
///
/// Built from the block coordinate, slot index and provisional name. A
/// purchased building keeps the seed of the plot it was bought from, so the
/// interior of an owned building is identical to the one shown before purchase.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildingSeed(String);

impl BuildingSeed {
    pub fn for_slot(coordinate: Coordinate, slot_index: u8, provisional_name: &str) -> Self {
        Self(format!(
            "{},{}:{}:{}",
            coordinate.x, coordinate.y, slot_index, provisional_name
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn hash(&self) -> u32 {
        string_hash(&self.0)
    }
}

impl fmt::Display for BuildingSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Membership of a plot in a structure spanning several blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MultiTileSpan {
    pub master: Coordinate,
    pub is_master: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plot {
    pub footprint: Rect,
    pub slot_index: u8,
    pub kind: PlotKind,
    pub name: String,
    pub cost: i64,
    pub daily_yield: i64,
    pub icon: &'static str,
    pub landmark: Option<LandmarkId>,
    pub variant: Option<u8>,
    pub tier: Option<ResidentialTier>,
    pub purchasable: bool,
    pub seed: BuildingSeed,
    pub span: Option<MultiTileSpan>,
}

impl Plot {
    /// Block that owns this plot. Multi-tile structures resolve to their
    /// master block so every tile maps to the same holding.
    pub fn owner_coordinate(&self, queried: Coordinate) -> Coordinate {
        self.span.map(|span| span.master).unwrap_or(queried)
    }
}

/// All plots on a block, in slot order.
pub fn generate_plots(coordinate: Coordinate) -> Vec<Plot> {
    if let Some(plots) = overrides::lookup(coordinate) {
        return plots;
    }

    let mut rng = Lcg::for_block(coordinate);
    let layout = BlockLayout::from_unit(rng.next_unit());
    let mut plots = layout
        .slots()
        .iter()
        .enumerate()
        .map(|(index, footprint)| procedural_plot(coordinate, index as u8, *footprint, &mut rng))
        .collect::<Vec<_>>();

    injections::apply(coordinate, &mut plots, &mut rng);
    plots
}

pub fn find_plot(coordinate: Coordinate, slot_index: u8) -> Option<Plot> {
    generate_plots(coordinate)
        .into_iter()
        .find(|plot| plot.slot_index == slot_index)
}

pub fn ownable_plot_count(plots: &[Plot]) -> usize {
    plots.iter().filter(|plot| plot.purchasable).count()
}

const RESIDENTIAL_NAMES: [&str; 4] = ["Tenement", "Walk-up", "Row House", "Apartments"];
const COMMERCIAL_NAMES: [&str; 5] = ["Bodega", "Laundromat", "Pawn Shop", "Diner", "Liquor Store"];
const OFFICE_NAMES: [&str; 3] = ["Office Block", "Accounting Firm", "Travel Agency"];
const INDUSTRIAL_NAMES: [&str; 4] = ["Warehouse", "Garage", "Scrapyard", "Machine Shop"];

const STANDARD_SLOT_AREA: f64 = 2_500.0;

fn procedural_plot(coordinate: Coordinate, slot_index: u8, footprint: Rect, rng: &mut Lcg) -> Plot {
    let category = rng.next_unit();
    let kind = if category < 0.3 {
        PlotKind::Residential
    } else if category < 0.6 {
        PlotKind::Commercial
    } else if category < 0.8 {
        PlotKind::Office
    } else {
        PlotKind::Industrial
    };
    let names: &[&str] = match kind {
        PlotKind::Residential => &RESIDENTIAL_NAMES,
        PlotKind::Commercial => &COMMERCIAL_NAMES,
        PlotKind::Office => &OFFICE_NAMES,
        _ => &INDUSTRIAL_NAMES,
    };
    let provisional_name = (*rng.pick(names)).to_string();
    let jitter = 0.8 + rng.next_unit() * 0.4;

    let seed = BuildingSeed::for_slot(coordinate, slot_index, &provisional_name);
    let seed_hash = seed.hash();
    let variant = Some(((seed_hash >> 8) % 4) as u8);

    if kind == PlotKind::Residential {
        let tier = tier_for_seed(&seed);
        let cost = (tier.base_price(seed_hash) as f64 * jitter).round() as i64;
        let daily_yield = (cost as f64 * tier.daily_yield_rate()).round() as i64;
        return Plot {
            footprint,
            slot_index,
            kind,
            name: format!("{} {}", tier.label(), provisional_name),
            cost,
            daily_yield,
            icon: kind.default_icon(),
            landmark: None,
            variant,
            tier: Some(tier),
            purchasable: true,
            seed,
            span: None,
        };
    }

    let (base_cost, yield_rate) = match kind {
        PlotKind::Commercial => (150_000.0, 0.0012),
        PlotKind::Office => (220_000.0, 0.0009),
        _ => (180_000.0, 0.001),
    };
    let area_factor = footprint.area() as f64 / STANDARD_SLOT_AREA;
    let cost = (base_cost * area_factor * jitter).round() as i64;
    let daily_yield = (cost as f64 * yield_rate).round() as i64;
    Plot {
        footprint,
        slot_index,
        kind,
        name: provisional_name,
        cost,
        daily_yield,
        icon: kind.default_icon(),
        landmark: None,
        variant,
        tier: None,
        purchasable: true,
        seed,
        span: None,
    }
}
