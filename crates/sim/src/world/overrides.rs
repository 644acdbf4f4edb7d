//! Hand-authored blocks. A coordinate listed here never reaches the procedural
//! generator.

use super::{
    tier_for_seed, BuildingSeed, Coordinate, LandmarkId, MultiTileSpan, Plot, PlotKind, Rect,
    BLOCK_SIZE,
};

struct FixedSlot {
    footprint: Rect,
    kind: PlotKind,
    name: &'static str,
    cost: i64,
    daily_yield: i64,
    landmark: Option<LandmarkId>,
    purchasable: bool,
}

const STARTING_BLOCK: [FixedSlot; 3] = [
    FixedSlot {
        footprint: Rect::new(0, 0, 50, 90),
        kind: PlotKind::Landmark,
        name: "Mom's Apartment",
        cost: 0,
        daily_yield: 0,
        landmark: Some(LandmarkId::Safehouse),
        purchasable: false,
    },
    FixedSlot {
        footprint: Rect::new(50, 0, 50, 45),
        kind: PlotKind::Commercial,
        name: "Corner Bodega",
        cost: 90_000,
        daily_yield: 110,
        landmark: None,
        purchasable: true,
    },
    FixedSlot {
        footprint: Rect::new(50, 45, 50, 45),
        kind: PlotKind::Corner,
        name: "Street Corner",
        cost: 2_500,
        daily_yield: 0,
        landmark: None,
        purchasable: true,
    },
];

const TENEMENT_ROW: [FixedSlot; 2] = [
    FixedSlot {
        footprint: Rect::new(0, 0, 60, 90),
        kind: PlotKind::Residential,
        name: "Tenement 13-2",
        cost: 500_000,
        daily_yield: 250,
        landmark: None,
        purchasable: true,
    },
    FixedSlot {
        footprint: Rect::new(60, 0, 40, 90),
        kind: PlotKind::Industrial,
        name: "Old Cannery",
        cost: 210_000,
        daily_yield: 180,
        landmark: None,
        purchasable: true,
    },
];

const RIVERSIDE_PARK: [FixedSlot; 1] = [FixedSlot {
    footprint: Rect::new(0, 0, 100, 90),
    kind: PlotKind::Park,
    name: "Riverside Park",
    cost: 0,
    daily_yield: 0,
    landmark: Some(LandmarkId::RiversidePark),
    purchasable: false,
}];

const CENTRAL_STATION: [FixedSlot; 1] = [FixedSlot {
    footprint: Rect::new(0, 0, 100, 90),
    kind: PlotKind::Transit,
    name: "Central Station",
    cost: 0,
    daily_yield: 0,
    landmark: Some(LandmarkId::CentralStation),
    purchasable: false,
}];

struct MultiTileStructure {
    master: Coordinate,
    tiles_wide: i32,
    tiles_high: i32,
    /// Footprint in structure space, spanning `tiles_wide * BLOCK_SIZE` units.
    slot: FixedSlot,
}

const STRUCTURES: [MultiTileStructure; 1] = [MultiTileStructure {
    master: Coordinate::new(3, 1),
    tiles_wide: 2,
    tiles_high: 2,
    slot: FixedSlot {
        footprint: Rect::new(10, 10, 180, 170),
        kind: PlotKind::Landmark,
        name: "Harbor Stadium",
        cost: 2_500_000,
        daily_yield: 3_000,
        landmark: Some(LandmarkId::Stadium),
        purchasable: true,
    },
}];

pub(crate) fn lookup(coordinate: Coordinate) -> Option<Vec<Plot>> {
    if let Some(plot) = multi_tile_plot(coordinate) {
        return Some(vec![plot]);
    }

    let slots: &[FixedSlot] = match (coordinate.x, coordinate.y) {
        (0, 0) => &STARTING_BLOCK,
        (1, 3) => &TENEMENT_ROW,
        (2, 0) => &RIVERSIDE_PARK,
        (-1, 0) => &CENTRAL_STATION,
        _ => return None,
    };
    Some(
        slots
            .iter()
            .enumerate()
            .map(|(index, slot)| fixed_plot(coordinate, index as u8, slot, slot.footprint, None))
            .collect(),
    )
}

fn multi_tile_plot(coordinate: Coordinate) -> Option<Plot> {
    let structure = STRUCTURES.iter().find(|structure| {
        let dx = coordinate.x - structure.master.x;
        let dy = coordinate.y - structure.master.y;
        (0..structure.tiles_wide).contains(&dx) && (0..structure.tiles_high).contains(&dy)
    })?;
    let dx = coordinate.x - structure.master.x;
    let dy = coordinate.y - structure.master.y;
    let tile = Rect::new(dx * BLOCK_SIZE, dy * BLOCK_SIZE, BLOCK_SIZE, BLOCK_SIZE);
    let clipped = structure
        .slot
        .footprint
        .intersect(&tile)?
        .translated(-dx * BLOCK_SIZE, -dy * BLOCK_SIZE);
    let span = MultiTileSpan {
        master: structure.master,
        is_master: coordinate == structure.master,
    };
    // Seeded from the master block so every tile resolves to the same building.
    Some(fixed_plot(
        structure.master,
        0,
        &structure.slot,
        clipped,
        Some(span),
    ))
}

fn fixed_plot(
    seed_coordinate: Coordinate,
    slot_index: u8,
    slot: &FixedSlot,
    footprint: Rect,
    span: Option<MultiTileSpan>,
) -> Plot {
    let seed = BuildingSeed::for_slot(seed_coordinate, slot_index, slot.name);
    let tier = (slot.kind == PlotKind::Residential).then(|| tier_for_seed(&seed));
    Plot {
        footprint,
        slot_index,
        kind: slot.kind,
        name: slot.name.to_string(),
        cost: slot.cost,
        daily_yield: slot.daily_yield,
        icon: slot.kind.default_icon(),
        landmark: slot.landmark,
        variant: None,
        tier,
        purchasable: slot.purchasable && slot.kind.is_purchasable(),
        seed,
        span,
    }
}
