use super::rng::{string_hash, Lcg};
use super::{BuildingSeed, Coordinate, LandmarkId, Plot, PlotKind, Rect};

struct LandmarkInjection {
    coordinate: Coordinate,
    slot_index: u8,
    landmark: LandmarkId,
}

const LANDMARK_INJECTIONS: [LandmarkInjection; 3] = [
    LandmarkInjection {
        coordinate: Coordinate::new(5, -2),
        slot_index: 1,
        landmark: LandmarkId::Casino,
    },
    LandmarkInjection {
        coordinate: Coordinate::new(-8, 9),
        slot_index: 0,
        landmark: LandmarkId::Casino,
    },
    LandmarkInjection {
        coordinate: Coordinate::new(-3, 4),
        slot_index: 0,
        landmark: LandmarkId::HiddenMotel,
    },
];

const MEDICAL_BUILDINGS: [(Coordinate, u8, &str); 3] = [
    (Coordinate::new(2, 2), 0, "St. Jude Clinic"),
    (Coordinate::new(-4, 1), 1, "County General"),
    (Coordinate::new(6, -3), 0, "Back-Alley Doc"),
];

const FLAVOR_NAMES: [&str; 4] = ["Vacant Lot", "Alleyway", "Basketball Court", "Bus Stop"];

const PAYPHONE_FORCED: [Coordinate; 2] = [Coordinate::new(2, -1), Coordinate::new(-2, -2)];
const PAYPHONE_EXCLUDED: [Coordinate; 2] = [Coordinate::new(4, 4), Coordinate::new(-6, 0)];

const FLAVOR_FOOTPRINT: Rect = Rect::new(4, 92, 24, 6);
const PAYPHONE_FOOTPRINT: Rect = Rect::new(70, 92, 4, 6);
const CORNER_FOOTPRINT: Rect = Rect::new(90, 90, 10, 10);
const CORNER_COST: i64 = 2_500;

const MEDICAL_COST: i64 = 350_000;
const MEDICAL_DAILY_YIELD: i64 = 260;

/// Post-layout rewrites, applied in a fixed order after procedural slots.
pub(crate) fn apply(coordinate: Coordinate, plots: &mut Vec<Plot>, rng: &mut Lcg) {
    inject_landmark(coordinate, plots);
    inject_medical(coordinate, plots);
    append_flavor(coordinate, plots, rng);
    append_corner(coordinate, plots);
    append_payphone(coordinate, plots);
}

fn inject_landmark(coordinate: Coordinate, plots: &mut [Plot]) {
    let Some(injection) = LANDMARK_INJECTIONS
        .iter()
        .find(|injection| injection.coordinate == coordinate)
    else {
        return;
    };
    let index = injection.slot_index as usize % plots.len();
    let (name, cost, daily_yield) = match injection.landmark {
        LandmarkId::Casino => ("Golden Ace Casino", 1_800_000, 2_400),
        _ => ("Starlite Motel", 260_000, 300),
    };
    overwrite(coordinate, &mut plots[index], PlotKind::Landmark, name, cost, daily_yield);
    plots[index].landmark = Some(injection.landmark);
}

fn inject_medical(coordinate: Coordinate, plots: &mut [Plot]) {
    let Some((_, slot_index, name)) = MEDICAL_BUILDINGS
        .iter()
        .find(|(medical, _, _)| *medical == coordinate)
    else {
        return;
    };
    let index = *slot_index as usize % plots.len();
    overwrite(
        coordinate,
        &mut plots[index],
        PlotKind::Medical,
        name,
        MEDICAL_COST,
        MEDICAL_DAILY_YIELD,
    );
}

fn overwrite(
    coordinate: Coordinate,
    plot: &mut Plot,
    kind: PlotKind,
    name: &str,
    cost: i64,
    daily_yield: i64,
) {
    plot.kind = kind;
    plot.name = name.to_string();
    plot.cost = cost;
    plot.daily_yield = daily_yield;
    plot.icon = kind.default_icon();
    plot.tier = None;
    plot.variant = None;
    plot.purchasable = kind.is_purchasable();
    plot.seed = BuildingSeed::for_slot(coordinate, plot.slot_index, name);
}

fn append_flavor(coordinate: Coordinate, plots: &mut Vec<Plot>, rng: &mut Lcg) {
    let variant = (rng.next_unit() * FLAVOR_NAMES.len() as f64) as usize;
    let variant = variant.min(FLAVOR_NAMES.len() - 1);
    let name = FLAVOR_NAMES[variant];
    push_street_slot(
        coordinate,
        plots,
        PlotKind::Flavor,
        name,
        FLAVOR_FOOTPRINT,
        0,
        Some(variant as u8),
    );
}

fn append_corner(coordinate: Coordinate, plots: &mut Vec<Plot>) {
    if string_hash(&format!("corner:{},{}", coordinate.x, coordinate.y)) % 5 != 0 {
        return;
    }
    push_street_slot(
        coordinate,
        plots,
        PlotKind::Corner,
        "Street Corner",
        CORNER_FOOTPRINT,
        CORNER_COST,
        None,
    );
}

fn append_payphone(coordinate: Coordinate, plots: &mut Vec<Plot>) {
    if !has_payphone(coordinate) {
        return;
    }
    push_street_slot(
        coordinate,
        plots,
        PlotKind::Payphone,
        "Payphone",
        PAYPHONE_FOOTPRINT,
        0,
        None,
    );
}

pub(crate) fn has_payphone(coordinate: Coordinate) -> bool {
    if PAYPHONE_EXCLUDED.contains(&coordinate) {
        return false;
    }
    if PAYPHONE_FORCED.contains(&coordinate) {
        return true;
    }
    string_hash(&format!("payphone:{},{}", coordinate.x, coordinate.y)) % 7 == 3
}

fn push_street_slot(
    coordinate: Coordinate,
    plots: &mut Vec<Plot>,
    kind: PlotKind,
    name: &str,
    footprint: Rect,
    cost: i64,
    variant: Option<u8>,
) {
    let slot_index = plots.len() as u8;
    plots.push(Plot {
        footprint,
        slot_index,
        kind,
        name: name.to_string(),
        cost,
        daily_yield: 0,
        icon: kind.default_icon(),
        landmark: None,
        variant,
        tier: None,
        purchasable: kind.is_purchasable(),
        seed: BuildingSeed::for_slot(coordinate, slot_index, name),
        span: None,
    });
}
