use serde::{Deserialize, Serialize};

use super::rng::unit_hash;
use super::{tier_for_seed, BuildingSeed, ResidentialTier};

const OCCUPANCY_PERCENT: u32 = 70;
const DAMAGE_PERCENT: u32 = 15;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct UnitId(pub u16);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Unit {
    pub id: UnitId,
    pub floor: u8,
    pub column: u8,
    pub occupied: bool,
    pub damaged: bool,
    pub price: i64,
    pub daily_yield: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildingInterior {
    pub tier: ResidentialTier,
    pub floors: u8,
    pub units_per_floor: u8,
    pub units: Vec<Unit>,
}

impl BuildingInterior {
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.iter().find(|unit| unit.id == id)
    }
}

/// Interior of a residential building. The same seed always yields the same
/// floors, units, flags and prices.
pub fn generate_units(seed: &BuildingSeed) -> BuildingInterior {
    let tier = tier_for_seed(seed);
    let building_hash = seed.hash();
    let floors = tier.floors();
    let units_per_floor = tier.units_per_floor();

    let mut units = Vec::with_capacity(floors as usize * units_per_floor as usize);
    for floor in 0..floors {
        for column in 0..units_per_floor {
            let hash = unit_hash(building_hash, floor, column);
            let occupied = hash % 100 < OCCUPANCY_PERCENT;
            let damaged = (hash / 100) % 100 < DAMAGE_PERCENT;
            let spread = i64::from(90 + (hash / 10_000) % 21);
            let mut price = tier.unit_base_price() * spread / 100;
            if damaged {
                price = price * 6 / 10;
            }
            let daily_yield = if occupied {
                (price as f64 * tier.daily_yield_rate()).round() as i64
            } else {
                0
            };
            units.push(Unit {
                id: UnitId(u16::from(floor) * u16::from(units_per_floor) + u16::from(column)),
                floor,
                column,
                occupied,
                damaged,
                price,
                daily_yield,
            });
        }
    }

    BuildingInterior {
        tier,
        floors,
        units_per_floor,
        units,
    }
}
