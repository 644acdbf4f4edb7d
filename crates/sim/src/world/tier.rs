use serde::{Deserialize, Serialize};

use super::rng::string_hash;
use super::BuildingSeed;

const SMALL_ROLL_LIMIT: u32 = 50;
const MEDIUM_ROLL_LIMIT: u32 = 85;
const LARGE_PRICE_VARIANCE: u32 = 200_000;

/// Size class of a residential building, shared by the block generator and the
/// interior generator so both always agree on a building's shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResidentialTier {
    Small,
    Medium,
    Large,
}

impl ResidentialTier {
    pub fn from_roll(roll: u32) -> Self {
        if roll < SMALL_ROLL_LIMIT {
            Self::Small
        } else if roll < MEDIUM_ROLL_LIMIT {
            Self::Medium
        } else {
            Self::Large
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Small => "Small",
            Self::Medium => "Medium",
            Self::Large => "Large",
        }
    }

    /// Base building price before block jitter. `hash` is the building's seed
    /// hash; only large buildings use it.
    pub fn base_price(self, hash: u32) -> i64 {
        match self {
            Self::Small => 40_000,
            Self::Medium => 120_000,
            Self::Large => {
                let variance = (hash / 100) % LARGE_PRICE_VARIANCE;
                300_000 + i64::from(variance / 1_000 * 1_000)
            }
        }
    }

    /// Fraction of the purchase price returned per in-game day.
    pub fn daily_yield_rate(self) -> f64 {
        match self {
            Self::Small => 0.001,
            Self::Medium => 0.0008,
            Self::Large => 0.0005,
        }
    }

    pub fn floors(self) -> u8 {
        match self {
            Self::Small => 3,
            Self::Medium => 5,
            Self::Large => 10,
        }
    }

    pub fn units_per_floor(self) -> u8 {
        match self {
            Self::Small => 2,
            Self::Medium => 4,
            Self::Large => 6,
        }
    }

    pub fn unit_base_price(self) -> i64 {
        match self {
            Self::Small => 8_000,
            Self::Medium => 7_000,
            Self::Large => 6_000,
        }
    }
}

pub fn tier_roll(seed: &BuildingSeed) -> u32 {
    string_hash(seed.as_str()) % 100
}

pub fn tier_for_seed(seed: &BuildingSeed) -> ResidentialTier {
    ResidentialTier::from_roll(tier_roll(seed))
}
