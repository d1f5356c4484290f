//! Draw tiers and the cumulative-threshold selection rule

use serde::{Deserialize, Serialize};

/// Size of the probability space; rates are expressed in tenths of a percent.
pub const PROBABILITY_SPACE: u32 = 1000;

/// The band a single pull lands in
///
/// ```text
/// |up|   ***   |  **  |    *   |
/// 1  up       s3   s3+s2      1000
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawTier {
    Up,
    Star3,
    Star2,
    Star1,
}

impl DrawTier {
    /// Map a pick in `1..=1000` to its tier.
    ///
    /// Thresholds are checked in order, so an `up` larger than `s3` simply
    /// shadows the ordinary 3-star band.
    pub fn from_pick(pick: u32, up: u32, s3: u32, s2: u32) -> Self {
        if pick <= up {
            Self::Up
        } else if pick <= s3 {
            Self::Star3
        } else if pick <= s3.saturating_add(s2) {
            Self::Star2
        } else {
            Self::Star1
        }
    }

    /// Currency (hiishi) granted by one pull of this tier
    pub fn currency(&self) -> u32 {
        match self {
            Self::Up => 100,
            Self::Star3 => 50,
            Self::Star2 => 10,
            Self::Star1 => 1,
        }
    }

    /// Star rarity of characters drawn from this tier
    pub fn stars(&self) -> u8 {
        match self {
            Self::Up | Self::Star3 => 3,
            Self::Star2 => 2,
            Self::Star1 => 1,
        }
    }

    pub fn is_three_star(&self) -> bool {
        matches!(self, Self::Up | Self::Star3)
    }
}
