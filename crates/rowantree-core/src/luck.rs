//! Probability gate deciding whether a user gets an encounter this tick.

use rand::Rng;

/// Lowest face of the percentile die.
const DIE_MIN: u32 = 1;

/// Highest face of the percentile die.
const DIE_MAX: u32 = 100;

/// Roll a percentile die and succeed if it lands at or under `odds_percent`.
///
/// The draw is uniform over `[1, 100]`, so `0` never succeeds and `100` (or
/// anything above it) always does.
pub fn should_encounter(odds_percent: u32, rng: &mut impl Rng) -> bool {
    let flip = rng.random_range(DIE_MIN..=DIE_MAX);
    flip <= odds_percent
}

/// Fixed encounter odds, as configured for the personality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Luck {
    odds_percent: u32,
}

impl Luck {
    /// Create a gate with the given odds, capped at 100.
    pub fn new(odds_percent: u32) -> Self {
        Self {
            odds_percent: odds_percent.min(DIE_MAX),
        }
    }

    /// Configured odds in percent.
    pub const fn odds_percent(self) -> u32 {
        self.odds_percent
    }

    /// Roll once.
    pub fn roll(self, rng: &mut impl Rng) -> bool {
        should_encounter(self.odds_percent, rng)
    }
}
