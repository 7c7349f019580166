// Archetypes: fixed multiplier profiles that scale a combatant's outgoing
// damage, shield and healing, and decide its starting health.
//
// The roster is the four classic classes (`Archetype::roster()`). Each
// combatant is assigned one at random when a match is created and keeps it
// for the whole match. `Archetype::balanced` builds a neutral profile (all
// multipliers 1.0) with a caller-chosen health pool, used for custom matches
// and tests that need predictable arithmetic.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Multiplier profile for a combatant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Archetype {
    pub name: String,
    pub base_health: u32,
    pub attack_multiplier: f64,
    pub defense_multiplier: f64,
    pub heal_multiplier: f64,
}

impl Archetype {
    pub fn new(
        name: impl Into<String>,
        base_health: u32,
        attack_multiplier: f64,
        defense_multiplier: f64,
        heal_multiplier: f64,
    ) -> Self {
        Self {
            name: name.into(),
            base_health,
            attack_multiplier,
            defense_multiplier,
            heal_multiplier,
        }
    }

    /// Heavy hitter that shields and heals poorly.
    pub fn barbarian() -> Self {
        Self::new("Barbarian", 35, 1.5, 0.8, 0.7)
    }

    /// Largest health pool and the strongest shields.
    pub fn paladin() -> Self {
        Self::new("Paladin", 40, 0.9, 1.6, 1.2)
    }

    /// Fragile, with the highest damage multiplier.
    pub fn rogue() -> Self {
        Self::new("Rogue", 25, 1.8, 0.7, 0.9)
    }

    /// Balanced attacker with the best healing.
    pub fn wizard() -> Self {
        Self::new("Wizard", 30, 1.3, 1.0, 1.5)
    }

    /// Neutral profile: every multiplier is 1.0.
    pub fn balanced(base_health: u32) -> Self {
        Self::new("Adventurer", base_health, 1.0, 1.0, 1.0)
    }

    /// The archetypes a match picks from.
    pub fn roster() -> [Archetype; 4] {
        [
            Self::barbarian(),
            Self::paladin(),
            Self::rogue(),
            Self::wizard(),
        ]
    }

    /// Pick one roster entry uniformly at random.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let roster = Self::roster();
        let index = rng.gen_range(0..roster.len());
        roster[index].clone()
    }

    pub fn scale_attack(&self, magnitude: f64) -> u32 {
        scale(magnitude, self.attack_multiplier)
    }

    pub fn scale_defense(&self, magnitude: f64) -> u32 {
        scale(magnitude, self.defense_multiplier)
    }

    pub fn scale_heal(&self, magnitude: f64) -> u32 {
        scale(magnitude, self.heal_multiplier)
    }
}

/// `round(magnitude * multiplier)`, half away from zero, clamped at zero.
fn scale(magnitude: f64, multiplier: f64) -> u32 {
    let scaled = (magnitude * multiplier).round();
    if scaled <= 0.0 { 0 } else { scaled as u32 }
}
