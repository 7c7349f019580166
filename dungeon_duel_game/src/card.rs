// Card model: the immutable description of a playable action.
//
// A `Card` pairs a `CardVariant` (which effect it has) with a flavour name and
// a numeric magnitude. The magnitude defaults from the variant's base value
// but can be overridden per card. Effects themselves live in `effect.rs`;
// this file only describes what a card *is*.
//
// Hand membership is decided by `Card::matches`, which compares the
// `(variant, name)` pair and ignores magnitude. A hand can hold two cards that
// match each other; removal always takes the first match (see
// `Combatant::take_card`).

use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of card kinds. Adding a variant forces every `match` in
/// `effect.rs` and `deck.rs` to handle it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardVariant {
    Attack,
    Defend,
    Heal,
    DoubleAttack,
    SuperShield,
    UltimateHeal,
    Berserk,
    HolyLight,
    Backstab,
    Fireball,
}

/// Broad grouping used for dealing balanced hands and picking flavour names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardCategory {
    Offensive,
    Defensive,
    Restorative,
}

impl CardVariant {
    /// Every variant, in declaration order.
    pub const ALL: [CardVariant; 10] = [
        CardVariant::Attack,
        CardVariant::Defend,
        CardVariant::Heal,
        CardVariant::DoubleAttack,
        CardVariant::SuperShield,
        CardVariant::UltimateHeal,
        CardVariant::Berserk,
        CardVariant::HolyLight,
        CardVariant::Backstab,
        CardVariant::Fireball,
    ];

    /// The three base variants every opening hand is guaranteed to contain.
    pub const BASIC: [CardVariant; 3] = [CardVariant::Attack, CardVariant::Defend, CardVariant::Heal];

    /// Variants that only appear as the special card of an opening hand or
    /// as a random replacement draw.
    pub const SPECIAL: [CardVariant; 7] = [
        CardVariant::DoubleAttack,
        CardVariant::SuperShield,
        CardVariant::UltimateHeal,
        CardVariant::Berserk,
        CardVariant::HolyLight,
        CardVariant::Backstab,
        CardVariant::Fireball,
    ];

    /// Default magnitude for a freshly constructed card of this variant.
    pub fn base_magnitude(self) -> u32 {
        match self {
            CardVariant::Attack => 2,
            CardVariant::Defend | CardVariant::Heal => 1,
            CardVariant::DoubleAttack
            | CardVariant::SuperShield
            | CardVariant::UltimateHeal
            | CardVariant::HolyLight => 3,
            CardVariant::Berserk | CardVariant::Fireball => 4,
            CardVariant::Backstab => 5,
        }
    }

    pub fn category(self) -> CardCategory {
        match self {
            CardVariant::Attack
            | CardVariant::DoubleAttack
            | CardVariant::Berserk
            | CardVariant::Backstab
            | CardVariant::Fireball => CardCategory::Offensive,
            CardVariant::Defend | CardVariant::SuperShield => CardCategory::Defensive,
            CardVariant::Heal | CardVariant::UltimateHeal | CardVariant::HolyLight => {
                CardCategory::Restorative
            }
        }
    }

    /// Human-readable label, used in action descriptions.
    pub fn label(self) -> &'static str {
        match self {
            CardVariant::Attack => "Attack",
            CardVariant::Defend => "Defend",
            CardVariant::Heal => "Heal",
            CardVariant::DoubleAttack => "Double Attack",
            CardVariant::SuperShield => "Super Shield",
            CardVariant::UltimateHeal => "Ultimate Heal",
            CardVariant::Berserk => "Berserk Rage",
            CardVariant::HolyLight => "Holy Light",
            CardVariant::Backstab => "Backstab",
            CardVariant::Fireball => "Fireball",
        }
    }
}

impl fmt::Display for CardVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A playable card. Value object: never mutated after construction.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub variant: CardVariant,
    pub name: String,
    pub magnitude: u32,
}

impl Card {
    /// Build a card with the variant's default magnitude.
    pub fn new(variant: CardVariant, name: impl Into<String>) -> Self {
        Self {
            variant,
            name: name.into(),
            magnitude: variant.base_magnitude(),
        }
    }

    /// Same card with an explicit magnitude.
    pub fn with_magnitude(mut self, magnitude: u32) -> Self {
        self.magnitude = magnitude;
        self
    }

    /// Hand-membership equality: same variant and same name.
    pub fn matches(&self, other: &Card) -> bool {
        self.variant == other.variant && self.name == other.name
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.variant)
    }
}
