// Combatant: one side's mutable battle state.
//
// Holds health, shield, the ordered hand and the archetype. Construction and
// the builder helpers (`with_health`, `with_shield`, `with_hand`) are public so
// callers can set up a match; every in-match mutation is `pub(crate)` and only
// reached through `MatchState` (see `match_state.rs` and `effect.rs`).
//
// Invariants:
// - `health <= max_health`, and `max_health > 0`.
// - Damage is absorbed by shield first (`take_damage`); only the excess
//   touches health, and health floors at zero.

use serde::{Deserialize, Serialize};

use crate::archetype::Archetype;
use crate::card::Card;

/// Full state of one side. The owning endpoint sees all of it; the opponent
/// only ever sees a `CombatantView`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Combatant {
    pub name: String,
    pub archetype: Archetype,
    health: u32,
    max_health: u32,
    shield: u32,
    hand: Vec<Card>,
}

/// What the opponent is allowed to know: numbers only, never hand contents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatantView {
    pub name: String,
    pub archetype: String,
    pub health: u32,
    pub max_health: u32,
    pub shield: u32,
    pub hand_count: usize,
}

impl Combatant {
    /// A fresh combatant at full health with an empty hand.
    pub fn new(name: impl Into<String>, archetype: Archetype) -> Self {
        let max_health = archetype.base_health.max(1);
        Self {
            name: name.into(),
            archetype,
            health: max_health,
            max_health,
            shield: 0,
            hand: Vec::new(),
        }
    }

    /// Start below full health. Values above `max_health` are clamped.
    pub fn with_health(mut self, health: u32) -> Self {
        self.health = health.min(self.max_health);
        self
    }

    pub fn with_shield(mut self, shield: u32) -> Self {
        self.shield = shield;
        self
    }

    pub fn with_hand(mut self, hand: Vec<Card>) -> Self {
        self.hand = hand;
        self
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn max_health(&self) -> u32 {
        self.max_health
    }

    pub fn shield(&self) -> u32 {
        self.shield
    }

    pub fn hand(&self) -> &[Card] {
        &self.hand
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    pub fn has_card(&self, card: &Card) -> bool {
        self.hand.iter().any(|c| c.matches(card))
    }

    pub fn view(&self) -> CombatantView {
        CombatantView {
            name: self.name.clone(),
            archetype: self.archetype.name.clone(),
            health: self.health,
            max_health: self.max_health,
            shield: self.shield,
            hand_count: self.hand.len(),
        }
    }

    /// Remove and return the first card in hand matching `card`.
    pub(crate) fn take_card(&mut self, card: &Card) -> Option<Card> {
        let index = self.hand.iter().position(|c| c.matches(card))?;
        Some(self.hand.remove(index))
    }

    pub(crate) fn push_card(&mut self, card: Card) {
        self.hand.push(card);
    }

    /// Shield-absorbed damage. Returns how much health was actually lost.
    pub(crate) fn take_damage(&mut self, damage: u32) -> u32 {
        let excess = damage.saturating_sub(self.shield);
        self.shield = self.shield.saturating_sub(damage);
        self.lose_health(excess)
    }

    /// Damage that ignores shield. Returns how much health was actually lost.
    pub(crate) fn lose_health(&mut self, amount: u32) -> u32 {
        let lost = amount.min(self.health);
        self.health -= lost;
        lost
    }

    pub(crate) fn add_shield(&mut self, amount: u32) {
        self.shield = self.shield.saturating_add(amount);
    }

    pub(crate) fn set_shield(&mut self, shield: u32) {
        self.shield = shield;
    }

    /// Heal up to `max_health`. Returns how much health was actually restored.
    pub(crate) fn heal(&mut self, amount: u32) -> u32 {
        let restored = amount.min(self.max_health - self.health);
        self.health += restored;
        restored
    }
}
