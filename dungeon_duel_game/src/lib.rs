// dungeon_duel_game: rules engine for a two-player card duel.
//
// This crate holds everything about the game itself and nothing about the
// network. Both the networked coordinator (`dungeon_duel_net`) and the
// single-player scheduler (`solo.rs`) drive the same `MatchState`.
//
// Module overview:
// - `card.rs`:        `Card` value object and the closed `CardVariant` set.
// - `archetype.rs`:   Multiplier profiles (Barbarian, Paladin, Rogue, Wizard).
// - `combatant.rs`:   Per-side health/shield/hand state and its public view.
// - `deck.rs`:        Opening hands, replacement draws, improvised cards.
// - `effect.rs`:      The per-variant effect table and action descriptions.
// - `match_state.rs`: The turn-based state machine and victory rules.
// - `event.rs`:       Presentation events and the listener trait.
// - `solo.rs`:        Simulated opponent on a timed background thread.
//
// Randomness comes from one seeded `ChaCha8Rng` per match, so a seed fully
// reproduces a match.

pub mod archetype;
pub mod card;
pub mod combatant;
pub mod deck;
pub mod effect;
pub mod event;
pub mod match_state;
pub mod solo;

pub use archetype::Archetype;
pub use card::{Card, CardCategory, CardVariant};
pub use combatant::{Combatant, CombatantView};
pub use effect::EffectSummary;
pub use event::{GameEvent, GameEventListener};
pub use match_state::{MatchRules, MatchState, Outcome, Phase, PlayError, Resolution, Side};
pub use solo::{SoloConfig, SoloMatch, SoloTiming};
