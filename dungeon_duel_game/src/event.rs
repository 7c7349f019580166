// Presentation events: what the core tells a UI about a match.
//
// Both play modes produce the same `GameEvent` stream, always from one
// side's perspective ("self" vs "opponent"):
// - Solo play: `SoloMatch` pushes events into an `mpsc` channel that the UI
//   drains with `poll()` on its own schedule.
// - Networked play: `dungeon_duel_net::view` translates inbound wire messages
//   into the same events.
//
// UIs that prefer callbacks implement `GameEventListener` and feed each
// drained event through `GameEvent::dispatch`. The core never calls into the
// UI from its own threads.

use serde::{Deserialize, Serialize};

use crate::card::Card;
use crate::match_state::{MatchState, Side};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    HealthUpdated {
        self_health: u32,
        self_shield: u32,
        opponent_health: u32,
        opponent_shield: u32,
    },
    HandUpdated {
        hand: Vec<Card>,
    },
    OpponentHandCountUpdated {
        count: usize,
    },
    TurnChanged {
        is_self_turn: bool,
    },
    StatusUpdated {
        status: String,
    },
    ActionOccurred {
        description: String,
    },
    GameOver {
        did_self_win: bool,
        self_health: u32,
        opponent_health: u32,
    },
    CardPlayed {
        card: Card,
        by_opponent: bool,
    },
}

/// Callback-style consumer of `GameEvent`s.
pub trait GameEventListener {
    fn on_health_updated(
        &mut self,
        self_health: u32,
        self_shield: u32,
        opponent_health: u32,
        opponent_shield: u32,
    );
    fn on_hand_updated(&mut self, hand: &[Card]);
    fn on_opponent_hand_count_updated(&mut self, count: usize);
    fn on_turn_changed(&mut self, is_self_turn: bool);
    fn on_status_updated(&mut self, _status: &str) {}
    fn on_action_occurred(&mut self, description: &str);
    fn on_game_over(&mut self, did_self_win: bool, self_health: u32, opponent_health: u32);
    fn on_card_played(&mut self, card: &Card, by_opponent: bool);
}

impl GameEvent {
    /// Invoke the listener method matching this event.
    pub fn dispatch<L: GameEventListener + ?Sized>(&self, listener: &mut L) {
        match self {
            GameEvent::HealthUpdated {
                self_health,
                self_shield,
                opponent_health,
                opponent_shield,
            } => listener.on_health_updated(
                *self_health,
                *self_shield,
                *opponent_health,
                *opponent_shield,
            ),
            GameEvent::HandUpdated { hand } => listener.on_hand_updated(hand),
            GameEvent::OpponentHandCountUpdated { count } => {
                listener.on_opponent_hand_count_updated(*count);
            }
            GameEvent::TurnChanged { is_self_turn } => listener.on_turn_changed(*is_self_turn),
            GameEvent::StatusUpdated { status } => listener.on_status_updated(status),
            GameEvent::ActionOccurred { description } => listener.on_action_occurred(description),
            GameEvent::GameOver {
                did_self_win,
                self_health,
                opponent_health,
            } => listener.on_game_over(*did_self_win, *self_health, *opponent_health),
            GameEvent::CardPlayed { card, by_opponent } => {
                listener.on_card_played(card, *by_opponent);
            }
        }
    }
}

/// Health, hand and opponent hand-count events for `side`'s view of `state`.
pub fn snapshot_events(state: &MatchState, side: Side) -> Vec<GameEvent> {
    let me = state.combatant(side);
    let them = state.combatant(side.opponent());
    vec![
        GameEvent::HealthUpdated {
            self_health: me.health(),
            self_shield: me.shield(),
            opponent_health: them.health(),
            opponent_shield: them.shield(),
        },
        GameEvent::HandUpdated {
            hand: me.hand().to_vec(),
        },
        GameEvent::OpponentHandCountUpdated {
            count: them.hand().len(),
        },
    ]
}

/// The `GameOver` event for `side`, if the match has a winner.
pub fn game_over_event(state: &MatchState, side: Side) -> Option<GameEvent> {
    let winner = state.winner()?;
    Some(GameEvent::GameOver {
        did_self_win: winner == side,
        self_health: state.combatant(side).health(),
        opponent_health: state.combatant(side.opponent()).health(),
    })
}
