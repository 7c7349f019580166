// The wire envelope exchanged between endpoints and the coordinator.
//
// A single `WireMessage` enum covers both directions. It serializes as an
// adjacently tagged object, `{"kind": "...", "payload": ...}`, with
// snake_case kinds; unit kinds (`ready`, `goodbye`) carry no payload.
//
// Direction by kind:
// - endpoint -> coordinator: `ready`, `card_played`, `chat`, `goodbye`.
// - coordinator -> endpoint: `join`, `chat`, `card_played`, `state_update`,
//   `turn_announcement`, `game_over`, `player_info`, `rejected`, `paused`.
//
// A `state_update` is always tailored to its recipient: `own` is the
// recipient's full combatant (hand included) while `opponent` is the public
// `CombatantView` (hand count only).
//
// `encode`/`decode` are the JSON step; framing is separate (`framing.rs`).

use dungeon_duel_game::{Card, Combatant, CombatantView, Side};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum WireMessage {
    /// Endpoint's transport is fully initialized (second handshake phase).
    Ready,
    /// Someone joined; the text names the seat.
    Join { notice: String },
    /// Chat line or coordinator notice.
    Chat { text: String },
    /// Card to play (inbound) or card the opponent just played (outbound).
    CardPlayed { card: Card },
    /// Recipient-specific snapshot of the match.
    StateUpdate(StateUpdate),
    /// Whether it is now the recipient's turn.
    TurnAnnouncement { your_turn: bool },
    /// The match ended.
    GameOver { winner: Side, summary: String },
    /// Describes the recipient's own seat and archetype.
    PlayerInfo { text: String },
    /// A play or request was refused; the match continues.
    Rejected { reason: String },
    /// An endpoint left; the match will not resume.
    Paused { reason: String },
    /// Endpoint is leaving gracefully.
    Goodbye,
}

/// Payload of `WireMessage::StateUpdate`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateUpdate {
    /// Which seat the recipient occupies.
    pub seat: Side,
    pub own: Combatant,
    pub opponent: CombatantView,
    pub your_turn: bool,
    pub status: String,
}

impl WireMessage {
    /// Short kind name, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            WireMessage::Ready => "ready",
            WireMessage::Join { .. } => "join",
            WireMessage::Chat { .. } => "chat",
            WireMessage::CardPlayed { .. } => "card_played",
            WireMessage::StateUpdate(_) => "state_update",
            WireMessage::TurnAnnouncement { .. } => "turn_announcement",
            WireMessage::GameOver { .. } => "game_over",
            WireMessage::PlayerInfo { .. } => "player_info",
            WireMessage::Rejected { .. } => "rejected",
            WireMessage::Paused { .. } => "paused",
            WireMessage::Goodbye => "goodbye",
        }
    }
}

/// Serialize to the JSON payload carried inside a frame.
pub fn encode(msg: &WireMessage) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(msg)
}

/// Parse a frame payload back into a message.
pub fn decode(bytes: &[u8]) -> serde_json::Result<WireMessage> {
    serde_json::from_slice(bytes)
}
