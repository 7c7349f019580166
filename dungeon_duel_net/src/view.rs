// Client-side translation from wire traffic to presentation events.
//
// `MatchView` turns each inbound `WireMessage` (and each transport notice
// from the endpoint) into the same `GameEvent`s the solo scheduler emits, so
// one UI can drive both modes. It keeps the last state update it saw,
// because `game_over` only names the winning side and the UI wants "did I
// win" plus final health.

use dungeon_duel_game::{GameEvent, Side};
use dungeon_duel_protocol::message::{StateUpdate, WireMessage};

use crate::client::EndpointEvent;

#[derive(Debug, Default)]
pub struct MatchView {
    last: Option<StateUpdate>,
}

impl MatchView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Our seat, once the first state update has arrived.
    pub fn seat(&self) -> Option<Side> {
        self.last.as_ref().map(|update| update.seat)
    }

    pub fn last_update(&self) -> Option<&StateUpdate> {
        self.last.as_ref()
    }

    pub fn apply_event(&mut self, event: &EndpointEvent) -> Vec<GameEvent> {
        match event {
            EndpointEvent::Connected { peer } => vec![GameEvent::StatusUpdated {
                status: format!("Connected to {peer}. Waiting for the match to start..."),
            }],
            EndpointEvent::Message(msg) => self.apply(msg),
            EndpointEvent::Disconnected { reason } => vec![GameEvent::StatusUpdated {
                status: format!("Disconnected: {reason}"),
            }],
            EndpointEvent::Error { message } => vec![GameEvent::ActionOccurred {
                description: format!("Error: {message}"),
            }],
        }
    }

    pub fn apply(&mut self, msg: &WireMessage) -> Vec<GameEvent> {
        match msg {
            WireMessage::StateUpdate(update) => {
                let events = vec![
                    GameEvent::HealthUpdated {
                        self_health: update.own.health(),
                        self_shield: update.own.shield(),
                        opponent_health: update.opponent.health,
                        opponent_shield: update.opponent.shield,
                    },
                    GameEvent::HandUpdated {
                        hand: update.own.hand().to_vec(),
                    },
                    GameEvent::OpponentHandCountUpdated {
                        count: update.opponent.hand_count,
                    },
                    GameEvent::StatusUpdated {
                        status: update.status.clone(),
                    },
                ];
                self.last = Some(update.clone());
                events
            }
            WireMessage::TurnAnnouncement { your_turn } => vec![GameEvent::TurnChanged {
                is_self_turn: *your_turn,
            }],
            WireMessage::CardPlayed { card } => vec![GameEvent::CardPlayed {
                card: card.clone(),
                by_opponent: true,
            }],
            WireMessage::Join { notice: text }
            | WireMessage::Chat { text }
            | WireMessage::PlayerInfo { text } => vec![GameEvent::ActionOccurred {
                description: text.clone(),
            }],
            WireMessage::Rejected { reason } => vec![GameEvent::ActionOccurred {
                description: format!("Rejected: {reason}"),
            }],
            WireMessage::Paused { reason } => vec![
                GameEvent::ActionOccurred {
                    description: reason.clone(),
                },
                GameEvent::StatusUpdated {
                    status: "Match paused".into(),
                },
            ],
            WireMessage::GameOver { winner, summary } => {
                let mut events = vec![GameEvent::ActionOccurred {
                    description: summary.clone(),
                }];
                if let Some(update) = &self.last {
                    events.push(GameEvent::GameOver {
                        did_self_win: *winner == update.seat,
                        self_health: update.own.health(),
                        opponent_health: update.opponent.health,
                    });
                }
                events
            }
            WireMessage::Ready | WireMessage::Goodbye => Vec::new(),
        }
    }
}
