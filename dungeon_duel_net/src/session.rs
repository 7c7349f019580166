// Session state for the duel coordinator.
//
// `Session` is the single owner of the authoritative `MatchState`. It is
// driven exclusively by the main loop in `server.rs`, so every mutation
// (`on_endpoint_ready`, `on_card_played`, `remove_endpoint`) is serialized
// through one thread and every per-endpoint view is built right after the
// mutation that produced it. No internal locking.
//
// Endpoint lifecycle:
// - `add_endpoint` runs at accept time. It assigns a fresh `EndpointId` and
//   the lowest free seat (side A, then side B), or refuses when the session
//   is at capacity. A refused connection never gets an id.
// - A `ready` message moves the endpoint into the ready list (in readiness
//   order). When two endpoints are connected and both are ready, the match
//   starts and the first-ready endpoint takes the opening turn.
// - `remove_endpoint` drops the endpoint (disconnect, goodbye, malformed
//   input, or a failed send). If the match was in progress it is paused for
//   good: later plays are rejected. Before the start (or after the end) the
//   others only get a leave notice.
//
// Writing to endpoint streams: `Session` holds cloned `TcpStream` write
// halves wrapped in `BufWriter`. `send_to` reports failure to the caller;
// `broadcast` keeps delivering to the remaining endpoints and only then
// removes the endpoints whose sends failed.

use std::collections::BTreeMap;
use std::io::BufWriter;
use std::net::{Shutdown, TcpStream};

use dungeon_duel_game::{Card, MatchState, Phase, Side};
use dungeon_duel_protocol::framing::write_wire;
use dungeon_duel_protocol::message::{StateUpdate, WireMessage};
use dungeon_duel_protocol::types::EndpointId;

/// Reason attached to every play refused after a disconnect.
pub const PAUSED_REASON: &str = "match paused";

/// Coordinator-side state of one match and its endpoints.
pub struct Session {
    game: MatchState,
    endpoints: BTreeMap<EndpointId, EndpointSlot>,
    ready: Vec<EndpointId>,
    next_endpoint_id: u32,
    max_endpoints: usize,
    paused: bool,
}

struct EndpointSlot {
    side: Side,
    writer: BufWriter<TcpStream>,
}

impl Session {
    pub fn new(game: MatchState, max_endpoints: usize) -> Self {
        Self {
            game,
            endpoints: BTreeMap::new(),
            ready: Vec::new(),
            next_endpoint_id: 0,
            max_endpoints: max_endpoints.min(Side::BOTH.len()),
            paused: false,
        }
    }

    /// Register an accepted connection. Returns `None` (and leaves the
    /// session untouched) when the session is full.
    pub fn add_endpoint(&mut self, stream: TcpStream) -> Option<EndpointId> {
        if self.endpoints.len() >= self.max_endpoints {
            return None;
        }
        let side = Side::BOTH
            .into_iter()
            .find(|side| !self.endpoints.values().any(|slot| slot.side == *side))?;

        let id = EndpointId(self.next_endpoint_id);
        self.next_endpoint_id += 1;
        self.endpoints.insert(
            id,
            EndpointSlot {
                side,
                writer: BufWriter::new(stream),
            },
        );
        log::info!("{id} seated as {}", side.label());
        Some(id)
    }

    /// Second phase of the handshake: the endpoint can now receive.
    pub fn on_endpoint_ready(&mut self, id: EndpointId) {
        let Some(side) = self.side_of(id) else {
            return;
        };
        if self.ready.contains(&id) {
            log::debug!("{id} sent ready twice");
            return;
        }
        self.ready.push(id);
        log::info!("{id} ({}) ready", side.label());

        self.broadcast(
            &WireMessage::Join {
                notice: format!("{} has entered the dungeon.", side.label()),
            },
            None,
        );
        self.send_or_remove(
            id,
            &WireMessage::Chat {
                text: format!("Welcome to Dungeon Duel! You are {}.", side.label()),
            },
        );

        match self.game.phase() {
            Phase::AwaitingPlayers => {
                if self.ready.len() == Side::BOTH.len() && self.endpoints.len() == self.ready.len() {
                    self.start_match();
                } else {
                    self.send_or_remove(
                        id,
                        &WireMessage::Chat {
                            text: "Waiting for an opponent...".into(),
                        },
                    );
                }
            }
            Phase::InProgress | Phase::Ended => {
                self.send_or_remove(
                    id,
                    &WireMessage::Paused {
                        reason: format!("{PAUSED_REASON}: this match cannot be resumed"),
                    },
                );
            }
        }
    }

    fn start_match(&mut self) {
        let Some(first) = self.ready.first().and_then(|id| self.side_of(*id)) else {
            return;
        };
        if let Err(e) = self.game.start(first) {
            log::warn!("could not start match: {e}");
            return;
        }
        self.broadcast(
            &WireMessage::Chat {
                text: format!("The battle begins! {} moves first.", first.label()),
            },
            None,
        );
        for (id, side) in self.seats() {
            let own = self.game.combatant(side);
            let info = WireMessage::PlayerInfo {
                text: format!(
                    "You are {}, a {} with {} HP.",
                    side.label(),
                    own.archetype.name,
                    own.max_health()
                ),
            };
            self.send_or_remove(id, &info);
        }
        self.push_views();
    }

    /// Run a card play from `id` through the match. Refusals go back to the
    /// sender only; the match is unchanged.
    pub fn on_card_played(&mut self, id: EndpointId, card: Card) {
        let Some(side) = self.side_of(id) else {
            return;
        };
        if self.paused {
            self.reject(id, PAUSED_REASON.into());
            return;
        }
        let resolution = match self.game.play_card(side, &card) {
            Ok(resolution) => resolution,
            Err(e) => {
                self.reject(id, e.to_string());
                return;
            }
        };

        self.broadcast(
            &WireMessage::Chat {
                text: resolution.description.clone(),
            },
            None,
        );
        self.broadcast(
            &WireMessage::CardPlayed {
                card: resolution.card.clone(),
            },
            Some(id),
        );
        self.push_views();
        if let Some(drawn) = &resolution.drawn {
            self.send_or_remove(
                id,
                &WireMessage::Chat {
                    text: format!("You drew {drawn}."),
                },
            );
        }
        if let Some(winner) = resolution.winner {
            let summary = format!(
                "{} wins! Final health: {} {}, {} {}.",
                winner.label(),
                Side::A.label(),
                self.game.combatant(Side::A).health(),
                Side::B.label(),
                self.game.combatant(Side::B).health()
            );
            self.broadcast(&WireMessage::GameOver { winner, summary }, None);
        }
    }

    /// Relay chat to everyone, sender included, prefixed with the seat.
    pub fn on_chat(&mut self, id: EndpointId, text: String) {
        let Some(side) = self.side_of(id) else {
            return;
        };
        self.broadcast(
            &WireMessage::Chat {
                text: format!("{}: {text}", side.label()),
            },
            None,
        );
    }

    /// A message kind endpoints are not supposed to send.
    pub fn on_unexpected(&mut self, id: EndpointId, kind: &str) {
        log::warn!("{id} sent unexpected {kind}");
        self.reject(id, format!("unexpected message: {kind}"));
    }

    /// Drop an endpoint. No-op for unknown ids, so a reader-side disconnect
    /// racing a send failure removes the endpoint once.
    pub fn remove_endpoint(&mut self, id: EndpointId) {
        let Some(slot) = self.endpoints.remove(&id) else {
            return;
        };
        let _ = slot.writer.get_ref().shutdown(Shutdown::Both);
        self.ready.retain(|ready| *ready != id);
        log::info!("{id} ({}) left", slot.side.label());

        let notice = if self.game.phase() == Phase::InProgress {
            self.paused = true;
            WireMessage::Paused {
                reason: format!("{} left the match. The match is paused.", slot.side.label()),
            }
        } else {
            WireMessage::Chat {
                text: format!("{} left the match.", slot.side.label()),
            }
        };
        self.broadcast(&notice, None);
    }

    /// Close every endpoint (coordinator shutdown). No notices are sent.
    pub fn disconnect_all(&mut self) {
        for (id, slot) in std::mem::take(&mut self.endpoints) {
            log::debug!("closing {id}");
            let _ = slot.writer.get_ref().shutdown(Shutdown::Both);
        }
        self.ready.clear();
    }

    /// Fan out to every endpoint except `exclude`. A failed send does not
    /// stop delivery to the others; failed endpoints are removed afterwards.
    pub fn broadcast(&mut self, msg: &WireMessage, exclude: Option<EndpointId>) {
        let targets: Vec<EndpointId> = self
            .endpoints
            .keys()
            .copied()
            .filter(|id| Some(*id) != exclude)
            .collect();
        let failed: Vec<EndpointId> = targets
            .into_iter()
            .filter(|id| !self.send_to(*id, msg))
            .collect();
        for id in failed {
            self.remove_endpoint(id);
        }
    }

    /// Send one message. Returns false if the endpoint is unknown or the
    /// write failed.
    pub fn send_to(&mut self, id: EndpointId, msg: &WireMessage) -> bool {
        let Some(slot) = self.endpoints.get_mut(&id) else {
            return false;
        };
        match write_wire(&mut slot.writer, msg) {
            Ok(()) => {
                log::debug!("-> {id}: {}", msg.kind());
                true
            }
            Err(e) => {
                log::warn!("send to {id} failed: {e}");
                false
            }
        }
    }

    fn send_or_remove(&mut self, id: EndpointId, msg: &WireMessage) {
        if !self.send_to(id, msg) {
            self.remove_endpoint(id);
        }
    }

    fn reject(&mut self, id: EndpointId, reason: String) {
        log::warn!("rejected play from {id}: {reason}");
        self.send_or_remove(id, &WireMessage::Rejected { reason });
    }

    /// Tailored state update for each endpoint, then the turn announcements.
    fn push_views(&mut self) {
        let seats = self.seats();
        for (id, side) in &seats {
            let update = WireMessage::StateUpdate(self.view_for(*side));
            self.send_or_remove(*id, &update);
        }
        if self.game.is_ended() {
            return;
        }
        for (id, side) in &seats {
            let announcement = WireMessage::TurnAnnouncement {
                your_turn: self.game.is_turn_of(*side),
            };
            self.send_or_remove(*id, &announcement);
        }
    }

    fn view_for(&self, side: Side) -> StateUpdate {
        let status = match self.game.winner() {
            Some(winner) if winner == side => "Victory!".to_string(),
            Some(_) => "Defeat.".to_string(),
            None if self.game.is_turn_of(side) => "Your turn".to_string(),
            None => format!("Waiting for {}...", side.opponent().label()),
        };
        StateUpdate {
            seat: side,
            own: self.game.combatant(side).clone(),
            opponent: self.game.combatant(side.opponent()).view(),
            your_turn: self.game.is_turn_of(side),
            status,
        }
    }

    fn seats(&self) -> Vec<(EndpointId, Side)> {
        self.endpoints
            .iter()
            .map(|(id, slot)| (*id, slot.side))
            .collect()
    }

    pub fn side_of(&self, id: EndpointId) -> Option<Side> {
        self.endpoints.get(&id).map(|slot| slot.side)
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    pub fn ready_count(&self) -> usize {
        self.ready.len()
    }

    pub fn is_full(&self) -> bool {
        self.endpoints.len() >= self.max_endpoints
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn game(&self) -> &MatchState {
        &self.game
    }
}
