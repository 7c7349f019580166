// Test-only game client for multiplayer integration tests.
//
// Wraps the real `Endpoint` and `MatchView` (from `dungeon_duel_net`) to
// give tests a synchronous API for driving a full networked match:
// coordinator -> ready handshake -> card plays -> game over.
//
// The only test-specific code here is the blocking polling wrappers and a
// simple card-choice policy. Networking and event translation use the same
// code paths as the `duel` binary.
//
// See also: `tests/full_pipeline.rs` for the scenarios.

use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

use dungeon_duel_game::{Card, CardCategory, GameEvent};
use dungeon_duel_net::{Endpoint, EndpointConfig, EndpointError, EndpointEvent, MatchView};

/// Default timeout for blocking poll operations.
pub const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Sleep duration between poll attempts.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A test game client wrapping a real `Endpoint`.
pub struct TestGameClient {
    endpoint: Endpoint,
    view: MatchView,
    pub events: Vec<GameEvent>,
    pub hand: Vec<Card>,
    pub your_turn: bool,
    /// `Some(did_self_win)` once the match is over.
    pub outcome: Option<bool>,
    pub disconnect_notices: usize,
    pub errors: Vec<String>,
}

impl TestGameClient {
    /// Connect to a coordinator; the endpoint sends `ready` itself.
    pub fn connect(addr: SocketAddr) -> Self {
        let config = EndpointConfig {
            read_timeout: Duration::from_millis(50),
            ..EndpointConfig::default()
        };
        let endpoint = Endpoint::connect(addr, &config).expect("TestGameClient::connect failed");
        Self {
            endpoint,
            view: MatchView::new(),
            events: Vec::new(),
            hand: Vec::new(),
            your_turn: false,
            outcome: None,
            disconnect_notices: 0,
            errors: Vec::new(),
        }
    }

    /// Drain the endpoint and fold everything into this client's state.
    pub fn pump(&mut self) {
        for event in self.endpoint.poll() {
            match &event {
                EndpointEvent::Disconnected { .. } => self.disconnect_notices += 1,
                EndpointEvent::Error { message } => self.errors.push(message.clone()),
                _ => {}
            }
            for game_event in self.view.apply_event(&event) {
                match &game_event {
                    GameEvent::HandUpdated { hand } => self.hand = hand.clone(),
                    GameEvent::TurnChanged { is_self_turn } => self.your_turn = *is_self_turn,
                    GameEvent::GameOver { did_self_win, .. } => {
                        self.outcome = Some(*did_self_win);
                    }
                    _ => {}
                }
                self.events.push(game_event);
            }
        }
    }

    /// Blocking poll until `pred` holds.
    pub fn poll_until(&mut self, what: &str, pred: impl Fn(&Self) -> bool) {
        let start = Instant::now();
        loop {
            self.pump();
            if pred(self) {
                return;
            }
            assert!(start.elapsed() < POLL_TIMEOUT, "timed out waiting for {what}");
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Blocking poll until the first state update has arrived.
    pub fn poll_until_started(&mut self) {
        self.poll_until("match start", |c| c.view.seat().is_some());
    }

    /// `(own health, opponent health)` from the latest state update.
    pub fn healths(&self) -> Option<(u32, u32)> {
        self.view
            .last_update()
            .map(|update| (update.own.health(), update.opponent.health))
    }

    pub fn saw_action(&self, needle: &str) -> bool {
        self.events.iter().any(|e| {
            matches!(e, GameEvent::ActionOccurred { description } if description.contains(needle))
        })
    }

    pub fn saw_status(&self, needle: &str) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, GameEvent::StatusUpdated { status } if status.contains(needle)))
    }

    /// Play the first offensive card in hand (or the first card at all).
    /// Clears `your_turn` locally so the caller does not play twice before
    /// the coordinator's answer arrives.
    pub fn play_aggressively(&mut self) -> Result<Card, EndpointError> {
        let card = self
            .hand
            .iter()
            .find(|c| c.variant.category() == CardCategory::Offensive)
            .or_else(|| self.hand.first())
            .cloned()
            .expect("hand is empty");
        self.your_turn = false;
        self.endpoint.play_card(card.clone())?;
        Ok(card)
    }

    pub fn play(&mut self, card: Card) -> Result<(), EndpointError> {
        self.endpoint.play_card(card)
    }

    pub fn chat(&mut self, text: &str) -> Result<(), EndpointError> {
        self.endpoint.chat(text)
    }

    pub fn stop(&mut self) {
        self.endpoint.stop();
    }

    pub fn is_connected(&self) -> bool {
        self.endpoint.is_connected()
    }
}
