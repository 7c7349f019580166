// Local opponent scheduler: single-player matches against a simulated actor.
//
// Runs the same `MatchState` and effect rules as a networked match. Side A is
// the human, side B is the simulated opponent. Flow after the human plays:
//
//   human play_card (caller's thread, under the lock)
//     -> opponent task sleeps `timing.thinking`
//     -> opponent picks a card (random from its small hand, or an improvised
//        basic card once the hand is empty) and plays it through
//        `MatchState::play_card`, under the same lock
//     -> task sleeps `timing.resume`
//     -> human draws a replacement card and gets the turn back
//
// The delays are cosmetic. Correctness comes from the single mutex around
// `SoloState`: the human cannot act while `opponent_pending` is set, even
// though `MatchState` already flipped the turn owner back.
//
// Events go out through an `mpsc` channel; the UI drains them with `poll()`.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::archetype::Archetype;
use crate::card::Card;
use crate::combatant::Combatant;
use crate::deck;
use crate::event::{self, GameEvent};
use crate::match_state::{MatchRules, MatchState, PlayError, Resolution, Side};

/// The human always sits on side A.
pub const HUMAN: Side = Side::A;
/// The simulated opponent always sits on side B.
pub const OPPONENT: Side = Side::B;

/// Cosmetic delays around the simulated opponent's move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SoloTiming {
    pub thinking: Duration,
    pub resume: Duration,
}

impl Default for SoloTiming {
    fn default() -> Self {
        Self {
            thinking: Duration::from_millis(1400),
            resume: Duration::from_millis(800),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SoloConfig {
    pub seed: u64,
    pub timing: SoloTiming,
    /// Cards the simulated opponent starts with before it has to improvise.
    pub opponent_hand_size: usize,
}

impl Default for SoloConfig {
    fn default() -> Self {
        Self {
            seed: rand::random(),
            timing: SoloTiming::default(),
            opponent_hand_size: 3,
        }
    }
}

struct SoloState {
    game: MatchState,
    opponent_pending: bool,
}

/// A running single-player match.
pub struct SoloMatch {
    shared: Arc<Mutex<SoloState>>,
    events_tx: Sender<GameEvent>,
    events_rx: Receiver<GameEvent>,
    timing: SoloTiming,
    opponent_task: Mutex<Option<JoinHandle<()>>>,
}

impl SoloMatch {
    /// Deal a fresh match: random archetypes, a full opening hand for the
    /// human and a short one for the opponent. The human moves first.
    pub fn start(config: SoloConfig) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let human = Combatant::new("Hero", Archetype::random(&mut rng))
            .with_hand(deck::opening_hand(&mut rng));
        let mut opponent_hand = deck::opening_hand(&mut rng);
        opponent_hand.truncate(config.opponent_hand_size);
        let opponent =
            Combatant::new("Opponent", Archetype::random(&mut rng)).with_hand(opponent_hand);
        let game = MatchState::with_combatants(solo_rules(), rng.next_u64(), human, opponent);
        Self::from_match(game, config.timing)
    }

    /// Wrap an already-built match. Starts it if it is still awaiting players.
    pub fn from_match(mut game: MatchState, timing: SoloTiming) -> Self {
        if let Err(e) = game.start(HUMAN) {
            log::warn!("solo match was already started: {e}");
        }
        let (events_tx, events_rx) = mpsc::channel();

        let me = game.combatant(HUMAN);
        let them = game.combatant(OPPONENT);
        let intro = [
            "The battle begins!".to_string(),
            format!("You are a {}.", me.archetype.name),
            format!("Your opponent is a {}.", them.archetype.name),
        ];
        for description in intro {
            let _ = events_tx.send(GameEvent::ActionOccurred { description });
        }
        let _ = events_tx.send(GameEvent::StatusUpdated {
            status: "YOUR TURN".into(),
        });
        let _ = events_tx.send(GameEvent::TurnChanged { is_self_turn: true });
        for ev in event::snapshot_events(&game, HUMAN) {
            let _ = events_tx.send(ev);
        }

        Self {
            shared: Arc::new(Mutex::new(SoloState {
                game,
                opponent_pending: false,
            })),
            events_tx,
            events_rx,
            timing,
            opponent_task: Mutex::new(None),
        }
    }

    /// The human plays `card`. On success the opponent's move is scheduled on
    /// a background thread. Rejections are also reported as an action event.
    pub fn play_card(&self, card: &Card) -> Result<Resolution, PlayError> {
        let mut state = lock(&self.shared);
        let result = if state.opponent_pending {
            Err(PlayError::NotYourTurn)
        } else {
            state.game.play_card(HUMAN, card)
        };
        let res = match result {
            Ok(res) => res,
            Err(e) => {
                let _ = self.events_tx.send(GameEvent::ActionOccurred {
                    description: format!("Rejected: {e}"),
                });
                return Err(e);
            }
        };

        report_play(&self.events_tx, &state.game, &res, false);
        if res.winner.is_some() {
            return Ok(res);
        }

        state.opponent_pending = true;
        let _ = self.events_tx.send(GameEvent::StatusUpdated {
            status: "OPPONENT'S TURN".into(),
        });
        let _ = self
            .events_tx
            .send(GameEvent::TurnChanged { is_self_turn: false });
        drop(state);

        let shared = Arc::clone(&self.shared);
        let tx = self.events_tx.clone();
        let timing = self.timing;
        let handle = thread::Builder::new()
            .name("solo-opponent".into())
            .spawn(move || opponent_turn(&shared, &tx, timing));
        match handle {
            Ok(handle) => {
                let mut task = self
                    .opponent_task
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                if let Some(previous) = task.replace(handle) {
                    let _ = previous.join();
                }
            }
            Err(e) => {
                log::error!("failed to spawn opponent task: {e}");
                lock(&self.shared).opponent_pending = false;
            }
        }
        Ok(res)
    }

    /// Drain every queued event without blocking.
    pub fn poll(&self) -> Vec<GameEvent> {
        self.events_rx.try_iter().collect()
    }

    /// Wait up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<GameEvent> {
        self.events_rx.recv_timeout(timeout).ok()
    }

    /// Block until the scheduled opponent move (if any) has fully finished.
    pub fn wait_for_opponent(&self) {
        let handle = self
            .opponent_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    /// True when the human may play right now.
    pub fn is_player_turn(&self) -> bool {
        let state = lock(&self.shared);
        !state.opponent_pending && state.game.is_turn_of(HUMAN)
    }

    /// Read-only access to the match, under the lock.
    pub fn with_state<T>(&self, f: impl FnOnce(&MatchState) -> T) -> T {
        f(&lock(&self.shared).game)
    }
}

fn solo_rules() -> MatchRules {
    MatchRules {
        draw_on_play: false,
        ..MatchRules::default()
    }
}

fn lock(shared: &Mutex<SoloState>) -> MutexGuard<'_, SoloState> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Events for one resolved card, from the human's perspective.
fn report_play(tx: &Sender<GameEvent>, game: &MatchState, res: &Resolution, by_opponent: bool) {
    let _ = tx.send(GameEvent::CardPlayed {
        card: res.card.clone(),
        by_opponent,
    });
    let _ = tx.send(GameEvent::ActionOccurred {
        description: res.description.clone(),
    });
    for ev in event::snapshot_events(game, HUMAN) {
        let _ = tx.send(ev);
    }
    if let Some(ev) = event::game_over_event(game, HUMAN) {
        let _ = tx.send(ev);
    }
}

/// Body of the background opponent task.
fn opponent_turn(shared: &Mutex<SoloState>, tx: &Sender<GameEvent>, timing: SoloTiming) {
    thread::sleep(timing.thinking);
    {
        let mut state = lock(shared);
        if state.game.is_ended() {
            state.opponent_pending = false;
            return;
        }
        let card = choose_card(&mut state.game);
        match state.game.play_card(OPPONENT, &card) {
            Ok(res) => {
                report_play(tx, &state.game, &res, true);
                if res.winner.is_some() {
                    state.opponent_pending = false;
                    return;
                }
            }
            Err(e) => {
                log::error!("simulated opponent could not play {card}: {e}");
                state.opponent_pending = false;
                return;
            }
        }
    }

    thread::sleep(timing.resume);
    let mut state = lock(shared);
    let description = match state.game.draw_replacement(HUMAN) {
        Some(card) => {
            let _ = tx.send(GameEvent::HandUpdated {
                hand: state.game.combatant(HUMAN).hand().to_vec(),
            });
            format!("You drew a new card: {}", card.name)
        }
        None => "Your hand is full, no card drawn.".to_string(),
    };
    let _ = tx.send(GameEvent::ActionOccurred { description });
    state.opponent_pending = false;
    let _ = tx.send(GameEvent::StatusUpdated {
        status: "YOUR TURN".into(),
    });
    let _ = tx.send(GameEvent::TurnChanged { is_self_turn: true });
}

/// A random card from the opponent's hand, or an improvised basic card
/// (placed into the hand first so it goes through normal validation).
fn choose_card(game: &mut MatchState) -> Card {
    let hand_len = game.combatant(OPPONENT).hand().len();
    if hand_len == 0 {
        let card = deck::improvised_card(game.rng_mut());
        game.give_card(OPPONENT, card.clone());
        return card;
    }
    let index = game.rng_mut().gen_range(0..hand_len);
    game.combatant(OPPONENT).hand()[index].clone()
}
