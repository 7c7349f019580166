// The authoritative turn-based match state machine.
//
// `MatchState` owns both combatants, the turn owner, the match phase and the
// match's RNG. Phases move strictly forward:
//
//   AwaitingPlayers --start()--> InProgress --(a side reaches 0 HP)--> Ended
//
// `play_card` is the single in-match transition. In order it: validates the
// phase, validates turn ownership, removes the first matching card from the
// actor's hand, resolves the effect (`effect.rs`), optionally draws one
// replacement card for the actor (bounded by `hand_cap`), flips the turn
// owner, and evaluates victory. Every rejected call returns before the first
// mutation, so a failed play leaves the state untouched.
//
// Victory rule: if the actor is at 0 HP after resolution the actor loses,
// even when the opponent also reached 0 in the same resolution. Otherwise an
// opponent at 0 HP loses. There is no draw.
//
// Not thread-safe on its own. The coordinator (`dungeon_duel_net::session`)
// and the solo scheduler (`solo.rs`) each own one behind a single critical
// section.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::archetype::Archetype;
use crate::card::Card;
use crate::combatant::Combatant;
use crate::deck;
use crate::effect::{self, EffectSummary};

/// Default number of cards a hand may hold before replacement draws stop.
pub const DEFAULT_HAND_CAP: usize = 7;

/// One of the two seats in a match. `A` is the first accepted endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::A, Side::B];

    pub fn opponent(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Side::A => 0,
            Side::B => 1,
        }
    }

    /// Display label used in chat and join notices.
    pub fn label(self) -> &'static str {
        match self {
            Side::A => "Player 1",
            Side::B => "Player 2",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    AwaitingPlayers,
    InProgress,
    Ended,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    InProgress,
    Won(Side),
}

/// Tunable match rules.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRules {
    /// Cards dealt to each side on `start()` (at most the 7 of an opening hand).
    pub opening_hand_size: usize,
    /// Replacement draws never grow a hand past this size.
    pub hand_cap: usize,
    /// Draw the actor's replacement inside `play_card`. The solo scheduler
    /// turns this off and draws on its own schedule.
    pub draw_on_play: bool,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            opening_hand_size: 7,
            hand_cap: DEFAULT_HAND_CAP,
            draw_on_play: true,
        }
    }
}

/// Why a play (or start) was refused. The state is unchanged in every case.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PlayError {
    #[error("match has not started")]
    NotStarted,
    #[error("match already started")]
    AlreadyStarted,
    #[error("match is over")]
    MatchOver,
    #[error("not your turn")]
    NotYourTurn,
    #[error("card not found: {card}")]
    CardNotFound { card: String },
}

/// Everything a successful `play_card` did.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub actor: Side,
    /// The card as it was in the actor's hand (authoritative magnitude).
    pub card: Card,
    pub effect: EffectSummary,
    pub description: String,
    pub drawn: Option<Card>,
    pub winner: Option<Side>,
}

#[derive(Clone, Debug)]
pub struct MatchState {
    rules: MatchRules,
    rng: ChaCha8Rng,
    combatants: [Combatant; 2],
    turn_owner: Side,
    phase: Phase,
    outcome: Outcome,
    /// Set by `new`; caller-built combatants keep the hands they came with.
    deal_on_start: bool,
}

impl MatchState {
    /// A match awaiting players, with a random archetype for each side.
    pub fn new(rules: MatchRules, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let a = Combatant::new(Side::A.label(), Archetype::random(&mut rng));
        let b = Combatant::new(Side::B.label(), Archetype::random(&mut rng));
        Self::with_rng(rules, rng, a, b, true)
    }

    /// A match awaiting players with caller-built combatants. Their hands are
    /// used as given, including empty ones; `start` deals nothing.
    pub fn with_combatants(rules: MatchRules, seed: u64, a: Combatant, b: Combatant) -> Self {
        Self::with_rng(rules, ChaCha8Rng::seed_from_u64(seed), a, b, false)
    }

    fn with_rng(
        rules: MatchRules,
        rng: ChaCha8Rng,
        a: Combatant,
        b: Combatant,
        deal_on_start: bool,
    ) -> Self {
        Self {
            rules,
            rng,
            combatants: [a, b],
            turn_owner: Side::A,
            phase: Phase::AwaitingPlayers,
            outcome: Outcome::InProgress,
            deal_on_start,
        }
    }

    /// `AwaitingPlayers -> InProgress`. Deals the opening hands (only for a
    /// match built with `new`) and gives `first` the opening turn.
    pub fn start(&mut self, first: Side) -> Result<(), PlayError> {
        match self.phase {
            Phase::AwaitingPlayers => {}
            Phase::InProgress => return Err(PlayError::AlreadyStarted),
            Phase::Ended => return Err(PlayError::MatchOver),
        }
        if self.deal_on_start {
            for side in Side::BOTH {
                let mut hand = deck::opening_hand(&mut self.rng);
                hand.truncate(self.rules.opening_hand_size);
                for card in hand {
                    self.combatants[side.index()].push_card(card);
                }
            }
            self.deal_on_start = false;
        }
        self.turn_owner = first;
        self.phase = Phase::InProgress;
        log::info!(
            "match started: {} ({}) vs {} ({}), {} to move",
            self.combatants[0].name,
            self.combatants[0].archetype.name,
            self.combatants[1].name,
            self.combatants[1].archetype.name,
            first.label()
        );
        Ok(())
    }

    /// Play `card` from `side`'s hand. See the module header for the order
    /// of operations.
    pub fn play_card(&mut self, side: Side, card: &Card) -> Result<Resolution, PlayError> {
        match self.phase {
            Phase::AwaitingPlayers => return Err(PlayError::NotStarted),
            Phase::Ended => return Err(PlayError::MatchOver),
            Phase::InProgress => {}
        }
        if side != self.turn_owner {
            return Err(PlayError::NotYourTurn);
        }
        let played = self.combatants[side.index()]
            .take_card(card)
            .ok_or_else(|| PlayError::CardNotFound {
                card: card.to_string(),
            })?;

        let (actor, target) = self.pair_mut(side);
        let summary = effect::resolve(&played, actor, target);
        let description = effect::describe(actor, &played, &summary);
        log::debug!("{description}");

        let drawn = if self.rules.draw_on_play {
            self.draw_replacement(side)
        } else {
            None
        };

        self.turn_owner = side.opponent();
        let winner = self.evaluate_victory(side);

        Ok(Resolution {
            actor: side,
            card: played,
            effect: summary,
            description,
            drawn,
            winner,
        })
    }

    /// Add one random card to `side`'s hand unless it is at the cap.
    pub fn draw_replacement(&mut self, side: Side) -> Option<Card> {
        if self.combatants[side.index()].hand().len() >= self.rules.hand_cap {
            return None;
        }
        let card = deck::draw_card(&mut self.rng);
        self.combatants[side.index()].push_card(card.clone());
        Some(card)
    }

    fn evaluate_victory(&mut self, actor: Side) -> Option<Side> {
        let winner = if !self.combatants[actor.index()].is_alive() {
            actor.opponent()
        } else if !self.combatants[actor.opponent().index()].is_alive() {
            actor
        } else {
            return None;
        };
        self.phase = Phase::Ended;
        self.outcome = Outcome::Won(winner);
        log::info!("match over: {} wins", winner.label());
        Some(winner)
    }

    /// Mutable access to both combatants as (actor, target).
    fn pair_mut(&mut self, actor: Side) -> (&mut Combatant, &mut Combatant) {
        let [a, b] = &mut self.combatants;
        match actor {
            Side::A => (a, b),
            Side::B => (b, a),
        }
    }

    pub fn combatant(&self, side: Side) -> &Combatant {
        &self.combatants[side.index()]
    }

    pub fn turn_owner(&self) -> Side {
        self.turn_owner
    }

    pub fn is_turn_of(&self, side: Side) -> bool {
        self.phase == Phase::InProgress && self.turn_owner == side
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn winner(&self) -> Option<Side> {
        match self.outcome {
            Outcome::Won(side) => Some(side),
            Outcome::InProgress => None,
        }
    }

    pub fn is_ended(&self) -> bool {
        self.phase == Phase::Ended
    }

    pub fn rules(&self) -> &MatchRules {
        &self.rules
    }

    /// Put `card` into `side`'s hand outside the draw rules. Used by the solo
    /// scheduler when the simulated opponent improvises a card.
    pub(crate) fn give_card(&mut self, side: Side, card: Card) {
        self.combatants[side.index()].push_card(card);
    }

    pub(crate) fn rng_mut(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::card::CardVariant;

    fn attack() -> Card {
        Card::new(CardVariant::Attack, "Strike")
    }

    /// Two balanced 10 HP combatants, each holding `hand`, A to move.
    fn duel_with(hand: Vec<Card>, rules: MatchRules) -> MatchState {
        let a = Combatant::new("Alice", Archetype::balanced(10)).with_hand(hand.clone());
        let b = Combatant::new("Bob", Archetype::balanced(10)).with_hand(hand);
        let mut state = MatchState::with_combatants(rules, 1, a, b);
        state.start(Side::A).unwrap();
        state
    }

    #[test]
    fn new_match_awaits_players() {
        let mut state = MatchState::new(MatchRules::default(), 5);
        assert_eq!(state.phase(), Phase::AwaitingPlayers);
        assert_eq!(state.outcome(), Outcome::InProgress);
        assert_eq!(
            state.play_card(Side::A, &attack()).clone_err(),
            Some(PlayError::NotStarted)
        );
    }

    #[test]
    fn start_deals_opening_hands() {
        let mut state = MatchState::new(MatchRules::default(), 5);
        state.start(Side::B).unwrap();
        assert_eq!(state.phase(), Phase::InProgress);
        assert_eq!(state.turn_owner(), Side::B);
        for side in Side::BOTH {
            assert_eq!(state.combatant(side).hand().len(), 7);
        }
        assert_eq!(state.start(Side::A), Err(PlayError::AlreadyStarted));
    }

    #[test]
    fn start_keeps_preset_hands() {
        let state = duel_with(vec![attack()], MatchRules::default());
        assert_eq!(state.combatant(Side::A).hand(), &[attack()]);
    }

    #[test]
    fn start_leaves_an_empty_preset_hand_empty() {
        let a = Combatant::new("Alice", Archetype::balanced(10)).with_hand(vec![attack()]);
        let b = Combatant::new("Bob", Archetype::balanced(10));
        let mut state = MatchState::with_combatants(MatchRules::default(), 1, a, b);
        state.start(Side::A).unwrap();
        assert_eq!(state.combatant(Side::A).hand().len(), 1);
        assert!(state.combatant(Side::B).hand().is_empty());
    }

    #[test]
    fn scenario_plain_attack() {
        let mut state = duel_with(vec![attack()], MatchRules::default());
        let res = state.play_card(Side::A, &attack()).unwrap();
        assert_eq!(state.combatant(Side::B).health(), 8);
        assert_eq!(state.combatant(Side::B).shield(), 0);
        assert_eq!(state.turn_owner(), Side::B);
        assert_eq!(res.winner, None);
    }

    #[test]
    fn scenario_attack_through_shield() {
        let strike = attack().with_magnitude(5);
        let a = Combatant::new("Alice", Archetype::balanced(10)).with_hand(vec![strike.clone()]);
        let b = Combatant::new("Bob", Archetype::balanced(10)).with_shield(3);
        let mut state = MatchState::with_combatants(MatchRules::default(), 1, a, b);
        state.start(Side::A).unwrap();
        state.play_card(Side::A, &strike).unwrap();
        assert_eq!(state.combatant(Side::B).shield(), 0);
        assert_eq!(state.combatant(Side::B).health(), 8);
    }

    #[test]
    fn scenario_berserk_suicide_loses() {
        let rage = Card::new(CardVariant::Berserk, "Rage");
        let a = Combatant::new("Alice", Archetype::balanced(10))
            .with_health(2)
            .with_hand(vec![rage.clone()]);
        let b = Combatant::new("Bob", Archetype::balanced(10));
        let mut state = MatchState::with_combatants(MatchRules::default(), 1, a, b);
        state.start(Side::A).unwrap();
        let res = state.play_card(Side::A, &rage).unwrap();
        assert_eq!(state.combatant(Side::A).health(), 0);
        assert_eq!(res.winner, Some(Side::B));
        assert_eq!(state.phase(), Phase::Ended);
        assert_eq!(state.outcome(), Outcome::Won(Side::B));
    }

    #[test]
    fn mutual_knockout_is_a_loss_for_the_actor() {
        let rage = Card::new(CardVariant::Berserk, "Rage");
        let a = Combatant::new("Alice", Archetype::balanced(10))
            .with_health(2)
            .with_hand(vec![rage.clone()]);
        let b = Combatant::new("Bob", Archetype::balanced(10)).with_health(3);
        let mut state = MatchState::with_combatants(MatchRules::default(), 1, a, b);
        state.start(Side::A).unwrap();
        let res = state.play_card(Side::A, &rage).unwrap();
        assert_eq!(state.combatant(Side::A).health(), 0);
        assert_eq!(state.combatant(Side::B).health(), 0);
        assert_eq!(res.winner, Some(Side::B));
    }

    #[test]
    fn killing_blow_wins() {
        let big = attack().with_magnitude(10);
        let mut state = duel_with(vec![big.clone()], MatchRules::default());
        let res = state.play_card(Side::A, &big).unwrap();
        assert_eq!(res.winner, Some(Side::A));
        assert_eq!(state.winner(), Some(Side::A));
        assert_eq!(
            state.play_card(Side::B, &big).clone_err(),
            Some(PlayError::MatchOver)
        );
    }

    #[test]
    fn out_of_turn_play_is_rejected_without_change() {
        let mut state = duel_with(vec![attack()], MatchRules::default());
        let before_a = state.combatant(Side::A).clone();
        let before_b = state.combatant(Side::B).clone();
        let err = state.play_card(Side::B, &attack()).clone_err();
        assert_eq!(err, Some(PlayError::NotYourTurn));
        assert_eq!(err.map(|e| e.to_string()).as_deref(), Some("not your turn"));
        assert_eq!(state.combatant(Side::A), &before_a);
        assert_eq!(state.combatant(Side::B), &before_b);
        assert_eq!(state.turn_owner(), Side::A);
    }

    #[test]
    fn missing_card_is_rejected_without_change() {
        let mut state = duel_with(vec![attack()], MatchRules::default());
        let heal = Card::new(CardVariant::Heal, "Strike");
        let err = state.play_card(Side::A, &heal).clone_err();
        assert!(matches!(err, Some(PlayError::CardNotFound { .. })));
        assert_eq!(state.combatant(Side::A).hand().len(), 1);
        assert_eq!(state.turn_owner(), Side::A);
    }

    #[test]
    fn hand_magnitude_is_authoritative() {
        let mut state = duel_with(vec![attack()], MatchRules::default());
        let forged = attack().with_magnitude(99);
        let res = state.play_card(Side::A, &forged).unwrap();
        assert_eq!(res.card.magnitude, 2);
        assert_eq!(state.combatant(Side::B).health(), 8);
    }

    #[test]
    fn replacement_draw_respects_cap() {
        let full: Vec<Card> = (0..7).map(|_| attack()).collect();
        let mut state = duel_with(full, MatchRules::default());
        let res = state.play_card(Side::A, &attack()).unwrap();
        // 7 -> 6 -> drew back to 7.
        assert!(res.drawn.is_some());
        assert_eq!(state.combatant(Side::A).hand().len(), 7);
        assert_eq!(state.draw_replacement(Side::A), None);
    }

    #[test]
    fn draw_on_play_can_be_disabled() {
        let rules = MatchRules {
            draw_on_play: false,
            ..MatchRules::default()
        };
        let mut state = duel_with(vec![attack(), attack()], rules);
        let res = state.play_card(Side::A, &attack()).unwrap();
        assert_eq!(res.drawn, None);
        assert_eq!(state.combatant(Side::A).hand().len(), 1);
    }

    #[test]
    fn seeded_matches_are_reproducible() {
        let mut x = MatchState::new(MatchRules::default(), 77);
        let mut y = MatchState::new(MatchRules::default(), 77);
        x.start(Side::A).unwrap();
        y.start(Side::A).unwrap();
        assert_eq!(x.combatant(Side::A), y.combatant(Side::A));
        assert_eq!(x.combatant(Side::B), y.combatant(Side::B));
    }

    trait CloneErr {
        fn clone_err(&self) -> Option<PlayError>;
    }

    impl<T> CloneErr for Result<T, PlayError> {
        fn clone_err(&self) -> Option<PlayError> {
            self.as_ref().err().cloned()
        }
    }

    proptest! {
        /// Drive a seeded match with arbitrary (side, hand index) attempts and
        /// check turn alternation and the hand cap after every step.
        #[test]
        fn turns_alternate_and_hands_stay_bounded(
            seed in any::<u64>(),
            moves in prop::collection::vec((any::<bool>(), 0usize..8), 1..60),
        ) {
            let mut state = MatchState::new(MatchRules::default(), seed);
            state.start(Side::A).unwrap();
            for (pick_a, index) in moves {
                if state.is_ended() {
                    break;
                }
                let side = if pick_a { Side::A } else { Side::B };
                let owner = state.turn_owner();
                let hand = state.combatant(side).hand().to_vec();
                let card = hand.get(index).cloned().unwrap_or_else(|| Card::new(CardVariant::Heal, "Nothing"));
                let before = hand.len();
                match state.play_card(side, &card) {
                    Ok(res) => {
                        prop_assert_eq!(side, owner);
                        prop_assert_eq!(state.turn_owner(), owner.opponent());
                        let after = state.combatant(side).hand().len();
                        let expected = if res.drawn.is_some() { before } else { before - 1 };
                        prop_assert_eq!(after, expected);
                        prop_assert!(after <= DEFAULT_HAND_CAP);
                    }
                    Err(_) => {
                        prop_assert_eq!(state.turn_owner(), owner);
                        prop_assert_eq!(state.combatant(side).hand().len(), before);
                    }
                }
                for s in Side::BOTH {
                    let c = state.combatant(s);
                    prop_assert!(c.health() <= c.max_health());
                }
            }
        }
    }
}
